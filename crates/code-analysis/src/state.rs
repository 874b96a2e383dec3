//! The analysis session: page arena, page tables and derived state.

use std::collections::{BTreeSet, HashMap};

use emu_core::{Observable, Value};
use log::{debug, warn};

use crate::command::Command;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::item::{CodeEntry, CodeInfo, CommentBlock, DataInfo, Item, Label};
use crate::page::{Page, PageId, SLOT_COUNT, offset_of, slot_of};
use crate::page_table::PageTable;
use crate::trace::FunctionCall;
use crate::view::{VIEW_COUNT, ViewState};

/// All analysis state for one emulator session.
///
/// Machine crates register their pages once, bind them into the page tables
/// and keep only the returned `PageId`s. Everything else goes through the
/// operations on this type.
pub struct CodeAnalysisState {
    pages: Vec<Page>,
    page_names: Vec<String>,
    pub(crate) table: PageTable,
    dirty: bool,
    /// Live label name to number of labels using it.
    pub(crate) label_usage: HashMap<String, u32>,
    pub(crate) items: Vec<Item>,
    pub(crate) global_functions: Vec<u16>,
    pub(crate) global_data: Vec<u16>,
    pub(crate) views: [ViewState; VIEW_COUNT],
    pub focused_view: usize,
    pub(crate) watches: BTreeSet<u16>,
    pub(crate) call_stack: Vec<FunctionCall>,
    pub(crate) stack_min: u16,
    pub(crate) stack_max: u16,
    pub(crate) frame_trace: Vec<u16>,
    pub(crate) interrupt_handlers: BTreeSet<u16>,
    pub(crate) commands: Vec<Command>,
    pub(crate) frame: u32,
    pub config: AnalysisConfig,
}

impl Default for CodeAnalysisState {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl CodeAnalysisState {
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            pages: Vec::new(),
            page_names: Vec::new(),
            table: PageTable::default(),
            dirty: false,
            label_usage: HashMap::new(),
            items: Vec::new(),
            global_functions: Vec::new(),
            global_data: Vec::new(),
            views: Default::default(),
            focused_view: 0,
            watches: BTreeSet::new(),
            call_stack: Vec::new(),
            stack_min: 0xFFFF,
            stack_max: 0,
            frame_trace: Vec::new(),
            interrupt_handlers: BTreeSet::new(),
            commands: Vec::new(),
            frame: 0,
            config,
        }
    }

    /// Clear session state that does not live in pages: labels usage, items,
    /// globals, call stack, stack range, watches, undo history and the page
    /// tables. Page contents are reset separately with `reset_pages`.
    pub fn reset_session(&mut self) {
        self.table.clear();
        self.label_usage.clear();
        self.items.clear();
        self.global_functions.clear();
        self.global_data.clear();
        for view in &mut self.views {
            view.clear_cursor();
            view.address_history.clear();
            view.go_to = None;
            view.rebuild_functions = true;
            view.rebuild_data = true;
        }
        self.watches.clear();
        self.call_stack.clear();
        self.stack_min = 0xFFFF;
        self.stack_max = 0;
        self.frame_trace.clear();
        self.interrupt_handlers.clear();
        self.commands.clear();
        self.dirty = true;
    }

    /// Reset the annotation of the given pages.
    pub fn reset_pages(&mut self, ids: &[PageId]) {
        for &id in ids {
            if let Some(page) = self.page_mut(id) {
                page.reset();
            }
        }
        self.rebuild_label_names();
        self.dirty = true;
    }

    // Page arena

    /// Take ownership of `page` and give it a one-time id.
    pub fn register_page(&mut self, mut page: Page, name: &str) -> Result<PageId> {
        if let Some(id) = page.id {
            warn!("page '{name}' is already registered as {id}");
            return Err(AnalysisError::PageAlreadyRegistered(id));
        }
        let id = PageId(self.pages.len() as u16);
        page.id = Some(id);
        self.pages.push(page);
        self.page_names.push(name.to_string());
        Ok(id)
    }

    #[must_use]
    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.get(id.index())
    }

    pub fn page_mut(&mut self, id: PageId) -> Option<&mut Page> {
        self.pages.get_mut(id.index())
    }

    #[must_use]
    pub fn page_name(&self, id: PageId) -> Option<&str> {
        self.page_names.get(id.index()).map(String::as_str)
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub(crate) fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub(crate) fn pages_mut(&mut self) -> &mut [Page] {
        &mut self.pages
    }

    // Page tables

    pub fn set_read_page(&mut self, slot: usize, id: PageId) {
        self.table.set_read(slot, id);
        if let Some(page) = self.page_mut(id) {
            page.used = true;
        }
    }

    pub fn set_write_page(&mut self, slot: usize, id: PageId) {
        self.table.set_write(slot, id);
        if let Some(page) = self.page_mut(id) {
            page.used = true;
        }
    }

    pub fn set_read_write_page(&mut self, slot: usize, read: PageId, write: PageId) {
        self.set_read_page(slot, read);
        self.set_write_page(slot, write);
    }

    /// Bind `count` consecutive pages starting at `first_slot` for reads and
    /// writes. Debug logging only; the table update is what matters.
    pub fn map_pages(&mut self, first_slot: usize, ids: &[PageId], read: bool, write: bool) {
        for (i, &id) in ids.iter().enumerate() {
            let slot = first_slot + i;
            if slot >= SLOT_COUNT {
                break;
            }
            if read {
                self.set_read_page(slot, id);
            }
            if write {
                self.set_write_page(slot, id);
            }
        }
        debug!(
            "mapped {} pages at slot {first_slot} (read: {read}, write: {write})",
            ids.len()
        );
    }

    #[must_use]
    pub fn read_page_id(&self, address: u16) -> Option<PageId> {
        let id = self.table.read_page_id(address);
        if id.is_none() {
            warn!("read page {} not mapped", slot_of(address));
        }
        id
    }

    #[must_use]
    pub fn write_page_id(&self, address: u16) -> Option<PageId> {
        let id = self.table.write_page_id(address);
        if id.is_none() {
            warn!("write page {} not mapped", slot_of(address));
        }
        id
    }

    #[must_use]
    pub fn read_page(&self, address: u16) -> Option<&Page> {
        self.read_page_id(address).and_then(|id| self.page(id))
    }

    pub fn read_page_mut(&mut self, address: u16) -> Option<&mut Page> {
        self.read_page_id(address).and_then(|id| self.page_mut(id))
    }

    #[must_use]
    pub fn write_page(&self, address: u16) -> Option<&Page> {
        self.write_page_id(address).and_then(|id| self.page(id))
    }

    pub fn write_page_mut(&mut self, address: u16) -> Option<&mut Page> {
        self.write_page_id(address).and_then(|id| self.page_mut(id))
    }

    // Per-address accessors

    #[must_use]
    pub fn label(&self, address: u16) -> Option<&Label> {
        self.read_page(address)?.label(offset_of(address))
    }

    pub fn label_mut(&mut self, address: u16) -> Option<&mut Label> {
        self.read_page_mut(address)?.label_mut(offset_of(address))
    }

    /// Replace the label slot at `address`, returning the old label. Name
    /// reservations are the caller's business.
    pub(crate) fn replace_label(&mut self, address: u16, label: Option<Label>) -> Option<Label> {
        let page = self.read_page_mut(address)?;
        std::mem::replace(&mut page.labels[offset_of(address)], label)
    }

    #[must_use]
    pub fn code_entry(&self, address: u16) -> Option<&CodeEntry> {
        self.read_page(address)?.code_entry(offset_of(address))
    }

    /// Address of the instruction covering `address`, if any.
    #[must_use]
    pub fn code_head_address(&self, address: u16) -> Option<u16> {
        head_of(self.read_page(address)?, address, |a| self.read_page(a))
    }

    /// The instruction covering `address`, resolving operand bytes to
    /// their head.
    #[must_use]
    pub fn code_info(&self, address: u16) -> Option<&CodeInfo> {
        let head = self.code_head_address(address)?;
        self.read_page(head)?.code_head(offset_of(head))
    }

    pub fn code_info_mut(&mut self, address: u16) -> Option<&mut CodeInfo> {
        let head = self.code_head_address(address)?;
        self.read_page_mut(head)?.code_head_mut(offset_of(head))
    }

    /// Like `code_info_mut`, but through the write table: the instruction
    /// on the page a write to `address` actually lands in.
    pub fn written_code_info_mut(&mut self, address: u16) -> Option<&mut CodeInfo> {
        let head = head_of(self.write_page(address)?, address, |a| self.write_page(a))?;
        self.write_page_mut(head)?.code_head_mut(offset_of(head))
    }

    pub(crate) fn replace_code_entry(
        &mut self,
        address: u16,
        entry: Option<CodeEntry>,
    ) -> Option<CodeEntry> {
        let page = self.read_page_mut(address)?;
        std::mem::replace(&mut page.code[offset_of(address)], entry)
    }

    #[must_use]
    pub fn read_data(&self, address: u16) -> Option<&DataInfo> {
        Some(self.read_page(address)?.data(offset_of(address)))
    }

    pub fn read_data_mut(&mut self, address: u16) -> Option<&mut DataInfo> {
        Some(self.read_page_mut(address)?.data_mut(offset_of(address)))
    }

    #[must_use]
    pub fn write_data(&self, address: u16) -> Option<&DataInfo> {
        Some(self.write_page(address)?.data(offset_of(address)))
    }

    pub fn write_data_mut(&mut self, address: u16) -> Option<&mut DataInfo> {
        Some(self.write_page_mut(address)?.data_mut(offset_of(address)))
    }

    #[must_use]
    pub fn comment_block(&self, address: u16) -> Option<&CommentBlock> {
        self.read_page(address)?.comment_block(offset_of(address))
    }

    pub(crate) fn replace_comment_block(
        &mut self,
        address: u16,
        block: Option<CommentBlock>,
    ) -> Option<CommentBlock> {
        let page = self.read_page_mut(address)?;
        std::mem::replace(&mut page.comments[offset_of(address)], block)
    }

    /// PC of the last instruction that wrote `address`.
    #[must_use]
    pub fn last_writer(&self, address: u16) -> Option<u16> {
        Some(self.write_page(address)?.last_writer(offset_of(address)))
    }

    pub fn set_last_writer(&mut self, address: u16, writer: u16) {
        if let Some(page) = self.write_page_mut(address) {
            page.last_writer[offset_of(address)] = writer;
        }
    }

    // Dirty flag

    pub fn set_dirty(&mut self) {
        self.dirty = true;
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    // Views

    #[must_use]
    pub fn view(&self, index: usize) -> &ViewState {
        &self.views[index % VIEW_COUNT]
    }

    pub fn view_mut(&mut self, index: usize) -> &mut ViewState {
        &mut self.views[index % VIEW_COUNT]
    }

    #[must_use]
    pub fn focused_view(&self) -> &ViewState {
        self.view(self.focused_view)
    }

    pub fn focused_view_mut(&mut self) -> &mut ViewState {
        self.view_mut(self.focused_view)
    }

    // Watches

    /// Returns false if the address was already watched.
    pub fn add_watch(&mut self, address: u16) -> bool {
        self.watches.insert(address)
    }

    pub fn remove_watch(&mut self, address: u16) -> bool {
        self.watches.remove(&address)
    }

    #[must_use]
    pub fn watches(&self) -> &BTreeSet<u16> {
        &self.watches
    }

    // Derived state

    #[must_use]
    pub fn item_list(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn global_functions(&self) -> &[u16] {
        &self.global_functions
    }

    #[must_use]
    pub fn global_data(&self) -> &[u16] {
        &self.global_data
    }

    #[must_use]
    pub fn current_frame(&self) -> u32 {
        self.frame
    }

    #[must_use]
    pub fn call_stack(&self) -> &[FunctionCall] {
        &self.call_stack
    }

    /// Lowest and highest SP seen. `None` until an instruction retires.
    #[must_use]
    pub fn stack_range(&self) -> Option<(u16, u16)> {
        (self.stack_min <= self.stack_max).then_some((self.stack_min, self.stack_max))
    }

    #[must_use]
    pub fn frame_trace(&self) -> &[u16] {
        &self.frame_trace
    }
}

impl Observable for CodeAnalysisState {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "frame" => Some(self.frame.into()),
            "dirty" => Some(self.dirty.into()),
            "items" => Some(self.items.len().into()),
            "pages" => Some(self.pages.len().into()),
            "stack.min" => self.stack_range().map(|(min, _)| min.into()),
            "stack.max" => self.stack_range().map(|(_, max)| max.into()),
            "call_depth" => Some(self.call_stack.len().into()),
            "interrupt_handlers" => Some(
                self.interrupt_handlers
                    .iter()
                    .copied()
                    .collect::<Vec<_>>()
                    .into(),
            ),
            "commands" => Some(self.commands.len().into()),
            "labels.functions" => Some(self.global_functions.len().into()),
            "labels.data" => Some(self.global_data.len().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "frame",
            "dirty",
            "items",
            "pages",
            "stack.min",
            "stack.max",
            "call_depth",
            "interrupt_handlers",
            "commands",
            "labels.functions",
            "labels.data",
        ]
    }
}

/// Resolve `address` on `page` to the head of its instruction. The head can
/// sit on the previous slot, so `lookup` goes through the same table that
/// produced `page`.
fn head_of<'a>(
    page: &Page,
    address: u16,
    lookup: impl Fn(u16) -> Option<&'a Page>,
) -> Option<u16> {
    let head = match page.code_entry(offset_of(address))? {
        CodeEntry::Instruction(_) => return Some(address),
        CodeEntry::Operand { back } => address.wrapping_sub(*back),
    };
    let info = lookup(head)?.code_head(offset_of(head))?;
    let back = address.wrapping_sub(head);
    (back > 0 && back < info.byte_size).then_some(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::LabelType;

    fn mapped_state() -> (CodeAnalysisState, PageId) {
        let mut state = CodeAnalysisState::default();
        let id = state.register_page(Page::new(0), "RAM0").unwrap();
        state.set_read_write_page(0, id, id);
        (state, id)
    }

    #[test]
    fn registration_assigns_sequential_ids() {
        let mut state = CodeAnalysisState::default();
        let a = state.register_page(Page::new(0), "A").unwrap();
        let b = state.register_page(Page::new(0x400), "B").unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(state.page_name(b), Some("B"));
        assert_eq!(state.page_count(), 2);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let (mut state, id) = mapped_state();
        let copy = state.page(id).unwrap().clone();
        let err = state.register_page(copy, "again").unwrap_err();
        assert!(matches!(err, AnalysisError::PageAlreadyRegistered(p) if p == id));
        assert_eq!(state.page_count(), 1);
    }

    #[test]
    fn binding_marks_page_used() {
        let mut state = CodeAnalysisState::default();
        let id = state.register_page(Page::new(0), "RAM").unwrap();
        assert!(!state.page(id).unwrap().is_used());
        state.set_read_page(5, id);
        assert!(state.page(id).unwrap().is_used());
    }

    #[test]
    fn unmapped_lookups_return_none() {
        let (mut state, _) = mapped_state();
        assert!(state.read_page(0x8000).is_none());
        assert!(state.label(0x8000).is_none());
        assert!(state.read_data_mut(0x8000).is_none());
        assert!(state.last_writer(0x8000).is_none());
        state.set_last_writer(0x8000, 0x1234);
    }

    #[test]
    fn last_writer_uses_write_table() {
        let mut state = CodeAnalysisState::default();
        let rom = state.register_page(Page::new(0), "ROM").unwrap();
        let ram = state.register_page(Page::new(0), "RAM").unwrap();
        state.set_read_write_page(0, rom, ram);
        state.set_last_writer(5, 0x1000);
        assert_eq!(state.last_writer(5), Some(0x1000));
        assert_eq!(state.page(ram).unwrap().last_writer(5), 0x1000);
        assert_eq!(state.page(rom).unwrap().last_writer(5), 0);
    }

    #[test]
    fn operand_bytes_resolve_to_head() {
        let (mut state, _) = mapped_state();
        state.replace_code_entry(0x10, Some(CodeEntry::Instruction(CodeInfo::new(3))));
        state.replace_code_entry(0x11, Some(CodeEntry::Operand { back: 1 }));
        state.replace_code_entry(0x12, Some(CodeEntry::Operand { back: 2 }));
        assert_eq!(state.code_head_address(0x12), Some(0x10));
        assert_eq!(state.code_info(0x11).map(|c| c.byte_size), Some(3));
        assert!(state.code_info(0x13).is_none());
    }

    #[test]
    fn stale_operand_marker_is_ignored() {
        let (mut state, _) = mapped_state();
        state.replace_code_entry(0x10, Some(CodeEntry::Instruction(CodeInfo::new(1))));
        state.replace_code_entry(0x12, Some(CodeEntry::Operand { back: 2 }));
        assert!(state.code_info(0x12).is_none());
    }

    #[test]
    fn observable_paths() {
        let (mut state, _) = mapped_state();
        state.replace_label(0, Some(Label::new("start", LabelType::Function)));
        assert_eq!(state.query("pages"), Some(Value::Count(1)));
        assert_eq!(state.query("stack.min"), None);
        assert_eq!(state.query("nonsense"), None);
        for path in state.query_paths() {
            if *path != "stack.min" && *path != "stack.max" {
                assert!(state.query(path).is_some(), "{path}");
            }
        }
    }
}
