//! Labels, unique naming and the global symbol lists.

use log::warn;

use crate::command::Command;
use crate::item::{Label, LabelType};
use crate::page::{PAGE_SIZE, SLOT_COUNT};
use crate::state::CodeAnalysisState;

impl CodeAnalysisState {
    /// Reserve a label name, suffixing `_1`, `_2`, ... if it is taken.
    ///
    /// The first use of a name is kept as is. Later uses get the lowest free
    /// suffix, so the result only depends on which names are live.
    pub fn ensure_unique_label_name(&mut self, name: &str) -> String {
        let unique = if self.label_usage.contains_key(name) {
            let mut suffix = 1u32;
            loop {
                let candidate = format!("{name}_{suffix}");
                if !self.label_usage.contains_key(&candidate) {
                    break candidate;
                }
                suffix = suffix.saturating_add(1);
            }
        } else {
            name.to_string()
        };
        let usage = self.label_usage.entry(unique.clone()).or_default();
        *usage = usage.saturating_add(1);
        unique
    }

    /// Release a name reserved by `ensure_unique_label_name`.
    pub fn remove_label_name(&mut self, name: &str) -> bool {
        match self.label_usage.get_mut(name) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.label_usage.remove(name);
                true
            }
            None => false,
        }
    }

    /// Recompute name usage from every registered page.
    pub fn rebuild_label_names(&mut self) {
        self.label_usage.clear();
        let names: Vec<String> = self
            .pages()
            .iter()
            .flat_map(|page| page.labels().map(|(_, label)| label.name.clone()))
            .collect();
        for name in names {
            *self.label_usage.entry(name).or_default() += 1;
        }
    }

    #[must_use]
    pub fn is_label_name_used(&self, name: &str) -> bool {
        self.label_usage.contains_key(name)
    }

    /// Create a label at `address`, or return the one already there.
    ///
    /// Not recorded on the undo stack; machine setup and static analysis
    /// use this directly.
    pub fn add_label(&mut self, address: u16, name: &str, label_type: LabelType) -> Option<&Label> {
        if self.label(address).is_none() {
            self.read_page(address)?;
            let name = self.ensure_unique_label_name(name);
            self.replace_label(address, Some(Label::new(name, label_type)));
            self.set_dirty();
        }
        self.label(address)
    }

    /// Generated label name, e.g. `label_8000`, `function_8000`, `data_8000`.
    #[must_use]
    pub fn generated_label_name(address: u16, label_type: LabelType) -> String {
        let prefix = match label_type {
            LabelType::Code => "label",
            LabelType::Function => "function",
            LabelType::Data => "data",
        };
        format!("{prefix}_{address:04X}")
    }

    /// Add a label with a generated name. Undoable.
    pub fn add_label_at_address(&mut self, address: u16) -> bool {
        if self.label(address).is_some() || self.read_page(address).is_none() {
            return false;
        }
        let command = Command::snapshot(self, "add label", address, 1);
        self.push_command(command);
        let label_type = if self.code_info(address).is_some() {
            LabelType::Code
        } else {
            LabelType::Data
        };
        let name = Self::generated_label_name(address, label_type);
        self.add_label(address, &name, label_type);
        self.generate_global_info();
        true
    }

    /// Remove the label at `address`, releasing its name. Undoable.
    pub fn remove_label_at_address(&mut self, address: u16) -> bool {
        if self.label(address).is_none() {
            return false;
        }
        let command = Command::snapshot(self, "remove label", address, 1);
        self.push_command(command);
        if let Some(label) = self.replace_label(address, None) {
            self.remove_label_name(&label.name);
        }
        self.generate_global_info();
        self.set_dirty();
        true
    }

    /// Rename the label at `address`. The new name is made unique. Undoable.
    pub fn set_label_name(&mut self, address: u16, name: &str) -> Option<String> {
        let old = self.label(address)?.name.clone();
        if old == name {
            return Some(old);
        }
        let command = Command::snapshot(self, "rename label", address, 1);
        self.push_command(command);
        self.remove_label_name(&old);
        let unique = self.ensure_unique_label_name(name);
        if let Some(label) = self.label_mut(address) {
            label.name.clone_from(&unique);
        }
        self.generate_global_info();
        self.set_dirty();
        Some(unique)
    }

    /// Set a label's global flag. Code labels made global become functions
    /// and functions made local become code labels.
    pub fn set_label_global(&mut self, address: u16, global: bool) -> bool {
        let Some(label) = self.label_mut(address) else {
            return false;
        };
        label.global = global;
        match (label.label_type, global) {
            (LabelType::Code, true) => label.label_type = LabelType::Function,
            (LabelType::Function, false) => label.label_type = LabelType::Code,
            _ => {}
        }
        self.generate_global_info();
        self.set_dirty();
        true
    }

    /// Name a specific address of a page directly, whatever is mapped.
    ///
    /// Used by machine crates for hardware register labels on pages that
    /// are not always mapped.
    pub fn set_label_for_page_address(
        &mut self,
        page: crate::PageId,
        address: u16,
        name: &str,
        label_type: LabelType,
    ) -> bool {
        let offset = crate::page::offset_of(address);
        if self.page(page).is_none_or(|p| p.label(offset).is_some()) {
            return false;
        }
        let name = self.ensure_unique_label_name(name);
        if let Some(p) = self.page_mut(page) {
            p.labels[offset] = Some(Label::new(name, label_type));
        }
        self.set_dirty();
        true
    }

    /// Count a reference from `accessor` to the label at `address`.
    pub fn add_label_reference(&mut self, address: u16, accessor: u16) {
        if let Some(label) = self.label_mut(address) {
            label.add_reference(accessor);
        }
    }

    /// Rebuild the global function and data lists from the mapped read
    /// space and flag every view's filtered lists for rebuild.
    pub fn generate_global_info(&mut self) {
        let mut functions = Vec::new();
        let mut data = Vec::new();
        for slot in 0..SLOT_COUNT {
            let Some(page) = self.table.read_slot(slot).and_then(|id| self.page(id)) else {
                warn!("global info: read page {slot} not mapped");
                continue;
            };
            let base = (slot * PAGE_SIZE) as u16;
            for (offset, label) in page.labels() {
                let address = base + offset as u16;
                match label.label_type {
                    LabelType::Function => functions.push(address),
                    LabelType::Data if label.global => data.push(address),
                    _ => {}
                }
            }
        }
        self.global_functions = functions;
        self.global_data = data;
        for view in &mut self.views {
            view.rebuild_functions = true;
            view.rebuild_data = true;
        }
    }

    /// Refresh a view's filtered global lists if they were flagged.
    pub fn update_filtered_globals(&mut self, view: usize) {
        let index = view % crate::view::VIEW_COUNT;
        let (rebuild_functions, rebuild_data) = {
            let v = &self.views[index];
            (v.rebuild_functions, v.rebuild_data)
        };
        if rebuild_functions {
            let filter = &self.views[index].function_filter;
            let list = self
                .global_functions
                .iter()
                .copied()
                .filter(|&a| self.label(a).is_some_and(|l| filter.matches(&l.name, a)))
                .collect();
            let v = &mut self.views[index];
            v.filtered_functions = list;
            v.rebuild_functions = false;
        }
        if rebuild_data {
            let filter = &self.views[index].data_filter;
            let list = self
                .global_data
                .iter()
                .copied()
                .filter(|&a| self.label(a).is_some_and(|l| filter.matches(&l.name, a)))
                .collect();
            let v = &mut self.views[index];
            v.filtered_data = list;
            v.rebuild_data = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;
    use crate::view::LabelListFilter;

    fn state_with_ram() -> CodeAnalysisState {
        let mut state = CodeAnalysisState::default();
        for slot in 0..SLOT_COUNT {
            let id = state
                .register_page(Page::new((slot * PAGE_SIZE) as u16), &format!("RAM{slot}"))
                .unwrap();
            state.set_read_write_page(slot, id, id);
        }
        state
    }

    #[test]
    fn unique_names_take_lowest_free_suffix() {
        let mut state = CodeAnalysisState::default();
        assert_eq!(state.ensure_unique_label_name("loop"), "loop");
        assert_eq!(state.ensure_unique_label_name("loop"), "loop_1");
        assert_eq!(state.ensure_unique_label_name("loop"), "loop_2");
        assert!(state.remove_label_name("loop_1"));
        assert_eq!(state.ensure_unique_label_name("loop"), "loop_1");
        assert!(!state.remove_label_name("never"));
    }

    #[test]
    fn colliding_labels_stay_distinct() {
        let mut state = state_with_ram();
        state.add_label(0x4000, "Foo", LabelType::Code);
        state.add_label(0x5000, "Foo", LabelType::Code);
        let first = state.label(0x4000).unwrap().name.clone();
        let second = state.label(0x5000).unwrap().name.clone();
        assert_eq!(first, "Foo");
        assert_ne!(first, second);
    }

    #[test]
    fn add_label_returns_existing() {
        let mut state = state_with_ram();
        state.add_label(0x100, "start", LabelType::Code);
        let label = state.add_label(0x100, "other", LabelType::Data).unwrap();
        assert_eq!(label.name, "start");
        assert!(!state.is_label_name_used("other"));
    }

    #[test]
    fn removing_releases_name() {
        let mut state = state_with_ram();
        state.add_label(0x100, "start", LabelType::Code);
        assert!(state.remove_label_at_address(0x100));
        assert!(!state.is_label_name_used("start"));
        assert!(state.label(0x100).is_none());
        assert!(!state.remove_label_at_address(0x100));
    }

    #[test]
    fn generated_names_follow_content() {
        let mut state = state_with_ram();
        assert!(state.add_label_at_address(0x9000));
        assert_eq!(state.label(0x9000).unwrap().name, "data_9000");
        assert_eq!(state.label(0x9000).unwrap().label_type, LabelType::Data);
        assert!(!state.add_label_at_address(0x9000));
    }

    #[test]
    fn rename_keeps_names_unique() {
        let mut state = state_with_ram();
        state.add_label(0x10, "a", LabelType::Code);
        state.add_label(0x20, "b", LabelType::Code);
        assert_eq!(state.set_label_name(0x20, "a").as_deref(), Some("a_1"));
        assert!(!state.is_label_name_used("b"));
        assert_eq!(state.set_label_name(0x30, "c"), None);
    }

    #[test]
    fn global_toggle_promotes_code_to_function() {
        let mut state = state_with_ram();
        state.add_label(0x8000, "draw", LabelType::Code);
        assert!(state.global_functions().is_empty());

        state.set_label_global(0x8000, true);
        assert_eq!(state.label(0x8000).unwrap().label_type, LabelType::Function);
        assert_eq!(state.global_functions(), [0x8000]);

        state.set_label_global(0x8000, false);
        assert_eq!(state.label(0x8000).unwrap().label_type, LabelType::Code);
        assert!(state.global_functions().is_empty());
    }

    #[test]
    fn global_data_needs_flag() {
        let mut state = state_with_ram();
        state.add_label(0x6000, "score", LabelType::Data);
        state.generate_global_info();
        assert!(state.global_data().is_empty());
        state.set_label_global(0x6000, true);
        assert_eq!(state.global_data(), [0x6000]);
        assert_eq!(state.label(0x6000).unwrap().label_type, LabelType::Data);
    }

    #[test]
    fn filtered_lists_rebuild_when_flagged() {
        let mut state = state_with_ram();
        state.add_label(0x1000, "draw_sprite", LabelType::Function);
        state.add_label(0x2000, "draw_text", LabelType::Function);
        state.add_label(0x3000, "init", LabelType::Function);
        state.generate_global_info();

        state.update_filtered_globals(0);
        assert_eq!(state.view(0).filtered_functions().len(), 3);

        state.view_mut(0).set_function_filter(LabelListFilter {
            filter_text: "draw".to_string(),
            min_address: 0x1000,
            max_address: 0x1FFF,
        });
        state.update_filtered_globals(0);
        assert_eq!(state.view(0).filtered_functions(), [0x1000]);
        assert_eq!(state.view(1).filtered_functions().len(), 0);
    }

    #[test]
    fn page_address_labels_work_while_unmapped() {
        let mut state = CodeAnalysisState::default();
        let io = state.register_page(Page::new(0xD000), "IO").unwrap();
        assert!(state.set_label_for_page_address(io, 0xD020, "BorderColour", LabelType::Data));
        assert!(!state.set_label_for_page_address(io, 0xD020, "Again", LabelType::Data));
        state.set_read_page(52, io);
        assert_eq!(state.label(0xD020).unwrap().name, "BorderColour");
    }

    #[test]
    fn rebuilding_names_counts_every_page() {
        let mut state = state_with_ram();
        state.add_label(0x10, "a", LabelType::Code);
        state.label_usage.clear();
        state.rebuild_label_names();
        assert!(state.is_label_name_used("a"));
    }
}
