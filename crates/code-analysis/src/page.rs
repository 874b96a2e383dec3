//! Fixed-size pages of annotation storage.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::item::{CodeEntry, CodeInfo, CommentBlock, DataInfo, Label};

/// Addresses per page.
pub const PAGE_SIZE: usize = 1024;
pub const PAGE_SHIFT: u32 = 10;
pub const PAGE_MASK: u16 = 0x03FF;
/// Pages needed to cover the 64K address space.
pub const SLOT_COUNT: usize = 0x10000 / PAGE_SIZE;

/// Stable identity of a registered page. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub(crate) u16);

impl PageId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

/// Slot (0..64) that `address` falls in.
#[must_use]
pub const fn slot_of(address: u16) -> usize {
    (address >> PAGE_SHIFT) as usize
}

/// Offset of `address` within its page.
#[must_use]
pub const fn offset_of(address: u16) -> usize {
    (address & PAGE_MASK) as usize
}

/// 1024 addresses of annotation.
///
/// Every address has a data record. Labels, code and comment blocks are
/// optional. `last_writer` holds the PC of the last instruction that wrote
/// each address.
#[derive(Debug, Clone)]
pub struct Page {
    pub(crate) id: Option<PageId>,
    /// Where this page is normally mapped. Informational only; lookups go
    /// through the page tables.
    pub base_address: u16,
    pub(crate) used: bool,
    pub(crate) labels: Vec<Option<Label>>,
    pub(crate) code: Vec<Option<CodeEntry>>,
    pub(crate) data: Vec<DataInfo>,
    pub(crate) comments: Vec<Option<CommentBlock>>,
    pub(crate) last_writer: Vec<u16>,
}

impl Page {
    #[must_use]
    pub fn new(base_address: u16) -> Self {
        Self {
            id: None,
            base_address,
            used: false,
            labels: vec![None; PAGE_SIZE],
            code: vec![None; PAGE_SIZE],
            data: vec![DataInfo::default(); PAGE_SIZE],
            comments: vec![None; PAGE_SIZE],
            last_writer: vec![0; PAGE_SIZE],
        }
    }

    /// Id assigned at registration.
    #[must_use]
    pub fn id(&self) -> Option<PageId> {
        self.id
    }

    /// Has this page ever been bound into a page table?
    #[must_use]
    pub fn is_used(&self) -> bool {
        self.used
    }

    /// Clear all annotation. Identity and base address are kept.
    pub fn reset(&mut self) {
        self.labels.fill(None);
        self.code.fill(None);
        self.data.fill(DataInfo::default());
        self.comments.fill(None);
        self.last_writer.fill(0);
    }

    #[must_use]
    pub fn label(&self, offset: usize) -> Option<&Label> {
        self.labels[wrap(offset)].as_ref()
    }

    pub fn label_mut(&mut self, offset: usize) -> Option<&mut Label> {
        self.labels[wrap(offset)].as_mut()
    }

    #[must_use]
    pub fn code_entry(&self, offset: usize) -> Option<&CodeEntry> {
        self.code[wrap(offset)].as_ref()
    }

    /// The instruction whose first byte is at `offset`.
    #[must_use]
    pub fn code_head(&self, offset: usize) -> Option<&CodeInfo> {
        match &self.code[wrap(offset)] {
            Some(CodeEntry::Instruction(info)) => Some(info),
            _ => None,
        }
    }

    pub fn code_head_mut(&mut self, offset: usize) -> Option<&mut CodeInfo> {
        match &mut self.code[wrap(offset)] {
            Some(CodeEntry::Instruction(info)) => Some(info),
            _ => None,
        }
    }

    #[must_use]
    pub fn data(&self, offset: usize) -> &DataInfo {
        &self.data[wrap(offset)]
    }

    pub fn data_mut(&mut self, offset: usize) -> &mut DataInfo {
        &mut self.data[wrap(offset)]
    }

    #[must_use]
    pub fn comment_block(&self, offset: usize) -> Option<&CommentBlock> {
        self.comments[wrap(offset)].as_ref()
    }

    #[must_use]
    pub fn last_writer(&self, offset: usize) -> u16 {
        self.last_writer[wrap(offset)]
    }

    /// Iterate the labels on this page with their offsets.
    pub fn labels(&self) -> impl Iterator<Item = (usize, &Label)> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(offset, label)| label.as_ref().map(|l| (offset, l)))
    }

    /// Drop all access history and label references.
    pub fn clear_references(&mut self) {
        for data in &mut self.data {
            data.reads.clear();
            data.writes.clear();
            data.last_frame_read = None;
            data.last_frame_written = None;
        }
        for label in self.labels.iter_mut().flatten() {
            label.references.clear();
        }
    }
}

// Offsets past the page wrap, so a full address indexes its own page slot.
const fn wrap(offset: usize) -> usize {
    offset & (PAGE_SIZE - 1)
}
