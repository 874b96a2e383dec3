//! Read and write page tables for the 64K address space.

use crate::page::{PageId, SLOT_COUNT, slot_of};

/// Maps each 1K slot to the page that backs it, separately for reads and
/// writes. ROM under RAM is a read page and a write page in the same slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTable {
    read: [Option<PageId>; SLOT_COUNT],
    write: [Option<PageId>; SLOT_COUNT],
}

impl Default for PageTable {
    fn default() -> Self {
        Self {
            read: [None; SLOT_COUNT],
            write: [None; SLOT_COUNT],
        }
    }
}

impl PageTable {
    /// Slots past the end of the table are ignored.
    pub fn set_read(&mut self, slot: usize, page: PageId) {
        if let Some(entry) = self.read.get_mut(slot) {
            *entry = Some(page);
        }
    }

    pub fn set_write(&mut self, slot: usize, page: PageId) {
        if let Some(entry) = self.write.get_mut(slot) {
            *entry = Some(page);
        }
    }

    #[must_use]
    pub fn read_slot(&self, slot: usize) -> Option<PageId> {
        self.read.get(slot).copied().flatten()
    }

    #[must_use]
    pub fn write_slot(&self, slot: usize) -> Option<PageId> {
        self.write.get(slot).copied().flatten()
    }

    #[must_use]
    pub fn read_page_id(&self, address: u16) -> Option<PageId> {
        self.read[slot_of(address)]
    }

    #[must_use]
    pub fn write_page_id(&self, address: u16) -> Option<PageId> {
        self.write[slot_of(address)]
    }

    pub fn clear(&mut self) {
        self.read = [None; SLOT_COUNT];
        self.write = [None; SLOT_COUNT];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_and_write_are_independent() {
        let mut table = PageTable::default();
        table.set_read(63, PageId(1));
        table.set_write(63, PageId(2));
        assert_eq!(table.read_page_id(0xFFFF), Some(PageId(1)));
        assert_eq!(table.write_page_id(0xFC00), Some(PageId(2)));
        assert_eq!(table.read_page_id(0xFBFF), None);
    }

    #[test]
    fn clear_unmaps_everything() {
        let mut table = PageTable::default();
        table.set_read(0, PageId(0));
        table.set_write(0, PageId(0));
        table.clear();
        assert_eq!(table, PageTable::default());
    }

    #[test]
    fn out_of_range_slot_is_ignored() {
        let mut table = PageTable::default();
        table.set_read(SLOT_COUNT, PageId(0));
        assert_eq!(table, PageTable::default());
        assert_eq!(table.read_slot(SLOT_COUNT), None);
    }
}
