//! Item list rebuild.
//!
//! One pass over the 64K read space turns page annotation into an ordered
//! list of items. Code and data never claim the same byte: a free-address
//! cursor advances past each emitted code or data item, and nothing else is
//! emitted until the scan catches up with it.

use log::warn;

use crate::item::{CodeEntry, Item, ItemType};
use crate::page::{PAGE_SIZE, SLOT_COUNT, offset_of, slot_of};
use crate::state::CodeAnalysisState;

impl CodeAnalysisState {
    /// Rebuild the item list if anything changed since the last rebuild.
    pub fn update_item_list(&mut self) {
        if self.is_dirty() {
            self.force_update_item_list();
        }
    }

    /// Rebuild the item list unconditionally.
    pub fn force_update_item_list(&mut self) {
        let items = self.build_items();

        for view in &mut self.views {
            let Some(cursor) = view.cursor else {
                continue;
            };
            let mut at_address = items_at(&items, cursor.address);
            let resolved = if cursor.item_type == ItemType::CommentLine {
                // Any line of a block re-anchors to its first line.
                at_address.find(|&i| items[i].item_type() == ItemType::CommentLine)
            } else {
                at_address.find(|&i| items[i].key() == cursor)
            };
            match resolved {
                Some(index) => {
                    view.cursor = Some(items[index].key());
                    view.cursor_index = Some(index);
                }
                // The cursor's item is gone; point at whatever covers the
                // address now.
                None => view.cursor_index = index_for_address(&items, cursor.address),
            }
        }

        self.items = items;
        self.clear_dirty();
    }

    fn build_items(&self) -> Vec<Item> {
        let mut items = Vec::with_capacity(self.items.len().max(PAGE_SIZE));
        let mut next_free: u32 = 0;
        let mut warned = [false; SLOT_COUNT];

        for addr in 0..=0xFFFFu16 {
            let slot = slot_of(addr);
            let Some((page_id, page)) = self
                .table
                .read_slot(slot)
                .and_then(|id| self.page(id).map(|page| (id, page)))
            else {
                if !warned[slot] {
                    warn!("item list: read page {slot} not mapped");
                    warned[slot] = true;
                }
                continue;
            };
            let offset = offset_of(addr);

            if let Some(block) = page.comment_block(offset) {
                for (line, text) in block.display_lines().enumerate() {
                    items.push(Item::CommentLine {
                        address: addr,
                        line: line as u16,
                        text: text.to_string(),
                    });
                }
            }

            if page.label(offset).is_some() {
                items.push(Item::Label {
                    address: addr,
                    page: page_id,
                });
            }

            if u32::from(addr) < next_free {
                continue;
            }
            match page.code_entry(offset) {
                Some(CodeEntry::Instruction(info)) if !info.disabled => {
                    items.push(Item::Code {
                        address: addr,
                        page: page_id,
                        byte_size: info.byte_size,
                    });
                    next_free = u32::from(addr) + u32::from(info.byte_size);
                }
                _ => {
                    let data = page.data(offset);
                    items.push(Item::Data {
                        address: addr,
                        page: page_id,
                        byte_size: data.byte_size.max(1),
                    });
                    next_free = u32::from(addr) + u32::from(data.advance());
                }
            }
        }
        items
    }

    /// Index of the last item at or before `address`.
    #[must_use]
    pub fn item_index_for_address(&self, address: u16) -> Option<usize> {
        index_for_address(&self.items, address)
    }

    /// Move a view's cursor to the first item at or after its pending go-to
    /// address. Label items are skipped unless the request asked for them.
    pub fn resolve_go_to(&mut self, view: usize) -> Option<usize> {
        let request = self.view_mut(view).go_to.take()?;
        let index = self.items.iter().position(|item| {
            item.address() >= request.address
                && (request.label || item.item_type() != ItemType::Label)
        })?;
        let key = self.items[index].key();
        self.view_mut(view).set_cursor(key, Some(index));
        Some(index)
    }

    /// The item under a view's cursor.
    #[must_use]
    pub fn cursor_item(&self, view: usize) -> Option<&Item> {
        self.items.get(self.view(view).cursor_index?)
    }
}

fn items_at(items: &[Item], address: u16) -> std::ops::Range<usize> {
    let start = items.partition_point(|item| item.address() < address);
    let end = items.partition_point(|item| item.address() <= address);
    start..end
}

fn index_for_address(items: &[Item], address: u16) -> Option<usize> {
    let after = items.partition_point(|item| item.address() <= address);
    after.checked_sub(1)
}
