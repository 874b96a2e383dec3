//! Linear undo stack.
//!
//! Editing operations snapshot the annotation of the addresses they are
//! about to touch and push it as a `Command`. Undo writes the snapshot back.
//! Access history is not part of a snapshot and survives undo.

use crate::item::{CodeEntry, CommentBlock, DataInfo, DataType, Label, OperandType};
use crate::page::{PageId, offset_of};
use crate::state::CodeAnalysisState;

/// Commands kept before the oldest is dropped.
pub const MAX_COMMANDS: usize = 256;

/// The editable shape of a data record.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DataShape {
    byte_size: u16,
    data_type: DataType,
    char_set_address: u16,
    empty_char: u8,
    bit7_terminator: bool,
    operand_type: OperandType,
    comment: String,
}

impl DataShape {
    fn of(data: &DataInfo) -> Self {
        Self {
            byte_size: data.byte_size,
            data_type: data.data_type,
            char_set_address: data.char_set_address,
            empty_char: data.empty_char,
            bit7_terminator: data.bit7_terminator,
            operand_type: data.operand_type,
            comment: data.comment.clone(),
        }
    }

    fn apply(self, data: &mut DataInfo) {
        data.byte_size = self.byte_size;
        data.data_type = self.data_type;
        data.char_set_address = self.char_set_address;
        data.empty_char = self.empty_char;
        data.bit7_terminator = self.bit7_terminator;
        data.operand_type = self.operand_type;
        data.comment = self.comment;
    }
}

/// One address as it was before an edit, pinned to the page it resolved to.
#[derive(Debug, Clone)]
struct AddressSnapshot {
    page: PageId,
    offset: usize,
    label: Option<Label>,
    code: Option<CodeEntry>,
    data: DataShape,
    comment: Option<CommentBlock>,
}

/// An undoable edit.
#[derive(Debug, Clone)]
pub struct Command {
    description: &'static str,
    start: u16,
    snapshots: Vec<AddressSnapshot>,
}

impl Command {
    /// Capture `len` addresses from `start` through the read table.
    #[must_use]
    pub fn snapshot(
        state: &CodeAnalysisState,
        description: &'static str,
        start: u16,
        len: u32,
    ) -> Self {
        let mut snapshots = Vec::with_capacity(len as usize);
        for i in 0..len {
            let address = start.wrapping_add(i as u16);
            let Some(page_id) = state.table.read_page_id(address) else {
                continue;
            };
            let Some(page) = state.page(page_id) else {
                continue;
            };
            let offset = offset_of(address);
            snapshots.push(AddressSnapshot {
                page: page_id,
                offset,
                label: page.label(offset).cloned(),
                code: page.code_entry(offset).cloned(),
                data: DataShape::of(page.data(offset)),
                comment: page.comment_block(offset).cloned(),
            });
        }
        Self {
            description,
            start,
            snapshots,
        }
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// First address the edit touched.
    #[must_use]
    pub fn start(&self) -> u16 {
        self.start
    }

    fn restore(self, state: &mut CodeAnalysisState) {
        for snap in self.snapshots {
            let Some(page) = state.page_mut(snap.page) else {
                continue;
            };
            page.labels[snap.offset] = snap.label;
            page.code[snap.offset] = snap.code;
            snap.data.apply(&mut page.data[snap.offset]);
            page.comments[snap.offset] = snap.comment;
        }
    }
}

impl CodeAnalysisState {
    pub(crate) fn push_command(&mut self, command: Command) {
        if self.commands.len() == MAX_COMMANDS {
            self.commands.remove(0);
        }
        self.commands.push(command);
    }

    /// Revert the most recent edit. Returns its description.
    pub fn undo(&mut self) -> Option<&'static str> {
        let command = self.commands.pop()?;
        let description = command.description();
        command.restore(self);
        self.rebuild_label_names();
        self.generate_global_info();
        self.set_dirty();
        Some(description)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.commands.is_empty()
    }

    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}
