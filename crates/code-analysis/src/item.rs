//! Annotation records and the items derived from them.
//!
//! Records live inside pages, one slot per address. They do not store their
//! own address: a banked page can be mapped at more than one place, so the
//! address always comes from where the record was resolved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::PageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelType {
    Code,
    Data,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub label_type: LabelType,
    pub global: bool,
    /// Accessor address to reference count.
    pub references: BTreeMap<u16, u32>,
    pub comment: String,
}

impl Label {
    #[must_use]
    pub fn new(name: impl Into<String>, label_type: LabelType) -> Self {
        Self {
            name: name.into(),
            label_type,
            global: label_type == LabelType::Function,
            references: BTreeMap::new(),
            comment: String::new(),
        }
    }

    pub fn add_reference(&mut self, accessor: u16) {
        let count = self.references.entry(accessor).or_default();
        *count = count.saturating_add(1);
    }
}

/// How an instruction's operand should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OperandType {
    #[default]
    Unknown,
    Pointer,
    JumpAddress,
    Decimal,
    Hex,
}

/// NOP-out state of an instruction.
///
/// `Nopped` holds the bytes that were replaced. Restoring writes exactly
/// those bytes back.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PatchState {
    #[default]
    Normal,
    Nopped { original: Vec<u8> },
}

/// An instruction starting at this address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeInfo {
    pub byte_size: u16,
    /// Rendered text. Empty means it must be regenerated.
    pub text: String,
    pub operand_type: OperandType,
    pub jump_address: Option<u16>,
    pub pointer_address: Option<u16>,
    /// Set when the bytes of this instruction were written at runtime. Never
    /// cleared by tracing.
    pub self_modifying: bool,
    pub patch: PatchState,
    pub frame_last_executed: Option<u32>,
    pub breakpointed: bool,
    /// Disabled code is kept but not shown, so the bytes show as data.
    pub disabled: bool,
    pub comment: String,
}

impl CodeInfo {
    #[must_use]
    pub fn new(byte_size: u16) -> Self {
        Self {
            byte_size: byte_size.max(1),
            text: String::new(),
            operand_type: OperandType::Unknown,
            jump_address: None,
            pointer_address: None,
            self_modifying: false,
            patch: PatchState::Normal,
            frame_last_executed: None,
            breakpointed: false,
            disabled: false,
            comment: String::new(),
        }
    }

    #[must_use]
    pub fn is_nopped(&self) -> bool {
        matches!(self.patch, PatchState::Nopped { .. })
    }
}

/// A code slot. Operand bytes hold their distance back to the head of
/// their instruction, so the page resolves the same wherever it is mapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeEntry {
    Instruction(CodeInfo),
    Operand { back: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataType {
    #[default]
    Byte,
    Word,
    ByteArray,
    WordArray,
    Bitmap,
    CharacterMap,
    /// Colour attribute bytes.
    ColAttr,
    Text,
    Blob,
    ScreenPixels,
    Image,
}

/// How often, and when last, one accessor touched a data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessRecord {
    pub count: u32,
    pub last_frame: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataInfo {
    pub byte_size: u16,
    pub data_type: DataType,
    pub char_set_address: u16,
    pub empty_char: u8,
    /// Text ends at the first byte with bit 7 set.
    pub bit7_terminator: bool,
    pub operand_type: OperandType,
    pub reads: BTreeMap<u16, AccessRecord>,
    pub writes: BTreeMap<u16, AccessRecord>,
    pub last_frame_read: Option<u32>,
    pub last_frame_written: Option<u32>,
    pub comment: String,
}

impl Default for DataInfo {
    fn default() -> Self {
        Self {
            byte_size: 1,
            data_type: DataType::Byte,
            char_set_address: 0,
            empty_char: 0,
            bit7_terminator: false,
            operand_type: OperandType::Unknown,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
            last_frame_read: None,
            last_frame_written: None,
            comment: String::new(),
        }
    }
}

impl DataInfo {
    /// Back to a single byte, keeping access history.
    pub fn reset_shape(&mut self) {
        self.byte_size = 1;
        self.data_type = DataType::Byte;
        self.char_set_address = 0;
        self.empty_char = 0;
        self.bit7_terminator = false;
        self.operand_type = OperandType::Unknown;
    }

    /// How far the item list advances past this record.
    #[must_use]
    pub fn advance(&self) -> u16 {
        match self.data_type {
            DataType::Blob | DataType::ScreenPixels => 1,
            _ => self.byte_size.max(1),
        }
    }

    pub(crate) fn record_read(&mut self, accessor: u16, frame: u32) {
        let record = self.reads.entry(accessor).or_default();
        record.count = record.count.saturating_add(1);
        record.last_frame = frame;
        self.last_frame_read = Some(frame);
    }

    pub(crate) fn record_write(&mut self, accessor: u16, frame: u32) {
        let record = self.writes.entry(accessor).or_default();
        record.count = record.count.saturating_add(1);
        record.last_frame = frame;
        self.last_frame_written = Some(frame);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommentBlock {
    pub comment: String,
}

impl CommentBlock {
    /// Lines shown in the item list. Empty lines and `@` lines are skipped.
    pub fn display_lines(&self) -> impl Iterator<Item = &str> {
        self.comment
            .lines()
            .filter(|line| !line.is_empty() && !line.starts_with('@'))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemType {
    Label,
    Code,
    Data,
    CommentLine,
}

/// Identifies an item across rebuilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub item_type: ItemType,
    pub address: u16,
    /// Line number for comment lines, 0 otherwise.
    pub line: u16,
}

impl ItemKey {
    #[must_use]
    pub const fn new(item_type: ItemType, address: u16) -> Self {
        Self {
            item_type,
            address,
            line: 0,
        }
    }
}

/// One entry in the item list.
///
/// Label, code and data items remember the page they were resolved through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Label {
        address: u16,
        page: PageId,
    },
    Code {
        address: u16,
        page: PageId,
        byte_size: u16,
    },
    Data {
        address: u16,
        page: PageId,
        byte_size: u16,
    },
    CommentLine {
        address: u16,
        line: u16,
        text: String,
    },
}

impl Item {
    #[must_use]
    pub fn item_type(&self) -> ItemType {
        match self {
            Item::Label { .. } => ItemType::Label,
            Item::Code { .. } => ItemType::Code,
            Item::Data { .. } => ItemType::Data,
            Item::CommentLine { .. } => ItemType::CommentLine,
        }
    }

    #[must_use]
    pub fn address(&self) -> u16 {
        match self {
            Item::Label { address, .. }
            | Item::Code { address, .. }
            | Item::Data { address, .. }
            | Item::CommentLine { address, .. } => *address,
        }
    }

    /// Bytes covered. Labels and comment lines cover none.
    #[must_use]
    pub fn byte_size(&self) -> u16 {
        match self {
            Item::Code { byte_size, .. } | Item::Data { byte_size, .. } => *byte_size,
            Item::Label { .. } | Item::CommentLine { .. } => 0,
        }
    }

    #[must_use]
    pub fn page(&self) -> Option<PageId> {
        match self {
            Item::Label { page, .. } | Item::Code { page, .. } | Item::Data { page, .. } => {
                Some(*page)
            }
            Item::CommentLine { .. } => None,
        }
    }

    #[must_use]
    pub fn key(&self) -> ItemKey {
        ItemKey {
            item_type: self.item_type(),
            address: self.address(),
            line: match self {
                Item::CommentLine { line, .. } => *line,
                _ => 0,
            },
        }
    }
}
