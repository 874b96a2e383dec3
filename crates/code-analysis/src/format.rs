//! Data formatting and item editing.

use emu_core::{CpuInterface, Decoder};

use crate::analysis::is_printable;
use crate::command::Command;
use crate::item::{CommentBlock, DataInfo, DataType, Item, LabelType};
use crate::state::CodeAnalysisState;

/// A request to reshape a range of memory as data.
///
/// The range is `item_size * item_count` bytes from `start_address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFormattingOptions {
    pub data_type: DataType,
    pub start_address: u16,
    pub item_size: u16,
    pub item_count: u16,
    /// Character set used to draw character maps.
    pub char_set: u16,
    /// Character map value drawn as blank.
    pub empty_char: u8,
    pub clear_code_info: bool,
    pub clear_labels: bool,
    pub add_label_at_start: bool,
}

impl Default for DataFormattingOptions {
    fn default() -> Self {
        Self {
            data_type: DataType::Byte,
            start_address: 0,
            item_size: 1,
            item_count: 1,
            char_set: 0,
            empty_char: 0,
            clear_code_info: false,
            clear_labels: false,
            add_label_at_start: false,
        }
    }
}

impl DataFormattingOptions {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.item_count > 0 && self.item_size > 0
    }

    /// Total bytes covered.
    #[must_use]
    pub fn byte_len(&self) -> u32 {
        u32::from(self.item_size) * u32::from(self.item_count)
    }

    /// Last address covered. Wraps at the top of memory.
    #[must_use]
    pub fn calc_end_address(&self) -> u16 {
        (u32::from(self.start_address) + self.byte_len()).wrapping_sub(1) as u16
    }

    /// Rows of `x_size` pixels, 8 pixels per byte.
    pub fn setup_for_bitmap(&mut self, address: u16, x_size: u16, y_size: u16) {
        self.data_type = DataType::Bitmap;
        self.start_address = address;
        self.item_size = x_size / 8;
        self.item_count = y_size;
    }

    /// Rows of `x_size` characters.
    pub fn setup_for_charmap(&mut self, address: u16, x_size: u16, y_size: u16) {
        self.data_type = DataType::CharacterMap;
        self.start_address = address;
        self.item_size = x_size;
        self.item_count = y_size;
    }

    fn addresses(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.byte_len()).map(|i| self.start_address.wrapping_add(i as u16))
    }
}

impl CodeAnalysisState {
    /// Reshape a range as data. Invalid options do nothing.
    pub fn format_data(&mut self, options: &DataFormattingOptions) {
        if !options.is_valid() {
            return;
        }
        let command =
            Command::snapshot(self, "format data", options.start_address, options.byte_len());
        self.push_command(command);

        if options.clear_code_info {
            for address in options.addresses() {
                self.replace_code_entry(address, None);
            }
        }
        if options.clear_labels {
            for address in options.addresses() {
                if address == options.start_address && options.add_label_at_start {
                    continue;
                }
                if let Some(label) = self.replace_label(address, None) {
                    self.remove_label_name(&label.name);
                }
            }
        }

        let mut address = options.start_address;
        for _ in 0..options.item_count {
            if let Some(data) = self.read_data_mut(address) {
                data.data_type = options.data_type;
                data.byte_size = options.item_size;
                if options.data_type == DataType::CharacterMap {
                    data.char_set_address = options.char_set;
                    data.empty_char = options.empty_char;
                }
            }
            address = address.wrapping_add(options.item_size);
        }

        if options.add_label_at_start && self.label(options.start_address).is_none() {
            let name = Self::generated_label_name(options.start_address, LabelType::Data);
            self.add_label(options.start_address, &name, LabelType::Data);
        }
        self.generate_global_info();
        self.set_dirty();
    }

    /// Mark `address` as code. Disabled code is re-enabled; anything else
    /// is analysed from here.
    pub fn set_item_code(&mut self, cpu: &dyn CpuInterface, decoder: &dyn Decoder, address: u16) {
        if self.read_page(address).is_none() {
            return;
        }
        let size = decoder.decode(cpu, address).byte_size;
        let command = Command::snapshot(self, "set code", address, u32::from(size));
        self.push_command(command);
        let disabled = self.code_info(address).is_some_and(|info| info.disabled);
        if disabled {
            if let Some(info) = self.code_info_mut(address) {
                info.disabled = false;
            }
            self.write_code_info_for_address(cpu, decoder, address);
        } else {
            self.run_static_code_analysis(cpu, decoder, address);
        }
        self.set_dirty();
    }

    /// Turn code at `address` back into data, or toggle a data item between
    /// byte and word.
    pub fn set_item_data(&mut self, address: u16) {
        if self.read_page(address).is_none() {
            return;
        }
        if let Some(head) = self.code_head_address(address) {
            let size = self.code_info(head).map_or(1, |c| c.byte_size);
            let command = Command::snapshot(self, "set data", head, u32::from(size));
            self.push_command(command);
            for i in 0..size {
                self.replace_code_entry(head.wrapping_add(i), None);
            }
        } else {
            let command = Command::snapshot(self, "set data", address, 1);
            self.push_command(command);
            if let Some(data) = self.read_data_mut(address) {
                if data.data_type == DataType::Byte {
                    data.data_type = DataType::Word;
                    data.byte_size = 2;
                } else {
                    data.reset_shape();
                }
            }
        }
        self.set_dirty();
    }

    /// Format the printable run starting at `address` as text.
    ///
    /// A byte with bit 7 set whose low 7 bits are printable ends the string
    /// and sets the bit-7 terminator flag.
    pub fn set_item_text(&mut self, cpu: &dyn CpuInterface, address: u16) {
        if self.read_page(address).is_none() {
            return;
        }
        let mut length: u16 = 0;
        let mut bit7_terminator = false;
        loop {
            let byte = cpu.read_byte(address.wrapping_add(length));
            if is_printable(byte) {
                length += 1;
            } else if byte & 0x80 != 0 && is_printable(byte & 0x7F) {
                length += 1;
                bit7_terminator = true;
                break;
            } else {
                break;
            }
            if length == u16::MAX {
                break;
            }
        }
        if length == 0 {
            return;
        }
        let command = Command::snapshot(self, "set text", address, u32::from(length));
        self.push_command(command);
        if let Some(data) = self.read_data_mut(address) {
            data.data_type = DataType::Text;
            data.byte_size = length;
            data.bit7_terminator = bit7_terminator;
        }
        self.set_dirty();
    }

    /// Set the inline comment of a label, code or data item.
    pub fn set_item_comment(&mut self, item: &Item, text: &str) {
        let address = item.address();
        let command = Command::snapshot(self, "comment", address, 1);
        let Some(page) = item.page().and_then(|id| self.page_mut(id)) else {
            return;
        };
        let offset = crate::page::offset_of(address);
        match item {
            Item::Label { .. } => {
                if let Some(label) = page.label_mut(offset) {
                    label.comment = text.to_string();
                }
            }
            Item::Code { .. } => {
                if let Some(info) = page.code_head_mut(offset) {
                    info.comment = text.to_string();
                }
            }
            Item::Data { .. } => page.data_mut(offset).comment = text.to_string(),
            Item::CommentLine { .. } => return,
        }
        self.push_command(command);
        self.set_dirty();
    }

    /// Set the comment block at `address`. Empty text removes it.
    pub fn set_comment_block(&mut self, address: u16, text: &str) {
        if self.read_page(address).is_none() {
            return;
        }
        let command = Command::snapshot(self, "comment block", address, 1);
        self.push_command(command);
        let block = (!text.is_empty()).then(|| CommentBlock {
            comment: text.to_string(),
        });
        self.replace_comment_block(address, block);
        self.set_dirty();
    }

    /// Render an item as text. Code items use their stored text; labels
    /// render as `name:`.
    #[must_use]
    pub fn item_text(&self, cpu: &dyn CpuInterface, item: &Item) -> String {
        let mode = self.config.number_mode;
        match item {
            Item::CommentLine { text, .. } => format!("; {text}"),
            Item::Label { address, page, .. } => self
                .page(*page)
                .and_then(|p| p.label(crate::page::offset_of(*address)))
                .map_or_else(String::new, |label| format!("{}:", label.name)),
            Item::Code { address, page, .. } => self
                .page(*page)
                .and_then(|p| p.code_head(crate::page::offset_of(*address)))
                .map_or_else(String::new, |info| info.text.clone()),
            Item::Data { address, page, .. } => {
                let Some(data) = self
                    .page(*page)
                    .map(|p| p.data(crate::page::offset_of(*address)))
                else {
                    return String::new();
                };
                data_text(cpu, mode, *address, data)
            }
        }
    }
}

fn data_text(
    cpu: &dyn CpuInterface,
    mode: crate::config::NumberDisplayMode,
    address: u16,
    data: &DataInfo,
) -> String {
    let bytes = |count: u16| -> Vec<u8> {
        (0..count).map(|i| cpu.read_byte(address.wrapping_add(i))).collect()
    };
    let byte_list = |count: u16| -> String {
        bytes(count)
            .into_iter()
            .map(|b| mode.byte(b))
            .collect::<Vec<_>>()
            .join(",")
    };
    match data.data_type {
        DataType::Byte => format!("db {}", mode.byte(cpu.read_byte(address))),
        DataType::Word => format!("dw {}", mode.word(cpu.read_word(address))),
        DataType::WordArray => {
            let words: Vec<String> = (0..data.byte_size / 2)
                .map(|i| mode.word(cpu.read_word(address.wrapping_add(i * 2))))
                .collect();
            format!("dw {}", words.join(","))
        }
        DataType::Text => {
            let text: String = bytes(data.byte_size)
                .into_iter()
                .map(|b| char::from(b & 0x7F))
                .collect();
            format!("ascii '{text}'")
        }
        DataType::Bitmap => {
            let row: String = bytes(data.byte_size)
                .into_iter()
                .map(|b| format!("{b:08b}").replace('0', ".").replace('1', "#"))
                .collect();
            format!("db {}  ; {row}", byte_list(data.byte_size))
        }
        DataType::Blob | DataType::ScreenPixels => {
            format!("db {}", mode.byte(cpu.read_byte(address)))
        }
        DataType::ByteArray | DataType::CharacterMap | DataType::ColAttr | DataType::Image => {
            format!("db {}", byte_list(data.byte_size))
        }
    }
}
