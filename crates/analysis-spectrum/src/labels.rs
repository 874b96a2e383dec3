//! Well-known addresses of the 48K BASIC ROM and its RAM.

use code_analysis::{CodeAnalysisState, DataType, LabelType};

pub(crate) const SCREEN_PIXELS: u16 = 0x4000;
pub(crate) const SCREEN_ATTRIBUTES: u16 = 0x5800;

/// ROM entry points in the 48K BASIC ROM.
pub(crate) const ROM_LABELS: &[(u16, &str, LabelType)] = &[
    (0x0000, "START", LabelType::Function),
    (0x0008, "ERROR_1", LabelType::Function),
    (0x0010, "PRINT_A_1", LabelType::Function),
    (0x0018, "GET_CHAR", LabelType::Function),
    (0x0020, "NEXT_CHAR", LabelType::Function),
    (0x0028, "FP_CALC", LabelType::Function),
    (0x0030, "BC_SPACES", LabelType::Function),
    (0x0038, "MASK_INT", LabelType::Function),
    (0x0066, "RESET", LabelType::Function),
    (0x028E, "KEY_SCAN", LabelType::Function),
    (0x03B5, "BEEPER", LabelType::Function),
    (0x04C2, "SA_BYTES", LabelType::Function),
    (0x0556, "LD_BYTES", LabelType::Function),
    (0x0D6B, "CLS", LabelType::Function),
    (0x11B7, "NEW", LabelType::Function),
    (0x3D00, "CHAR_SET", LabelType::Data),
];

/// System variables, always in the RAM at $5C00.
const SYSTEM_VARIABLES: &[(u16, &str)] = &[
    (0x5C00, "KSTATE"),
    (0x5C08, "LAST_K"),
    (0x5C36, "CHARS"),
    (0x5C3A, "ERR_NR"),
    (0x5C3B, "FLAGS"),
    (0x5C3D, "ERR_SP"),
    (0x5C48, "BORDCR"),
    (0x5C4B, "VARS"),
    (0x5C53, "PROG"),
    (0x5C59, "E_LINE"),
    (0x5C65, "STKEND"),
    (0x5C78, "FRAMES"),
    (0x5C7B, "UDG"),
    (0x5C8D, "ATTR_P"),
    (0x5CB2, "RAMTOP"),
    (0x5CB4, "P_RAMT"),
];

/// Label and shape the screen memory and system variables of whatever RAM
/// is mapped at $4000.
pub(crate) fn add_system_labels(state: &mut CodeAnalysisState) {
    state.add_label(SCREEN_PIXELS, "ScreenPixels", LabelType::Data);
    if let Some(pixels) = state.read_data_mut(SCREEN_PIXELS) {
        pixels.data_type = DataType::ScreenPixels;
        pixels.byte_size = 0x1800;
    }
    state.add_label(SCREEN_ATTRIBUTES, "ScreenAttributes", LabelType::Data);
    if let Some(attributes) = state.read_data_mut(SCREEN_ATTRIBUTES) {
        attributes.data_type = DataType::ColAttr;
        attributes.byte_size = 0x300;
    }
    for &(address, name) in SYSTEM_VARIABLES {
        state.add_label(address, name, LabelType::Data);
    }
}
