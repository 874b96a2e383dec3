//! Analysis configuration.

use serde::{Deserialize, Serialize};

/// How numbers appear in rendered item text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NumberDisplayMode {
    Decimal,
    /// `$C000`
    #[default]
    HexDollar,
    /// `0C000h`
    HexAitch,
}

impl NumberDisplayMode {
    #[must_use]
    pub fn byte(self, value: u8) -> String {
        match self {
            NumberDisplayMode::Decimal => value.to_string(),
            NumberDisplayMode::HexDollar => format!("${value:02X}"),
            NumberDisplayMode::HexAitch => aitch(&format!("{value:02X}")),
        }
    }

    #[must_use]
    pub fn word(self, value: u16) -> String {
        match self {
            NumberDisplayMode::Decimal => value.to_string(),
            NumberDisplayMode::HexDollar => format!("${value:04X}"),
            NumberDisplayMode::HexAitch => aitch(&format!("{value:04X}")),
        }
    }
}

// Assemblers read a leading letter as a symbol, so A-F digits get a 0 prefix.
fn aitch(digits: &str) -> String {
    if digits.starts_with(|c: char| c.is_ascii_alphabetic()) {
        format!("0{digits}h")
    } else {
        format!("{digits}h")
    }
}

/// Settings for an analysis session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Prefix code text with the raw opcode bytes.
    pub show_opcode_values: bool,
    /// Record per-accessor reads and writes on data records.
    pub register_data_accesses: bool,
    /// Front ends may edit memory through the item views.
    pub allow_editing: bool,
    pub number_mode: NumberDisplayMode,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            show_opcode_values: false,
            register_data_accesses: true,
            allow_editing: false,
            number_mode: NumberDisplayMode::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
