//! Spectrum model configuration.

/// Supported Spectrum models.
///
/// Selects how many ROM and RAM banks get analysis pages and whether the
/// `$7FFD` paging port is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumModel {
    Spectrum48K,
    Spectrum128K,
}

impl SpectrumModel {
    /// Number of 16K ROM banks.
    #[must_use]
    pub const fn rom_banks(self) -> usize {
        match self {
            Self::Spectrum48K => 1,
            Self::Spectrum128K => 2,
        }
    }

    /// Number of 16K RAM banks.
    #[must_use]
    pub const fn ram_banks(self) -> usize {
        match self {
            Self::Spectrum48K => 3,
            Self::Spectrum128K => 8,
        }
    }

    /// RAM banks mapped at $4000, $8000 and $C000 after reset.
    #[must_use]
    pub const fn default_ram_banks(self) -> [usize; 3] {
        match self {
            Self::Spectrum48K => [0, 1, 2],
            Self::Spectrum128K => [5, 2, 0],
        }
    }

    /// ROM bank holding the 48K BASIC ROM.
    #[must_use]
    pub const fn basic_rom_bank(self) -> usize {
        match self {
            Self::Spectrum48K => 0,
            Self::Spectrum128K => 1,
        }
    }

    /// Whether writes to `$7FFD` switch banks.
    #[must_use]
    pub const fn has_paging(self) -> bool {
        matches!(self, Self::Spectrum128K)
    }
}
