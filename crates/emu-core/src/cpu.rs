//! CPU capability trait.

/// The CPU family behind a `CpuInterface`.
///
/// Only used where the analysis has to emit CPU-specific bytes, such as the
/// opcode written when an instruction is NOPped out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CpuType {
    #[default]
    Unknown,
    Z80,
    M6502,
}

impl CpuType {
    /// The single-byte NOP opcode for this CPU.
    #[must_use]
    pub const fn nop_opcode(self) -> u8 {
        match self {
            CpuType::M6502 => 0xEA,
            CpuType::Z80 | CpuType::Unknown => 0x00,
        }
    }
}

/// What the analysis store may ask of the emulated CPU.
///
/// Implemented once per CPU core, outside the analysis crates. Every call is
/// a plain side-effecting call; the store never batches them and never
/// assumes they are cheap enough to repeat within a single bus cycle.
pub trait CpuInterface {
    /// Read a byte through the CPU's current memory mapping.
    fn read_byte(&self, address: u16) -> u8;

    /// Read a little-endian word. The high byte wraps at $FFFF.
    fn read_word(&self, address: u16) -> u16 {
        let lo = self.read_byte(address);
        let hi = self.read_byte(address.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Borrow `len` bytes of memory starting at `address`, if the current
    /// mapping holds them contiguously. Banked cores can return `None` and
    /// callers fall back to `read_byte`.
    fn mem_slice(&self, _address: u16, _len: usize) -> Option<&[u8]> {
        None
    }

    /// Write a byte through the CPU's current memory mapping.
    fn write_byte(&mut self, address: u16, value: u8);

    /// Current program counter.
    fn pc(&self) -> u16;

    /// Current stack pointer.
    fn sp(&self) -> u16;

    fn cpu_type(&self) -> CpuType {
        CpuType::Unknown
    }

    // Breakpoints

    fn is_address_breakpointed(&self, address: u16) -> bool;

    /// Toggle an execution breakpoint. Returns the new state.
    fn toggle_exec_breakpoint_at_address(&mut self, address: u16) -> bool;

    /// Toggle a data breakpoint covering `size` bytes. Returns the new state.
    fn toggle_data_breakpoint_at_address(&mut self, address: u16, size: u16) -> bool;

    // Execution control

    fn break_exec(&mut self);
    fn continue_exec(&mut self);
    fn step_over(&mut self);
    fn step_into(&mut self);
    fn step_frame(&mut self);
    fn step_screen_write(&mut self);

    /// Will the emulator run instructions this host frame?
    fn should_exec_this_frame(&self) -> bool;
    fn is_stopped(&self) -> bool;

    /// Point an external graphics viewer at `address`, `width` bytes wide.
    fn graphics_viewer_set_view(&mut self, address: u16, width: u16);
}
