//! Per-CPU instruction decoder contract.
//!
//! The analysis store is CPU-agnostic. It asks a `Decoder` what the bytes at
//! an address mean and only looks at the length, the rendered text, the
//! control-flow effect and the operand.

use crate::CpuInterface;

/// How control leaves an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Falls through to the next instruction.
    Next,
    /// Unconditional jump.
    Jump(u16),
    /// Conditional jump. Execution may also fall through.
    ConditionalJump(u16),
    /// Subroutine call. Returns to the following instruction.
    Call(u16),
    Return,
    /// Jump through a register or memory. Target unknown statically.
    IndirectJump,
    /// Halts, or otherwise ends a linear run of code.
    Stop,
}

impl Flow {
    /// The statically known target of a jump or call.
    #[must_use]
    pub const fn target(self) -> Option<u16> {
        match self {
            Flow::Jump(t) | Flow::ConditionalJump(t) | Flow::Call(t) => Some(t),
            _ => None,
        }
    }

    /// Does execution continue at the following instruction?
    #[must_use]
    pub const fn falls_through(self) -> bool {
        matches!(self, Flow::Next | Flow::ConditionalJump(_) | Flow::Call(_))
    }
}

/// The non-control-flow operand of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operand {
    #[default]
    None,
    /// An absolute memory reference, e.g. `LD A,($4000)` or `LDA $D020`.
    Pointer(u16),
    /// An immediate 8-bit value.
    Immediate8(u8),
    /// An immediate 16-bit value.
    Immediate16(u16),
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub byte_size: u16,
    /// Mnemonic and operands as the decoder renders them.
    pub text: String,
    pub flow: Flow,
    pub operand: Operand,
}

/// Decodes instructions for one CPU family.
pub trait Decoder {
    /// Decode the instruction at `address`, reading bytes through `cpu`.
    ///
    /// Must always succeed. Undefined opcodes decode as a one-byte
    /// instruction that falls through.
    fn decode(&self, cpu: &dyn CpuInterface, address: u16) -> Instruction;
}
