//! Core traits for code analysis of emulated 8-bit machines.
//!
//! The analysis store never talks to a CPU core directly. Everything it needs
//! from the emulator goes through `CpuInterface`, and instruction decoding
//! goes through a per-CPU `Decoder`.

mod cpu;
mod decode;
mod observable;
#[cfg(feature = "test-utils")]
pub mod testing;

pub use cpu::{CpuInterface, CpuType};
pub use decode::{Decoder, Flow, Instruction, Operand};
pub use observable::{Observable, Value};
