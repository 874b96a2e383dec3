//! Test doubles for crates that consume `CpuInterface` and `Decoder`.

use std::collections::HashSet;

use crate::{CpuInterface, CpuType, Decoder, Flow, Instruction, Operand};

/// A flat 64K CPU with no banking and no execution.
///
/// Breakpoints and the stop state are plain flags so tests can assert on
/// what the analysis asked for.
pub struct FlatCpu {
    pub memory: Vec<u8>,
    pub pc: u16,
    pub sp: u16,
    pub cpu_type: CpuType,
    pub exec_breakpoints: HashSet<u16>,
    pub data_breakpoints: HashSet<(u16, u16)>,
    pub stopped: bool,
    pub exec_this_frame: bool,
    pub viewer: Option<(u16, u16)>,
    /// Whether `mem_slice` hands out memory directly.
    pub contiguous: bool,
}

impl FlatCpu {
    #[must_use]
    pub fn new(cpu_type: CpuType) -> Self {
        Self {
            memory: vec![0; 0x10000],
            pc: 0,
            sp: 0xFFFF,
            cpu_type,
            exec_breakpoints: HashSet::new(),
            data_breakpoints: HashSet::new(),
            stopped: false,
            exec_this_frame: true,
            viewer: None,
            contiguous: true,
        }
    }

    /// Copy `bytes` into memory starting at `address`.
    pub fn load(&mut self, address: u16, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            self.memory[(usize::from(address) + i) & 0xFFFF] = b;
        }
    }
}

impl Default for FlatCpu {
    fn default() -> Self {
        Self::new(CpuType::Z80)
    }
}

impl CpuInterface for FlatCpu {
    fn read_byte(&self, address: u16) -> u8 {
        self.memory[usize::from(address)]
    }

    fn mem_slice(&self, address: u16, len: usize) -> Option<&[u8]> {
        let start = usize::from(address);
        self.contiguous.then(|| self.memory.get(start..start + len)).flatten()
    }

    fn write_byte(&mut self, address: u16, value: u8) {
        self.memory[usize::from(address)] = value;
    }

    fn pc(&self) -> u16 {
        self.pc
    }

    fn sp(&self) -> u16 {
        self.sp
    }

    fn cpu_type(&self) -> CpuType {
        self.cpu_type
    }

    fn is_address_breakpointed(&self, address: u16) -> bool {
        self.exec_breakpoints.contains(&address)
    }

    fn toggle_exec_breakpoint_at_address(&mut self, address: u16) -> bool {
        if self.exec_breakpoints.remove(&address) {
            false
        } else {
            self.exec_breakpoints.insert(address);
            true
        }
    }

    fn toggle_data_breakpoint_at_address(&mut self, address: u16, size: u16) -> bool {
        if self.data_breakpoints.remove(&(address, size)) {
            false
        } else {
            self.data_breakpoints.insert((address, size));
            true
        }
    }

    fn break_exec(&mut self) {
        self.stopped = true;
    }

    fn continue_exec(&mut self) {
        self.stopped = false;
    }

    fn step_over(&mut self) {}
    fn step_into(&mut self) {}
    fn step_frame(&mut self) {}
    fn step_screen_write(&mut self) {}

    fn should_exec_this_frame(&self) -> bool {
        self.exec_this_frame && !self.stopped
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn graphics_viewer_set_view(&mut self, address: u16, width: u16) {
        self.viewer = Some((address, width));
    }
}

/// Decodes a small Z80 subset, enough to drive control-flow analysis.
///
/// | opcode | instruction | flow |
/// |--------|-------------|------|
/// | `00` | `NOP` | next |
/// | `3E n` | `LD A,n` | next |
/// | `3A nn` / `32 nn` | `LD A,(nn)` / `LD (nn),A` | next, pointer operand |
/// | `C3 nn` | `JP nn` | jump |
/// | `C2`/`CA`/`D2`/`DA nn` | `JP cc,nn` | conditional jump |
/// | `18 e` | `JR e` | jump |
/// | `20`/`28`/`30`/`38 e` | `JR cc,e` | conditional jump |
/// | `CD nn` | `CALL nn` | call |
/// | `C9` | `RET` | return |
/// | `E9` | `JP (HL)` | indirect |
/// | `76` | `HALT` | stop |
///
/// Anything else decodes as a one-byte `db`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TestDecoder;

const CONDITIONS: [&str; 4] = ["NZ", "Z", "NC", "C"];

impl Decoder for TestDecoder {
    fn decode(&self, cpu: &dyn CpuInterface, address: u16) -> Instruction {
        let op = cpu.read_byte(address);
        let n = cpu.read_byte(address.wrapping_add(1));
        let nn = cpu.read_word(address.wrapping_add(1));
        let relative = address.wrapping_add(2).wrapping_add_signed(i16::from(n as i8));

        let (byte_size, text, flow, operand) = match op {
            0x00 => (1, "NOP".to_string(), Flow::Next, Operand::None),
            0x3E => (2, format!("LD A,${n:02X}"), Flow::Next, Operand::Immediate8(n)),
            0x3A => (3, format!("LD A,(${nn:04X})"), Flow::Next, Operand::Pointer(nn)),
            0x32 => (3, format!("LD (${nn:04X}),A"), Flow::Next, Operand::Pointer(nn)),
            0xC3 => (3, format!("JP ${nn:04X}"), Flow::Jump(nn), Operand::None),
            0xC2 | 0xCA | 0xD2 | 0xDA => {
                let cc = CONDITIONS[usize::from((op >> 3) & 3)];
                (3, format!("JP {cc},${nn:04X}"), Flow::ConditionalJump(nn), Operand::None)
            }
            0x18 => (2, format!("JR ${relative:04X}"), Flow::Jump(relative), Operand::None),
            0x20 | 0x28 | 0x30 | 0x38 => {
                let cc = CONDITIONS[usize::from((op >> 3) & 3)];
                (
                    2,
                    format!("JR {cc},${relative:04X}"),
                    Flow::ConditionalJump(relative),
                    Operand::None,
                )
            }
            0xCD => (3, format!("CALL ${nn:04X}"), Flow::Call(nn), Operand::None),
            0xC9 => (1, "RET".to_string(), Flow::Return, Operand::None),
            0xE9 => (1, "JP (HL)".to_string(), Flow::IndirectJump, Operand::None),
            0x76 => (1, "HALT".to_string(), Flow::Stop, Operand::None),
            _ => (1, format!("db ${op:02X}"), Flow::Next, Operand::None),
        };

        Instruction {
            byte_size,
            text,
            flow,
            operand,
        }
    }
}
