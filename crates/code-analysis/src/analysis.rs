//! Static code analysis and code record maintenance.

use emu_core::{CpuInterface, Decoder, Flow, Instruction, Operand};
use log::debug;

use crate::item::{CodeEntry, CodeInfo, DataType, LabelType, OperandType, PatchState};
use crate::state::CodeAnalysisState;

impl CodeAnalysisState {
    /// Decode from `pc` without executing, following fall-through, jumps and
    /// calls until already-classified code or the end of a run.
    ///
    /// Jump targets get code labels and call targets get function labels,
    /// each with a reference from the branching instruction.
    pub fn run_static_code_analysis(
        &mut self,
        cpu: &dyn CpuInterface,
        decoder: &dyn Decoder,
        pc: u16,
    ) {
        let mut pending = vec![pc];
        let mut written = 0usize;
        while let Some(start) = pending.pop() {
            let mut address = start;
            loop {
                if self.read_page(address).is_none() || self.code_info(address).is_some() {
                    break;
                }
                let instruction = decoder.decode(cpu, address);
                self.write_code_info(cpu, address, &instruction);
                written += 1;

                match instruction.flow {
                    Flow::Call(target) => {
                        self.generate_label_for_address(target, LabelType::Function);
                        self.add_label_reference(target, address);
                        pending.push(target);
                    }
                    Flow::Jump(target) | Flow::ConditionalJump(target) => {
                        self.generate_label_for_address(target, LabelType::Code);
                        self.add_label_reference(target, address);
                        pending.push(target);
                    }
                    _ => {}
                }
                if !instruction.flow.falls_through() {
                    break;
                }
                let Some(next) = address.checked_add(instruction.byte_size) else {
                    break;
                };
                address = next;
            }
        }
        if written > 0 {
            debug!("static analysis from ${pc:04X}: {written} instructions");
            self.set_dirty();
        }
    }

    /// Add a generated label at `address` unless one exists.
    ///
    /// A function label replaces the type of an existing code label, since a
    /// call proves the address is a function entry.
    pub fn generate_label_for_address(&mut self, address: u16, label_type: LabelType) -> bool {
        if let Some(label) = self.label_mut(address) {
            if label_type == LabelType::Function && label.label_type == LabelType::Code {
                label.label_type = LabelType::Function;
                label.global = true;
                return true;
            }
            return false;
        }
        let name = Self::generated_label_name(address, label_type);
        self.add_label(address, &name, label_type).is_some()
    }

    fn write_code_info(&mut self, cpu: &dyn CpuInterface, pc: u16, instruction: &Instruction) {
        let mut info = CodeInfo::new(instruction.byte_size);
        info.text = self.render_code_text(cpu, pc, instruction);
        apply_operand(&mut info, instruction);
        self.replace_code_entry(pc, Some(CodeEntry::Instruction(info)));
        for i in 1..instruction.byte_size {
            let address = pc.wrapping_add(i);
            self.replace_code_entry(address, Some(CodeEntry::Operand { back: i }));
        }
        self.set_dirty();
    }

    /// Decode `pc` again and refresh the text and operand of its code record.
    /// Returns the instruction size. Creates the record if there is none.
    pub fn write_code_info_for_address(
        &mut self,
        cpu: &dyn CpuInterface,
        decoder: &dyn Decoder,
        pc: u16,
    ) -> u16 {
        let instruction = decoder.decode(cpu, pc);
        let text = self.render_code_text(cpu, pc, &instruction);
        let refresh_in_place = self.code_head_address(pc) == Some(pc)
            && self
                .code_info(pc)
                .is_some_and(|info| info.byte_size == instruction.byte_size);
        if refresh_in_place {
            if let Some(info) = self.code_info_mut(pc) {
                info.text = text;
                apply_operand(info, &instruction);
            }
        } else {
            self.write_code_info(cpu, pc, &instruction);
        }
        instruction.byte_size
    }

    /// Text of the instruction at `address`, regenerating it when it was
    /// dropped or the code modifies itself.
    pub fn code_text(
        &mut self,
        cpu: &dyn CpuInterface,
        decoder: &dyn Decoder,
        address: u16,
    ) -> Option<String> {
        let head = self.code_head_address(address)?;
        let info = self.code_info(head)?;
        if info.text.is_empty() || info.self_modifying {
            self.write_code_info_for_address(cpu, decoder, head);
        }
        self.code_info(head).map(|info| info.text.clone())
    }

    /// Regenerate the text of every code record in the mapped read space.
    pub fn re_analyse_code(&mut self, cpu: &dyn CpuInterface, decoder: &dyn Decoder) {
        for address in 0..=0xFFFFu16 {
            if self.table.read_page_id(address).is_some()
                && matches!(self.code_entry(address), Some(CodeEntry::Instruction(_)))
            {
                self.write_code_info_for_address(cpu, decoder, address);
            }
        }
    }

    fn render_code_text(
        &self,
        cpu: &dyn CpuInterface,
        pc: u16,
        instruction: &Instruction,
    ) -> String {
        if !self.config.show_opcode_values {
            return instruction.text.clone();
        }
        let bytes: Vec<String> = (0..instruction.byte_size)
            .map(|i| format!("{:02X}", cpu.read_byte(pc.wrapping_add(i))))
            .collect();
        format!("{:<12}{}", bytes.join(" "), instruction.text)
    }

    /// Replace an instruction with NOPs, or put the original bytes back.
    ///
    /// The original bytes are kept in the code record's patch state, so
    /// restoring always recovers exactly what was there.
    pub fn set_nop_patch(
        &mut self,
        cpu: &mut dyn CpuInterface,
        address: u16,
        enabled: bool,
    ) -> bool {
        let nop = cpu.cpu_type().nop_opcode();
        let Some(head) = self.code_head_address(address) else {
            return false;
        };
        let Some(info) = self.code_info_mut(head) else {
            return false;
        };
        info.patch = match (std::mem::take(&mut info.patch), enabled) {
            (PatchState::Normal, true) => {
                let original: Vec<u8> = (0..info.byte_size)
                    .map(|i| cpu.read_byte(head.wrapping_add(i)))
                    .collect();
                for i in 0..info.byte_size {
                    cpu.write_byte(head.wrapping_add(i), nop);
                }
                PatchState::Nopped { original }
            }
            (PatchState::Nopped { original }, false) => {
                for (i, &byte) in original.iter().enumerate() {
                    cpu.write_byte(head.wrapping_add(i as u16), byte);
                }
                PatchState::Normal
            }
            (unchanged, _) => {
                info.patch = unchanged;
                return false;
            }
        };
        info.text.clear();
        self.set_dirty();
        true
    }

    /// Toggle an execution breakpoint on the code at `address`.
    pub fn toggle_exec_breakpoint(&mut self, cpu: &mut dyn CpuInterface, address: u16) -> bool {
        let Some(head) = self.code_head_address(address) else {
            return false;
        };
        let enabled = cpu.toggle_exec_breakpoint_at_address(head);
        if let Some(info) = self.code_info_mut(head) {
            info.breakpointed = enabled;
        }
        enabled
    }

    /// Toggle a data breakpoint over the data record at `address`.
    pub fn toggle_data_breakpoint(&mut self, cpu: &mut dyn CpuInterface, address: u16) -> bool {
        let size = self.read_data(address).map_or(1, |d| d.byte_size.max(1));
        cpu.toggle_data_breakpoint_at_address(address, size)
    }

    /// Format runs of at least `min_length` printable bytes outside code as
    /// text, scanning from `start` to the end of memory. Returns how many
    /// strings were found.
    pub fn find_ascii_strings(
        &mut self,
        cpu: &dyn CpuInterface,
        start: u16,
        min_length: u16,
    ) -> usize {
        let mut found = 0;
        let mut address = u32::from(start);
        while address <= 0xFFFF {
            let run_start = address as u16;
            let mut length = 0u32;
            while address + length <= 0xFFFF {
                let a = (address + length) as u16;
                if self.table.read_page_id(a).is_none()
                    || self.code_entry(a).is_some()
                    || !is_printable(cpu.read_byte(a))
                {
                    break;
                }
                length += 1;
            }
            if length >= u32::from(min_length.max(1)) && length <= u32::from(u16::MAX) {
                if let Some(data) = self.read_data_mut(run_start) {
                    data.data_type = DataType::Text;
                    data.byte_size = length as u16;
                    data.bit7_terminator = false;
                }
                found += 1;
            }
            address += length.max(1);
        }
        if found > 0 {
            self.set_dirty();
        }
        found
    }

    /// First address at or after `start` where `pattern` appears.
    #[must_use]
    pub fn find_memory_pattern(
        &self,
        cpu: &dyn CpuInterface,
        pattern: &[u8],
        start: u16,
    ) -> Option<u16> {
        if pattern.is_empty() {
            return None;
        }
        let last = 0x10000usize.checked_sub(pattern.len())?;
        let from = usize::from(start);
        if let Some(memory) = cpu.mem_slice(start, 0x10000 - from) {
            return memory
                .windows(pattern.len())
                .position(|window| window == pattern)
                .map(|offset| (from + offset) as u16);
        }
        (from..=last).find_map(|address| {
            pattern
                .iter()
                .enumerate()
                .all(|(i, &b)| cpu.read_byte((address + i) as u16) == b)
                .then_some(address as u16)
        })
    }
}

fn apply_operand(info: &mut CodeInfo, instruction: &Instruction) {
    info.jump_address = instruction.flow.target();
    info.pointer_address = match instruction.operand {
        Operand::Pointer(address) => Some(address),
        _ => None,
    };
    info.operand_type = if info.jump_address.is_some() {
        OperandType::JumpAddress
    } else if info.pointer_address.is_some() {
        OperandType::Pointer
    } else {
        match instruction.operand {
            Operand::Immediate8(_) | Operand::Immediate16(_) => OperandType::Hex,
            _ => OperandType::Unknown,
        }
    };
}

pub(crate) fn is_printable(byte: u8) -> bool {
    (0x20..0x7F).contains(&byte)
}

#[cfg(test)]
mod tests {
    use emu_core::CpuType;
    use emu_core::testing::{FlatCpu, TestDecoder};

    use super::*;
    use crate::page::{PAGE_SIZE, Page, SLOT_COUNT};

    fn state() -> CodeAnalysisState {
        let mut state = CodeAnalysisState::default();
        for slot in 0..SLOT_COUNT {
            let id = state
                .register_page(Page::new((slot * PAGE_SIZE) as u16), &format!("RAM{slot}"))
                .unwrap();
            state.set_read_write_page(slot, id, id);
        }
        state
    }

    #[test]
    fn follows_jumps_and_calls() {
        let mut state = state();
        let mut cpu = FlatCpu::default();
        // 0100: CALL 0200 / JR Z,0108 / RET ... 0108: JP 0100
        cpu.load(0x100, &[0xCD, 0x00, 0x02, 0x28, 0x03, 0xC9]);
        cpu.load(0x108, &[0xC3, 0x00, 0x01]);
        cpu.load(0x200, &[0x00, 0xC9]);
        state.run_static_code_analysis(&cpu, &TestDecoder, 0x100);

        let expected = [(0x100, 3), (0x103, 2), (0x105, 1), (0x108, 3), (0x200, 1), (0x201, 1)];
        for (address, size) in expected {
            assert_eq!(state.code_info(address).map(|c| c.byte_size), Some(size), "{address:04X}");
        }
        assert!(state.code_info(0x106).is_none());
        assert_eq!(state.label(0x200).unwrap().name, "function_0200");
        assert_eq!(state.label(0x108).unwrap().name, "label_0108");
        assert_eq!(state.label(0x108).unwrap().label_type, LabelType::Code);
        assert!(state.is_dirty());
    }

    #[test]
    fn operands_are_recorded() {
        let mut state = state();
        let mut cpu = FlatCpu::default();
        cpu.load(0x100, &[0x3A, 0x00, 0x40, 0xC3, 0x00, 0x01]);
        state.run_static_code_analysis(&cpu, &TestDecoder, 0x100);
        let load = state.code_info(0x100).unwrap();
        assert_eq!(load.operand_type, OperandType::Pointer);
        assert_eq!(load.pointer_address, Some(0x4000));
        let jump = state.code_info(0x103).unwrap();
        assert_eq!(jump.operand_type, OperandType::JumpAddress);
        assert_eq!(jump.jump_address, Some(0x100));
        assert_eq!(jump.text, "JP $0100");
    }

    #[test]
    fn call_upgrades_code_label_to_function() {
        let mut state = state();
        state.add_label(0x300, "target", LabelType::Code);
        assert!(state.generate_label_for_address(0x300, LabelType::Function));
        assert_eq!(state.label(0x300).unwrap().label_type, LabelType::Function);
        assert!(!state.generate_label_for_address(0x300, LabelType::Code));
    }

    #[test]
    fn code_text_regenerates_self_modifying_code() {
        let mut state = state();
        let mut cpu = FlatCpu::default();
        cpu.load(0x100, &[0x3E, 0x05, 0xC9]);
        state.run_static_code_analysis(&cpu, &TestDecoder, 0x100);
        assert_eq!(state.code_text(&cpu, &TestDecoder, 0x100).as_deref(), Some("LD A,$05"));

        cpu.write_byte(0x101, 0x07);
        state.mark_self_modifying(0x101);
        assert_eq!(state.code_text(&cpu, &TestDecoder, 0x101).as_deref(), Some("LD A,$07"));
        assert!(state.code_info(0x100).unwrap().self_modifying);
    }

    #[test]
    fn opcode_values_prefix_text() {
        let mut state = state();
        state.config.show_opcode_values = true;
        let mut cpu = FlatCpu::default();
        cpu.load(0x100, &[0x3E, 0x05, 0xC9]);
        state.run_static_code_analysis(&cpu, &TestDecoder, 0x100);
        assert_eq!(state.code_info(0x100).unwrap().text, "3E 05       LD A,$05");
    }

    #[test]
    fn nop_patch_round_trip() {
        let mut state = state();
        let mut cpu = FlatCpu::new(CpuType::M6502);
        cpu.load(0x100, &[0xCD, 0x34, 0x12, 0xC9]);
        state.run_static_code_analysis(&cpu, &TestDecoder, 0x100);

        assert!(state.set_nop_patch(&mut cpu, 0x101, true));
        assert_eq!(&cpu.memory[0x100..0x103], [0xEA, 0xEA, 0xEA]);
        assert!(state.code_info(0x100).unwrap().is_nopped());
        assert!(!state.set_nop_patch(&mut cpu, 0x100, true));

        assert!(state.set_nop_patch(&mut cpu, 0x100, false));
        assert_eq!(&cpu.memory[0x100..0x103], [0xCD, 0x34, 0x12]);
        assert!(!state.code_info(0x100).unwrap().is_nopped());
        assert!(!state.set_nop_patch(&mut cpu, 0x100, false));
    }

    #[test]
    fn z80_nop_is_zero() {
        let mut state = state();
        let mut cpu = FlatCpu::new(CpuType::Z80);
        cpu.load(0x100, &[0x3E, 0x01, 0xC9]);
        state.run_static_code_analysis(&cpu, &TestDecoder, 0x100);
        state.set_nop_patch(&mut cpu, 0x100, true);
        assert_eq!(&cpu.memory[0x100..0x102], [0x00, 0x00]);
    }

    #[test]
    fn breakpoint_toggles_reach_cpu() {
        let mut state = state();
        let mut cpu = FlatCpu::default();
        cpu.load(0x100, &[0x3E, 0x01, 0xC9]);
        state.run_static_code_analysis(&cpu, &TestDecoder, 0x100);
        assert!(state.toggle_exec_breakpoint(&mut cpu, 0x101));
        assert!(cpu.is_address_breakpointed(0x100));
        assert!(state.code_info(0x100).unwrap().breakpointed);
        assert!(!state.toggle_exec_breakpoint(&mut cpu, 0x100));
        assert!(!state.code_info(0x100).unwrap().breakpointed);

        assert!(state.toggle_data_breakpoint(&mut cpu, 0x4000));
        assert!(cpu.data_breakpoints.contains(&(0x4000, 1)));
    }

    #[test]
    fn ascii_strings_are_formatted_as_text() {
        let mut state = state();
        let mut cpu = FlatCpu::default();
        cpu.load(0x5000, b"HELLO WORLD");
        cpu.load(0x5010, b"HI");
        assert_eq!(state.find_ascii_strings(&cpu, 0x5000, 4), 1);
        let data = state.read_data(0x5000).unwrap();
        assert_eq!(data.data_type, DataType::Text);
        assert_eq!(data.byte_size, 11);
        assert_eq!(state.read_data(0x5010).unwrap().data_type, DataType::Byte);
    }

    #[test]
    fn memory_pattern_search() {
        let cpu = {
            let mut cpu = FlatCpu::default();
            cpu.load(0x1234, &[0xDE, 0xAD, 0xBE, 0xEF]);
            cpu.load(0xFFFE, &[0xDE, 0xAD]);
            cpu
        };
        let state = state();
        assert_eq!(state.find_memory_pattern(&cpu, &[0xDE, 0xAD, 0xBE], 0), Some(0x1234));
        assert_eq!(state.find_memory_pattern(&cpu, &[0xDE, 0xAD], 0x1235), Some(0xFFFE));
        assert_eq!(state.find_memory_pattern(&cpu, &[0xDE, 0xAD, 0xBE], 0x1235), None);
        assert_eq!(state.find_memory_pattern(&cpu, &[], 0), None);
    }

    #[test]
    fn memory_pattern_search_without_direct_memory() {
        let mut cpu = FlatCpu::default();
        cpu.load(0x8000, &[0x01, 0x02, 0x03]);
        let state = state();
        assert_eq!(state.find_memory_pattern(&cpu, &[0x02, 0x03], 0x10), Some(0x8001));
        cpu.contiguous = false;
        assert!(cpu.mem_slice(0x8000, 3).is_none());
        assert_eq!(state.find_memory_pattern(&cpu, &[0x02, 0x03], 0x10), Some(0x8001));
        assert_eq!(state.find_memory_pattern(&cpu, &[0x02, 0x03], 0x8002), None);
    }
}
