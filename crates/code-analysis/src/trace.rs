//! Runtime tracing hooks.
//!
//! The CPU core calls `register_code_executed` once per retired instruction
//! and `on_bus_cycle` once per bus cycle. Both are total: unmapped pages
//! and unknown addresses turn into no-ops, never errors.

use emu_core::{CpuInterface, Decoder, Flow};

use crate::state::CodeAnalysisState;

/// Deepest call stack tracked. Older frames are dropped first.
pub const MAX_CALL_DEPTH: usize = 256;

/// Direction of a bus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusAccess {
    /// Opcode fetch. Ignored by the tracer.
    Fetch,
    Read,
    Write,
}

/// One bus cycle as seen by the CPU core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusCycle {
    pub address: u16,
    pub value: u8,
    pub access: BusAccess,
}

impl BusCycle {
    #[must_use]
    pub const fn read(address: u16, value: u8) -> Self {
        Self {
            address,
            value,
            access: BusAccess::Read,
        }
    }

    #[must_use]
    pub const fn write(address: u16, value: u8) -> Self {
        Self {
            address,
            value,
            access: BusAccess::Write,
        }
    }
}

/// A call seen at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionCall {
    /// Address of the call instruction.
    pub call_address: u16,
    pub function_address: u16,
    pub return_address: u16,
}

impl CodeAnalysisState {
    /// Begin a host frame. The frame counter only moves while the CPU runs.
    pub fn start_frame(&mut self, cpu: &dyn CpuInterface) {
        if cpu.should_exec_this_frame() {
            self.frame = self.frame.wrapping_add(1);
        }
        self.frame_trace.clear();
    }

    /// Record that the instruction at `pc` retired and `next_pc` is next.
    ///
    /// Unclassified code is analysed on the spot. Returns true if the
    /// instruction is breakpointed; stopping is up to the caller.
    pub fn register_code_executed(
        &mut self,
        cpu: &dyn CpuInterface,
        decoder: &dyn Decoder,
        pc: u16,
        next_pc: u16,
    ) -> bool {
        if self.read_page(pc).is_none() {
            return false;
        }
        if self.code_info(pc).is_none() {
            self.run_static_code_analysis(cpu, decoder, pc);
        }

        let frame = self.frame;
        let mut breakpointed = false;
        if let Some(info) = self.code_info_mut(pc) {
            info.frame_last_executed = Some(frame);
            breakpointed = info.breakpointed;
        }
        self.frame_trace.push(pc);

        let sp = cpu.sp();
        self.stack_min = self.stack_min.min(sp);
        self.stack_max = self.stack_max.max(sp);

        let instruction = decoder.decode(cpu, pc);
        let return_address = pc.wrapping_add(instruction.byte_size);
        match instruction.flow {
            Flow::Call(target) if next_pc == target => {
                if self.call_stack.len() == MAX_CALL_DEPTH {
                    self.call_stack.remove(0);
                }
                self.call_stack.push(FunctionCall {
                    call_address: pc,
                    function_address: target,
                    return_address,
                });
                self.add_label_reference(target, pc);
            }
            Flow::Jump(target) | Flow::ConditionalJump(target) if next_pc == target => {
                self.add_label_reference(target, pc);
            }
            Flow::Return => {
                if let Some(depth) = self
                    .call_stack
                    .iter()
                    .rposition(|call| call.return_address == next_pc)
                {
                    self.call_stack.truncate(depth);
                }
            }
            _ => {}
        }

        breakpointed || cpu.is_address_breakpointed(pc)
    }

    /// Trace one bus cycle made by the instruction at `pc`.
    pub fn on_bus_cycle(&mut self, pc: u16, cycle: BusCycle) {
        match cycle.access {
            BusAccess::Fetch => {}
            BusAccess::Read => self.register_data_read(pc, cycle.address),
            BusAccess::Write => {
                self.register_data_write(pc, cycle.address);
                self.set_last_writer(cycle.address, pc);
                self.mark_self_modifying(cycle.address);
            }
        }
    }

    /// Count a read of `address` by the instruction at `pc`.
    pub fn register_data_read(&mut self, pc: u16, address: u16) {
        if !self.config.register_data_accesses {
            return;
        }
        let frame = self.frame;
        if let Some(data) = self.read_data_mut(address) {
            data.record_read(pc, frame);
        }
        self.add_label_reference(address, pc);
    }

    /// Count a write of `address` by the instruction at `pc`.
    pub fn register_data_write(&mut self, pc: u16, address: u16) {
        if !self.config.register_data_accesses {
            return;
        }
        let frame = self.frame;
        if let Some(data) = self.write_data_mut(address) {
            data.record_write(pc, frame);
        }
    }

    /// Flag the instruction covering `address` on the page the write lands
    /// in as self-modifying. ROM read under written RAM is left alone.
    ///
    /// Its text is dropped so it is regenerated from the new bytes.
    pub fn mark_self_modifying(&mut self, address: u16) {
        if let Some(info) = self.written_code_info_mut(address) {
            info.self_modifying = true;
            info.text.clear();
        }
    }

    pub fn register_interrupt_handler(&mut self, address: u16) {
        self.interrupt_handlers.insert(address);
    }

    #[must_use]
    pub fn interrupt_handlers(&self) -> impl Iterator<Item = u16> + '_ {
        self.interrupt_handlers.iter().copied()
    }

    /// Forget every read, write and label reference.
    pub fn reset_reference_info(&mut self) {
        for page in self.pages_mut() {
            page.clear_references();
        }
    }

    /// Brightness 0..=255 for how recently `address` executed.
    #[must_use]
    pub fn code_activity(&self, address: u16) -> u8 {
        activity(self.frame, self.code_info(address).and_then(|c| c.frame_last_executed))
    }

    /// Brightness 0..=255 for how recently `address` was read or written.
    #[must_use]
    pub fn data_activity(&self, address: u16) -> u8 {
        let last = self
            .read_data(address)
            .and_then(|d| d.last_frame_read.max(d.last_frame_written));
        activity(self.frame, last)
    }
}

// Fades over 64 frames. Never accessed counts as long ago.
fn activity(now: u32, last: Option<u32>) -> u8 {
    let frames = last.map_or(255, |last| now.wrapping_sub(last).min(255));
    255 - (frames << 2).min(255) as u8
}

#[cfg(test)]
mod tests {
    use emu_core::testing::{FlatCpu, TestDecoder};

    use super::*;
    use crate::item::LabelType;
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
    fn activity_fades() {
        assert_eq!(activity(10, Some(10)), 255);
        assert_eq!(activity(10, Some(9)), 251);
        assert_eq!(activity(100, Some(0)), 0);
        assert_eq!(activity(5, None), 0);
    }

    #[test]
    fn executing_classifies_and_stamps() {
        let mut state = state();
        let mut cpu = FlatCpu::default();
        cpu.load(0x100, &[0x3A, 0x00, 0x40, 0xC9]);
        state.frame = 7;
        assert!(!state.register_code_executed(&cpu, &TestDecoder, 0x100, 0x103));
        let info = state.code_info(0x100).unwrap();
        assert_eq!(info.byte_size, 3);
        assert_eq!(info.frame_last_executed, Some(7));
        assert_eq!(state.code_activity(0x100), 255);
        assert_eq!(state.frame_trace(), [0x100]);
    }

    #[test]
    fn breakpoints_signal_trap() {
        let mut state = state();
        let mut cpu = FlatCpu::default();
        cpu.load(0x200, &[0x00, 0xC9]);
        cpu.toggle_exec_breakpoint_at_address(0x200);
        assert!(state.register_code_executed(&cpu, &TestDecoder, 0x200, 0x201));

        cpu.toggle_exec_breakpoint_at_address(0x200);
        state.code_info_mut(0x201).unwrap().breakpointed = true;
        assert!(state.register_code_executed(&cpu, &TestDecoder, 0x201, 0x8000));
    }

    #[test]
    fn stack_range_tracks_sp() {
        let mut state = state();
        let mut cpu = FlatCpu::default();
        cpu.load(0x100, &[0x00, 0x00, 0xC9]);
        assert_eq!(state.stack_range(), None);
        cpu.sp = 0xFF00;
        state.register_code_executed(&cpu, &TestDecoder, 0x100, 0x101);
        cpu.sp = 0xFEF0;
        state.register_code_executed(&cpu, &TestDecoder, 0x101, 0x102);
        assert_eq!(state.stack_range(), Some((0xFEF0, 0xFF00)));
    }

    #[test]
    fn calls_and_returns_maintain_call_stack() {
        let mut state = state();
        let mut cpu = FlatCpu::default();
        cpu.load(0x100, &[0xCD, 0x00, 0x80, 0x76]);
        cpu.load(0x8000, &[0xC9]);

        state.register_code_executed(&cpu, &TestDecoder, 0x100, 0x8000);
        assert_eq!(
            state.call_stack(),
            [FunctionCall {
                call_address: 0x100,
                function_address: 0x8000,
                return_address: 0x103
            }]
        );
        let label = state.label(0x8000).unwrap();
        assert_eq!(label.label_type, LabelType::Function);
        assert_eq!(label.references.get(&0x100), Some(&2));

        state.register_code_executed(&cpu, &TestDecoder, 0x8000, 0x103);
        assert!(state.call_stack().is_empty());
    }

    #[test]
    fn writes_set_last_writer_and_sticky_self_modifying() {
        let mut state = state();
        let mut cpu = FlatCpu::default();
        cpu.load(0x100, &[0x3E, 0x05, 0xC9]);
        state.register_code_executed(&cpu, &TestDecoder, 0x100, 0x102);
        assert!(!state.code_info(0x100).unwrap().self_modifying);

        state.on_bus_cycle(0x9000, BusCycle::write(0x101, 0x06));
        assert_eq!(state.last_writer(0x101), Some(0x9000));
        assert!(state.code_info(0x100).unwrap().self_modifying);
        assert_eq!(state.read_data(0x101).unwrap().writes[&0x9000].count, 1);

        state.register_code_executed(&cpu, &TestDecoder, 0x100, 0x102);
        state.on_bus_cycle(0x9000, BusCycle::read(0x101, 0x06));
        assert!(state.code_info(0x100).unwrap().self_modifying);
    }

    #[test]
    fn operand_write_on_a_page_seen_at_another_address() {
        let mut state = CodeAnalysisState::default();
        let bank = state.register_page(Page::new(0xC000), "Bank5").unwrap();
        state.set_read_write_page(48, bank, bank);
        let mut cpu = FlatCpu::default();
        cpu.load(0xC000, &[0x3A, 0x00, 0x40, 0xC9]);
        state.register_code_executed(&cpu, &TestDecoder, 0xC000, 0xC003);

        state.set_read_write_page(16, bank, bank);
        assert_eq!(state.code_head_address(0x4001), Some(0x4000));
        assert_eq!(state.code_info(0x4002).map(|c| c.byte_size), Some(3));
        state.on_bus_cycle(0x9000, BusCycle::write(0x4001, 0x10));
        assert!(state.code_info(0x4000).unwrap().self_modifying);
        assert!(state.code_info(0xC000).unwrap().self_modifying);
    }

    #[test]
    fn write_into_ram_under_rom_leaves_rom_code_alone() {
        let mut state = CodeAnalysisState::default();
        let rom = state.register_page(Page::new(0xA000), "Basic").unwrap();
        let ram = state.register_page(Page::new(0xA000), "RAM").unwrap();
        state.set_read_write_page(40, rom, ram);
        let mut cpu = FlatCpu::default();
        cpu.load(0xA000, &[0x3E, 0x01, 0xC9]);
        state.register_code_executed(&cpu, &TestDecoder, 0xA000, 0xA002);

        state.on_bus_cycle(0x0900, BusCycle::write(0xA000, 0x00));
        assert!(!state.code_info(0xA000).unwrap().self_modifying);
        assert_eq!(state.page(ram).unwrap().last_writer(0), 0x0900);

        state.set_read_write_page(40, ram, ram);
        state.register_code_executed(&cpu, &TestDecoder, 0xA000, 0xA002);
        state.set_read_page(40, rom);
        state.on_bus_cycle(0x0900, BusCycle::write(0xA001, 0x02));
        assert!(!state.code_info(0xA000).unwrap().self_modifying);
        assert!(state.page(ram).unwrap().code_head(0).unwrap().self_modifying);
    }

    #[test]
    fn access_counters_saturate() {
        let mut state = state();
        state.add_label(0x10, "poll", LabelType::Data);
        state.on_bus_cycle(0x100, BusCycle::read(0x10, 0));
        state.read_data_mut(0x10).unwrap().reads.get_mut(&0x100).unwrap().count = u32::MAX;
        *state.label_mut(0x10).unwrap().references.get_mut(&0x100).unwrap() = u32::MAX;
        state.on_bus_cycle(0x100, BusCycle::read(0x10, 0));
        assert_eq!(state.read_data(0x10).unwrap().reads[&0x100].count, u32::MAX);
        assert_eq!(state.label(0x10).unwrap().references[&0x100], u32::MAX);
    }

    #[test]
    fn fetches_are_ignored() {
        let mut state = state();
        state.on_bus_cycle(
            0x100,
            BusCycle {
                address: 0x4000,
                value: 0,
                access: BusAccess::Fetch,
            },
        );
        assert!(state.read_data(0x4000).unwrap().reads.is_empty());
    }

    #[test]
    fn data_access_registration_can_be_disabled() {
        let mut state = state();
        state.config.register_data_accesses = false;
        state.on_bus_cycle(0x100, BusCycle::read(0x4000, 0));
        state.on_bus_cycle(0x100, BusCycle::write(0x4001, 0));
        assert!(state.read_data(0x4000).unwrap().reads.is_empty());
        assert!(state.read_data(0x4001).unwrap().writes.is_empty());
        assert_eq!(state.last_writer(0x4001), Some(0x100));
    }

    #[test]
    fn frames_advance_only_while_running() {
        let mut state = state();
        let mut cpu = FlatCpu::default();
        state.frame_trace.push(1);
        state.start_frame(&cpu);
        assert_eq!(state.current_frame(), 1);
        assert!(state.frame_trace().is_empty());
        cpu.break_exec();
        state.start_frame(&cpu);
        assert_eq!(state.current_frame(), 1);
    }

    #[test]
    fn reset_reference_info_clears_history() {
        let mut state = state();
        state.add_label(0x4000, "table", LabelType::Data);
        state.on_bus_cycle(0x100, BusCycle::read(0x4000, 0));
        assert_eq!(state.data_activity(0x4000), 255);
        state.reset_reference_info();
        assert!(state.read_data(0x4000).unwrap().reads.is_empty());
        assert!(state.label(0x4000).unwrap().references.is_empty());
        assert_eq!(state.data_activity(0x4000), 0);
    }

    #[test]
    fn unmapped_pc_is_a_no_op() {
        let mut state = CodeAnalysisState::default();
        let cpu = FlatCpu::default();
        assert!(!state.register_code_executed(&cpu, &TestDecoder, 0x100, 0x101));
        state.on_bus_cycle(0x100, BusCycle::write(0x200, 1));
        assert!(state.frame_trace().is_empty());
    }

    #[test]
    fn interrupt_handlers_are_a_set() {
        let mut state = state();
        state.register_interrupt_handler(0xFF48);
        state.register_interrupt_handler(0xEA31);
        state.register_interrupt_handler(0xFF48);
        assert_eq!(state.interrupt_handlers().collect::<Vec<_>>(), [0xEA31, 0xFF48]);
    }
}
