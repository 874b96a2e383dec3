//! C64 page layout and CPU port banking.
//!
//! The analysis pages mirror the C64 memory map:
//!
//! | Region   | Address       | Slots | Pages |
//! |----------|---------------|-------|-------|
//! | RAM      | $0000-$FFFF   | 0-63  | 64    |
//! | BASIC    | $A000-$BFFF   | 40-47 | 8     |
//! | I/O      | $D000-$DFFF   | 52-55 | 4     |
//! | Char ROM | $D000-$DFFF   | 52-55 | 4     |
//! | Kernal   | $E000-$FFFF   | 56-63 | 8     |
//!
//! Slots below 40 and 48-51 are always RAM. Elsewhere the 6510 port at $01
//! decides what is read; writes under a ROM always land in RAM.

use code_analysis::{BusCycle, CodeAnalysisState, PAGE_SIZE, Page, PageId, Result, SLOT_COUNT};
use emu_core::{CpuInterface, Decoder, Observable, Value};
use log::{debug, warn};

use crate::io_labels::add_io_labels;

/// CHAREN bit of the CPU port: I/O when set, character ROM when clear.
pub const CPU_PORT_CHAREN: u8 = 0x01;
/// LORAM bit of the CPU port.
pub const CPU_PORT_LORAM: u8 = 0x02;
/// HIRAM bit of the CPU port.
pub const CPU_PORT_HIRAM: u8 = 0x04;

const PORT_BANK_BITS: u8 = CPU_PORT_HIRAM | CPU_PORT_LORAM | CPU_PORT_CHAREN;

const BASIC_SLOT: usize = 40;
const HIGH_RAM_SLOT: usize = 48;
const IO_SLOT: usize = 52;
const KERNAL_SLOT: usize = 56;

const IRQ_VECTOR: u16 = 0xFFFE;

/// Which overlays the CPU currently sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappedRegions {
    pub basic: bool,
    pub kernal: bool,
    pub io: bool,
    pub char_rom: bool,
}

/// C64 bindings for a `CodeAnalysisState`.
///
/// Owns the page ids of every C64 region and tracks the CPU port so the
/// read table follows bank switches.
#[derive(Debug)]
pub struct C64Analysis {
    ram: Vec<PageId>,
    basic: Vec<PageId>,
    io: Vec<PageId>,
    char_rom: Vec<PageId>,
    kernal: Vec<PageId>,
    last_port: u8,
    last_pc: u16,
    mapped: MappedRegions,
}

impl C64Analysis {
    /// Register the C64 pages, map them for the power-on port value and name
    /// the I/O registers.
    pub fn new(state: &mut CodeAnalysisState) -> Result<Self> {
        let mut machine = Self {
            ram: register(state, "RAM", 0, SLOT_COUNT)?,
            basic: register(state, "Basic", BASIC_SLOT, 8)?,
            io: register(state, "IO", IO_SLOT, 4)?,
            char_rom: register(state, "CharROM", IO_SLOT, 4)?,
            kernal: register(state, "Kernal", KERNAL_SLOT, 8)?,
            last_port: PORT_BANK_BITS,
            last_pc: 0,
            mapped: MappedRegions::default(),
        };
        machine.map_fixed(state);
        add_io_labels(state, &machine.io);
        machine.update_pages(state, PORT_BANK_BITS);
        Ok(machine)
    }

    // RAM that no overlay ever covers, plus the write side of the ROM areas.
    fn map_fixed(&self, state: &mut CodeAnalysisState) {
        for (slot, &ram) in self.ram.iter().enumerate() {
            if slot < BASIC_SLOT || (HIGH_RAM_SLOT..IO_SLOT).contains(&slot) {
                state.set_read_write_page(slot, ram, ram);
            } else if !(IO_SLOT..KERNAL_SLOT).contains(&slot) {
                state.set_write_page(slot, ram);
            }
        }
    }

    /// Remap BASIC, I/O, character ROM and Kernal for a CPU port value.
    pub fn update_pages(&mut self, state: &mut CodeAnalysisState, port: u8) {
        let mut mapped = MappedRegions::default();
        if port & (CPU_PORT_HIRAM | CPU_PORT_LORAM) == 0 {
            self.map_overlay(state, BASIC_SLOT, SLOT_COUNT - BASIC_SLOT, None);
        } else {
            mapped.basic = port & (CPU_PORT_HIRAM | CPU_PORT_LORAM)
                == (CPU_PORT_HIRAM | CPU_PORT_LORAM);
            mapped.kernal = port & CPU_PORT_HIRAM != 0;
            mapped.io = port & CPU_PORT_CHAREN != 0;
            mapped.char_rom = !mapped.io;

            let basic = mapped.basic.then_some(self.basic.as_slice());
            self.map_overlay(state, BASIC_SLOT, self.basic.len(), basic);
            let kernal = mapped.kernal.then_some(self.kernal.as_slice());
            self.map_overlay(state, KERNAL_SLOT, self.kernal.len(), kernal);
            if mapped.io {
                for (i, &io) in self.io.iter().enumerate() {
                    state.set_read_write_page(IO_SLOT + i, io, io);
                }
            } else {
                let char_rom = Some(self.char_rom.as_slice());
                self.map_overlay(state, IO_SLOT, self.char_rom.len(), char_rom);
            }
        }
        debug!("cpu port ${port:02X}: {mapped:?}");
        self.mapped = mapped;
        state.set_dirty();
    }

    // Read from `overlay` (or RAM when `None`), write to RAM.
    fn map_overlay(
        &self,
        state: &mut CodeAnalysisState,
        first_slot: usize,
        count: usize,
        overlay: Option<&[PageId]>,
    ) {
        for i in 0..count {
            let slot = first_slot + i;
            let ram = self.ram[slot];
            let read = overlay.map_or(ram, |pages| pages[i]);
            state.set_read_write_page(slot, read, ram);
        }
    }

    /// Remap if the banking bits of `port` differ from the last remap.
    /// Returns true when the tables changed.
    pub fn check_port(&mut self, state: &mut CodeAnalysisState, port: u8) -> bool {
        if (port ^ self.last_port) & PORT_BANK_BITS == 0 {
            return false;
        }
        self.update_pages(state, port);
        self.last_port = port & PORT_BANK_BITS;
        true
    }

    /// Per-instruction hook. `pc` is the address of the next instruction;
    /// the one that just retired is the previous call's `pc`.
    ///
    /// Returns true if the retired instruction is breakpointed.
    pub fn on_instruction(
        &mut self,
        state: &mut CodeAnalysisState,
        cpu: &dyn CpuInterface,
        decoder: &dyn Decoder,
        pc: u16,
    ) -> bool {
        let hit = state.register_code_executed(cpu, decoder, self.last_pc, pc);
        self.last_pc = pc;
        hit
    }

    /// Per-bus-cycle hook. An IRQ vector fetch records the handler it
    /// points at.
    pub fn on_bus_cycle(
        &mut self,
        state: &mut CodeAnalysisState,
        cpu: &dyn CpuInterface,
        pc: u16,
        cycle: BusCycle,
        irq: bool,
    ) {
        if irq && matches!(cycle.address, 0xFFFE | 0xFFFF) {
            state.register_interrupt_handler(cpu.read_word(IRQ_VECTOR));
        }
        state.on_bus_cycle(pc, cycle);
    }

    /// Pages in save order: RAM, I/O, BASIC, Kernal, character ROM.
    #[must_use]
    pub fn save_order(&self) -> Vec<PageId> {
        [&self.ram, &self.io, &self.basic, &self.kernal, &self.char_rom]
            .into_iter()
            .flatten()
            .copied()
            .collect()
    }

    pub fn save_analysis(&self, state: &CodeAnalysisState) -> Result<Vec<u8>> {
        state.write_pages(&self.save_order())
    }

    pub fn load_analysis(&self, state: &mut CodeAnalysisState, bytes: &[u8]) -> Result<()> {
        state.read_pages(&self.save_order(), bytes)
    }

    /// Forget all annotation and session state, keeping the current banking.
    pub fn reset(&mut self, state: &mut CodeAnalysisState) {
        state.reset_session();
        state.reset_pages(&self.save_order());
        self.map_fixed(state);
        self.update_pages(state, self.last_port);
        self.last_pc = 0;
    }

    /// Start analysing a new program. Loads `saved` if given and valid,
    /// otherwise seeds the I/O register labels. Returns true if saved
    /// analysis was loaded.
    pub fn start_session(&mut self, state: &mut CodeAnalysisState, saved: Option<&[u8]>) -> bool {
        self.reset(state);
        let loaded = match saved.map(|bytes| self.load_analysis(state, bytes)) {
            Some(Ok(())) => true,
            Some(Err(err)) => {
                warn!("discarding saved analysis: {err}");
                false
            }
            None => false,
        };
        if !loaded {
            add_io_labels(state, &self.io);
        }
        state.generate_global_info();
        loaded
    }

    #[must_use]
    pub fn mapped(&self) -> MappedRegions {
        self.mapped
    }

    /// Banking bits of the port value the tables were last built for.
    #[must_use]
    pub fn last_port(&self) -> u8 {
        self.last_port
    }

    #[must_use]
    pub fn ram_pages(&self) -> &[PageId] {
        &self.ram
    }

    #[must_use]
    pub fn io_pages(&self) -> &[PageId] {
        &self.io
    }
}

fn register(
    state: &mut CodeAnalysisState,
    prefix: &str,
    first_slot: usize,
    count: usize,
) -> Result<Vec<PageId>> {
    (0..count)
        .map(|i| {
            let base = ((first_slot + i) * PAGE_SIZE) as u16;
            state.register_page(Page::new(base), &format!("{prefix}[{i:02X}]"))
        })
        .collect()
}

impl Observable for C64Analysis {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "port" => Some(Value::Count(u64::from(self.last_port))),
            "last_pc" => Some(self.last_pc.into()),
            "mapped.basic" => Some(self.mapped.basic.into()),
            "mapped.kernal" => Some(self.mapped.kernal.into()),
            "mapped.io" => Some(self.mapped.io.into()),
            "mapped.char_rom" => Some(self.mapped.char_rom.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "port",
            "last_pc",
            "mapped.basic",
            "mapped.kernal",
            "mapped.io",
            "mapped.char_rom",
        ]
    }
}
