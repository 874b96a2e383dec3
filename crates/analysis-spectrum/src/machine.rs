//! Spectrum page layout and `$7FFD` paging.
//!
//! Every 16K bank gets sixteen analysis pages. ROM sits in slots 0-15,
//! then three RAM banks fill $4000-$FFFF. On the 128K the bank at $C000
//! and the ROM follow the `$7FFD` port until its lock bit is set.

use code_analysis::{CodeAnalysisState, LabelType, PAGE_SIZE, Page, PageId, Result};
use emu_core::{CpuInterface, Decoder, Observable, Value};
use log::{debug, warn};

use crate::config::SpectrumModel;
use crate::labels::{ROM_LABELS, add_system_labels};

/// Analysis pages per 16K bank.
pub const PAGES_PER_BANK: usize = 16;

const RAM_FIRST_SLOT: usize = PAGES_PER_BANK;
const PAGED_SLOT: usize = 3 * PAGES_PER_BANK;

const PAGING_PORT_MASK: u16 = 0x8002;
const PAGING_ROM_BIT: u8 = 0x10;
const PAGING_LOCK_BIT: u8 = 0x20;
const PAGING_RAM_MASK: u8 = 0x07;

/// Spectrum bindings for a `CodeAnalysisState`.
#[derive(Debug)]
pub struct SpectrumAnalysis {
    model: SpectrumModel,
    rom: Vec<Vec<PageId>>,
    ram: Vec<Vec<PageId>>,
    rom_bank: usize,
    paged_bank: usize,
    paging_locked: bool,
    last_pc: u16,
}

impl SpectrumAnalysis {
    /// Register the model's ROM and RAM banks and map them as after reset.
    pub fn new(state: &mut CodeAnalysisState, model: SpectrumModel) -> Result<Self> {
        let [_, _, paged_bank] = model.default_ram_banks();
        let machine = Self {
            model,
            rom: register_banks(state, "ROM", model.rom_banks(), |_| 0)?,
            ram: register_banks(state, "RAM", model.ram_banks(), |bank| {
                let slot = model
                    .default_ram_banks()
                    .iter()
                    .position(|&b| b == bank)
                    .map_or(PAGED_SLOT, |i| RAM_FIRST_SLOT + i * PAGES_PER_BANK);
                (slot * PAGE_SIZE) as u16
            })?,
            rom_bank: 0,
            paged_bank,
            paging_locked: false,
            last_pc: 0,
        };
        machine.map_all(state);
        Ok(machine)
    }

    #[must_use]
    pub fn model(&self) -> SpectrumModel {
        self.model
    }

    fn map_all(&self, state: &mut CodeAnalysisState) {
        let [low, middle, _] = self.model.default_ram_banks();
        map_bank(state, 0, &self.rom[self.rom_bank]);
        map_bank(state, RAM_FIRST_SLOT, &self.ram[low]);
        map_bank(state, RAM_FIRST_SLOT + PAGES_PER_BANK, &self.ram[middle]);
        map_bank(state, PAGED_SLOT, &self.ram[self.paged_bank]);
        state.set_dirty();
    }

    /// Select the ROM at $0000. Out of range banks are ignored.
    pub fn set_rom_bank(&mut self, state: &mut CodeAnalysisState, bank: usize) -> bool {
        let Some(pages) = self.rom.get(bank) else {
            warn!("no ROM bank {bank} on {:?}", self.model);
            return false;
        };
        if bank != self.rom_bank {
            map_bank(state, 0, pages);
            self.rom_bank = bank;
            state.set_dirty();
            debug!("ROM bank {bank} at $0000");
        }
        true
    }

    /// Select the RAM bank at $C000. Out of range banks are ignored.
    pub fn set_paged_bank(&mut self, state: &mut CodeAnalysisState, bank: usize) -> bool {
        let Some(pages) = self.ram.get(bank) else {
            warn!("no RAM bank {bank} on {:?}", self.model);
            return false;
        };
        if bank != self.paged_bank {
            map_bank(state, PAGED_SLOT, pages);
            self.paged_bank = bank;
            state.set_dirty();
            debug!("RAM bank {bank} at $C000");
        }
        true
    }

    /// Port write hook. Returns true if the write reached the paging
    /// register, even when the mapping was already current.
    pub fn on_port_write(&mut self, state: &mut CodeAnalysisState, port: u16, value: u8) -> bool {
        if !self.model.has_paging() || port & PAGING_PORT_MASK != 0 {
            return false;
        }
        self.write_paging_register(state, value)
    }

    /// Apply a `$7FFD` value unless paging is locked.
    pub fn write_paging_register(&mut self, state: &mut CodeAnalysisState, value: u8) -> bool {
        if self.paging_locked {
            return false;
        }
        self.set_rom_bank(state, usize::from((value & PAGING_ROM_BIT) >> 4));
        self.set_paged_bank(state, usize::from(value & PAGING_RAM_MASK));
        self.paging_locked = value & PAGING_LOCK_BIT != 0;
        true
    }

    #[must_use]
    pub fn is_paging_locked(&self) -> bool {
        self.paging_locked
    }

    #[must_use]
    pub fn rom_bank(&self) -> usize {
        self.rom_bank
    }

    #[must_use]
    pub fn paged_bank(&self) -> usize {
        self.paged_bank
    }

    #[must_use]
    pub fn rom_pages(&self, bank: usize) -> Option<&[PageId]> {
        self.rom.get(bank).map(Vec::as_slice)
    }

    #[must_use]
    pub fn ram_pages(&self, bank: usize) -> Option<&[PageId]> {
        self.ram.get(bank).map(Vec::as_slice)
    }

    /// Per-instruction hook; the retired instruction is the previous `pc`.
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

    /// Pages in save order: every RAM bank, then every ROM bank.
    #[must_use]
    pub fn save_order(&self) -> Vec<PageId> {
        self.ram
            .iter()
            .chain(&self.rom)
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

    /// Forget all annotation and unlock paging. The mapping returns to the
    /// reset layout.
    pub fn reset(&mut self, state: &mut CodeAnalysisState) {
        state.reset_session();
        state.reset_pages(&self.save_order());
        let [_, _, paged_bank] = self.model.default_ram_banks();
        self.rom_bank = 0;
        self.paged_bank = paged_bank;
        self.paging_locked = false;
        self.last_pc = 0;
        self.map_all(state);
    }

    /// Label the 48K BASIC ROM entry points, screen memory and system
    /// variables. ROM code labels are analysed when that ROM is mapped.
    pub fn insert_default_labels(
        &self,
        state: &mut CodeAnalysisState,
        cpu: &dyn CpuInterface,
        decoder: &dyn Decoder,
    ) {
        let basic_rom = self.model.basic_rom_bank();
        let analyse = basic_rom == self.rom_bank;
        if let Some(pages) = self.rom.get(basic_rom) {
            for &(address, name, label_type) in ROM_LABELS {
                let page = pages[usize::from(address) / PAGE_SIZE];
                state.set_label_for_page_address(page, address, name, label_type);
                if analyse && label_type != LabelType::Data {
                    state.run_static_code_analysis(cpu, decoder, address);
                }
            }
        }
        add_system_labels(state);
        state.generate_global_info();
    }

    /// Start analysing a new program. Loads `saved` if given and valid,
    /// otherwise inserts the default labels. Returns true if saved analysis
    /// was loaded.
    pub fn start_session(
        &mut self,
        state: &mut CodeAnalysisState,
        cpu: &dyn CpuInterface,
        decoder: &dyn Decoder,
        saved: Option<&[u8]>,
    ) -> bool {
        self.reset(state);
        let loaded = match saved.map(|bytes| self.load_analysis(state, bytes)) {
            Some(Ok(())) => true,
            Some(Err(err)) => {
                warn!("discarding saved analysis: {err}");
                false
            }
            None => false,
        };
        if loaded {
            state.generate_global_info();
        } else {
            self.insert_default_labels(state, cpu, decoder);
        }
        loaded
    }
}

fn register_banks(
    state: &mut CodeAnalysisState,
    prefix: &str,
    count: usize,
    base_address: impl Fn(usize) -> u16,
) -> Result<Vec<Vec<PageId>>> {
    (0..count)
        .map(|bank| {
            (0..PAGES_PER_BANK)
                .map(|i| {
                    let page = Page::new(base_address(bank) + (i * PAGE_SIZE) as u16);
                    state.register_page(page, &format!("{prefix}{bank}[{i:02X}]"))
                })
                .collect()
        })
        .collect()
}

fn map_bank(state: &mut CodeAnalysisState, first_slot: usize, pages: &[PageId]) {
    for (i, &page) in pages.iter().enumerate() {
        state.set_read_write_page(first_slot + i, page, page);
    }
}

impl Observable for SpectrumAnalysis {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "model" => Some(format!("{:?}", self.model).into()),
            "rom_bank" => Some(self.rom_bank.into()),
            "paged_bank" => Some(self.paged_bank.into()),
            "paging_locked" => Some(self.paging_locked.into()),
            "last_pc" => Some(self.last_pc.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["model", "rom_bank", "paged_bank", "paging_locked", "last_pc"]
    }
}
