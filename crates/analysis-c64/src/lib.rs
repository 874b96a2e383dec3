//! Commodore 64 bindings for the code analysis store.
//!
//! Registers analysis pages for RAM, the BASIC, Kernal and character ROMs
//! and the I/O area, keeps the read table in step with the 6510 CPU port,
//! records IRQ handlers and saves every page in a fixed order.
//!
//! ```
//! use analysis_c64::{C64Analysis, CPU_PORT_HIRAM};
//! use code_analysis::CodeAnalysisState;
//!
//! let mut state = CodeAnalysisState::default();
//! let mut c64 = C64Analysis::new(&mut state)?;
//! assert!(c64.mapped().basic);
//!
//! // BASIC switched out, Kernal and character ROM in.
//! c64.check_port(&mut state, CPU_PORT_HIRAM);
//! assert!(!c64.mapped().basic);
//! assert!(c64.mapped().char_rom);
//! # Ok::<(), code_analysis::AnalysisError>(())
//! ```

mod io_labels;
mod machine;

pub use machine::{C64Analysis, CPU_PORT_CHAREN, CPU_PORT_HIRAM, CPU_PORT_LORAM, MappedRegions};
