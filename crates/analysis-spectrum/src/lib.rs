//! ZX Spectrum bindings for the code analysis store.
//!
//! Covers the 48K and the 128K. Each 16K ROM or RAM bank owns its own
//! analysis pages, so code found in a RAM bank keeps its annotation while
//! another bank is paged in at $C000.

mod config;
mod labels;
mod machine;

pub use config::SpectrumModel;
pub use machine::{PAGES_PER_BANK, SpectrumAnalysis};
