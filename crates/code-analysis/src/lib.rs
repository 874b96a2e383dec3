//! Code analysis store for emulated 8-bit machines.
//!
//! Annotates a 64K address space with code, data, labels and comments, and
//! keeps runtime history (execution, reads, writes, self-modifying code)
//! fed by tracing hooks in the CPU core. Annotation lives in 1K pages bound
//! into read and write page tables, so banked memory keeps its history
//! while it is switched out.
//!
//! # Usage
//!
//! ```
//! use code_analysis::{CodeAnalysisState, ItemType, LabelType, Page};
//!
//! let mut state = CodeAnalysisState::default();
//! for slot in 0..64 {
//!     let id = state.register_page(Page::new((slot as u16) << 10), &format!("RAM{slot}"))?;
//!     state.set_read_write_page(slot, id, id);
//! }
//! state.add_label(0x8000, "main", LabelType::Function);
//! state.update_item_list();
//! assert_eq!(state.item_list()[0x8000].item_type(), ItemType::Label);
//! # Ok::<(), code_analysis::AnalysisError>(())
//! ```

mod analysis;
mod command;
mod config;
mod error;
mod format;
mod item;
mod item_list;
mod labels;
mod page;
mod page_table;
mod persist;
mod state;
mod trace;
mod view;

pub use command::{Command, MAX_COMMANDS};
pub use config::{AnalysisConfig, NumberDisplayMode};
pub use error::{AnalysisError, Result};
pub use format::DataFormattingOptions;
pub use item::{
    AccessRecord, CodeEntry, CodeInfo, CommentBlock, DataInfo, DataType, Item, ItemKey, ItemType,
    Label, LabelType, OperandType, PatchState,
};
pub use page::{PAGE_MASK, PAGE_SHIFT, PAGE_SIZE, Page, PageId, SLOT_COUNT, offset_of, slot_of};
pub use page_table::PageTable;
pub use persist::{MAGIC, VERSION};
pub use state::CodeAnalysisState;
pub use trace::{BusAccess, BusCycle, FunctionCall, MAX_CALL_DEPTH};
pub use view::{GoToRequest, LabelListFilter, VIEW_COUNT, ViewState};
