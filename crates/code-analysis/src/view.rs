//! Per-viewport state.
//!
//! Each view keeps its own cursor, navigation history and label filters so
//! several viewports can inspect different addresses at once.

use crate::format::DataFormattingOptions;
use crate::item::ItemKey;

/// Number of independent views.
pub const VIEW_COUNT: usize = 4;

/// Text and address-range filter for the global label lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelListFilter {
    /// Empty matches every name. Otherwise a substring match.
    pub filter_text: String,
    pub min_address: u16,
    pub max_address: u16,
}

impl Default for LabelListFilter {
    fn default() -> Self {
        Self {
            filter_text: String::new(),
            min_address: 0,
            max_address: 0xFFFF,
        }
    }
}

impl LabelListFilter {
    /// Bounds are inclusive.
    #[must_use]
    pub fn matches(&self, name: &str, address: u16) -> bool {
        if address < self.min_address || address > self.max_address {
            return false;
        }
        self.filter_text.is_empty() || name.contains(self.filter_text.as_str())
    }
}

/// A pending jump to an address, resolved at the next item list pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoToRequest {
    pub address: u16,
    /// Land on a label item if there is one at the address.
    pub label: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub enabled: bool,
    pub(crate) cursor: Option<ItemKey>,
    pub(crate) cursor_index: Option<usize>,
    pub(crate) address_history: Vec<u16>,
    pub(crate) go_to: Option<GoToRequest>,
    pub hover_address: Option<u16>,
    pub highlight_address: Option<u16>,
    /// Keep the cursor on the PC while the CPU is stopped.
    pub track_pc: bool,

    pub function_filter: LabelListFilter,
    pub data_filter: LabelListFilter,
    pub(crate) filtered_functions: Vec<u16>,
    pub(crate) filtered_data: Vec<u16>,
    pub(crate) rebuild_functions: bool,
    pub(crate) rebuild_data: bool,

    pub formatting: DataFormattingOptions,
    pub format_tab_open: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            enabled: false,
            cursor: None,
            cursor_index: None,
            address_history: Vec::new(),
            go_to: None,
            hover_address: None,
            highlight_address: None,
            track_pc: false,
            function_filter: LabelListFilter::default(),
            data_filter: LabelListFilter::default(),
            filtered_functions: Vec::new(),
            filtered_data: Vec::new(),
            rebuild_functions: true,
            rebuild_data: true,
            formatting: DataFormattingOptions::default(),
            format_tab_open: false,
        }
    }
}

impl ViewState {
    #[must_use]
    pub fn cursor(&self) -> Option<ItemKey> {
        self.cursor
    }

    /// Index of the cursor item in the current item list.
    #[must_use]
    pub fn cursor_index(&self) -> Option<usize> {
        self.cursor_index
    }

    pub fn set_cursor(&mut self, key: ItemKey, index: Option<usize>) {
        self.cursor = Some(key);
        self.cursor_index = index;
    }

    pub fn clear_cursor(&mut self) {
        self.cursor = None;
        self.cursor_index = None;
    }

    /// Request a jump, remembering where the cursor was.
    pub fn go_to_address(&mut self, address: u16, label: bool) {
        if let Some(cursor) = self.cursor {
            self.address_history.push(cursor.address);
        }
        self.go_to = Some(GoToRequest { address, label });
    }

    /// Jump back to the last address left by `go_to_address`.
    pub fn go_back(&mut self) -> bool {
        match self.address_history.pop() {
            Some(address) => {
                self.go_to = Some(GoToRequest {
                    address,
                    label: false,
                });
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn pending_go_to(&self) -> Option<GoToRequest> {
        self.go_to
    }

    #[must_use]
    pub fn address_history(&self) -> &[u16] {
        &self.address_history
    }

    #[must_use]
    pub fn filtered_functions(&self) -> &[u16] {
        &self.filtered_functions
    }

    #[must_use]
    pub fn filtered_data(&self) -> &[u16] {
        &self.filtered_data
    }

    pub fn set_function_filter(&mut self, filter: LabelListFilter) {
        self.function_filter = filter;
        self.rebuild_functions = true;
    }

    pub fn set_data_filter(&mut self, filter: LabelListFilter) {
        self.data_filter = filter;
        self.rebuild_data = true;
    }
}
