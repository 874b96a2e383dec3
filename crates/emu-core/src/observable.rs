//! State queries for analysis components.
//!
//! Front ends (debugger panels, test harnesses, scripting) inspect the
//! analysis store through dotted paths instead of reaching into its fields.
//! A query never mutates anything.

use std::fmt;

/// A dynamically-typed answer to a state query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    /// An address in the 64K space. Displays as `$XXXX`.
    Address(u16),
    /// A count or frame number.
    Count(u64),
    Text(String),
    /// A list of addresses, e.g. interrupt handlers.
    Addresses(Vec<u16>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Address(v) => write!(f, "${v:04X}"),
            Value::Count(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Addresses(list) => {
                f.write_str("[")?;
                for (i, addr) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "${addr:04X}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Address(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Count(u64::from(v))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Count(v as u64)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u16>> for Value {
    fn from(v: Vec<u16>) -> Self {
        Value::Addresses(v)
    }
}

/// A component whose state can be inspected by path.
pub trait Observable {
    /// Query a property by dotted path, e.g. `stack.min` or `labels.functions`.
    ///
    /// Returns `None` for unknown paths, and for known paths that currently
    /// have no meaningful value.
    fn query(&self, path: &str) -> Option<Value>;

    /// Every path `query` understands.
    fn query_paths(&self) -> &'static [&'static str];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_display_as_hex() {
        assert_eq!(Value::Address(0xC000).to_string(), "$C000");
        assert_eq!(Value::from(vec![0x38, 0xFF48]).to_string(), "[$0038, $FF48]");
    }

    #[test]
    fn counts_display_as_decimal() {
        assert_eq!(Value::from(12usize).to_string(), "12");
        assert_eq!(Value::from(7u32), Value::Count(7));
    }
}
