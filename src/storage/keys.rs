use serde_json::Value as JsonValue;
use std::fmt;

use crate::value::Value;

/// A range of primary keys, given in wire form.
///
/// Either bound may be a prefix of the primary key; a prefix bound covers
/// every row sharing that prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRange {
    pub start: Vec<JsonValue>,
    pub end: Vec<JsonValue>,
    pub start_closed: bool,
    pub end_closed: bool,
}

impl KeyRange {
    pub fn closed_closed(start: Vec<JsonValue>, end: Vec<JsonValue>) -> Self {
        Self {
            start,
            end,
            start_closed: true,
            end_closed: true,
        }
    }

    pub fn closed_open(start: Vec<JsonValue>, end: Vec<JsonValue>) -> Self {
        Self {
            start,
            end,
            start_closed: true,
            end_closed: false,
        }
    }

    pub fn open_open(start: Vec<JsonValue>, end: Vec<JsonValue>) -> Self {
        Self {
            start,
            end,
            start_closed: false,
            end_closed: false,
        }
    }

    pub fn open_closed(start: Vec<JsonValue>, end: Vec<JsonValue>) -> Self {
        Self {
            start,
            end,
            start_closed: false,
            end_closed: true,
        }
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |vals: &[JsonValue]| {
            vals.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        write!(
            f,
            "{}[{}],[{}]{}",
            if self.start_closed { "[" } else { "(" },
            list(&self.start),
            list(&self.end),
            if self.end_closed { "]" } else { ")" }
        )
    }
}

/// The rows addressed by a read or delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeySet {
    /// Full primary keys.
    pub keys: Vec<Vec<JsonValue>>,
    pub ranges: Vec<KeyRange>,
    /// Every row of the table; `keys` and `ranges` are ignored.
    pub all: bool,
}

impl KeySet {
    pub fn all() -> Self {
        Self {
            all: true,
            ..Default::default()
        }
    }

    pub fn keys(keys: Vec<Vec<JsonValue>>) -> Self {
        Self {
            keys,
            ..Default::default()
        }
    }

    pub fn ranges(ranges: Vec<KeyRange>) -> Self {
        Self {
            ranges,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.all && self.keys.is_empty() && self.ranges.is_empty()
    }
}

/// A key range converted to cell values for a particular table.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolvedRange {
    pub start: Vec<Value>,
    pub end: Vec<Value>,
    pub start_closed: bool,
    pub end_closed: bool,
}
