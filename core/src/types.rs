//! Shared primitive types used across the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable identifier for any record (order id, return id, customer id).
pub type EntityId = String;

/// Zero-based index of a simulated day.
pub type DayIndex = u32;

/// The three canonical entity kinds the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Order,
    Return,
    Person,
}

impl RecordKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Order  => "order",
            Self::Return => "return",
            Self::Person => "person",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
