//! Raw input snapshot: what the I/O adapters hand the engine.
//!
//! A snapshot is one immutable ingested batch. The engine never mutates
//! it; a refreshed source produces a new snapshot with a new fingerprint.

use crate::error::EngineResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// A flat field-name → untyped value mapping, exactly as read.
pub type RawRow = Map<String, Value>;

/// Where a batch came from. Selects the column naming and date rules
/// the normalizer applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourceTag {
    /// A sheet of the spreadsheet export (e.g. "train", "Return", "People").
    Spreadsheet { sheet: String },
    /// A REST endpoint (e.g. "/api/orders").
    Api { endpoint: String },
}

impl SourceTag {
    pub fn sheet(name: impl Into<String>) -> Self {
        Self::Spreadsheet { sheet: name.into() }
    }

    pub fn api(endpoint: impl Into<String>) -> Self {
        Self::Api { endpoint: endpoint.into() }
    }

    pub fn is_spreadsheet(&self) -> bool {
        matches!(self, Self::Spreadsheet { .. })
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spreadsheet { sheet } => write!(f, "sheet:{sheet}"),
            Self::Api { endpoint }      => write!(f, "api:{endpoint}"),
        }
    }
}

/// An ordered batch of raw rows of a single entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBatch {
    pub source: SourceTag,
    pub rows:   Vec<RawRow>,
}

impl RawBatch {
    pub fn new(source: SourceTag, rows: Vec<RawRow>) -> Self {
        Self { source, rows }
    }

    pub fn empty(source: SourceTag) -> Self {
        Self { source, rows: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub orders:  RawBatch,
    pub returns: RawBatch,
    pub people:  RawBatch,
}

impl RawSnapshot {
    /// Content fingerprint (hex SHA-256) over source tags and rows in order.
    /// Two snapshots with equal fingerprints produce equal analytics for
    /// the same configuration and seed.
    pub fn fingerprint(&self) -> EngineResult<String> {
        let mut hasher = Sha256::new();
        for (label, batch) in [
            ("orders", &self.orders),
            ("returns", &self.returns),
            ("people", &self.people),
        ] {
            hasher.update(label.as_bytes());
            hasher.update(batch.source.to_string().as_bytes());
            hasher.update((batch.rows.len() as u64).to_le_bytes());
            for row in &batch.rows {
                hasher.update(serde_json::to_vec(row)?);
                hasher.update(b"\n");
            }
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}
