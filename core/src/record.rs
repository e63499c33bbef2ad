//! Canonical typed records.
//!
//! These are built only by the normalizer. Downstream stages never see
//! raw rows. Empty optional text is stored as an empty string so the
//! validator can tell "present but blank" apart from a coercion failure.

use crate::types::{EntityId, RecordKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id:         EntityId,
    pub customer_id:      EntityId,
    pub product_category: String,
    pub region:           String,
    pub order_date:       Option<NaiveDate>,
    pub ship_date:        Option<NaiveDate>,
    pub sales_amount:     Option<f64>,
    pub quantity:         Option<i64>,
    /// Only some sources track shipped quantity.
    pub quantity_shipped: Option<i64>,
}

impl Order {
    /// Days between order placement and shipment. `None` when either date
    /// is missing. May be negative; the validator flags that.
    pub fn lead_time_days(&self) -> Option<i64> {
        match (self.order_date, self.ship_date) {
            (Some(ordered), Some(shipped)) => Some((shipped - ordered).num_days()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Return {
    pub return_id:     EntityId,
    pub order_id:      EntityId,
    pub return_reason: String,
    pub return_date:   Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub customer_id: EntityId,
    pub region:      String,
    pub segment:     String,
    /// Remaining columns (name, city, state, ...) kept verbatim as text.
    pub attributes:  BTreeMap<String, String>,
}

/// Tagged union of every canonical record kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Order(Order),
    Return(Return),
    Person(Person),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Order(_)  => RecordKind::Order,
            Self::Return(_) => RecordKind::Return,
            Self::Person(_) => RecordKind::Person,
        }
    }

    /// Primary id of the record (may be empty before validation).
    pub fn id(&self) -> &str {
        match self {
            Self::Order(o)  => &o.order_id,
            Self::Return(r) => &r.return_id,
            Self::Person(p) => &p.customer_id,
        }
    }
}

/// One kind's worth of canonical records, as handed to the validator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub orders:  Vec<Order>,
    pub returns: Vec<Return>,
    pub people:  Vec<Person>,
}

impl RecordSet {
    /// Split a mixed sequence of records into per-kind vectors,
    /// preserving the original order within each kind.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut set = Self::default();
        for record in records {
            match record {
                Record::Order(o)  => set.orders.push(o),
                Record::Return(r) => set.returns.push(r),
                Record::Person(p) => set.people.push(p),
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.orders.len() + self.returns.len() + self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
