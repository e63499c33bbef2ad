//! Record normalizer: raw rows → canonical typed records.
//!
//! RULE: A batch never fails as a whole. Every input row becomes either
//! one canonical record or one `NormalizationFailure`, so
//! `records + failures == rows` for every batch.
//!
//! The normalizer judges shape and type only: a required column that is
//! absent, or a value that cannot be coerced, is a failure. A value that
//! is present but blank is carried through as empty and left to the
//! quality validator.

use crate::{
    config::RequiredFields,
    record::{Order, Person, Record, RecordSet, Return},
    snapshot::{RawBatch, RawRow, RawSnapshot, SourceTag},
    types::RecordKind,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

// ── Column aliases ───────────────────────────────────────────────────────────

/// A canonical field and the column names each source family uses for it.
struct FieldSpec {
    name:   &'static str,
    sheet:  &'static [&'static str],
    api:    &'static [&'static str],
}

const ORDER_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "order_id",         sheet: &["Order ID"],         api: &["order_id", "id"] },
    FieldSpec { name: "customer_id",      sheet: &["Customer ID"],      api: &["customer_id", "customer"] },
    FieldSpec { name: "product_category", sheet: &["Category"],         api: &["product_category", "category"] },
    FieldSpec { name: "region",           sheet: &["Region"],           api: &["region"] },
    FieldSpec { name: "order_date",       sheet: &["Order Date"],       api: &["order_date", "ordered_at"] },
    FieldSpec { name: "ship_date",        sheet: &["Ship Date"],        api: &["ship_date", "shipped_at"] },
    FieldSpec { name: "sales_amount",     sheet: &["Sales"],            api: &["sales_amount", "amount"] },
    FieldSpec { name: "quantity",         sheet: &["Quantity"],         api: &["quantity", "qty"] },
    FieldSpec { name: "quantity_shipped", sheet: &["Quantity Shipped"], api: &["quantity_shipped", "shipped_quantity"] },
];

const RETURN_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "return_id",     sheet: &["Return ID"],     api: &["return_id", "id"] },
    FieldSpec { name: "order_id",      sheet: &["Order ID"],      api: &["order_id"] },
    FieldSpec { name: "return_reason", sheet: &["Return Reason"], api: &["return_reason", "reason"] },
    FieldSpec { name: "return_date",   sheet: &["Return Date"],   api: &["return_date", "returned_at"] },
];

const PERSON_FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "customer_id", sheet: &["Customer ID"], api: &["customer_id", "id"] },
    FieldSpec { name: "region",      sheet: &["Region"],      api: &["region"] },
    FieldSpec { name: "segment",     sheet: &["Segment"],     api: &["segment"] },
];

fn field_specs(kind: RecordKind) -> &'static [FieldSpec] {
    match kind {
        RecordKind::Order  => ORDER_FIELDS,
        RecordKind::Return => RETURN_FIELDS,
        RecordKind::Person => PERSON_FIELDS,
    }
}

/// Canonical field names for a record kind.
pub fn known_fields(kind: RecordKind) -> impl Iterator<Item = &'static str> {
    field_specs(kind).iter().map(|f| f.name)
}

/// Column keys compare case-, space-, underscore- and hyphen-insensitively.
fn column_key(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-' | '\t'))
        .flat_map(char::to_lowercase)
        .collect()
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum FieldError {
    MissingColumn { field: String },
    NotNumeric    { field: String, value: String },
    NotInteger    { field: String, value: String },
    NotDate       { field: String, value: String },
    NotScalar     { field: String },
}

impl FieldError {
    pub fn field(&self) -> &str {
        match self {
            Self::MissingColumn { field }
            | Self::NotNumeric { field, .. }
            | Self::NotInteger { field, .. }
            | Self::NotDate { field, .. }
            | Self::NotScalar { field } => field,
        }
    }
}

/// A raw row that could not become a canonical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationFailure {
    pub kind:      RecordKind,
    pub source:    SourceTag,
    pub row_index: usize,
    /// Best-effort primary id, when the id column itself was readable.
    pub record_id: Option<String>,
    pub errors:    Vec<FieldError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
    pub records:  Vec<Record>,
    pub failures: Vec<NormalizationFailure>,
}

// ── Row reader ───────────────────────────────────────────────────────────────

struct RowReader<'a> {
    kind:     RecordKind,
    source:   &'a SourceTag,
    required: &'a [String],
    columns:  HashMap<String, (&'a str, &'a Value)>,
    consumed: Vec<&'a str>,
    errors:   Vec<FieldError>,
}

impl<'a> RowReader<'a> {
    fn new(kind: RecordKind, source: &'a SourceTag, required: &'a [String], row: &'a RawRow) -> Self {
        let mut columns = HashMap::with_capacity(row.len());
        for (name, value) in row {
            columns.entry(column_key(name)).or_insert((name.as_str(), value));
        }
        Self { kind, source, required, columns, consumed: Vec::new(), errors: Vec::new() }
    }

    /// Find the raw value for a canonical field, trying the source's own
    /// naming family first. `None` when no alias is present.
    fn lookup(&mut self, field: &str) -> Option<&'a Value> {
        let aliases = field_specs(self.kind).iter().find(|f| f.name == field)?;
        let (own, other) = if self.source.is_spreadsheet() {
            (aliases.sheet, aliases.api)
        } else {
            (aliases.api, aliases.sheet)
        };
        let hit = std::iter::once(aliases.name)
            .chain(own.iter().copied())
            .chain(other.iter().copied())
            .find_map(|alias| self.columns.get(&column_key(alias)).copied());
        hit.map(|(column, value)| {
            self.consumed.push(column);
            value
        })
    }

    fn is_required(&self, field: &str) -> bool {
        self.required.iter().any(|r| r == field)
    }

    /// Present value, or `None` after recording a missing-column failure
    /// when the field is required.
    fn present(&mut self, field: &str) -> Option<&'a Value> {
        let value = self.lookup(field);
        if value.is_none() && self.is_required(field) {
            self.errors.push(FieldError::MissingColumn { field: field.to_string() });
        }
        value
    }

    fn text(&mut self, field: &str) -> String {
        match self.present(field) {
            None => String::new(),
            Some(value) => match scalar_text(value) {
                Some(text) => text,
                None => {
                    self.errors.push(FieldError::NotScalar { field: field.to_string() });
                    String::new()
                }
            },
        }
    }

    fn number(&mut self, field: &str) -> Option<f64> {
        let value = self.present(field)?;
        match coerce_number(value) {
            Ok(n) => n,
            Err(raw) => {
                self.errors.push(FieldError::NotNumeric { field: field.to_string(), value: raw });
                None
            }
        }
    }

    fn integer(&mut self, field: &str) -> Option<i64> {
        let value = self.present(field)?;
        match coerce_number(value) {
            Ok(None) => None,
            Ok(Some(n)) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Some(n as i64),
            Ok(Some(n)) => {
                self.errors.push(FieldError::NotInteger { field: field.to_string(), value: n.to_string() });
                None
            }
            Err(raw) => {
                self.errors.push(FieldError::NotNumeric { field: field.to_string(), value: raw });
                None
            }
        }
    }

    fn date(&mut self, field: &str) -> Option<NaiveDate> {
        let value = self.present(field)?;
        let day_first = self.source.is_spreadsheet();
        match coerce_date(value, day_first) {
            Ok(d) => d,
            Err(raw) => {
                self.errors.push(FieldError::NotDate { field: field.to_string(), value: raw });
                None
            }
        }
    }

    /// Columns not consumed by any canonical field, rendered as text.
    fn leftovers(&self, row: &'a RawRow) -> BTreeMap<String, String> {
        row.iter()
            .filter(|(name, _)| !self.consumed.contains(&name.as_str()))
            .filter_map(|(name, value)| scalar_text(value).map(|text| (name.clone(), text)))
            .filter(|(_, text)| !text.is_empty())
            .collect()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null      => Some(String::new()),
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b)   => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// `Ok(None)` for null/blank, `Err(raw)` for anything unparsable.
fn coerce_number(value: &Value) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(Some).ok_or_else(|| n.to_string()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let (negative, unsigned) = match trimmed.strip_prefix('-') {
                Some(rest) => (true, rest.trim_start()),
                None => (false, trimmed),
            };
            let cleaned: String = unsigned
                .trim_start_matches(['$', '€', '£'])
                .chars()
                .filter(|c| *c != ',')
                .collect();
            match cleaned.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Some(if negative { -n } else { n })),
                _ => Err(trimmed.to_string()),
            }
        }
        other => Err(other.to_string()),
    }
}

/// Day zero of spreadsheet serial dates (the 1900 leap-year bug folded in).
fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

fn coerce_date(value: &Value, day_first: bool) -> Result<Option<NaiveDate>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) if day_first => {
            let serial = n.as_f64().filter(|f| f.is_finite() && *f >= 1.0 && *f < 2_958_466.0);
            serial
                .map(|s| Some(serial_epoch() + Duration::days(s.floor() as i64)))
                .ok_or_else(|| n.to_string())
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            parse_date_text(trimmed, day_first).map(Some).ok_or_else(|| trimmed.to_string())
        }
        other => Err(other.to_string()),
    }
}

fn parse_date_text(text: &str, day_first: bool) -> Option<NaiveDate> {
    // ISO dates, optionally followed by a time part.
    let head = text.get(..10).unwrap_or(text);
    if let Ok(d) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(head, "%Y/%m/%d") {
        return Some(d);
    }
    let date_part = text.split_whitespace().next().unwrap_or(text);
    let (first, second) = if day_first {
        ("%d/%m/%Y", "%m/%d/%Y")
    } else {
        ("%m/%d/%Y", "%d/%m/%Y")
    };
    NaiveDate::parse_from_str(date_part, first)
        .or_else(|_| NaiveDate::parse_from_str(date_part, second))
        .ok()
}

// ── Normalizer ───────────────────────────────────────────────────────────────

pub struct Normalizer<'a> {
    required: &'a RequiredFields,
}

impl<'a> Normalizer<'a> {
    pub fn new(required: &'a RequiredFields) -> Self {
        Self { required }
    }

    /// Normalize a single row. `row_index` is the row's position in its
    /// batch and seeds synthetic return ids.
    pub fn normalize_row(
        &self,
        kind: RecordKind,
        source: &SourceTag,
        row_index: usize,
        row: &RawRow,
    ) -> Result<Record, NormalizationFailure> {
        let mut reader = RowReader::new(kind, source, self.required.for_kind(kind), row);

        let record = match kind {
            RecordKind::Order => Record::Order(Order {
                order_id:         reader.text("order_id"),
                customer_id:      reader.text("customer_id"),
                product_category: reader.text("product_category"),
                region:           reader.text("region"),
                order_date:       reader.date("order_date"),
                ship_date:        reader.date("ship_date"),
                sales_amount:     reader.number("sales_amount"),
                quantity:         reader.integer("quantity"),
                quantity_shipped: reader.integer("quantity_shipped"),
            }),
            RecordKind::Return => {
                let return_id = if reader.lookup("return_id").is_none() && !reader.is_required("return_id") {
                    format!("ret-{row_index:06}")
                } else {
                    reader.text("return_id")
                };
                Record::Return(Return {
                    return_id,
                    order_id:      reader.text("order_id"),
                    return_reason: reader.text("return_reason"),
                    return_date:   reader.date("return_date"),
                })
            }
            RecordKind::Person => {
                let customer_id = reader.text("customer_id");
                let region = reader.text("region");
                let segment = reader.text("segment");
                Record::Person(Person {
                    customer_id,
                    region,
                    segment,
                    attributes: reader.leftovers(row),
                })
            }
        };

        if reader.errors.is_empty() {
            Ok(record)
        } else {
            let id = record.id();
            Err(NormalizationFailure {
                kind,
                source: source.clone(),
                row_index,
                record_id: (!id.is_empty()).then(|| id.to_string()),
                errors: reader.errors,
            })
        }
    }

    pub fn normalize_batch(&self, kind: RecordKind, batch: &RawBatch) -> NormalizedBatch {
        let mut records = Vec::with_capacity(batch.rows.len());
        let mut failures = Vec::new();
        for (i, row) in batch.rows.iter().enumerate() {
            match self.normalize_row(kind, &batch.source, i, row) {
                Ok(record) => records.push(record),
                Err(failure) => failures.push(failure),
            }
        }
        log::debug!(
            "normalize {kind} from {}: {} rows -> {} records, {} failures",
            batch.source,
            batch.rows.len(),
            records.len(),
            failures.len()
        );
        NormalizedBatch { records, failures }
    }

    /// Normalize all three batches of a snapshot.
    pub fn normalize_snapshot(&self, snapshot: &RawSnapshot) -> (RecordSet, Vec<NormalizationFailure>) {
        let mut records = Vec::new();
        let mut failures = Vec::new();
        for (kind, batch) in [
            (RecordKind::Order, &snapshot.orders),
            (RecordKind::Return, &snapshot.returns),
            (RecordKind::Person, &snapshot.people),
        ] {
            let normalized = self.normalize_batch(kind, batch);
            records.extend(normalized.records);
            failures.extend(normalized.failures);
        }
        (RecordSet::from_records(records), failures)
    }
}
