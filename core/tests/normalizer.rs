//! Normalizer: every raw row becomes exactly one record or one failure.

use serde_json::{json, Value};
use supply_metrics_core::{
    config::RequiredFields,
    normalizer::{FieldError, Normalizer},
    record::Record,
    snapshot::{RawBatch, RawRow, RawSnapshot, SourceTag},
    types::RecordKind,
};

fn row(value: Value) -> RawRow {
    value.as_object().cloned().expect("row literal must be an object")
}

fn sheet_order(id: &str, sales: Value) -> RawRow {
    row(json!({
        "Order ID": id,
        "Order Date": "2024-01-01",
        "Ship Date": "2024-01-04",
        "Customer ID": "C1",
        "Category": "Technology",
        "Region": "West",
        "Sales": sales,
        "Quantity": 2,
    }))
}

#[test]
fn records_plus_failures_equal_rows() {
    let required = RequiredFields::default();
    let normalizer = Normalizer::new(&required);
    let batch = RawBatch::new(
        SourceTag::sheet("Orders"),
        vec![
            sheet_order("O-1", json!(100.0)),
            sheet_order("O-2", json!("not a number")),
            sheet_order("O-3", json!("$1,250.00")),
            row(json!({ "Order ID": "O-4" })),
        ],
    );

    let out = normalizer.normalize_batch(RecordKind::Order, &batch);
    assert_eq!(out.records.len() + out.failures.len(), batch.len());
    assert_eq!(out.records.len(), 2);
    assert_eq!(out.failures.len(), 2);
}

#[test]
fn unparsable_number_is_a_failure_not_zero() {
    let required = RequiredFields::default();
    let normalizer = Normalizer::new(&required);
    let source = SourceTag::sheet("Orders");

    let failure = normalizer
        .normalize_row(RecordKind::Order, &source, 7, &sheet_order("O-9", json!("abc")))
        .expect_err("non-numeric sales must fail");

    assert_eq!(failure.row_index, 7);
    assert_eq!(failure.record_id.as_deref(), Some("O-9"));
    assert!(matches!(
        failure.errors.as_slice(),
        [FieldError::NotNumeric { field, .. }] if field == "sales_amount"
    ));
}

#[test]
fn missing_required_column_is_reported_per_field() {
    let required = RequiredFields::default();
    let normalizer = Normalizer::new(&required);
    let source = SourceTag::api("/orders");

    let failure = normalizer
        .normalize_row(RecordKind::Order, &source, 0, &row(json!({ "order_id": "A-1" })))
        .expect_err("bare row must fail");
    let fields: Vec<&str> = failure.errors.iter().map(FieldError::field).collect();
    assert!(fields.contains(&"customer_id"));
    assert!(fields.contains(&"order_date"));
    assert!(!fields.contains(&"ship_date"), "ship_date is optional by default");
}

#[test]
fn both_source_families_map_to_the_same_record() {
    let required = RequiredFields::default();
    let normalizer = Normalizer::new(&required);

    let sheet = normalizer
        .normalize_row(RecordKind::Order, &SourceTag::sheet("Orders"), 0, &sheet_order("O-1", json!(10)))
        .expect("sheet row");
    let api = normalizer
        .normalize_row(
            RecordKind::Order,
            &SourceTag::api("/orders"),
            0,
            &row(json!({
                "order_id": "O-1",
                "customer_id": "C1",
                "category": "Technology",
                "region": "West",
                "order_date": "2024-01-01",
                "ship_date": "2024-01-04",
                "amount": "10",
                "qty": "2",
            })),
        )
        .expect("api row");

    assert_eq!(sheet, api);
    match sheet {
        Record::Order(order) => assert_eq!(order.lead_time_days(), Some(3)),
        other => panic!("expected an order, got {other:?}"),
    }
}

#[test]
fn blank_values_pass_through_to_the_validator() {
    let required = RequiredFields::default();
    let normalizer = Normalizer::new(&required);
    let mut raw = sheet_order("", json!(""));
    raw.insert("Order Date".into(), json!(""));

    let record = normalizer
        .normalize_row(RecordKind::Order, &SourceTag::sheet("Orders"), 0, &raw)
        .expect("blank values are not coercion failures");
    match record {
        Record::Order(order) => {
            assert!(order.order_id.is_empty());
            assert_eq!(order.order_date, None);
            assert_eq!(order.sales_amount, None);
        }
        other => panic!("expected an order, got {other:?}"),
    }
}

#[test]
fn returns_without_id_column_get_synthetic_ids() {
    let required = RequiredFields::default();
    let normalizer = Normalizer::new(&required);
    let batch = RawBatch::new(
        SourceTag::sheet("Returns"),
        vec![
            row(json!({ "Order ID": "O-1", "Returned": "Yes" })),
            row(json!({ "Order ID": "O-2", "Returned": "Yes" })),
        ],
    );

    let out = normalizer.normalize_batch(RecordKind::Return, &batch);
    assert!(out.failures.is_empty());
    let ids: Vec<&str> = out.records.iter().map(Record::id).collect();
    assert_eq!(ids, vec!["ret-000000", "ret-000001"]);
}

#[test]
fn person_leftover_columns_become_attributes() {
    let required = RequiredFields::default();
    let normalizer = Normalizer::new(&required);
    let raw = row(json!({
        "Customer ID": "C1",
        "Region": "East",
        "Segment": "Consumer",
        "Customer Name": "Ada",
        "City": "Boston",
    }));

    match normalizer.normalize_row(RecordKind::Person, &SourceTag::sheet("People"), 0, &raw) {
        Ok(Record::Person(person)) => {
            assert_eq!(person.segment, "Consumer");
            assert_eq!(person.attributes.get("City").map(String::as_str), Some("Boston"));
            assert!(!person.attributes.contains_key("Region"));
        }
        other => panic!("expected a person, got {other:?}"),
    }
}

#[test]
fn snapshot_fingerprint_tracks_content() {
    let snapshot = |sales: f64| RawSnapshot {
        orders:  RawBatch::new(SourceTag::sheet("Orders"), vec![sheet_order("O-1", json!(sales))]),
        returns: RawBatch::empty(SourceTag::sheet("Returns")),
        people:  RawBatch::empty(SourceTag::sheet("People")),
    };

    let a = snapshot(10.0).fingerprint().expect("fingerprint");
    let b = snapshot(10.0).fingerprint().expect("fingerprint");
    let c = snapshot(11.0).fingerprint().expect("fingerprint");
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.len(), 64);
}
