//! Seeded sample snapshot for runs without input files.

use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};
use supply_metrics_core::{
    rng::RngBank,
    snapshot::{RawBatch, RawRow, RawSnapshot, SourceTag},
};

const CATEGORIES: [&str; 4] = ["Electronics", "Clothing", "Home", "Sports"];
const REGIONS: [&str; 4] = ["West", "East", "Central", "South"];
const SEGMENTS: [&str; 3] = ["Consumer", "Corporate", "Home Office"];
const REASONS: [&str; 4] = ["Damaged", "Wrong item", "Not as described", "Changed mind"];

const ORDER_COUNT: u64 = 100;
const CUSTOMER_COUNT: u64 = 20;
const RETURN_COUNT: u64 = 20;

fn row(value: Value) -> RawRow {
    match value {
        Value::Object(map) => map,
        _ => RawRow::new(),
    }
}

fn pick<'a>(items: &[&'a str], i: u64) -> &'a str {
    items[(i % items.len() as u64) as usize]
}

/// Build a spreadsheet-style snapshot: one order per day from 2024-01-01,
/// customers cycling through a small pool, and a handful of returns.
pub fn sample_snapshot(seed: u64) -> RawSnapshot {
    let bank = RngBank::new(seed);
    let mut orders_rng = bank.for_key("demo.orders");
    let mut returns_rng = bank.for_key("demo.returns");

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();

    let orders = (1..=ORDER_COUNT)
        .map(|i| {
            let ordered = start + Duration::days(i as i64 - 1);
            // Mostly quick shipments with a long tail.
            let lead = if orders_rng.chance(0.1) {
                8 + orders_rng.next_u64_below(10)
            } else {
                1 + orders_rng.next_u64_below(6)
            };
            let quantity = 1 + orders_rng.next_u64_below(9);
            let sales = 100.0 + orders_rng.next_f64() * 900.0;
            let shipped = if orders_rng.chance(0.9) { quantity } else { quantity.saturating_sub(1) };
            row(json!({
                "Order ID": format!("ORD_{i:03}"),
                "Order Date": ordered.format("%Y-%m-%d").to_string(),
                "Ship Date": (ordered + Duration::days(lead as i64)).format("%Y-%m-%d").to_string(),
                "Customer ID": format!("CUST_{:02}", i % CUSTOMER_COUNT),
                "Category": pick(&CATEGORIES, i),
                "Region": pick(&REGIONS, i),
                "Sales": format!("{sales:.2}"),
                "Quantity": quantity,
                "Quantity Shipped": shipped,
            }))
        })
        .collect();

    let returns = (0..RETURN_COUNT)
        .map(|i| {
            let order = 1 + returns_rng.next_u64_below(ORDER_COUNT);
            let returned = start + Duration::days(order as i64 + 7);
            row(json!({
                "Return ID": format!("RET_{:03}", i + 1),
                "Order ID": format!("ORD_{order:03}"),
                "Return Reason": pick(&REASONS, i),
                "Return Date": returned.format("%Y-%m-%d").to_string(),
            }))
        })
        .collect();

    let people = (0..CUSTOMER_COUNT)
        .map(|i| {
            row(json!({
                "Customer ID": format!("CUST_{i:02}"),
                "Customer Name": format!("Customer {i}"),
                "Region": pick(&REGIONS, i),
                "Segment": pick(&SEGMENTS, i),
            }))
        })
        .collect();

    RawSnapshot {
        orders:  RawBatch::new(SourceTag::sheet("Orders"), orders),
        returns: RawBatch::new(SourceTag::sheet("Returns"), returns),
        people:  RawBatch::new(SourceTag::sheet("People"), people),
    }
}
