//! Data quality validator: findings, severities and exclusion.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use supply_metrics_core::{
    config::{QualityConfig, RequiredFields},
    quality::{IssueKind, Severity, Validator},
    record::{Order, Person, RecordSet, Return},
    types::RecordKind,
};

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn order(id: &str, ordered: Option<NaiveDate>, shipped: Option<NaiveDate>) -> Order {
    Order {
        order_id:         id.to_string(),
        customer_id:      "C1".to_string(),
        product_category: "Office Supplies".to_string(),
        region:           "Central".to_string(),
        order_date:       ordered,
        ship_date:        shipped,
        sales_amount:     Some(50.0),
        quantity:         Some(1),
        quantity_shipped: None,
    }
}

fn ret(id: &str, order_id: &str) -> Return {
    Return {
        return_id:     id.to_string(),
        order_id:      order_id.to_string(),
        return_reason: "Damaged".to_string(),
        return_date:   None,
    }
}

fn person(id: &str) -> Person {
    Person {
        customer_id: id.to_string(),
        region:      "Central".to_string(),
        segment:     "Consumer".to_string(),
        attributes:  BTreeMap::new(),
    }
}

#[test]
fn duplicate_order_ids_are_critical_and_excluded() {
    let required = RequiredFields::default();
    let quality = QualityConfig::default();
    let validator = Validator::new(&required, &quality);
    let records = RecordSet {
        orders: vec![
            order("O-1", date(2024, 1, 1), date(2024, 1, 3)),
            order("O-1", date(2024, 1, 2), date(2024, 1, 4)),
            order("O-2", date(2024, 1, 2), date(2024, 1, 4)),
        ],
        ..RecordSet::default()
    };

    let (clean, report) = validator.validate(&records);

    let duplicates: Vec<_> = report.issues_of(IssueKind::DuplicateId).collect();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].severity, Severity::Critical);
    assert_eq!(duplicates[0].position, 1);
    assert_eq!(clean.orders.len(), 2);
    assert_eq!(report.summary.records_excluded, 1);
    // Source records are untouched.
    assert_eq!(records.orders.len(), 3);
}

#[test]
fn negative_lead_time_is_flagged_but_kept() {
    let required = RequiredFields::default();
    let quality = QualityConfig::default();
    let validator = Validator::new(&required, &quality);
    let records = RecordSet {
        orders: vec![order("O-1", date(2024, 3, 10), date(2024, 3, 8))],
        ..RecordSet::default()
    };

    let (clean, report) = validator.validate(&records);
    assert!(report.has_issue(RecordKind::Order, "O-1", IssueKind::NegativeLeadTime));
    assert_eq!(report.count(Severity::Critical), 0);
    assert_eq!(clean.orders.len(), 1);
}

#[test]
fn implausible_lead_time_is_a_warning() {
    let required = RequiredFields::default();
    let quality = QualityConfig::default();
    let validator = Validator::new(&required, &quality);
    let records = RecordSet {
        orders: vec![
            order("O-1", date(2024, 1, 1), date(2024, 1, 31)),
            order("O-2", date(2024, 1, 1), date(2024, 2, 1)),
        ],
        ..RecordSet::default()
    };

    let (_, report) = validator.validate(&records);
    assert!(!report.has_issue(RecordKind::Order, "O-1", IssueKind::LeadTimeOutOfRange));
    assert!(report.has_issue(RecordKind::Order, "O-2", IssueKind::LeadTimeOutOfRange));
}

#[test]
fn dangling_return_is_a_warning_not_a_failure() {
    let required = RequiredFields::default();
    let quality = QualityConfig::default();
    let validator = Validator::new(&required, &quality);
    let records = RecordSet {
        orders:  vec![order("O-1", date(2024, 1, 1), date(2024, 1, 2))],
        returns: vec![ret("R-1", "O-1"), ret("R-2", "O-404")],
        people:  Vec::new(),
    };

    let (clean, report) = validator.validate(&records);
    let dangling: Vec<_> = report.issues_of(IssueKind::UnknownOrder).collect();
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].record_id, "R-2");
    assert_eq!(dangling[0].severity, Severity::Warning);
    assert_eq!(clean.returns.len(), 2);
}

#[test]
fn blank_primary_id_is_critical_blank_optional_is_warning() {
    let required = RequiredFields::default();
    let quality = QualityConfig::default();
    let validator = Validator::new(&required, &quality);
    let mut no_region = order("O-2", date(2024, 1, 1), date(2024, 1, 2));
    no_region.region.clear();
    let records = RecordSet {
        orders: vec![order("", date(2024, 1, 1), date(2024, 1, 2)), no_region],
        ..RecordSet::default()
    };

    let (clean, report) = validator.validate(&records);
    let missing: Vec<_> = report.issues_of(IssueKind::MissingField).collect();
    assert_eq!(missing.len(), 2);
    assert_eq!(missing[0].severity, Severity::Critical);
    assert_eq!(missing[0].field.as_deref(), Some("order_id"));
    assert_eq!(missing[1].severity, Severity::Warning);
    assert_eq!(missing[1].field.as_deref(), Some("region"));
    assert_eq!(clean.orders.len(), 1);
}

#[test]
fn unknown_customers_checked_only_when_people_supplied() {
    let required = RequiredFields::default();
    let quality = QualityConfig::default();
    let validator = Validator::new(&required, &quality);
    let orders = vec![order("O-1", date(2024, 1, 1), date(2024, 1, 2))];

    let without_people = RecordSet { orders: orders.clone(), ..RecordSet::default() };
    let (_, report) = validator.validate(&without_people);
    assert_eq!(report.issues_of(IssueKind::UnknownCustomer).count(), 0);

    let with_people = RecordSet { orders, returns: Vec::new(), people: vec![person("C2")] };
    let (_, report) = validator.validate(&with_people);
    assert!(report.has_issue(RecordKind::Order, "O-1", IssueKind::UnknownCustomer));
}

#[test]
fn missing_data_alert_trips_above_ratio() {
    let required = RequiredFields::default();
    let quality = QualityConfig::default();
    let validator = Validator::new(&required, &quality);
    let mut blank = order("O-1", date(2024, 1, 1), date(2024, 1, 2));
    blank.customer_id.clear();
    blank.region.clear();
    let records = RecordSet { orders: vec![blank], ..RecordSet::default() };

    let (_, report) = validator.validate(&records);
    // 2 blanks over 7 required order cells.
    assert!((report.summary.missing_data_ratio - 2.0 / 7.0).abs() < 1e-9);
    assert!(report.summary.missing_data_alert);
    assert_eq!(report.summary.warning_count, 2);
}

#[test]
fn return_to_excluded_order_is_flagged_unknown() {
    let required = RequiredFields::default();
    let quality = QualityConfig::default();
    let validator = Validator::new(&required, &quality);
    let records = RecordSet {
        orders:  vec![order("O-1", None, None), order("O-2", date(2024, 1, 1), date(2024, 1, 2))],
        returns: vec![ret("R-1", "O-1")],
        people:  Vec::new(),
    };

    let (clean, report) = validator.validate(&records);
    assert_eq!(clean.orders.len(), 1);
    assert!(
        report.has_issue(RecordKind::Return, "R-1", IssueKind::UnknownOrder),
        "a return whose order was excluded has no order downstream"
    );
    assert_eq!(clean.returns.len(), 1);
}

#[test]
fn excluded_first_occurrence_does_not_shadow_valid_duplicate() {
    let required = RequiredFields::default();
    let quality = QualityConfig::default();
    let validator = Validator::new(&required, &quality);
    let records = RecordSet {
        orders: vec![order("O-1", None, None), order("O-1", date(2024, 1, 1), date(2024, 1, 2))],
        ..RecordSet::default()
    };

    let (clean, report) = validator.validate(&records);
    assert_eq!(clean.orders.len(), 1);
    assert_eq!(clean.orders[0].order_date, date(2024, 1, 1));
    assert_eq!(report.issues_of(IssueKind::DuplicateId).count(), 0);
    assert_eq!(report.summary.records_excluded, 1);
}
