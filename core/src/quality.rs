//! Data quality validator.
//!
//! Checks are independent and never fatal. A record with only warnings
//! stays in the clean set; a record with any critical issue is excluded
//! from downstream computation but keeps its entries in the report.
//! Source records are never modified.
//!
//! Duplicate ids are judged against records already kept, so an excluded
//! first occurrence never shadows a later valid one.

use crate::{
    config::{QualityConfig, RequiredFields},
    record::{Order, Person, RecordSet, Return},
    types::{EntityId, RecordKind},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingField,
    DuplicateId,
    NegativeAmount,
    NegativeQuantity,
    NegativeLeadTime,
    LeadTimeOutOfRange,
    OverShipped,
    UnknownOrder,
    UnknownCustomer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub record_kind: RecordKind,
    pub record_id:   EntityId,
    /// Position of the record within its validated batch; ids may be blank.
    pub position:    usize,
    pub issue:       IssueKind,
    pub severity:    Severity,
    pub field:       Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub orders_checked:   usize,
    pub returns_checked:  usize,
    pub people_checked:   usize,
    pub records_excluded: usize,
    pub critical_count:   usize,
    pub warning_count:    usize,
    /// Blank required values over (records × required fields).
    pub missing_data_ratio: f64,
    pub missing_data_alert: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub issues:  Vec<ValidationIssue>,
    pub summary: QualitySummary,
}

impl QualityReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn issues_of(&self, issue: IssueKind) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.issue == issue)
    }

    pub fn has_issue(&self, kind: RecordKind, record_id: &str, issue: IssueKind) -> bool {
        self.issues
            .iter()
            .any(|i| i.record_kind == kind && i.record_id == record_id && i.issue == issue)
    }

    fn absorb(&mut self, other: QualityReport) {
        self.issues.extend(other.issues);
        let s = &mut self.summary;
        let o = other.summary;
        s.orders_checked += o.orders_checked;
        s.returns_checked += o.returns_checked;
        s.people_checked += o.people_checked;
        s.records_excluded += o.records_excluded;
    }

    fn finish(&mut self, missing: usize, cells: usize, alert_ratio: f64) {
        self.summary.critical_count = self.count(Severity::Critical);
        self.summary.warning_count = self.count(Severity::Warning);
        self.summary.missing_data_ratio = if cells == 0 { 0.0 } else { missing as f64 / cells as f64 };
        self.summary.missing_data_alert = self.summary.missing_data_ratio > alert_ratio;
    }
}

/// Collects issues for one record.
struct Findings<'a> {
    kind:     RecordKind,
    id:       &'a str,
    position: usize,
    issues:   Vec<ValidationIssue>,
}

impl<'a> Findings<'a> {
    fn new(kind: RecordKind, id: &'a str, position: usize) -> Self {
        Self { kind, id, position, issues: Vec::new() }
    }

    fn flag(&mut self, issue: IssueKind, severity: Severity, field: Option<&str>) {
        self.issues.push(ValidationIssue {
            record_kind: self.kind,
            record_id:   self.id.to_string(),
            position:    self.position,
            issue,
            severity,
            field:       field.map(str::to_string),
        });
    }

    fn is_critical(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Critical)
    }
}

fn order_field_blank(order: &Order, field: &str) -> bool {
    match field {
        "order_id"         => order.order_id.is_empty(),
        "customer_id"      => order.customer_id.is_empty(),
        "product_category" => order.product_category.is_empty(),
        "region"           => order.region.is_empty(),
        "order_date"       => order.order_date.is_none(),
        "ship_date"        => order.ship_date.is_none(),
        "sales_amount"     => order.sales_amount.is_none(),
        "quantity"         => order.quantity.is_none(),
        "quantity_shipped" => order.quantity_shipped.is_none(),
        _ => false,
    }
}

fn return_field_blank(ret: &Return, field: &str) -> bool {
    match field {
        "return_id"     => ret.return_id.is_empty(),
        "order_id"      => ret.order_id.is_empty(),
        "return_reason" => ret.return_reason.is_empty(),
        "return_date"   => ret.return_date.is_none(),
        _ => false,
    }
}

fn person_field_blank(person: &Person, field: &str) -> bool {
    match field {
        "customer_id" => person.customer_id.is_empty(),
        "region"      => person.region.is_empty(),
        "segment"     => person.segment.is_empty(),
        _ => false,
    }
}

/// Primary ids and the order date are needed to place a record at all;
/// any other blank required value only weakens it.
fn blank_severity(kind: RecordKind, field: &str) -> Severity {
    match (kind, field) {
        (RecordKind::Order, "order_id" | "order_date")
        | (RecordKind::Return, "return_id")
        | (RecordKind::Person, "customer_id") => Severity::Critical,
        _ => Severity::Warning,
    }
}

pub struct Validator<'a> {
    required: &'a RequiredFields,
    quality:  &'a QualityConfig,
}

impl<'a> Validator<'a> {
    pub fn new(required: &'a RequiredFields, quality: &'a QualityConfig) -> Self {
        Self { required, quality }
    }

    /// Flag blank required fields (primary ids always count as required).
    /// Returns the number of blank required cells.
    fn check_blanks(
        &self,
        findings: &mut Findings<'_>,
        primary: &str,
        blank: impl Fn(&str) -> bool,
    ) -> usize {
        let required = self.required.for_kind(findings.kind);
        let mut missing = 0;
        let fields = std::iter::once(primary)
            .chain(required.iter().map(String::as_str).filter(|f| *f != primary));
        for field in fields {
            if blank(field) {
                missing += 1;
                findings.flag(IssueKind::MissingField, blank_severity(findings.kind, field), Some(field));
            }
        }
        missing
    }

    fn required_cells(&self, kind: RecordKind, primary: &str, records: usize) -> usize {
        let required = self.required.for_kind(kind);
        let extra = usize::from(!required.iter().any(|f| f == primary));
        records * (required.len() + extra)
    }

    /// Validate orders. `known_customers` is `None` when no people batch
    /// was supplied, which disables the customer reference check.
    pub fn validate_orders(
        &self,
        orders: &[Order],
        known_customers: Option<&HashSet<&str>>,
    ) -> (Vec<Order>, QualityReport) {
        let mut report = QualityReport::default();
        let mut clean = Vec::with_capacity(orders.len());
        let mut seen: HashSet<&str> = HashSet::new();
        let mut missing = 0;

        for (position, order) in orders.iter().enumerate() {
            let mut findings = Findings::new(RecordKind::Order, &order.order_id, position);
            missing += self.check_blanks(&mut findings, "order_id", |f| order_field_blank(order, f));

            if !order.order_id.is_empty() && seen.contains(order.order_id.as_str()) {
                findings.flag(IssueKind::DuplicateId, Severity::Critical, Some("order_id"));
            }
            if order.sales_amount.is_some_and(|s| s < 0.0) {
                findings.flag(IssueKind::NegativeAmount, Severity::Warning, Some("sales_amount"));
            }
            if order.quantity.is_some_and(|q| q < 0) {
                findings.flag(IssueKind::NegativeQuantity, Severity::Warning, Some("quantity"));
            }
            if order.quantity_shipped.is_some_and(|q| q < 0) {
                findings.flag(IssueKind::NegativeQuantity, Severity::Warning, Some("quantity_shipped"));
            }
            if let (Some(shipped), Some(ordered)) = (order.quantity_shipped, order.quantity) {
                if shipped > ordered {
                    findings.flag(IssueKind::OverShipped, Severity::Warning, Some("quantity_shipped"));
                }
            }
            match order.lead_time_days() {
                Some(lt) if lt < 0 => {
                    findings.flag(IssueKind::NegativeLeadTime, Severity::Warning, Some("ship_date"));
                }
                Some(lt) if lt > self.quality.max_lead_time_days => {
                    findings.flag(IssueKind::LeadTimeOutOfRange, Severity::Warning, Some("ship_date"));
                }
                _ => {}
            }
            if let Some(customers) = known_customers {
                if !order.customer_id.is_empty() && !customers.contains(order.customer_id.as_str()) {
                    findings.flag(IssueKind::UnknownCustomer, Severity::Warning, Some("customer_id"));
                }
            }

            if findings.is_critical() {
                report.summary.records_excluded += 1;
            } else {
                seen.insert(order.order_id.as_str());
                clean.push(order.clone());
            }
            report.issues.extend(findings.issues);
        }

        report.summary.orders_checked = orders.len();
        let cells = self.required_cells(RecordKind::Order, "order_id", orders.len());
        report.finish(missing, cells, self.quality.missing_data_alert_ratio);
        (clean, report)
    }

    /// Validate returns against the set of known order ids. Dangling
    /// references are warnings: the return stays clean.
    pub fn validate_returns(
        &self,
        returns: &[Return],
        known_orders: &HashSet<&str>,
    ) -> (Vec<Return>, QualityReport) {
        let mut report = QualityReport::default();
        let mut clean = Vec::with_capacity(returns.len());
        let mut seen: HashSet<&str> = HashSet::new();
        let mut missing = 0;

        for (position, ret) in returns.iter().enumerate() {
            let mut findings = Findings::new(RecordKind::Return, &ret.return_id, position);
            missing += self.check_blanks(&mut findings, "return_id", |f| return_field_blank(ret, f));

            if !ret.return_id.is_empty() && seen.contains(ret.return_id.as_str()) {
                findings.flag(IssueKind::DuplicateId, Severity::Critical, Some("return_id"));
            }
            if !ret.order_id.is_empty() && !known_orders.contains(ret.order_id.as_str()) {
                findings.flag(IssueKind::UnknownOrder, Severity::Warning, Some("order_id"));
            }

            if findings.is_critical() {
                report.summary.records_excluded += 1;
            } else {
                seen.insert(ret.return_id.as_str());
                clean.push(ret.clone());
            }
            report.issues.extend(findings.issues);
        }

        report.summary.returns_checked = returns.len();
        let cells = self.required_cells(RecordKind::Return, "return_id", returns.len());
        report.finish(missing, cells, self.quality.missing_data_alert_ratio);
        (clean, report)
    }

    pub fn validate_people(&self, people: &[Person]) -> (Vec<Person>, QualityReport) {
        let mut report = QualityReport::default();
        let mut clean = Vec::with_capacity(people.len());
        let mut seen: HashSet<&str> = HashSet::new();
        let mut missing = 0;

        for (position, person) in people.iter().enumerate() {
            let mut findings = Findings::new(RecordKind::Person, &person.customer_id, position);
            missing += self.check_blanks(&mut findings, "customer_id", |f| person_field_blank(person, f));

            if !person.customer_id.is_empty() && seen.contains(person.customer_id.as_str()) {
                findings.flag(IssueKind::DuplicateId, Severity::Critical, Some("customer_id"));
            }

            if findings.is_critical() {
                report.summary.records_excluded += 1;
            } else {
                seen.insert(person.customer_id.as_str());
                clean.push(person.clone());
            }
            report.issues.extend(findings.issues);
        }

        report.summary.people_checked = people.len();
        let cells = self.required_cells(RecordKind::Person, "customer_id", people.len());
        report.finish(missing, cells, self.quality.missing_data_alert_ratio);
        (clean, report)
    }

    /// Validate a full record set: people first, then orders against the
    /// known customers, then returns against the clean orders.
    pub fn validate(&self, records: &RecordSet) -> (RecordSet, QualityReport) {
        let (people, people_report) = self.validate_people(&records.people);

        let customers: HashSet<&str> = people.iter().map(|p| p.customer_id.as_str()).collect();
        let customer_check = (!records.people.is_empty()).then_some(&customers);
        let (orders, order_report) = self.validate_orders(&records.orders, customer_check);

        // Returns link only to orders that survive validation, matching
        // what the KPI calculator sees.
        let known_orders: HashSet<&str> = orders.iter().map(|o| o.order_id.as_str()).collect();
        let (returns, return_report) = self.validate_returns(&records.returns, &known_orders);

        let cells = self.required_cells(RecordKind::Order, "order_id", records.orders.len())
            + self.required_cells(RecordKind::Return, "return_id", records.returns.len())
            + self.required_cells(RecordKind::Person, "customer_id", records.people.len());
        let missing = [&order_report, &return_report, &people_report]
            .iter()
            .flat_map(|r| r.issues.iter())
            .filter(|i| i.issue == IssueKind::MissingField)
            .count();

        let mut report = QualityReport::default();
        report.absorb(order_report);
        report.absorb(return_report);
        report.absorb(people_report);
        report.finish(missing, cells, self.quality.missing_data_alert_ratio);

        if report.summary.missing_data_alert {
            log::warn!(
                "data quality: missing required data {:.2}% exceeds alert ratio {:.2}%",
                report.summary.missing_data_ratio * 100.0,
                self.quality.missing_data_alert_ratio * 100.0
            );
        }
        log::debug!(
            "validate: {} critical, {} warning, {} excluded",
            report.summary.critical_count,
            report.summary.warning_count,
            report.summary.records_excluded
        );

        (RecordSet { orders, returns, people }, report)
    }
}
