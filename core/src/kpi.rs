//! KPI calculator: pure functions over clean record sets.
//!
//! Undefined metrics (a mean over nothing, a turnover with no simulation)
//! are `None` and serialize as `null`. They are never folded into 0.
//! Rates over a total (fill rate, return rate) are defined as 0 when the
//! total is empty.

use crate::{
    classifier::Thresholds,
    record::{Order, Person, Return},
    stats::{quantile_sorted, ratio, RunningStats},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Stable metric names. Threshold schemes are keyed by these.
pub mod metric {
    pub const ORDER_COUNT: &str = "order_count";
    pub const TOTAL_SALES: &str = "total_sales";
    pub const TOTAL_UNITS: &str = "total_units";
    pub const AVG_ORDER_VALUE: &str = "avg_order_value";
    pub const UNIQUE_CUSTOMERS: &str = "unique_customers";
    pub const SHIPPED_ORDERS: &str = "shipped_orders";
    pub const FILL_RATE: &str = "fill_rate";
    pub const AVG_LEAD_TIME: &str = "avg_lead_time";
    pub const MEDIAN_LEAD_TIME: &str = "median_lead_time";
    pub const P95_LEAD_TIME: &str = "p95_lead_time";
    pub const MIN_LEAD_TIME: &str = "min_lead_time";
    pub const MAX_LEAD_TIME: &str = "max_lead_time";
    pub const LEAD_TIME_STD: &str = "lead_time_std";
    pub const VALID_LEAD_TIMES: &str = "valid_lead_times";
    pub const INVALID_LEAD_TIMES: &str = "invalid_lead_times";
    pub const RETURN_RATE: &str = "return_rate";
    pub const RETURNED_ORDERS: &str = "returned_orders";
    pub const TOTAL_RETURNS: &str = "total_returns";
    pub const DANGLING_RETURNS: &str = "dangling_returns";
    pub const PEOPLE_COUNT: &str = "people_count";
    pub const INVENTORY_TURNOVER: &str = "inventory_turnover";
}

/// What counts as a fully shipped order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillRatePolicy {
    /// Ship date present and shipped quantity equals ordered quantity when
    /// the source tracks shipped quantity; ship date alone otherwise.
    #[default]
    ShippedQuantity,
    /// Ship date present, shipped quantities ignored.
    ShipDate,
}

impl FillRatePolicy {
    pub fn fully_shipped(&self, order: &Order) -> bool {
        if order.ship_date.is_none() {
            return false;
        }
        match (self, order.quantity_shipped, order.quantity) {
            (Self::ShipDate, _, _) => true,
            (Self::ShippedQuantity, Some(shipped), Some(ordered)) => shipped == ordered,
            (Self::ShippedQuantity, _, _) => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub value: Option<f64>,
    pub band:  Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiSet {
    pub metrics: BTreeMap<String, Kpi>,
    /// Orders per lead-time band, from the `avg_lead_time` scheme applied
    /// to each valid lead time.
    pub lead_time_bands: BTreeMap<String, usize>,
}

impl KpiSet {
    /// Value of a metric; `None` when absent or undefined.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).and_then(|k| k.value)
    }

    pub fn band(&self, name: &str) -> Option<&str> {
        self.metrics.get(name).and_then(|k| k.band.as_deref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    fn set(&mut self, name: &str, value: Option<f64>, thresholds: &Thresholds) {
        let band = thresholds.classify(name, value);
        self.metrics.insert(name.to_string(), Kpi { value, band });
    }

    /// A new set with one more (classified) metric.
    pub fn with_metric(mut self, name: &str, value: Option<f64>, thresholds: &Thresholds) -> Self {
        self.set(name, value, thresholds);
        self
    }
}

pub struct KpiCalculator<'a> {
    pub policy:             FillRatePolicy,
    pub max_lead_time_days: i64,
    pub thresholds:         &'a Thresholds,
}

impl<'a> KpiCalculator<'a> {
    pub fn new(policy: FillRatePolicy, max_lead_time_days: i64, thresholds: &'a Thresholds) -> Self {
        Self { policy, max_lead_time_days, thresholds }
    }

    fn valid_lead_time(&self, order: &Order) -> Option<f64> {
        order
            .lead_time_days()
            .filter(|lt| (0..=self.max_lead_time_days).contains(lt))
            .map(|lt| lt as f64)
    }

    /// Compute the full KPI set. `returns` may include dangling returns;
    /// only those linked to one of `orders` count toward the return rate.
    pub fn compute(&self, orders: &[Order], returns: &[Return], people: &[Person]) -> KpiSet {
        let t = self.thresholds;
        let mut kpis = KpiSet::default();
        let order_count = orders.len() as f64;

        // Volume
        let sales: RunningStats = orders.iter().filter_map(|o| o.sales_amount).collect();
        let total_sales: f64 = orders.iter().filter_map(|o| o.sales_amount).sum();
        let total_units: f64 = orders.iter().filter_map(|o| o.quantity).map(|q| q as f64).sum();
        let customers: HashSet<&str> = orders
            .iter()
            .map(|o| o.customer_id.as_str())
            .filter(|c| !c.is_empty())
            .collect();
        kpis.set(metric::ORDER_COUNT, Some(order_count), t);
        kpis.set(metric::TOTAL_SALES, Some(total_sales), t);
        kpis.set(metric::TOTAL_UNITS, Some(total_units), t);
        kpis.set(metric::AVG_ORDER_VALUE, sales.mean(), t);
        kpis.set(metric::UNIQUE_CUSTOMERS, Some(customers.len() as f64), t);

        // Fulfilment
        let shipped = orders.iter().filter(|o| self.policy.fully_shipped(o)).count() as f64;
        kpis.set(metric::SHIPPED_ORDERS, Some(shipped), t);
        kpis.set(metric::FILL_RATE, Some(ratio(shipped, order_count).unwrap_or(0.0)), t);

        // Lead time
        let mut lead_times: Vec<f64> = orders.iter().filter_map(|o| self.valid_lead_time(o)).collect();
        let dated = orders.iter().filter(|o| o.lead_time_days().is_some()).count();
        let lt_stats: RunningStats = lead_times.iter().copied().collect();
        lead_times.sort_by(f64::total_cmp);
        kpis.set(metric::AVG_LEAD_TIME, lt_stats.mean(), t);
        kpis.set(metric::MEDIAN_LEAD_TIME, quantile_sorted(&lead_times, 0.5), t);
        kpis.set(metric::P95_LEAD_TIME, quantile_sorted(&lead_times, 0.95), t);
        kpis.set(metric::MIN_LEAD_TIME, lt_stats.min(), t);
        kpis.set(metric::MAX_LEAD_TIME, lt_stats.max(), t);
        kpis.set(metric::LEAD_TIME_STD, lt_stats.std_dev(), t);
        kpis.set(metric::VALID_LEAD_TIMES, Some(lead_times.len() as f64), t);
        kpis.set(metric::INVALID_LEAD_TIMES, Some((dated - lead_times.len()) as f64), t);

        if let Some(scheme) = t.scheme(metric::AVG_LEAD_TIME) {
            for name in scheme.band_names() {
                kpis.lead_time_bands.insert(name.to_string(), 0);
            }
            for lt in &lead_times {
                if let Some(name) = scheme.classify(*lt) {
                    *kpis.lead_time_bands.entry(name.to_string()).or_insert(0) += 1;
                }
            }
        }

        // Returns
        let order_ids: HashSet<&str> = orders.iter().map(|o| o.order_id.as_str()).collect();
        let returned: HashSet<&str> = returns
            .iter()
            .map(|r| r.order_id.as_str())
            .filter(|id| order_ids.contains(id))
            .collect();
        let dangling = returns.iter().filter(|r| !order_ids.contains(r.order_id.as_str())).count();
        kpis.set(
            metric::RETURN_RATE,
            Some(ratio(returned.len() as f64, order_count).unwrap_or(0.0)),
            t,
        );
        kpis.set(metric::RETURNED_ORDERS, Some(returned.len() as f64), t);
        kpis.set(metric::TOTAL_RETURNS, Some(returns.len() as f64), t);
        kpis.set(metric::DANGLING_RETURNS, Some(dangling as f64), t);

        kpis.set(metric::PEOPLE_COUNT, Some(people.len() as f64), t);
        kpis
    }
}
