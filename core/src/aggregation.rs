//! Aggregation engine: per-dimension KPI tables.
//!
//! Each group gets the same KPI set as the whole snapshot, computed over
//! the group's orders and the returns linked to them. Rows are ranked by
//! the configured sort key; ties break on the group key ascending, and
//! undefined sort values rank last, so output order is deterministic.

use crate::{
    kpi::{metric, KpiCalculator, KpiSet},
    record::{Order, Person, Return},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Key used for records whose grouping field is blank.
pub const UNKNOWN_GROUP: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupDimension {
    Region,
    Category,
    /// Calendar year-month of the order date (naive dates).
    Month,
    /// Customer segment, joined from people by customer id.
    Segment,
}

impl GroupDimension {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Region   => "region",
            Self::Category => "category",
            Self::Month    => "month",
            Self::Segment  => "segment",
        }
    }

    fn key(&self, order: &Order, segments: &HashMap<&str, &str>) -> String {
        let key = match self {
            Self::Region   => order.region.clone(),
            Self::Category => order.product_category.clone(),
            Self::Month    => order
                .order_date
                .map(|d| d.format("%Y-%m").to_string())
                .unwrap_or_default(),
            Self::Segment  => segments
                .get(order.customer_id.as_str())
                .map(|s| s.to_string())
                .unwrap_or_default(),
        };
        if key.is_empty() { UNKNOWN_GROUP.to_string() } else { key }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    GroupKey,
    TotalSales,
    OrderCount,
    /// Any metric of the KPI set, by name.
    Metric(String),
}

impl SortKey {
    fn value(&self, kpis: &KpiSet) -> Option<f64> {
        match self {
            Self::GroupKey     => None,
            Self::TotalSales   => kpis.value(metric::TOTAL_SALES),
            Self::OrderCount   => kpis.value(metric::ORDER_COUNT),
            Self::Metric(name) => kpis.value(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationRow {
    /// 1-based position after sorting.
    pub rank:      usize,
    pub group_key: String,
    pub kpis:      KpiSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationTable {
    pub dimension: GroupDimension,
    pub sort_by:   SortKey,
    pub rows:      Vec<AggregationRow>,
}

impl AggregationTable {
    pub fn row(&self, group_key: &str) -> Option<&AggregationRow> {
        self.rows.iter().find(|r| r.group_key == group_key)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.group_key.as_str()).collect()
    }
}

pub struct Aggregator<'a> {
    calculator: &'a KpiCalculator<'a>,
    sort_by:    SortKey,
    descending: bool,
}

impl<'a> Aggregator<'a> {
    pub fn new(calculator: &'a KpiCalculator<'a>, sort_by: SortKey, descending: bool) -> Self {
        Self { calculator, sort_by, descending }
    }

    pub fn aggregate(
        &self,
        dimension: GroupDimension,
        orders: &[Order],
        returns: &[Return],
        people: &[Person],
    ) -> AggregationTable {
        let segments: HashMap<&str, &str> = people
            .iter()
            .map(|p| (p.customer_id.as_str(), p.segment.as_str()))
            .collect();

        let mut groups: BTreeMap<String, Vec<Order>> = BTreeMap::new();
        let mut order_group: HashMap<&str, String> = HashMap::new();
        for order in orders {
            let key = dimension.key(order, &segments);
            order_group.entry(order.order_id.as_str()).or_insert_with(|| key.clone());
            groups.entry(key).or_default().push(order.clone());
        }

        let mut group_returns: HashMap<&str, Vec<Return>> = HashMap::new();
        for ret in returns {
            if let Some(key) = order_group.get(ret.order_id.as_str()) {
                group_returns.entry(key.as_str()).or_default().push(ret.clone());
            }
        }

        let mut rows: Vec<AggregationRow> = groups
            .iter()
            .map(|(key, group_orders)| {
                let customers: HashSet<&str> =
                    group_orders.iter().map(|o| o.customer_id.as_str()).collect();
                let group_people: Vec<Person> = people
                    .iter()
                    .filter(|p| customers.contains(p.customer_id.as_str()))
                    .cloned()
                    .collect();
                let linked = group_returns.get(key.as_str()).map(Vec::as_slice).unwrap_or(&[]);
                AggregationRow {
                    rank: 0,
                    group_key: key.clone(),
                    kpis: self.calculator.compute(group_orders, linked, &group_people),
                }
            })
            .collect();

        rows.sort_by(|a, b| self.compare(a, b));
        for (i, row) in rows.iter_mut().enumerate() {
            row.rank = i + 1;
        }

        log::debug!(
            "aggregate by {}: {} orders into {} groups",
            dimension.name(),
            orders.len(),
            rows.len()
        );

        AggregationTable { dimension, sort_by: self.sort_by.clone(), rows }
    }

    fn compare(&self, a: &AggregationRow, b: &AggregationRow) -> Ordering {
        let by_key = a.group_key.cmp(&b.group_key);
        if self.sort_by == SortKey::GroupKey {
            return if self.descending { by_key.reverse() } else { by_key };
        }
        let primary = match (self.sort_by.value(&a.kpis), self.sort_by.value(&b.kpis)) {
            (Some(x), Some(y)) => {
                let ord = x.total_cmp(&y);
                if self.descending { ord.reverse() } else { ord }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None)    => Ordering::Equal,
        };
        primary.then(by_key)
    }
}
