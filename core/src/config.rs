//! Engine configuration.
//!
//! RULE: There is no process-wide config. An `EngineConfig` is built
//! (or loaded) once, validated, and passed explicitly to each stage.

use crate::{
    aggregation::{GroupDimension, SortKey},
    classifier::Thresholds,
    error::{EngineError, EngineResult},
    kpi::FillRatePolicy,
    normalizer::known_fields,
    types::RecordKind,
};
use serde::{Deserialize, Serialize};

/// Required canonical fields per entity kind. An absent required column
/// fails normalization for that row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredFields {
    pub orders:  Vec<String>,
    pub returns: Vec<String>,
    pub people:  Vec<String>,
}

impl RequiredFields {
    pub fn for_kind(&self, kind: RecordKind) -> &[String] {
        match kind {
            RecordKind::Order  => &self.orders,
            RecordKind::Return => &self.returns,
            RecordKind::Person => &self.people,
        }
    }

    fn validate(&self) -> EngineResult<()> {
        for kind in [RecordKind::Order, RecordKind::Return, RecordKind::Person] {
            for field in self.for_kind(kind) {
                if !known_fields(kind).any(|known| known == field) {
                    return Err(EngineError::InvalidConfig(format!(
                        "unknown required field '{field}' for {kind} records"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for RequiredFields {
    fn default() -> Self {
        let owned = |fields: &[&str]| -> Vec<String> { fields.iter().map(|f| f.to_string()).collect() };
        Self {
            orders: owned(&[
                "order_id",
                "customer_id",
                "product_category",
                "region",
                "order_date",
                "sales_amount",
                "quantity",
            ]),
            returns: owned(&["order_id"]),
            people:  owned(&["customer_id"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub enabled: bool,
    pub horizon_days: u32,
    pub restock_frequency_days: u32,
    /// Demand standard deviation as a fraction of mean daily demand.
    pub demand_variability: f64,
    /// Multiplier on (mean demand × restock interval) for the target level.
    pub safety_factor: f64,
    /// Starting units per category. `None` starts at the target level.
    pub initial_stock: Option<u32>,
    /// Master seed. `None` draws one from OS entropy per run.
    pub seed: Option<u64>,
    pub max_horizon_days: u32,
    /// Inventory at or below this fraction of target counts as low stock.
    pub low_stock_alert_ratio: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            horizon_days: 30,
            restock_frequency_days: 7,
            demand_variability: 0.2,
            safety_factor: 1.2,
            initial_stock: None,
            seed: None,
            max_horizon_days: 3_650,
            low_stock_alert_ratio: 0.1,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |parameter: &'static str, reason: String| {
            Err(EngineError::InvalidSimulation { parameter, reason })
        };
        if self.horizon_days == 0 {
            return invalid("horizon_days", "must be positive".into());
        }
        if self.max_horizon_days == 0 {
            return invalid("max_horizon_days", "must be positive".into());
        }
        if self.horizon_days > self.max_horizon_days {
            return Err(EngineError::HorizonExceedsCap {
                horizon_days: self.horizon_days,
                cap: self.max_horizon_days,
            });
        }
        if self.restock_frequency_days == 0 {
            return invalid("restock_frequency_days", "must be positive".into());
        }
        if !self.demand_variability.is_finite() || self.demand_variability < 0.0 {
            return invalid(
                "demand_variability",
                format!("must be a finite non-negative fraction, got {}", self.demand_variability),
            );
        }
        if !self.safety_factor.is_finite() || self.safety_factor <= 0.0 {
            return invalid(
                "safety_factor",
                format!("must be finite and positive, got {}", self.safety_factor),
            );
        }
        if !(0.0..=1.0).contains(&self.low_stock_alert_ratio) {
            return invalid(
                "low_stock_alert_ratio",
                format!("must be within [0, 1], got {}", self.low_stock_alert_ratio),
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub dimensions: Vec<GroupDimension>,
    pub sort_by: SortKey,
    pub descending: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            dimensions: vec![
                GroupDimension::Region,
                GroupDimension::Category,
                GroupDimension::Month,
            ],
            sort_by: SortKey::TotalSales,
            descending: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Lead times above this are implausible: flagged, and left out of
    /// lead-time statistics.
    pub max_lead_time_days: i64,
    /// Missing-data ratio above which the report raises an alert.
    pub missing_data_alert_ratio: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            max_lead_time_days: 30,
            missing_data_alert_ratio: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: Thresholds,
    pub simulation: SimulationConfig,
    pub aggregation: AggregationConfig,
    pub required_fields: RequiredFields,
    pub fill_rate_policy: FillRatePolicy,
    pub quality: QualityConfig,
}

impl EngineConfig {
    /// Load from a JSON file. Missing sections fall back to defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Fatal checks run before any computation.
    pub fn validate(&self) -> EngineResult<()> {
        self.thresholds.validate()?;
        self.simulation.validate()?;
        self.required_fields.validate()?;
        if self.quality.max_lead_time_days < 0 {
            return Err(EngineError::InvalidConfig(
                "quality.max_lead_time_days must be non-negative".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.quality.missing_data_alert_ratio) {
            return Err(EngineError::InvalidConfig(
                "quality.missing_data_alert_ratio must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }

    /// Config with a fixed seed for use in tests.
    pub fn default_test() -> Self {
        Self {
            simulation: SimulationConfig {
                seed: Some(42),
                ..SimulationConfig::default()
            },
            ..Self::default()
        }
    }
}
