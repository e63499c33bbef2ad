//! The analytics engine: one snapshot in, one summary out.
//!
//! STAGE ORDER (fixed):
//!   1. Normalize   raw rows → canonical records + failures
//!   2. Validate    canonical records → clean records + quality report
//!   3. Simulate    clean orders → per-category inventory runs
//!   4. Compute     clean records → overall KPI set (+ turnover from 3)
//!   5. Aggregate   clean records → one table per configured dimension
//!
//! RULES:
//!   - Configuration is validated in `new()`; a run never fails on data.
//!   - The engine holds no mutable state. `run` takes `&self` and can be
//!     called from many threads over the same snapshot.
//!   - All randomness flows through one RngBank per run.

use crate::{
    aggregation::{AggregationTable, Aggregator, GroupDimension},
    config::EngineConfig,
    error::EngineResult,
    inventory::{overall_turnover, InventorySimulator, SimulationRun},
    kpi::{metric, KpiCalculator, KpiSet},
    normalizer::{NormalizationFailure, Normalizer},
    quality::{QualityReport, Validator},
    record::RecordSet,
    rng::{entropy_seed, RngBank},
    snapshot::RawSnapshot,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Identity of one computed summary. Recomputation always yields a new
/// generation id, even for an unchanged snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub id:           Uuid,
    pub generated_at: DateTime<Utc>,
    /// Snapshot fingerprint; `None` when the run started from records.
    pub fingerprint:  Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub generation:             Generation,
    pub kpis:                   KpiSet,
    pub tables:                 Vec<AggregationTable>,
    pub quality:                QualityReport,
    pub normalization_failures: Vec<NormalizationFailure>,
    /// Master seed the simulations ran with, if any ran.
    pub simulation_seed:        Option<u64>,
    pub simulations:            Vec<SimulationRun>,
}

impl AnalyticsSummary {
    pub fn table(&self, dimension: GroupDimension) -> Option<&AggregationTable> {
        self.tables.iter().find(|t| t.dimension == dimension)
    }

    pub fn simulation(&self, category: &str) -> Option<&SimulationRun> {
        self.simulations.iter().find(|r| r.category == category)
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct AnalyticsEngine {
    config: EngineConfig,
}

impl AnalyticsEngine {
    /// Validate the configuration and build the engine. Configuration
    /// errors are the only fatal errors the engine raises.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Full pipeline over a raw snapshot.
    pub fn run(&self, snapshot: &RawSnapshot) -> EngineResult<AnalyticsSummary> {
        let fingerprint = snapshot.fingerprint()?;
        let normalizer = Normalizer::new(&self.config.required_fields);
        let (records, failures) = normalizer.normalize_snapshot(snapshot);
        if !failures.is_empty() {
            log::warn!("normalization: {} rows could not be normalized", failures.len());
        }
        Ok(self.analyze(&records, failures, Some(fingerprint)))
    }

    /// Pipeline over already-canonical records (stages 2 onward).
    pub fn run_records(&self, records: &RecordSet) -> AnalyticsSummary {
        self.analyze(records, Vec::new(), None)
    }

    /// Serve a cached summary for this snapshot when one exists, else
    /// compute a fresh one. The cache is only read here; callers decide
    /// what to insert.
    pub fn run_cached(
        &self,
        snapshot: &RawSnapshot,
        cache: &SummaryCache,
    ) -> EngineResult<Arc<AnalyticsSummary>> {
        let fingerprint = snapshot.fingerprint()?;
        if let Some(hit) = cache.get(&fingerprint) {
            log::debug!("summary cache hit for {fingerprint}");
            return Ok(hit);
        }
        Ok(Arc::new(self.run(snapshot)?))
    }

    fn analyze(
        &self,
        records: &RecordSet,
        normalization_failures: Vec<NormalizationFailure>,
        fingerprint: Option<String>,
    ) -> AnalyticsSummary {
        let cfg = &self.config;

        let validator = Validator::new(&cfg.required_fields, &cfg.quality);
        let (clean, quality) = validator.validate(records);

        let (simulation_seed, simulations) = self.simulate(&clean);

        let calculator = KpiCalculator::new(
            cfg.fill_rate_policy,
            cfg.quality.max_lead_time_days,
            &cfg.thresholds,
        );
        let kpis = calculator
            .compute(&clean.orders, &clean.returns, &clean.people)
            .with_metric(
                metric::INVENTORY_TURNOVER,
                overall_turnover(&simulations),
                &cfg.thresholds,
            );

        let aggregator = Aggregator::new(
            &calculator,
            cfg.aggregation.sort_by.clone(),
            cfg.aggregation.descending,
        );
        let tables = cfg
            .aggregation
            .dimensions
            .iter()
            .map(|dimension| {
                let table = aggregator.aggregate(*dimension, &clean.orders, &clean.returns, &clean.people);
                self.attach_turnover(table, &simulations)
            })
            .collect();

        log::info!(
            "analytics run complete: {} orders ({} clean), {} returns, {} people, {} simulations",
            records.orders.len(),
            clean.orders.len(),
            clean.returns.len(),
            clean.people.len(),
            simulations.len()
        );

        AnalyticsSummary {
            generation: Generation {
                id: Uuid::new_v4(),
                generated_at: Utc::now(),
                fingerprint,
            },
            kpis,
            tables,
            quality,
            normalization_failures,
            simulation_seed,
            simulations,
        }
    }

    fn simulate(&self, clean: &RecordSet) -> (Option<u64>, Vec<SimulationRun>) {
        let sim = &self.config.simulation;
        if !sim.enabled {
            return (None, Vec::new());
        }
        let seed = sim.seed.unwrap_or_else(|| {
            let drawn = entropy_seed();
            log::info!("no simulation seed configured; drew {drawn}");
            drawn
        });
        let runs = InventorySimulator::new(sim).simulate_all(&clean.orders, &RngBank::new(seed));
        (Some(seed), runs)
    }

    /// Every row carries `inventory_turnover`. Only category rows can have
    /// a value: their category's simulated turnover.
    fn attach_turnover(&self, mut table: AggregationTable, runs: &[SimulationRun]) -> AggregationTable {
        let by_category = table.dimension == GroupDimension::Category;
        for row in &mut table.rows {
            let turnover = if by_category {
                runs.iter()
                    .find(|r| r.category == row.group_key)
                    .and_then(|r| r.summary.turnover)
            } else {
                None
            };
            row.kpis = std::mem::take(&mut row.kpis).with_metric(
                metric::INVENTORY_TURNOVER,
                turnover,
                &self.config.thresholds,
            );
        }
        table
    }
}

/// Read-only (to the engine) cache of summaries keyed by snapshot
/// fingerprint. Entries are valid for one engine configuration.
#[derive(Debug, Default)]
pub struct SummaryCache {
    entries: HashMap<String, Arc<AnalyticsSummary>>,
}

impl SummaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, fingerprint: &str) -> Option<Arc<AnalyticsSummary>> {
        self.entries.get(fingerprint).cloned()
    }

    /// Store a summary under its snapshot fingerprint. Summaries computed
    /// from bare records have no fingerprint and are not cached.
    pub fn insert(&mut self, summary: Arc<AnalyticsSummary>) -> bool {
        match summary.generation.fingerprint.clone() {
            Some(fp) => {
                self.entries.insert(fp, summary);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
