//! Inventory simulator: discrete-day stock projection per category.
//!
//! DAILY STEP (fixed order):
//!   1. Draw demand ~ Normal(mean, mean × demand_variability), rounded,
//!      floored at 0.
//!   2. Sell min(demand, stock). Demand above stock flags a stockout.
//!   3. Every `restock_frequency_days` days, replenish up to the target
//!      level (mean × restock interval × safety factor, rounded up).
//!
//! All randomness comes from the category's keyed stream of the run's
//! RngBank, so a run is fully determined by (seed, parameters, history).

use crate::{
    config::SimulationConfig,
    record::Order,
    rng::{RngBank, StreamRng},
    stats::ratio,
    types::DayIndex,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters a run was produced with, recorded alongside its trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub horizon_days:           u32,
    pub restock_frequency_days: u32,
    pub demand_variability:     f64,
    pub safety_factor:          f64,
    pub initial_stock:          Option<u32>,
    pub seed:                   u64,
}

/// Historical demand for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandProfile {
    pub category:          String,
    pub total_units:       u64,
    pub history_days:      u32,
    pub mean_daily_demand: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayState {
    pub day_index:           DayIndex,
    pub demand:              u32,
    pub units_sold:          u32,
    pub restocked:           u32,
    /// End-of-day stock, after any restock.
    pub projected_inventory: u32,
    pub stockout:            bool,
    /// Stock after the day's sales was at or below the alert level.
    pub low_stock:           bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub initial_stock:     u32,
    pub target_level:      u32,
    pub stockout_days:     u32,
    pub low_stock_days:    u32,
    pub ending_inventory:  u32,
    pub units_demanded:    u64,
    pub units_sold:        u64,
    pub average_inventory: f64,
    /// Units sold / average inventory. Undefined when nothing was held.
    pub turnover:          Option<f64>,
    /// Units sold / units demanded. Undefined when nothing was demanded.
    pub service_level:     Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
    pub category: String,
    pub params:   SimulationParams,
    pub profile:  DemandProfile,
    pub trace:    Vec<DayState>,
    pub summary:  SimulationSummary,
}

/// Build per-category demand profiles. The history window is the span of
/// order dates across the whole batch, so sparse categories are not
/// inflated by a short window of their own.
pub fn demand_profiles(orders: &[Order]) -> Vec<DemandProfile> {
    let dates = orders.iter().filter_map(|o| o.order_date);
    let (first, last) = match (dates.clone().min(), dates.max()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Vec::new(),
    };
    let history_days = ((last - first).num_days() + 1).max(1) as u32;

    let mut units: BTreeMap<&str, u64> = BTreeMap::new();
    for order in orders {
        if order.product_category.is_empty() {
            continue;
        }
        let qty = order.quantity.unwrap_or(0).max(0) as u64;
        let total = units.entry(order.product_category.as_str()).or_insert(0);
        *total = total.saturating_add(qty);
    }

    units
        .into_iter()
        .map(|(category, total_units)| DemandProfile {
            category: category.to_string(),
            total_units,
            history_days,
            mean_daily_demand: total_units as f64 / history_days as f64,
        })
        .collect()
}

pub struct InventorySimulator<'a> {
    config: &'a SimulationConfig,
}

impl<'a> InventorySimulator<'a> {
    pub fn new(config: &'a SimulationConfig) -> Self {
        Self { config }
    }

    fn params(&self, seed: u64) -> SimulationParams {
        SimulationParams {
            horizon_days:           self.config.horizon_days,
            restock_frequency_days: self.config.restock_frequency_days,
            demand_variability:     self.config.demand_variability,
            safety_factor:          self.config.safety_factor,
            initial_stock:          self.config.initial_stock,
            seed,
        }
    }

    pub fn target_level(&self, mean_daily_demand: f64) -> u32 {
        let target = mean_daily_demand
            * self.config.restock_frequency_days as f64
            * self.config.safety_factor;
        target.ceil().clamp(0.0, u32::MAX as f64) as u32
    }

    fn draw_demand(&self, mean: f64, rng: &mut StreamRng) -> u32 {
        let draw = rng.normal(mean, mean * self.config.demand_variability);
        draw.round().clamp(0.0, u32::MAX as f64) as u32
    }

    /// Simulate one category. The caller supplies the category's stream.
    pub fn simulate(&self, profile: &DemandProfile, seed: u64, rng: &mut StreamRng) -> SimulationRun {
        let cfg = self.config;
        let mean = profile.mean_daily_demand;
        let target = self.target_level(mean);
        let initial = cfg.initial_stock.unwrap_or(target);
        let alert_level = (target as f64 * cfg.low_stock_alert_ratio).floor() as u32;

        let mut stock = initial;
        let mut trace = Vec::with_capacity(cfg.horizon_days as usize);
        for day in 0..cfg.horizon_days {
            let demand = self.draw_demand(mean, rng);
            let sold = demand.min(stock);
            let stockout = demand > stock;
            stock -= sold;
            let low_stock = stock <= alert_level;

            let restocked = if (day + 1) % cfg.restock_frequency_days == 0 {
                target.saturating_sub(stock)
            } else {
                0
            };
            stock = stock.saturating_add(restocked);

            trace.push(DayState {
                day_index: day,
                demand,
                units_sold: sold,
                restocked,
                projected_inventory: stock,
                stockout,
                low_stock,
            });
        }

        let units_demanded: u64 = trace.iter().map(|d| d.demand as u64).sum();
        let units_sold: u64 = trace.iter().map(|d| d.units_sold as u64).sum();
        let average_inventory = if trace.is_empty() {
            0.0
        } else {
            trace.iter().map(|d| d.projected_inventory as f64).sum::<f64>() / trace.len() as f64
        };

        let summary = SimulationSummary {
            initial_stock:    initial,
            target_level:     target,
            stockout_days:    trace.iter().filter(|d| d.stockout).count() as u32,
            low_stock_days:   trace.iter().filter(|d| d.low_stock).count() as u32,
            ending_inventory: stock,
            units_demanded,
            units_sold,
            average_inventory,
            turnover:         ratio(units_sold as f64, average_inventory),
            service_level:    ratio(units_sold as f64, units_demanded as f64),
        };

        if summary.stockout_days > 0 {
            log::debug!(
                "simulate {}: {} stockout days over {} days (target {target})",
                profile.category,
                summary.stockout_days,
                cfg.horizon_days
            );
        }

        SimulationRun {
            category: profile.category.clone(),
            params: self.params(seed),
            profile: profile.clone(),
            trace,
            summary,
        }
    }

    /// Simulate every category present in `orders`, in category order.
    pub fn simulate_all(&self, orders: &[Order], bank: &RngBank) -> Vec<SimulationRun> {
        demand_profiles(orders)
            .iter()
            .map(|profile| {
                let mut rng = bank.for_key(&profile.category);
                self.simulate(profile, bank.master_seed(), &mut rng)
            })
            .collect()
    }
}

/// Turnover across runs: total units sold / summed average inventory.
pub fn overall_turnover(runs: &[SimulationRun]) -> Option<f64> {
    if runs.is_empty() {
        return None;
    }
    let sold: u64 = runs.iter().map(|r| r.summary.units_sold).sum();
    let held: f64 = runs.iter().map(|r| r.summary.average_inventory).sum();
    ratio(sold as f64, held)
}
