//! THE MOST IMPORTANT TEST IN THE PROJECT.
//!
//! Same seed, same parameters, same history.
//! The simulation traces must be byte-identical.
//! Any divergence is a blocker. Do not merge until fixed.

use chrono::NaiveDate;
use supply_metrics_core::{
    config::SimulationConfig,
    inventory::{demand_profiles, InventorySimulator, SimulationRun},
    record::Order,
    rng::RngBank,
};

fn history() -> Vec<Order> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
    (0..90)
        .map(|i| {
            let category = ["Technology", "Furniture", "Office Supplies"][i % 3];
            Order {
                order_id:         format!("O-{i:04}"),
                customer_id:      format!("C-{}", i % 17),
                product_category: category.to_string(),
                region:           "West".to_string(),
                order_date:       Some(start + chrono::Duration::days(i as i64 / 3)),
                ship_date:        None,
                sales_amount:     Some(40.0),
                quantity:         Some(1 + (i % 5) as i64),
                quantity_shipped: None,
            }
        })
        .collect()
}

fn run(seed: u64, config: &SimulationConfig) -> Vec<SimulationRun> {
    InventorySimulator::new(config).simulate_all(&history(), &RngBank::new(seed))
}

fn serialized(runs: &[SimulationRun]) -> Vec<String> {
    runs.iter()
        .map(|r| serde_json::to_string(&r.trace).expect("serialize trace"))
        .collect()
}

#[test]
fn same_seed_produces_identical_traces() {
    const SEED: u64 = 0xDEAD_BEEF_CAFE_1234;
    let config = SimulationConfig { horizon_days: 365, ..SimulationConfig::default() };

    let a = serialized(&run(SEED, &config));
    let b = serialized(&run(SEED, &config));

    assert_eq!(a.len(), b.len(), "Run counts differ: {} vs {}", a.len(), b.len());
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        assert_eq!(x, y, "Trace diverged for category #{i}");
    }
}

#[test]
fn different_seeds_produce_different_traces() {
    let config = SimulationConfig::default();
    let a = serialized(&run(1, &config));
    let b = serialized(&run(2, &config));
    assert_ne!(a, b, "Different seeds should produce different demand draws");
}

#[test]
fn adding_a_category_leaves_others_untouched() {
    let config = SimulationConfig::default();
    let bank = RngBank::new(99);
    let simulator = InventorySimulator::new(&config);

    let base = simulator.simulate_all(&history(), &bank);
    let mut extended = history();
    let mut extra = extended[0].clone();
    extra.order_id = "O-extra".to_string();
    extra.product_category = "Appliances".to_string();
    extra.quantity = Some(0);
    extended.push(extra);
    let grown = simulator.simulate_all(&extended, &bank);

    for original in &base {
        let same = grown
            .iter()
            .find(|r| r.category == original.category)
            .expect("category still simulated");
        assert_eq!(same.trace, original.trace, "{} changed", original.category);
    }
}

#[test]
fn zero_variability_ignores_the_seed() {
    let config = SimulationConfig { demand_variability: 0.0, ..SimulationConfig::default() };
    let a = serialized(&run(1, &config));
    let b = serialized(&run(2, &config));
    assert_eq!(a, b, "Zero-variability demand must not depend on the seed");
}

#[test]
fn trace_covers_horizon_and_restocks_on_schedule() {
    let config = SimulationConfig { horizon_days: 21, restock_frequency_days: 7, ..SimulationConfig::default() };
    let runs = run(7, &config);
    let profiles = demand_profiles(&history());
    assert_eq!(runs.len(), profiles.len());

    for r in &runs {
        assert_eq!(r.trace.len(), 21);
        assert_eq!(r.params.seed, 7);
        for day in &r.trace {
            if (day.day_index + 1) % 7 != 0 {
                assert_eq!(day.restocked, 0, "{} restocked off schedule on day {}", r.category, day.day_index);
            } else {
                assert_eq!(day.projected_inventory, r.summary.target_level.max(day.projected_inventory - day.restocked));
            }
            assert!(day.units_sold <= day.demand);
            assert_eq!(day.stockout, day.demand > day.units_sold);
        }
    }
}
