//! metrics-runner: headless runner for the supply-chain metrics engine.
//!
//! Usage:
//!   metrics-runner --orders orders.json --returns returns.json --people people.json
//!   metrics-runner --config engine.json --seed 12345 --json
//!   metrics-runner --demo --seed 7
//!
//! Row files hold either a bare JSON array of row objects (read as a
//! spreadsheet named after the file) or a `{ "source": ..., "rows": [...] }`
//! batch. With no row files the runner uses the seeded demo snapshot.

mod demo;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;
use supply_metrics_core::{
    aggregation::AggregationTable,
    config::EngineConfig,
    engine::{AnalyticsEngine, AnalyticsSummary},
    kpi::{metric, KpiSet},
    quality::Severity,
    snapshot::{RawBatch, RawRow, RawSnapshot, SourceTag},
};

#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Batch(RawBatch),
    Rows(Vec<RawRow>),
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let json_out = args.iter().any(|a| a == "--json");
    let seed = flag_value(&args, "--seed")
        .map(|s| s.parse::<u64>().with_context(|| format!("--seed expects an integer, got {s}")))
        .transpose()?;
    let top = parse_arg(&args, "--top", 5usize);

    let mut config = match flag_value(&args, "--config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if seed.is_some() {
        config.simulation.seed = seed;
    }

    let orders = flag_value(&args, "--orders");
    let demo_mode = args.iter().any(|a| a == "--demo") || orders.is_none();
    let snapshot = if demo_mode {
        let demo_seed = seed.unwrap_or(42);
        log::info!("no order file given; using demo snapshot (seed {demo_seed})");
        demo::sample_snapshot(demo_seed)
    } else {
        RawSnapshot {
            orders:  load_batch(orders, "Orders")?,
            returns: load_batch(flag_value(&args, "--returns"), "Returns")?,
            people:  load_batch(flag_value(&args, "--people"), "People")?,
        }
    };

    if !json_out {
        println!("Supply-chain metrics runner");
        println!("  mode:     {}", if demo_mode { "demo" } else { "files" });
        println!("  orders:   {} rows", snapshot.orders.len());
        println!("  returns:  {} rows", snapshot.returns.len());
        println!("  people:   {} rows", snapshot.people.len());
        println!();
    }

    let engine = AnalyticsEngine::new(config)?;
    let summary = engine.run(&snapshot)?;

    if json_out {
        println!("{}", summary.to_json()?);
    } else {
        print_summary(&summary, top);
    }
    Ok(())
}

/// Read one row file. A missing flag yields an empty batch.
fn load_batch(path: Option<&str>, default_sheet: &str) -> Result<RawBatch> {
    let Some(path) = path else {
        return Ok(RawBatch::empty(SourceTag::sheet(default_sheet)));
    };
    let content = std::fs::read_to_string(path).with_context(|| format!("Cannot read {path}"))?;
    let parsed: BatchFile =
        serde_json::from_str(&content).with_context(|| format!("Cannot parse {path}"))?;
    Ok(match parsed {
        BatchFile::Batch(batch) => batch,
        BatchFile::Rows(rows) => {
            let sheet = Path::new(path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(default_sheet);
            RawBatch::new(SourceTag::sheet(sheet), rows)
        }
    })
}

fn print_summary(summary: &AnalyticsSummary, top: usize) {
    let generation = &summary.generation;
    println!("=== RUN SUMMARY ===");
    println!("  generation:   {}", generation.id);
    println!("  generated at: {}", generation.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(fp) = &generation.fingerprint {
        println!("  fingerprint:  {}", &fp[..fp.len().min(16)]);
    }
    if let Some(seed) = summary.simulation_seed {
        println!("  sim seed:     {seed}");
    }

    println!();
    println!("=== KPIs ===");
    print_kpis(&summary.kpis);
    if !summary.kpis.lead_time_bands.is_empty() {
        let bands: Vec<String> = summary
            .kpis
            .lead_time_bands
            .iter()
            .map(|(band, count)| format!("{band}: {count}"))
            .collect();
        println!("  lead time bands: {}", bands.join(", "));
    }

    println!();
    println!("=== DATA QUALITY ===");
    let q = &summary.quality.summary;
    println!("  rows not normalized: {}", summary.normalization_failures.len());
    println!("  critical issues:     {}", summary.quality.count(Severity::Critical));
    println!("  warnings:            {}", summary.quality.count(Severity::Warning));
    println!("  records excluded:    {}", q.records_excluded);
    println!(
        "  missing data:        {:.2}%{}",
        q.missing_data_ratio * 100.0,
        if q.missing_data_alert { "  (ALERT)" } else { "" }
    );

    for table in &summary.tables {
        println!();
        print_table(table, top);
    }

    if !summary.simulations.is_empty() {
        println!();
        println!("=== INVENTORY SIMULATION ===");
        for run in &summary.simulations {
            let s = &run.summary;
            println!(
                "  {:<18} | target {:>5} | end {:>5} | stockout days {:>3} | turnover {}",
                run.category,
                s.target_level,
                s.ending_inventory,
                s.stockout_days,
                fmt_value(s.turnover)
            );
        }
    }
}

fn print_kpis(kpis: &KpiSet) {
    for name in [
        metric::ORDER_COUNT,
        metric::TOTAL_SALES,
        metric::AVG_ORDER_VALUE,
        metric::FILL_RATE,
        metric::AVG_LEAD_TIME,
        metric::P95_LEAD_TIME,
        metric::RETURN_RATE,
        metric::INVENTORY_TURNOVER,
    ] {
        let band = kpis.band(name).map(|b| format!(" [{b}]")).unwrap_or_default();
        println!("  {name:<20} {}{band}", fmt_value(kpis.value(name)));
    }
}

fn print_table(table: &AggregationTable, top: usize) {
    println!("=== BY {} ===", table.dimension.name().to_uppercase());
    for row in table.rows.iter().take(top) {
        println!(
            "  #{:<2} {:<18} | orders {:>5} | sales {:>12} | fill {} | lead {}",
            row.rank,
            row.group_key,
            fmt_value(row.kpis.value(metric::ORDER_COUNT)),
            fmt_value(row.kpis.value(metric::TOTAL_SALES)),
            fmt_value(row.kpis.value(metric::FILL_RATE)),
            fmt_value(row.kpis.value(metric::AVG_LEAD_TIME)),
        );
    }
    if table.rows.len() > top {
        println!("  ... {} more", table.rows.len() - top);
    }
}

fn fmt_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{v:.0}"),
        Some(v) => format!("{v:.2}"),
        None => "n/a".to_string(),
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
