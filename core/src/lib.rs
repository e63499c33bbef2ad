//! Supply-chain metrics engine.
//!
//! Raw order, return and customer rows go in; a typed analytics summary
//! comes out: KPIs with performance bands, per-dimension tables, a data
//! quality report and seeded inventory projections.

pub mod aggregation;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod kpi;
pub mod normalizer;
pub mod quality;
pub mod record;
pub mod rng;
pub mod snapshot;
pub mod stats;
pub mod types;
