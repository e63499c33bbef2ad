//! Threshold classifier: numeric KPI value → qualitative band.
//!
//! A scheme lists bands best first. Every band but the last carries a
//! cutoff; the last band is open and catches everything else, so the
//! bands partition the real line with no gaps. Boundary values resolve
//! to the better band because cutoffs are inclusive.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Cutoffs are inclusive upper bounds (lead time, return rate).
    LowerIsBetter,
    /// Cutoffs are inclusive lower bounds (fill rate, turnover).
    HigherIsBetter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub name: String,
    /// `None` only on the last, open-ended band.
    #[serde(default)]
    pub cutoff: Option<f64>,
}

impl Band {
    pub fn bounded(name: &str, cutoff: f64) -> Self {
        Self { name: name.into(), cutoff: Some(cutoff) }
    }

    pub fn open(name: &str) -> Self {
        Self { name: name.into(), cutoff: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandScheme {
    pub direction: Direction,
    pub bands: Vec<Band>,
}

impl BandScheme {
    pub fn lower_is_better(bands: Vec<Band>) -> Self {
        Self { direction: Direction::LowerIsBetter, bands }
    }

    pub fn higher_is_better(bands: Vec<Band>) -> Self {
        Self { direction: Direction::HigherIsBetter, bands }
    }

    /// Check the scheme is total and ordered. `metric` is only used for
    /// the error message.
    pub fn validate(&self, metric: &str) -> EngineResult<()> {
        let fail = |reason: String| EngineError::InvalidBands {
            metric: metric.to_string(),
            reason,
        };

        let (last, bounded) = self
            .bands
            .split_last()
            .ok_or_else(|| fail("scheme has no bands".into()))?;

        if last.cutoff.is_some() {
            return Err(fail(format!(
                "last band '{}' must be open (no cutoff) so every value is classified",
                last.name
            )));
        }

        let mut names = HashSet::new();
        for band in &self.bands {
            if band.name.trim().is_empty() {
                return Err(fail("band names must be non-empty".into()));
            }
            if !names.insert(band.name.as_str()) {
                return Err(fail(format!("duplicate band name '{}'", band.name)));
            }
        }

        let mut previous: Option<f64> = None;
        for band in bounded {
            let cutoff = band
                .cutoff
                .ok_or_else(|| fail(format!("band '{}' is missing its cutoff", band.name)))?;
            if !cutoff.is_finite() {
                return Err(fail(format!("band '{}' has a non-finite cutoff", band.name)));
            }
            if let Some(prev) = previous {
                let ordered = match self.direction {
                    Direction::LowerIsBetter  => cutoff > prev,
                    Direction::HigherIsBetter => cutoff < prev,
                };
                if !ordered {
                    return Err(fail(format!(
                        "cutoff {cutoff} of band '{}' is out of order after {prev}",
                        band.name
                    )));
                }
            }
            previous = Some(cutoff);
        }
        Ok(())
    }

    /// Resolve `value` to exactly one band name. `None` only for NaN.
    pub fn classify(&self, value: f64) -> Option<&str> {
        if value.is_nan() {
            return None;
        }
        self.bands
            .iter()
            .find(|band| match (band.cutoff, self.direction) {
                (None, _) => true,
                (Some(c), Direction::LowerIsBetter)  => value <= c,
                (Some(c), Direction::HigherIsBetter) => value >= c,
            })
            .map(|band| band.name.as_str())
    }

    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.iter().map(|b| b.name.as_str())
    }
}

/// Band schemes keyed by metric name. New metrics are classified by
/// adding an entry; no code change needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thresholds {
    schemes: BTreeMap<String, BandScheme>,
}

impl Thresholds {
    pub fn new(schemes: BTreeMap<String, BandScheme>) -> Self {
        Self { schemes }
    }

    pub fn empty() -> Self {
        Self { schemes: BTreeMap::new() }
    }

    pub fn with_scheme(mut self, metric: &str, scheme: BandScheme) -> Self {
        self.schemes.insert(metric.to_string(), scheme);
        self
    }

    pub fn scheme(&self, metric: &str) -> Option<&BandScheme> {
        self.schemes.get(metric)
    }

    /// Classify a metric value. `None` when the metric has no scheme or
    /// the value is undefined.
    pub fn classify(&self, metric: &str, value: Option<f64>) -> Option<String> {
        let scheme = self.schemes.get(metric)?;
        scheme.classify(value?).map(str::to_string)
    }

    pub fn validate(&self) -> EngineResult<()> {
        for (metric, scheme) in &self.schemes {
            scheme.validate(metric)?;
        }
        Ok(())
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        use crate::kpi::metric;

        Self::empty()
            .with_scheme(
                metric::AVG_LEAD_TIME,
                BandScheme::lower_is_better(vec![
                    Band::bounded("excellent", 3.0),
                    Band::bounded("good", 7.0),
                    Band::open("poor"),
                ]),
            )
            .with_scheme(
                metric::FILL_RATE,
                BandScheme::higher_is_better(vec![
                    Band::bounded("excellent", 0.95),
                    Band::bounded("good", 0.85),
                    Band::open("poor"),
                ]),
            )
            .with_scheme(
                metric::RETURN_RATE,
                BandScheme::lower_is_better(vec![
                    Band::bounded("excellent", 0.05),
                    Band::bounded("good", 0.10),
                    Band::open("poor"),
                ]),
            )
            .with_scheme(
                metric::INVENTORY_TURNOVER,
                BandScheme::higher_is_better(vec![
                    Band::bounded("excellent", 6.0),
                    Band::bounded("good", 3.0),
                    Band::open("poor"),
                ]),
            )
    }
}
