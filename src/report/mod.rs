use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::config::RatingConfig;
use crate::pipeline::{RaterStatus, RatingsTable};
use crate::raters::{ErrorKind, Polarity};

pub mod json;
pub mod text;

pub const RATINGS_JSON: &str = "ratings.json";
pub const REPORT_TXT: &str = "report.txt";

#[derive(Debug, Clone, Serialize)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
}

impl Default for ToolMeta {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaterSummary {
    pub short_name: &'static str,
    pub version: u32,
    pub polarity: Polarity,
    pub enabled: bool,
    pub n_rated: usize,
    pub n_failed: usize,
    pub failures_by_kind: BTreeMap<ErrorKind, usize>,
    pub median: Option<f64>,
    pub p10: Option<f64>,
    pub p90: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub candidate_id: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatingsReport<'a> {
    pub tool: ToolMeta,
    pub config: &'a RatingConfig,
    pub raters: Vec<RaterStatus>,
    pub summaries: Vec<RaterSummary>,
    pub candidates: &'a RatingsTable,
}

impl<'a> RatingsReport<'a> {
    pub fn new(
        config: &'a RatingConfig,
        raters: Vec<RaterStatus>,
        table: &'a RatingsTable,
    ) -> Self {
        let summaries = build_summaries(&raters, table);
        Self {
            tool: ToolMeta::default(),
            config,
            raters,
            summaries,
            candidates: table,
        }
    }
}

pub fn build_summaries(raters: &[RaterStatus], table: &RatingsTable) -> Vec<RaterSummary> {
    raters
        .iter()
        .map(|status| {
            let name = status.meta.short_name;
            let mut values = Vec::new();
            let mut failures_by_kind = BTreeMap::new();
            for row in table.values() {
                let Some(outcome) = row.outcomes.get(name) else {
                    continue;
                };
                match (outcome.value(), outcome.error_kind()) {
                    (Some(v), _) => values.push(v),
                    (None, Some(kind)) => *failures_by_kind.entry(kind).or_insert(0) += 1,
                    (None, None) => {}
                }
            }
            let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
            let stat = |p: f64| (!finite.is_empty()).then(|| quantile_indexed(&finite, p));
            RaterSummary {
                short_name: name,
                version: status.meta.version,
                polarity: status.meta.polarity,
                enabled: status.enabled,
                n_rated: values.len(),
                n_failed: failures_by_kind.values().sum(),
                failures_by_kind,
                median: stat(0.5),
                p10: stat(0.10),
                p90: stat(0.90),
            }
        })
        .collect()
}

/// Candidates with a value from `short_name`, most pulsar-like first.
///
/// Ties keep candidate-id order.
pub fn rank_by(table: &RatingsTable, short_name: &str, polarity: Polarity) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = table
        .values()
        .filter_map(|row| {
            row.value(short_name)
                .filter(|v| v.is_finite())
                .map(|value| RankedCandidate {
                    candidate_id: row.candidate_id.clone(),
                    value,
                })
        })
        .collect();
    ranked.sort_by(|a, b| match polarity {
        Polarity::HigherIsPulsarLike => b.value.total_cmp(&a.value),
        Polarity::LowerIsPulsarLike => a.value.total_cmp(&b.value),
    });
    ranked
}

pub fn write_reports(report: &RatingsReport<'_>, out_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(out_dir)?;

    let json = json::render_ratings_json(report).map_err(std::io::Error::other)?;
    fs::write(out_dir.join(RATINGS_JSON), json)?;

    let text = text::render_report_text(report);
    fs::write(out_dir.join(REPORT_TXT), text)?;

    tracing::info!(out_dir = %out_dir.display(), "reports written");
    Ok(())
}

pub fn format_f64_6(v: f64) -> String {
    format!("{:.6}", v)
}

pub fn quantile_indexed(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let idx = ((n - 1) as f64 * p).ceil() as usize;
    sorted[idx]
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;
