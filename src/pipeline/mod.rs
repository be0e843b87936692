use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::model::Candidate;
use crate::raters::{ErrorKind, RaterError, RaterKind, RaterMeta, RaterRegistry};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RatingOutcome {
    Rated { value: f64, version: u32 },
    Failed { kind: ErrorKind, message: String },
}

impl RatingOutcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            RatingOutcome::Rated { value, .. } => Some(*value),
            RatingOutcome::Failed { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            RatingOutcome::Rated { .. } => None,
            RatingOutcome::Failed { kind, .. } => Some(*kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRatings {
    pub candidate_id: String,
    pub outcomes: BTreeMap<&'static str, RatingOutcome>,
}

impl CandidateRatings {
    pub fn value(&self, short_name: &str) -> Option<f64> {
        self.outcomes.get(short_name).and_then(RatingOutcome::value)
    }

    pub fn n_failed(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| o.error_kind().is_some())
            .count()
    }
}

/// Candidate id to its per-rater outcomes.
pub type RatingsTable = BTreeMap<String, CandidateRatings>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parallelism {
    #[default]
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, Serialize)]
pub struct RaterStatus {
    #[serde(flatten)]
    pub meta: &'static RaterMeta,
    pub enabled: bool,
    pub setup_error: Option<String>,
}

#[derive(Debug)]
struct RaterSlot {
    rater: RaterKind,
    setup_error: Option<RaterError>,
}

/// Runs every registered rater over candidates.
///
/// Raters are set up once at construction. A rater whose setup fails stays in
/// the pipeline but reports `rater_setup_failed` for every candidate.
#[derive(Debug)]
pub struct RatingPipeline {
    slots: Vec<RaterSlot>,
}

impl RatingPipeline {
    pub fn new(registry: RaterRegistry) -> Self {
        if registry.is_empty() {
            tracing::warn!("no raters registered; every candidate will have empty outcomes");
        }
        let mut slots = Vec::with_capacity(registry.len());
        for mut rater in registry.into_raters() {
            let setup_error = match rater.setup() {
                Ok(()) => {
                    tracing::info!(
                        rater = rater.short_name(),
                        version = rater.meta().version,
                        "rater ready"
                    );
                    None
                }
                Err(err) => {
                    let err = match err {
                        RaterError::RaterSetupFailed(_) => err,
                        other => RaterError::RaterSetupFailed(other.to_string()),
                    };
                    tracing::warn!(
                        rater = rater.short_name(),
                        error = %err,
                        "rater disabled for this session"
                    );
                    Some(err)
                }
            };
            slots.push(RaterSlot { rater, setup_error });
        }
        Self { slots }
    }

    pub fn statuses(&self) -> Vec<RaterStatus> {
        self.slots
            .iter()
            .map(|slot| RaterStatus {
                meta: slot.rater.meta(),
                enabled: slot.setup_error.is_none(),
                setup_error: slot.setup_error.as_ref().map(ToString::to_string),
            })
            .collect()
    }

    pub fn rate_candidate(&self, cand: &Candidate, parallelism: Parallelism) -> CandidateRatings {
        let outcomes = match parallelism {
            Parallelism::Sequential => self
                .slots
                .iter()
                .map(|slot| (slot.rater.short_name(), evaluate(slot, cand)))
                .collect(),
            Parallelism::Parallel => self
                .slots
                .par_iter()
                .map(|slot| (slot.rater.short_name(), evaluate(slot, cand)))
                .collect::<Vec<_>>()
                .into_iter()
                .collect(),
        };
        CandidateRatings {
            candidate_id: cand.id().to_string(),
            outcomes,
        }
    }

    pub fn rate_all(&self, cands: &[Candidate], parallelism: Parallelism) -> RatingsTable {
        let rows: Vec<CandidateRatings> = match parallelism {
            Parallelism::Sequential => cands
                .iter()
                .map(|c| self.rate_candidate(c, parallelism))
                .collect(),
            Parallelism::Parallel => cands
                .par_iter()
                .map(|c| self.rate_candidate(c, parallelism))
                .collect(),
        };

        let mut table = RatingsTable::new();
        for row in rows {
            if table.contains_key(&row.candidate_id) {
                tracing::warn!(
                    candidate = %row.candidate_id,
                    "duplicate candidate id; keeping the later result"
                );
            }
            table.insert(row.candidate_id.clone(), row);
        }
        let n_failed: usize = table.values().map(CandidateRatings::n_failed).sum();
        tracing::info!(
            n_candidates = table.len(),
            n_raters = self.slots.len(),
            n_failed,
            "rating complete"
        );
        table
    }
}

fn evaluate(slot: &RaterSlot, cand: &Candidate) -> RatingOutcome {
    let meta = slot.rater.meta();
    if let Some(err) = &slot.setup_error {
        return RatingOutcome::Failed {
            kind: err.kind(),
            message: err.to_string(),
        };
    }
    match slot.rater.compute_rating(cand) {
        Ok(value) => RatingOutcome::Rated {
            value,
            version: meta.version,
        },
        Err(err) => {
            tracing::warn!(
                candidate = cand.id(),
                rater = meta.short_name,
                kind = ?err.kind(),
                error = %err,
                "rating failed"
            );
            RatingOutcome::Failed {
                kind: err.kind(),
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/mod.rs"]
mod tests;
