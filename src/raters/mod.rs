use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::config::RatingConfig;
use crate::model::{Candidate, DataProductUnavailable, ProducerRegistry, ProductKind};

pub mod dm_curve;
pub mod known_pulsar;

pub use dm_curve::DmCurveRater;
pub use known_pulsar::{CatalogSource, KnownPulsarRater};

/// Which end of a rater's scale looks like a real pulsar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HigherIsPulsarLike,
    LowerIsPulsarLike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RaterMeta {
    pub short_name: &'static str,
    pub long_name: &'static str,
    pub description: &'static str,
    /// Bumped whenever the formula changes.
    pub version: u32,
    pub required_products: &'static [ProductKind],
    pub polarity: Polarity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DataProductUnavailable,
    InvalidCandidateState,
    RaterSetupFailed,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RaterError {
    #[error(transparent)]
    DataProductUnavailable(#[from] DataProductUnavailable),
    #[error("invalid candidate state: {attribute} {reason}")]
    InvalidCandidateState {
        attribute: &'static str,
        reason: String,
    },
    #[error("rater setup failed: {0}")]
    RaterSetupFailed(String),
}

impl RaterError {
    pub fn invalid(attribute: &'static str, reason: impl Into<String>) -> Self {
        RaterError::InvalidCandidateState {
            attribute,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RaterError::DataProductUnavailable(_) => ErrorKind::DataProductUnavailable,
            RaterError::InvalidCandidateState { .. } => ErrorKind::InvalidCandidateState,
            RaterError::RaterSetupFailed(_) => ErrorKind::RaterSetupFailed,
        }
    }
}

/// The contract every scoring strategy implements.
pub trait Rater {
    const META: RaterMeta;

    /// One-time initialisation; calling it again is a no-op.
    fn setup(&mut self) -> Result<(), RaterError> {
        Ok(())
    }

    fn compute_rating(&self, cand: &Candidate) -> Result<f64, RaterError>;
}

/// The closed set of raters the pipeline knows how to run.
#[derive(Debug)]
pub enum RaterKind {
    DmCurve(DmCurveRater),
    KnownPulsar(KnownPulsarRater),
}

impl RaterKind {
    pub fn meta(&self) -> &'static RaterMeta {
        match self {
            RaterKind::DmCurve(_) => &DmCurveRater::META,
            RaterKind::KnownPulsar(_) => &KnownPulsarRater::META,
        }
    }

    pub fn short_name(&self) -> &'static str {
        self.meta().short_name
    }

    pub fn setup(&mut self) -> Result<(), RaterError> {
        match self {
            RaterKind::DmCurve(r) => r.setup(),
            RaterKind::KnownPulsar(r) => r.setup(),
        }
    }

    pub fn compute_rating(&self, cand: &Candidate) -> Result<f64, RaterError> {
        match self {
            RaterKind::DmCurve(r) => r.compute_rating(cand),
            RaterKind::KnownPulsar(r) => r.compute_rating(cand),
        }
    }
}

impl From<DmCurveRater> for RaterKind {
    fn from(value: DmCurveRater) -> Self {
        RaterKind::DmCurve(value)
    }
}

impl From<KnownPulsarRater> for RaterKind {
    fn from(value: KnownPulsarRater) -> Self {
        RaterKind::KnownPulsar(value)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("rater short name '{0}' registered twice")]
    DuplicateShortName(String),
    #[error("unknown rater '{0}'")]
    UnknownRater(String),
    #[error("rater '{rater}' requires data product '{product}' but no producer is registered")]
    MissingProducer {
        rater: &'static str,
        product: ProductKind,
    },
}

/// Raters keyed by short name.
#[derive(Debug, Default)]
pub struct RaterRegistry {
    raters: BTreeMap<&'static str, RaterKind>,
}

impl RaterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin(config: &RatingConfig, catalog: CatalogSource) -> Self {
        let mut registry = Self::new();
        for rater in [
            RaterKind::from(DmCurveRater::new()),
            RaterKind::from(KnownPulsarRater::new(config, catalog)),
        ] {
            let name = rater.short_name();
            let previous = registry.raters.insert(name, rater);
            assert!(previous.is_none(), "built-in rater '{name}' registered twice");
        }
        registry
    }

    pub fn register(&mut self, rater: impl Into<RaterKind>) -> Result<(), RegistryError> {
        let rater = rater.into();
        let name = rater.short_name();
        if self.raters.contains_key(name) {
            return Err(RegistryError::DuplicateShortName(name.to_string()));
        }
        self.raters.insert(name, rater);
        Ok(())
    }

    /// Keeps only the named raters.
    pub fn select<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self, RegistryError> {
        let mut selected = BTreeMap::new();
        for name in names {
            let name = name.as_ref();
            match self.raters.remove_entry(name) {
                Some((key, rater)) => {
                    selected.insert(key, rater);
                }
                None if selected.contains_key(name) => {}
                None => return Err(RegistryError::UnknownRater(name.to_string())),
            }
        }
        Ok(Self { raters: selected })
    }

    /// Checks every required product has a producer.
    pub fn validate(&self, producers: &ProducerRegistry) -> Result<(), RegistryError> {
        for rater in self.raters.values() {
            let meta = rater.meta();
            for &product in meta.required_products {
                if !producers.contains(product) {
                    return Err(RegistryError::MissingProducer {
                        rater: meta.short_name,
                        product,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, short_name: &str) -> Option<&RaterKind> {
        self.raters.get(short_name)
    }

    pub fn short_names(&self) -> Vec<&'static str> {
        self.raters.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.raters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raters.is_empty()
    }

    pub fn into_raters(self) -> impl Iterator<Item = RaterKind> {
        self.raters.into_values()
    }
}

/// Reads a required scalar attribute, rejecting absent or non-finite values.
pub(crate) fn require_finite(
    attribute: &'static str,
    value: Option<f64>,
) -> Result<f64, RaterError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(v) => Err(RaterError::invalid(attribute, format!("is not finite ({v})"))),
        None => Err(RaterError::invalid(attribute, "is missing")),
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/raters/registry.rs"]
mod tests;
