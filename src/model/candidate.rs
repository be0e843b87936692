use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::cache::{CachedProduct, DataProductUnavailable, ProducerRegistry, ProductCache};
use crate::model::products::{
    DataProduct, FoldSummary, FreqVsPhase, ProductKind, SinglePulseSummary,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("raw data has no {0}")]
    Missing(&'static str),
    #[error("malformed raw data: {0}")]
    Malformed(String),
}

/// Raw-data capability a candidate must provide to be rated.
pub trait CandidateSource: Send + Sync {
    fn freq_vs_phase(&self) -> Result<FreqVsPhase, SourceError>;

    fn fold_summary(&self) -> Result<FoldSummary, SourceError>;

    fn single_pulse(&self) -> Result<SinglePulseSummary, SourceError>;
}

/// Scalar attributes reported by the detection stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateInfo {
    #[serde(default)]
    pub ra_deg: Option<f64>,
    #[serde(default)]
    pub dec_deg: Option<f64>,
    #[serde(default)]
    pub dm: Option<f64>,
    #[serde(default)]
    pub period_s: Option<f64>,
}

pub struct Candidate {
    id: String,
    info: CandidateInfo,
    source: Box<dyn CandidateSource>,
    producers: Arc<ProducerRegistry>,
    cache: ProductCache,
}

impl Candidate {
    pub fn new(
        id: impl Into<String>,
        info: CandidateInfo,
        source: Box<dyn CandidateSource>,
    ) -> Self {
        Self::with_producers(id, info, source, ProducerRegistry::shared_builtin())
    }

    pub fn with_producers(
        id: impl Into<String>,
        info: CandidateInfo,
        source: Box<dyn CandidateSource>,
        producers: Arc<ProducerRegistry>,
    ) -> Self {
        Self {
            id: id.into(),
            info,
            source,
            producers,
            cache: ProductCache::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn info(&self) -> &CandidateInfo {
        &self.info
    }

    pub fn source(&self) -> &dyn CandidateSource {
        self.source.as_ref()
    }

    #[cfg(test)]
    pub fn cache(&self) -> &ProductCache {
        &self.cache
    }

    /// Returns the cached product, computing it on first request.
    pub fn get_from_cache(
        &self,
        kind: ProductKind,
    ) -> Result<CachedProduct, DataProductUnavailable> {
        self.cache.get_or_compute(kind, || {
            let producer = self
                .producers
                .get(kind)
                .ok_or_else(|| DataProductUnavailable::new(kind, "no producer registered"))?;
            tracing::debug!(candidate = %self.id, product = %kind, "computing data product");
            producer(self)
        })
    }

    pub fn product<T: DataProduct>(&self) -> Result<Arc<T>, DataProductUnavailable> {
        self.get_from_cache(T::KIND)?
            .downcast::<T>()
            .map_err(|_| {
                DataProductUnavailable::new(T::KIND, "producer returned a different type")
            })
    }
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate")
            .field("id", &self.id)
            .field("info", &self.info)
            .field("cached", &self.cache.cached_kinds())
            .finish()
    }
}
