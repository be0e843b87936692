use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use thiserror::Error;

use crate::model::candidate::Candidate;
use crate::model::products::{FoldSummary, FreqVsPhase, ProductKind};

pub type CachedProduct = Arc<dyn Any + Send + Sync>;

pub type Producer = fn(&Candidate) -> Result<CachedProduct, DataProductUnavailable>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("data product '{product}' unavailable: {reason}")]
pub struct DataProductUnavailable {
    pub product: ProductKind,
    pub reason: String,
}

impl DataProductUnavailable {
    pub fn new(product: ProductKind, reason: impl Into<String>) -> Self {
        Self {
            product,
            reason: reason.into(),
        }
    }
}

type SlotState = Option<Result<CachedProduct, DataProductUnavailable>>;

/// Per-candidate memo of derived products.
///
/// The outer lock only guards slot lookup; each slot has its own lock, held
/// while its producer runs, so concurrent first requests compute once.
#[derive(Default)]
pub struct ProductCache {
    slots: Mutex<HashMap<ProductKind, Arc<Mutex<SlotState>>>>,
}

impl ProductCache {
    pub fn get_or_compute<F>(
        &self,
        kind: ProductKind,
        produce: F,
    ) -> Result<CachedProduct, DataProductUnavailable>
    where
        F: FnOnce() -> Result<CachedProduct, DataProductUnavailable>,
    {
        let slot = {
            let mut slots = lock(&self.slots);
            Arc::clone(slots.entry(kind).or_default())
        };
        let mut state = lock(&slot);
        if let Some(result) = state.as_ref() {
            return result.clone();
        }
        let result = produce();
        if let Err(err) = &result {
            tracing::debug!(product = %kind, reason = %err.reason, "data product failed");
        }
        *state = Some(result.clone());
        result
    }

    #[cfg(test)]
    pub fn contains(&self, kind: ProductKind) -> bool {
        let slot = match lock(&self.slots).get(&kind) {
            Some(slot) => Arc::clone(slot),
            None => return false,
        };
        matches!(*lock(&slot), Some(Ok(_)))
    }

    pub fn cached_kinds(&self) -> Vec<ProductKind> {
        let slots: Vec<(ProductKind, Arc<Mutex<SlotState>>)> = lock(&self.slots)
            .iter()
            .map(|(kind, slot)| (*kind, Arc::clone(slot)))
            .collect();
        let mut kinds: Vec<ProductKind> = slots
            .into_iter()
            .filter(|(_, slot)| matches!(*lock(slot), Some(Ok(_))))
            .map(|(kind, _)| kind)
            .collect();
        kinds.sort();
        kinds
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Product name to producer function.
#[derive(Clone, Default)]
pub struct ProducerRegistry {
    producers: BTreeMap<ProductKind, Producer>,
}

impl std::fmt::Debug for ProducerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.producers.keys()).finish()
    }
}

impl ProducerRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut reg = Self::empty();
        reg.register(ProductKind::FreqVsPhase, produce_freq_vs_phase);
        reg.register(ProductKind::Fold, produce_fold);
        reg.register(ProductKind::SinglePulse, produce_single_pulse);
        reg.register(ProductKind::Profile, produce_best_dm_profile);
        reg
    }

    pub fn shared_builtin() -> Arc<ProducerRegistry> {
        static BUILTIN: OnceLock<Arc<ProducerRegistry>> = OnceLock::new();
        Arc::clone(BUILTIN.get_or_init(|| Arc::new(ProducerRegistry::builtin())))
    }

    pub fn register(&mut self, kind: ProductKind, producer: Producer) -> Option<Producer> {
        self.producers.insert(kind, producer)
    }

    pub fn get(&self, kind: ProductKind) -> Option<Producer> {
        self.producers.get(&kind).copied()
    }

    pub fn contains(&self, kind: ProductKind) -> bool {
        self.producers.contains_key(&kind)
    }
}

fn produce_freq_vs_phase(cand: &Candidate) -> Result<CachedProduct, DataProductUnavailable> {
    let fvph = cand
        .source()
        .freq_vs_phase()
        .map_err(|e| DataProductUnavailable::new(ProductKind::FreqVsPhase, e.to_string()))?;
    Ok(Arc::new(fvph))
}

fn produce_fold(cand: &Candidate) -> Result<CachedProduct, DataProductUnavailable> {
    let pfd = cand
        .source()
        .fold_summary()
        .map_err(|e| DataProductUnavailable::new(ProductKind::Fold, e.to_string()))?;
    if !pfd.best_dm.is_finite() {
        return Err(DataProductUnavailable::new(
            ProductKind::Fold,
            "best-fit DM is not finite",
        ));
    }
    Ok(Arc::new(pfd))
}

fn produce_single_pulse(cand: &Candidate) -> Result<CachedProduct, DataProductUnavailable> {
    let spd = cand
        .source()
        .single_pulse()
        .map_err(|e| DataProductUnavailable::new(ProductKind::SinglePulse, e.to_string()))?;
    Ok(Arc::new(spd))
}

fn produce_best_dm_profile(cand: &Candidate) -> Result<CachedProduct, DataProductUnavailable> {
    let upstream = |e: DataProductUnavailable| {
        DataProductUnavailable::new(ProductKind::Profile, format!("upstream {e}"))
    };
    let fvph = cand.product::<FreqVsPhase>().map_err(upstream)?;
    let pfd = cand.product::<FoldSummary>().map_err(upstream)?;
    Ok(Arc::new(fvph.profile_at_dm(pfd.best_dm)))
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/cache.rs"]
mod tests;
