use crate::model::{Candidate, FoldSummary, FreqVsPhase, ProductKind, Profile};
use crate::raters::{Polarity, Rater, RaterError, RaterMeta};

/// Ratio of the profile peak at DM 0 to the peak at the best-fit DM.
///
/// Dedispersing a real pulsar sharpens its profile, so the ratio is small for
/// pulsars and close to 1 for signals that do not care about DM.
#[derive(Debug, Clone, Default)]
pub struct DmCurveRater;

impl DmCurveRater {
    pub fn new() -> Self {
        Self
    }
}

impl Rater for DmCurveRater {
    const META: RaterMeta = RaterMeta {
        short_name: "dmcurve",
        long_name: "DM Curve",
        description: "Ratio of the baseline-subtracted profile peak dedispersed at DM 0 to that \
                      dedispersed at the best-fit DM. Smaller values are more pulsar-like.",
        version: 1,
        required_products: &[ProductKind::FreqVsPhase, ProductKind::Fold, ProductKind::Profile],
        polarity: Polarity::LowerIsPulsarLike,
    };

    fn compute_rating(&self, cand: &Candidate) -> Result<f64, RaterError> {
        let fvph = cand.product::<FreqVsPhase>()?;
        let pfd = cand.product::<FoldSummary>()?;
        if pfd.best_dm < 0.0 {
            return Err(RaterError::invalid(
                "best_dm",
                format!("must be non-negative (found {})", pfd.best_dm),
            ));
        }

        let peak_dm0 = fvph.profile_at_dm(0.0).peak_height();
        let best = cand.product::<Profile>()?;
        let peak_best = best.peak_height();

        if !peak_best.is_finite() || peak_best == 0.0 {
            return Err(RaterError::invalid(
                "profile",
                format!(
                    "has no peak above the median at best-fit DM {} (peak {peak_best})",
                    pfd.best_dm
                ),
            ));
        }
        Ok(peak_dm0 / peak_best)
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/raters/dm_curve.rs"]
mod tests;
