use std::path::PathBuf;
use std::sync::Arc;

use crate::config::RatingConfig;
use crate::input::catalog::{ReferenceCatalog, load_catalog};
use crate::model::{Candidate, ProductKind, SinglePulseSummary};
use crate::raters::{Polarity, Rater, RaterError, RaterMeta, require_finite};

/// Where the rater gets its known-pulsar list from.
#[derive(Debug, Clone)]
pub enum CatalogSource {
    Path(PathBuf),
    Loaded(Arc<ReferenceCatalog>),
}

/// Similarity of a candidate's position and DM to the closest known pulsar.
///
/// Each catalog entry scores the product of a beam-shaped Gaussian in angular
/// offset and a Gaussian in DM difference whose width is the DM shift that
/// smears the pulse by one pulse width across the band. The best entry wins.
#[derive(Debug)]
pub struct KnownPulsarRater {
    source: CatalogSource,
    catalog: Option<Arc<ReferenceCatalog>>,
    position_sigma_arcmin: f64,
    band_low_mhz: f64,
    band_high_mhz: f64,
    dispersion_constant: f64,
}

/// Best-scoring catalog entry for one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogMatch {
    pub index: usize,
    pub offset_arcmin: f64,
    pub dm_diff: f64,
    pub score: f64,
}

impl KnownPulsarRater {
    pub fn new(config: &RatingConfig, source: CatalogSource) -> Self {
        Self {
            source,
            catalog: None,
            position_sigma_arcmin: fwhm_to_sigma(config.beam_fwhm_arcmin),
            band_low_mhz: config.band_low_mhz,
            band_high_mhz: config.band_high_mhz,
            dispersion_constant: config.dispersion_constant,
        }
    }

    #[cfg(test)]
    pub fn catalog(&self) -> Option<&Arc<ReferenceCatalog>> {
        self.catalog.as_ref()
    }

    /// DM offset that shifts the pulse by one `width_s` across the band.
    pub fn dm_tolerance(&self, width_s: f64) -> f64 {
        width_s
            / (self.dispersion_constant
                * (self.band_low_mhz.powi(-2) - self.band_high_mhz.powi(-2)))
    }

    pub fn best_match(
        &self,
        catalog: &ReferenceCatalog,
        ra_deg: f64,
        dec_deg: f64,
        dm: f64,
        width_s: f64,
    ) -> Option<CatalogMatch> {
        let dm_sigma = self.dm_tolerance(width_s);
        let mut best: Option<CatalogMatch> = None;
        for (index, known) in catalog.iter().enumerate() {
            let offset_arcmin = angular_offset_arcmin(ra_deg, dec_deg, known.ra_deg, known.dec_deg);
            let dm_diff = (known.dm - dm).abs();
            let score = gaussian_response(offset_arcmin, self.position_sigma_arcmin)
                * gaussian_response(dm_diff, dm_sigma);
            if best.is_none_or(|b| score > b.score) {
                best = Some(CatalogMatch {
                    index,
                    offset_arcmin,
                    dm_diff,
                    score,
                });
            }
        }
        best
    }
}

impl Rater for KnownPulsarRater {
    const META: RaterMeta = RaterMeta {
        short_name: "knownpsr",
        long_name: "Known Pulsar Rating",
        description: "Evaluate how similar the position and DM are to a known pulsar. The value \
                      is between 0 and 1, with values closer to 1 indicating similarity to a \
                      known pulsar.",
        version: 1,
        required_products: &[ProductKind::SinglePulse],
        polarity: Polarity::HigherIsPulsarLike,
    };

    fn setup(&mut self) -> Result<(), RaterError> {
        if self.catalog.is_some() {
            return Ok(());
        }
        let catalog = match &self.source {
            CatalogSource::Path(path) => Arc::new(
                load_catalog(path).map_err(|e| RaterError::RaterSetupFailed(e.to_string()))?,
            ),
            CatalogSource::Loaded(catalog) => Arc::clone(catalog),
        };
        if catalog.is_empty() {
            tracing::warn!("known-pulsar catalog is empty; every candidate will rate 0");
        }
        self.catalog = Some(catalog);
        Ok(())
    }

    fn compute_rating(&self, cand: &Candidate) -> Result<f64, RaterError> {
        let catalog = self.catalog.as_ref().ok_or_else(|| {
            RaterError::RaterSetupFailed("known-pulsar catalog not loaded".to_string())
        })?;

        let info = cand.info();
        let ra = require_finite("ra_deg", info.ra_deg)?;
        let dec = require_finite("dec_deg", info.dec_deg)?;
        let dm = require_finite("dm", info.dm)?;
        if dm < 0.0 {
            return Err(RaterError::invalid("dm", format!("must be non-negative (found {dm})")));
        }
        let spd = cand.product::<SinglePulseSummary>()?;
        let width = spd.pulsewidth_seconds;
        if !width.is_finite() || width <= 0.0 {
            return Err(RaterError::invalid(
                "pulsewidth_seconds",
                format!("must be positive (found {width})"),
            ));
        }

        match self.best_match(catalog, ra, dec, dm, width) {
            Some(m) => {
                tracing::debug!(
                    candidate = cand.id(),
                    known = %catalog.names[m.index],
                    offset_arcmin = m.offset_arcmin,
                    dm_diff = m.dm_diff,
                    score = m.score,
                    "closest known pulsar"
                );
                Ok(m.score)
            }
            None => Ok(0.0),
        }
    }
}

pub fn gaussian_response(sep: f64, sigma: f64) -> f64 {
    (-0.5 * (sep / sigma).powi(2)).exp()
}

/// Standard deviation of a Gaussian with the given full width at half maximum.
pub fn fwhm_to_sigma(fwhm: f64) -> f64 {
    fwhm / (2.0 * (2.0 * std::f64::consts::LN_2).sqrt())
}

/// Small-angle separation in arc-minutes, RA scaled by the cosine of the mean declination.
pub fn angular_offset_arcmin(
    ra_deg: f64,
    dec_deg: f64,
    known_ra_deg: f64,
    known_dec_deg: f64,
) -> f64 {
    let mut d_ra = (known_ra_deg - ra_deg).rem_euclid(360.0);
    if d_ra >= 180.0 {
        d_ra -= 360.0;
    }
    let mean_dec = (0.5 * (known_dec_deg + dec_deg)).to_radians();
    let offset_x = d_ra * mean_dec.cos();
    let offset_y = known_dec_deg - dec_deg;
    offset_x.hypot(offset_y) * 60.0
}

#[cfg(test)]
#[path = "../../tests/src_inline/raters/known_pulsar.rs"]
mod tests;
