use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::candidate::SourceError;

/// Cold-plasma dispersion constant in MHz^2 s / (pc cm^-3).
pub const DISPERSION_CONSTANT: f64 = 4148.808;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    FreqVsPhase,
    #[serde(rename = "pfd")]
    Fold,
    #[serde(rename = "spd")]
    SinglePulse,
    Profile,
}

impl ProductKind {
    #[cfg(test)]
    pub const ALL: [ProductKind; 4] = [
        ProductKind::FreqVsPhase,
        ProductKind::Fold,
        ProductKind::SinglePulse,
        ProductKind::Profile,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ProductKind::FreqVsPhase => "freq_vs_phase",
            ProductKind::Fold => "pfd",
            ProductKind::SinglePulse => "spd",
            ProductKind::Profile => "profile",
        }
    }
}

impl fmt::Display for ProductKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value that can live in a candidate's product cache.
pub trait DataProduct: Any + Send + Sync {
    const KIND: ProductKind;
}

/// Folded intensities per frequency channel, dedispersed at `dm`.
#[derive(Debug, Clone, PartialEq)]
pub struct FreqVsPhase {
    freqs_mhz: Vec<f64>,
    period_s: f64,
    dm: f64,
    nbin: usize,
    data: Vec<f64>,
}

impl FreqVsPhase {
    pub fn new(
        freqs_mhz: Vec<f64>,
        period_s: f64,
        dm: f64,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, SourceError> {
        if rows.is_empty() || freqs_mhz.is_empty() {
            return Err(SourceError::Malformed(
                "frequency-vs-phase array has no channels".to_string(),
            ));
        }
        if rows.len() != freqs_mhz.len() {
            return Err(SourceError::Malformed(format!(
                "{} channel rows but {} channel frequencies",
                rows.len(),
                freqs_mhz.len()
            )));
        }
        if freqs_mhz.iter().any(|f| !f.is_finite() || *f <= 0.0) {
            return Err(SourceError::Malformed(
                "channel frequencies must be positive".to_string(),
            ));
        }
        if !period_s.is_finite() || period_s <= 0.0 {
            return Err(SourceError::Malformed(format!(
                "fold period must be positive (found {period_s})"
            )));
        }
        if !dm.is_finite() {
            return Err(SourceError::Malformed("array DM is not finite".to_string()));
        }
        let nbin = rows[0].len();
        if nbin == 0 {
            return Err(SourceError::Malformed(
                "frequency-vs-phase array has no phase bins".to_string(),
            ));
        }
        let mut data = Vec::with_capacity(nbin * rows.len());
        for (chan, row) in rows.iter().enumerate() {
            if row.len() != nbin {
                return Err(SourceError::Malformed(format!(
                    "channel {chan} has {} phase bins, expected {nbin}",
                    row.len()
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(SourceError::Malformed(format!(
                    "channel {chan} has a non-finite sample"
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            freqs_mhz,
            period_s,
            dm,
            nbin,
            data,
        })
    }

    pub fn nchan(&self) -> usize {
        self.freqs_mhz.len()
    }

    #[cfg(test)]
    pub fn nbin(&self) -> usize {
        self.nbin
    }

    pub fn channel(&self, chan: usize) -> &[f64] {
        &self.data[chan * self.nbin..(chan + 1) * self.nbin]
    }

    /// Phase-bin rotation that moves `chan` from the array DM to `dm`.
    ///
    /// Delays are referenced to the highest channel frequency.
    pub fn shift_bins(&self, chan: usize, dm: f64) -> i64 {
        let f_ref = self
            .freqs_mhz
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let f = self.freqs_mhz[chan];
        let delay_s = DISPERSION_CONSTANT * (dm - self.dm) * (f.powi(-2) - f_ref.powi(-2));
        (delay_s / self.period_s * self.nbin as f64).round() as i64
    }

    /// Returns a copy re-dedispersed at `dm`.
    pub fn dedispersed(&self, dm: f64) -> FreqVsPhase {
        let mut data = Vec::with_capacity(self.data.len());
        for chan in 0..self.nchan() {
            let row = self.channel(chan);
            let shift = self.shift_bins(chan, dm).rem_euclid(self.nbin as i64) as usize;
            data.extend_from_slice(&row[shift..]);
            data.extend_from_slice(&row[..shift]);
        }
        FreqVsPhase {
            freqs_mhz: self.freqs_mhz.clone(),
            period_s: self.period_s,
            dm,
            nbin: self.nbin,
            data,
        }
    }

    /// Sum over channels at the array DM.
    pub fn profile(&self) -> Profile {
        let mut bins = vec![0f64; self.nbin];
        for chan in 0..self.nchan() {
            for (acc, v) in bins.iter_mut().zip(self.channel(chan)) {
                *acc += v;
            }
        }
        Profile { dm: self.dm, bins }
    }

    pub fn profile_at_dm(&self, dm: f64) -> Profile {
        if dm == self.dm {
            return self.profile();
        }
        self.dedispersed(dm).profile()
    }
}

impl DataProduct for FreqVsPhase {
    const KIND: ProductKind = ProductKind::FreqVsPhase;
}

/// Summary of the folding search for a periodicity candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldSummary {
    pub best_dm: f64,
    #[serde(default)]
    pub best_period_s: Option<f64>,
}

impl DataProduct for FoldSummary {
    const KIND: ProductKind = ProductKind::Fold;
}

/// Summary of a single-pulse detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinglePulseSummary {
    pub pulsewidth_seconds: f64,
}

impl DataProduct for SinglePulseSummary {
    const KIND: ProductKind = ProductKind::SinglePulse;
}

/// One-dimensional pulse profile and the DM it was formed at.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub dm: f64,
    pub bins: Vec<f64>,
}

impl Profile {
    pub fn max(&self) -> f64 {
        self.bins.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn median(&self) -> f64 {
        median_f64(&self.bins)
    }

    /// Baseline-subtracted peak height: `max - median`.
    pub fn peak_height(&self) -> f64 {
        self.max() - self.median()
    }
}

impl DataProduct for Profile {
    const KIND: ProductKind = ProductKind::Profile;
}

pub fn median_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/products.rs"]
mod tests;
