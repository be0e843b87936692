//! Survey/instrument constants consumed by the raters.
//!
//! Defaults describe the PALFA setup at Arecibo. A JSON file may override any
//! subset of keys; CLI flags override the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::DISPERSION_CONSTANT;

pub const DEFAULT_BEAM_FWHM_ARCMIN: f64 = 3.35;
pub const DEFAULT_BAND_LOW_MHZ: f64 = 1214.0;
pub const DEFAULT_BAND_HIGH_MHZ: f64 = 1537.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RatingConfig {
    /// Telescope beam full-width-half-maximum, arc-minutes.
    pub beam_fwhm_arcmin: f64,
    /// Lower edge of the observing band, MHz.
    pub band_low_mhz: f64,
    /// Upper edge of the observing band, MHz.
    pub band_high_mhz: f64,
    pub dispersion_constant: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            beam_fwhm_arcmin: DEFAULT_BEAM_FWHM_ARCMIN,
            band_low_mhz: DEFAULT_BAND_LOW_MHZ,
            band_high_mhz: DEFAULT_BAND_HIGH_MHZ,
            dispersion_constant: DISPERSION_CONSTANT,
        }
    }
}

impl RatingConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RatingConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("beam_fwhm_arcmin", self.beam_fwhm_arcmin)?;
        positive("band_low_mhz", self.band_low_mhz)?;
        positive("band_high_mhz", self.band_high_mhz)?;
        positive("dispersion_constant", self.dispersion_constant)?;
        if self.band_low_mhz >= self.band_high_mhz {
            return Err(ConfigError::Invalid {
                field: "band_low_mhz",
                reason: format!(
                    "band edges must satisfy low < high (found {} >= {})",
                    self.band_low_mhz, self.band_high_mhz
                ),
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be a positive finite number (found {value})"),
        })
    }
}

#[cfg(test)]
#[path = "../tests/src_inline/config.rs"]
mod tests;
