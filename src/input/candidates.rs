use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::input::{InputError, open_maybe_gz};
use crate::model::{
    Candidate, CandidateInfo, CandidateSource, FoldSummary, FreqVsPhase, SinglePulseSummary,
    SourceError,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreqVsPhaseRecord {
    pub freqs_mhz: Vec<f64>,
    pub period_s: f64,
    #[serde(default)]
    pub dm: f64,
    pub data: Vec<Vec<f64>>,
}

/// One candidate as written by the detection stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: String,
    #[serde(flatten)]
    pub info: CandidateInfo,
    #[serde(default)]
    pub freq_vs_phase: Option<FreqVsPhaseRecord>,
    #[serde(default)]
    pub fold: Option<FoldSummary>,
    #[serde(default)]
    pub single_pulse: Option<SinglePulseSummary>,
}

impl CandidateRecord {
    pub fn into_candidate(self) -> Candidate {
        let id = self.id.clone();
        let info = self.info.clone();
        Candidate::new(id, info, Box::new(self))
    }
}

impl CandidateSource for CandidateRecord {
    fn freq_vs_phase(&self) -> Result<FreqVsPhase, SourceError> {
        let rec = self
            .freq_vs_phase
            .as_ref()
            .ok_or(SourceError::Missing("freq_vs_phase"))?;
        FreqVsPhase::new(rec.freqs_mhz.clone(), rec.period_s, rec.dm, rec.data.clone())
    }

    fn fold_summary(&self) -> Result<FoldSummary, SourceError> {
        self.fold.clone().ok_or(SourceError::Missing("fold"))
    }

    fn single_pulse(&self) -> Result<SinglePulseSummary, SourceError> {
        self.single_pulse
            .clone()
            .ok_or(SourceError::Missing("single_pulse"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateFile {
    pub candidates: Vec<CandidateRecord>,
}

pub fn parse_candidates(text: &str, origin: &Path) -> Result<Vec<CandidateRecord>, InputError> {
    let file: CandidateFile = serde_json::from_str(text).map_err(|source| InputError::Json {
        path: origin.to_path_buf(),
        source,
    })?;
    let mut seen = BTreeSet::new();
    for rec in &file.candidates {
        if rec.id.trim().is_empty() {
            return Err(InputError::InvalidInput(format!(
                "{}: candidate with empty id",
                origin.display()
            )));
        }
        if !seen.insert(rec.id.as_str()) {
            return Err(InputError::InvalidInput(format!(
                "{}: duplicate candidate id '{}'",
                origin.display(),
                rec.id
            )));
        }
    }
    Ok(file.candidates)
}

pub fn load_candidates(path: &Path) -> Result<Vec<Candidate>, InputError> {
    let mut reader = open_maybe_gz(path)?;
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| InputError::io(path, e))?;
    let records = parse_candidates(&text, path)?;
    tracing::info!(path = %path.display(), n_candidates = records.len(), "loaded candidates");
    Ok(records
        .into_iter()
        .map(CandidateRecord::into_candidate)
        .collect())
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/candidates.rs"]
mod tests;
