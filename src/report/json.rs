use crate::report::RatingsReport;

/// Pretty-printed `ratings.json`.
///
/// Candidate outcomes are keyed by candidate id, then by rater short name.
pub fn render_ratings_json(report: &RatingsReport<'_>) -> serde_json::Result<String> {
    let mut out = serde_json::to_string_pretty(report)?;
    out.push('\n');
    Ok(out)
}
