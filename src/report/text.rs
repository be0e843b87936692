use std::fmt::Write;

use crate::raters::Polarity;
use crate::report::{RaterSummary, RatingsReport, format_f64_6, rank_by};

const TOP_N: usize = 10;

pub fn render_report_text(report: &RatingsReport<'_>) -> String {
    let mut out = String::new();

    out.push_str("Pulsar Candidate Ratings Report\n");
    out.push_str("===============================\n\n");

    let _ = writeln!(out, "Tool: {} {}", report.tool.name, report.tool.version);
    let _ = writeln!(out, "Candidates rated: {}", report.candidates.len());
    let _ = writeln!(
        out,
        "Beam FWHM: {} arcmin, band: {}-{} MHz\n",
        format_f64_6(report.config.beam_fwhm_arcmin),
        format_f64_6(report.config.band_low_mhz),
        format_f64_6(report.config.band_high_mhz)
    );

    out.push_str("1. Raters\n");
    for status in &report.raters {
        let state = match &status.setup_error {
            None => "enabled".to_string(),
            Some(err) => format!("DISABLED ({err})"),
        };
        let _ = writeln!(
            out,
            "{} v{} [{}] {}: {}",
            status.meta.short_name,
            status.meta.version,
            polarity_label(status.meta.polarity),
            status.meta.long_name,
            state
        );
    }
    out.push('\n');

    out.push_str("2. Distributions\n");
    for summary in &report.summaries {
        out.push_str(&summary_line(summary));
        out.push('\n');
    }
    out.push('\n');

    out.push_str("3. Most pulsar-like candidates per rater\n");
    out.push_str(
        "Scores are not comparable across raters; each list follows its rater's polarity.\n",
    );
    for summary in &report.summaries {
        let ranked = rank_by(report.candidates, summary.short_name, summary.polarity);
        let _ = writeln!(out, "{}:", summary.short_name);
        if ranked.is_empty() {
            out.push_str("  (no rated candidates)\n");
            continue;
        }
        for (i, r) in ranked.iter().take(TOP_N).enumerate() {
            let _ = writeln!(out, "  {:>2}. {} {}", i + 1, r.candidate_id, format_f64_6(r.value));
        }
    }
    out.push('\n');

    out.push_str("4. Failures\n");
    let mut any = false;
    for row in report.candidates.values() {
        for (rater, outcome) in &row.outcomes {
            if let crate::pipeline::RatingOutcome::Failed { kind, message } = outcome {
                any = true;
                let _ = writeln!(out, "{} / {}: {:?}: {}", row.candidate_id, rater, kind, message);
            }
        }
    }
    if !any {
        out.push_str("none\n");
    }

    out
}

fn summary_line(s: &RaterSummary) -> String {
    let fmt = |v: Option<f64>| v.map(format_f64_6).unwrap_or_else(|| "-".to_string());
    format!(
        "{}: rated={} failed={} median={} p10={} p90={}",
        s.short_name,
        s.n_rated,
        s.n_failed,
        fmt(s.median),
        fmt(s.p10),
        fmt(s.p90)
    )
}

fn polarity_label(p: Polarity) -> &'static str {
    match p {
        Polarity::HigherIsPulsarLike => "higher is pulsar-like",
        Polarity::LowerIsPulsarLike => "lower is pulsar-like",
    }
}
