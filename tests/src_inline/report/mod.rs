use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::pipeline::{CandidateRatings, RatingOutcome};
use crate::raters::{DmCurveRater, KnownPulsarRater, Rater};

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("psr_ratings_report_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn statuses() -> Vec<RaterStatus> {
    vec![
        RaterStatus {
            meta: &DmCurveRater::META,
            enabled: true,
            setup_error: None,
        },
        RaterStatus {
            meta: &KnownPulsarRater::META,
            enabled: true,
            setup_error: None,
        },
    ]
}

fn rated(value: f64) -> RatingOutcome {
    RatingOutcome::Rated { value, version: 1 }
}

fn table() -> RatingsTable {
    let rows = [
        ("a", rated(0.9), rated(0.1)),
        ("b", rated(0.2), rated(0.95)),
        (
            "c",
            RatingOutcome::Failed {
                kind: ErrorKind::DataProductUnavailable,
                message: "data product 'pfd' unavailable: raw data has no fold".to_string(),
            },
            rated(0.5),
        ),
        ("d", rated(0.5), rated(0.0)),
    ];
    rows.into_iter()
        .map(|(id, dm, known)| {
            let mut outcomes = BTreeMap::new();
            outcomes.insert("dmcurve", dm);
            outcomes.insert("knownpsr", known);
            (
                id.to_string(),
                CandidateRatings {
                    candidate_id: id.to_string(),
                    outcomes,
                },
            )
        })
        .collect()
}

#[test]
fn test_quantile_indexed() {
    let values = [5.0, 1.0, 3.0, 2.0, 4.0];
    assert_eq!(quantile_indexed(&values, 0.5), 3.0);
    assert_eq!(quantile_indexed(&values, 0.0), 1.0);
    assert_eq!(quantile_indexed(&values, 1.0), 5.0);
    assert_eq!(quantile_indexed(&values, 0.9), 5.0);
    assert_eq!(quantile_indexed(&[], 0.5), 0.0);
}

#[test]
fn test_format_f64_6() {
    assert_eq!(format_f64_6(0.125), "0.125000");
    assert_eq!(format_f64_6(1.0), "1.000000");
}

#[test]
fn test_rank_follows_each_raters_polarity() {
    let table = table();
    let dm = rank_by(&table, "dmcurve", Polarity::LowerIsPulsarLike);
    let ids: Vec<&str> = dm.iter().map(|r| r.candidate_id.as_str()).collect();
    assert_eq!(ids, vec!["b", "d", "a"]);

    let known = rank_by(&table, "knownpsr", Polarity::HigherIsPulsarLike);
    let ids: Vec<&str> = known.iter().map(|r| r.candidate_id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c", "a", "d"]);

    assert!(rank_by(&table, "missing", Polarity::HigherIsPulsarLike).is_empty());
}

#[test]
fn test_summaries_count_failures_by_kind() {
    let table = table();
    let summaries = build_summaries(&statuses(), &table);
    assert_eq!(summaries.len(), 2);

    let dm = &summaries[0];
    assert_eq!(dm.short_name, "dmcurve");
    assert_eq!(dm.n_rated, 3);
    assert_eq!(dm.n_failed, 1);
    assert_eq!(dm.failures_by_kind[&ErrorKind::DataProductUnavailable], 1);
    assert_eq!(dm.median, Some(0.5));
    assert_eq!(dm.polarity, Polarity::LowerIsPulsarLike);

    let known = &summaries[1];
    assert_eq!(known.n_rated, 4);
    assert_eq!(known.n_failed, 0);
    assert!(known.failures_by_kind.is_empty());
}

#[test]
fn test_summary_without_values_has_no_stats() {
    let table = RatingsTable::new();
    let summaries = build_summaries(&statuses(), &table);
    assert_eq!(summaries[0].n_rated, 0);
    assert_eq!(summaries[0].median, None);
    assert_eq!(summaries[0].p90, None);
}

#[test]
fn test_write_reports() {
    let dir = make_temp_dir();
    let out = dir.join("out");
    let config = RatingConfig::default();
    let table = table();
    let report = RatingsReport::new(&config, statuses(), &table);
    write_reports(&report, &out).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join(RATINGS_JSON)).unwrap()).unwrap();
    assert_eq!(json["tool"]["name"], "psr-ratings");
    assert_eq!(json["config"]["beam_fwhm_arcmin"], 3.35);
    assert_eq!(json["raters"][0]["short_name"], "dmcurve");
    assert_eq!(json["raters"][0]["polarity"], "lower_is_pulsar_like");
    assert_eq!(json["candidates"]["b"]["outcomes"]["knownpsr"]["value"], 0.95);
    assert_eq!(
        json["candidates"]["c"]["outcomes"]["dmcurve"]["kind"],
        "data_product_unavailable"
    );

    let text = fs::read_to_string(out.join(REPORT_TXT)).unwrap();
    assert!(text.contains("1. Raters"));
    assert!(text.contains("dmcurve v1 [lower is pulsar-like]"));
    assert!(text.contains("c / dmcurve: DataProductUnavailable"));
}

#[test]
fn test_text_report_marks_disabled_rater() {
    let config = RatingConfig::default();
    let table = RatingsTable::new();
    let mut raters = statuses();
    raters[1].enabled = false;
    raters[1].setup_error = Some("rater setup failed: missing catalog".to_string());
    let report = RatingsReport::new(&config, raters, &table);

    let text = text::render_report_text(&report);
    assert!(text.contains("DISABLED (rater setup failed: missing catalog)"));
    assert!(text.contains("(no rated candidates)"));
    assert!(text.ends_with("none\n"));
}
