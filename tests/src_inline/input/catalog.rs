use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::Compression;
use flate2::write::GzEncoder;

use super::*;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("psr_ratings_catalog_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

const EXPORT: &str = "NUM;NAME;RAJD;DECJD;P0;DM;\n\
# Generated 2013-05-01 using PALFA Known_Pulsars database\n\
# Contains only sources with DM > 0 and period > 0\n\
1;J0000+0000;0.0;0.0;1.0;10.0;\n\
2;B1937+21;294.91;21.58;0.00155;71.02;\n\
3;J1903+0327;285.77;3.46;0.00215;297.5;\n";

fn parse(text: &str) -> Result<ReferenceCatalog, CatalogError> {
    parse_catalog(Cursor::new(text.as_bytes()), "test.csv")
}

#[test]
fn test_parse_conformant_export() {
    let cat = parse(EXPORT).unwrap();
    assert_eq!(cat.len(), 3);
    assert_eq!(cat.names, vec!["J0000+0000", "B1937+21", "J1903+0327"]);
    assert_eq!(cat.ras_deg[1], 294.91);
    assert_eq!(cat.decs_deg[2], 3.46);
    assert_eq!(cat.periods_s[1], 0.00155);
    assert_eq!(cat.dms[2], 297.5);

    let psr = cat.find("B1937+21").unwrap();
    assert_eq!(psr.dm, 71.02);
    assert!(cat.find("J9999+9999").is_none());
}

#[test]
fn test_comments_before_header_and_crlf() {
    let text = "# comment\r\n@-----\r\nNUM;NAME;RAJD;DECJD;P0;DM\r\n1;J1;10.0;-5.0;0.5;20.0\r\n\r\n";
    let cat = parse(text).unwrap();
    assert_eq!(cat.len(), 1);
    assert_eq!(cat.decs_deg[0], -5.0);
}

#[test]
fn test_units_row_skipped() {
    let text = "NUM;NAME;RAJD;DECJD;P0;DM;\n;;(deg);(deg);(s);(cm^-3 pc);\n1;J1;10.0;5.0;0.5;20.0;\n";
    let cat = parse(text).unwrap();
    assert_eq!(cat.len(), 1);
}

#[test]
fn test_zero_dm_row_rejected() {
    let text = "NUM;NAME;RAJD;DECJD;P0;DM;\n1;J1;10.0;5.0;0.5;20.0;\n2;J2;11.0;6.0;0.7;0.0;\n";
    let err = parse(text).unwrap_err();
    match err {
        CatalogError::NonPositive { line, column, .. } => {
            assert_eq!(line, 3);
            assert_eq!(column, "DM");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_zero_period_row_rejected() {
    let text = "NUM;NAME;RAJD;DECJD;P0;DM;\n1;J1;10.0;5.0;0;20.0;\n";
    assert!(matches!(
        parse(text).unwrap_err(),
        CatalogError::NonPositive { column: "P0", .. }
    ));
}

#[test]
fn test_malformed_rows_rejected() {
    let missing_field = "NUM;NAME;RAJD;DECJD;P0;DM;\n1;J1;10.0;5.0;0.5;\n";
    assert!(matches!(
        parse(missing_field).unwrap_err(),
        CatalogError::FieldCount { found: 5, .. }
    ));

    let atnf_star = "NUM;NAME;RAJD;DECJD;P0;DM;\n1;J1;10.0;5.0;*;20.0;\n";
    assert!(matches!(
        parse(atnf_star).unwrap_err(),
        CatalogError::BadNumber { column: "P0", .. }
    ));

    let no_name = "NUM;NAME;RAJD;DECJD;P0;DM;\n1;;10.0;5.0;0.5;20.0;\n";
    assert!(matches!(
        parse(no_name).unwrap_err(),
        CatalogError::EmptyName { line: 2, .. }
    ));
}

#[test]
fn test_header_required() {
    assert!(matches!(
        parse("# only comments\n").unwrap_err(),
        CatalogError::MissingHeader { .. }
    ));
    assert!(matches!(
        parse("NAME;RAJD;DECJD\n1;2;3\n").unwrap_err(),
        CatalogError::BadHeader { line: 1, .. }
    ));
}

#[test]
fn test_header_only_is_empty_catalog() {
    let cat = parse("NUM;NAME;RAJD;DECJD;P0;DM;\n").unwrap();
    assert!(cat.is_empty());
}

#[test]
fn test_load_catalog_plain_and_gz() {
    let dir = make_temp_dir();
    let plain = dir.join("knownpulsars.csv");
    fs::write(&plain, EXPORT).unwrap();
    let gz = dir.join("knownpulsars.csv.gz");
    let mut enc = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
    enc.write_all(EXPORT.as_bytes()).unwrap();
    enc.finish().unwrap();

    let a = load_catalog(&plain).unwrap();
    let b = load_catalog(&gz).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 3);
}

#[test]
fn test_load_catalog_missing_file() {
    let dir = make_temp_dir();
    let err = load_catalog(&dir.join("absent.csv")).unwrap_err();
    assert!(matches!(err, CatalogError::Input(InputError::MissingInput(_))));
}
