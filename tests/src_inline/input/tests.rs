use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::Compression;
use flate2::write::GzEncoder;

use super::*;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("psr_ratings_input_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_open_plain_file() {
    let dir = make_temp_dir();
    let path = dir.join("plain.txt");
    fs::write(&path, "hello\n").unwrap();

    let mut text = String::new();
    open_maybe_gz(&path).unwrap().read_to_string(&mut text).unwrap();
    assert_eq!(text, "hello\n");
}

#[test]
fn test_open_gz_file() {
    let dir = make_temp_dir();
    let path = dir.join("packed.txt.gz");
    let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    enc.write_all(b"compressed line\n").unwrap();
    enc.finish().unwrap();

    assert!(is_gz(&path));
    let mut text = String::new();
    open_maybe_gz(&path).unwrap().read_to_string(&mut text).unwrap();
    assert_eq!(text, "compressed line\n");
}

#[test]
fn test_open_missing_file() {
    let dir = make_temp_dir();
    let err = match open_maybe_gz(&dir.join("nope.csv")) {
        Err(err) => err,
        Ok(_) => panic!("expected missing input"),
    };
    assert!(matches!(err, InputError::MissingInput(_)));
}
