//! End-to-end catalog runs over temporary directory trees.

use std::fs;
use std::path::Path;
use symcat_core::catalog::{Catalog, CatalogBuilder, CatalogEntry, Resolution};
use symcat_core::data::{ExclusionSet, Rejection, ScanSettings, StreamScanner, TemplateSet};
use symcat_core::{CancelToken, NoProgress, TimeRange};
use tempfile::TempDir;

const HEADER: &str = "Unix Timestamp,Date,Symbol,Open,High,Low,Close,Volume";

fn write_bars(dir: &Path, rel: &str, rows: &[(i64, f64)]) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut text = format!("{HEADER}\n");
    for (ts, close) in rows {
        text.push_str(&format!("{ts},2019-01-01,X,{close},{close},{close},{close},10\n"));
    }
    fs::write(path, text).unwrap();
}

fn templates(dir: &Path, rels: &[&str]) -> TemplateSet {
    TemplateSet::parse(rels.iter().map(|r| format!("{}/{r}", dir.display()))).unwrap()
}

fn build(set: &TemplateSet, exclusions: &ExclusionSet) -> (Catalog, symcat_core::CatalogSummary) {
    let settings = ScanSettings::default();
    let cancel = CancelToken::new();
    let scanner = StreamScanner::new(&settings, &cancel);
    CatalogBuilder::new(set, exclusions, scanner)
        .build(&NoProgress)
        .unwrap()
}

fn clean_rows(start: i64) -> Vec<(i64, f64)> {
    vec![(start, 100.0), (start + 60, 101.0), (start + 120, 99.0), (start + 180, 102.0)]
}

#[test]
fn resolves_every_clean_symbol() {
    let dir = TempDir::new().unwrap();
    write_bars(dir.path(), "a/BTC.csv", &clean_rows(1000));
    write_bars(dir.path(), "a/ETH.csv", &clean_rows(5000));

    let set = templates(dir.path(), &["a/*.csv"]);
    let (catalog, summary) = build(&set, &ExclusionSet::default());

    assert_eq!(summary.total, 2);
    assert_eq!(summary.resolved, 2);
    assert!(summary.all_resolved());
    assert_eq!(catalog.time_period("BTC"), Some(TimeRange { start: 1000, end: 1180 }));
    assert_eq!(catalog.time_period("ETH"), Some(TimeRange { start: 5000, end: 5180 }));
}

#[test]
fn outlier_removes_symbol_from_catalog() {
    let dir = TempDir::new().unwrap();
    write_bars(
        dir.path(),
        "a/BAD.csv",
        &[(1000, 100.0), (1060, 101.0), (1120, 99.0), (1180, 600.0)],
    );
    write_bars(dir.path(), "a/GOOD.csv", &clean_rows(1000));

    let set = templates(dir.path(), &["a/*.csv"]);
    let (catalog, summary) = build(&set, &ExclusionSet::default());

    assert!(catalog.get("BAD").is_none());
    assert!(catalog.get("GOOD").is_some());
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].symbol, "BAD");
    assert!(matches!(
        summary.failures[0].attempts[0].rejection,
        Rejection::Outlier { line: 5, .. }
    ));
}

#[test]
fn lower_precedence_template_fills_in() {
    let dir = TempDir::new().unwrap();
    // higher-precedence file has no usable rows
    fs::create_dir_all(dir.path().join("A")).unwrap();
    fs::write(dir.path().join("A/BTC.csv"), format!("{HEADER}\nbad,row\n")).unwrap();
    write_bars(dir.path(), "B/BTC.csv", &clean_rows(2000));

    let set = templates(dir.path(), &["A/*.csv", "B/*.csv"]);
    let (catalog, summary) = build(&set, &ExclusionSet::default());

    assert_eq!(summary.resolved, 1);
    assert_eq!(catalog.time_period("BTC"), Some(TimeRange { start: 2000, end: 2180 }));
}

#[test]
fn single_row_file_yields_to_next_template() {
    let dir = TempDir::new().unwrap();
    write_bars(dir.path(), "A/BTC.csv", &[(1500, 100.0)]);
    write_bars(dir.path(), "B/BTC.csv", &clean_rows(2000));

    let set = templates(dir.path(), &["A/*.csv", "B/*.csv"]);
    let (catalog, summary) = build(&set, &ExclusionSet::default());

    assert_eq!(summary.resolved, 1);
    assert_eq!(catalog.time_period("BTC"), Some(TimeRange { start: 2000, end: 2180 }));
}

#[test]
fn single_row_file_alone_is_unresolved() {
    let dir = TempDir::new().unwrap();
    write_bars(dir.path(), "a/BTC.csv", &[(1500, 100.0)]);

    let set = templates(dir.path(), &["a/*.csv"]);
    let (catalog, summary) = build(&set, &ExclusionSet::default());

    assert!(catalog.is_empty());
    assert_eq!(
        summary.failures[0].attempts[0].rejection,
        Rejection::NoEndTimestamp { start: 1500 }
    );
}

#[test]
fn resolution_names_the_file_used() {
    let dir = TempDir::new().unwrap();
    write_bars(dir.path(), "B/BTC.csv", &clean_rows(2000));

    let set = templates(dir.path(), &["A/*.csv", "B/*.csv"]);
    let settings = ScanSettings::default();
    let cancel = CancelToken::new();
    let exclusions = ExclusionSet::default();
    let builder = CatalogBuilder::new(&set, &exclusions, StreamScanner::new(&settings, &cancel));

    match builder.resolve("BTC").unwrap() {
        Resolution::Resolved { entry, path } => {
            assert_eq!(path, dir.path().join("B/BTC.csv"));
            assert_eq!(entry.range(), TimeRange { start: 2000, end: 2180 });
        }
        other => panic!("expected BTC to resolve, got {other:?}"),
    }
}

#[test]
fn dotfiles_are_not_symbols() {
    let dir = TempDir::new().unwrap();
    write_bars(dir.path(), "a/BTC.csv", &clean_rows(1000));
    write_bars(dir.path(), "a/.BTC.csv", &clean_rows(1000));

    let set = templates(dir.path(), &["a/*.csv"]);
    let (catalog, summary) = build(&set, &ExclusionSet::default());

    assert_eq!(summary.total, 1);
    assert_eq!(catalog.symbols().collect::<Vec<_>>(), vec!["BTC"]);
}

#[test]
fn higher_precedence_template_wins_when_both_clean() {
    let dir = TempDir::new().unwrap();
    write_bars(dir.path(), "A/BTC.csv", &clean_rows(1000));
    write_bars(dir.path(), "B/BTC.csv", &clean_rows(9000));

    let set = templates(dir.path(), &["A/*.csv", "B/*.csv"]);
    let (catalog, _) = build(&set, &ExclusionSet::default());

    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.time_period("BTC"), Some(TimeRange { start: 1000, end: 1180 }));
}

#[test]
fn symbol_found_only_under_second_template() {
    let dir = TempDir::new().unwrap();
    write_bars(dir.path(), "A/BTC.csv", &clean_rows(1000));
    write_bars(dir.path(), "B/LTC.csv", &clean_rows(3000));

    let set = templates(dir.path(), &["A/*.csv", "B/*.csv"]);
    let (catalog, summary) = build(&set, &ExclusionSet::default());

    assert_eq!(summary.total, 2);
    assert_eq!(catalog.time_period("LTC"), Some(TimeRange { start: 3000, end: 3180 }));
}

#[test]
fn excluded_symbol_never_appears() {
    let dir = TempDir::new().unwrap();
    write_bars(dir.path(), "a/BTC.csv", &clean_rows(1000));
    write_bars(dir.path(), "a/ETH.csv", &clean_rows(1000));
    fs::write(dir.path().join("corrupted_files.txt"), "ETH\n").unwrap();

    let exclusions = ExclusionSet::from_path(&dir.path().join("corrupted_files.txt")).unwrap();
    let set = templates(dir.path(), &["a/*.csv"]);
    let (catalog, summary) = build(&set, &exclusions);

    assert_eq!(summary.excluded, 1);
    assert_eq!(summary.total, 1);
    assert!(catalog.get("ETH").is_none());
    assert!(catalog.get("BTC").is_some());
}

#[test]
fn millisecond_files_are_catalogued_in_seconds() {
    let dir = TempDir::new().unwrap();
    write_bars(
        dir.path(),
        "a/BTC.csv",
        &[(1_546_300_800_000, 3700.0), (1_546_300_860_000, 3701.0)],
    );

    let set = templates(dir.path(), &["a/*.csv"]);
    let (catalog, _) = build(&set, &ExclusionSet::default());

    assert_eq!(
        catalog.get("BTC"),
        Some(&CatalogEntry {
            symbol: "BTC".into(),
            start: 1_546_300_800,
            end: 1_546_300_860,
        })
    );
}

#[test]
fn written_artifact_reads_back() {
    let dir = TempDir::new().unwrap();
    write_bars(dir.path(), "a/BTC.csv", &clean_rows(1000));

    let set = templates(dir.path(), &["a/*.csv"]);
    let (catalog, _) = build(&set, &ExclusionSet::default());

    let out = dir.path().join("symbols.txt");
    catalog.write_path(&out).unwrap();
    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "Symbol,Start Time,End Time\nBTC,1000,1180\n"
    );
    assert_eq!(Catalog::from_path(&out).unwrap(), catalog);
}
