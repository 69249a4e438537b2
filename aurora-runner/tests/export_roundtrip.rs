//! Export to disk and read back through the manifest.

use std::path::PathBuf;
use std::sync::Arc;

use aurora_core::data::nowcast::GFZ_NOWCAST_URL;
use aurora_core::data::solar_wind::{SWPC_MAG_URL, SWPC_PLASMA_URL};
use aurora_core::data::weather::OPEN_METEO_ARCHIVE_URL;
use aurora_core::http::{HttpResponse, ScriptedTransport};
use aurora_runner::export::{table_to_csv, MANIFEST_FILE};
use aurora_runner::{
    export, read_manifest, run_daily, verify, OutputFormat, PipelineConfig, PipelineOutput,
    RunKind, Sources, SCHEMA_VERSION,
};
use chrono::NaiveDate;
use polars::prelude::*;

fn fixture(name: &str) -> String {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../aurora-core/tests/fixtures");
    std::fs::read_to_string(dir.join(name)).unwrap()
}

fn daily_output() -> PipelineOutput {
    let mut config = PipelineConfig::default();
    config.http.cache_dir = None;
    config.http.max_retries = 0;

    let t = Arc::new(ScriptedTransport::new());
    t.respond(
        OPEN_METEO_ARCHIVE_URL,
        HttpResponse::ok(fixture("open_meteo_archive.json")),
    );
    t.respond(GFZ_NOWCAST_URL, HttpResponse::ok(fixture("kp_nowcast.txt")));
    t.respond(SWPC_PLASMA_URL, HttpResponse::ok(fixture("plasma-7-day.json")));
    t.respond(SWPC_MAG_URL, HttpResponse::ok(fixture("mag-7-day.json")));

    let sources = Sources::with_transport(&config, t, None).unwrap();
    run_daily(&config, &sources, NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()).unwrap()
}

#[test]
fn csv_export_writes_tables_and_manifest() {
    let out = daily_output();
    let dir = tempfile::tempdir().unwrap();

    let manifest = export(&out, dir.path(), OutputFormat::Csv).unwrap();
    assert_eq!(manifest.schema_version, SCHEMA_VERSION);
    assert_eq!(manifest.kind, RunKind::Daily);
    assert_eq!(manifest.tables.len(), 3);

    for name in ["weather.csv", "solar_features.csv", "geomagnetic_features.csv", MANIFEST_FILE] {
        assert!(dir.path().join(name).exists(), "{name} missing");
    }
    let leftovers = std::fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().extension().is_some_and(|x| x == "tmp"))
        .count();
    assert_eq!(leftovers, 0);

    let weather = manifest.table("weather").unwrap();
    assert_eq!(weather.rows, 7);
    assert_eq!(weather.columns[0], "date");

    let text = std::fs::read_to_string(dir.path().join("weather.csv")).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "date,cloud_cover_mean,precipitation_sum,sunshine_duration"
    );
    assert!(lines.next().unwrap().starts_with("2024-05-03,"));
    assert_eq!(text.lines().count(), 8);

    let reread = read_manifest(dir.path()).unwrap();
    assert_eq!(reread, manifest);
    verify(dir.path(), &reread).unwrap();
}

#[test]
fn tampered_file_fails_verification() {
    let out = daily_output();
    let dir = tempfile::tempdir().unwrap();
    let manifest = export(&out, dir.path(), OutputFormat::Csv).unwrap();

    std::fs::write(dir.path().join("weather.csv"), "date\n").unwrap();
    assert!(verify(dir.path(), &manifest).is_err());
}

#[test]
fn geomagnetic_csv_leaves_missing_lags_empty() {
    let out = daily_output();
    let bytes = table_to_csv(&out.geomagnetic).unwrap();
    let text = String::from_utf8(bytes).unwrap();

    let header: Vec<&str> = text.lines().next().unwrap().split(',').collect();
    let lag_col = header.iter().position(|h| *h == "kp_mean_lag_1").unwrap();
    let first: Vec<&str> = text.lines().nth(1).unwrap().split(',').collect();
    assert_eq!(first[lag_col], "");
}

#[test]
fn parquet_export_reads_back_as_dataframe() {
    let out = daily_output();
    let dir = tempfile::tempdir().unwrap();
    let manifest = export(&out, dir.path(), OutputFormat::Parquet).unwrap();

    let entry = manifest.table("solar_features").unwrap();
    assert_eq!(entry.file, "solar_features.parquet");

    let file = std::fs::File::open(dir.path().join(&entry.file)).unwrap();
    let df = ParquetReader::new(file).finish().unwrap();
    assert_eq!(df.height(), entry.rows);
    assert_eq!(df.height(), out.solar.as_ref().unwrap().len());
    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    assert_eq!(names, entry.columns);
    verify(dir.path(), &manifest).unwrap();
}

#[test]
fn newer_schema_version_is_rejected() {
    let out = daily_output();
    let dir = tempfile::tempdir().unwrap();
    export(&out, dir.path(), OutputFormat::Csv).unwrap();

    let path = dir.path().join(MANIFEST_FILE);
    let mut json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    json["schema_version"] = serde_json::json!(SCHEMA_VERSION + 1);
    std::fs::write(&path, json.to_string()).unwrap();

    let err = read_manifest(dir.path()).unwrap_err();
    assert!(err.to_string().contains("unsupported schema version"));
}
