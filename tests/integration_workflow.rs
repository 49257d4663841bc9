//! End-to-end tests over the bundled example files
//!
//! Locate an example file, read it, derive the site location and export
//! the time series, the way the CLI `read` command chains them.

use chrono::FixedOffset;
use polars::prelude::{ParquetReader, SerReader};
use solar_iotools::app::services::dataset_writer::write_dataset;
use solar_iotools::app::services::format_readers::{read_epw, read_srml, read_tmy2, read_tmy3};
use solar_iotools::config::OutputConfig;
use solar_iotools::{
    ErrorKind, FileFormat, Location, ReadOptions, get_example_dataset_path, read_any,
};
use std::fs::File;
use tempfile::TempDir;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-3
}

#[test]
fn test_tmy3_location_and_parquet_export() {
    let path = get_example_dataset_path("722287TY.csv").unwrap();
    let dataset = read_tmy3(&path, &ReadOptions::default()).unwrap();

    let location = Location::from_tmy(&dataset.metadata).unwrap();
    assert_eq!(location.name(), Some("HUNTSVILLE INTL AP"));
    assert!(approx(location.latitude(), 34.637));
    assert!(approx(location.longitude(), -86.775));
    assert!(approx(location.elevation(), 196.0));
    assert_eq!(location.tz(), FixedOffset::west_opt(6 * 3600).unwrap());

    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("huntsville.parquet");
    write_dataset(&dataset, &out, &OutputConfig::default()).unwrap();

    let frame = ParquetReader::new(File::open(&out).unwrap())
        .finish()
        .unwrap();
    assert_eq!(frame.height(), dataset.data.len());
    assert!(frame.column("time").is_ok());
    assert!(frame.column("ghi").is_ok());
}

#[test]
fn test_tmy2_location() {
    let path = get_example_dataset_path("03812.tm2").unwrap();
    let dataset = read_tmy2(&path, &ReadOptions::default()).unwrap();

    let location = Location::from_tmy(&dataset.metadata).unwrap();
    assert_eq!(location.name(), Some("ASHEVILLE"));
    assert!(approx(location.latitude(), 35.0 + 26.0 / 60.0));
    assert!(approx(location.longitude(), -(82.0 + 32.0 / 60.0)));
    assert_eq!(location.tz_hours(), -5.0);
}

#[test]
fn test_epw_location() {
    let path = get_example_dataset_path("NLD_Amsterdam062400_IWEC.epw").unwrap();
    let dataset = read_epw(&path, &ReadOptions::default()).unwrap();

    let location = Location::from_epw(&dataset.metadata).unwrap();
    assert_eq!(location.name(), Some("AMSTERDAM"));
    assert!(approx(location.latitude(), 52.30));
    assert!(approx(location.longitude(), 4.77));
    assert!(approx(location.elevation(), -2.0));
    assert_eq!(location.tz_hours(), 1.0);
}

#[test]
fn test_location_needs_site_metadata() {
    let path = get_example_dataset_path("EUPO1801.txt").unwrap();
    let dataset = read_srml(&path, &ReadOptions::default()).unwrap();

    let err = Location::from_tmy(&dataset.metadata).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_read_any_csv_export_keeps_every_column() {
    let path = get_example_dataset_path("surfrad-slv16001.dat").unwrap();
    let dataset = read_any(FileFormat::Surfrad, &path, &ReadOptions::default()).unwrap();

    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("slv.csv");
    write_dataset(&dataset, &out, &OutputConfig::default()).unwrap();

    let written = std::fs::read_to_string(&out).unwrap();
    let header = written.lines().next().unwrap();
    assert!(header.starts_with("time,"));
    assert_eq!(header.split(',').count(), dataset.data.columns().len() + 1);
    assert_eq!(written.lines().count(), dataset.data.len() + 1);
}

#[test]
fn test_unknown_example_dataset() {
    let err = get_example_dataset_path("no_such_file.csv").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}
