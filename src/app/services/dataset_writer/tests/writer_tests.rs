use super::create_test_dataset;
use crate::ErrorKind;
use crate::app::services::dataset_writer::{OutputFormat, write_dataset};
use crate::config::{CompressionAlgorithm, OutputConfig};
use polars::prelude::{CsvReadOptions, ParquetReader, SerReader};
use std::fs::File;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_output_format_from_extension() {
    assert_eq!(
        OutputFormat::from_path(Path::new("out.parquet")).unwrap(),
        OutputFormat::Parquet
    );
    assert_eq!(
        OutputFormat::from_path(Path::new("OUT.CSV")).unwrap(),
        OutputFormat::Csv
    );
    let err = OutputFormat::from_path(Path::new("out.xlsx")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_write_parquet() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("site.parquet");
    let config = OutputConfig {
        compression: CompressionAlgorithm::Zstd,
    };

    write_dataset(&create_test_dataset(), &path, &config).unwrap();

    let frame = ParquetReader::new(File::open(&path).unwrap())
        .finish()
        .unwrap();
    assert_eq!(frame.height(), 3);
    assert_eq!(frame.width(), 4);
    assert_eq!(frame.column("ghi").unwrap().f64().unwrap().get(2), Some(640.0));
}

#[test]
fn test_write_csv() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("site.csv");

    write_dataset(&create_test_dataset(), &path, &OutputConfig::default()).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("time,ghi,flag,source"));
    assert_eq!(content.lines().count(), 4);

    let frame = CsvReadOptions::default()
        .try_into_reader_with_file_path(Some(path.clone()))
        .unwrap()
        .finish()
        .unwrap();
    assert_eq!(frame.height(), 3);
}

#[test]
fn test_write_to_missing_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing").join("site.csv");
    let err = write_dataset(&create_test_dataset(), &path, &OutputConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}
