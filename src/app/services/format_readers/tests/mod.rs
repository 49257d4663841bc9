//! Test utilities for the format readers
//!
//! Fixtures live in the crate's `data/` directory; small inline documents
//! are built with the helpers below.

use chrono::{NaiveDate, NaiveDateTime};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

mod bsrn_tests;
mod dispatch_tests;
mod service_format_tests;
mod station_format_tests;

/// Path of a bundled fixture
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join(name)
}

/// Helper to create a temporary file with given content
pub fn create_temp_file(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    write!(temp_file, "{}", content).unwrap();
    temp_file
}

/// Temporary file whose name ends with `suffix`, for extension-aware readers
pub fn create_temp_file_with_suffix(content: &str, suffix: &str) -> NamedTempFile {
    let mut temp_file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    write!(temp_file, "{}", content).unwrap();
    temp_file
}

pub fn ts(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub fn approx(actual: Option<f64>, expected: f64) -> bool {
    actual.is_some_and(|v| (v - expected).abs() < 1e-6)
}

/// Minimal CAMS document with one header block and the given rows
pub fn cams_document(time_reference: &str, rows: &[&str]) -> String {
    let mut doc = String::from(
        "# Coding: utf-8\n\
         # File format version: 4\n\
         # Latitude (positive North, ISO 19115): 48.8\n\
         # Longitude (positive East, ISO 19115): 2.3\n\
         # Altitude (m): 35.0\n",
    );
    doc.push_str(&format!("# Time reference: {}\n", time_reference));
    doc.push_str("# Observation period;TOA;Clear sky GHI;GHI;Reliability\n");
    for row in rows {
        doc.push_str(row);
        doc.push('\n');
    }
    doc
}
