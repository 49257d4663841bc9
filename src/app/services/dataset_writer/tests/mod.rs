//! Unit tests for dataset export

use chrono::{FixedOffset, NaiveDate, NaiveDateTime};

use crate::app::models::{ColumnData, Dataset, Metadata, TimeSeries};

mod conversion_tests;
mod writer_tests;

pub fn ts(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2020, 6, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

/// Three hourly rows with one column of each type
pub fn create_test_series(offset: Option<FixedOffset>) -> TimeSeries {
    let mut series = TimeSeries::new(vec![ts(1, 10), ts(1, 11), ts(1, 12)], offset);
    series
        .push_column("ghi", ColumnData::Float(vec![Some(512.5), None, Some(640.0)]))
        .unwrap();
    series
        .push_column("flag", ColumnData::Int(vec![Some(1), Some(0), None]))
        .unwrap();
    series
        .push_column(
            "source",
            ColumnData::Text(vec![Some("A".to_string()), None, Some("E".to_string())]),
        )
        .unwrap();
    series
}

pub fn create_test_dataset() -> Dataset {
    let mut metadata = Metadata::new();
    metadata.insert("Name", "TEST SITE");
    Dataset::new(create_test_series(FixedOffset::west_opt(7 * 3600)), metadata)
}
