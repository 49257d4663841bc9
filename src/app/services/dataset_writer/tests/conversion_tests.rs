use super::{create_test_series, ts};
use crate::ErrorKind;
use crate::app::models::{ColumnData, TimeSeries};
use crate::app::services::dataset_writer::{TIME_COLUMN, to_dataframe};
use chrono::FixedOffset;
use polars::prelude::{DataType, TimeUnit};

#[test]
fn test_frame_layout() {
    let frame = to_dataframe(&create_test_series(None)).unwrap();
    let names: Vec<&str> = frame.get_column_names().iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["time", "ghi", "flag", "source"]);
    assert_eq!(frame.height(), 3);
    assert_eq!(
        frame.column(TIME_COLUMN).unwrap().dtype(),
        &DataType::Datetime(TimeUnit::Milliseconds, None)
    );
}

#[test]
fn test_naive_series_keeps_wall_clock() {
    let frame = to_dataframe(&create_test_series(None)).unwrap();
    let millis = frame
        .column(TIME_COLUMN)
        .unwrap()
        .cast(&DataType::Int64)
        .unwrap();
    let expected = ts(1, 10).and_utc().timestamp_millis();
    assert_eq!(millis.i64().unwrap().get(0), Some(expected));
}

#[test]
fn test_offset_series_stored_as_utc() {
    let series = create_test_series(FixedOffset::west_opt(7 * 3600));
    let frame = to_dataframe(&series).unwrap();
    let millis = frame
        .column(TIME_COLUMN)
        .unwrap()
        .cast(&DataType::Int64)
        .unwrap();
    // 10:00 at UTC-7 is 17:00 UTC
    let expected = ts(1, 17).and_utc().timestamp_millis();
    assert_eq!(millis.i64().unwrap().get(0), Some(expected));
}

#[test]
fn test_missing_values_become_nulls() {
    let frame = to_dataframe(&create_test_series(None)).unwrap();
    let ghi = frame.column("ghi").unwrap().f64().unwrap();
    assert_eq!(ghi.get(0), Some(512.5));
    assert_eq!(ghi.get(1), None);
    let flag = frame.column("flag").unwrap().i64().unwrap();
    assert_eq!(flag.get(2), None);
    let source = frame.column("source").unwrap().str().unwrap();
    assert_eq!(source.get(2), Some("E"));
    assert_eq!(source.get(1), None);
}

#[test]
fn test_reserved_time_column_rejected() {
    let mut series = TimeSeries::new(vec![ts(1, 0)], None);
    series
        .push_column("time", ColumnData::Float(vec![Some(1.0)]))
        .unwrap();
    let err = to_dataframe(&series).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Export);
}

#[test]
fn test_empty_series() {
    let frame = to_dataframe(&TimeSeries::default()).unwrap();
    assert_eq!(frame.height(), 0);
    assert_eq!(frame.width(), 1);
}
