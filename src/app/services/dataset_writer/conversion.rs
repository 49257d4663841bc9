//! `TimeSeries` to polars conversion

use chrono::{Duration, NaiveDateTime};
use polars::prelude::{DataFrame, DataType, IntoColumn, NamedFrom, Series, TimeUnit};
use tracing::debug;

use crate::app::models::{ColumnData, TimeSeries};
use crate::{Error, Result};

/// Name of the timestamp column in exported tables
pub const TIME_COLUMN: &str = "time";

/// Milliseconds since the epoch, shifted to UTC when an offset is known
fn epoch_millis(series: &TimeSeries) -> Vec<i64> {
    let shift = series
        .offset()
        .map(|o| Duration::seconds(i64::from(o.local_minus_utc())))
        .unwrap_or_else(Duration::zero);
    series
        .index()
        .iter()
        .map(|ts: &NaiveDateTime| (*ts - shift).and_utc().timestamp_millis())
        .collect()
}

fn to_series(name: &str, data: &ColumnData) -> Series {
    match data {
        ColumnData::Float(values) => Series::new(name.into(), values.as_slice()),
        ColumnData::Int(values) => Series::new(name.into(), values.as_slice()),
        ColumnData::Text(values) => {
            let values: Vec<Option<&str>> = values.iter().map(|v| v.as_deref()).collect();
            Series::new(name.into(), values.as_slice())
        }
    }
}

/// Build a `DataFrame` with a `time` Datetime(ms) column followed by the
/// series columns in order
pub fn to_dataframe(series: &TimeSeries) -> Result<DataFrame> {
    if series.has_column(TIME_COLUMN) {
        return Err(Error::export(
            format!("column name '{}' is reserved for timestamps", TIME_COLUMN),
            None,
        ));
    }
    let time = Series::new(TIME_COLUMN.into(), epoch_millis(series))
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

    let mut columns = Vec::with_capacity(series.columns().len() + 1);
    columns.push(time.into_column());
    for column in series.columns() {
        columns.push(to_series(&column.name, &column.data).into_column());
    }
    let frame = DataFrame::new(columns)?;
    debug!("Built {}x{} frame", frame.height(), frame.width());
    Ok(frame)
}
