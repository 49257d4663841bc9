//! Token and timestamp helpers shared by the format readers

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use std::path::Path;
use tracing::debug;

use crate::app::models::{Metadata, TimeSeries};
use crate::constants::VariableMap;
use crate::{Error, Result};

/// Read a whole file into memory
pub fn read_source(path: &Path) -> Result<String> {
    debug!("Reading {}", path.display());
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    // Several archives ship Latin-1 station names
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    })
}

/// Parse a required numeric token
pub fn parse_number<T: std::str::FromStr>(
    format: &'static str,
    line: usize,
    what: &str,
    token: &str,
) -> Result<T> {
    let trimmed = token.trim().trim_matches('"');
    trimmed.parse().map_err(|_| {
        Error::format_at(
            format,
            line,
            format!("cannot parse {} from '{}'", what, trimmed),
        )
    })
}

/// Build a calendar date, failing with a format error when it does not exist
pub fn make_date(format: &'static str, line: usize, year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        Error::format_at(
            format,
            line,
            format!("invalid date {:04}-{:02}-{:02}", year, month, day),
        )
    })
}

/// Date from a year and 1-based day of year
pub fn date_from_doy(format: &'static str, line: usize, year: i32, doy: u32) -> Result<NaiveDate> {
    NaiveDate::from_yo_opt(year, doy).ok_or_else(|| {
        Error::format_at(format, line, format!("invalid day of year {} in {}", doy, year))
    })
}

/// Midnight of `date` plus a number of minutes, allowing 24:00
pub fn at_minutes(date: NaiveDate, minutes: i64) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN) + Duration::minutes(minutes)
}

/// Split an `HHMM` integer (e.g. 1430) into minutes since midnight
pub fn hhmm_to_minutes(hhmm: i64) -> i64 {
    (hhmm / 100) * 60 + hhmm % 100
}

/// Parse `H:MM` or `HH:MM` into minutes since midnight; 24:00 is allowed
pub fn clock_to_minutes(format: &'static str, line: usize, token: &str) -> Result<i64> {
    let (h, m) = token.trim().split_once(':').ok_or_else(|| {
        Error::format_at(format, line, format!("expected HH:MM time, found '{}'", token))
    })?;
    let hours: i64 = parse_number(format, line, "hour", h)?;
    let minutes: i64 = parse_number(format, line, "minute", m)?;
    if !(0..=24).contains(&hours) || !(0..60).contains(&minutes) || (hours == 24 && minutes != 0) {
        return Err(Error::format_at(
            format,
            line,
            format!("time '{}' out of range", token),
        ));
    }
    Ok(hours * 60 + minutes)
}

/// Replace the year of a timestamp; Feb 29 moves to Feb 28 in non-leap years
pub fn with_year(timestamp: NaiveDateTime, year: i32) -> NaiveDateTime {
    timestamp
        .with_year(year)
        .or_else(|| {
            timestamp
                .date()
                .with_day(28)
                .and_then(|d| d.with_year(year))
                .map(|d| d.and_time(timestamp.time()))
        })
        .unwrap_or(timestamp)
}

/// Rename columns through a variable map when enabled
pub fn apply_variable_map(series: &mut TimeSeries, map: VariableMap, enabled: bool) {
    if enabled {
        series.rename_with(map);
    }
}

/// Strip surrounding whitespace and double quotes
pub fn unquote(token: &str) -> &str {
    token.trim().trim_matches('"').trim()
}

/// Split `key: value` lines, as used by several text headers
pub fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    Some((key.trim(), value.trim()))
}

/// Insert `key` parsed as float when possible, otherwise as text
pub fn insert_inferred(metadata: &mut Metadata, key: &str, raw: &str) {
    metadata.insert(key, crate::app::models::MetaValue::infer(raw));
}

/// Iterate lines with their 1-based line numbers
pub fn numbered_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
}
