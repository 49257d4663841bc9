//! SolarAnywhere readers
//!
//! Files resemble TMY3: the first line holds USAF id, name, state, timezone
//! and coordinates, followed by extra `key: value` pairs separated by `/`.
//! The API result is JSON with one record per observation period.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use super::ReadOptions;
use super::field_parsers::{apply_variable_map, parse_number, read_source, unquote};
use super::schema::{FieldKind, FieldSpec, RowAccumulator};
use crate::app::models::{Dataset, MetaValue, Metadata};
use crate::constants::variables;
use crate::{Error, Result};

const SOLARANYWHERE: &str = "SolarAnywhere";

const FILE_TIME_COLUMN: &str = "ObservationTime(GMT)";
const JSON_TIME_COLUMN: &str = "ObservationTime";

/// Read a SolarAnywhere CSV file
pub fn read_solaranywhere(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let content = read_source(path)?;
    let dataset = parse_solaranywhere(&content, options)?;
    info!(
        "Read {} SolarAnywhere rows from {}",
        dataset.data.len(),
        path.display()
    );
    Ok(dataset)
}

/// Decode SolarAnywhere CSV content
pub fn parse_solaranywhere(content: &str, options: &ReadOptions) -> Result<Dataset> {
    let (first, body) = content
        .split_once('\n')
        .ok_or_else(|| Error::format(SOLARANYWHERE, "missing header line"))?;
    let metadata = parse_header(first.trim_end_matches('\r'))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| Error::format_at(SOLARANYWHERE, 2, e.to_string()))?
        .clone();
    let time_pos = headers
        .iter()
        .position(|h| h == FILE_TIME_COLUMN)
        .ok_or_else(|| {
            Error::format_at(
                SOLARANYWHERE,
                2,
                format!("missing '{}' column", FILE_TIME_COLUMN),
            )
        })?;

    // The time column is kept as text next to the parsed index
    let specs = headers
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let kind = if i == time_pos { FieldKind::Text } else { FieldKind::Auto };
            FieldSpec::named(name, kind)
        })
        .collect();
    let mut acc = RowAccumulator::new(SOLARANYWHERE, specs);

    for record in reader.records() {
        let record = record.map_err(|e| {
            let line = e.position().map(|p| p.line() as usize + 1).unwrap_or_default();
            Error::format_at(SOLARANYWHERE, line, e.to_string())
        })?;
        // Body starts on the file's second line
        let line_no = record
            .position()
            .map(|p| p.line() as usize + 1)
            .unwrap_or_default();
        let timestamp = NaiveDateTime::parse_from_str(&record[time_pos], "%m/%d/%Y %H:%M")
            .map_err(|_| {
                Error::format_at(
                    SOLARANYWHERE,
                    line_no,
                    format!("invalid observation time '{}'", &record[time_pos]),
                )
            })?;
        let values: Vec<&str> = record.iter().collect();
        acc.push_row(line_no, timestamp, &values)?;
    }

    let mut data = acc.finish(FixedOffset::east_opt(0))?;
    let typical = metadata
        .get_str("Type")
        .is_some_and(|t| t.to_ascii_lowercase().contains("typical"));
    if !typical {
        data.ensure_strictly_increasing(SOLARANYWHERE)?;
    }
    apply_variable_map(&mut data, variables::SOLARANYWHERE, options.map_variables);
    Ok(Dataset::new(data, metadata))
}

fn parse_header(line: &str) -> Result<Metadata> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 7 {
        return Err(Error::format_at(
            SOLARANYWHERE,
            1,
            format!(
                "expected USAF, name, state, TZ, latitude, longitude and altitude, found {} fields",
                fields.len()
            ),
        ));
    }

    let mut metadata = Metadata::new();
    metadata.insert("USAF", parse_number::<i64>(SOLARANYWHERE, 1, "USAF", fields[0])?);
    metadata.insert("name", unquote(fields[1]));
    metadata.insert("state", unquote(fields[2]));
    for (key, token) in [
        ("TZ", fields[3]),
        ("latitude", fields[4]),
        ("longitude", fields[5]),
        ("altitude", fields[6]),
    ] {
        metadata.insert(key, parse_number::<f64>(SOLARANYWHERE, 1, key, token)?);
    }

    // e.g. "Data Version: 3.4 / Type: Typical Year / ..."
    let extras = fields[7..].join(",").replace('"', "");
    for pair in extras.split('/') {
        if let Some((key, value)) = pair.split_once(':') {
            metadata.insert(key.trim(), value.trim());
        }
    }
    debug!("SolarAnywhere header: {:?}", metadata);
    Ok(metadata)
}

/// Decode a completed `WeatherDataResult` JSON response
pub fn parse_solaranywhere_json(body: &str, map_variables: bool) -> Result<Dataset> {
    let root: Value = serde_json::from_str(body).map_err(|e| {
        Error::format_at(SOLARANYWHERE, e.line(), format!("invalid JSON: {}", e))
    })?;
    let result = root
        .pointer("/WeatherDataResults/0")
        .ok_or_else(|| Error::format(SOLARANYWHERE, "missing 'WeatherDataResults'"))?;
    let periods = result
        .pointer("/WeatherDataPeriods/WeatherDataPeriods")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::format(SOLARANYWHERE, "missing 'WeatherDataPeriods'"))?;

    let mut names: Vec<String> = Vec::new();
    for key in periods.iter().filter_map(Value::as_object).flat_map(|p| p.keys()) {
        if !names.contains(key) {
            names.push(key.clone());
        }
    }
    let specs = names
        .iter()
        .map(|n| {
            let kind = if n == JSON_TIME_COLUMN { FieldKind::Text } else { FieldKind::Auto };
            FieldSpec::named(n.as_str(), kind)
        })
        .collect();
    let mut acc = RowAccumulator::new(SOLARANYWHERE, specs);

    for (i, period) in periods.iter().enumerate() {
        let time = period
            .get(JSON_TIME_COLUMN)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::format(SOLARANYWHERE, format!("period {} lacks '{}'", i, JSON_TIME_COLUMN))
            })?;
        let timestamp = DateTime::parse_from_rfc3339(time)
            .map_err(|_| {
                Error::format(SOLARANYWHERE, format!("invalid observation time '{}'", time))
            })?
            .naive_utc();
        let values: Vec<String> = names
            .iter()
            .map(|name| match period.get(name.as_str()) {
                Some(Value::Null) | None => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            })
            .collect();
        acc.push_row(i + 1, timestamp, &values)?;
    }

    let mut data = acc.finish(FixedOffset::east_opt(0))?;
    apply_variable_map(&mut data, variables::SOLARANYWHERE, map_variables);

    let mut metadata = Metadata::new();
    if let Some(Value::Object(info)) = result.get("WeatherSourceInformation") {
        for (key, value) in info {
            let coordinate = match key.as_str() {
                "Latitude" => Some("latitude"),
                "Longitude" => Some("longitude"),
                "Elevation_Meters" => Some("altitude"),
                _ => None,
            };
            let parsed = MetaValue::from_json(value);
            match (coordinate, parsed.as_f64()) {
                (Some(short), Some(number)) => metadata.insert(short, number),
                _ => metadata.insert(key.as_str(), parsed),
            }
        }
    }
    if let Some(resolution) = result
        .pointer("/WeatherDataPeriods/TimeResolution_Minutes")
        .and_then(Value::as_i64)
    {
        metadata.insert("time_resolution", resolution);
    }
    Ok(Dataset::new(data, metadata))
}
