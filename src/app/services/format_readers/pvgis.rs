//! PVGIS (EU JRC Photovoltaic Geographical Information System) readers
//!
//! Covers the typical-year tool in its four output formats, the hourly
//! radiation/PV series in CSV and JSON, and the horizon profile JSON.
//! Timestamps are UTC in the `%Y%m%d:%H%M` form.

use chrono::{FixedOffset, NaiveDateTime};
use serde_json::Value;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use super::ReadOptions;
use super::epw::parse_epw;
use super::field_parsers::{apply_variable_map, numbered_lines, read_source, split_key_value};
use super::schema::{FieldKind, FieldSpec, RowAccumulator};
use crate::app::models::{Dataset, HorizonProfile, MetaValue, Metadata, TimeSeries};
use crate::constants::variables;
use crate::{Error, Result};

const PVGIS: &str = "PVGIS";
const TIME_FORMAT: &str = "%Y%m%d:%H%M";

/// PVGIS output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PvgisFormat {
    Json,
    Csv,
    Basic,
    Epw,
}

impl PvgisFormat {
    /// Value of the `outputformat` request parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            PvgisFormat::Json => "json",
            PvgisFormat::Csv => "csv",
            PvgisFormat::Basic => "basic",
            PvgisFormat::Epw => "epw",
        }
    }

    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(PvgisFormat::Json),
            "csv" => Some(PvgisFormat::Csv),
            "epw" => Some(PvgisFormat::Epw),
            _ => None,
        }
    }

    /// Guess the format from the first non-blank characters
    pub fn sniff(content: &str) -> Option<Self> {
        let head = content.trim_start();
        if head.starts_with('{') {
            Some(PvgisFormat::Json)
        } else if head.starts_with("LOCATION") {
            Some(PvgisFormat::Epw)
        } else if head.starts_with("Latitude") {
            Some(PvgisFormat::Csv)
        } else if head.starts_with("time") {
            Some(PvgisFormat::Basic)
        } else {
            None
        }
    }
}

impl FromStr for PvgisFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(PvgisFormat::Json),
            "csv" => Ok(PvgisFormat::Csv),
            "basic" => Ok(PvgisFormat::Basic),
            "epw" => Ok(PvgisFormat::Epw),
            other => Err(Error::validation(format!(
                "unknown PVGIS output format '{}', expected json, csv, basic or epw",
                other
            ))),
        }
    }
}

/// Options for the PVGIS readers
#[derive(Debug, Clone, PartialEq)]
pub struct PvgisOptions {
    /// Output format; inferred from the path or the content when `None`
    pub format: Option<PvgisFormat>,
    pub map_variables: bool,
}

impl Default for PvgisOptions {
    fn default() -> Self {
        Self {
            format: None,
            map_variables: true,
        }
    }
}

impl PvgisOptions {
    pub fn with_format(mut self, format: PvgisFormat) -> Self {
        self.format = Some(format);
        self
    }

    fn resolve(&self, content: &str) -> Result<PvgisFormat> {
        self.format
            .or_else(|| PvgisFormat::sniff(content))
            .ok_or_else(|| Error::format(PVGIS, "cannot determine output format"))
    }
}

// =============================================================================
// Shared decoding
// =============================================================================

fn parse_time(line_no: usize, token: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(token.trim(), TIME_FORMAT).map_err(|_| {
        Error::format_at(
            PVGIS,
            line_no,
            format!("invalid timestamp '{}', expected YYYYMMDD:HHMM", token),
        )
    })
}

fn column_kind(name: &str) -> FieldKind {
    if name == "Int" {
        FieldKind::Int
    } else {
        FieldKind::Float
    }
}

/// Decode CSV rows until the first line that is not a data row
fn parse_csv_rows<'a>(
    names: &[String],
    rows: impl Iterator<Item = (usize, &'a str)>,
) -> Result<(TimeSeries, Vec<&'a str>)> {
    let specs = names[1..]
        .iter()
        .map(|n| FieldSpec::named(n.as_str(), column_kind(n)))
        .collect();
    let mut acc = RowAccumulator::new(PVGIS, specs);
    let mut trailing = Vec::new();
    let mut in_data = true;

    for (line_no, line) in rows {
        if in_data {
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() <= 1 {
                in_data = false;
                if !line.trim().is_empty() {
                    trailing.push(line.trim());
                }
                continue;
            }
            if fields.len() != names.len() {
                return Err(Error::format_at(
                    PVGIS,
                    line_no,
                    format!("expected {} fields, found {}", names.len(), fields.len()),
                ));
            }
            let timestamp = parse_time(line_no, fields[0])?;
            acc.push_row(line_no, timestamp, &fields[1..])?;
        } else if !line.trim().is_empty() {
            trailing.push(line.trim());
        }
    }
    Ok((acc.finish(FixedOffset::east_opt(0))?, trailing))
}

/// Decode an array of JSON records keyed by column name
fn parse_json_rows(records: &[Value], time_key: &str) -> Result<TimeSeries> {
    if records.is_empty() {
        return Err(Error::format(PVGIS, "no records in JSON output"));
    }
    // Columns in source order, unioned over every record
    let mut names: Vec<&String> = Vec::new();
    for key in records.iter().filter_map(Value::as_object).flat_map(|o| o.keys()) {
        if key != time_key && !names.contains(&key) {
            names.push(key);
        }
    }
    let specs = names
        .iter()
        .map(|n| FieldSpec::named(n.as_str(), column_kind(n)))
        .collect();
    let mut acc = RowAccumulator::new(PVGIS, specs);

    for (i, record) in records.iter().enumerate() {
        let object = record
            .as_object()
            .ok_or_else(|| Error::format(PVGIS, format!("record {} is not an object", i)))?;
        let time = object
            .get(time_key)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::format(PVGIS, format!("record {} lacks '{}'", i, time_key)))?;
        let timestamp = parse_time(i + 1, time).map_err(|e| e.with_line(i + 1))?;
        let fields: Vec<String> = names
            .iter()
            .map(|name| match object.get(name.as_str()) {
                Some(Value::Null) | None => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            })
            .collect();
        acc.push_row(i + 1, timestamp, &fields)?;
    }
    acc.finish(FixedOffset::east_opt(0))
}

fn parse_json(content: &str) -> Result<Value> {
    serde_json::from_str(content)
        .map_err(|e| Error::format_at(PVGIS, e.line(), format!("invalid JSON: {}", e)))
}

/// Copy location coordinates from `inputs.location` into flat metadata
fn insert_location(metadata: &mut Metadata, inputs: &Value) {
    if let Some(location) = inputs.get("location") {
        for key in ["latitude", "longitude", "elevation"] {
            if let Some(v) = location.get(key).and_then(Value::as_f64) {
                metadata.insert(key, v);
            }
        }
    }
}

// =============================================================================
// Typical meteorological year
// =============================================================================

/// Read a PVGIS TMY file; format from options or the file extension
pub fn read_pvgis_tmy(path: impl AsRef<Path>, options: &PvgisOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let mut options = options.clone();
    if options.format.is_none() {
        options.format = PvgisFormat::from_path(path);
    }
    let content = read_source(path)?;
    let dataset = parse_pvgis_tmy(&content, &options)?;
    info!(
        "Read {} PVGIS TMY rows from {}",
        dataset.data.len(),
        path.display()
    );
    Ok(dataset)
}

/// Decode PVGIS TMY content
pub fn parse_pvgis_tmy(content: &str, options: &PvgisOptions) -> Result<Dataset> {
    let format = options.resolve(content)?;
    debug!("Parsing PVGIS TMY as {}", format.as_str());
    let mut dataset = match format {
        PvgisFormat::Json => parse_tmy_json(content)?,
        PvgisFormat::Csv => parse_tmy_csv(content)?,
        PvgisFormat::Basic => parse_tmy_basic(content)?,
        PvgisFormat::Epw => {
            return parse_epw(
                content,
                &ReadOptions {
                    map_variables: options.map_variables,
                    coerce_year: None,
                },
            );
        }
    };
    apply_variable_map(&mut dataset.data, variables::PVGIS, options.map_variables);
    Ok(dataset)
}

fn parse_tmy_json(content: &str) -> Result<Dataset> {
    let root = parse_json(content)?;
    let outputs = root
        .get("outputs")
        .ok_or_else(|| Error::format(PVGIS, "missing 'outputs'"))?;
    let hourly = outputs
        .get("tmy_hourly")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::format(PVGIS, "missing 'outputs.tmy_hourly'"))?;
    let data = parse_json_rows(hourly, "time(UTC)")?;

    let mut metadata = Metadata::new();
    let inputs = root.get("inputs").cloned().unwrap_or(Value::Null);
    insert_location(&mut metadata, &inputs);
    metadata.insert("inputs", inputs);
    metadata.insert(
        "months_selected",
        outputs.get("months_selected").cloned().unwrap_or(Value::Null),
    );
    metadata.insert("meta", root.get("meta").cloned().unwrap_or(Value::Null));
    Ok(Dataset::new(data, metadata))
}

fn parse_tmy_csv(content: &str) -> Result<Dataset> {
    let mut lines = numbered_lines(content);
    let mut inputs = serde_json::Map::new();
    let mut metadata = Metadata::new();

    // Key: value lines up to the months table
    loop {
        let (line_no, line) = lines
            .next()
            .ok_or_else(|| Error::format(PVGIS, "missing 'month,year' table"))?;
        if line.trim_start().to_ascii_lowercase().starts_with("month") {
            break;
        }
        let (key, value) = split_key_value(line).ok_or_else(|| {
            Error::format_at(PVGIS, line_no, format!("expected 'key: value', found '{}'", line))
        })?;
        let parsed = MetaValue::infer(value);
        let short = if key.starts_with("Latitude") {
            Some("latitude")
        } else if key.starts_with("Longitude") {
            Some("longitude")
        } else if key.starts_with("Elevation") {
            Some("elevation")
        } else {
            None
        };
        if let Some(short) = short {
            let number = parsed.as_f64().ok_or_else(|| {
                Error::format_at(PVGIS, line_no, format!("{} is not a number", key))
            })?;
            metadata.insert(short, number);
            inputs.insert(short.to_string(), Value::from(number));
        } else {
            inputs.insert(key.to_string(), Value::from(value));
        }
    }

    let mut months = Vec::with_capacity(12);
    for _ in 0..12 {
        let (line_no, line) = lines
            .next()
            .ok_or_else(|| Error::format(PVGIS, "truncated 'month,year' table"))?;
        let (month, year) = line.split_once(',').ok_or_else(|| {
            Error::format_at(PVGIS, line_no, format!("expected 'month,year', found '{}'", line))
        })?;
        let month: i64 = super::field_parsers::parse_number(PVGIS, line_no, "month", month)?;
        let year: i64 = super::field_parsers::parse_number(PVGIS, line_no, "year", year)?;
        months.push(serde_json::json!({ "month": month, "year": year }));
    }

    let (line_no, header) = lines
        .next()
        .ok_or_else(|| Error::format(PVGIS, "missing data header"))?;
    let names: Vec<String> = header.split(',').map(|s| s.trim().to_string()).collect();
    if names.first().map(String::as_str) != Some("time(UTC)") {
        return Err(Error::format_at(
            PVGIS,
            line_no,
            "expected data header starting with 'time(UTC)'",
        ));
    }
    let (data, trailing) = parse_csv_rows(&names, lines)?;

    metadata.insert("inputs", Value::Object(inputs));
    metadata.insert("months_selected", Value::Array(months));
    metadata.insert("meta", Value::from(trailing));
    Ok(Dataset::new(data, metadata))
}

fn parse_tmy_basic(content: &str) -> Result<Dataset> {
    let mut lines = numbered_lines(content);
    let (line_no, header) = lines
        .next()
        .ok_or_else(|| Error::format(PVGIS, "empty input"))?;
    let names: Vec<String> = header.split(',').map(|s| s.trim().to_string()).collect();
    if names.len() < 2 || !names[0].starts_with("time") {
        return Err(Error::format_at(
            PVGIS,
            line_no,
            "expected header starting with 'time(UTC)'",
        ));
    }
    let (data, _) = parse_csv_rows(&names, lines)?;
    Ok(Dataset::new(data, Metadata::new()))
}

// =============================================================================
// Hourly radiation and PV output
// =============================================================================

/// Read a PVGIS hourly file; format from options or the file extension
pub fn read_pvgis_hourly(path: impl AsRef<Path>, options: &PvgisOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let mut options = options.clone();
    if options.format.is_none() {
        options.format = PvgisFormat::from_path(path);
    }
    let content = read_source(path)?;
    let dataset = parse_pvgis_hourly(&content, &options)?;
    info!(
        "Read {} PVGIS hourly rows from {}",
        dataset.data.len(),
        path.display()
    );
    Ok(dataset)
}

/// Decode PVGIS hourly content (`json` or `csv`)
pub fn parse_pvgis_hourly(content: &str, options: &PvgisOptions) -> Result<Dataset> {
    let format = options.resolve(content)?;
    let mut dataset = match format {
        PvgisFormat::Json => parse_hourly_json(content)?,
        PvgisFormat::Csv => parse_hourly_csv(content)?,
        other => {
            return Err(Error::validation(format!(
                "PVGIS hourly data is only available as json or csv, not {}",
                other.as_str()
            )));
        }
    };
    dataset.data.ensure_strictly_increasing(PVGIS)?;
    apply_variable_map(&mut dataset.data, variables::PVGIS, options.map_variables);
    Ok(dataset)
}

fn parse_hourly_json(content: &str) -> Result<Dataset> {
    let root = parse_json(content)?;
    let hourly = root
        .pointer("/outputs/hourly")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::format(PVGIS, "missing 'outputs.hourly'"))?;
    let data = parse_json_rows(hourly, "time")?;

    let mut metadata = Metadata::new();
    let inputs = root.get("inputs").cloned().unwrap_or(Value::Null);
    insert_location(&mut metadata, &inputs);
    metadata.insert("inputs", inputs);
    metadata.insert("meta", root.get("meta").cloned().unwrap_or(Value::Null));
    Ok(Dataset::new(data, metadata))
}

fn parse_hourly_csv(content: &str) -> Result<Dataset> {
    let mut lines = numbered_lines(content);
    let mut inputs = serde_json::Map::new();
    let mut metadata = Metadata::new();

    let names: Vec<String> = loop {
        let (line_no, line) = lines
            .next()
            .ok_or_else(|| Error::format(PVGIS, "no data section detected"))?;
        if line.starts_with("time,") {
            break line.split(',').map(|s| s.trim().to_string()).collect();
        }
        if line.trim().is_empty() {
            continue;
        }
        let (key, value) = split_key_value(line).ok_or_else(|| {
            Error::format_at(PVGIS, line_no, format!("expected 'key: value', found '{}'", line))
        })?;
        for (prefix, short) in [
            ("Latitude", "latitude"),
            ("Longitude", "longitude"),
            ("Elevation", "elevation"),
        ] {
            if key.starts_with(prefix) {
                if let Some(number) = MetaValue::infer(value).as_f64() {
                    metadata.insert(short, number);
                }
            }
        }
        inputs.insert(key.to_string(), Value::from(value));
    };

    let (data, trailing) = parse_csv_rows(&names, lines)?;
    let meta: serde_json::Map<String, Value> = trailing
        .iter()
        .filter_map(|line| split_key_value(line))
        .map(|(k, v)| (k.to_string(), Value::from(v)))
        .collect();

    metadata.insert("inputs", Value::Object(inputs));
    metadata.insert("meta", Value::Object(meta));
    Ok(Dataset::new(data, metadata))
}

// =============================================================================
// Horizon profile
// =============================================================================

/// Decode the `printhorizon` JSON output.
///
/// PVGIS reports azimuth with 0 = South; it is shifted so 0 = North and the
/// duplicate closing point at 360 degrees is dropped.
pub fn parse_pvgis_horizon(content: &str) -> Result<HorizonProfile> {
    let root = parse_json(content)?;
    let points = root
        .pointer("/outputs/horizon_profile")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::format(PVGIS, "missing 'outputs.horizon_profile'"))?;

    let mut profile = HorizonProfile::default();
    for (i, point) in points.iter().enumerate() {
        let azimuth = point.get("A").and_then(Value::as_f64);
        let elevation = point.get("H_hor").and_then(Value::as_f64);
        let (Some(azimuth), Some(elevation)) = (azimuth, elevation) else {
            return Err(Error::format(
                PVGIS,
                format!("horizon point {} lacks numeric 'A' and 'H_hor'", i),
            ));
        };
        let azimuth = azimuth + 180.0;
        if (azimuth - 360.0).abs() < f64::EPSILON {
            continue;
        }
        profile.azimuth.push(azimuth);
        profile.elevation.push(elevation);
    }

    let inputs = root.get("inputs").cloned().unwrap_or(Value::Null);
    insert_location(&mut profile.metadata, &inputs);
    profile.metadata.insert("inputs", inputs);
    Ok(profile)
}
