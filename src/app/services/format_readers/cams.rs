//! CAMS radiation service and McClear CSV reader
//!
//! Header lines start with `#` and carry `key: value` pairs. The line
//! starting with `# Observation period` names the `;`-separated columns.
//! Each row is labelled by an ISO 8601 `start/end` period.

use chrono::{FixedOffset, NaiveDateTime};
use std::path::Path;
use tracing::{debug, info};

use super::field_parsers::{numbered_lines, read_source};
use super::schema::{FieldKind, FieldSpec, RowAccumulator};
use crate::app::models::{Dataset, Metadata};
use crate::constants::variables;
use crate::{Error, Result};

const CAMS: &str = "CAMS";

const COLUMN_LINE: &str = "# Observation period";

/// Columns reported as irradiation (Wh/m^2) over the observation period
const INTEGRATED_COLUMNS: &[&str] = &[
    "TOA",
    "Clear sky GHI",
    "Clear sky BHI",
    "Clear sky DHI",
    "Clear sky BNI",
    "GHI",
    "BHI",
    "DHI",
    "BNI",
    "GHI no corr",
    "BHI no corr",
    "DHI no corr",
    "BNI no corr",
];

/// Which end of the observation period labels a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeriodLabel {
    #[default]
    Left,
    Right,
}

/// Time reference of a CAMS file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeReference {
    /// Universal time, the series is UTC
    Utc,
    /// True solar time, the series is naive
    TrueSolar,
}

impl TimeReference {
    /// Value of the `time_ref` request parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeReference::Utc => "UT",
            TimeReference::TrueSolar => "TST",
        }
    }
}

/// Options for the CAMS reader
#[derive(Debug, Clone, PartialEq)]
pub struct CamsOptions {
    /// Keep irradiation (Wh/m^2) instead of converting to irradiance (W/m^2)
    pub integrated: bool,
    pub label: PeriodLabel,
    pub map_variables: bool,
}

impl Default for CamsOptions {
    fn default() -> Self {
        Self {
            integrated: false,
            label: PeriodLabel::Left,
            map_variables: true,
        }
    }
}

/// Read a CAMS CSV file
pub fn read_cams(path: impl AsRef<Path>, options: &CamsOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let content = read_source(path)?;
    let dataset = parse_cams(&content, options)?;
    info!("Read {} CAMS rows from {}", dataset.data.len(), path.display());
    Ok(dataset)
}

fn parse_period_end(line_no: usize, token: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(token.trim(), "%Y-%m-%dT%H:%M:%S%.f").map_err(|_| {
        Error::format_at(
            CAMS,
            line_no,
            format!("invalid observation time '{}'", token),
        )
    })
}

/// Decode CAMS CSV content
pub fn parse_cams(content: &str, options: &CamsOptions) -> Result<Dataset> {
    let mut lines = numbered_lines(content);
    let mut metadata = Metadata::new();

    let names: Vec<String> = loop {
        let (line_no, line) = lines
            .next()
            .ok_or_else(|| Error::format(CAMS, "missing '# Observation period' column line"))?;
        if line.starts_with(COLUMN_LINE) {
            break line
                .trim_start_matches('#')
                .split(';')
                .map(|s| s.trim().to_string())
                .collect();
        }
        if !line.starts_with('#') {
            return Err(Error::format_at(
                CAMS,
                line_no,
                "data found before the column line",
            ));
        }
        if let Some((key, value)) = line.trim_start_matches('#').split_once(": ") {
            metadata.insert(key.trim(), value.trim());
        }
    };

    let mut coordinate = |key: &str, short: &str| -> Result<()> {
        let value: f64 = metadata
            .get_str(key)
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| Error::format(CAMS, format!("missing or non-numeric '{}'", key)))?;
        metadata.insert(short, value);
        Ok(())
    };
    coordinate("Latitude (positive North, ISO 19115)", "latitude")?;
    coordinate("Longitude (positive East, ISO 19115)", "longitude")?;
    coordinate("Altitude (m)", "altitude")?;

    let reference = match metadata.get_str("Time reference") {
        Some(r) if r.contains("(UT)") => TimeReference::Utc,
        Some(r) if r.contains("(TST)") => TimeReference::TrueSolar,
        other => {
            return Err(Error::format(
                CAMS,
                format!("unsupported time reference {:?}", other),
            ));
        }
    };
    metadata.insert("time_reference", reference.as_str());
    metadata.insert("integrated", options.integrated);
    metadata.insert(
        "radiation_unit",
        if options.integrated { "Wh/m^2" } else { "W/m^2" },
    );
    debug!(
        "CAMS header with {} columns, time reference {}",
        names.len(),
        reference.as_str()
    );

    let specs = names[1..]
        .iter()
        .map(|n| FieldSpec::named(n.as_str(), FieldKind::Float))
        .collect();
    let mut acc = RowAccumulator::new(CAMS, specs);
    let mut period_hours = Vec::new();

    for (line_no, line) in lines {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(';').collect();
        if fields.len() != names.len() {
            return Err(Error::format_at(
                CAMS,
                line_no,
                format!("expected {} fields, found {}", names.len(), fields.len()),
            ));
        }
        let (start, end) = fields[0].split_once('/').ok_or_else(|| {
            Error::format_at(
                CAMS,
                line_no,
                format!("expected 'start/end' period, found '{}'", fields[0]),
            )
        })?;
        let start = parse_period_end(line_no, start)?;
        let end = parse_period_end(line_no, end)?;
        let timestamp = match options.label {
            PeriodLabel::Left => start,
            PeriodLabel::Right => end,
        };
        let hours = (end - start).num_seconds() as f64 / 3600.0;
        if hours <= 0.0 {
            return Err(Error::format_at(
                CAMS,
                line_no,
                format!("observation period ends at or before its start: '{}'", fields[0]),
            ));
        }
        period_hours.push(hours);
        acc.push_row(line_no, timestamp, &fields[1..])?;
    }

    let offset = match reference {
        TimeReference::Utc => FixedOffset::east_opt(0),
        TimeReference::TrueSolar => None,
    };
    let mut data = acc.finish(offset)?;
    data.ensure_strictly_increasing(CAMS)?;

    if !options.integrated {
        for name in INTEGRATED_COLUMNS {
            if let Some(values) = data.float_values_mut(name) {
                for (value, hours) in values.iter_mut().zip(&period_hours) {
                    *value = value.map(|x| x / hours);
                }
            }
        }
    }
    if options.map_variables {
        data.rename_with(variables::CAMS);
    }
    Ok(Dataset::new(data, metadata))
}
