//! NREL Measurement and Instrumentation Data Center (MIDC) readers
//!
//! Two layouts exist. Files downloaded from the MIDC web pages start with
//! `DATE (MM/DD/YYYY),<TZ>,...` and carry `H:MM` times. The raw data API
//! returns `Year,DOY,<TZ>,...` with `HHMM` integer times. In both the
//! timezone abbreviation is the label of the time column. -9900 marks a
//! missing value.

use chrono::{FixedOffset, NaiveDate};
use std::path::Path;
use tracing::{debug, info};

use super::field_parsers::{
    at_minutes, clock_to_minutes, date_from_doy, hhmm_to_minutes, parse_number, read_source,
};
use super::schema::{FieldKind, FieldSpec, RowAccumulator};
use crate::app::models::{Dataset, Metadata};
use crate::constants::{sentinels, timezone_offset_hours, variables};
use crate::{Error, Result};

const MIDC: &str = "MIDC";

/// Options for the MIDC readers
#[derive(Debug, Clone, PartialEq)]
pub struct MidcOptions {
    /// Rename fields to the crate's naming convention
    pub map_variables: bool,
    /// Extra `(field prefix, new name)` pairs, tried before the built-in ones
    pub variable_map: Vec<(String, String)>,
}

impl Default for MidcOptions {
    fn default() -> Self {
        Self {
            map_variables: true,
            variable_map: Vec::new(),
        }
    }
}

impl MidcOptions {
    pub fn with_variable(mut self, prefix: impl Into<String>, name: impl Into<String>) -> Self {
        self.variable_map.push((prefix.into(), name.into()));
        self
    }
}

/// Rename a MIDC field such as `Global PSP [W/m^2]` to `ghi_PSP`.
///
/// The first prefix that matches wins; the instrument name between the
/// prefix and the unit bracket becomes a suffix.
pub fn map_midc_field(field: &str, options: &MidcOptions) -> String {
    let user = options
        .variable_map
        .iter()
        .map(|(from, to)| (from.as_str(), to.as_str()));
    let builtin = variables::MIDC.iter().copied();

    for (prefix, name) in user.chain(builtin) {
        if let Some(rest) = field.strip_prefix(prefix) {
            let instrument = match rest.find('[') {
                Some(idx) => rest[..idx].trim_end(),
                None => rest.trim_end(),
            };
            return format!("{}{}", name, instrument.replace(' ', "_"));
        }
    }
    field.to_string()
}

/// Read a MIDC web-page download
pub fn read_midc(path: impl AsRef<Path>, options: &MidcOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let content = read_source(path)?;
    let dataset = parse_midc(&content, options)?;
    info!("Read {} MIDC rows from {}", dataset.data.len(), path.display());
    Ok(dataset)
}

/// Read a file saved from the MIDC raw data API
pub fn read_midc_raw(path: impl AsRef<Path>, options: &MidcOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let content = read_source(path)?;
    let dataset = parse_midc_raw(&content, options)?;
    info!(
        "Read {} raw MIDC rows from {}",
        dataset.data.len(),
        path.display()
    );
    Ok(dataset)
}

/// Decode `DATE (MM/DD/YYYY),<TZ>,...` content
pub fn parse_midc(content: &str, options: &MidcOptions) -> Result<Dataset> {
    parse_layout(content, options, Layout::Dated)
}

/// Decode `Year,DOY,<TZ>,...` content
pub fn parse_midc_raw(content: &str, options: &MidcOptions) -> Result<Dataset> {
    parse_layout(content, options, Layout::Raw)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Layout {
    Dated,
    Raw,
}

impl Layout {
    /// Number of leading date/time columns
    fn time_columns(self) -> usize {
        match self {
            Layout::Dated => 2,
            Layout::Raw => 3,
        }
    }
}

fn parse_layout(content: &str, options: &MidcOptions, layout: Layout) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::format_at(MIDC, 1, e.to_string()))?
        .clone();
    let lead = layout.time_columns();
    validate_header(&headers, layout)?;

    let tz_label = &headers[lead - 1];
    let hours = timezone_offset_hours(tz_label).ok_or_else(|| {
        Error::format_at(MIDC, 1, format!("unknown timezone '{}'", tz_label))
    })?;
    let offset = FixedOffset::east_opt(hours * 3600)
        .ok_or_else(|| Error::format_at(MIDC, 1, "invalid UTC offset"))?;

    let specs = headers
        .iter()
        .skip(lead)
        .map(|field| {
            let name = if options.map_variables {
                map_midc_field(field, options)
            } else {
                field.to_string()
            };
            FieldSpec::named(name, FieldKind::Float).with_sentinels(sentinels::MIDC)
        })
        .collect();
    debug!("MIDC header with timezone {} ({} h)", tz_label, hours);
    let mut acc = RowAccumulator::new(MIDC, specs);

    for record in reader.records() {
        let record = record.map_err(|e| {
            let line = e.position().map(|p| p.line() as usize).unwrap_or_default();
            Error::format_at(MIDC, line, e.to_string())
        })?;
        let line_no = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or_default();
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() != headers.len() {
            return Err(Error::format_at(
                MIDC,
                line_no,
                format!("expected {} fields, found {}", headers.len(), record.len()),
            ));
        }

        let timestamp = match layout {
            Layout::Dated => {
                let date = NaiveDate::parse_from_str(&record[0], "%m/%d/%Y").map_err(|_| {
                    Error::format_at(MIDC, line_no, format!("invalid date '{}'", &record[0]))
                })?;
                at_minutes(date, clock_to_minutes(MIDC, line_no, &record[1])?)
            }
            Layout::Raw => {
                let year: i32 = parse_number(MIDC, line_no, "Year", &record[0])?;
                let doy: u32 = parse_number(MIDC, line_no, "DOY", &record[1])?;
                let hhmm: i64 = parse_number(MIDC, line_no, "time", &record[2])?;
                at_minutes(date_from_doy(MIDC, line_no, year, doy)?, hhmm_to_minutes(hhmm))
            }
        };
        let values: Vec<&str> = record.iter().skip(lead).collect();
        acc.push_row(line_no, timestamp, &values)?;
    }

    let data = acc.finish(Some(offset))?;
    data.ensure_strictly_increasing(MIDC)?;

    let mut metadata = Metadata::new();
    metadata.insert("tz", tz_label);
    metadata.insert("utc_offset", hours as f64);
    Ok(Dataset::new(data, metadata))
}

fn validate_header(headers: &csv::StringRecord, layout: Layout) -> Result<()> {
    let ok = match layout {
        Layout::Dated => headers.len() >= 2 && headers[0].starts_with("DATE"),
        Layout::Raw => headers.len() >= 3 && &headers[0] == "Year" && &headers[1] == "DOY",
    };
    if ok {
        Ok(())
    } else {
        let expected = match layout {
            Layout::Dated => "DATE (MM/DD/YYYY),<TZ>,...",
            Layout::Raw => "Year,DOY,<TZ>,...",
        };
        Err(Error::format_at(
            MIDC,
            1,
            format!("expected header '{}'", expected),
        ))
    }
}
