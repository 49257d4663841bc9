//! Baseline Surface Radiation Network (BSRN) station-to-archive reader
//!
//! A file is a sequence of logical records, each introduced by a marker line
//! such as `*C0100` or `*U0100`. LR0001 gives station, month and year, LR0004
//! the station description and coordinates. The basic measurements live in
//! LR0100 (two lines per minute) and the upward/net radiation in LR0300.

use chrono::{FixedOffset, NaiveDateTime};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use super::field_parsers::{at_minutes, make_date, parse_number, read_source};
use super::schema::{FieldSpec, RowAccumulator};
use crate::app::models::{Dataset, MetaValue, Metadata, TimeSeries};
use crate::constants::sentinels;
use crate::{Error, Result};

const BSRN: &str = "BSRN";

/// Logical records the reader can decode
pub const SUPPORTED_LOGICAL_RECORDS: &[&str] = &["0100", "0300"];

/// Options for the BSRN reader
#[derive(Debug, Clone, PartialEq)]
pub struct BsrnOptions {
    /// Logical record numbers to extract, e.g. `["0100", "0300"]`
    pub logical_records: Vec<String>,
}

impl Default for BsrnOptions {
    fn default() -> Self {
        Self {
            logical_records: vec!["0100".to_string()],
        }
    }
}

impl BsrnOptions {
    pub fn validate(&self) -> Result<()> {
        for record in &self.logical_records {
            if !SUPPORTED_LOGICAL_RECORDS.contains(&record.as_str()) {
                return Err(Error::validation(format!(
                    "unsupported BSRN logical record '{}', expected one of {:?}",
                    record, SUPPORTED_LOGICAL_RECORDS
                )));
            }
        }
        Ok(())
    }
}

const LR0100_LINE1: &[&str] = &[
    "ghi", "ghi_std", "ghi_min", "ghi_max", "dni", "dni_std", "dni_min", "dni_max",
];

const LR0100_LINE2: &[&str] = &[
    "dhi",
    "dhi_std",
    "dhi_min",
    "dhi_max",
    "lwd",
    "lwd_std",
    "lwd_min",
    "lwd_max",
    "temp_air",
    "relative_humidity",
    "pressure",
];

const LR0300_COLUMNS: &[&str] = &[
    "gri",
    "gri_std",
    "gri_min",
    "gri_max",
    "lwu",
    "lwu_std",
    "lwu_min",
    "lwu_max",
    "net_radiation",
    "net_radiation_std",
    "net_radiation_min",
    "net_radiation_max",
];

fn value_specs(names: &[&'static str]) -> Vec<FieldSpec> {
    names
        .iter()
        .map(|name| FieldSpec::float(name).with_sentinels(sentinels::BSRN))
        .collect()
}

/// Read a BSRN file, gunzipping `.gz` files
pub fn read_bsrn(path: impl AsRef<Path>, options: &BsrnOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let content = if path.extension().is_some_and(|ext| ext == "gz") {
        let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        gunzip(&bytes).map_err(|e| Error::io(path, e))?
    } else {
        read_source(path)?
    };
    let dataset = parse_bsrn(&content, options)?;
    info!("Read {} BSRN rows from {}", dataset.data.len(), path.display());
    Ok(dataset)
}

/// Decompress a gzip archive into text
pub fn gunzip(bytes: &[u8]) -> std::io::Result<String> {
    let mut text = String::new();
    GzDecoder::new(bytes).read_to_string(&mut text)?;
    Ok(text)
}

/// One logical record: its number and body lines with 1-based line numbers
struct LogicalRecord<'a> {
    number: String,
    lines: Vec<(usize, &'a str)>,
}

fn split_records(content: &str) -> Vec<LogicalRecord<'_>> {
    let mut records: Vec<LogicalRecord<'_>> = Vec::new();
    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if let Some(marker) = line.strip_prefix('*') {
            // *C0100 or *U0100
            let number: String = marker.chars().skip(1).take(4).collect();
            records.push(LogicalRecord {
                number,
                lines: Vec::new(),
            });
        } else if let Some(current) = records.last_mut() {
            current.lines.push((i + 1, line));
        }
    }
    records
}

/// Decode BSRN station-to-archive content
pub fn parse_bsrn(content: &str, options: &BsrnOptions) -> Result<Dataset> {
    options.validate()?;
    let records = split_records(content);

    let lr0001 = records
        .iter()
        .find(|r| r.number == "0001")
        .ok_or_else(|| Error::format(BSRN, "mandatory logical record 0001 not found"))?;
    let (line_no, date_line) = *lr0001
        .lines
        .first()
        .ok_or_else(|| Error::format(BSRN, "logical record 0001 is empty"))?;
    let tokens: Vec<&str> = date_line.split_whitespace().collect();
    if tokens.len() < 4 {
        return Err(Error::format_at(
            BSRN,
            line_no,
            format!(
                "expected station, month, year and version, found {} tokens",
                tokens.len()
            ),
        ));
    }
    let month: u32 = parse_number(BSRN, line_no, "month", tokens[1])?;
    let year: i32 = parse_number(BSRN, line_no, "year", tokens[2])?;

    let mut metadata = Metadata::new();
    metadata.insert("station_identification_number", MetaValue::infer(tokens[0]));
    metadata.insert("month", month as i64);
    metadata.insert("year", year as i64);
    metadata.insert(
        "version_of_data",
        parse_number::<i64>(BSRN, line_no, "version", tokens[3])?,
    );

    let lr0004 = records
        .iter()
        .find(|r| r.number == "0004")
        .ok_or_else(|| Error::format(BSRN, "mandatory logical record 0004 not found"))?;
    parse_station_description(lr0004, &mut metadata)?;

    let present: Vec<&str> = records.iter().map(|r| r.number.as_str()).collect();
    metadata.insert(
        "logical_records",
        serde_json::Value::from(present.clone()),
    );
    debug!("BSRN {}-{:02} with records {:?}", year, month, present);

    let mut data = TimeSeries::new(Vec::new(), FixedOffset::east_opt(0));
    for wanted in &options.logical_records {
        let Some(record) = records.iter().find(|r| &r.number == wanted) else {
            debug!("BSRN logical record {} not present", wanted);
            continue;
        };
        let series = match wanted.as_str() {
            "0100" => parse_lr0100(record, year, month)?,
            _ => parse_lr0300(record, year, month)?,
        };
        data.join_columns(series)?;
    }
    data.ensure_strictly_increasing(BSRN)?;
    Ok(Dataset::new(data, metadata))
}

/// LR0004: date changed, surface/topography, address, phone/fax,
/// TCP/IP/email, then latitude, longitude, altitude and SYNOP id
fn parse_station_description(record: &LogicalRecord<'_>, metadata: &mut Metadata) -> Result<()> {
    if record.lines.len() < 6 {
        return Err(Error::format(
            BSRN,
            format!(
                "logical record 0004 needs 6 lines, found {}",
                record.lines.len()
            ),
        ));
    }
    let (_, changed) = record.lines[0];
    metadata.insert("date_when_station_description_changed", changed.trim());

    let (line_no, surface) = record.lines[1];
    let tokens: Vec<&str> = surface.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(Error::format_at(
            BSRN,
            line_no,
            "expected surface and topography type",
        ));
    }
    metadata.insert(
        "surface_type",
        parse_number::<i64>(BSRN, line_no, "surface type", tokens[0])?,
    );
    metadata.insert(
        "topography_type",
        parse_number::<i64>(BSRN, line_no, "topography type", tokens[1])?,
    );
    metadata.insert("address", record.lines[2].1.trim());

    let (line_no, position) = record.lines[5];
    let tokens: Vec<&str> = position.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(Error::format_at(
            BSRN,
            line_no,
            "expected latitude, longitude and altitude",
        ));
    }
    // Latitude counts from the South Pole, longitude eastward from 180 W
    let lat: f64 = parse_number(BSRN, line_no, "latitude", tokens[0])?;
    let lon: f64 = parse_number(BSRN, line_no, "longitude", tokens[1])?;
    metadata.insert("latitude_degN", lat - 90.0);
    metadata.insert("longitude_degE", lon - 180.0);
    metadata.insert(
        "altitude",
        parse_number::<f64>(BSRN, line_no, "altitude", tokens[2])?,
    );
    if let Some(synop) = tokens.get(3) {
        metadata.insert("synop_station", *synop);
    }
    Ok(())
}

fn record_timestamp(
    line_no: usize,
    year: i32,
    month: u32,
    day: &str,
    minute: &str,
) -> Result<NaiveDateTime> {
    let day: u32 = parse_number(BSRN, line_no, "day", day)?;
    let minute: i64 = parse_number(BSRN, line_no, "minute", minute)?;
    if !(0..1440).contains(&minute) {
        return Err(Error::format_at(
            BSRN,
            line_no,
            format!("minute of day {} out of range", minute),
        ));
    }
    Ok(at_minutes(make_date(BSRN, line_no, year, month, day)?, minute))
}

fn parse_lr0100(record: &LogicalRecord<'_>, year: i32, month: u32) -> Result<TimeSeries> {
    let mut names = LR0100_LINE1.to_vec();
    names.extend_from_slice(LR0100_LINE2);
    let mut acc = RowAccumulator::new(BSRN, value_specs(&names));

    let lines: Vec<(usize, &str)> = record
        .lines
        .iter()
        .copied()
        .filter(|(_, l)| !l.trim().is_empty())
        .collect();
    if lines.len() % 2 != 0 {
        let (line_no, _) = lines[lines.len() - 1];
        return Err(Error::format_at(
            BSRN,
            line_no,
            "logical record 0100 ends with an incomplete two-line entry",
        ));
    }

    for pair in lines.chunks(2) {
        let (first_no, first) = pair[0];
        let (second_no, second) = pair[1];
        let head: Vec<&str> = first.split_whitespace().collect();
        let tail: Vec<&str> = second.split_whitespace().collect();
        if head.len() != LR0100_LINE1.len() + 2 {
            return Err(Error::format_at(
                BSRN,
                first_no,
                format!(
                    "expected {} fields, found {}",
                    LR0100_LINE1.len() + 2,
                    head.len()
                ),
            ));
        }
        if tail.len() != LR0100_LINE2.len() {
            return Err(Error::format_at(
                BSRN,
                second_no,
                format!(
                    "expected {} fields, found {}",
                    LR0100_LINE2.len(),
                    tail.len()
                ),
            ));
        }
        let timestamp = record_timestamp(first_no, year, month, head[0], head[1])?;
        let mut values: Vec<&str> = head[2..].to_vec();
        values.extend_from_slice(&tail);
        acc.push_row(first_no, timestamp, &values)?;
    }
    acc.finish(FixedOffset::east_opt(0))
}

fn parse_lr0300(record: &LogicalRecord<'_>, year: i32, month: u32) -> Result<TimeSeries> {
    let mut acc = RowAccumulator::new(BSRN, value_specs(LR0300_COLUMNS));
    for &(line_no, line) in &record.lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() != LR0300_COLUMNS.len() + 2 {
            return Err(Error::format_at(
                BSRN,
                line_no,
                format!(
                    "expected {} fields, found {}",
                    LR0300_COLUMNS.len() + 2,
                    tokens.len()
                ),
            ));
        }
        let timestamp = record_timestamp(line_no, year, month, tokens[0], tokens[1])?;
        acc.push_row(line_no, timestamp, &tokens[2..])?;
    }
    acc.finish(FixedOffset::east_opt(0))
}
