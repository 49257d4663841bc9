//! NSRDB Physical Solar Model v3 (PSM3) CSV reader
//!
//! Line 1 lists metadata names and line 2 their values. Line 3 holds the
//! column names of the data that follows. Timestamps are built from the
//! `Year`, `Month`, `Day`, `Hour` and `Minute` columns in the fixed offset
//! given by the `Time Zone` metadata.

use std::path::Path;
use tracing::{debug, info};

use super::ReadOptions;
use super::field_parsers::{apply_variable_map, at_minutes, make_date, parse_number, read_source};
use super::schema::{FieldKind, FieldSpec, RowAccumulator};
use crate::app::models::{Dataset, Metadata, offset_from_hours};
use crate::constants::variables;
use crate::{Error, Result};

const PSM3: &str = "PSM3";

const DATE_COLUMNS: &[&str] = &["Year", "Month", "Day", "Hour", "Minute"];
// Zones can be fractional, e.g. 5.5 for India
const FLOAT_METADATA: &[&str] = &["Latitude", "Longitude", "Time Zone", "Local Time Zone"];
const INT_METADATA: &[&str] = &["Elevation"];

/// Read a PSM3 file
pub fn read_psm3(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let content = read_source(path)?;
    let dataset = parse_psm3(&content, options)?;
    info!("Read {} PSM3 rows from {}", dataset.data.len(), path.display());
    Ok(dataset)
}

/// Decode PSM3 content
pub fn parse_psm3(content: &str, options: &ReadOptions) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut records = reader.records();

    let mut next_line = |what: &str, line: usize| -> Result<csv::StringRecord> {
        match records.next() {
            Some(Ok(record)) => Ok(record),
            Some(Err(e)) => Err(Error::format_at(PSM3, line, e.to_string())),
            None => Err(Error::format_at(PSM3, line, format!("missing {}", what))),
        }
    };
    let names = next_line("metadata names", 1)?;
    let values = next_line("metadata values", 2)?;
    let columns = next_line("column names", 3)?;

    let metadata = parse_metadata(&names, &values)?;
    let tz = metadata
        .get_f64("Time Zone")
        .ok_or_else(|| Error::format_at(PSM3, 2, "missing 'Time Zone'"))?;
    let offset = offset_from_hours(tz).map_err(|e| Error::format_at(PSM3, 2, e.to_string()))?;

    let mut date_positions = [0usize; 5];
    for (slot, wanted) in date_positions.iter_mut().zip(DATE_COLUMNS) {
        *slot = columns.iter().position(|c| c == *wanted).ok_or_else(|| {
            Error::format_at(PSM3, 3, format!("missing '{}' column", wanted))
        })?;
    }
    let specs = columns
        .iter()
        .map(|name| {
            let kind = if DATE_COLUMNS.contains(&name) {
                FieldKind::Int
            } else {
                FieldKind::Float
            };
            FieldSpec::named(name, kind)
        })
        .collect();
    let mut acc = RowAccumulator::new(PSM3, specs);

    let mut years = Vec::new();
    for (i, record) in records.enumerate() {
        let line_no = i + 4;
        let record = record.map_err(|e| Error::format_at(PSM3, line_no, e.to_string()))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() != columns.len() {
            return Err(Error::format_at(
                PSM3,
                line_no,
                format!("expected {} fields, found {}", columns.len(), record.len()),
            ));
        }
        let [y, mo, d, h, mi] = date_positions;
        let year: i32 = parse_number(PSM3, line_no, "Year", &record[y])?;
        let month: u32 = parse_number(PSM3, line_no, "Month", &record[mo])?;
        let day: u32 = parse_number(PSM3, line_no, "Day", &record[d])?;
        let hour: i64 = parse_number(PSM3, line_no, "Hour", &record[h])?;
        let minute: i64 = parse_number(PSM3, line_no, "Minute", &record[mi])?;
        let timestamp = at_minutes(make_date(PSM3, line_no, year, month, day)?, hour * 60 + minute);

        let fields: Vec<&str> = record.iter().collect();
        acc.push_row(line_no, timestamp, &fields)?;
        years.push(year);
    }

    let mut data = acc.finish(Some(offset))?;
    // Typical-year downloads mix source years and are not monotonic
    years.dedup();
    if years.len() <= 1 {
        data.ensure_strictly_increasing(PSM3)?;
    } else {
        debug!("PSM3 data spans {} source years, treating as typical year", years.len());
    }
    apply_variable_map(&mut data, variables::PSM3, options.map_variables);
    Ok(Dataset::new(data, metadata))
}

fn parse_metadata(names: &csv::StringRecord, values: &csv::StringRecord) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for (name, value) in names.iter().zip(values.iter()) {
        if name.is_empty() {
            continue;
        }
        if FLOAT_METADATA.contains(&name) {
            metadata.insert(name, parse_number::<f64>(PSM3, 2, name, value)?);
        } else if INT_METADATA.contains(&name) {
            let number: f64 = parse_number(PSM3, 2, name, value)?;
            metadata.insert(name, number.round() as i64);
        } else {
            metadata.insert(name, value);
        }
    }
    debug!("PSM3 header: {:?}", metadata);
    Ok(metadata)
}
