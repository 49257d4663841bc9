//! University of Oregon Solar Radiation Monitoring Laboratory (SRML) reader
//!
//! Tab-delimited monthly files. The header row holds the station code, the
//! year, then alternating element codes and flag columns. Each data row holds
//! day of year, `HHMM` interval end time, then value/flag pairs. A flag of 99
//! marks its value as missing. Times are Pacific Standard Time.

use chrono::FixedOffset;
use std::path::Path;
use tracing::{debug, info};

use super::ReadOptions;
use super::field_parsers::{
    at_minutes, date_from_doy, hhmm_to_minutes, numbered_lines, parse_number, read_source,
};
use super::schema::{FieldKind, FieldSpec, RowAccumulator};
use crate::app::models::{Dataset, Metadata};
use crate::constants::{lookup_variable, sentinels, variables};
use crate::{Error, Result};

const SRML: &str = "SRML";

/// Hours east of UTC of every SRML file
pub const SRML_UTC_OFFSET_HOURS: i32 = -8;

/// Read an SRML file
pub fn read_srml(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let content = read_source(path)?;
    let dataset = parse_srml(&content, options)?;
    info!("Read {} SRML rows from {}", dataset.data.len(), path.display());
    Ok(dataset)
}

/// Rename an element code such as `1001` to `ghi_1`.
///
/// Codes beginning with 7 (spectral) and unknown codes are kept as-is.
pub fn map_srml_column(code: &str) -> String {
    if code.starts_with('7') || code.len() < 3 || !code.is_char_boundary(3) {
        return code.to_string();
    }
    match lookup_variable(variables::SRML_ELEMENTS, &code[..3]) {
        Some(name) => format!("{}_{}", name, &code[3..]),
        None => code.to_string(),
    }
}

/// Decode SRML content
pub fn parse_srml(content: &str, options: &ReadOptions) -> Result<Dataset> {
    let mut lines = numbered_lines(content);
    let (line_no, header) = lines
        .next()
        .ok_or_else(|| Error::format(SRML, "empty input"))?;

    let header_fields: Vec<&str> = header.split('\t').map(str::trim).collect();
    if header_fields.len() < 4 || header_fields.len() % 2 != 0 {
        return Err(Error::format_at(
            SRML,
            line_no,
            format!(
                "expected station, year and value/flag column pairs, found {} tab-separated fields",
                header_fields.len()
            ),
        ));
    }
    let station = header_fields[0].to_string();
    let year: i32 = parse_number(SRML, line_no, "year", header_fields[1])?;

    let mut specs = Vec::new();
    for code in header_fields[2..].iter().step_by(2) {
        let name = if options.map_variables {
            map_srml_column(code)
        } else {
            (*code).to_string()
        };
        specs.push(FieldSpec::named(name.clone(), FieldKind::Float));
        specs.push(FieldSpec::named(
            format!("{}_flag", name),
            FieldKind::Int,
        ));
    }
    debug!("SRML station {} year {} with {} columns", station, year, specs.len());
    let mut acc = RowAccumulator::new(SRML, specs);

    let mut rows = Vec::new();
    for (line_no, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != header_fields.len() {
            return Err(Error::format_at(
                SRML,
                line_no,
                format!(
                    "expected {} fields, found {}",
                    header_fields.len(),
                    fields.len()
                ),
            ));
        }
        let doy: u32 = parse_number(SRML, line_no, "day of year", fields[0])?;
        let hhmm: i64 = parse_number(SRML, line_no, "time", fields[1])?;
        rows.push((line_no, doy, hhmm, fields));
    }

    // Interval length from the first two rows, e.g. 100 for hourly files
    let interval = match rows.as_slice() {
        [first, second, ..] if second.2 > first.2 => second.2 - first.2,
        _ => 1,
    };
    for (line_no, doy, hhmm, fields) in rows {
        // Interval end to interval start; 0200 - 15 gives 0185, meaning 0145
        let mut start = hhmm - interval;
        if interval != 100 && start % 100 > 60 {
            start -= 40;
        }
        let timestamp = at_minutes(date_from_doy(SRML, line_no, year, doy)?, hhmm_to_minutes(start));

        let mut values: Vec<&str> = fields[2..].to_vec();
        for pair in values.chunks_mut(2) {
            if pair[1].trim().parse::<i64>().ok() == Some(sentinels::SRML_MISSING_FLAG) {
                pair[0] = "";
            }
        }
        acc.push_row(line_no, timestamp, &values)?;
    }

    let offset = FixedOffset::east_opt(SRML_UTC_OFFSET_HOURS * 3600)
        .ok_or_else(|| Error::format(SRML, "invalid UTC offset"))?;
    let data = acc.finish(Some(offset))?;
    data.ensure_strictly_increasing(SRML)?;

    let mut metadata = Metadata::new();
    metadata.insert("station", station);
    metadata.insert("year", year as i64);
    metadata.insert("tz", "UTC-08:00");
    Ok(Dataset::new(data, metadata))
}
