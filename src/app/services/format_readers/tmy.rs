//! TMY2 and TMY3 typical meteorological year readers
//!
//! TMY3 files are CSV: one metadata line, one line of column names, then
//! 8760 hourly rows stamped at the end of each hour (01:00 to 24:00). TMY2
//! files are fixed width: one header line and 141-character records.
//!
//! Both formats compose months taken from different years, so timestamps are
//! only checked for monotonicity when `coerce_year` is set.

use chrono::{Datelike, Duration, NaiveDateTime};
use std::path::Path;
use tracing::{debug, info};

use super::ReadOptions;
use super::field_parsers::{
    apply_variable_map, at_minutes, clock_to_minutes, make_date, numbered_lines, parse_number,
    read_source, unquote, with_year,
};
use super::schema::{FieldKind, FieldSpec, FixedField, RowAccumulator};
use crate::app::models::{Dataset, Metadata, offset_from_hours};
use crate::constants::{sentinels, variables};
use crate::{Error, Result};

const TMY3: &str = "TMY3";
const TMY2: &str = "TMY2";

// =============================================================================
// TMY3
// =============================================================================

/// Read a TMY3 file
pub fn read_tmy3(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let content = read_source(path)?;
    let dataset = parse_tmy3(&content, options)?;
    info!(
        "Read {} TMY3 rows from {}",
        dataset.data.len(),
        path.display()
    );
    Ok(dataset)
}

/// Decode TMY3 content
pub fn parse_tmy3(content: &str, options: &ReadOptions) -> Result<Dataset> {
    let mut lines = numbered_lines(content);

    let (line_no, header) = lines
        .next()
        .ok_or_else(|| Error::format(TMY3, "empty input"))?;
    let metadata = parse_tmy3_header(line_no, header)?;
    let tz_hours = metadata
        .get_f64("TZ")
        .ok_or_else(|| Error::format_at(TMY3, line_no, "missing TZ"))?;
    let offset = offset_from_hours(tz_hours).map_err(|e| {
        Error::format_at(TMY3, line_no, e.to_string())
    })?;

    let (line_no, names_line) = lines
        .next()
        .ok_or_else(|| Error::format(TMY3, "missing column header line"))?;
    let names = split_csv(line_no, names_line)?;
    if names.len() < 3 {
        return Err(Error::format_at(
            TMY3,
            line_no,
            format!("expected date, time and data columns, found {} columns", names.len()),
        ));
    }
    let specs = names[2..]
        .iter()
        .map(|name| {
            let kind = if name.ends_with("source") {
                FieldKind::Text
            } else {
                FieldKind::Float
            };
            FieldSpec::named(name.as_str(), kind)
        })
        .collect();
    let mut acc = RowAccumulator::new(TMY3, specs);

    for (line_no, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_csv(line_no, line)?;
        if fields.len() != names.len() {
            return Err(Error::format_at(
                TMY3,
                line_no,
                format!("expected {} fields, found {}", names.len(), fields.len()),
            ));
        }
        let timestamp = tmy3_timestamp(line_no, &fields[0], &fields[1], options.coerce_year)?;
        acc.push_row(line_no, timestamp, &fields[2..])?;
    }

    let mut data = acc.finish(Some(offset))?;
    if options.coerce_year.is_some() {
        data.ensure_strictly_increasing(TMY3)?;
    }
    apply_variable_map(&mut data, variables::TMY3, options.map_variables);
    Ok(Dataset::new(data, metadata))
}

fn parse_tmy3_header(line_no: usize, header: &str) -> Result<Metadata> {
    let fields = split_csv(line_no, header)?;
    if fields.len() < 7 {
        return Err(Error::format_at(
            TMY3,
            line_no,
            format!(
                "expected USAF,Name,State,TZ,latitude,longitude,altitude, found {} fields",
                fields.len()
            ),
        ));
    }

    let mut metadata = Metadata::new();
    metadata.insert(
        "USAF",
        parse_number::<i64>(TMY3, line_no, "USAF", &fields[0])?,
    );
    metadata.insert("Name", unquote(&fields[1]));
    metadata.insert("State", unquote(&fields[2]));
    for (key, raw) in [
        ("TZ", &fields[3]),
        ("latitude", &fields[4]),
        ("longitude", &fields[5]),
        ("altitude", &fields[6]),
    ] {
        metadata.insert(key, parse_number::<f64>(TMY3, line_no, key, raw)?);
    }
    debug!("TMY3 header: {:?}", metadata);
    Ok(metadata)
}

/// Split one CSV line, honouring quotes
fn split_csv(line_no: usize, line: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    match reader.records().next() {
        Some(Ok(record)) => Ok(record.iter().map(str::to_string).collect()),
        Some(Err(e)) => Err(Error::format_at(TMY3, line_no, e.to_string())),
        None => Ok(Vec::new()),
    }
}

/// Interval-end timestamp from `MM/DD/YYYY` and `HH:MM` (01:00 to 24:00)
fn tmy3_timestamp(
    line_no: usize,
    date: &str,
    time: &str,
    coerce_year: Option<i32>,
) -> Result<NaiveDateTime> {
    let parts: Vec<&str> = date.trim().split('/').collect();
    if parts.len() != 3 {
        return Err(Error::format_at(
            TMY3,
            line_no,
            format!("expected MM/DD/YYYY date, found '{}'", date),
        ));
    }
    let month: u32 = parse_number(TMY3, line_no, "month", parts[0])?;
    let day: u32 = parse_number(TMY3, line_no, "day", parts[1])?;
    let file_year: i32 = parse_number(TMY3, line_no, "year", parts[2])?;
    let year = coerce_year.unwrap_or(file_year);

    let date = make_date(TMY3, line_no, year, month, day)?;
    let minutes = clock_to_minutes(TMY3, line_no, time)?;
    let mut timestamp = at_minutes(date, minutes);

    // Feb 28 24:00 in a leap year would land on a day the file never has
    if minutes == 24 * 60 && month == 2 && day == 28 && timestamp.day() == 29 {
        timestamp += Duration::days(1);
    }
    Ok(timestamp)
}

// =============================================================================
// TMY2
// =============================================================================

/// Value, source flag and uncertainty widths, in record order
const TMY2_ELEMENTS: &[(&str, usize)] = &[
    ("GHI", 4),
    ("DNI", 4),
    ("DHI", 4),
    ("GHillum", 4),
    ("DNillum", 4),
    ("DHillum", 4),
    ("Zenithlum", 4),
    ("TotCld", 2),
    ("OpqCld", 2),
    ("DryBulb", 4),
    ("DewPoint", 4),
    ("RHum", 3),
    ("Pressure", 4),
    ("Wdir", 3),
    ("Wspd", 3),
    ("Hvis", 4),
    ("CeilHgt", 5),
];

const TMY2_TRAILING: &[(&str, usize)] = &[
    ("Pwat", 3),
    ("AOD", 3),
    ("SnowDepth", 3),
    ("LastSnowfall", 2),
];

/// Length of a TMY2 record including its leading blank
pub const TMY2_RECORD_LEN: usize = 142;

/// Fixed-width layout of a TMY2 data record
fn tmy2_layout() -> Vec<FixedField> {
    fn element(specs: &mut Vec<(FieldSpec, usize)>, name: &str, width: usize) {
        specs.push((FieldSpec::named(name, FieldKind::Int), width));
        specs.push((FieldSpec::named(format!("{}Source", name), FieldKind::Text), 1));
        specs.push((FieldSpec::named(format!("{}Uncertainty", name), FieldKind::Int), 1));
    }

    let mut specs: Vec<(FieldSpec, usize)> = ["year", "month", "day", "hour"]
        .into_iter()
        .map(|name| (FieldSpec::int(name), 2))
        .collect();
    specs.push((FieldSpec::int("ETR"), 4));
    specs.push((FieldSpec::int("ETRN"), 4));
    for (name, width) in TMY2_ELEMENTS {
        element(&mut specs, name, *width);
    }
    specs.push((FieldSpec::text("PresentWeather"), 10));
    for (name, width) in TMY2_TRAILING {
        element(&mut specs, name, *width);
    }

    // Records start with a blank
    let mut pos = 1;
    specs
        .into_iter()
        .map(|(spec, width)| {
            let field = FixedField::new(spec, pos, width);
            pos += width;
            field
        })
        .collect()
}

/// Read a TMY2 file
pub fn read_tmy2(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let content = read_source(path)?;
    let dataset = parse_tmy2(&content, options)?;
    info!(
        "Read {} TMY2 rows from {}",
        dataset.data.len(),
        path.display()
    );
    Ok(dataset)
}

/// Decode TMY2 content
pub fn parse_tmy2(content: &str, options: &ReadOptions) -> Result<Dataset> {
    let mut lines = numbered_lines(content);
    let (line_no, header) = lines
        .next()
        .ok_or_else(|| Error::format(TMY2, "empty input"))?;
    let metadata = parse_tmy2_header(line_no, header)?;
    let offset = metadata
        .get_f64("TZ")
        .ok_or_else(|| Error::format_at(TMY2, line_no, "missing TZ"))
        .and_then(offset_from_hours)?;

    let layout = tmy2_layout();
    let specs = layout.iter().map(|f| f.spec.clone()).collect();
    let mut acc = RowAccumulator::new(TMY2, specs);

    for (line_no, record) in lines {
        if record.trim().is_empty() {
            continue;
        }
        if record.len() < TMY2_RECORD_LEN {
            return Err(Error::format_at(
                TMY2,
                line_no,
                format!(
                    "expected a {}-character record, found {} characters",
                    TMY2_RECORD_LEN,
                    record.len()
                ),
            ));
        }
        let mut tokens = super::schema::slice_fixed(TMY2, line_no, record, &layout)?;

        // A '?' source flag marks its value as missing
        for i in 1..layout.len() {
            if layout[i].spec.name.ends_with("Source")
                && tokens[i].trim() == sentinels::TMY2_MISSING_SOURCE
            {
                tokens[i - 1] = "";
            }
        }

        let timestamp = tmy2_timestamp(line_no, &tokens, options.coerce_year)?;
        acc.push_row(line_no, timestamp, &tokens)?;
    }

    let data = acc.finish(Some(offset))?;
    if options.coerce_year.is_some() {
        data.ensure_strictly_increasing(TMY2)?;
    }
    Ok(Dataset::new(data, metadata))
}

fn tmy2_timestamp(line_no: usize, tokens: &[&str], coerce_year: Option<i32>) -> Result<NaiveDateTime> {
    let year: i32 = parse_number(TMY2, line_no, "year", tokens[0])?;
    let month: u32 = parse_number(TMY2, line_no, "month", tokens[1])?;
    let day: u32 = parse_number(TMY2, line_no, "day", tokens[2])?;
    let hour: i64 = parse_number(TMY2, line_no, "hour", tokens[3])?;
    if !(1..=24).contains(&hour) {
        return Err(Error::format_at(
            TMY2,
            line_no,
            format!("hour {} outside 1..24", hour),
        ));
    }
    let date = make_date(TMY2, line_no, 1900 + year, month, day)?;
    let timestamp = at_minutes(date, (hour - 1) * 60);
    Ok(match coerce_year {
        Some(y) => with_year(timestamp, y),
        None => timestamp,
    })
}

/// Parse `WBAN City State TZ N dd mm W ddd mm elev`
fn parse_tmy2_header(line_no: usize, header: &str) -> Result<Metadata> {
    let tokens: Vec<&str> = header.split_whitespace().collect();
    if tokens.len() < 11 {
        return Err(Error::format_at(
            TMY2,
            line_no,
            format!("expected at least 11 header tokens, found {}", tokens.len()),
        ));
    }
    let n = tokens.len();
    let tail = &tokens[n - 9..];
    let city = tokens[1..n - 9].join(" ");

    let degrees = |hemisphere: &str, deg: &str, min: &str, negative: &str| -> Result<f64> {
        let d: f64 = parse_number(TMY2, line_no, "degrees", deg)?;
        let m: f64 = parse_number(TMY2, line_no, "minutes", min)?;
        let value = d + m / 60.0;
        Ok(if hemisphere.eq_ignore_ascii_case(negative) {
            -value
        } else {
            value
        })
    };

    let mut metadata = Metadata::new();
    metadata.insert("WBAN", parse_number::<i64>(TMY2, line_no, "WBAN", tokens[0])?);
    metadata.insert("City", city);
    metadata.insert("State", tail[0]);
    metadata.insert("TZ", parse_number::<f64>(TMY2, line_no, "TZ", tail[1])?);
    metadata.insert("latitude", degrees(tail[2], tail[3], tail[4], "S")?);
    metadata.insert("longitude", degrees(tail[5], tail[6], tail[7], "W")?);
    metadata.insert(
        "altitude",
        parse_number::<f64>(TMY2, line_no, "altitude", tail[8])?,
    );
    debug!("TMY2 header: {:?}", metadata);
    Ok(metadata)
}
