//! EnergyPlus Weather (EPW) reader
//!
//! Eight header lines, the first being `LOCATION,...`, followed by 35
//! comma-separated fields per hourly record. Hours run 1 to 24 and are
//! labelled at the start of the interval. Column names already follow the
//! crate's naming convention, and the EnergyPlus "missing" codes map to
//! missing values.

use std::path::Path;
use tracing::{debug, info};

use super::ReadOptions;
use super::field_parsers::{
    at_minutes, make_date, numbered_lines, parse_number, read_source, with_year,
};
use super::schema::{FieldSpec, RowAccumulator};
use crate::app::models::{Dataset, Metadata, offset_from_hours};
use crate::{Error, Result};

const EPW: &str = "EPW";

/// Number of header lines before the first record
pub const EPW_HEADER_LINES: usize = 8;

/// Header keys of the LOCATION line, in order
const LOCATION_KEYS: &[&str] = &[
    "loc",
    "city",
    "state-prov",
    "country",
    "data_type",
    "WMO_code",
    "latitude",
    "longitude",
    "TZ",
    "altitude",
];

const LOCATION_NUMERIC: &[&str] = &["latitude", "longitude", "TZ", "altitude"];

/// Record layout with the EnergyPlus missing codes
fn epw_schema() -> Vec<FieldSpec> {
    vec![
        FieldSpec::int("year"),
        FieldSpec::int("month"),
        FieldSpec::int("day"),
        FieldSpec::int("hour"),
        FieldSpec::int("minute"),
        FieldSpec::text("data_source_unct"),
        FieldSpec::float("temp_air").with_sentinels(&[99.9]),
        FieldSpec::float("temp_dew").with_sentinels(&[99.9]),
        FieldSpec::float("relative_humidity").with_sentinels(&[999.0]),
        FieldSpec::float("atmospheric_pressure").with_sentinels(&[999999.0]),
        FieldSpec::float("etr").with_sentinels(&[9999.0]),
        FieldSpec::float("etrn").with_sentinels(&[9999.0]),
        FieldSpec::float("ghi_infrared").with_sentinels(&[9999.0]),
        FieldSpec::float("ghi").with_sentinels(&[9999.0]),
        FieldSpec::float("dni").with_sentinels(&[9999.0]),
        FieldSpec::float("dhi").with_sentinels(&[9999.0]),
        FieldSpec::float("global_hor_illum").with_sentinels(&[999999.0]),
        FieldSpec::float("direct_normal_illum").with_sentinels(&[999999.0]),
        FieldSpec::float("diffuse_horizontal_illum").with_sentinels(&[999999.0]),
        FieldSpec::float("zenith_luminance").with_sentinels(&[9999.0]),
        FieldSpec::float("wind_direction").with_sentinels(&[999.0]),
        FieldSpec::float("wind_speed").with_sentinels(&[999.0]),
        FieldSpec::float("total_sky_cover").with_sentinels(&[99.0]),
        FieldSpec::float("opaque_sky_cover").with_sentinels(&[99.0]),
        FieldSpec::float("visibility").with_sentinels(&[9999.0]),
        FieldSpec::float("ceiling_height").with_sentinels(&[99999.0]),
        FieldSpec::int("present_weather_observation"),
        FieldSpec::text("present_weather_codes"),
        FieldSpec::float("precipitable_water").with_sentinels(&[999.0]),
        FieldSpec::float("aerosol_optical_depth").with_sentinels(&[0.999]),
        FieldSpec::float("snow_depth").with_sentinels(&[999.0]),
        FieldSpec::float("days_since_last_snowfall").with_sentinels(&[99.0]),
        FieldSpec::float("albedo").with_sentinels(&[999.0]),
        FieldSpec::float("liquid_precipitation_depth").with_sentinels(&[999.0]),
        FieldSpec::float("liquid_precipitation_quantity").with_sentinels(&[99.0]),
    ]
}

/// Read an EPW file
pub fn read_epw(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let content = read_source(path)?;
    let dataset = parse_epw(&content, options)?;
    info!("Read {} EPW rows from {}", dataset.data.len(), path.display());
    Ok(dataset)
}

/// Decode EPW content
pub fn parse_epw(content: &str, options: &ReadOptions) -> Result<Dataset> {
    let mut lines = numbered_lines(content);

    let (line_no, location) = lines
        .next()
        .ok_or_else(|| Error::format(EPW, "empty input"))?;
    let metadata = parse_location(line_no, location)?;
    let offset = offset_from_hours(metadata.get_f64("TZ").unwrap_or_default())
        .map_err(|e| Error::format_at(EPW, line_no, e.to_string()))?;

    for _ in 1..EPW_HEADER_LINES {
        lines
            .next()
            .ok_or_else(|| Error::format(EPW, "truncated header"))?;
    }

    let mut acc = RowAccumulator::new(EPW, epw_schema());
    for (line_no, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != acc.specs().len() {
            return Err(Error::format_at(
                EPW,
                line_no,
                format!(
                    "expected {} fields, found {}",
                    acc.specs().len(),
                    fields.len()
                ),
            ));
        }
        let year: i32 = parse_number(EPW, line_no, "year", fields[0])?;
        let month: u32 = parse_number(EPW, line_no, "month", fields[1])?;
        let day: u32 = parse_number(EPW, line_no, "day", fields[2])?;
        let hour: i64 = parse_number(EPW, line_no, "hour", fields[3])?;
        if !(1..=24).contains(&hour) {
            return Err(Error::format_at(
                EPW,
                line_no,
                format!("hour {} outside 1..24", hour),
            ));
        }
        let mut timestamp = at_minutes(make_date(EPW, line_no, year, month, day)?, (hour - 1) * 60);
        if let Some(y) = options.coerce_year {
            timestamp = with_year(timestamp, y);
        }
        acc.push_row(line_no, timestamp, &fields)?;
    }

    let data = acc.finish(Some(offset))?;
    if options.coerce_year.is_some() {
        data.ensure_strictly_increasing(EPW)?;
    }
    Ok(Dataset::new(data, metadata))
}

fn parse_location(line_no: usize, line: &str) -> Result<Metadata> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.first() != Some(&"LOCATION") {
        return Err(Error::format_at(
            EPW,
            line_no,
            "first line must start with LOCATION",
        ));
    }
    if fields.len() < LOCATION_KEYS.len() {
        return Err(Error::format_at(
            EPW,
            line_no,
            format!(
                "expected {} LOCATION fields, found {}",
                LOCATION_KEYS.len(),
                fields.len()
            ),
        ));
    }

    let mut metadata = Metadata::new();
    for (key, raw) in LOCATION_KEYS.iter().zip(&fields) {
        if LOCATION_NUMERIC.contains(key) {
            metadata.insert(*key, parse_number::<f64>(EPW, line_no, key, raw)?);
        } else {
            metadata.insert(*key, *raw);
        }
    }
    debug!("EPW header: {:?}", metadata);
    Ok(metadata)
}
