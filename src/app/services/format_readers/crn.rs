//! US Climate Reference Network (CRN) subhourly reader
//!
//! Headerless files of 23 whitespace-separated fields. Timestamps come from
//! the UTC date and time columns and mark the end of each interval. Station
//! metadata is taken from the first record.

use chrono::{FixedOffset, NaiveDate};
use std::path::Path;
use tracing::info;

use super::ReadOptions;
use super::field_parsers::{
    apply_variable_map, at_minutes, hhmm_to_minutes, numbered_lines, parse_number, read_source,
};
use super::schema::{FieldSpec, RowAccumulator};
use crate::app::models::{Dataset, Metadata};
use crate::constants::{sentinels, variables};
use crate::{Error, Result};

const CRN: &str = "CRN";

fn crn_schema() -> Vec<FieldSpec> {
    let value = |name: &'static str| FieldSpec::float(name).with_sentinels(sentinels::CRN);
    vec![
        FieldSpec::int("WBANNO"),
        FieldSpec::int("UTC_DATE"),
        FieldSpec::int("UTC_TIME"),
        FieldSpec::int("LST_DATE"),
        FieldSpec::int("LST_TIME"),
        FieldSpec::text("CRX_VN"),
        FieldSpec::float("LONGITUDE"),
        FieldSpec::float("LATITUDE"),
        value("AIR_TEMPERATURE"),
        value("PRECIPITATION"),
        value("SOLAR_RADIATION"),
        FieldSpec::int("SR_FLAG"),
        value("SURFACE_TEMPERATURE"),
        FieldSpec::text("ST_TYPE"),
        FieldSpec::int("ST_FLAG"),
        value("RELATIVE_HUMIDITY"),
        FieldSpec::int("RH_FLAG"),
        value("SOIL_MOISTURE_5"),
        value("SOIL_TEMPERATURE_5"),
        value("WETNESS"),
        FieldSpec::int("WET_FLAG"),
        value("WIND_1_5"),
        FieldSpec::int("WIND_FLAG"),
    ]
}

/// Read a CRN file
pub fn read_crn(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let content = read_source(path)?;
    let dataset = parse_crn(&content, options)?;
    info!("Read {} CRN rows from {}", dataset.data.len(), path.display());
    Ok(dataset)
}

/// Decode CRN content
pub fn parse_crn(content: &str, options: &ReadOptions) -> Result<Dataset> {
    let mut acc = RowAccumulator::new(CRN, crn_schema());
    let mut metadata = Metadata::new();

    for (line_no, line) in numbered_lines(content) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != acc.specs().len() {
            return Err(Error::format_at(
                CRN,
                line_no,
                format!(
                    "expected {} fields, found {}",
                    acc.specs().len(),
                    fields.len()
                ),
            ));
        }
        let date = NaiveDate::parse_from_str(fields[1], "%Y%m%d").map_err(|_| {
            Error::format_at(CRN, line_no, format!("invalid UTC_DATE '{}'", fields[1]))
        })?;
        let hhmm: i64 = parse_number(CRN, line_no, "UTC_TIME", fields[2])?;
        let timestamp = at_minutes(date, hhmm_to_minutes(hhmm));

        if metadata.is_empty() {
            metadata.insert("WBANNO", parse_number::<i64>(CRN, line_no, "WBANNO", fields[0])?);
            metadata.insert(
                "longitude",
                parse_number::<f64>(CRN, line_no, "LONGITUDE", fields[6])?,
            );
            metadata.insert(
                "latitude",
                parse_number::<f64>(CRN, line_no, "LATITUDE", fields[7])?,
            );
        }
        acc.push_row(line_no, timestamp, &fields)?;
    }
    metadata.insert("tz", "UTC");

    let mut data = acc.finish(FixedOffset::east_opt(0))?;
    data.ensure_strictly_increasing(CRN)?;
    apply_variable_map(&mut data, variables::CRN, options.map_variables);
    Ok(Dataset::new(data, metadata))
}
