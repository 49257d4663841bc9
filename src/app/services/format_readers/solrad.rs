//! NOAA SOLRAD daily file reader
//!
//! Same layout family as SURFRAD with a shorter record: 22 fields covering
//! global, direct, diffuse and UVB irradiance.

use chrono::FixedOffset;
use std::path::Path;
use tracing::info;

use super::ReadOptions;
use super::field_parsers::{
    apply_variable_map, at_minutes, make_date, numbered_lines, parse_number, read_source,
};
use super::schema::{FieldSpec, RowAccumulator};
use crate::app::models::{Dataset, Metadata};
use crate::constants::{sentinels, variables};
use crate::{Error, Result};

const SOLRAD: &str = "SOLRAD";

fn solrad_schema() -> Vec<FieldSpec> {
    let value = |name: &'static str| FieldSpec::float(name).with_sentinels(sentinels::SOLRAD);
    vec![
        FieldSpec::int("year"),
        FieldSpec::int("jday"),
        FieldSpec::int("month"),
        FieldSpec::int("day"),
        FieldSpec::int("hour"),
        FieldSpec::int("min"),
        FieldSpec::float("dt"),
        value("zen"),
        value("dw_psp"),
        FieldSpec::int("qc_dwpsp"),
        value("direct"),
        FieldSpec::int("qc_direct"),
        value("diffuse"),
        FieldSpec::int("qc_diffuse"),
        value("uvb"),
        FieldSpec::int("qc_uvb"),
        value("uvb_temp"),
        FieldSpec::int("qc_uvb_temp"),
        value("std_dw_psp"),
        value("std_direct"),
        value("std_diffuse"),
        value("std_uvb"),
    ]
}

/// Read a SOLRAD file
pub fn read_solrad(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let content = read_source(path)?;
    let dataset = parse_solrad(&content, options)?;
    info!(
        "Read {} SOLRAD rows from {}",
        dataset.data.len(),
        path.display()
    );
    Ok(dataset)
}

/// Decode SOLRAD content
pub fn parse_solrad(content: &str, options: &ReadOptions) -> Result<Dataset> {
    let mut lines = numbered_lines(content);
    let (_, name) = lines
        .next()
        .ok_or_else(|| Error::format(SOLRAD, "empty input"))?;
    let (line_no, station_line) = lines
        .next()
        .ok_or_else(|| Error::format(SOLRAD, "missing station line"))?;

    let tokens: Vec<&str> = station_line.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(Error::format_at(
            SOLRAD,
            line_no,
            format!(
                "expected latitude, longitude and elevation, found {} tokens",
                tokens.len()
            ),
        ));
    }
    let mut metadata = Metadata::new();
    metadata.insert("name", name.trim());
    for (key, token) in ["latitude", "longitude", "elevation"].iter().zip(&tokens) {
        metadata.insert(*key, parse_number::<f64>(SOLRAD, line_no, key, token)?);
    }
    metadata.insert("tz", "UTC");

    let mut acc = RowAccumulator::new(SOLRAD, solrad_schema());
    for (line_no, line) in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != acc.specs().len() {
            return Err(Error::format_at(
                SOLRAD,
                line_no,
                format!(
                    "expected {} fields, found {}",
                    acc.specs().len(),
                    fields.len()
                ),
            ));
        }
        let year: i32 = parse_number(SOLRAD, line_no, "year", fields[0])?;
        let month: u32 = parse_number(SOLRAD, line_no, "month", fields[2])?;
        let day: u32 = parse_number(SOLRAD, line_no, "day", fields[3])?;
        let hour: i64 = parse_number(SOLRAD, line_no, "hour", fields[4])?;
        let minute: i64 = parse_number(SOLRAD, line_no, "minute", fields[5])?;
        let timestamp = at_minutes(
            make_date(SOLRAD, line_no, year, month, day)?,
            hour * 60 + minute,
        );
        acc.push_row(line_no, timestamp, &fields)?;
    }

    let mut data = acc.finish(FixedOffset::east_opt(0))?;
    data.ensure_strictly_increasing(SOLRAD)?;
    apply_variable_map(&mut data, variables::SOLRAD, options.map_variables);
    Ok(Dataset::new(data, metadata))
}
