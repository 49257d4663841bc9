//! NOAA SURFRAD daily file reader
//!
//! Line 1 is the station name, line 2 holds latitude, longitude, elevation
//! and the file version. Records are 48 whitespace-separated fields stamped
//! in UTC; -9999.9 marks a missing value.

use chrono::FixedOffset;
use std::path::Path;
use tracing::{debug, info};

use super::ReadOptions;
use super::field_parsers::{
    apply_variable_map, at_minutes, make_date, numbered_lines, parse_number, read_source,
};
use super::schema::{FieldKind, FieldSpec, RowAccumulator};
use crate::app::models::{Dataset, Metadata};
use crate::constants::{sentinels, variables};
use crate::{Error, Result};

const SURFRAD: &str = "SURFRAD";

/// Measured quantities, each followed by a QC flag column
const SURFRAD_MEASUREMENTS: &[&str] = &[
    "dw_solar",
    "uw_solar",
    "direct_n",
    "diffuse",
    "dw_ir",
    "dw_casetemp",
    "dw_dometemp",
    "uw_ir",
    "uw_casetemp",
    "uw_dometemp",
    "uvb",
    "par",
    "netsolar",
    "netir",
    "totalnet",
    "temp",
    "rh",
    "windspd",
    "winddir",
    "pressure",
];

fn surfrad_schema() -> Vec<FieldSpec> {
    let mut specs = vec![
        FieldSpec::int("year"),
        FieldSpec::int("jday"),
        FieldSpec::int("month"),
        FieldSpec::int("day"),
        FieldSpec::int("hour"),
        FieldSpec::int("minute"),
        FieldSpec::float("dt"),
        FieldSpec::float("zen").with_sentinels(sentinels::SURFRAD),
    ];
    for name in SURFRAD_MEASUREMENTS {
        specs.push(FieldSpec::float(name).with_sentinels(sentinels::SURFRAD));
        specs.push(FieldSpec::named(format!("{}_flag", name), FieldKind::Int));
    }
    specs
}

/// Read a SURFRAD file
pub fn read_surfrad(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let content = read_source(path)?;
    let dataset = parse_surfrad(&content, options)?;
    info!(
        "Read {} SURFRAD rows from {}",
        dataset.data.len(),
        path.display()
    );
    Ok(dataset)
}

/// Decode SURFRAD content
pub fn parse_surfrad(content: &str, options: &ReadOptions) -> Result<Dataset> {
    let mut lines = numbered_lines(content);
    let (_, name) = lines
        .next()
        .ok_or_else(|| Error::format(SURFRAD, "empty input"))?;
    let (line_no, station_line) = lines
        .next()
        .ok_or_else(|| Error::format(SURFRAD, "missing station line"))?;

    let tokens: Vec<&str> = station_line.split_whitespace().collect();
    if tokens.len() < 4 {
        return Err(Error::format_at(
            SURFRAD,
            line_no,
            format!(
                "expected latitude, longitude, elevation and version, found {} tokens",
                tokens.len()
            ),
        ));
    }
    let mut metadata = Metadata::new();
    metadata.insert("name", name.trim());
    metadata.insert(
        "latitude",
        parse_number::<f64>(SURFRAD, line_no, "latitude", tokens[0])?,
    );
    metadata.insert(
        "longitude",
        parse_number::<f64>(SURFRAD, line_no, "longitude", tokens[1])?,
    );
    metadata.insert(
        "elevation",
        parse_number::<f64>(SURFRAD, line_no, "elevation", tokens[2])?,
    );
    metadata.insert(
        "surfrad_version",
        parse_number::<i64>(SURFRAD, line_no, "version", tokens[tokens.len() - 1])?,
    );
    metadata.insert("tz", "UTC");
    debug!("SURFRAD header: {:?}", metadata);

    let mut acc = RowAccumulator::new(SURFRAD, surfrad_schema());
    for (line_no, line) in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        if fields.len() != acc.specs().len() {
            return Err(Error::format_at(
                SURFRAD,
                line_no,
                format!(
                    "expected {} fields, found {}",
                    acc.specs().len(),
                    fields.len()
                ),
            ));
        }
        let year: i32 = parse_number(SURFRAD, line_no, "year", fields[0])?;
        let month: u32 = parse_number(SURFRAD, line_no, "month", fields[2])?;
        let day: u32 = parse_number(SURFRAD, line_no, "day", fields[3])?;
        let hour: i64 = parse_number(SURFRAD, line_no, "hour", fields[4])?;
        let minute: i64 = parse_number(SURFRAD, line_no, "minute", fields[5])?;
        let timestamp = at_minutes(
            make_date(SURFRAD, line_no, year, month, day)?,
            hour * 60 + minute,
        );
        acc.push_row(line_no, timestamp, &fields)?;
    }

    let mut data = acc.finish(FixedOffset::east_opt(0))?;
    data.ensure_strictly_increasing(SURFRAD)?;
    apply_variable_map(&mut data, variables::SURFRAD, options.map_variables);
    Ok(Dataset::new(data, metadata))
}
