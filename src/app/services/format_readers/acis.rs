//! Applied Climate Information System (ACIS) JSON decoders
//!
//! `GridData` and `StnData` both answer `{"meta": {...}, "data": [[date,
//! v1, v2, ...], ...]}` with one value per requested element. Gridded
//! values are numbers with -999 for missing; station values are strings
//! where `M` is missing and `T` a trace amount. `StnMeta` answers a list of
//! station records.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::schema::{FieldKind, FieldSpec, RowAccumulator};
use crate::app::models::{AcisStation, Dataset, MetaValue, Metadata, TimeSeries};
use crate::constants::variables;
use crate::{Error, Result};

const ACIS: &str = "ACIS";

const FEET_TO_METERS: f64 = 0.3048;

/// Missing value in gridded products
const GRID_MISSING: &[f64] = &[-999.0];

/// One requested ACIS element, serialised into the request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcisElement {
    pub name: &'static str,
    pub interval: &'static str,
    pub units: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<u32>,
}

impl AcisElement {
    pub const fn daily(name: &'static str, units: &'static str) -> Self {
        Self {
            name,
            interval: "dly",
            units,
            base: None,
        }
    }

    pub const fn degree_days(name: &'static str, base: u32) -> Self {
        Self {
            name,
            interval: "dly",
            units: "degreeC",
            base: Some(base),
        }
    }
}

/// Elements of the PRISM and NRCC gridded products
pub const GRID_ELEMENTS: &[AcisElement] = &[
    AcisElement::daily("pcpn", "mm"),
    AcisElement::daily("maxt", "degreeC"),
    AcisElement::daily("mint", "degreeC"),
    AcisElement::daily("avgt", "degreeC"),
    AcisElement::degree_days("cdd", 18),
    AcisElement::degree_days("hdd", 18),
    AcisElement::degree_days("gdd", 10),
];

/// Elements of the multi-sensor precipitation estimate
pub const MPE_ELEMENTS: &[AcisElement] = &[AcisElement::daily("pcpn", "mm")];

/// Elements requested for station observations
pub const STATION_ELEMENTS: &[AcisElement] = &[
    AcisElement::daily("maxt", "degreeC"),
    AcisElement::daily("mint", "degreeC"),
    AcisElement::daily("avgt", "degreeC"),
    AcisElement::daily("obst", "degreeC"),
    AcisElement::daily("pcpn", "mm"),
    AcisElement::daily("snow", "cm"),
    AcisElement::daily("snwd", "cm"),
    AcisElement::degree_days("cdd", 18),
    AcisElement::degree_days("hdd", 18),
    AcisElement::degree_days("gdd", 10),
];

fn parse_payload(body: &str) -> Result<Value> {
    let root: Value = serde_json::from_str(body)
        .map_err(|e| Error::format_at(ACIS, e.line(), format!("invalid JSON: {}", e)))?;
    if let Some(message) = root.get("error") {
        let message = message
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| message.to_string());
        return Err(Error::service(ACIS, None, message));
    }
    Ok(root)
}

fn parse_date(row: usize, value: Option<&Value>) -> Result<NaiveDateTime> {
    let raw = value
        .and_then(Value::as_str)
        .ok_or_else(|| Error::format(ACIS, format!("row {} lacks a date", row)))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
        .map_err(|_| Error::format(ACIS, format!("row {}: invalid date '{}'", row, raw)))
}

/// Decode `data` rows into one float column per element
fn parse_rows(
    root: &Value,
    elements: &[AcisElement],
    specs: Vec<FieldSpec>,
    token: impl Fn(&Value) -> String,
) -> Result<TimeSeries> {
    let rows = root
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::format(ACIS, "missing 'data'"))?;
    let mut acc = RowAccumulator::new(ACIS, specs);
    for (i, row) in rows.iter().enumerate() {
        let cells = row
            .as_array()
            .ok_or_else(|| Error::format(ACIS, format!("row {} is not an array", i + 1)))?;
        if cells.len() != elements.len() + 1 {
            return Err(Error::format(
                ACIS,
                format!(
                    "row {}: expected {} values, found {}",
                    i + 1,
                    elements.len() + 1,
                    cells.len()
                ),
            ));
        }
        let timestamp = parse_date(i + 1, cells.first())?;
        let values: Vec<String> = cells[1..].iter().map(&token).collect();
        acc.push_row(i + 1, timestamp, &values)?;
    }
    acc.finish(None)
}

/// Flatten `meta`, splitting `ll` and converting elevation from feet
fn parse_meta(root: &Value, map_variables: bool) -> Metadata {
    let mut metadata = Metadata::new();
    let Some(Value::Object(meta)) = root.get("meta") else {
        return metadata;
    };
    for (key, value) in meta {
        match key.as_str() {
            "ll" => {
                if let Some([lon, lat]) = value.as_array().map(Vec::as_slice) {
                    if let (Some(lon), Some(lat)) = (lon.as_f64(), lat.as_f64()) {
                        metadata.insert("lon", lon);
                        metadata.insert("lat", lat);
                    }
                }
            }
            "elev" => {
                if let Some(feet) = value.as_f64() {
                    metadata.insert("elev", feet * FEET_TO_METERS);
                }
            }
            _ => metadata.insert(key.as_str(), MetaValue::from_json(value)),
        }
    }
    if map_variables {
        let mut renamed = Metadata::new();
        for (key, value) in metadata.iter() {
            let key = match key.as_str() {
                "lat" => "latitude",
                "lon" => "longitude",
                "elev" => "altitude",
                other => other,
            };
            renamed.insert(key, value.clone());
        }
        metadata = renamed;
    }
    metadata
}

/// Decode a `GridData` response for the given elements
pub fn parse_acis_grid(
    body: &str,
    elements: &[AcisElement],
    map_variables: bool,
) -> Result<Dataset> {
    let root = parse_payload(body)?;
    let specs = elements
        .iter()
        .map(|e| FieldSpec::float(e.name).with_sentinels(GRID_MISSING))
        .collect();
    let mut data = parse_rows(&root, elements, specs, |v| match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })?;
    if map_variables {
        data.rename_with(variables::ACIS);
    }
    debug!("ACIS grid with {} days", data.len());
    Ok(Dataset::new(data, parse_meta(&root, map_variables)))
}

/// Decode a `StnData` response for the given elements.
///
/// `M` and `S` (part of a later accumulated total) become missing, `T`
/// becomes `trace_value`, and the `A` accumulation flag is dropped.
pub fn parse_acis_station_data(
    body: &str,
    elements: &[AcisElement],
    trace_value: f64,
    map_variables: bool,
) -> Result<Dataset> {
    let root = parse_payload(body)?;
    let specs = elements
        .iter()
        .map(|e| FieldSpec::named(e.name, FieldKind::Float))
        .collect();
    let trace = trace_value.to_string();
    let mut data = parse_rows(&root, elements, specs, |v| match v {
        Value::String(s) => match s.trim() {
            "M" | "S" => String::new(),
            "T" => trace.clone(),
            other => other.trim_end_matches('A').to_string(),
        },
        Value::Null => String::new(),
        other => other.to_string(),
    })?;
    if map_variables {
        data.rename_with(variables::ACIS);
    }
    debug!("ACIS station data with {} days", data.len());
    Ok(Dataset::new(data, parse_meta(&root, map_variables)))
}

/// Decode a `StnMeta` response into station records
pub fn parse_acis_stations(body: &str) -> Result<Vec<AcisStation>> {
    let root = parse_payload(body)?;
    let records = root
        .get("meta")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::format(ACIS, "missing 'meta' station list"))?;

    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let name = record
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::format(ACIS, format!("station {} lacks a name", i)))?;
            let (longitude, latitude) = match record.get("ll").and_then(Value::as_array) {
                Some(ll) if ll.len() == 2 => (ll[0].as_f64(), ll[1].as_f64()),
                _ => (None, None),
            };
            Ok(AcisStation {
                name: name.to_string(),
                sids: record
                    .get("sids")
                    .and_then(Value::as_array)
                    .map(|ids| {
                        ids.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                state: record.get("state").and_then(Value::as_str).map(str::to_string),
                latitude,
                longitude,
                elevation: record
                    .get("elev")
                    .and_then(Value::as_f64)
                    .map(|feet| feet * FEET_TO_METERS),
                uid: record.get("uid").and_then(Value::as_i64),
            })
        })
        .collect()
}
