//! CAMS radiation service and McClear clear-sky irradiation (SoDa WPS)
//!
//! The service answers rejected requests with an XML exception report,
//! sometimes under HTTP 200, so the body is checked before decoding.

use chrono::NaiveDate;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::info;

use super::{Fetcher, validate_coordinates};
use crate::app::models::Dataset;
use crate::app::services::format_readers::{CamsOptions, PeriodLabel, TimeReference, parse_cams};
use crate::{Error, Result};

const SERVICE: &str = "CAMS";

/// Altitude placeholder asking the service to use its terrain model
const ALTITUDE_FROM_SERVICE: f64 = -999.0;

/// Which CAMS product to request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CamsIdentifier {
    /// Clear-sky irradiation only
    Mcclear,
    /// All-sky and clear-sky irradiation
    CamsRadiation,
}

impl CamsIdentifier {
    fn wps_identifier(&self) -> &'static str {
        match self {
            CamsIdentifier::Mcclear => "get_mcclear",
            CamsIdentifier::CamsRadiation => "get_cams_radiation",
        }
    }
}

impl FromStr for CamsIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mcclear" => Ok(CamsIdentifier::Mcclear),
            "cams_radiation" | "cams-radiation" => Ok(CamsIdentifier::CamsRadiation),
            other => Err(Error::validation(format!(
                "unknown CAMS identifier '{}', expected mcclear or cams_radiation",
                other
            ))),
        }
    }
}

/// Summarization period of a CAMS request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CamsTimeStep {
    Minute,
    FifteenMinutes,
    Hour,
    Day,
    Month,
}

impl CamsTimeStep {
    /// ISO 8601 duration the service expects
    pub fn as_iso(&self) -> &'static str {
        match self {
            CamsTimeStep::Minute => "PT01M",
            CamsTimeStep::FifteenMinutes => "PT15M",
            CamsTimeStep::Hour => "PT01H",
            CamsTimeStep::Day => "P01D",
            CamsTimeStep::Month => "P01M",
        }
    }
}

impl FromStr for CamsTimeStep {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1min" => Ok(CamsTimeStep::Minute),
            "15min" => Ok(CamsTimeStep::FifteenMinutes),
            "1h" => Ok(CamsTimeStep::Hour),
            "1d" => Ok(CamsTimeStep::Day),
            "1M" => Ok(CamsTimeStep::Month),
            other => Err(Error::validation(format!(
                "unknown CAMS time step '{}', expected 1min, 15min, 1h, 1d or 1M",
                other
            ))),
        }
    }
}

impl fmt::Display for CamsTimeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_iso())
    }
}

/// Parameters of a CAMS request
#[derive(Debug, Clone, PartialEq)]
pub struct CamsRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Email registered with SoDa, used as the user name
    pub email: String,
    pub identifier: CamsIdentifier,
    /// Site altitude in metres; the service's terrain model when `None`
    pub altitude: Option<f64>,
    pub time_step: CamsTimeStep,
    pub time_ref: TimeReference,
    pub verbose: bool,
    pub integrated: bool,
    pub label: PeriodLabel,
    pub map_variables: bool,
}

impl CamsRequest {
    pub fn new(
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
        email: impl Into<String>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            start,
            end,
            email: email.into(),
            identifier: CamsIdentifier::Mcclear,
            altitude: None,
            time_step: CamsTimeStep::Hour,
            time_ref: TimeReference::Utc,
            verbose: false,
            integrated: false,
            label: PeriodLabel::Left,
            map_variables: true,
        }
    }

    fn validate(&self) -> Result<()> {
        validate_coordinates(self.latitude, self.longitude)?;
        if self.end < self.start {
            return Err(Error::validation(format!(
                "end date {} is before start date {}",
                self.end, self.start
            )));
        }
        if self.email.is_empty() {
            return Err(Error::validation("CAMS requires a registered email"));
        }
        if self.verbose && self.time_step != CamsTimeStep::Minute {
            return Err(Error::validation(
                "verbose CAMS output is only available at 1-minute time step",
            ));
        }
        Ok(())
    }

    /// `;`-separated `DataInputs` value; the `@` of the email is sent
    /// double-encoded as the service requires
    pub fn data_inputs(&self) -> String {
        let altitude = self.altitude.unwrap_or(ALTITUDE_FROM_SERVICE);
        [
            format!("latitude={}", self.latitude),
            format!("longitude={}", self.longitude),
            format!("altitude={}", altitude),
            format!("date_begin={}", self.start.format("%Y-%m-%d")),
            format!("date_end={}", self.end.format("%Y-%m-%d")),
            format!("time_ref={}", self.time_ref.as_str()),
            format!("summarization={}", self.time_step.as_iso()),
            format!("username={}", self.email.replace('@', "%2540")),
            format!("verbose={}", self.verbose),
        ]
        .join(";")
    }
}

static EXCEPTION_TEXT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<ows:ExceptionText>(.*?)</ows:ExceptionText>").ok());

/// Text of the first `ows:ExceptionText` element
fn exception_text(body: &str) -> Option<String> {
    EXCEPTION_TEXT
        .as_ref()?
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

impl Fetcher {
    /// Request CAMS irradiation and decode it with [`parse_cams`]
    pub async fn get_cams(&self, request: &CamsRequest) -> Result<Dataset> {
        request.validate()?;
        let url = format!(
            "{}?DataInputs={}",
            self.endpoints().cams,
            request.data_inputs()
        );
        let params = [
            ("Service", "WPS"),
            ("Request", "Execute"),
            ("Identifier", request.identifier.wps_identifier()),
            ("version", "1.0.0"),
            ("RawDataOutput", "irradiation"),
        ];
        let body = self
            .fetch_text(SERVICE, self.client().get(url).query(&params), exception_text)
            .await?;
        if let Some(message) = exception_text(&body) {
            return Err(Error::service(SERVICE, None, message));
        }

        let dataset = parse_cams(
            &body,
            &CamsOptions {
                integrated: request.integrated,
                label: request.label,
                map_variables: request.map_variables,
            },
        )?;
        info!(
            "Fetched {} CAMS rows for ({}, {})",
            dataset.data.len(),
            request.latitude,
            request.longitude
        );
        Ok(dataset)
    }
}
