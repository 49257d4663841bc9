//! NREL NSRDB PSM3 downloads

use tracing::info;

use super::{Fetcher, json_message, validate_coordinates};
use crate::app::models::Dataset;
use crate::app::services::format_readers::{ReadOptions, parse_psm3};
use crate::constants::{PSM3_DEFAULT_ATTRIBUTES, PSM3_INTERVALS};
use crate::{Error, Result};

const SERVICE: &str = "PSM3";

/// Parameters of a PSM3 download
#[derive(Debug, Clone, PartialEq)]
pub struct Psm3Request {
    pub latitude: f64,
    pub longitude: f64,
    pub api_key: String,
    /// Registered email; NREL mails failures here
    pub email: String,
    /// A year such as `"2017"`, or a typical-year name such as `"tmy-2020"`
    pub names: String,
    /// Averaging interval in minutes
    pub interval: u32,
    pub attributes: Vec<String>,
    pub leap_day: bool,
    pub full_name: String,
    pub affiliation: String,
    pub reason: String,
    pub mailing_list: bool,
    /// Timestamps in UTC instead of local standard time
    pub utc: bool,
    pub map_variables: bool,
}

impl Psm3Request {
    pub fn new(
        latitude: f64,
        longitude: f64,
        api_key: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            api_key: api_key.into(),
            email: email.into(),
            names: "tmy".to_string(),
            interval: 60,
            attributes: PSM3_DEFAULT_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
            leap_day: false,
            full_name: "solar-iotools".to_string(),
            affiliation: "solar-iotools".to_string(),
            reason: "solar-iotools".to_string(),
            mailing_list: false,
            utc: false,
            map_variables: true,
        }
    }

    pub fn with_names(mut self, names: impl Into<String>) -> Self {
        self.names = names.into();
        self
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    fn is_typical_year(&self) -> bool {
        let names = self.names.to_ascii_lowercase();
        ["tmy", "tgy", "tdy"].iter().any(|p| names.starts_with(p))
    }

    fn validate(&self) -> Result<()> {
        validate_coordinates(self.latitude, self.longitude)?;
        if !PSM3_INTERVALS.contains(&self.interval) {
            return Err(Error::validation(format!(
                "PSM3 interval must be one of {:?} minutes, got {}",
                PSM3_INTERVALS, self.interval
            )));
        }
        if self.is_typical_year() && self.interval != 60 {
            return Err(Error::validation(
                "typical-year PSM3 data is only available at 60-minute interval",
            ));
        }
        if self.api_key.is_empty() {
            return Err(Error::validation("PSM3 requires an NREL API key"));
        }
        Ok(())
    }

    /// Query parameters in the order the service documents them
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("api_key", self.api_key.clone()),
            ("full_name", self.full_name.clone()),
            ("email", self.email.clone()),
            ("affiliation", self.affiliation.clone()),
            ("reason", self.reason.clone()),
            ("mailing_list", self.mailing_list.to_string()),
            (
                "wkt",
                format!("POINT({} {})", self.longitude, self.latitude),
            ),
            ("names", self.names.clone()),
            ("attributes", self.attributes.join(",")),
            ("leap_day", self.leap_day.to_string()),
            ("utc", self.utc.to_string()),
            ("interval", self.interval.to_string()),
        ]
    }
}

fn psm3_error(body: &str) -> Option<String> {
    json_message(body, "/errors")
}

impl Fetcher {
    /// Download PSM3 data and decode it with [`parse_psm3`]
    pub async fn get_psm3(&self, request: &Psm3Request) -> Result<Dataset> {
        request.validate()?;
        let endpoints = self.endpoints();
        let url = if request.is_typical_year() {
            &endpoints.psm3_tmy
        } else if request.interval < 30 {
            &endpoints.psm3_5min
        } else {
            &endpoints.psm3
        };

        let body = self
            .fetch_text(
                SERVICE,
                self.client().get(url).query(&request.query()),
                psm3_error,
            )
            .await?;
        let dataset = parse_psm3(
            &body,
            &ReadOptions {
                map_variables: request.map_variables,
                coerce_year: None,
            },
        )?;
        info!(
            "Fetched {} PSM3 rows for ({}, {})",
            dataset.data.len(),
            request.latitude,
            request.longitude
        );
        Ok(dataset)
    }
}
