//! SolarAnywhere weather data API
//!
//! Requests are asynchronous on the service side: `POST /WeatherData`
//! returns a request id, then `GET /WeatherDataResult/{id}` is polled until
//! the result is `Done`.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use super::{Fetcher, json_message, validate_coordinates};
use crate::app::models::Dataset;
use crate::app::services::format_readers::parse_solaranywhere_json;
use crate::constants::{
    SOLARANYWHERE_DEFAULT_VARIABLES, SOLARANYWHERE_MAX_RESPONSE_SECS, SOLARANYWHERE_POLL_SECS,
};
use crate::{Error, Result};

const SERVICE: &str = "SolarAnywhere";

/// Sources that are typical or probabilistic years and take no time range
const TYPICAL_SOURCE_MARKERS: &[&str] = &["TGY", "TDY", "TMY", "POE"];

fn solaranywhere_error(body: &str) -> Option<String> {
    json_message(body, "/Message")
}

/// Parameters of a SolarAnywhere request
#[derive(Debug, Clone, PartialEq)]
pub struct SolarAnywhereRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub api_key: String,
    /// Required unless `source` is a typical or probability-of-exceedance year
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    /// e.g. `SolarAnywhereLatest`, `SolarAnywhere3_6`, `SolarAnywhereTGY`
    pub source: String,
    pub time_resolution_minutes: u32,
    pub spatial_resolution_degrees: f64,
    pub true_dynamics: bool,
    pub probability_of_exceedance: Option<u32>,
    pub variables: Vec<String>,
    pub missing_data: String,
    pub map_variables: bool,
    pub poll_interval: Duration,
    pub max_response_time: Duration,
}

impl SolarAnywhereRequest {
    pub fn new(latitude: f64, longitude: f64, api_key: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            api_key: api_key.into(),
            start: None,
            end: None,
            source: "SolarAnywhereLatest".to_string(),
            time_resolution_minutes: 60,
            spatial_resolution_degrees: 0.01,
            true_dynamics: false,
            probability_of_exceedance: None,
            variables: SOLARANYWHERE_DEFAULT_VARIABLES
                .iter()
                .map(|v| v.to_string())
                .collect(),
            missing_data: "FillAverage".to_string(),
            map_variables: true,
            poll_interval: Duration::from_secs(SOLARANYWHERE_POLL_SECS),
            max_response_time: Duration::from_secs(SOLARANYWHERE_MAX_RESPONSE_SECS),
        }
    }

    pub fn with_range(mut self, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    fn is_typical_source(&self) -> bool {
        TYPICAL_SOURCE_MARKERS
            .iter()
            .any(|marker| self.source.contains(marker))
    }

    /// JSON body of the `WeatherData` request
    pub fn payload(&self) -> Result<Value> {
        validate_coordinates(self.latitude, self.longitude)?;
        if self.api_key.is_empty() {
            return Err(Error::validation("SolarAnywhere requires an API key"));
        }
        let mut options = json!({
            "OutputFields": self.variables,
            "SummaryOutputFields": [],
            "SpatialResolution_Degrees": self.spatial_resolution_degrees,
            "TimeResolution_Minutes": self.time_resolution_minutes,
            "WeatherDataSource": self.source,
            "MissingDataHandling": self.missing_data,
        });
        if self.true_dynamics {
            options["ApplyTrueDynamics"] = json!(true);
        }
        if let Some(poe) = self.probability_of_exceedance {
            options["ProbabilityOfExceedance"] = json!(poe);
        }
        if !self.is_typical_source() {
            let (Some(start), Some(end)) = (self.start, self.end) else {
                return Err(Error::validation(format!(
                    "start and end are required for source '{}'",
                    self.source
                )));
            };
            if end <= start {
                return Err(Error::validation(format!(
                    "end {} must be after start {}",
                    end, start
                )));
            }
            options["StartTime"] = json!(start.to_rfc3339_opts(SecondsFormat::Secs, false));
            options["EndTime"] = json!(end.to_rfc3339_opts(SecondsFormat::Secs, false));
        }
        Ok(json!({
            "Sites": [{"Latitude": self.latitude, "Longitude": self.longitude}],
            "Options": options,
        }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SubmitResponse {
    weather_request_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct PollResponse {
    status: Option<String>,
    status_code: Option<String>,
    message: Option<String>,
    weather_data_results: Vec<ResultStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ResultStatus {
    status: Option<String>,
    error_messages: Vec<ErrorMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ErrorMessage {
    message: String,
}

fn decode<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| Error::format_at(SERVICE, e.line(), format!("unexpected response: {}", e)))
}

impl Fetcher {
    /// Submit a request, poll until it completes and decode the result
    /// with [`parse_solaranywhere_json`]
    pub async fn get_solaranywhere(&self, request: &SolarAnywhereRequest) -> Result<Dataset> {
        let payload = request.payload()?;
        let base = self.endpoints().solaranywhere.trim_end_matches('/');

        let submit = self
            .client()
            .post(format!("{}/WeatherData", base))
            .header("X-Api-Key", &request.api_key)
            .header("Accept", "application/json")
            .json(&payload);
        let body = self.fetch_text(SERVICE, submit, solaranywhere_error).await?;
        let id = decode::<SubmitResponse>(&body)?.weather_request_id;
        debug!("SolarAnywhere accepted request {}", id);

        let started = Instant::now();
        let result_url = format!("{}/WeatherDataResult/{}", base, id);
        let body = loop {
            let poll = self
                .client()
                .get(&result_url)
                .header("X-Api-Key", &request.api_key)
                .header("Accept", "application/json");
            let body = self.fetch_text(SERVICE, poll, solaranywhere_error).await?;
            let status: PollResponse = decode(&body)?;

            if status.status.as_deref() == Some("Done") {
                if let Some(result) = status.weather_data_results.first() {
                    if result.status.as_deref() == Some("Failure") {
                        let message = result
                            .error_messages
                            .iter()
                            .map(|m| m.message.as_str())
                            .collect::<Vec<_>>()
                            .join("; ");
                        return Err(Error::service(SERVICE, None, message));
                    }
                }
                break body;
            }
            if status.status_code.as_deref() == Some("BadRequest") {
                return Err(Error::service(
                    SERVICE,
                    Some(400),
                    format!("bad request: {}", status.message.unwrap_or_default()),
                ));
            }
            if started.elapsed() > request.max_response_time {
                return Err(Error::service(
                    SERVICE,
                    None,
                    format!(
                        "request {} did not complete within {} s",
                        id,
                        request.max_response_time.as_secs()
                    ),
                ));
            }
            debug!("SolarAnywhere request {} is {:?}", id, status.status);
            sleep(request.poll_interval).await;
        };

        let dataset = parse_solaranywhere_json(&body, request.map_variables)?;
        info!(
            "Fetched {} SolarAnywhere rows for ({}, {})",
            dataset.data.len(),
            request.latitude,
            request.longitude
        );
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn time(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_payload_historical() {
        let request = SolarAnywhereRequest::new(40.0, -105.0, "KEY")
            .with_range(time("2020-01-01T00:00:00-07:00"), time("2020-01-02T00:00:00-07:00"));
        let payload = request.payload().unwrap();
        assert_eq!(payload["Sites"][0]["Latitude"], 40.0);
        assert_eq!(payload["Options"]["StartTime"], "2020-01-01T00:00:00-07:00");
        assert_eq!(payload["Options"]["MissingDataHandling"], "FillAverage");
        assert_eq!(
            payload["Options"]["OutputFields"].as_array().unwrap().len(),
            SOLARANYWHERE_DEFAULT_VARIABLES.len()
        );
        assert!(payload["Options"].get("ApplyTrueDynamics").is_none());
    }

    #[test]
    fn test_payload_requires_range() {
        let request = SolarAnywhereRequest::new(40.0, -105.0, "KEY");
        assert_eq!(request.payload().unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_payload_typical_year_without_range() {
        let mut request =
            SolarAnywhereRequest::new(40.0, -105.0, "KEY").with_source("SolarAnywherePOELatest");
        request.probability_of_exceedance = Some(90);
        let payload = request.payload().unwrap();
        assert_eq!(payload["Options"]["ProbabilityOfExceedance"], 90);
        assert!(payload["Options"].get("StartTime").is_none());
    }
}
