//! Clients for the remote solar and weather data services
//!
//! Every fetcher is `request → HTTP → body → parse_*`: the decoding is done
//! by the same pure functions the file readers use, so a fetched result
//! equals reading the saved response.
//!
//! One [`Fetcher`] owns a `reqwest::Client` (timeout and user agent from
//! [`NetworkConfig`]) and the [`Endpoints`] table; fetchers are async
//! methods on it, grouped per service in the submodules.
//!
//! ```rust,no_run
//! use solar_iotools::app::services::remote_fetchers::{Fetcher, PvgisTmyRequest};
//! use solar_iotools::config::Config;
//!
//! # async fn example() -> solar_iotools::Result<()> {
//! let fetcher = Fetcher::new(&Config::default())?;
//! let tmy = fetcher.get_pvgis_tmy(&PvgisTmyRequest::new(45.0, 8.0)).await?;
//! println!("{} hours", tmy.data.len());
//! # Ok(())
//! # }
//! ```

pub mod acis;
pub mod bsrn;
pub mod cams;
pub mod midc;
pub mod psm3;
pub mod pvgis;
pub mod solaranywhere;
pub mod srml;

pub use acis::{AcisGridProduct, AcisGridRequest, AcisStationRequest, AcisStationsRequest};
pub use bsrn::BsrnRequest;
pub use cams::{CamsIdentifier, CamsRequest, CamsTimeStep};
pub use midc::MidcRawRequest;
pub use psm3::Psm3Request;
pub use pvgis::{PvgisHourlyRequest, PvgisTmyRequest};
pub use solaranywhere::SolarAnywhereRequest;
pub use srml::SrmlRequest;

use chrono::{Datelike, NaiveDate};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::config::{Config, Endpoints, NetworkConfig};
use crate::{Error, Result};

/// HTTP client plus the base URLs of every service
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    endpoints: Endpoints,
}

impl Fetcher {
    /// Build from the network and endpoint sections of `config`
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_endpoints(&config.network, config.endpoints.clone())
    }

    pub fn with_endpoints(network: &NetworkConfig, endpoints: Endpoints) -> Result<Self> {
        let client = Client::builder()
            .timeout(network.timeout())
            .user_agent(network.user_agent.as_str())
            .build()
            .map_err(|e| Error::configuration(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client, endpoints })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Send a request and return status and body, failing on non-success
    /// with the service's own message when `error_message` finds one
    async fn execute(
        &self,
        service: &'static str,
        request: RequestBuilder,
        error_message: fn(&str) -> Option<String>,
    ) -> Result<Vec<u8>> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::network(service, e))?;
        let status = response.status();
        debug!("{} answered {} for {}", service, status, response.url());
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::network(service, e))?
            .to_vec();

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            let message = error_message(&text).unwrap_or_else(|| fallback_message(status, &text));
            return Err(Error::service(service, Some(status.as_u16()), message));
        }
        Ok(body)
    }

    pub(crate) async fn fetch_text(
        &self,
        service: &'static str,
        request: RequestBuilder,
        error_message: fn(&str) -> Option<String>,
    ) -> Result<String> {
        let body = self.execute(service, request, error_message).await?;
        Ok(match String::from_utf8(body) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }

    pub(crate) async fn fetch_bytes(
        &self,
        service: &'static str,
        request: RequestBuilder,
        error_message: fn(&str) -> Option<String>,
    ) -> Result<Vec<u8>> {
        self.execute(service, request, error_message).await
    }
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    let snippet: String = body.trim().chars().take(200).collect();
    if snippet.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        snippet
    }
}

/// No structured error payload
pub(crate) fn no_message(_: &str) -> Option<String> {
    None
}

/// String or list of strings at a JSON pointer
pub(crate) fn json_message(body: &str, pointer: &str) -> Option<String> {
    let root: Value = serde_json::from_str(body).ok()?;
    match root.pointer(pointer)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                .collect::<Vec<_>>()
                .join("; "),
        ),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// True for a service error carrying HTTP 404
pub(crate) fn is_not_found(error: &Error) -> bool {
    matches!(error, Error::Service { status: Some(404), .. })
}

/// Reject coordinates outside the valid ranges
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(Error::validation(format!(
            "latitude {} outside [-90, 90]",
            latitude
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::validation(format!(
            "longitude {} outside [-180, 180]",
            longitude
        )));
    }
    Ok(())
}

/// Calendar months touched by `start..=end`, as (year, month)
pub fn months_between(start: NaiveDate, end: NaiveDate) -> Result<Vec<(i32, u32)>> {
    if end < start {
        return Err(Error::validation(format!(
            "end date {} is before start date {}",
            end, start
        )));
    }
    let mut months = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    while (year, month) <= (end.year(), end.month()) {
        months.push((year, month));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    Ok(months)
}
