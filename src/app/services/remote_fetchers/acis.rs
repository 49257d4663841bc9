//! ACIS web services: gridded products, station data and station search
//!
//! All three are JSON `POST`s. Rejected requests usually come back as HTTP
//! 200 with an `error` member, which the decoders turn into a service error.

use chrono::NaiveDate;
use serde_json::{Value, json};
use std::str::FromStr;
use tracing::info;

use super::{Fetcher, json_message, validate_coordinates};
use crate::app::models::{AcisStation, Dataset};
use crate::app::services::format_readers::acis::{GRID_ELEMENTS, MPE_ELEMENTS, STATION_ELEMENTS};
use crate::app::services::format_readers::{
    AcisElement, parse_acis_grid, parse_acis_station_data, parse_acis_stations,
};
use crate::{Error, Result};

const SERVICE: &str = "ACIS";

/// Value substituted for trace precipitation in station data
pub const DEFAULT_TRACE_VALUE: f64 = 0.001;

fn acis_error(body: &str) -> Option<String> {
    json_message(body, "/error")
}

fn check_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if end < start {
        return Err(Error::validation(format!(
            "end date {} is before start date {}",
            end, start
        )));
    }
    Ok(())
}

/// Gridded daily products served by `GridData`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcisGridProduct {
    /// PRISM, 4 km, contiguous US
    Prism,
    /// NRCC interpolated, 5 km, contiguous US
    Nrcc,
    /// Multi-sensor precipitation estimate, 4 km
    Mpe,
}

impl AcisGridProduct {
    /// Grid identifier of the product
    pub fn grid_id(&self) -> &'static str {
        match self {
            AcisGridProduct::Prism => "21",
            AcisGridProduct::Nrcc => "3",
            AcisGridProduct::Mpe => "2",
        }
    }

    pub fn elements(&self) -> &'static [AcisElement] {
        match self {
            AcisGridProduct::Prism | AcisGridProduct::Nrcc => GRID_ELEMENTS,
            AcisGridProduct::Mpe => MPE_ELEMENTS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AcisGridProduct::Prism => "prism",
            AcisGridProduct::Nrcc => "nrcc",
            AcisGridProduct::Mpe => "mpe",
        }
    }
}

impl FromStr for AcisGridProduct {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "prism" => Ok(AcisGridProduct::Prism),
            "nrcc" => Ok(AcisGridProduct::Nrcc),
            "mpe" => Ok(AcisGridProduct::Mpe),
            other => Err(Error::validation(format!(
                "unknown ACIS grid '{}', expected prism, nrcc or mpe",
                other
            ))),
        }
    }
}

/// Daily values of one grid cell
#[derive(Debug, Clone, PartialEq)]
pub struct AcisGridRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub product: AcisGridProduct,
    pub map_variables: bool,
}

impl AcisGridRequest {
    pub fn new(
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
        product: AcisGridProduct,
    ) -> Self {
        Self {
            latitude,
            longitude,
            start,
            end,
            product,
            map_variables: true,
        }
    }

    pub fn body(&self) -> Result<Value> {
        validate_coordinates(self.latitude, self.longitude)?;
        check_range(self.start, self.end)?;
        Ok(json!({
            "loc": format!("{},{}", self.longitude, self.latitude),
            "sdate": self.start.format("%Y-%m-%d").to_string(),
            "edate": self.end.format("%Y-%m-%d").to_string(),
            "grid": self.product.grid_id(),
            "elems": self.product.elements(),
            "output": "json",
            "meta": "ll,elev",
        }))
    }
}

/// Daily observations of one station
#[derive(Debug, Clone, PartialEq)]
pub struct AcisStationRequest {
    /// Any identifier ACIS knows the station by (GHCN, COOP, WBAN, ...)
    pub station: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Substituted for `T` (trace) values
    pub trace_value: f64,
    pub map_variables: bool,
}

impl AcisStationRequest {
    pub fn new(station: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            station: station.into(),
            start,
            end,
            trace_value: DEFAULT_TRACE_VALUE,
            map_variables: true,
        }
    }

    pub fn body(&self) -> Result<Value> {
        if self.station.trim().is_empty() {
            return Err(Error::validation("ACIS station identifier must not be empty"));
        }
        check_range(self.start, self.end)?;
        Ok(json!({
            "sid": self.station,
            "sdate": self.start.format("%Y-%m-%d").to_string(),
            "edate": self.end.format("%Y-%m-%d").to_string(),
            "elems": STATION_ELEMENTS,
            "output": "json",
            "meta": "name,state,sids,ll,elev,uid,valid_daterange",
        }))
    }
}

/// Stations inside a bounding box with data in a date range
#[derive(Debug, Clone, PartialEq)]
pub struct AcisStationsRequest {
    pub latitude_range: (f64, f64),
    pub longitude_range: (f64, f64),
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl AcisStationsRequest {
    pub fn new(latitude_range: (f64, f64), longitude_range: (f64, f64)) -> Self {
        Self {
            latitude_range,
            longitude_range,
            start: None,
            end: None,
        }
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn body(&self) -> Result<Value> {
        let (lat_min, lat_max) = self.latitude_range;
        let (lon_min, lon_max) = self.longitude_range;
        validate_coordinates(lat_min, lon_min)?;
        validate_coordinates(lat_max, lon_max)?;
        if lat_max < lat_min || lon_max < lon_min {
            return Err(Error::validation(
                "bounding box minimum must not exceed its maximum",
            ));
        }
        let mut body = json!({
            "bbox": format!("{},{},{},{}", lon_min, lat_min, lon_max, lat_max),
            "meta": "name,sids,ll,elev,uid,state",
            "elems": "maxt,mint,pcpn",
            "output": "json",
        });
        if let (Some(start), Some(end)) = (self.start, self.end) {
            check_range(start, end)?;
            body["sdate"] = json!(start.format("%Y-%m-%d").to_string());
            body["edate"] = json!(end.format("%Y-%m-%d").to_string());
        }
        Ok(body)
    }
}

impl Fetcher {
    async fn acis_post(&self, endpoint: &str, body: &Value) -> Result<String> {
        let url = format!("{}{}", self.endpoints().acis, endpoint);
        self.fetch_text(SERVICE, self.client().post(url).json(body), acis_error)
            .await
    }

    /// Daily values of a gridded product at one location
    pub async fn get_acis_grid(&self, request: &AcisGridRequest) -> Result<Dataset> {
        let body = self.acis_post("GridData", &request.body()?).await?;
        let dataset = parse_acis_grid(&body, request.product.elements(), request.map_variables)?;
        info!(
            "Fetched {} days of ACIS {} data for ({}, {})",
            dataset.data.len(),
            request.product.name(),
            request.latitude,
            request.longitude
        );
        Ok(dataset)
    }

    /// PRISM daily temperature, precipitation and degree days
    pub async fn get_acis_prism(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
        map_variables: bool,
    ) -> Result<Dataset> {
        let mut request =
            AcisGridRequest::new(latitude, longitude, start, end, AcisGridProduct::Prism);
        request.map_variables = map_variables;
        self.get_acis_grid(&request).await
    }

    /// NRCC interpolated daily temperature, precipitation and degree days
    pub async fn get_acis_nrcc(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
        map_variables: bool,
    ) -> Result<Dataset> {
        let mut request =
            AcisGridRequest::new(latitude, longitude, start, end, AcisGridProduct::Nrcc);
        request.map_variables = map_variables;
        self.get_acis_grid(&request).await
    }

    /// Multi-sensor daily precipitation estimate
    pub async fn get_acis_mpe(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
        map_variables: bool,
    ) -> Result<Dataset> {
        let mut request =
            AcisGridRequest::new(latitude, longitude, start, end, AcisGridProduct::Mpe);
        request.map_variables = map_variables;
        self.get_acis_grid(&request).await
    }

    /// Daily observations of one station
    pub async fn get_acis_station_data(&self, request: &AcisStationRequest) -> Result<Dataset> {
        let body = self.acis_post("StnData", &request.body()?).await?;
        let dataset = parse_acis_station_data(
            &body,
            STATION_ELEMENTS,
            request.trace_value,
            request.map_variables,
        )?;
        info!(
            "Fetched {} days of ACIS observations for station {}",
            dataset.data.len(),
            request.station
        );
        Ok(dataset)
    }

    /// Stations inside a bounding box
    pub async fn get_acis_available_stations(
        &self,
        request: &AcisStationsRequest,
    ) -> Result<Vec<AcisStation>> {
        let body = self.acis_post("StnMeta", &request.body()?).await?;
        let stations = parse_acis_stations(&body)?;
        info!("ACIS listed {} stations", stations.len());
        Ok(stations)
    }
}
