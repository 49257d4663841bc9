//! PVGIS non-interactive API: typical year, hourly series and horizon

use tracing::info;

use super::{Fetcher, json_message, validate_coordinates};
use crate::app::models::{Dataset, HorizonProfile};
use crate::app::services::format_readers::{
    PvgisFormat, PvgisOptions, parse_pvgis_horizon, parse_pvgis_hourly, parse_pvgis_tmy,
};
use crate::{Error, Result};

const SERVICE: &str = "PVGIS";

fn pvgis_error(body: &str) -> Option<String> {
    json_message(body, "/message")
}

fn join_horizon(heights: &[f64]) -> String {
    heights
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Parameters of the `tmy` endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct PvgisTmyRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub format: PvgisFormat,
    /// Include the effect of the terrain horizon
    pub usehorizon: bool,
    /// Horizon heights in degrees, equally spaced clockwise from north
    pub userhorizon: Option<Vec<f64>>,
    pub startyear: Option<i32>,
    pub endyear: Option<i32>,
    pub map_variables: bool,
}

impl PvgisTmyRequest {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            format: PvgisFormat::Json,
            usehorizon: true,
            userhorizon: None,
            startyear: None,
            endyear: None,
            map_variables: true,
        }
    }

    pub fn with_format(mut self, format: PvgisFormat) -> Self {
        self.format = format;
        self
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("lat", self.latitude.to_string()),
            ("lon", self.longitude.to_string()),
            ("outputformat", self.format.as_str().to_string()),
        ];
        // The service defaults usehorizon to 1
        if !self.usehorizon {
            params.push(("usehorizon", "0".to_string()));
        }
        if let Some(heights) = &self.userhorizon {
            params.push(("userhorizon", join_horizon(heights)));
        }
        if let Some(year) = self.startyear {
            params.push(("startyear", year.to_string()));
        }
        if let Some(year) = self.endyear {
            params.push(("endyear", year.to_string()));
        }
        params
    }
}

/// Parameters of the `seriescalc` endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct PvgisHourlyRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Surface tilt from horizontal in degrees
    pub surface_tilt: f64,
    /// Surface azimuth in PVGIS convention (0 = south, 90 = west)
    pub surface_azimuth: f64,
    /// `json` or `csv`
    pub format: PvgisFormat,
    pub usehorizon: bool,
    pub userhorizon: Option<Vec<f64>>,
    pub raddatabase: Option<String>,
    pub start: Option<i32>,
    pub end: Option<i32>,
    /// Also compute PV output
    pub pvcalculation: bool,
    pub peakpower: Option<f64>,
    pub pvtechchoice: String,
    pub mountingplace: String,
    pub loss: Option<f64>,
    /// 0 fixed, 1 single horizontal N-S, 2 two-axis, 3 vertical, 4 single horizontal E-W, 5 single inclined N-S
    pub trackingtype: u8,
    pub optimal_surface_tilt: bool,
    pub optimalangles: bool,
    /// Report beam, diffuse and reflected components
    pub components: bool,
    pub map_variables: bool,
}

impl PvgisHourlyRequest {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            surface_tilt: 0.0,
            surface_azimuth: 0.0,
            format: PvgisFormat::Json,
            usehorizon: true,
            userhorizon: None,
            raddatabase: None,
            start: None,
            end: None,
            pvcalculation: false,
            peakpower: None,
            pvtechchoice: "crystSi".to_string(),
            mountingplace: "free".to_string(),
            loss: None,
            trackingtype: 0,
            optimal_surface_tilt: false,
            optimalangles: false,
            components: true,
            map_variables: true,
        }
    }

    fn validate(&self) -> Result<()> {
        validate_coordinates(self.latitude, self.longitude)?;
        if !matches!(self.format, PvgisFormat::Json | PvgisFormat::Csv) {
            return Err(Error::validation(format!(
                "PVGIS hourly data is only available as json or csv, not {}",
                self.format.as_str()
            )));
        }
        if self.pvcalculation && self.peakpower.is_none() {
            return Err(Error::validation(
                "peakpower is required when pvcalculation is enabled",
            ));
        }
        if self.trackingtype > 5 {
            return Err(Error::validation(format!(
                "trackingtype must be 0-5, got {}",
                self.trackingtype
            )));
        }
        Ok(())
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("lat", self.latitude.to_string()),
            ("lon", self.longitude.to_string()),
            ("outputformat", self.format.as_str().to_string()),
            ("angle", self.surface_tilt.to_string()),
            ("aspect", self.surface_azimuth.to_string()),
            ("pvtechchoice", self.pvtechchoice.clone()),
            ("mountingplace", self.mountingplace.clone()),
            ("trackingtype", self.trackingtype.to_string()),
            ("components", u8::from(self.components).to_string()),
        ];
        // Flags are sent only when they differ from the service defaults
        if !self.usehorizon {
            params.push(("usehorizon", "0".to_string()));
        }
        if let Some(heights) = &self.userhorizon {
            params.push(("userhorizon", join_horizon(heights)));
        }
        if let Some(db) = &self.raddatabase {
            params.push(("raddatabase", db.clone()));
        }
        if let Some(year) = self.start {
            params.push(("startyear", year.to_string()));
        }
        if let Some(year) = self.end {
            params.push(("endyear", year.to_string()));
        }
        if self.pvcalculation {
            params.push(("pvcalculation", "1".to_string()));
        }
        if let Some(power) = self.peakpower {
            params.push(("peakpower", power.to_string()));
        }
        if let Some(loss) = self.loss {
            params.push(("loss", loss.to_string()));
        }
        if self.optimal_surface_tilt {
            params.push(("optimalinclination", "1".to_string()));
        }
        if self.optimalangles {
            params.push(("optimalangles", "1".to_string()));
        }
        params
    }
}

impl Fetcher {
    async fn pvgis_text(&self, endpoint: &str, query: &[(&'static str, String)]) -> Result<String> {
        let url = format!("{}{}", self.endpoints().pvgis, endpoint);
        self.fetch_text(SERVICE, self.client().get(url).query(query), pvgis_error)
            .await
    }

    /// Typical meteorological year, decoded with [`parse_pvgis_tmy`]
    pub async fn get_pvgis_tmy(&self, request: &PvgisTmyRequest) -> Result<Dataset> {
        validate_coordinates(request.latitude, request.longitude)?;
        let body = self.pvgis_text("tmy", &request.query()).await?;
        let dataset = parse_pvgis_tmy(
            &body,
            &PvgisOptions {
                format: Some(request.format),
                map_variables: request.map_variables,
            },
        )?;
        info!(
            "Fetched {} PVGIS TMY rows for ({}, {})",
            dataset.data.len(),
            request.latitude,
            request.longitude
        );
        Ok(dataset)
    }

    /// Hourly radiation and PV output, decoded with [`parse_pvgis_hourly`]
    pub async fn get_pvgis_hourly(&self, request: &PvgisHourlyRequest) -> Result<Dataset> {
        request.validate()?;
        let body = self.pvgis_text("seriescalc", &request.query()).await?;
        let dataset = parse_pvgis_hourly(
            &body,
            &PvgisOptions {
                format: Some(request.format),
                map_variables: request.map_variables,
            },
        )?;
        info!(
            "Fetched {} PVGIS hourly rows for ({}, {})",
            dataset.data.len(),
            request.latitude,
            request.longitude
        );
        Ok(dataset)
    }

    /// Horizon profile, decoded with [`parse_pvgis_horizon`]
    pub async fn get_pvgis_horizon(&self, latitude: f64, longitude: f64) -> Result<HorizonProfile> {
        validate_coordinates(latitude, longitude)?;
        let query = [
            ("lat", latitude.to_string()),
            ("lon", longitude.to_string()),
            ("outputformat", "json".to_string()),
        ];
        let body = self.pvgis_text("printhorizon", &query).await?;
        let profile = parse_pvgis_horizon(&body)?;
        info!(
            "Fetched {}-point PVGIS horizon for ({}, {})",
            profile.len(),
            latitude,
            longitude
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value<'a>(query: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        query
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_tmy_query_defaults() {
        let query = PvgisTmyRequest::new(45.0, 8.0).query();
        assert_eq!(value(&query, "lat"), Some("45"));
        assert_eq!(value(&query, "outputformat"), Some("json"));
        assert_eq!(value(&query, "usehorizon"), None);
    }

    #[test]
    fn test_tmy_query_options() {
        let mut request = PvgisTmyRequest::new(45.0, 8.0).with_format(PvgisFormat::Epw);
        request.usehorizon = false;
        request.userhorizon = Some(vec![10.0, 15.5, 20.0]);
        request.startyear = Some(2005);
        let query = request.query();
        assert_eq!(value(&query, "outputformat"), Some("epw"));
        assert_eq!(value(&query, "usehorizon"), Some("0"));
        assert_eq!(value(&query, "userhorizon"), Some("10,15.5,20"));
        assert_eq!(value(&query, "startyear"), Some("2005"));
        assert_eq!(value(&query, "endyear"), None);
    }

    #[test]
    fn test_hourly_query_flags() {
        let mut request = PvgisHourlyRequest::new(45.0, 8.0);
        request.pvcalculation = true;
        request.peakpower = Some(10.0);
        request.components = false;
        let query = request.query();
        assert_eq!(value(&query, "pvcalculation"), Some("1"));
        assert_eq!(value(&query, "peakpower"), Some("10"));
        assert_eq!(value(&query, "components"), Some("0"));
        assert_eq!(value(&query, "optimalangles"), None);
    }

    #[test]
    fn test_hourly_validation() {
        let mut request = PvgisHourlyRequest::new(45.0, 8.0);
        request.pvcalculation = true;
        assert!(request.validate().is_err());

        let mut request = PvgisHourlyRequest::new(45.0, 8.0);
        request.format = PvgisFormat::Basic;
        assert!(request.validate().is_err());

        assert!(PvgisHourlyRequest::new(45.0, 8.0).validate().is_ok());
    }
}
