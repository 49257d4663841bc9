//! Site location built from reader metadata

use chrono::FixedOffset;
use serde::Serialize;

use super::Metadata;
use crate::{Error, Result};

/// Geographic site description
///
/// Two locations are equal when their latitude and longitude are equal;
/// elevation, timezone and name do not take part in identity.
#[derive(Debug, Clone, Serialize)]
pub struct Location {
    latitude: f64,
    longitude: f64,
    elevation: f64,
    #[serde(serialize_with = "serialize_offset")]
    tz: FixedOffset,
    name: Option<String>,
}

fn serialize_offset<S: serde::Serializer>(
    offset: &FixedOffset,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(offset.local_minus_utc() as f64 / 3600.0)
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

impl Location {
    /// Create a location, validating coordinate ranges
    pub fn new(
        latitude: f64,
        longitude: f64,
        elevation: f64,
        tz: FixedOffset,
        name: Option<String>,
    ) -> Result<Self> {
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
        if !elevation.is_finite() {
            return Err(Error::validation("elevation must be finite"));
        }
        Ok(Self {
            latitude,
            longitude,
            elevation,
            tz,
            name,
        })
    }

    /// Build from TMY3 (`Name`) or TMY2 (`City`) header metadata
    pub fn from_tmy(metadata: &Metadata) -> Result<Self> {
        let name = metadata
            .get_str("Name")
            .or_else(|| metadata.get_str("City"))
            .map(str::to_string);
        Self::from_metadata(metadata, "TZ", name)
    }

    /// Build from EPW header metadata
    pub fn from_epw(metadata: &Metadata) -> Result<Self> {
        let name = metadata.get_str("city").map(str::to_string);
        Self::from_metadata(metadata, "TZ", name)
    }

    fn from_metadata(metadata: &Metadata, tz_key: &str, name: Option<String>) -> Result<Self> {
        let required = |key: &str| {
            metadata
                .get_f64(key)
                .ok_or_else(|| Error::validation(format!("metadata lacks numeric '{}'", key)))
        };
        let latitude = required("latitude")?;
        let longitude = required("longitude")?;
        let elevation = required("altitude")?;
        let tz = offset_from_hours(required(tz_key)?)?;
        Self::new(latitude, longitude, elevation, tz, name)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn elevation(&self) -> f64 {
        self.elevation
    }

    pub fn tz(&self) -> FixedOffset {
        self.tz
    }

    /// UTC offset in fractional hours
    pub fn tz_hours(&self) -> f64 {
        self.tz.local_minus_utc() as f64 / 3600.0
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Convert fractional hours east of UTC to a fixed offset
pub fn offset_from_hours(hours: f64) -> Result<FixedOffset> {
    let seconds = (hours * 3600.0).round();
    if !seconds.is_finite() {
        return Err(Error::validation(format!("invalid UTC offset {}", hours)));
    }
    FixedOffset::east_opt(seconds as i32)
        .ok_or_else(|| Error::validation(format!("UTC offset {} hours out of range", hours)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmy3_metadata() -> Metadata {
        let mut meta = Metadata::new();
        meta.insert("USAF", 722287i64);
        meta.insert("Name", "HUNTSVILLE INTL AP");
        meta.insert("State", "AL");
        meta.insert("TZ", -6.0);
        meta.insert("latitude", 34.637);
        meta.insert("longitude", -86.775);
        meta.insert("altitude", 196.0);
        meta
    }

    #[test]
    fn test_from_tmy_uses_header_values() {
        let location = Location::from_tmy(&tmy3_metadata()).unwrap();
        assert_eq!(location.latitude(), 34.637);
        assert_eq!(location.longitude(), -86.775);
        assert_eq!(location.elevation(), 196.0);
        assert_eq!(location.tz_hours(), -6.0);
        assert_eq!(location.name(), Some("HUNTSVILLE INTL AP"));
    }

    #[test]
    fn test_from_tmy_requires_coordinates() {
        let mut meta = Metadata::new();
        meta.insert("TZ", -6.0);
        let err = Location::from_tmy(&meta).unwrap_err();
        assert!(err.to_string().contains("latitude"));
    }

    #[test]
    fn test_identity_ignores_elevation_and_name() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let a = Location::new(40.0, -105.0, 1650.0, utc, Some("a".into())).unwrap();
        let b = Location::new(40.0, -105.0, 0.0, utc, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_out_of_range_latitude() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert!(Location::new(91.0, 0.0, 0.0, utc, None).is_err());
    }

    #[test]
    fn test_half_hour_offsets() {
        let offset = offset_from_hours(5.5).unwrap();
        assert_eq!(offset.local_minus_utc(), 19800);
    }
}
