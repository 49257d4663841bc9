//! Data models for solar resource data
//!
//! Every reader and fetcher returns a [`Dataset`]: a [`TimeSeries`] of
//! measurements plus the [`Metadata`] parsed from the file header or the
//! service response. [`Location`] can be constructed from that metadata.

mod location;
mod metadata;
mod series;

pub use location::{Location, offset_from_hours};
pub use metadata::{MetaValue, Metadata};
pub use series::{Column, ColumnData, TimeSeries};

use serde::Serialize;

// =============================================================================
// Dataset
// =============================================================================

/// Time series and header metadata produced by one read or fetch
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    pub data: TimeSeries,
    pub metadata: Metadata,
}

impl Dataset {
    pub fn new(data: TimeSeries, metadata: Metadata) -> Self {
        Self { data, metadata }
    }

    /// Concatenate another dataset below this one, keeping the first metadata
    pub fn append(&mut self, other: Dataset) -> crate::Result<()> {
        if self.data.is_empty() && self.metadata.is_empty() {
            *self = other;
            return Ok(());
        }
        self.data.append(other.data)
    }
}

// =============================================================================
// Horizon profile
// =============================================================================

/// Horizon elevation as a function of azimuth
///
/// Azimuth is in degrees clockwise from North, elevation in degrees above
/// the horizontal.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HorizonProfile {
    pub azimuth: Vec<f64>,
    pub elevation: Vec<f64>,
    pub metadata: Metadata,
}

impl HorizonProfile {
    pub fn len(&self) -> usize {
        self.azimuth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.azimuth.is_empty()
    }

    /// Azimuth/elevation pairs
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.azimuth.iter().copied().zip(self.elevation.iter().copied())
    }
}

// =============================================================================
// ACIS station listing
// =============================================================================

/// One station from the ACIS station metadata service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcisStation {
    pub name: String,
    pub sids: Vec<String>,
    pub state: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub uid: Option<i64>,
}
