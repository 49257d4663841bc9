//! Readers for solar irradiance and weather file formats
//!
//! Every format has a pure `parse_*` function decoding text already in
//! memory and a `read_*` function that loads a file and delegates to it.
//! Both return a [`Dataset`](crate::app::models::Dataset).
//!
//! ## Architecture
//!
//! - [`schema`] - Declarative field specs and the shared row accumulator
//! - [`field_parsers`] - Token, date and header helpers
//! - one module per format family, from [`tmy`] to [`acis`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use solar_iotools::app::services::format_readers::{read_tmy3, ReadOptions};
//!
//! # fn example() -> solar_iotools::Result<()> {
//! let dataset = read_tmy3("data/722287TY.csv", &ReadOptions::default())?;
//! println!("{} rows, GHI present: {}", dataset.data.len(), dataset.data.has_column("ghi"));
//! # Ok(())
//! # }
//! ```

pub mod acis;
pub mod bsrn;
pub mod cams;
pub mod crn;
pub mod epw;
pub mod field_parsers;
pub mod midc;
pub mod psm3;
pub mod pvgis;
pub mod schema;
pub mod solaranywhere;
pub mod solrad;
pub mod srml;
pub mod surfrad;
pub mod tmy;

#[cfg(test)]
mod tests;

pub use acis::{AcisElement, parse_acis_grid, parse_acis_station_data, parse_acis_stations};
pub use bsrn::{BsrnOptions, parse_bsrn, read_bsrn};
pub use cams::{CamsOptions, PeriodLabel, TimeReference, parse_cams, read_cams};
pub use crn::{parse_crn, read_crn};
pub use epw::{parse_epw, read_epw};
pub use midc::{MidcOptions, parse_midc, parse_midc_raw, read_midc, read_midc_raw};
pub use psm3::{parse_psm3, read_psm3};
pub use pvgis::{
    PvgisFormat, PvgisOptions, parse_pvgis_horizon, parse_pvgis_hourly, parse_pvgis_tmy,
    read_pvgis_hourly, read_pvgis_tmy,
};
pub use solaranywhere::{parse_solaranywhere, parse_solaranywhere_json, read_solaranywhere};
pub use solrad::{parse_solrad, read_solrad};
pub use srml::{parse_srml, read_srml};
pub use surfrad::{parse_surfrad, read_surfrad};
pub use tmy::{parse_tmy2, parse_tmy3, read_tmy2, read_tmy3};

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::app::models::Dataset;
use crate::{Error, Result};

/// Options shared by most readers
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOptions {
    /// Rename native columns to the crate's variable names
    pub map_variables: bool,
    /// Replace the year of every timestamp (typical-year formats only)
    pub coerce_year: Option<i32>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            map_variables: true,
            coerce_year: None,
        }
    }
}

impl ReadOptions {
    /// Keep the native column names
    pub fn raw_names() -> Self {
        Self {
            map_variables: false,
            ..Self::default()
        }
    }

    pub fn with_coerce_year(mut self, year: i32) -> Self {
        self.coerce_year = Some(year);
        self
    }
}

/// Every file format the catalog can read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Tmy2,
    Tmy3,
    Epw,
    Srml,
    Surfrad,
    Midc,
    MidcRaw,
    Crn,
    Solrad,
    Bsrn,
    Psm3,
    PvgisTmy,
    PvgisHourly,
    Cams,
    SolarAnywhere,
}

impl FileFormat {
    pub const ALL: &'static [FileFormat] = &[
        FileFormat::Tmy2,
        FileFormat::Tmy3,
        FileFormat::Epw,
        FileFormat::Srml,
        FileFormat::Surfrad,
        FileFormat::Midc,
        FileFormat::MidcRaw,
        FileFormat::Crn,
        FileFormat::Solrad,
        FileFormat::Bsrn,
        FileFormat::Psm3,
        FileFormat::PvgisTmy,
        FileFormat::PvgisHourly,
        FileFormat::Cams,
        FileFormat::SolarAnywhere,
    ];

    /// Name accepted by [`FromStr`] and the CLI
    pub fn name(&self) -> &'static str {
        match self {
            FileFormat::Tmy2 => "tmy2",
            FileFormat::Tmy3 => "tmy3",
            FileFormat::Epw => "epw",
            FileFormat::Srml => "srml",
            FileFormat::Surfrad => "surfrad",
            FileFormat::Midc => "midc",
            FileFormat::MidcRaw => "midc-raw",
            FileFormat::Crn => "crn",
            FileFormat::Solrad => "solrad",
            FileFormat::Bsrn => "bsrn",
            FileFormat::Psm3 => "psm3",
            FileFormat::PvgisTmy => "pvgis-tmy",
            FileFormat::PvgisHourly => "pvgis-hourly",
            FileFormat::Cams => "cams",
            FileFormat::SolarAnywhere => "solaranywhere",
        }
    }

    /// One-line description for listings
    pub fn description(&self) -> &'static str {
        match self {
            FileFormat::Tmy2 => "NSRDB typical meteorological year, version 2 (fixed width)",
            FileFormat::Tmy3 => "NSRDB typical meteorological year, version 3 (CSV)",
            FileFormat::Epw => "EnergyPlus weather file",
            FileFormat::Srml => "University of Oregon SRML monthly archive",
            FileFormat::Surfrad => "NOAA SURFRAD daily file",
            FileFormat::Midc => "NREL MIDC web download",
            FileFormat::MidcRaw => "NREL MIDC raw data API",
            FileFormat::Crn => "NOAA US Climate Reference Network subhourly file",
            FileFormat::Solrad => "NOAA SOLRAD daily file",
            FileFormat::Bsrn => "BSRN station-to-archive file (plain or .gz)",
            FileFormat::Psm3 => "NSRDB PSM3 CSV download",
            FileFormat::PvgisTmy => "PVGIS typical meteorological year (json, csv, basic, epw)",
            FileFormat::PvgisHourly => "PVGIS hourly radiation and PV output (json, csv)",
            FileFormat::Cams => "CAMS radiation service / McClear CSV",
            FileFormat::SolarAnywhere => "SolarAnywhere CSV export",
        }
    }

    /// Detect formats with an unambiguous extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "epw" => Some(FileFormat::Epw),
            "tm2" => Some(FileFormat::Tmy2),
            "json" => Some(FileFormat::PvgisHourly),
            _ => None,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FileFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        FileFormat::ALL
            .iter()
            .copied()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = FileFormat::ALL.iter().map(FileFormat::name).collect();
                Error::validation(format!(
                    "unknown format '{}', expected one of: {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// Decode content in the given format with default format-specific options
pub fn parse_any(format: FileFormat, content: &str, options: &ReadOptions) -> Result<Dataset> {
    let map_variables = options.map_variables;
    match format {
        FileFormat::Tmy2 => parse_tmy2(content, options),
        FileFormat::Tmy3 => parse_tmy3(content, options),
        FileFormat::Epw => parse_epw(content, options),
        FileFormat::Srml => parse_srml(content, options),
        FileFormat::Surfrad => parse_surfrad(content, options),
        FileFormat::Midc => parse_midc(content, &midc_options(map_variables)),
        FileFormat::MidcRaw => parse_midc_raw(content, &midc_options(map_variables)),
        FileFormat::Crn => parse_crn(content, options),
        FileFormat::Solrad => parse_solrad(content, options),
        FileFormat::Bsrn => parse_bsrn(content, &BsrnOptions::default()),
        FileFormat::Psm3 => parse_psm3(content, options),
        FileFormat::PvgisTmy => parse_pvgis_tmy(content, &pvgis_options(map_variables)),
        FileFormat::PvgisHourly => parse_pvgis_hourly(content, &pvgis_options(map_variables)),
        FileFormat::Cams => parse_cams(
            content,
            &CamsOptions {
                map_variables,
                ..CamsOptions::default()
            },
        ),
        FileFormat::SolarAnywhere => parse_solaranywhere(content, options),
    }
}

/// Read a file in the given format with default format-specific options
pub fn read_any(format: FileFormat, path: impl AsRef<Path>, options: &ReadOptions) -> Result<Dataset> {
    let path = path.as_ref();
    let map_variables = options.map_variables;
    match format {
        // Extension-aware readers
        FileFormat::Bsrn => read_bsrn(path, &BsrnOptions::default()),
        FileFormat::PvgisTmy => read_pvgis_tmy(path, &pvgis_options(map_variables)),
        FileFormat::PvgisHourly => read_pvgis_hourly(path, &pvgis_options(map_variables)),
        other => {
            let content = field_parsers::read_source(path)?;
            let dataset = parse_any(other, &content, options)?;
            tracing::info!(
                "Read {} {} rows from {}",
                dataset.data.len(),
                other,
                path.display()
            );
            Ok(dataset)
        }
    }
}

fn midc_options(map_variables: bool) -> MidcOptions {
    MidcOptions {
        map_variables,
        ..MidcOptions::default()
    }
}

fn pvgis_options(map_variables: bool) -> PvgisOptions {
    PvgisOptions {
        map_variables,
        ..PvgisOptions::default()
    }
}
