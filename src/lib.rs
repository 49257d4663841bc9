//! Solar IO Tools Library
//!
//! Readers for the file formats solar resource and weather data are
//! distributed in, and clients for the web services that serve them.
//!
//! This library provides tools for:
//! - Reading TMY2/TMY3, EPW, SRML, SURFRAD, MIDC, CRN, SOLRAD, BSRN, PSM3,
//!   PVGIS, CAMS, SolarAnywhere and ACIS data into a common [`Dataset`]
//! - Fetching the same data from NREL, PVGIS, BSRN, CAMS, SRML, MIDC, ACIS
//!   and SolarAnywhere
//! - Building a [`Location`] from TMY or EPW header metadata
//! - Exporting datasets to Parquet or CSV through polars
//!
//! Variable names are mapped to a common convention (`ghi`, `dni`,
//! `temp_air`, ...) unless `map_variables` is disabled.

pub mod config;
pub mod constants;
pub mod error;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod dataset_writer;
        pub mod example_data;
        pub mod format_readers;
        pub mod remote_fetchers;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{Dataset, HorizonProfile, Location, MetaValue, Metadata, TimeSeries};
pub use app::services::example_data::get_example_dataset_path;
pub use app::services::format_readers::{FileFormat, ReadOptions, parse_any, read_any};
pub use app::services::remote_fetchers::Fetcher;
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
