//! Command-line argument definitions for solar-iotools
//!
//! This module defines the CLI interface using the clap derive API:
//! `read` decodes local files, `fetch` queries a remote service, `formats`
//! lists what is supported and `example` locates the bundled data files.

use crate::app::services::format_readers::{FileFormat, PeriodLabel, PvgisFormat, TimeReference};
use crate::app::services::remote_fetchers::{AcisGridProduct, CamsIdentifier, CamsTimeStep};
use chrono::{DateTime, FixedOffset, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the solar data reader and fetcher
#[derive(Debug, Clone, Parser)]
#[command(
    name = "solar-iotools",
    version,
    about = "Read and fetch solar irradiance and weather data",
    long_about = "Reads the common solar resource file formats (TMY2/3, EPW, BSRN, PSM3, PVGIS, \
                  CAMS, ...) and fetches data from NREL, PVGIS, BSRN, CAMS, SRML, MIDC, ACIS and \
                  SolarAnywhere. Results can be summarised or exported to Parquet or CSV."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    ///
    /// TOML configuration file with credentials, endpoints and output
    /// settings. If not specified, looks for
    /// <config dir>/solar-iotools/config.toml
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        global = true,
        help = "Path to configuration file (TOML format)"
    )]
    pub config_file: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Output format for results
    #[arg(
        long = "output-format",
        value_enum,
        default_value = "human",
        global = true,
        help = "Output format for results"
    )]
    pub output_format: OutputFormat,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Read one or more local files
    Read(ReadArgs),
    /// Fetch data from a remote service
    Fetch(FetchArgs),
    /// List supported file formats and services
    Formats,
    /// List the bundled example files or print the path of one
    Example(ExampleArgs),
}

/// Arguments for the read command
#[derive(Debug, Clone, Parser)]
pub struct ReadArgs {
    /// File format name, e.g. tmy3, epw, bsrn, pvgis-tmy
    ///
    /// Use `auto` to detect it from the extension (.epw, .tm2, .json).
    #[arg(value_name = "FORMAT")]
    pub format: FormatChoice,

    /// File path or glob pattern; matching files are concatenated in order
    #[arg(value_name = "PATH|GLOB")]
    pub input: String,

    /// Write the combined table to this .parquet or .csv file
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Replace the year of every timestamp (typical-year formats)
    #[arg(long = "coerce-year", value_name = "YEAR")]
    pub coerce_year: Option<i32>,

    /// Keep the native column names
    #[arg(long = "raw-names")]
    pub raw_names: bool,
}

/// File format argument, `auto` or a concrete name
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormatChoice {
    Auto,
    Named(FileFormat),
}

impl std::str::FromStr for FormatChoice {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        if s.eq_ignore_ascii_case("auto") {
            Ok(FormatChoice::Auto)
        } else {
            s.parse().map(FormatChoice::Named)
        }
    }
}

/// Arguments for the fetch command
#[derive(Debug, Clone, Parser)]
pub struct FetchArgs {
    #[command(subcommand)]
    pub service: FetchService,

    /// Write the result table to this .parquet or .csv file
    #[arg(short = 'o', long = "output", value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    /// Keep the native column names
    #[arg(long = "raw-names", global = true)]
    pub raw_names: bool,
}

/// Point location shared by the gridded services
#[derive(Debug, Clone, Parser)]
pub struct PointArgs {
    /// Latitude in decimal degrees, north positive
    #[arg(long = "lat", allow_hyphen_values = true)]
    pub latitude: f64,

    /// Longitude in decimal degrees, east positive
    #[arg(long = "lon", allow_hyphen_values = true)]
    pub longitude: f64,
}

/// Inclusive date range
#[derive(Debug, Clone, Parser)]
pub struct DateRangeArgs {
    /// First day (YYYY-MM-DD)
    #[arg(long = "start")]
    pub start: NaiveDate,

    /// Last day (YYYY-MM-DD)
    #[arg(long = "end")]
    pub end: NaiveDate,
}

/// One subcommand per remote service
#[derive(Debug, Clone, Subcommand)]
pub enum FetchService {
    /// NREL NSRDB PSM3
    Psm3 {
        #[command(flatten)]
        point: PointArgs,
        /// A year such as 2017, or a typical year such as tmy-2020
        #[arg(long = "names", default_value = "tmy")]
        names: String,
        /// Interval in minutes (5, 15, 30 or 60)
        #[arg(long = "interval", default_value_t = 60)]
        interval: u32,
        /// Comma-separated attribute list; the default set when omitted
        #[arg(long = "attributes")]
        attributes: Option<String>,
        #[arg(long = "leap-day")]
        leap_day: bool,
        /// Timestamps in UTC
        #[arg(long = "utc")]
        utc: bool,
        /// Overrides the configured NREL API key
        #[arg(long = "api-key")]
        api_key: Option<String>,
        /// Overrides the configured NREL email
        #[arg(long = "email")]
        email: Option<String>,
    },
    /// PVGIS typical meteorological year
    PvgisTmy {
        #[command(flatten)]
        point: PointArgs,
        #[arg(long = "format", default_value = "json")]
        format: PvgisFormat,
        /// Ignore the terrain horizon
        #[arg(long = "no-horizon")]
        no_horizon: bool,
        /// Comma-separated horizon heights in degrees, clockwise from north
        #[arg(long = "userhorizon", value_delimiter = ',')]
        userhorizon: Option<Vec<f64>>,
        #[arg(long = "startyear")]
        startyear: Option<i32>,
        #[arg(long = "endyear")]
        endyear: Option<i32>,
    },
    /// PVGIS hourly radiation and PV output
    PvgisHourly {
        #[command(flatten)]
        point: PointArgs,
        /// Surface tilt in degrees
        #[arg(long = "tilt", default_value_t = 0.0)]
        surface_tilt: f64,
        /// Surface azimuth, PVGIS convention (0 = south)
        #[arg(long = "azimuth", default_value_t = 0.0, allow_hyphen_values = true)]
        surface_azimuth: f64,
        #[arg(long = "format", default_value = "json")]
        format: PvgisFormat,
        #[arg(long = "start")]
        start: Option<i32>,
        #[arg(long = "end")]
        end: Option<i32>,
        #[arg(long = "raddatabase")]
        raddatabase: Option<String>,
        /// Also compute PV output (needs --peakpower)
        #[arg(long = "pvcalculation")]
        pvcalculation: bool,
        /// Nominal power in kW
        #[arg(long = "peakpower")]
        peakpower: Option<f64>,
        /// System losses in percent
        #[arg(long = "loss")]
        loss: Option<f64>,
        #[arg(long = "trackingtype", default_value_t = 0)]
        trackingtype: u8,
        #[arg(long = "optimal-tilt")]
        optimal_surface_tilt: bool,
        #[arg(long = "optimalangles")]
        optimalangles: bool,
        /// Report only global values
        #[arg(long = "no-components")]
        no_components: bool,
    },
    /// PVGIS horizon profile
    PvgisHorizon {
        #[command(flatten)]
        point: PointArgs,
    },
    /// BSRN station-to-archive files
    Bsrn {
        /// Three-letter station abbreviation
        station: String,
        #[command(flatten)]
        range: DateRangeArgs,
        #[arg(long = "username")]
        username: Option<String>,
        #[arg(long = "password")]
        password: Option<String>,
        /// Logical records to decode, e.g. 0100,0300
        #[arg(long = "records", value_delimiter = ',')]
        records: Option<Vec<String>>,
    },
    /// CAMS radiation service or McClear
    Cams {
        #[command(flatten)]
        point: PointArgs,
        #[command(flatten)]
        range: DateRangeArgs,
        #[arg(long = "identifier", default_value = "mcclear")]
        identifier: CamsIdentifier,
        #[arg(long = "time-step", default_value = "1h")]
        time_step: CamsTimeStep,
        #[arg(long = "time-ref", value_enum, default_value = "ut")]
        time_ref: CamsTimeRef,
        #[arg(long = "altitude")]
        altitude: Option<f64>,
        /// Keep irradiation in Wh/m^2 instead of converting to W/m^2
        #[arg(long = "integrated")]
        integrated: bool,
        #[arg(long = "label", value_enum, default_value = "left")]
        label: Label,
        /// Overrides the configured CAMS email
        #[arg(long = "email")]
        email: Option<String>,
    },
    /// SRML monthly archive files
    Srml {
        /// Two-letter station code
        station: String,
        #[command(flatten)]
        range: DateRangeArgs,
        /// Archive file type, e.g. PO (5-minute) or PH (hourly)
        #[arg(long = "filetype", default_value = "PO")]
        filetype: String,
    },
    /// NREL MIDC raw data API
    MidcRaw {
        /// Site identifier, e.g. BMS
        site: String,
        #[command(flatten)]
        range: DateRangeArgs,
    },
    /// ACIS gridded daily products
    AcisGrid {
        /// prism, nrcc or mpe
        product: AcisGridProduct,
        #[command(flatten)]
        point: PointArgs,
        #[command(flatten)]
        range: DateRangeArgs,
    },
    /// ACIS station observations
    AcisStation {
        /// Station identifier
        station: String,
        #[command(flatten)]
        range: DateRangeArgs,
        /// Value used for trace precipitation
        #[arg(long = "trace-value", default_value_t = 0.001)]
        trace_value: f64,
    },
    /// ACIS stations inside a bounding box
    AcisStations {
        #[arg(long = "lat-min", allow_hyphen_values = true)]
        lat_min: f64,
        #[arg(long = "lat-max", allow_hyphen_values = true)]
        lat_max: f64,
        #[arg(long = "lon-min", allow_hyphen_values = true)]
        lon_min: f64,
        #[arg(long = "lon-max", allow_hyphen_values = true)]
        lon_max: f64,
        #[arg(long = "start", requires = "end")]
        start: Option<NaiveDate>,
        #[arg(long = "end", requires = "start")]
        end: Option<NaiveDate>,
    },
    /// SolarAnywhere weather data
    Solaranywhere {
        #[command(flatten)]
        point: PointArgs,
        /// Start time, RFC 3339 (required for historical sources)
        #[arg(long = "start")]
        start: Option<DateTime<FixedOffset>>,
        #[arg(long = "end")]
        end: Option<DateTime<FixedOffset>>,
        #[arg(long = "source", default_value = "SolarAnywhereLatest")]
        source: String,
        #[arg(long = "time-resolution", default_value_t = 60)]
        time_resolution: u32,
        #[arg(long = "poe")]
        probability_of_exceedance: Option<u32>,
        #[arg(long = "true-dynamics")]
        true_dynamics: bool,
        /// Overrides the configured SolarAnywhere key
        #[arg(long = "api-key")]
        api_key: Option<String>,
        /// Seconds to wait for the result
        #[arg(long = "max-response-time")]
        max_response_time: Option<u64>,
    },
}

/// Arguments for the example command
#[derive(Debug, Clone, Parser)]
pub struct ExampleArgs {
    /// File name; lists the available files when omitted
    pub name: Option<String>,
}

/// CAMS time reference
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CamsTimeRef {
    /// Universal time
    Ut,
    /// True solar time
    Tst,
}

impl From<CamsTimeRef> for TimeReference {
    fn from(value: CamsTimeRef) -> Self {
        match value {
            CamsTimeRef::Ut => TimeReference::Utc,
            CamsTimeRef::Tst => TimeReference::TrueSolar,
        }
    }
}

/// Which end of an averaging period labels a row
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Label {
    Left,
    Right,
}

impl From<Label> for PeriodLabel {
    fn from(value: Label) -> Self {
        match value {
            Label::Left => PeriodLabel::Left,
            Label::Right => PeriodLabel::Right,
        }
    }
}

/// Output format options for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON format for scripting
    Json,
}

impl Args {
    /// Log level derived from -v / -q
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Whether spinners and coloured summaries should be shown
    pub fn show_progress(&self) -> bool {
        !self.quiet && self.output_format == OutputFormat::Human
    }
}
