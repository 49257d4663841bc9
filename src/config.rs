//! Configuration management and validation.
//!
//! Settings are layered: built-in defaults, then an optional TOML file,
//! then `SOLAR_IOTOOLS_*` environment variables (plus `NREL_API_KEY`),
//! then CLI flags applied by the command layer.
//!
//! ```toml
//! data_dir = "/srv/solar/data"
//!
//! [network]
//! timeout_secs = 60
//!
//! [credentials]
//! nrel_api_key = "DEMO_KEY"
//! nrel_email = "user@example.com"
//!
//! [endpoints]
//! pvgis = "https://re.jrc.ec.europa.eu/api/v5_2/"
//!
//! [output]
//! compression = "zstd"
//! ```

use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, ENV_PREFIX, urls,
};
use crate::{Error, Result};

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Service credentials, passed through to the services unmodified
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub nrel_api_key: Option<String>,
    pub nrel_email: Option<String>,
    pub cams_email: Option<String>,
    pub bsrn_username: Option<String>,
    pub bsrn_password: Option<String>,
    pub solaranywhere_api_key: Option<String>,
}

/// Base URL of every remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub psm3: String,
    pub psm3_tmy: String,
    pub psm3_5min: String,
    pub pvgis: String,
    pub cams: String,
    pub bsrn: String,
    pub srml: String,
    pub midc_raw: String,
    pub acis: String,
    pub solaranywhere: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            psm3: urls::PSM3.to_string(),
            psm3_tmy: urls::PSM3_TMY.to_string(),
            psm3_5min: urls::PSM3_5MIN.to_string(),
            pvgis: urls::PVGIS.to_string(),
            cams: urls::CAMS.to_string(),
            bsrn: urls::BSRN.to_string(),
            srml: urls::SRML.to_string(),
            midc_raw: urls::MIDC_RAW.to_string(),
            acis: urls::ACIS.to_string(),
            solaranywhere: urls::SOLARANYWHERE.to_string(),
        }
    }
}

impl Endpoints {
    /// Every endpoint pointed at one base URL, for local test servers
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            psm3: format!("{}/psm3-download.csv", base),
            psm3_tmy: format!("{}/psm3-tmy-download.csv", base),
            psm3_5min: format!("{}/psm3-5min-download.csv", base),
            pvgis: format!("{}/pvgis/", base),
            cams: format!("{}/cams/wps", base),
            bsrn: format!("{}/bsrn/", base),
            srml: format!("{}/srml/", base),
            midc_raw: format!("{}/midc/data_api.pl", base),
            acis: format!("{}/acis/", base),
            solaranywhere: format!("{}/solaranywhere", base),
        }
    }

    fn entries(&self) -> [(&'static str, &str); 10] {
        [
            ("psm3", &self.psm3),
            ("psm3_tmy", &self.psm3_tmy),
            ("psm3_5min", &self.psm3_5min),
            ("pvgis", &self.pvgis),
            ("cams", &self.cams),
            ("bsrn", &self.bsrn),
            ("srml", &self.srml),
            ("midc_raw", &self.midc_raw),
            ("acis", &self.acis),
            ("solaranywhere", &self.solaranywhere),
        ]
    }
}

/// Supported compression algorithms for parquet files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    #[default]
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }
}

impl std::str::FromStr for CompressionAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "snappy" => Ok(Self::Snappy),
            "zstd" => Ok(Self::Zstd),
            "lz4" => Ok(Self::Lz4),
            "none" | "uncompressed" => Ok(Self::Uncompressed),
            other => Err(Error::configuration(format!(
                "unknown compression '{}', expected snappy, zstd, lz4 or none",
                other
            ))),
        }
    }
}

/// Output table settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub compression: CompressionAlgorithm,
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub credentials: Credentials,
    pub endpoints: Endpoints,
    pub output: OutputConfig,
    /// Directory holding the bundled example files
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// `<config dir>/solar-iotools/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::configuration(format!("invalid config file: {}", e)))
    }

    /// Load a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml(&content).map_err(|e| match e {
            Error::Configuration { message } => {
                Error::configuration(format!("{}: {}", path.display(), message))
            }
            other => other,
        })
    }

    /// Defaults, then `explicit` (which must exist) or the default file if
    /// present, then the process environment
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => {
                    debug!("Using config file {}", path.display());
                    Self::from_file(&path)?
                }
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override settings from environment-style lookups
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(raw) = var("TIMEOUT") {
            self.network.timeout_secs = raw.trim().parse().map_err(|_| {
                Error::configuration(format!("{}TIMEOUT must be whole seconds, got '{}'", ENV_PREFIX, raw))
            })?;
        }
        if let Some(agent) = var("USER_AGENT") {
            self.network.user_agent = agent;
        }
        if let Some(dir) = var("DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = var("COMPRESSION") {
            self.output.compression = raw.parse()?;
        }

        let credentials = &mut self.credentials;
        if let Some(key) = var("NREL_API_KEY").or_else(|| lookup("NREL_API_KEY")) {
            credentials.nrel_api_key = Some(key);
        }
        for (name, slot) in [
            ("NREL_EMAIL", &mut credentials.nrel_email),
            ("CAMS_EMAIL", &mut credentials.cams_email),
            ("BSRN_USERNAME", &mut credentials.bsrn_username),
            ("BSRN_PASSWORD", &mut credentials.bsrn_password),
            ("SOLARANYWHERE_API_KEY", &mut credentials.solaranywhere_api_key),
        ] {
            if let Some(value) = var(name) {
                *slot = Some(value);
            }
        }
        Ok(())
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.network.timeout_secs == 0 {
            return Err(Error::configuration("network.timeout_secs must be positive"));
        }
        for (name, url) in self.endpoints.entries() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::configuration(format!(
                    "endpoints.{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }
        Ok(())
    }
}
