//! BSRN station-to-archive downloads
//!
//! The archive keeps one gzipped file per station and month, named
//! `{station}{MM}{YY}.dat.gz` below a per-station directory. Access needs
//! the account BSRN hands out on request.

use chrono::NaiveDate;
use tracing::{info, warn};

use super::{Fetcher, is_not_found, months_between, no_message};
use crate::app::models::Dataset;
use crate::app::services::format_readers::bsrn::gunzip;
use crate::app::services::format_readers::{BsrnOptions, parse_bsrn};
use crate::{Error, Result};

const SERVICE: &str = "BSRN";

/// Parameters of a BSRN download
#[derive(Debug, Clone, PartialEq)]
pub struct BsrnRequest {
    /// Three-letter station abbreviation, e.g. `pay`
    pub station: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub username: String,
    pub password: String,
    pub options: BsrnOptions,
}

impl BsrnRequest {
    pub fn new(
        station: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            station: station.into().to_ascii_lowercase(),
            start,
            end,
            username: username.into(),
            password: password.into(),
            options: BsrnOptions::default(),
        }
    }

    /// Archive paths of every month in the requested range
    pub fn file_paths(&self) -> Result<Vec<String>> {
        if self.station.len() != 3 || !self.station.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::validation(format!(
                "BSRN station must be a three-letter abbreviation, got '{}'",
                self.station
            )));
        }
        Ok(months_between(self.start, self.end)?
            .into_iter()
            .map(|(year, month)| {
                format!(
                    "{station}/{station}{month:02}{yy:02}.dat.gz",
                    station = self.station,
                    yy = year.rem_euclid(100)
                )
            })
            .collect())
    }
}

impl Fetcher {
    /// Download and join the monthly files of one station.
    ///
    /// Months missing from the archive are skipped with a warning; the
    /// metadata of the first available month is kept.
    pub async fn get_bsrn(&self, request: &BsrnRequest) -> Result<Dataset> {
        request.options.validate()?;
        let paths = request.file_paths()?;

        let mut combined = Dataset::default();
        let mut found = 0usize;
        for path in &paths {
            let url = format!("{}{}", self.endpoints().bsrn, path);
            let builder = self
                .client()
                .get(&url)
                .basic_auth(&request.username, Some(&request.password));
            let bytes = match self.fetch_bytes(SERVICE, builder, no_message).await {
                Ok(bytes) => bytes,
                Err(e) if is_not_found(&e) => {
                    warn!("BSRN file {} is not available, skipping", path);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let content = gunzip(&bytes)
                .map_err(|e| Error::format(SERVICE, format!("{}: not a gzip file: {}", path, e)))?;
            let month = parse_bsrn(&content, &request.options)?;
            combined.append(month)?;
            found += 1;
        }

        if found == 0 {
            return Err(Error::service(
                SERVICE,
                Some(404),
                format!(
                    "no data for station '{}' between {} and {}",
                    request.station, request.start, request.end
                ),
            ));
        }
        info!(
            "Fetched {} BSRN rows for station {} from {} of {} monthly files",
            combined.data.len(),
            request.station,
            found,
            paths.len()
        );
        Ok(combined)
    }
}
