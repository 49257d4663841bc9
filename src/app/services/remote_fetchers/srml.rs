//! University of Oregon Solar Radiation Monitoring Laboratory archive
//!
//! Monthly files live at `{station}{filetype}{YY}{MM}.txt`, where the file
//! type encodes the interval (`PO` five-minute, `PH` hourly, `RO`/`RH`
//! for the raw variants, ...).

use chrono::NaiveDate;
use tracing::{info, warn};

use super::{Fetcher, is_not_found, months_between, no_message};
use crate::app::models::Dataset;
use crate::app::services::format_readers::{ReadOptions, parse_srml};
use crate::{Error, Result};

const SERVICE: &str = "SRML";

/// Parameters of an SRML archive download
#[derive(Debug, Clone, PartialEq)]
pub struct SrmlRequest {
    /// Two-letter station code, e.g. `EU` for Eugene
    pub station: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub filetype: String,
    pub map_variables: bool,
}

impl SrmlRequest {
    pub fn new(station: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            station: station.into().to_ascii_uppercase(),
            start,
            end,
            filetype: "PO".to_string(),
            map_variables: true,
        }
    }

    pub fn with_filetype(mut self, filetype: impl Into<String>) -> Self {
        self.filetype = filetype.into().to_ascii_uppercase();
        self
    }

    /// Archive file names of every month in the requested range
    pub fn file_names(&self) -> Result<Vec<String>> {
        if self.station.len() != 2 {
            return Err(Error::validation(format!(
                "SRML station must be a two-letter code, got '{}'",
                self.station
            )));
        }
        if self.filetype.len() != 2 {
            return Err(Error::validation(format!(
                "SRML file type must have two letters, got '{}'",
                self.filetype
            )));
        }
        Ok(months_between(self.start, self.end)?
            .into_iter()
            .map(|(year, month)| {
                format!(
                    "{}{}{:02}{:02}.txt",
                    self.station,
                    self.filetype,
                    year.rem_euclid(100),
                    month
                )
            })
            .collect())
    }
}

impl Fetcher {
    /// Download and join the monthly archive files of one station.
    ///
    /// Months the archive does not hold are skipped with a warning.
    pub async fn get_srml(&self, request: &SrmlRequest) -> Result<Dataset> {
        let names = request.file_names()?;
        let options = ReadOptions {
            map_variables: request.map_variables,
            coerce_year: None,
        };

        let mut combined = Dataset::default();
        let mut found = 0usize;
        for name in &names {
            let url = format!("{}{}", self.endpoints().srml, name);
            let body = match self
                .fetch_text(SERVICE, self.client().get(&url), no_message)
                .await
            {
                Ok(body) => body,
                Err(e) if is_not_found(&e) => {
                    warn!("SRML file {} is not available, skipping", name);
                    continue;
                }
                Err(e) => return Err(e),
            };
            combined.append(parse_srml(&body, &options)?)?;
            found += 1;
        }

        if found == 0 {
            return Err(Error::service(
                SERVICE,
                Some(404),
                format!(
                    "no {} files for station '{}' between {} and {}",
                    request.filetype, request.station, request.start, request.end
                ),
            ));
        }
        info!(
            "Fetched {} SRML rows for station {} from {} files",
            combined.data.len(),
            request.station,
            found
        );
        Ok(combined)
    }
}
