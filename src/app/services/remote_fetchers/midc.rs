//! NREL MIDC raw data API

use chrono::NaiveDate;
use tracing::info;

use super::{Fetcher, no_message};
use crate::app::models::Dataset;
use crate::app::services::format_readers::{MidcOptions, parse_midc_raw};
use crate::{Error, Result};

const SERVICE: &str = "MIDC";

/// Parameters of a raw data API request
#[derive(Debug, Clone, PartialEq)]
pub struct MidcRawRequest {
    /// Station identifier such as `BMS` or `UAT`
    pub site: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub options: MidcOptions,
}

impl MidcRawRequest {
    pub fn new(site: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            site: site.into(),
            start,
            end,
            options: MidcOptions::default(),
        }
    }

    pub fn query(&self) -> Result<Vec<(&'static str, String)>> {
        if self.site.trim().is_empty() {
            return Err(Error::validation("MIDC site must not be empty"));
        }
        if self.end < self.start {
            return Err(Error::validation(format!(
                "end date {} is before start date {}",
                self.end, self.start
            )));
        }
        Ok(vec![
            ("site", self.site.clone()),
            ("begin", self.start.format("%Y%m%d").to_string()),
            ("end", self.end.format("%Y%m%d").to_string()),
        ])
    }
}

impl Fetcher {
    /// Request raw MIDC data and decode it with [`parse_midc_raw`]
    pub async fn get_midc_raw(&self, request: &MidcRawRequest) -> Result<Dataset> {
        let query = request.query()?;
        let body = self
            .fetch_text(
                SERVICE,
                self.client().get(&self.endpoints().midc_raw).query(&query),
                no_message,
            )
            .await?;
        // The API answers unknown sites with a short plain-text note
        if body.trim().is_empty() || !body.contains(',') {
            return Err(Error::service(
                SERVICE,
                None,
                format!("no data for site '{}': {}", request.site, body.trim()),
            ));
        }
        let dataset = parse_midc_raw(&body, &request.options)?;
        info!(
            "Fetched {} MIDC rows for site {}",
            dataset.data.len(),
            request.site
        );
        Ok(dataset)
    }
}
