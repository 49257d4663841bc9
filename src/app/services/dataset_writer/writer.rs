//! Parquet and CSV output

use polars::prelude::{CsvWriter, DataFrame, ParquetWriter, SerWriter};
use std::fs::File;
use std::path::Path;
use tracing::info;

use super::conversion::to_dataframe;
use crate::app::models::Dataset;
use crate::config::OutputConfig;
use crate::{Error, Result};

/// File type chosen from the output extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Parquet,
    Csv,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("parquet") | Some("pq") => Ok(OutputFormat::Parquet),
            Some("csv") => Ok(OutputFormat::Csv),
            _ => Err(Error::validation(format!(
                "cannot infer output format of '{}', use a .parquet or .csv extension",
                path.display()
            ))),
        }
    }
}

/// Write a frame to `path` in the format its extension names
pub fn write_dataframe(
    frame: &mut DataFrame,
    path: impl AsRef<Path>,
    config: &OutputConfig,
) -> Result<OutputFormat> {
    let path = path.as_ref();
    let format = OutputFormat::from_path(path)?;
    let file = File::create(path).map_err(|e| Error::io(path, e))?;

    match format {
        OutputFormat::Parquet => {
            ParquetWriter::new(file)
                .with_compression(config.compression.to_polars_compression())
                .finish(frame)
                .map_err(|e| {
                    Error::export(format!("failed to write {}", path.display()), Some(e))
                })?;
        }
        OutputFormat::Csv => {
            let mut file = file;
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(frame)
                .map_err(|e| {
                    Error::export(format!("failed to write {}", path.display()), Some(e))
                })?;
        }
    }
    Ok(format)
}

/// Write the time series of a dataset to Parquet or CSV
pub fn write_dataset(
    dataset: &Dataset,
    path: impl AsRef<Path>,
    config: &OutputConfig,
) -> Result<()> {
    let path = path.as_ref();
    let mut frame = to_dataframe(&dataset.data)?;
    let format = write_dataframe(&mut frame, path, config)?;
    info!(
        "Wrote {} rows to {} ({:?})",
        frame.height(),
        path.display(),
        format
    );
    Ok(())
}
