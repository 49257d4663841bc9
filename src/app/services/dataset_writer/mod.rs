//! Export of datasets to tabular files
//!
//! [`to_dataframe`] turns a [`TimeSeries`](crate::app::models::TimeSeries)
//! into a polars `DataFrame` with a leading `time` column; [`write_dataset`]
//! writes it as Parquet or CSV depending on the file extension.
//!
//! ```rust,no_run
//! use solar_iotools::app::services::dataset_writer::write_dataset;
//! use solar_iotools::app::services::format_readers::{read_epw, ReadOptions};
//! use solar_iotools::config::OutputConfig;
//!
//! # fn main() -> solar_iotools::Result<()> {
//! let dataset = read_epw("data/NLD_Amsterdam062400_IWEC.epw", &ReadOptions::default())?;
//! write_dataset(&dataset, "amsterdam.parquet", &OutputConfig::default())?;
//! # Ok(())
//! # }
//! ```
//!
//! Timestamps of offset-aware series are stored as UTC instants; naive
//! series keep their wall-clock values. Header metadata is not part of the
//! table.

pub mod conversion;
pub mod writer;

#[cfg(test)]
mod tests;

pub use conversion::{TIME_COLUMN, to_dataframe};
pub use writer::{OutputFormat, write_dataframe, write_dataset};
