//! Declarative column schemas and the shared row accumulator
//!
//! Each format describes its columns as a list of [`FieldSpec`]s (name, value
//! kind, missing-value sentinels). Readers split a line into raw tokens and
//! hand them to a [`RowAccumulator`], which validates the field count,
//! decodes every token against its spec and builds typed columns.

use chrono::{FixedOffset, NaiveDateTime};
use std::borrow::Cow;

use crate::app::models::{ColumnData, TimeSeries};
use crate::constants::sentinels::TOLERANCE;
use crate::{Error, Result};

/// How a field's raw token is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Float,
    Int,
    Text,
    /// Narrowest of Int, Float, Text that fits every value in the column
    Auto,
}

/// Name, kind and sentinels of one column
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: Cow<'static, str>,
    pub kind: FieldKind,
    pub sentinels: &'static [f64],
}

impl FieldSpec {
    pub const fn float(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            kind: FieldKind::Float,
            sentinels: &[],
        }
    }

    pub const fn int(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            kind: FieldKind::Int,
            sentinels: &[],
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            kind: FieldKind::Text,
            sentinels: &[],
        }
    }

    /// Spec for a column whose name is only known from the file header
    pub fn named(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            kind,
            sentinels: &[],
        }
    }

    pub fn with_sentinels(mut self, sentinels: &'static [f64]) -> Self {
        self.sentinels = sentinels;
        self
    }

    fn is_sentinel(&self, value: f64) -> bool {
        self.sentinels
            .iter()
            .any(|s| (value - s).abs() <= TOLERANCE)
    }

    /// Decode one raw token
    fn decode(&self, raw: &str) -> std::result::Result<Cell, String> {
        let token = raw.trim();
        if token.is_empty() || token.eq_ignore_ascii_case("nan") {
            return Ok(Cell::Missing);
        }
        match self.kind {
            FieldKind::Float => {
                let value: f64 = token
                    .parse()
                    .map_err(|_| format!("field '{}': '{}' is not a number", self.name, token))?;
                Ok(if self.is_sentinel(value) {
                    Cell::Missing
                } else {
                    Cell::Float(value)
                })
            }
            FieldKind::Int => {
                let value = parse_integer(token)
                    .ok_or_else(|| format!("field '{}': '{}' is not an integer", self.name, token))?;
                Ok(if self.is_sentinel(value as f64) {
                    Cell::Missing
                } else {
                    Cell::Int(value)
                })
            }
            FieldKind::Text => Ok(Cell::Text(token.to_string())),
            FieldKind::Auto => match token.parse::<f64>() {
                Ok(value) if self.is_sentinel(value) => Ok(Cell::Missing),
                _ => Ok(Cell::Text(token.to_string())),
            },
        }
    }
}

/// Integers written either plainly or with a zero fraction ("12.0")
fn parse_integer(token: &str) -> Option<i64> {
    if let Ok(v) = token.parse::<i64>() {
        return Some(v);
    }
    let value: f64 = token.parse().ok()?;
    (value.fract() == 0.0 && value.is_finite()).then_some(value as i64)
}

/// A fixed-width field: `width` characters starting at byte `start`
#[derive(Debug, Clone, PartialEq)]
pub struct FixedField {
    pub spec: FieldSpec,
    pub start: usize,
    pub width: usize,
}

impl FixedField {
    pub const fn new(spec: FieldSpec, start: usize, width: usize) -> Self {
        Self { spec, start, width }
    }

    pub fn end(&self) -> usize {
        self.start + self.width
    }

    /// Slice this field out of a record
    pub fn slice<'a>(&self, record: &'a str) -> Option<&'a str> {
        record.get(self.start..self.end())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Missing,
    Float(f64),
    Int(i64),
    Text(String),
}

#[derive(Debug)]
enum ColumnBuilder {
    Float(Vec<Option<f64>>),
    Int(Vec<Option<i64>>),
    Text(Vec<Option<String>>),
}

impl ColumnBuilder {
    fn for_kind(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Float => Self::Float(Vec::new()),
            FieldKind::Int => Self::Int(Vec::new()),
            FieldKind::Text | FieldKind::Auto => Self::Text(Vec::new()),
        }
    }

    fn push(&mut self, cell: Cell) {
        match (self, cell) {
            (Self::Float(v), Cell::Float(x)) => v.push(Some(x)),
            (Self::Int(v), Cell::Int(x)) => v.push(Some(x)),
            (Self::Text(v), Cell::Text(x)) => v.push(Some(x)),
            (Self::Float(v), _) => v.push(None),
            (Self::Int(v), _) => v.push(None),
            (Self::Text(v), _) => v.push(None),
        }
    }

    fn finish(self, kind: FieldKind) -> ColumnData {
        match (self, kind) {
            (Self::Float(v), _) => ColumnData::Float(v),
            (Self::Int(v), _) => ColumnData::Int(v),
            (Self::Text(v), FieldKind::Auto) => narrow(v),
            (Self::Text(v), _) => ColumnData::Text(v),
        }
    }
}

/// Pick the narrowest column type that holds every present value
fn narrow(values: Vec<Option<String>>) -> ColumnData {
    let present = || values.iter().flatten();
    if present().all(|s| s.parse::<i64>().is_ok()) {
        return ColumnData::Int(
            values
                .iter()
                .map(|v| v.as_deref().and_then(|s| s.parse().ok()))
                .collect(),
        );
    }
    if present().all(|s| s.parse::<f64>().is_ok()) {
        return ColumnData::Float(
            values
                .iter()
                .map(|v| v.as_deref().and_then(|s| s.parse().ok()))
                .collect(),
        );
    }
    ColumnData::Text(values)
}

/// Builds a [`TimeSeries`] row by row against a fixed schema
#[derive(Debug)]
pub struct RowAccumulator {
    format: &'static str,
    specs: Vec<FieldSpec>,
    index: Vec<NaiveDateTime>,
    columns: Vec<ColumnBuilder>,
}

impl RowAccumulator {
    pub fn new(format: &'static str, specs: Vec<FieldSpec>) -> Self {
        let columns = specs.iter().map(|s| ColumnBuilder::for_kind(s.kind)).collect();
        Self {
            format,
            specs,
            index: Vec::new(),
            columns,
        }
    }

    pub fn specs(&self) -> &[FieldSpec] {
        &self.specs
    }

    pub fn rows(&self) -> usize {
        self.index.len()
    }

    /// Decode and append one row; `line` is the 1-based source line.
    ///
    /// The row is added only when every token decodes, so a failed call
    /// leaves the accumulator unchanged.
    pub fn push_row<S: AsRef<str>>(
        &mut self,
        line: usize,
        timestamp: NaiveDateTime,
        fields: &[S],
    ) -> Result<()> {
        if fields.len() != self.specs.len() {
            return Err(Error::format_at(
                self.format,
                line,
                format!(
                    "expected {} fields, found {}",
                    self.specs.len(),
                    fields.len()
                ),
            ));
        }

        let cells = self
            .specs
            .iter()
            .zip(fields)
            .map(|(spec, raw)| spec.decode(raw.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|reason| Error::format_at(self.format, line, reason))?;

        for (column, cell) in self.columns.iter_mut().zip(cells) {
            column.push(cell);
        }
        self.index.push(timestamp);
        Ok(())
    }

    /// Slice a fixed-width record and append it
    pub fn push_fixed(
        &mut self,
        line: usize,
        timestamp: NaiveDateTime,
        record: &str,
        fields: &[FixedField],
    ) -> Result<()> {
        let tokens = slice_fixed(self.format, line, record, fields)?;
        self.push_row(line, timestamp, &tokens)
    }

    /// Assemble the series
    pub fn finish(self, offset: Option<FixedOffset>) -> Result<TimeSeries> {
        let mut series = TimeSeries::new(self.index, offset);
        for (spec, column) in self.specs.into_iter().zip(self.columns) {
            series.push_column(spec.name.into_owned(), column.finish(spec.kind))?;
        }
        Ok(series)
    }
}

/// Cut a fixed-width record into its tokens
pub fn slice_fixed<'a>(
    format: &'static str,
    line: usize,
    record: &'a str,
    fields: &[FixedField],
) -> Result<Vec<&'a str>> {
    fields
        .iter()
        .map(|field| {
            field.slice(record).ok_or_else(|| {
                Error::format_at(
                    format,
                    line,
                    format!(
                        "record of {} characters too short for field '{}' at {}..{}",
                        record.len(),
                        field.spec.name,
                        field.start,
                        field.end()
                    ),
                )
            })
        })
        .collect()
}
