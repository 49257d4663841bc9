//! Time-indexed tables of measurements
//!
//! A [`TimeSeries`] holds wall-clock timestamps, an optional fixed UTC
//! offset shared by every row, and named typed columns. Missing values are
//! `None` in every column type.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use serde::Serialize;
use std::collections::HashMap;

use crate::{Error, Result};

/// Values of a single column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "dtype", content = "values", rename_all = "lowercase")]
pub enum ColumnData {
    Float(Vec<Option<f64>>),
    Int(Vec<Option<i64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    /// Number of values in the column
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.len(),
            ColumnData::Int(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of missing values
    pub fn missing_count(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Int(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Text(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    /// Short dtype label for summaries
    pub fn dtype(&self) -> &'static str {
        match self {
            ColumnData::Float(_) => "f64",
            ColumnData::Int(_) => "i64",
            ColumnData::Text(_) => "str",
        }
    }

    /// Empty column of the same type
    fn empty_like(&self) -> Self {
        match self {
            ColumnData::Float(_) => ColumnData::Float(Vec::new()),
            ColumnData::Int(_) => ColumnData::Int(Vec::new()),
            ColumnData::Text(_) => ColumnData::Text(Vec::new()),
        }
    }

    fn push_missing(&mut self, count: usize) {
        match self {
            ColumnData::Float(v) => v.extend(std::iter::repeat_n(None, count)),
            ColumnData::Int(v) => v.extend(std::iter::repeat_n(None, count)),
            ColumnData::Text(v) => v.extend(std::iter::repeat_n(None, count)),
        }
    }

    /// Pick values by position; `None` positions become missing
    fn reindex(&self, positions: &[Option<usize>]) -> Self {
        fn pick<T: Clone>(values: &[Option<T>], positions: &[Option<usize>]) -> Vec<Option<T>> {
            positions
                .iter()
                .map(|p| p.and_then(|i| values[i].clone()))
                .collect()
        }
        match self {
            ColumnData::Float(v) => ColumnData::Float(pick(v, positions)),
            ColumnData::Int(v) => ColumnData::Int(pick(v, positions)),
            ColumnData::Text(v) => ColumnData::Text(pick(v, positions)),
        }
    }

    /// Whether `extend_from` accepts values of `other`'s type
    fn can_extend_from(&self, other: &ColumnData) -> bool {
        matches!(
            (self, other),
            (ColumnData::Float(_), ColumnData::Float(_) | ColumnData::Int(_))
                | (ColumnData::Int(_), ColumnData::Int(_) | ColumnData::Float(_))
                | (ColumnData::Text(_), ColumnData::Text(_))
        )
    }

    /// Append values of the same type; integers widen into floats on either side
    fn extend_from(&mut self, other: ColumnData) -> std::result::Result<(), String> {
        if let (ColumnData::Int(own), ColumnData::Float(_)) = (&*self, &other) {
            let widened = own.iter().map(|x| x.map(|v| v as f64)).collect();
            *self = ColumnData::Float(widened);
        }
        match (self, other) {
            (ColumnData::Float(a), ColumnData::Float(b)) => a.extend(b),
            (ColumnData::Int(a), ColumnData::Int(b)) => a.extend(b),
            (ColumnData::Text(a), ColumnData::Text(b)) => a.extend(b),
            (ColumnData::Float(a), ColumnData::Int(b)) => {
                a.extend(b.into_iter().map(|x| x.map(|v| v as f64)))
            }
            (this, other) => {
                return Err(format!(
                    "cannot append {} values to a {} column",
                    other.dtype(),
                    this.dtype()
                ));
            }
        }
        Ok(())
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// Ordered sequence of timestamped records
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    index: Vec<NaiveDateTime>,
    offset: Option<FixedOffset>,
    columns: Vec<Column>,
}

impl TimeSeries {
    /// Create a series from wall-clock timestamps and an optional UTC offset
    pub fn new(index: Vec<NaiveDateTime>, offset: Option<FixedOffset>) -> Self {
        Self {
            index,
            offset,
            columns: Vec::new(),
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Wall-clock timestamps as stored
    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    /// UTC offset shared by all rows, `None` for naive series
    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    /// Offset-aware timestamps, `None` for naive series
    pub fn timestamps(&self) -> Option<Vec<DateTime<FixedOffset>>> {
        let offset = self.offset?;
        Some(
            self.index
                .iter()
                .map(|ts| offset.from_local_datetime(ts).single())
                .collect::<Option<Vec<_>>>()
                .unwrap_or_default(),
        )
    }

    /// First and last timestamp
    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((*self.index.first()?, *self.index.last()?))
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.data)
    }

    /// Float values of a column, `None` if absent or not a float column
    pub fn float_values(&self, name: &str) -> Option<&[Option<f64>]> {
        match self.column(name)? {
            ColumnData::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Integer values of a column, `None` if absent or not an integer column
    pub fn int_values(&self, name: &str) -> Option<&[Option<i64>]> {
        match self.column(name)? {
            ColumnData::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Text values of a column, `None` if absent or not a text column
    pub fn text_values(&self, name: &str) -> Option<&[Option<String>]> {
        match self.column(name)? {
            ColumnData::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Mutable float values of a column
    pub fn float_values_mut(&mut self, name: &str) -> Option<&mut [Option<f64>]> {
        match &mut self.columns.iter_mut().find(|c| c.name == name)?.data {
            ColumnData::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Add a column; its length must match the index
    pub fn push_column(&mut self, name: impl Into<String>, data: ColumnData) -> Result<()> {
        let name = name.into();
        if data.len() != self.index.len() {
            return Err(Error::validation(format!(
                "column '{}' has {} values but the index has {} rows",
                name,
                data.len(),
                self.index.len()
            )));
        }
        if self.has_column(&name) {
            return Err(Error::validation(format!("duplicate column '{}'", name)));
        }
        self.columns.push(Column { name, data });
        Ok(())
    }

    /// Remove a column and return its data
    pub fn remove_column(&mut self, name: &str) -> Option<ColumnData> {
        let pos = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(pos).data)
    }

    /// Rename columns found in `mapping`; others keep their names
    pub fn rename_columns(&mut self, mapping: &HashMap<String, String>) {
        for column in &mut self.columns {
            if let Some(new_name) = mapping.get(column.name.as_str()) {
                column.name = new_name.clone();
            }
        }
    }

    /// Rename columns using a static lookup table
    pub fn rename_with(&mut self, table: &[(&str, &str)]) {
        for column in &mut self.columns {
            if let Some((_, to)) = table.iter().find(|(from, _)| *from == column.name) {
                column.name = (*to).to_string();
            }
        }
    }

    /// Concatenate `other` below this series.
    ///
    /// Columns are unioned: a column absent from one side is filled with
    /// missing values for that side's rows. Both series must share the same
    /// offset. A shared column whose types cannot be combined fails the call
    /// before anything is changed.
    pub fn append(&mut self, other: TimeSeries) -> Result<()> {
        if self.is_empty() && self.columns.is_empty() {
            *self = other;
            return Ok(());
        }
        if self.offset != other.offset {
            return Err(Error::validation(format!(
                "cannot append series with offset {:?} to series with offset {:?}",
                other.offset, self.offset
            )));
        }
        for column in &self.columns {
            let Some(incoming) = other.columns.iter().find(|c| c.name == column.name) else {
                continue;
            };
            if !column.data.can_extend_from(&incoming.data) {
                return Err(Error::validation(format!(
                    "column '{}': cannot append {} values to a {} column",
                    column.name,
                    incoming.data.dtype(),
                    column.data.dtype()
                )));
            }
        }

        let own_rows = self.len();
        let other_rows = other.len();
        let mut incoming: Vec<Column> = other.columns;

        for column in &mut self.columns {
            match incoming.iter().position(|c| c.name == column.name) {
                Some(pos) => {
                    let other_column = incoming.remove(pos);
                    column
                        .data
                        .extend_from(other_column.data)
                        .map_err(|reason| {
                            Error::validation(format!("column '{}': {}", column.name, reason))
                        })?;
                }
                None => column.data.push_missing(other_rows),
            }
        }

        for column in incoming {
            let mut data = column.data.empty_like();
            data.push_missing(own_rows);
            data.extend_from(column.data).map_err(Error::validation)?;
            self.columns.push(Column {
                name: column.name,
                data,
            });
        }

        self.index.extend(other.index);
        Ok(())
    }

    /// Merge the columns of `other` side by side, aligning rows on timestamp.
    ///
    /// The result index is the sorted union of both indexes; rows absent on
    /// one side get missing values in that side's columns. Both indexes must
    /// be strictly increasing.
    pub fn join_columns(&mut self, other: TimeSeries) -> Result<()> {
        if self.columns.is_empty() && self.is_empty() {
            *self = other;
            return Ok(());
        }
        if self.offset != other.offset {
            return Err(Error::validation("cannot join series with different offsets"));
        }
        if let Some(column) = other.columns.iter().find(|c| self.has_column(&c.name)) {
            return Err(Error::validation(format!(
                "duplicate column '{}'",
                column.name
            )));
        }

        let mut index: Vec<NaiveDateTime> = self
            .index
            .iter()
            .chain(other.index.iter())
            .copied()
            .collect();
        index.sort_unstable();
        index.dedup();

        let positions = |own: &[NaiveDateTime]| -> Vec<Option<usize>> {
            index
                .iter()
                .map(|ts| own.binary_search(ts).ok())
                .collect()
        };
        let own_positions = positions(&self.index);
        let other_positions = positions(&other.index);

        let mut columns = Vec::with_capacity(self.columns.len() + other.columns.len());
        for column in std::mem::take(&mut self.columns) {
            columns.push(Column {
                name: column.name,
                data: column.data.reindex(&own_positions),
            });
        }
        for column in other.columns {
            columns.push(Column {
                name: column.name,
                data: column.data.reindex(&other_positions),
            });
        }

        self.index = index;
        self.columns = columns;
        Ok(())
    }

    /// Check that timestamps strictly increase
    pub fn ensure_strictly_increasing(&self, format: &str) -> Result<()> {
        for (i, pair) in self.index.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(Error::format(
                    format,
                    format!(
                        "timestamps not strictly increasing at row {}: {} follows {}",
                        i + 2,
                        pair[1],
                        pair[0]
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_push_column_rejects_length_mismatch() {
        let mut series = TimeSeries::new(vec![ts(1, 0), ts(1, 1)], None);
        let result = series.push_column("ghi", ColumnData::Float(vec![Some(1.0)]));
        assert!(result.is_err());
        assert!(series.columns().is_empty());
    }

    #[test]
    fn test_timestamps_apply_offset() {
        let offset = FixedOffset::east_opt(-6 * 3600).unwrap();
        let series = TimeSeries::new(vec![ts(1, 12)], Some(offset));
        let stamps = series.timestamps().unwrap();
        assert_eq!(stamps[0].to_rfc3339(), "2020-01-01T12:00:00-06:00");
    }

    #[test]
    fn test_append_unions_columns() {
        let mut first = TimeSeries::new(vec![ts(1, 0)], None);
        first
            .push_column("ghi", ColumnData::Float(vec![Some(10.0)]))
            .unwrap();

        let mut second = TimeSeries::new(vec![ts(1, 1)], None);
        second
            .push_column("ghi", ColumnData::Float(vec![Some(20.0)]))
            .unwrap();
        second
            .push_column("dni", ColumnData::Float(vec![Some(5.0)]))
            .unwrap();

        first.append(second).unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(
            first.float_values("ghi").unwrap(),
            &[Some(10.0), Some(20.0)]
        );
        assert_eq!(first.float_values("dni").unwrap(), &[None, Some(5.0)]);
    }

    #[test]
    fn test_append_widens_int_into_float() {
        let mut first = TimeSeries::new(vec![ts(1, 0)], None);
        first
            .push_column("flag", ColumnData::Float(vec![Some(1.0)]))
            .unwrap();
        let mut second = TimeSeries::new(vec![ts(1, 1)], None);
        second
            .push_column("flag", ColumnData::Int(vec![Some(2)]))
            .unwrap();

        first.append(second).unwrap();
        assert_eq!(first.float_values("flag").unwrap(), &[Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_append_widens_existing_int_column() {
        let mut first = TimeSeries::new(vec![ts(1, 0)], None);
        first
            .push_column("ghi", ColumnData::Int(vec![Some(3)]))
            .unwrap();
        let mut second = TimeSeries::new(vec![ts(1, 1)], None);
        second
            .push_column("ghi", ColumnData::Float(vec![Some(4.5)]))
            .unwrap();

        first.append(second).unwrap();
        assert_eq!(first.float_values("ghi").unwrap(), &[Some(3.0), Some(4.5)]);
    }

    #[test]
    fn test_append_type_clash_leaves_series_unchanged() {
        let mut first = TimeSeries::new(vec![ts(1, 0)], None);
        first
            .push_column("ghi", ColumnData::Float(vec![Some(1.0)]))
            .unwrap();
        first
            .push_column("flag", ColumnData::Float(vec![Some(0.0)]))
            .unwrap();
        let before = first.clone();

        let mut second = TimeSeries::new(vec![ts(1, 1)], None);
        second
            .push_column("ghi", ColumnData::Float(vec![Some(2.0)]))
            .unwrap();
        second
            .push_column("flag", ColumnData::Text(vec![Some("x".to_string())]))
            .unwrap();

        let err = first.append(second).unwrap_err();
        assert!(err.to_string().contains("'flag'"));
        assert_eq!(first, before);
    }

    #[test]
    fn test_join_columns_aligns_on_timestamp() {
        let mut left = TimeSeries::new(vec![ts(1, 0), ts(1, 1)], None);
        left.push_column("ghi", ColumnData::Float(vec![Some(1.0), Some(2.0)]))
            .unwrap();
        let mut right = TimeSeries::new(vec![ts(1, 1), ts(1, 2)], None);
        right
            .push_column("lwu", ColumnData::Float(vec![Some(30.0), Some(40.0)]))
            .unwrap();

        left.join_columns(right).unwrap();

        assert_eq!(left.index(), &[ts(1, 0), ts(1, 1), ts(1, 2)]);
        assert_eq!(
            left.float_values("ghi").unwrap(),
            &[Some(1.0), Some(2.0), None]
        );
        assert_eq!(
            left.float_values("lwu").unwrap(),
            &[None, Some(30.0), Some(40.0)]
        );
    }

    #[test]
    fn test_join_columns_duplicate_leaves_series_unchanged() {
        let mut left = TimeSeries::new(vec![ts(1, 0)], None);
        left.push_column("ghi", ColumnData::Float(vec![Some(1.0)]))
            .unwrap();
        let before = left.clone();
        let mut right = TimeSeries::new(vec![ts(1, 1)], None);
        right
            .push_column("ghi", ColumnData::Float(vec![Some(2.0)]))
            .unwrap();

        let err = left.join_columns(right).unwrap_err();
        assert!(err.to_string().contains("duplicate column 'ghi'"));
        assert_eq!(left, before);
    }

    #[test]
    fn test_strictly_increasing_check() {
        let series = TimeSeries::new(vec![ts(1, 0), ts(1, 1), ts(1, 1)], None);
        let err = series.ensure_strictly_increasing("SRML").unwrap_err();
        assert!(err.to_string().contains("row 3"));

        let series = TimeSeries::new(vec![ts(1, 0), ts(1, 1)], None);
        assert!(series.ensure_strictly_increasing("SRML").is_ok());
    }

    #[test]
    fn test_rename_with_table() {
        let mut series = TimeSeries::new(vec![ts(1, 0)], None);
        series
            .push_column("GHI", ColumnData::Float(vec![Some(1.0)]))
            .unwrap();
        series
            .push_column("Other", ColumnData::Float(vec![Some(2.0)]))
            .unwrap();
        series.rename_with(&[("GHI", "ghi")]);
        assert_eq!(series.column_names(), vec!["ghi", "Other"]);
    }
}
