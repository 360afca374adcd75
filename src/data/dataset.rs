//! Immutable columnar dataset.
//!
//! A [`Dataset`] is a set of equally long columns plus optional group
//! boundaries ("queries"). It is never mutated once shared: every
//! transformation builds a new dataset, so many fold tasks can read one
//! `Arc<Dataset>` concurrently.

use serde::{Deserialize, Serialize};

use super::column::Column;
use super::schema::{ColumnDescriptor, Schema};

/// Dataset construction and access errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatasetError {
    #[error("inconsistent number of rows: column '{column}' expected {expected}, got {got}")]
    InconsistentRows {
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("group offsets must start at 0, end at {n_rows} and be non-decreasing")]
    InvalidGroupOffsets { n_rows: usize },

    #[error("column '{0}' not found")]
    UnknownColumn(String),

    #[error("column '{column}' has key {key} at row {row}, but only {cardinality} key names")]
    KeyOutOfRange {
        column: String,
        row: usize,
        key: u32,
        cardinality: usize,
    },

    #[error("vector width must be positive")]
    ZeroWidth,

    #[error("{len} values cannot be split into rows of width {width}")]
    RaggedValues { width: usize, len: usize },

    #[error("cannot append a {right} column to a {left} column")]
    IncompatibleAppend {
        left: &'static str,
        right: &'static str,
    },

    #[error("row index {row} out of range for {n_rows} rows")]
    RowOutOfRange { row: u32, n_rows: usize },

    #[error("row indices must be strictly ascending")]
    UnorderedRows,

    #[error("{role} column '{column}' must be {expected}")]
    RoleType {
        role: &'static str,
        column: String,
        expected: &'static str,
    },
}

/// A read-only table of named columns with optional row groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<Column>,
    n_rows: usize,
    /// Group boundaries (length = n_groups + 1). A dataset without explicit
    /// groups has one group per row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group_offsets: Option<Vec<usize>>,
}

impl Dataset {
    /// Create a dataset from columns; all columns must have the same length.
    ///
    /// A later column with the same name as an earlier one hides it.
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let n_rows = columns.first().map_or(0, Column::len);
        let mut ds = Self::empty(n_rows);
        for col in columns {
            ds.push_column(col)?;
        }
        Ok(ds)
    }

    /// Dataset with `n_rows` rows and no columns.
    pub fn empty(n_rows: usize) -> Self {
        Self {
            columns: Vec::new(),
            n_rows,
            group_offsets: None,
        }
    }

    /// Attach group boundaries.
    pub fn with_groups(mut self, offsets: Vec<usize>) -> Result<Self, DatasetError> {
        let valid = offsets.first() == Some(&0)
            && offsets.last() == Some(&self.n_rows)
            && offsets.windows(2).all(|w| w[0] <= w[1]);
        if !valid {
            return Err(DatasetError::InvalidGroupOffsets {
                n_rows: self.n_rows,
            });
        }
        self.group_offsets = Some(offsets);
        Ok(self)
    }

    /// Number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Returns true if explicit groups were attached.
    #[inline]
    pub fn has_groups(&self) -> bool {
        self.group_offsets.is_some()
    }

    /// Number of groups (one per row when no groups are attached).
    pub fn n_groups(&self) -> usize {
        match &self.group_offsets {
            Some(offsets) => offsets.len() - 1,
            None => self.n_rows,
        }
    }

    /// Row range of group `g`.
    pub fn group_range(&self, g: usize) -> std::ops::Range<usize> {
        match &self.group_offsets {
            Some(offsets) => offsets[g]..offsets[g + 1],
            None => g..g + 1,
        }
    }

    /// Explicit group offsets, if any.
    pub fn group_offsets(&self) -> Option<&[usize]> {
        self.group_offsets.as_deref()
    }

    /// Group index of every row.
    pub fn row_groups(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.n_rows);
        for g in 0..self.n_groups() {
            let len = self.group_range(g).len();
            out.extend(std::iter::repeat(g as u32).take(len));
        }
        out
    }

    /// All columns, including hidden ones.
    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Visible columns in order.
    pub fn visible_columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns.iter().filter(|c| !c.is_hidden())
    }

    /// Visible column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.visible_columns().find(|c| c.name() == name)
    }

    /// Visible column by name, or `UnknownColumn`.
    pub fn require(&self, name: &str) -> Result<&Column, DatasetError> {
        self.column(name)
            .ok_or_else(|| DatasetError::UnknownColumn(name.to_string()))
    }

    /// Append a column, hiding any visible column with the same name.
    pub fn push_column(&mut self, column: Column) -> Result<(), DatasetError> {
        self.check_len(&column)?;
        self.hide(column.name());
        self.columns.push(column);
        Ok(())
    }

    /// Builder-style [`push_column`](Self::push_column).
    pub fn with_column(mut self, column: Column) -> Result<Self, DatasetError> {
        self.push_column(column)?;
        Ok(self)
    }

    /// Insert a column at position `index` (among all columns).
    pub fn insert_column(&mut self, index: usize, column: Column) -> Result<(), DatasetError> {
        self.check_len(&column)?;
        self.hide(column.name());
        let index = index.min(self.columns.len());
        self.columns.insert(index, column);
        Ok(())
    }

    /// Keep only columns for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&Column) -> bool) {
        self.columns.retain(keep);
    }

    /// Replace every column through `f`, keeping row count and groups.
    pub fn map_columns<E>(self, f: impl FnMut(Column) -> Result<Column, E>) -> Result<Self, E>
    where
        E: From<DatasetError>,
    {
        let n_rows = self.n_rows;
        let columns = self.columns.into_iter().map(f).collect::<Result<Vec<_>, E>>()?;
        if let Some(col) = columns.iter().find(|c| c.len() != n_rows) {
            return Err(DatasetError::InconsistentRows {
                column: col.name().to_string(),
                expected: n_rows,
                got: col.len(),
            }
            .into());
        }
        Ok(Self {
            columns,
            n_rows,
            group_offsets: self.group_offsets,
        })
    }

    /// Consume the dataset into its columns.
    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    /// Columnar descriptor of this dataset.
    pub fn schema(&self) -> Schema {
        Schema::new(self.columns.iter().map(ColumnDescriptor::of).collect())
    }

    /// Select rows into a new dataset.
    ///
    /// Group offsets are rebuilt from the groups of the selected rows, so
    /// gathering whole groups preserves them.
    pub fn gather(&self, rows: &[u32]) -> Result<Self, DatasetError> {
        if let Some(&row) = rows.iter().find(|&&r| r as usize >= self.n_rows) {
            return Err(DatasetError::RowOutOfRange {
                row,
                n_rows: self.n_rows,
            });
        }

        let columns = self.columns.iter().map(|c| c.gather(rows)).collect();
        let group_offsets = self.group_offsets.as_ref().map(|_| {
            let groups = self.row_groups();
            let mut offsets = vec![0];
            for (i, &row) in rows.iter().enumerate().skip(1) {
                if groups[row as usize] != groups[rows[i - 1] as usize] {
                    offsets.push(i);
                }
            }
            if !rows.is_empty() {
                offsets.push(rows.len());
            }
            offsets
        });

        Ok(Self {
            columns,
            n_rows: rows.len(),
            group_offsets,
        })
    }

    fn check_len(&self, column: &Column) -> Result<(), DatasetError> {
        if column.len() != self.n_rows {
            return Err(DatasetError::InconsistentRows {
                column: column.name().to_string(),
                expected: self.n_rows,
                got: column.len(),
            });
        }
        Ok(())
    }

    fn hide(&mut self, name: &str) {
        for col in self.columns.iter_mut().filter(|c| c.name() == name) {
            col.set_hidden(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(vec![
            Column::numeric("x", vec![0.0, 1.0, 2.0, 3.0]),
            Column::text("name", vec!["a".into(), "b".into(), "c".into(), "d".into()]),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_mismatched_rows() {
        let err = Dataset::new(vec![
            Column::numeric("x", vec![0.0, 1.0]),
            Column::numeric("y", vec![0.0]),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            DatasetError::InconsistentRows { expected: 2, got: 1, .. }
        ));
    }

    #[test]
    fn same_name_hides_previous_column() {
        let ds = sample()
            .with_column(Column::numeric("x", vec![9.0; 4]))
            .unwrap();
        assert_eq!(ds.columns().len(), 3);
        assert!(ds.columns()[0].is_hidden());
        assert_eq!(ds.column("x").unwrap().as_numeric().unwrap()[0], 9.0);
        assert_eq!(ds.visible_columns().count(), 2);
    }

    #[test]
    fn group_offsets_are_validated() {
        assert!(sample().with_groups(vec![0, 2, 4]).is_ok());
        assert!(sample().with_groups(vec![0, 3, 2, 4]).is_err());
        assert!(sample().with_groups(vec![1, 4]).is_err());
    }

    #[test]
    fn gather_rebuilds_groups() {
        let ds = sample().with_groups(vec![0, 1, 3, 4]).unwrap();
        let g = ds.gather(&[1, 2, 3]).unwrap();
        assert_eq!(g.n_rows(), 3);
        assert_eq!(g.group_offsets(), Some(&[0, 2, 3][..]));
        assert_eq!(g.column("x").unwrap().as_numeric().unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn gather_rejects_out_of_range_rows() {
        assert!(matches!(
            sample().gather(&[7]),
            Err(DatasetError::RowOutOfRange { row: 7, n_rows: 4 })
        ));
    }

    #[test]
    fn implicit_groups_are_rows() {
        let ds = sample();
        assert_eq!(ds.n_groups(), 4);
        assert_eq!(ds.group_range(2), 2..3);
        assert_eq!(ds.row_groups(), vec![0, 1, 2, 3]);
    }
}
