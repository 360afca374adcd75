//! Row-subset views over a shared dataset.

use std::sync::Arc;

use super::dataset::{Dataset, DatasetError};

/// An ordered subset of rows of a shared [`Dataset`].
///
/// Views are cheap to clone and never copy the underlying columns until
/// [`materialize`](DataView::materialize) is called.
#[derive(Debug, Clone)]
pub struct DataView {
    source: Arc<Dataset>,
    rows: Arc<[u32]>,
}

impl DataView {
    /// View over every row.
    pub fn full(source: Arc<Dataset>) -> Self {
        let rows: Arc<[u32]> = (0..source.n_rows() as u32).collect();
        Self { source, rows }
    }

    /// View over `rows`, which must be strictly ascending and in range.
    pub fn new(source: Arc<Dataset>, rows: Vec<u32>) -> Result<Self, DatasetError> {
        if rows.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DatasetError::UnorderedRows);
        }
        if let Some(&row) = rows.last() {
            if row as usize >= source.n_rows() {
                return Err(DatasetError::RowOutOfRange {
                    row,
                    n_rows: source.n_rows(),
                });
            }
        }
        Ok(Self {
            source,
            rows: rows.into(),
        })
    }

    #[inline]
    pub fn source(&self) -> &Arc<Dataset> {
        &self.source
    }

    /// Selected rows, ascending.
    #[inline]
    pub fn rows(&self) -> &[u32] {
        &self.rows
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Copy the selected rows into an owned dataset.
    pub fn materialize(&self) -> Result<Dataset, DatasetError> {
        self.source.gather(&self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;

    fn source() -> Arc<Dataset> {
        Arc::new(Dataset::new(vec![Column::numeric("x", vec![0.0, 1.0, 2.0])]).unwrap())
    }

    #[test]
    fn full_view_covers_all_rows() {
        let v = DataView::full(source());
        assert_eq!(v.rows(), &[0, 1, 2]);
    }

    #[test]
    fn rejects_unordered_rows() {
        assert_eq!(
            DataView::new(source(), vec![2, 1]).unwrap_err(),
            DatasetError::UnorderedRows
        );
    }

    #[test]
    fn materializes_selected_rows() {
        let v = DataView::new(source(), vec![0, 2]).unwrap();
        let ds = v.materialize().unwrap();
        assert_eq!(ds.column("x").unwrap().as_numeric().unwrap(), &[0.0, 2.0]);
    }
}
