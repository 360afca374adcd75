//! Typed column storage.
//!
//! Columns are stored column-major. Vector-valued columns use a CSR-style
//! layout (`offsets` + flat `values`) so that fixed-width and variable-width
//! vectors share one representation:
//!
//! ```text
//! fixed width 2:  offsets [0, 2, 4, 6]   values [a0 a1 | b0 b1 | c0 c1]
//! ragged:         offsets [0, 1, 4, 4]   values [a0 | b0 b1 b2 | ]
//! ```
//!
//! Converting a fixed-width column to the length-tolerant form only drops the
//! width marker; no values move.

use serde::{Deserialize, Serialize};

use super::dataset::DatasetError;

// =============================================================================
// VectorData
// =============================================================================

/// Per-row vectors stored contiguously.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorData<T> {
    /// Row boundaries into `values` (length = n_rows + 1).
    offsets: Vec<usize>,
    /// Flat values, row after row.
    values: Vec<T>,
    /// `Some(w)` when every row holds exactly `w` values.
    fixed_width: Option<usize>,
}

impl<T: Clone> VectorData<T> {
    /// Build a fixed-width vector column from row-major values.
    pub fn fixed(width: usize, values: Vec<T>) -> Result<Self, DatasetError> {
        if width == 0 {
            return Err(DatasetError::ZeroWidth);
        }
        if values.len() % width != 0 {
            return Err(DatasetError::RaggedValues {
                width,
                len: values.len(),
            });
        }
        let n_rows = values.len() / width;
        Ok(Self {
            offsets: (0..=n_rows).map(|r| r * width).collect(),
            values,
            fixed_width: Some(width),
        })
    }

    /// Build a variable-width vector column from per-row vectors.
    pub fn ragged(rows: Vec<Vec<T>>) -> Self {
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        offsets.push(0);
        let mut values = Vec::with_capacity(rows.iter().map(Vec::len).sum());
        for row in rows {
            values.extend(row);
            offsets.push(values.len());
        }
        Self {
            offsets,
            values,
            fixed_width: None,
        }
    }

    /// Empty column with zero rows.
    pub fn empty(fixed_width: Option<usize>) -> Self {
        Self {
            offsets: vec![0],
            values: Vec::new(),
            fixed_width,
        }
    }

    /// Number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Fixed width, or `None` for variable-width vectors.
    #[inline]
    pub fn fixed_width(&self) -> Option<usize> {
        self.fixed_width
    }

    /// Values of one row.
    #[inline]
    pub fn row(&self, row: usize) -> &[T] {
        &self.values[self.offsets[row]..self.offsets[row + 1]]
    }

    /// All values, row after row.
    #[inline]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Iterate rows.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        self.offsets.windows(2).map(|w| &self.values[w[0]..w[1]])
    }

    /// Select rows (in the given order) into a new column.
    pub fn gather(&self, rows: &[u32]) -> Self {
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        offsets.push(0);
        let mut values = Vec::new();
        for &row in rows {
            values.extend_from_slice(self.row(row as usize));
            offsets.push(values.len());
        }
        Self {
            offsets,
            values,
            fixed_width: self.fixed_width,
        }
    }

    /// Drop the fixed-width marker.
    pub fn into_ragged(mut self) -> Self {
        self.fixed_width = None;
        self
    }

    /// Map every value, keeping the row layout.
    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> VectorData<U> {
        VectorData {
            offsets: self.offsets.clone(),
            values: self.values.iter().map(f).collect(),
            fixed_width: self.fixed_width,
        }
    }

    /// Append the rows of `other`.
    ///
    /// The result keeps a fixed width only if both sides share it.
    pub fn append(&mut self, other: &Self) {
        let base = self.values.len();
        self.values.extend_from_slice(&other.values);
        self.offsets
            .extend(other.offsets[1..].iter().map(|&o| o + base));
        if self.fixed_width != other.fixed_width {
            self.fixed_width = None;
        }
    }
}

// =============================================================================
// ColumnValues
// =============================================================================

/// Column payload.
///
/// Key columns hold 1-based indices into `names`; `0` marks a missing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ColumnValues {
    Numeric(Vec<f64>),
    Text(Vec<String>),
    Key { keys: Vec<u32>, names: Vec<String> },
    NumericVector(VectorData<f64>),
    TextVector(VectorData<String>),
    KeyVector { keys: VectorData<u32>, names: Vec<String> },
}

impl ColumnValues {
    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Text(v) => v.len(),
            Self::Key { keys, .. } => keys.len(),
            Self::NumericVector(v) => v.n_rows(),
            Self::TextVector(v) => v.n_rows(),
            Self::KeyVector { keys, .. } => keys.n_rows(),
        }
    }

    /// Returns true if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true for vector-valued columns.
    pub fn is_vector(&self) -> bool {
        matches!(
            self,
            Self::NumericVector(_) | Self::TextVector(_) | Self::KeyVector { .. }
        )
    }

    /// Key names for key-typed columns.
    pub fn key_names(&self) -> Option<&[String]> {
        match self {
            Self::Key { names, .. } | Self::KeyVector { names, .. } => Some(names),
            _ => None,
        }
    }

    /// Fixed vector width; `Some(1)` for scalars, `None` for ragged vectors.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Self::Numeric(_) | Self::Text(_) | Self::Key { .. } => Some(1),
            Self::NumericVector(v) => v.fixed_width(),
            Self::TextVector(v) => v.fixed_width(),
            Self::KeyVector { keys, .. } => keys.fixed_width(),
        }
    }

    /// Select rows into a new payload.
    pub fn gather(&self, rows: &[u32]) -> Self {
        fn pick<T: Clone>(values: &[T], rows: &[u32]) -> Vec<T> {
            rows.iter().map(|&r| values[r as usize].clone()).collect()
        }

        match self {
            Self::Numeric(v) => Self::Numeric(pick(v, rows)),
            Self::Text(v) => Self::Text(pick(v, rows)),
            Self::Key { keys, names } => Self::Key {
                keys: pick(keys, rows),
                names: names.clone(),
            },
            Self::NumericVector(v) => Self::NumericVector(v.gather(rows)),
            Self::TextVector(v) => Self::TextVector(v.gather(rows)),
            Self::KeyVector { keys, names } => Self::KeyVector {
                keys: keys.gather(rows),
                names: names.clone(),
            },
        }
    }

    /// Convert fixed-width vectors to the variable-width layout.
    ///
    /// Scalars are left untouched.
    pub fn into_length_tolerant(self) -> Self {
        match self {
            Self::NumericVector(v) => Self::NumericVector(v.into_ragged()),
            Self::TextVector(v) => Self::TextVector(v.into_ragged()),
            Self::KeyVector { keys, names } => Self::KeyVector {
                keys: keys.into_ragged(),
                names,
            },
            other => other,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "numeric",
            Self::Text(_) => "text",
            Self::Key { .. } => "key",
            Self::NumericVector(_) => "numeric vector",
            Self::TextVector(_) => "text vector",
            Self::KeyVector { .. } => "key vector",
        }
    }

    /// Append rows from a payload of the same type.
    ///
    /// Key columns must already share one key space.
    pub fn append(&mut self, other: &Self) -> Result<(), DatasetError> {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.extend_from_slice(b),
            (Self::Text(a), Self::Text(b)) => a.extend_from_slice(b),
            (Self::NumericVector(a), Self::NumericVector(b)) => a.append(b),
            (Self::TextVector(a), Self::TextVector(b)) => a.append(b),
            (Self::Key { keys: a, names: na }, Self::Key { keys: b, names: nb })
                if na == nb =>
            {
                a.extend_from_slice(b)
            }
            (
                Self::KeyVector { keys: a, names: na },
                Self::KeyVector { keys: b, names: nb },
            ) if na == nb => a.append(b),
            (a, b) => {
                return Err(DatasetError::IncompatibleAppend {
                    left: a.type_name(),
                    right: b.type_name(),
                })
            }
        }
        Ok(())
    }
}

// =============================================================================
// Column
// =============================================================================

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    values: ColumnValues,
    /// Hidden columns are shadowed by a later column with the same name.
    #[serde(default)]
    hidden: bool,
    /// Optional per-slot names for vector columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    slot_names: Option<Vec<String>>,
}

impl Column {
    /// Create a column from a name and payload.
    pub fn new(name: impl Into<String>, values: ColumnValues) -> Self {
        Self {
            name: name.into(),
            values,
            hidden: false,
            slot_names: None,
        }
    }

    /// Numeric scalar column.
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, ColumnValues::Numeric(values))
    }

    /// Text scalar column.
    pub fn text(name: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(name, ColumnValues::Text(values))
    }

    /// Key column with 1-based keys into `names` (0 = missing).
    pub fn key(
        name: impl Into<String>,
        keys: Vec<u32>,
        names: Vec<String>,
    ) -> Result<Self, DatasetError> {
        let name = name.into();
        check_keys(&name, &keys, names.len())?;
        Ok(Self::new(name, ColumnValues::Key { keys, names }))
    }

    /// Fixed-width numeric vector column (row-major values).
    pub fn numeric_vector(
        name: impl Into<String>,
        width: usize,
        values: Vec<f64>,
    ) -> Result<Self, DatasetError> {
        Ok(Self::new(
            name,
            ColumnValues::NumericVector(VectorData::fixed(width, values)?),
        ))
    }

    /// Variable-width numeric vector column.
    pub fn ragged_numeric(name: impl Into<String>, rows: Vec<Vec<f64>>) -> Self {
        Self::new(name, ColumnValues::NumericVector(VectorData::ragged(rows)))
    }

    /// Fixed-width key vector column.
    pub fn key_vector(
        name: impl Into<String>,
        width: usize,
        keys: Vec<u32>,
        names: Vec<String>,
    ) -> Result<Self, DatasetError> {
        let name = name.into();
        check_keys(&name, &keys, names.len())?;
        let keys = VectorData::fixed(width, keys)?;
        Ok(Self::new(name, ColumnValues::KeyVector { keys, names }))
    }

    /// Attach slot names to a vector column.
    pub fn with_slot_names(mut self, slot_names: Vec<String>) -> Self {
        self.slot_names = Some(slot_names);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    #[inline]
    pub fn slot_names(&self) -> Option<&[String]> {
        self.slot_names.as_deref()
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the column has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Numeric scalar values, if this is a numeric column.
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match &self.values {
            ColumnValues::Numeric(v) => Some(v),
            _ => None,
        }
    }

    /// Check that every key of a key-typed column indexes its name list.
    ///
    /// Columns built through [`Column::new`] or deserialized skip this check.
    pub fn validate_keys(&self) -> Result<(), DatasetError> {
        match &self.values {
            ColumnValues::Key { keys, names } => check_keys(&self.name, keys, names.len()),
            ColumnValues::KeyVector { keys, names } => {
                check_keys(&self.name, keys.values(), names.len())
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub(crate) fn values_mut(&mut self) -> &mut ColumnValues {
        &mut self.values
    }

    /// Replace the payload, keeping name and flags.
    pub fn with_values(mut self, values: ColumnValues) -> Self {
        self.values = values;
        self
    }

    /// Drop slot names (they no longer describe a length-tolerant column).
    pub fn without_slot_names(mut self) -> Self {
        self.slot_names = None;
        self
    }

    /// Select rows into a new column.
    pub fn gather(&self, rows: &[u32]) -> Self {
        Self {
            name: self.name.clone(),
            values: self.values.gather(rows),
            hidden: self.hidden,
            slot_names: self.slot_names.clone(),
        }
    }

    pub(crate) fn into_parts(self) -> (String, ColumnValues, Option<Vec<String>>) {
        (self.name, self.values, self.slot_names)
    }
}

fn check_keys(column: &str, keys: &[u32], cardinality: usize) -> Result<(), DatasetError> {
    match keys.iter().position(|&k| k as usize > cardinality) {
        Some(row) => Err(DatasetError::KeyOutOfRange {
            column: column.to_string(),
            row,
            key: keys[row],
            cardinality,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_vector_rows() {
        let v = VectorData::fixed(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(v.n_rows(), 2);
        assert_eq!(v.row(1), &[3.0, 4.0]);
        assert_eq!(v.fixed_width(), Some(2));
    }

    #[test]
    fn fixed_vector_rejects_partial_rows() {
        let err = VectorData::fixed(3, vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, DatasetError::RaggedValues { width: 3, len: 2 }));
    }

    #[test]
    fn append_mixed_widths_becomes_ragged() {
        let mut a = VectorData::fixed(2, vec![1.0, 2.0]).unwrap();
        let b = VectorData::fixed(3, vec![3.0, 4.0, 5.0]).unwrap();
        a.append(&b);
        assert_eq!(a.fixed_width(), None);
        assert_eq!(a.n_rows(), 2);
        assert_eq!(a.row(0), &[1.0, 2.0]);
        assert_eq!(a.row(1), &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn gather_preserves_requested_order() {
        let v = VectorData::ragged(vec![vec![1], vec![2, 3], vec![]]);
        let g = v.gather(&[2, 1]);
        assert_eq!(g.n_rows(), 2);
        assert!(g.row(0).is_empty());
        assert_eq!(g.row(1), &[2, 3]);
    }

    #[test]
    fn key_out_of_range_is_rejected() {
        let err = Column::key("k", vec![1, 3], vec!["a".into(), "b".into()]).unwrap_err();
        assert!(matches!(err, DatasetError::KeyOutOfRange { row: 1, key: 3, .. }));
    }

    #[test]
    fn unchecked_key_column_fails_validation() {
        let col = Column::new(
            "k",
            ColumnValues::Key {
                keys: vec![0, 2],
                names: vec!["a".into()],
            },
        );
        let err = col.validate_keys().unwrap_err();
        assert!(matches!(err, DatasetError::KeyOutOfRange { row: 1, key: 2, cardinality: 1, .. }));
        assert!(Column::numeric("x", vec![1.0]).validate_keys().is_ok());
    }

    #[test]
    fn append_requires_matching_types() {
        let mut a = ColumnValues::Numeric(vec![1.0]);
        let b = ColumnValues::Text(vec!["x".into()]);
        assert!(a.append(&b).is_err());
    }
}
