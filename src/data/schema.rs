//! Columnar schema descriptors.
//!
//! A [`Schema`] is computed once per dataset and passed explicitly to the
//! aggregator, which reconciles widths and key spaces across folds.

use serde::{Deserialize, Serialize};

use super::column::{Column, ColumnValues};

/// Element type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Floating point values.
    Numeric,
    /// Free-form strings.
    Text,
    /// Bounded-cardinality categorical values.
    Key,
}

/// Shape of a column's per-row value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Width {
    /// One value per row.
    Scalar,
    /// Vector of a fixed length.
    Fixed(usize),
    /// Vector whose length differs between rows.
    Variable,
}

impl Width {
    /// Returns true for vector shapes.
    #[inline]
    pub fn is_vector(&self) -> bool {
        !matches!(self, Width::Scalar)
    }
}

/// Metadata for a single column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
    pub width: Width,
    /// Number of key names (key columns only).
    pub key_cardinality: Option<usize>,
    pub slot_names: Option<Vec<String>>,
    pub hidden: bool,
}

impl ColumnDescriptor {
    /// Describe an existing column.
    pub fn of(column: &Column) -> Self {
        let (kind, width) = match column.values() {
            ColumnValues::Numeric(_) => (ColumnKind::Numeric, Width::Scalar),
            ColumnValues::Text(_) => (ColumnKind::Text, Width::Scalar),
            ColumnValues::Key { .. } => (ColumnKind::Key, Width::Scalar),
            ColumnValues::NumericVector(v) => (ColumnKind::Numeric, vector_width(v.fixed_width())),
            ColumnValues::TextVector(v) => (ColumnKind::Text, vector_width(v.fixed_width())),
            ColumnValues::KeyVector { keys, .. } => {
                (ColumnKind::Key, vector_width(keys.fixed_width()))
            }
        };
        Self {
            name: column.name().to_string(),
            kind,
            width,
            key_cardinality: column.values().key_names().map(<[String]>::len),
            slot_names: column.slot_names().map(<[String]>::to_vec),
            hidden: column.is_hidden(),
        }
    }
}

fn vector_width(fixed: Option<usize>) -> Width {
    fixed.map_or(Width::Variable, Width::Fixed)
}

/// Ordered column descriptors of a dataset, hidden columns included.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnDescriptor>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    /// All descriptors.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Visible descriptors in column order.
    pub fn visible(&self) -> impl Iterator<Item = &ColumnDescriptor> + '_ {
        self.columns.iter().filter(|c| !c.hidden)
    }

    /// Visible descriptor by name.
    pub fn get(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.visible().find(|c| c.name == name)
    }

    /// Number of descriptors (hidden included).
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
