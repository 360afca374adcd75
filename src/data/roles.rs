//! Semantic column roles.
//!
//! Trainers and evaluators never look up columns by name themselves; they
//! receive a [`RoleMappedData`] that binds label, features, weight, group and
//! name roles onto concrete columns.

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::column::ColumnValues;
use super::dataset::{Dataset, DatasetError};

/// Semantic role of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ColumnRole {
    Label,
    Feature,
    Weight,
    Group,
    Name,
}

impl ColumnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnRole::Label => "label",
            ColumnRole::Feature => "feature",
            ColumnRole::Weight => "weight",
            ColumnRole::Group => "group",
            ColumnRole::Name => "name",
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column names bound to each role.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoleMapping {
    pub label: Option<String>,
    pub features: Vec<String>,
    pub weight: Option<String>,
    pub group: Option<String>,
    pub name: Option<String>,
}

impl Default for RoleMapping {
    fn default() -> Self {
        Self {
            label: Some("Label".to_string()),
            features: vec!["Features".to_string()],
            weight: None,
            group: None,
            name: None,
        }
    }
}

impl RoleMapping {
    /// Mapping with the default label and the given feature columns.
    pub fn with_features<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            features: features.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn label(mut self, name: impl Into<String>) -> Self {
        self.label = Some(name.into());
        self
    }

    pub fn weight(mut self, name: impl Into<String>) -> Self {
        self.weight = Some(name.into());
        self
    }

    pub fn group(mut self, name: impl Into<String>) -> Self {
        self.group = Some(name.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// `(role, column)` pairs in role order.
    pub fn bindings(&self) -> Vec<(ColumnRole, &str)> {
        let mut out = Vec::new();
        if let Some(l) = &self.label {
            out.push((ColumnRole::Label, l.as_str()));
        }
        out.extend(self.features.iter().map(|f| (ColumnRole::Feature, f.as_str())));
        if let Some(w) = &self.weight {
            out.push((ColumnRole::Weight, w.as_str()));
        }
        if let Some(g) = &self.group {
            out.push((ColumnRole::Group, g.as_str()));
        }
        if let Some(n) = &self.name {
            out.push((ColumnRole::Name, n.as_str()));
        }
        out
    }

    /// Check that every bound column exists in `data`.
    pub fn validate(&self, data: &Dataset) -> Result<(), DatasetError> {
        for (_, column) in self.bindings() {
            data.require(column)?;
        }
        Ok(())
    }
}

/// A dataset together with its role bindings.
#[derive(Clone, Debug)]
pub struct RoleMappedData {
    data: Dataset,
    roles: RoleMapping,
}

impl RoleMappedData {
    /// Bind roles onto `data`, failing if a bound column is missing.
    pub fn new(data: Dataset, roles: RoleMapping) -> Result<Self, DatasetError> {
        roles.validate(&data)?;
        Ok(Self { data, roles })
    }

    #[inline]
    pub fn data(&self) -> &Dataset {
        &self.data
    }

    #[inline]
    pub fn roles(&self) -> &RoleMapping {
        &self.roles
    }

    pub fn into_data(self) -> Dataset {
        self.data
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.data.n_rows()
    }

    /// Label values, if a label is bound.
    pub fn label(&self) -> Result<Option<&[f64]>, DatasetError> {
        self.scalar(ColumnRole::Label, self.roles.label.as_deref())
    }

    /// Weight values, if a weight is bound.
    pub fn weights(&self) -> Result<Option<&[f64]>, DatasetError> {
        self.scalar(ColumnRole::Weight, self.roles.weight.as_deref())
    }

    /// Feature matrix, shape `[n_rows, n_features]`.
    ///
    /// Numeric scalar columns contribute one feature; fixed-width numeric
    /// vector columns contribute one feature per slot.
    pub fn features(&self) -> Result<Array2<f64>, DatasetError> {
        let n_rows = self.data.n_rows();
        let mut blocks: Vec<(usize, &[f64])> = Vec::with_capacity(self.roles.features.len());
        for name in &self.roles.features {
            let col = self.data.require(name)?;
            match col.values() {
                ColumnValues::Numeric(v) => blocks.push((1, v)),
                ColumnValues::NumericVector(v) => match v.fixed_width() {
                    Some(w) => blocks.push((w, v.values())),
                    None => return Err(role_type(ColumnRole::Feature, name, "fixed width")),
                },
                _ => return Err(role_type(ColumnRole::Feature, name, "numeric")),
            }
        }

        let n_features = blocks.iter().map(|(w, _)| w).sum();
        let mut out = Array2::<f64>::zeros((n_rows, n_features));
        let mut offset = 0;
        for (width, values) in blocks {
            for (row, mut out_row) in out.rows_mut().into_iter().enumerate() {
                for slot in 0..width {
                    out_row[offset + slot] = values[row * width + slot];
                }
            }
            offset += width;
        }
        Ok(out)
    }

    fn scalar(&self, role: ColumnRole, name: Option<&str>) -> Result<Option<&[f64]>, DatasetError> {
        let Some(name) = name else {
            return Ok(None);
        };
        let col = self.data.require(name)?;
        col.as_numeric()
            .map(Some)
            .ok_or_else(|| role_type(role, name, "numeric"))
    }
}

fn role_type(role: ColumnRole, column: &str, expected: &'static str) -> DatasetError {
    DatasetError::RoleType {
        role: role.as_str(),
        column: column.to_string(),
        expected,
    }
}
