use std::fmt;
use std::sync::Arc;

use ndarray::Axis;

use super::ComponentError;
use crate::data::{Column, ColumnValues, Dataset, RoleMappedData, RoleMapping, VectorData};

/// A data transform fitted on training rows.
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;

    fn fit(&self, train: &Dataset) -> Result<Box<dyn FittedTransform>, ComponentError>;
}

/// A fitted transform, applied identically to train, test and validation data.
pub trait FittedTransform: Send + Sync + fmt::Debug {
    fn apply(&self, data: Dataset) -> Result<Dataset, ComponentError>;
}

/// Binds column roles and prepares data for training.
pub trait DataAdapter: Send + Sync {
    /// Roles bound onto every dataset this adapter prepares.
    fn roles(&self) -> &RoleMapping;

    /// Column to stratify folds on when stratification is automatic.
    fn stratification_column(&self) -> Option<&str> {
        None
    }

    /// Fit pre-transforms (and optionally feature normalization) on `train`.
    ///
    /// Returns the prepared training data and the fitted pipeline to apply to
    /// held-out data.
    fn fit(
        &self,
        train: Dataset,
        normalize: bool,
    ) -> Result<(RoleMappedData, FittedPipeline), ComponentError>;
}

/// Transforms fitted on one fold's training rows.
#[derive(Debug)]
pub struct FittedPipeline {
    steps: Vec<Box<dyn FittedTransform>>,
    roles: RoleMapping,
}

impl FittedPipeline {
    pub fn new(steps: Vec<Box<dyn FittedTransform>>, roles: RoleMapping) -> Self {
        Self { steps, roles }
    }

    /// Number of fitted steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn roles(&self) -> &RoleMapping {
        &self.roles
    }

    /// Apply every step in order and bind roles.
    pub fn apply(&self, data: Dataset) -> Result<RoleMappedData, ComponentError> {
        let mut data = data;
        for step in &self.steps {
            data = step.apply(data)?;
        }
        Ok(RoleMappedData::new(data, self.roles.clone())?)
    }
}

/// Standard adapter: fixed role mapping plus an ordered list of transforms.
#[derive(Clone)]
pub struct ColumnAdapter {
    roles: RoleMapping,
    transforms: Vec<Arc<dyn Transform>>,
    stratification: Option<String>,
}

impl ColumnAdapter {
    pub fn new(roles: RoleMapping) -> Self {
        Self {
            roles,
            transforms: Vec::new(),
            stratification: None,
        }
    }

    /// Append a pre-transform.
    pub fn with_transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Stratify on `column` under automatic stratification.
    pub fn with_stratification(mut self, column: impl Into<String>) -> Self {
        self.stratification = Some(column.into());
        self
    }
}

impl fmt::Debug for ColumnAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnAdapter")
            .field("roles", &self.roles)
            .field(
                "transforms",
                &self.transforms.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("stratification", &self.stratification)
            .finish()
    }
}

impl DataAdapter for ColumnAdapter {
    fn roles(&self) -> &RoleMapping {
        &self.roles
    }

    fn stratification_column(&self) -> Option<&str> {
        self.stratification.as_deref()
    }

    fn fit(
        &self,
        train: Dataset,
        normalize: bool,
    ) -> Result<(RoleMappedData, FittedPipeline), ComponentError> {
        let mut data = train;
        let mut steps: Vec<Box<dyn FittedTransform>> = Vec::with_capacity(self.transforms.len() + 1);
        for transform in &self.transforms {
            let fitted = transform.fit(&data)?;
            data = fitted.apply(data)?;
            steps.push(fitted);
        }

        let mut mapped = RoleMappedData::new(data, self.roles.clone())?;
        if normalize {
            let normalizer = MaxAbsNormalizer::fit(&mapped)?;
            mapped = RoleMappedData::new(normalizer.apply(mapped.into_data())?, self.roles.clone())?;
            steps.push(Box::new(normalizer));
        }

        Ok((mapped, FittedPipeline::new(steps, self.roles.clone())))
    }
}

/// Scales every feature slot into [-1, 1] by its maximum absolute value.
///
/// Slots that are all zero are left unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct MaxAbsNormalizer {
    /// Per feature column: one scale per slot.
    scales: Vec<(String, Vec<f64>)>,
}

impl MaxAbsNormalizer {
    /// Fit scales on the feature columns of `train`.
    pub fn fit(train: &RoleMappedData) -> Result<Self, ComponentError> {
        let matrix = train.features()?;
        let max_abs = matrix.map_axis(Axis(0), |col| {
            col.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
        });

        let mut scales = Vec::with_capacity(train.roles().features.len());
        let mut offset = 0;
        for name in &train.roles().features {
            let width = train.data().require(name)?.values().fixed_width().unwrap_or(1);
            let slot_scales = max_abs
                .iter()
                .skip(offset)
                .take(width)
                .map(|&m| if m > 0.0 { 1.0 / m } else { 1.0 })
                .collect();
            scales.push((name.clone(), slot_scales));
            offset += width;
        }
        Ok(Self { scales })
    }

    pub fn scales(&self, column: &str) -> Option<&[f64]> {
        self.scales
            .iter()
            .find(|(n, _)| n == column)
            .map(|(_, s)| s.as_slice())
    }
}

impl FittedTransform for MaxAbsNormalizer {
    fn apply(&self, mut data: Dataset) -> Result<Dataset, ComponentError> {
        for (name, scales) in &self.scales {
            let col = data.require(name)?;
            let scaled = match col.values() {
                ColumnValues::Numeric(v) => {
                    ColumnValues::Numeric(v.iter().map(|x| x * scales[0]).collect())
                }
                ColumnValues::NumericVector(v) if v.fixed_width() == Some(scales.len()) => {
                    let width = scales.len();
                    let values = v
                        .values()
                        .iter()
                        .enumerate()
                        .map(|(i, x)| x * scales[i % width])
                        .collect();
                    ColumnValues::NumericVector(VectorData::fixed(width, values)?)
                }
                other => {
                    return Err(ComponentError::failed(
                        "normalizer",
                        format!("column '{name}' is {} but was fitted as numeric", other.type_name()),
                    ))
                }
            };
            let replacement: Column = col.clone().with_values(scaled);
            data.push_column(replacement)?;
        }
        Ok(data)
    }
}
