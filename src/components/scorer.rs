use std::fmt;
use std::sync::Arc;

use super::{ComponentError, Predictor};
use crate::data::{ColumnDescriptor, RoleMappedData, Schema};

/// Test data with score columns appended.
#[derive(Debug, Clone)]
pub struct ScoredData {
    pub data: RoleMappedData,
    /// Names of the columns added by scoring.
    pub score_columns: Vec<String>,
}

/// Binds a predictor to a test schema.
pub trait Scorer: Send + Sync {
    fn name(&self) -> &str;

    fn bind(
        &self,
        predictor: Arc<dyn Predictor>,
        input: &Schema,
    ) -> Result<Box<dyn BoundScorer>, ComponentError>;
}

/// A predictor bound to one input schema.
pub trait BoundScorer: Send + fmt::Debug {
    /// Schema of scored data.
    fn output_schema(&self) -> &Schema;

    fn score(&self, data: RoleMappedData) -> Result<ScoredData, ComponentError>;
}

/// Appends the predictor's output columns to the input.
///
/// Output columns hide input columns with the same name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnScorer;

impl Scorer for ColumnScorer {
    fn name(&self) -> &str {
        "default"
    }

    fn bind(
        &self,
        predictor: Arc<dyn Predictor>,
        input: &Schema,
    ) -> Result<Box<dyn BoundScorer>, ComponentError> {
        let outputs = predictor.output_columns();
        if outputs.is_empty() {
            return Err(ComponentError::failed(
                predictor.name(),
                "predictor declares no output columns",
            ));
        }

        let mut columns: Vec<ColumnDescriptor> = input.columns().to_vec();
        for desc in &mut columns {
            if outputs.iter().any(|o| o.name == desc.name) {
                desc.hidden = true;
            }
        }
        columns.extend(outputs.iter().cloned());

        Ok(Box::new(BoundColumnScorer {
            predictor,
            outputs,
            schema: Schema::new(columns),
        }))
    }
}

#[derive(Debug)]
struct BoundColumnScorer {
    predictor: Arc<dyn Predictor>,
    outputs: Vec<ColumnDescriptor>,
    schema: Schema,
}

impl BoundScorer for BoundColumnScorer {
    fn output_schema(&self) -> &Schema {
        &self.schema
    }

    fn score(&self, data: RoleMappedData) -> Result<ScoredData, ComponentError> {
        let predicted = self.predictor.predict(&data)?;
        let names: Vec<&str> = predicted.iter().map(|c| c.name()).collect();
        let expected: Vec<&str> = self.outputs.iter().map(|c| c.name.as_str()).collect();
        if names != expected {
            return Err(ComponentError::failed(
                self.predictor.name(),
                format!("predicted columns {names:?}, declared {expected:?}"),
            ));
        }

        let roles = data.roles().clone();
        let mut out = data.into_data();
        let mut score_columns = Vec::with_capacity(predicted.len());
        for col in predicted {
            score_columns.push(col.name().to_string());
            out.push_column(col)?;
        }
        Ok(ScoredData {
            data: RoleMappedData::new(out, roles)?,
            score_columns,
        })
    }
}
