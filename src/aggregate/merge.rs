//! Concatenation of per-fold results.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::reconcile::{make_length_tolerant, reconcile_keys, scan_variable_length};
use super::AggregateError;
use crate::cv::fold_artifact_path;
use crate::data::{Column, Dataset};
use crate::logger::RunLogger;

/// Name of the fold index column added to collated output.
pub const FOLD_INDEX_COLUMN: &str = "FoldIndex";

/// Per-instance results of all folds merged into one dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedView {
    pub data: Dataset,
    /// Vector columns converted to the variable-width layout.
    pub variable_length: BTreeSet<String>,
    /// Unified key names of every key column, in first-seen order.
    pub key_spaces: BTreeMap<String, Vec<String>>,
}

/// Merges per-fold datasets into one view.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    fold_index_column: bool,
    /// Column after which the fold index is placed.
    anchor: Option<String>,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ResultAggregator {
    pub fn new(fold_index_column: bool) -> Self {
        Self {
            fold_index_column,
            anchor: None,
        }
    }

    /// Place the fold index right after `column` when it is present.
    pub fn with_anchor(mut self, column: impl Into<String>) -> Self {
        self.anchor = Some(column.into());
        self
    }

    /// Merge fold datasets, given as `(fold, data)` in fold order.
    ///
    /// Hidden columns are dropped. Vector columns whose width or slot names
    /// differ between folds become variable-width, with a warning. Key
    /// columns are mapped into one key space and emitted as text. Fold 0
    /// defines the column order; every other fold must hold the same
    /// columns with the same types.
    pub fn merge(
        &self,
        folds: &[(usize, Dataset)],
        logger: &mut RunLogger,
    ) -> Result<MergedView, AggregateError> {
        let datasets: Vec<Dataset> = folds.iter().map(|(_, d)| without_hidden(d)).collect();
        let schemas: Vec<_> = datasets.iter().map(Dataset::schema).collect();

        let variable_length = scan_variable_length(&schemas);
        let (datasets, key_spaces) = reconcile_keys(datasets)?;
        let datasets = datasets
            .into_iter()
            .map(|d| make_length_tolerant(d, &variable_length))
            .collect::<Result<Vec<_>, _>>()?;

        let fold_ids: Vec<usize> = folds.iter().map(|(k, _)| *k).collect();
        let mut data = concat(&fold_ids, datasets)?;

        if self.fold_index_column {
            let index: Vec<f64> = folds
                .iter()
                .flat_map(|(k, d)| std::iter::repeat(*k as f64).take(d.n_rows()))
                .collect();
            let position = self.index_position(&data);
            data.insert_column(position, Column::numeric(FOLD_INDEX_COLUMN, index))?;
            // A fold-produced column of the same name is now shadowed.
            data.retain(|c| !c.is_hidden());
        }

        if !variable_length.is_empty() {
            let names: Vec<&str> = variable_length.iter().map(String::as_str).collect();
            logger.warn(format!(
                "vector columns {} have different widths across folds; they were merged as variable-length columns",
                names.join(", ")
            ));
        }

        Ok(MergedView {
            data,
            variable_length,
            key_spaces,
        })
    }

    /// Per-fold datasets with hidden columns dropped.
    pub fn per_fold(&self, folds: &[(usize, Dataset)]) -> Vec<(usize, Dataset)> {
        folds
            .iter()
            .map(|(k, d)| (*k, without_hidden(d)))
            .collect()
    }

    fn index_position(&self, data: &Dataset) -> usize {
        let anchor = self
            .anchor
            .as_deref()
            .and_then(|name| data.columns().iter().position(|c| c.name() == name));
        match anchor {
            Some(i) => i + 1,
            None => data.columns().len().min(1),
        }
    }
}

fn without_hidden(data: &Dataset) -> Dataset {
    let mut out = data.clone();
    out.retain(|c| !c.is_hidden());
    out
}

fn concat(fold_ids: &[usize], datasets: Vec<Dataset>) -> Result<Dataset, AggregateError> {
    let mut iter = fold_ids.iter().copied().zip(datasets);
    let Some((_, first)) = iter.next() else {
        return Ok(Dataset::empty(0));
    };

    let mut group_offsets = first.group_offsets().map(<[usize]>::to_vec);
    let mut n_rows = first.n_rows();
    let mut columns = first.into_columns();

    for (fold, data) in iter {
        for name in data.columns().iter().map(Column::name) {
            if !columns.iter().any(|c| c.name() == name) {
                return Err(AggregateError::ExtraColumn {
                    fold,
                    column: name.to_string(),
                });
            }
        }
        for col in &mut columns {
            let other = data
                .column(col.name())
                .ok_or_else(|| AggregateError::MissingColumn {
                    fold,
                    column: col.name().to_string(),
                })?;
            let expected = col.values().type_name();
            if col.values_mut().append(other.values()).is_err() {
                return Err(AggregateError::ColumnType {
                    column: col.name().to_string(),
                    fold,
                    expected,
                    found: other.values().type_name(),
                });
            }
        }

        group_offsets = match (group_offsets, data.group_offsets()) {
            (Some(mut acc), Some(offsets)) => {
                acc.extend(offsets.iter().skip(1).map(|o| o + n_rows));
                Some(acc)
            }
            _ => None,
        };
        n_rows += data.n_rows();
    }

    let mut merged = Dataset::empty(n_rows);
    for col in columns {
        merged.push_column(col)?;
    }
    match group_offsets {
        Some(offsets) => Ok(merged.with_groups(offsets)?),
        None => Ok(merged),
    }
}

// =============================================================================
// Persistence
// =============================================================================

/// Write `value` as JSON to `path`.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), AggregateError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Write each fold's dataset next to `base`, one file per fold.
pub fn write_per_fold(
    folds: &[(usize, Dataset)],
    base: &Path,
) -> Result<Vec<PathBuf>, AggregateError> {
    folds
        .iter()
        .map(|(k, data)| {
            let path = fold_artifact_path(base, *k);
            write_json(data, &path)?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ColumnValues;

    fn fold(name_prefix: &str, n: usize) -> Dataset {
        Dataset::new(vec![
            Column::text("Name", (0..n).map(|i| format!("{name_prefix}{i}")).collect()),
            Column::numeric("Score", vec![1.0; n]),
        ])
        .unwrap()
    }

    #[test]
    fn fold_index_follows_anchor() {
        let folds = vec![(0, fold("a", 2)), (1, fold("b", 3))];
        let mut logger = RunLogger::default();
        let view = ResultAggregator::new(true)
            .with_anchor("Name")
            .merge(&folds, &mut logger)
            .unwrap();

        let names: Vec<_> = view.data.columns().iter().map(Column::name).collect();
        assert_eq!(names, vec!["Name", FOLD_INDEX_COLUMN, "Score"]);
        assert_eq!(
            view.data.column(FOLD_INDEX_COLUMN).unwrap().as_numeric().unwrap(),
            &[0.0, 0.0, 1.0, 1.0, 1.0]
        );
        assert!(logger.warnings().is_empty());
    }

    #[test]
    fn fold_index_can_be_disabled() {
        let folds = vec![(0, fold("a", 1)), (1, fold("b", 1))];
        let view = ResultAggregator::new(false)
            .merge(&folds, &mut RunLogger::default())
            .unwrap();
        assert!(view.data.column(FOLD_INDEX_COLUMN).is_none());
        assert_eq!(view.data.n_rows(), 2);
    }

    #[test]
    fn hidden_columns_are_dropped() {
        let shadowed = fold("a", 2)
            .with_column(Column::numeric("Score", vec![2.0; 2]))
            .unwrap();
        let view = ResultAggregator::new(false)
            .merge(&[(0, shadowed)], &mut RunLogger::default())
            .unwrap();
        assert_eq!(view.data.columns().len(), 2);
        assert_eq!(
            view.data.column("Score").unwrap().values(),
            &ColumnValues::Numeric(vec![2.0, 2.0])
        );
    }

    #[test]
    fn fold_index_replaces_evaluator_column_of_same_name() {
        let with_index = |n: usize| {
            fold("a", n)
                .with_column(Column::numeric(FOLD_INDEX_COLUMN, vec![9.0; n]))
                .unwrap()
        };
        let view = ResultAggregator::default()
            .merge(&[(0, with_index(1)), (1, with_index(2))], &mut RunLogger::default())
            .unwrap();

        let names: Vec<_> = view.data.columns().iter().map(Column::name).collect();
        assert_eq!(names, vec!["Name", FOLD_INDEX_COLUMN, "Score"]);
        assert!(view.data.columns().iter().all(|c| !c.is_hidden()));
        assert_eq!(
            view.data.column(FOLD_INDEX_COLUMN).unwrap().as_numeric().unwrap(),
            &[0.0, 1.0, 1.0]
        );
    }

    #[test]
    fn missing_and_extra_columns_are_errors() {
        let short = Dataset::new(vec![Column::text("Name", vec!["x".into()])]).unwrap();
        let err = ResultAggregator::default()
            .merge(&[(0, fold("a", 1)), (1, short.clone())], &mut RunLogger::default())
            .unwrap_err();
        assert!(matches!(err, AggregateError::MissingColumn { fold: 1, .. }));

        let err = ResultAggregator::default()
            .merge(&[(0, short), (1, fold("a", 1))], &mut RunLogger::default())
            .unwrap_err();
        assert!(matches!(err, AggregateError::ExtraColumn { fold: 1, .. }));
    }

    #[test]
    fn type_mismatch_is_an_error() {
        let other = Dataset::new(vec![
            Column::text("Name", vec!["x".into()]),
            Column::text("Score", vec!["high".into()]),
        ])
        .unwrap();
        let err = ResultAggregator::default()
            .merge(&[(0, fold("a", 1)), (1, other)], &mut RunLogger::default())
            .unwrap_err();
        assert!(matches!(
            err,
            AggregateError::ColumnType { fold: 1, expected: "numeric", found: "text", .. }
        ));
    }

    #[test]
    fn groups_survive_when_every_fold_has_them() {
        let a = fold("a", 3).with_groups(vec![0, 1, 3]).unwrap();
        let b = fold("b", 2).with_groups(vec![0, 2]).unwrap();
        let view = ResultAggregator::new(false)
            .merge(&[(0, a), (1, b.clone())], &mut RunLogger::default())
            .unwrap();
        assert_eq!(view.data.group_offsets(), Some(&[0, 1, 3, 5][..]));

        let view = ResultAggregator::new(false)
            .merge(&[(0, fold("a", 3)), (1, b)], &mut RunLogger::default())
            .unwrap();
        assert!(!view.data.has_groups());
    }

    #[test]
    fn per_fold_files_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("results.json");
        let folds = vec![(0, fold("a", 1)), (1, fold("b", 2))];
        let paths = write_per_fold(&folds, &base).unwrap();

        assert_eq!(paths[1], dir.path().join("results.fold001.json"));
        let text = std::fs::read_to_string(&paths[1]).unwrap();
        let back: Dataset = serde_json::from_str(&text).unwrap();
        assert_eq!(back.n_rows(), 2);
    }
}
