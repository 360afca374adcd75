//! Schema reconciliation across folds.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;

use super::AggregateError;
use crate::data::{Column, ColumnValues, Dataset, Schema, Width};

/// Names of vector columns whose width or slot names differ between folds.
///
/// The width of the first fold holding a column is the reference; any later
/// fold disagreeing marks the column. Columns that are already ragged are
/// always marked.
pub fn scan_variable_length(schemas: &[Schema]) -> BTreeSet<String> {
    let mut first_seen: BTreeMap<&str, (Width, Option<&[String]>)> = BTreeMap::new();
    let mut variable = BTreeSet::new();

    for schema in schemas {
        for desc in schema.visible().filter(|d| d.width.is_vector()) {
            let seen = (desc.width, desc.slot_names.as_deref());
            if desc.width == Width::Variable {
                variable.insert(desc.name.clone());
            }
            match first_seen.get(desc.name.as_str()) {
                None => {
                    first_seen.insert(&desc.name, seen);
                }
                Some(first) if *first != seen => {
                    variable.insert(desc.name.clone());
                }
                Some(_) => {}
            }
        }
    }
    variable
}

/// Unify the key space of every key-typed column across folds and replace
/// those columns with their text values.
///
/// Key names are ordered by first appearance, fold 0 first. Returns the
/// unified key names per column. Missing keys become empty strings.
pub fn reconcile_keys(
    folds: Vec<Dataset>,
) -> Result<(Vec<Dataset>, BTreeMap<String, Vec<String>>), AggregateError> {
    let mut spaces: BTreeMap<String, KeySpace> = BTreeMap::new();
    for fold in &folds {
        for col in fold.visible_columns() {
            if let Some(names) = col.values().key_names() {
                spaces
                    .entry(col.name().to_string())
                    .or_default()
                    .extend(names);
            }
        }
    }

    let folds = folds
        .into_iter()
        .map(|fold| {
            fold.map_columns(|col| match spaces.get(col.name()) {
                Some(space) if !col.is_hidden() => space.to_text(col),
                _ => Ok::<_, AggregateError>(col),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let names = spaces
        .into_iter()
        .map(|(column, space)| (column, space.names))
        .collect();
    Ok((folds, names))
}

/// Union of key names in first-seen order.
#[derive(Debug, Default)]
struct KeySpace {
    names: Vec<String>,
    index: FxHashMap<String, u32>,
}

impl KeySpace {
    fn extend(&mut self, names: &[String]) {
        for name in names {
            if !self.index.contains_key(name) {
                self.index.insert(name.clone(), self.names.len() as u32 + 1);
                self.names.push(name.clone());
            }
        }
    }

    /// Map a fold-local key (1-based, 0 = missing) into this space.
    ///
    /// Keys must already be checked against `local`.
    fn remap(&self, local: &[String], key: u32) -> u32 {
        match key {
            0 => 0,
            k => self.index[&local[k as usize - 1]],
        }
    }

    fn text(&self, key: u32) -> String {
        match key {
            0 => String::new(),
            k => self.names[k as usize - 1].clone(),
        }
    }

    fn to_text(&self, col: Column) -> Result<Column, AggregateError> {
        col.validate_keys()?;
        let (name, values, slot_names) = col.into_parts();
        let values = match values {
            ColumnValues::Key { keys, names } => ColumnValues::Text(
                keys.iter()
                    .map(|&k| self.text(self.remap(&names, k)))
                    .collect(),
            ),
            ColumnValues::KeyVector { keys, names } => ColumnValues::TextVector(
                keys.map(|&k| self.text(self.remap(&names, k))),
            ),
            other => other,
        };
        let col = Column::new(name, values);
        Ok(match slot_names {
            Some(slots) => col.with_slot_names(slots),
            None => col,
        })
    }
}

/// Convert the named columns to the length-tolerant vector layout.
pub fn make_length_tolerant(
    fold: Dataset,
    variable: &BTreeSet<String>,
) -> Result<Dataset, AggregateError> {
    fold.map_columns(|col| {
        if !variable.contains(col.name()) {
            return Ok::<_, AggregateError>(col);
        }
        let values = col.values().clone().into_length_tolerant();
        Ok(col.with_values(values).without_slot_names())
    })
}
