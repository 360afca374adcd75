//! Named metric tables and cross-fold summaries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::{Column, Dataset, DatasetError};

/// Ordered `name -> value` metric table for one fold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsTable {
    entries: Vec<(String, f64)>,
}

impl MetricsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a metric, replacing an existing value with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for MetricsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value:.6}")?;
        }
        Ok(())
    }
}

impl FromIterator<(String, f64)> for MetricsTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, value) in iter {
            table.insert(name, value);
        }
        table
    }
}

/// Mean and population standard deviation of one metric across folds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub mean: f64,
    pub std_dev: f64,
    /// Number of folds that reported the metric.
    pub count: usize,
}

/// Per-metric statistics across folds, in first-seen metric order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    metrics: Vec<(String, MetricStats)>,
}

impl MetricsSummary {
    /// Summarize fold tables. Metrics missing from a fold are skipped for
    /// that fold.
    pub fn from_folds<'a, I>(folds: I) -> Self
    where
        I: IntoIterator<Item = &'a MetricsTable>,
    {
        let mut values: Vec<(String, Vec<f64>)> = Vec::new();
        for table in folds {
            for (name, value) in table.iter() {
                match values.iter_mut().find(|(n, _)| n == name) {
                    Some((_, v)) => v.push(value),
                    None => values.push((name.to_string(), vec![value])),
                }
            }
        }

        let metrics = values
            .into_iter()
            .map(|(name, v)| {
                let count = v.len();
                let mean = v.iter().sum::<f64>() / count as f64;
                let var = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;
                (
                    name,
                    MetricStats {
                        mean,
                        std_dev: var.sqrt(),
                        count,
                    },
                )
            })
            .collect();
        Self { metrics }
    }

    pub fn get(&self, name: &str) -> Option<&MetricStats> {
        self.metrics.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetricStats)> + '_ {
        self.metrics.iter().map(|(n, s)| (n, s))
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Collated metrics table: one row per fold, then `Average` and
    /// `Standard Deviation`, with a leading `Fold` text column.
    ///
    /// Missing fold values are `NaN`.
    pub fn to_dataset(&self, folds: &[MetricsTable]) -> Result<Dataset, DatasetError> {
        let mut labels: Vec<String> = (0..folds.len()).map(|k| format!("Fold {k}")).collect();
        labels.push("Average".to_string());
        labels.push("Standard Deviation".to_string());

        let mut columns = vec![Column::text("Fold", labels)];
        for (name, stats) in &self.metrics {
            let mut values: Vec<f64> = folds
                .iter()
                .map(|t| t.get(name).unwrap_or(f64::NAN))
                .collect();
            values.push(stats.mean);
            values.push(stats.std_dev);
            columns.push(Column::numeric(name.clone(), values));
        }
        Dataset::new(columns)
    }
}
