//! Aggregator: per-exchange means for the emailed report.

use crate::domain::dataset::Dataset;
use crate::domain::listing::NumericColumn;
use crate::error::{DashboardError, Result};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    pub column: NumericColumn,
    /// Exchange to mean, in first-appearance order of the exchange.
    pub means: IndexMap<String, f64>,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    pub fn len(&self) -> usize {
        self.means.len()
    }
}

/// Groups by exchange and averages `column`, skipping records where the value is missing.
///
/// Exchanges without any value are absent from the result.
pub fn mean_by_exchange(dataset: &Dataset, column: NumericColumn) -> Result<Aggregation> {
    if dataset.is_empty() {
        return Err(DashboardError::EmptyAggregation);
    }

    let mut sums: IndexMap<&str, (f64, usize)> = IndexMap::new();
    for record in dataset.records() {
        let Some(v) = column.value(record) else {
            continue;
        };
        let entry = sums.entry(record.exchange.as_str()).or_insert((0.0, 0));
        entry.0 += v;
        entry.1 += 1;
    }

    let means = sums
        .into_iter()
        .map(|(exchange, (sum, n))| (exchange.to_string(), sum / n as f64))
        .collect();

    Ok(Aggregation { column, means })
}
