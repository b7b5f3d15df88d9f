use crate::domain::listing::Listing;
use serde::Serialize;

/// Ordered listing records sharing the header schema they were loaded with.
///
/// Every record's round lot size is a finite number; rows that failed coercion are
/// dropped by the loader before a `Dataset` exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<Listing>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, records: Vec<Listing>) -> Self {
        Self { columns, records }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn records(&self) -> &[Listing] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// New dataset with the same schema holding only the records `keep` accepts.
    pub fn retain_view<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Listing) -> bool,
    {
        Self {
            columns: self.columns.clone(),
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Distinct exchanges in first-appearance order.
    pub fn exchanges(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.exchange.as_str()))
    }

    /// Distinct non-missing financial statuses in first-appearance order.
    pub fn financial_statuses(&self) -> Vec<String> {
        distinct(
            self.records
                .iter()
                .filter_map(|r| r.financial_status.as_deref()),
        )
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        if !out.iter().any(|seen| seen == v) {
            out.push(v.to_string());
        }
    }
    out
}
