//! Filter Engine.

use crate::domain::criteria::FilterCriteria;
use crate::domain::dataset::Dataset;
use crate::domain::listing::Listing;

/// Records satisfying every criterion, in their original order.
///
/// An empty exchange selection yields an empty dataset.
pub fn apply(dataset: &Dataset, criteria: &FilterCriteria) -> Dataset {
    let out = dataset.retain_view(|r| matches(r, criteria));
    tracing::debug!(
        input = dataset.len(),
        output = out.len(),
        exchanges = criteria.exchanges.len(),
        etf = ?criteria.etf,
        "applied filters"
    );
    out
}

pub fn matches(record: &Listing, criteria: &FilterCriteria) -> bool {
    criteria.exchanges.contains(&record.exchange)
        && criteria.etf.matches(&record.etf)
        && criteria
            .status
            .matches(record.financial_status.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::criteria::{EtfSelection, StatusSelection};
    use crate::ingest::fixture_dataset;
    use std::collections::BTreeSet;

    fn all_criteria_for(ds: &Dataset) -> Vec<FilterCriteria> {
        let exchange_sets: Vec<BTreeSet<String>> = vec![
            BTreeSet::new(),
            ["NYSE".to_string()].into_iter().collect(),
            ds.exchanges().into_iter().collect(),
        ];
        let mut statuses = vec![StatusSelection::All];
        statuses.extend(ds.financial_statuses().into_iter().map(StatusSelection::Only));

        let mut out = Vec::new();
        for exchanges in &exchange_sets {
            for etf in EtfSelection::OPTIONS {
                for status in &statuses {
                    out.push(FilterCriteria {
                        exchanges: exchanges.clone(),
                        etf,
                        status: status.clone(),
                    });
                }
            }
        }
        out
    }

    #[test]
    fn select_all_keeps_everything() {
        let ds = fixture_dataset();
        let out = apply(ds, &FilterCriteria::select_all(ds));
        assert_eq!(out.records(), ds.records());
    }

    #[test]
    fn empty_exchange_selection_yields_empty_dataset() {
        let ds = fixture_dataset();
        let mut c = FilterCriteria::select_all(ds);
        c.exchanges.clear();
        let out = apply(ds, &c);
        assert!(out.is_empty());
        assert_eq!(out.columns(), ds.columns());
    }

    #[test]
    fn filtering_is_idempotent_and_monotone() {
        let ds = fixture_dataset();
        for c in all_criteria_for(ds) {
            let once = apply(ds, &c);
            let twice = apply(&once, &c);
            assert_eq!(once, twice, "criteria {c:?}");
            assert!(once.len() <= ds.len());
        }
    }

    #[test]
    fn combines_all_predicates_and_preserves_order() {
        let ds = fixture_dataset();
        let c = FilterCriteria {
            exchanges: ["NASDAQ".to_string()].into_iter().collect(),
            etf: EtfSelection::N,
            status: StatusSelection::Only("Normal".to_string()),
        };
        let out = apply(ds, &c);
        let symbols: Vec<_> = out
            .records()
            .iter()
            .map(|r| r.symbol.as_deref().unwrap())
            .collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn does_not_mutate_input() {
        let ds = fixture_dataset().clone();
        let before = ds.clone();
        let mut c = FilterCriteria::select_all(&ds);
        c.etf = EtfSelection::Y;
        let _ = apply(&ds, &c);
        assert_eq!(ds, before);
    }
}
