use crate::domain::dataset::Dataset;
use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const ALL: &str = "All";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EtfSelection {
    #[default]
    All,
    Y,
    N,
}

impl EtfSelection {
    pub const OPTIONS: [EtfSelection; 3] = [Self::All, Self::Y, Self::N];

    pub fn matches(self, etf: &str) -> bool {
        match self {
            Self::All => true,
            Self::Y => etf == "Y",
            Self::N => etf == "N",
        }
    }
}

impl std::str::FromStr for EtfSelection {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "All" | "all" => Ok(Self::All),
            "Y" | "y" => Ok(Self::Y),
            "N" | "n" => Ok(Self::N),
            other => Err(DashboardError::validation(
                "etf",
                format!("expected one of All, Y, N (got {other:?})"),
            )),
        }
    }
}

/// `All`, or one specific financial status. Serialized as a plain string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatusSelection {
    #[default]
    All,
    Only(String),
}

impl StatusSelection {
    /// A record with no status never matches a specific selection.
    pub fn matches(&self, status: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => status == Some(wanted.as_str()),
        }
    }
}

impl From<String> for StatusSelection {
    fn from(s: String) -> Self {
        if s == ALL {
            Self::All
        } else {
            Self::Only(s)
        }
    }
}

impl From<StatusSelection> for String {
    fn from(s: StatusSelection) -> Self {
        match s {
            StatusSelection::All => ALL.to_string(),
            StatusSelection::Only(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub exchanges: BTreeSet<String>,
    #[serde(default)]
    pub etf: EtfSelection,
    #[serde(default)]
    pub status: StatusSelection,
}

impl FilterCriteria {
    /// Initial selector state: every exchange selected, no ETF or status restriction.
    pub fn select_all(dataset: &Dataset) -> Self {
        Self {
            exchanges: dataset.exchanges().into_iter().collect(),
            etf: EtfSelection::All,
            status: StatusSelection::All,
        }
    }

    /// Rejects a status selection that the selector could not have offered.
    pub fn validate_against(&self, options: &DashboardOptions) -> Result<()> {
        if let StatusSelection::Only(wanted) = &self.status {
            if !options.statuses.iter().any(|s| s == wanted) {
                return Err(DashboardError::validation(
                    "status",
                    format!("{wanted:?} is not a financial status in this dataset"),
                ));
            }
        }
        Ok(())
    }
}

/// Selector choices derived from a freshly loaded dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardOptions {
    pub exchanges: Vec<String>,
    pub etf: Vec<EtfSelection>,
    /// `All` followed by the distinct statuses present.
    pub statuses: Vec<String>,
}

impl DashboardOptions {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut statuses = vec![ALL.to_string()];
        statuses.extend(dataset.financial_statuses());
        Self {
            exchanges: dataset.exchanges(),
            etf: EtfSelection::OPTIONS.to_vec(),
            statuses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixture_dataset;

    #[test]
    fn status_selection_round_trips_through_plain_strings() {
        let all: StatusSelection = serde_json::from_str("\"All\"").unwrap();
        assert_eq!(all, StatusSelection::All);

        let only: StatusSelection = serde_json::from_str("\"Normal\"").unwrap();
        assert_eq!(only, StatusSelection::Only("Normal".to_string()));
        assert_eq!(serde_json::to_string(&only).unwrap(), "\"Normal\"");
    }

    #[test]
    fn missing_status_never_matches_specific_selection() {
        let sel = StatusSelection::Only("Normal".to_string());
        assert!(!sel.matches(None));
        assert!(sel.matches(Some("Normal")));
        assert!(StatusSelection::All.matches(None));
    }

    #[test]
    fn etf_selection_parses_form_values() {
        assert_eq!("All".parse::<EtfSelection>().unwrap(), EtfSelection::All);
        assert_eq!("Y".parse::<EtfSelection>().unwrap(), EtfSelection::Y);
        assert!(matches!(
            "maybe".parse::<EtfSelection>(),
            Err(DashboardError::Validation { field: "etf", .. })
        ));
    }

    #[test]
    fn options_list_all_then_statuses_in_first_appearance_order() {
        let ds = fixture_dataset();
        let opts = DashboardOptions::from_dataset(ds);
        assert_eq!(opts.exchanges, vec!["NASDAQ".to_string(), "NYSE".to_string()]);
        assert_eq!(opts.statuses[0], ALL);
        assert!(opts.statuses.len() > 1);
    }

    #[test]
    fn criteria_deserializes_with_defaults() {
        let c: FilterCriteria = serde_json::from_str(r#"{"exchanges": ["NYSE"]}"#).unwrap();
        assert_eq!(c.etf, EtfSelection::All);
        assert_eq!(c.status, StatusSelection::All);
        assert!(c.exchanges.contains("NYSE"));
    }

    #[test]
    fn rejects_status_not_offered_by_options() {
        let ds = fixture_dataset();
        let opts = DashboardOptions::from_dataset(ds);
        let mut c = FilterCriteria::select_all(ds);
        c.status = StatusSelection::Only("Bankrupt".to_string());
        assert!(c.validate_against(&opts).is_err());

        c.status = StatusSelection::Only(opts.statuses[1].clone());
        assert!(c.validate_against(&opts).is_ok());
    }
}
