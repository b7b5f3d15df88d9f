//! Declarative chart specs for the browser charting library.
//!
//! Each spec names the chart type, the columns mapped to x/y/color and carries the
//! already-grouped data, so the presentation layer only draws.

use crate::aggregate::Aggregation;
use crate::domain::dataset::Dataset;
use crate::domain::listing::{COL_ETF, COL_EXCHANGE, COL_FINANCIAL_STATUS, COL_ROUND_LOT_SIZE};
use crate::report::ChartLabels;
use crate::trend::TrendPoint;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Histogram,
    Box,
    Violin,
    Line,
    Bar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x: String,
    pub y: Option<String>,
    pub color: Option<String>,
    pub data: ChartData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartData {
    Counts { groups: Vec<GroupCount> },
    Summary { groups: Vec<FiveNumberSummary> },
    Points { groups: Vec<PointGroup> },
    Series { points: Vec<TrendPoint> },
    Values { groups: Vec<GroupValue> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiveNumberSummary {
    pub label: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointGroup {
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupValue {
    pub label: String,
    pub value: f64,
}

/// The dashboard's chart set over an already filtered dataset, in display order.
pub fn dashboard_charts(dataset: &Dataset, trend: &[TrendPoint]) -> Vec<ChartSpec> {
    vec![
        ChartSpec {
            kind: ChartKind::Histogram,
            title: "ETF Count".to_string(),
            x: COL_ETF.to_string(),
            y: None,
            color: Some(COL_ETF.to_string()),
            data: ChartData::Counts {
                groups: counts(dataset.records().iter().map(|r| r.etf.as_str())),
            },
        },
        ChartSpec {
            kind: ChartKind::Histogram,
            title: "Stocks by Exchange".to_string(),
            x: COL_EXCHANGE.to_string(),
            y: None,
            color: Some(COL_EXCHANGE.to_string()),
            data: ChartData::Counts {
                groups: counts(dataset.records().iter().map(|r| r.exchange.as_str())),
            },
        },
        ChartSpec {
            kind: ChartKind::Box,
            title: "Round Lot Size by Exchange".to_string(),
            x: COL_EXCHANGE.to_string(),
            y: Some(COL_ROUND_LOT_SIZE.to_string()),
            color: Some(COL_EXCHANGE.to_string()),
            data: ChartData::Summary {
                groups: group_values(
                    dataset
                        .records()
                        .iter()
                        .map(|r| (r.exchange.as_str(), r.round_lot_size)),
                )
                .into_iter()
                .filter_map(|(label, values)| five_number_summary(label, values))
                .collect(),
            },
        },
        ChartSpec {
            kind: ChartKind::Violin,
            title: "Round Lot Size by Financial Status".to_string(),
            x: COL_FINANCIAL_STATUS.to_string(),
            y: Some(COL_ROUND_LOT_SIZE.to_string()),
            color: Some(COL_FINANCIAL_STATUS.to_string()),
            data: ChartData::Points {
                groups: group_values(dataset.records().iter().filter_map(|r| {
                    r.financial_status
                        .as_deref()
                        .map(|s| (s, r.round_lot_size))
                }))
                .into_iter()
                .map(|(label, values)| PointGroup { label, values })
                .collect(),
            },
        },
        ChartSpec {
            kind: ChartKind::Line,
            title: "Simulated Stock Price Trend".to_string(),
            x: "Date".to_string(),
            y: Some("Price".to_string()),
            color: None,
            data: ChartData::Series {
                points: trend.to_vec(),
            },
        },
    ]
}

/// Bar spec mirroring the emailed report, for on-page preview.
pub fn aggregation_chart(aggregation: &Aggregation, labels: &ChartLabels) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::Bar,
        title: labels.title.clone(),
        x: labels.x_label.clone(),
        y: Some(labels.y_label.clone()),
        color: None,
        data: ChartData::Values {
            groups: aggregation
                .means
                .iter()
                .map(|(label, value)| GroupValue {
                    label: label.clone(),
                    value: *value,
                })
                .collect(),
        },
    }
}

fn counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<GroupCount> {
    let mut out: IndexMap<&str, usize> = IndexMap::new();
    for v in values {
        *out.entry(v).or_default() += 1;
    }
    out.into_iter()
        .map(|(label, count)| GroupCount {
            label: label.to_string(),
            count,
        })
        .collect()
}

fn group_values<'a>(pairs: impl Iterator<Item = (&'a str, f64)>) -> Vec<(String, Vec<f64>)> {
    let mut out: IndexMap<&str, Vec<f64>> = IndexMap::new();
    for (label, v) in pairs {
        out.entry(label).or_default().push(v);
    }
    out.into_iter()
        .map(|(label, values)| (label.to_string(), values))
        .collect()
}

fn five_number_summary(label: String, mut values: Vec<f64>) -> Option<FiveNumberSummary> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    Some(FiveNumberSummary {
        label,
        count: values.len(),
        min: values[0],
        q1: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q3: quantile(&values, 0.75),
        max: values[values.len() - 1],
    })
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
