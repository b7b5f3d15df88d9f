use crate::domain::dataset::Dataset;
use crate::domain::listing::{
    Listing, COL_ETF, COL_EXCHANGE, COL_FINANCIAL_STATUS, COL_MARKET_CAP, COL_ROUND_LOT_SIZE,
    COL_SYMBOL,
};
use crate::error::{DashboardError, Result};
use encoding_rs::{Encoding, UTF_8};
use std::borrow::Cow;

const REQUIRED_COLUMNS: [&str; 3] = [COL_EXCHANGE, COL_ROUND_LOT_SIZE, COL_ETF];

struct ColumnIndex {
    exchange: usize,
    round_lot_size: usize,
    etf: usize,
    symbol: Option<usize>,
    financial_status: Option<usize>,
    market_cap: Option<usize>,
}

impl ColumnIndex {
    fn resolve(columns: &[String]) -> Result<Self> {
        let find = |name: &str| columns.iter().position(|c| c == name);

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|name| find(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(DashboardError::MalformedInput(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        // Presence checked above.
        let required = |name: &str| find(name).unwrap_or_default();
        Ok(Self {
            exchange: required(COL_EXCHANGE),
            round_lot_size: required(COL_ROUND_LOT_SIZE),
            etf: required(COL_ETF),
            symbol: find(COL_SYMBOL),
            financial_status: find(COL_FINANCIAL_STATUS),
            market_cap: find(COL_MARKET_CAP),
        })
    }
}

/// Parses uploaded CSV bytes into a normalized dataset.
///
/// Rows whose `Round Lot Size` does not coerce to a finite number are dropped.
/// A header without the required columns, or a row with the wrong number of fields,
/// rejects the whole upload.
pub fn parse_csv(bytes: &[u8]) -> Result<Dataset> {
    let text = decode_text(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| DashboardError::MalformedInput(format!("unreadable header row: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let idx = ColumnIndex::resolve(&columns)?;

    let mut records = Vec::new();
    let mut dropped: usize = 0;
    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            // Header is line 1; data rows start at line 2.
            DashboardError::MalformedInput(format!("row {}: {e}", row + 2))
        })?;

        let Some(round_lot_size) = parse_number(record.get(idx.round_lot_size)) else {
            dropped += 1;
            continue;
        };

        records.push(Listing {
            symbol: idx.symbol.and_then(|i| non_empty(record.get(i))),
            exchange: record.get(idx.exchange).unwrap_or_default().to_string(),
            round_lot_size,
            etf: record.get(idx.etf).unwrap_or_default().to_string(),
            financial_status: idx.financial_status.and_then(|i| non_empty(record.get(i))),
            market_cap: idx.market_cap.and_then(|i| parse_number(record.get(i))),
        });
    }

    if dropped > 0 {
        tracing::info!(
            dropped,
            kept = records.len(),
            "dropped rows with non-numeric round lot size"
        );
    }

    Ok(Dataset::new(columns, records))
}

/// BOM-sniffing decode; input without a BOM is treated as UTF-8.
fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => encoding
            .decode_without_bom_handling(&bytes[bom_len..])
            .0,
        None => UTF_8.decode_without_bom_handling(bytes).0,
    }
}

fn non_empty(cell: Option<&str>) -> Option<String> {
    cell.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_number(cell: Option<&str>) -> Option<f64> {
    let t = cell?.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Symbol,Listing Exchange,Round Lot Size,ETF,Financial Status";

    #[test]
    fn drops_exactly_the_non_numeric_round_lot_row() {
        let csv = format!(
            "{HEADER}\nAAA,NYSE,100,N,Normal\nBBB,NYSE,abc,N,Normal\nCCC,NASDAQ,50,Y,Normal\n"
        );
        let ds = parse_csv(csv.as_bytes()).unwrap();
        let symbols: Vec<_> = ds
            .records()
            .iter()
            .map(|r| r.symbol.as_deref().unwrap())
            .collect();
        assert_eq!(symbols, vec!["AAA", "CCC"]);
        assert_eq!(ds.records()[0].round_lot_size, 100.0);
        assert_eq!(ds.records()[1].round_lot_size, 50.0);
    }

    #[test]
    fn missing_round_lot_column_is_malformed() {
        let csv = "Symbol,Listing Exchange,ETF\nAAA,NYSE,N\n";
        let err = parse_csv(csv.as_bytes()).unwrap_err();
        match err {
            DashboardError::MalformedInput(msg) => assert!(msg.contains("Round Lot Size")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_malformed() {
        assert!(matches!(
            parse_csv(b""),
            Err(DashboardError::MalformedInput(_))
        ));
    }

    #[test]
    fn financial_status_column_is_optional() {
        let csv = "Listing Exchange,Round Lot Size,ETF\nNYSE,100,N\n";
        let ds = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records()[0].financial_status, None);
        assert_eq!(ds.records()[0].symbol, None);
        assert!(ds.financial_statuses().is_empty());
    }

    #[test]
    fn blank_status_cells_are_missing() {
        let csv = format!("{HEADER}\nAAA,NYSE,100,N,\nBBB,NYSE,100,N,Deficient\n");
        let ds = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(ds.records()[0].financial_status, None);
        assert_eq!(ds.financial_statuses(), vec!["Deficient"]);
    }

    #[test]
    fn non_finite_and_blank_lot_sizes_are_dropped() {
        let csv = format!("{HEADER}\nA,NYSE,NaN,N,Normal\nB,NYSE,,N,Normal\nC,NYSE,inf,N,Normal\nD,NYSE,1e2,N,Normal\n");
        let ds = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records()[0].round_lot_size, 100.0);
    }

    #[test]
    fn bad_market_cap_keeps_the_row() {
        let csv = "Listing Exchange,Round Lot Size,ETF,Market Cap\nNYSE,100,N,n/a\nNYSE,100,N,2.5e9\n";
        let ds = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records()[0].market_cap, None);
        assert_eq!(ds.records()[1].market_cap, Some(2.5e9));
    }

    #[test]
    fn ragged_rows_reject_the_upload() {
        let csv = format!("{HEADER}\nAAA,NYSE,100,N\n");
        assert!(matches!(
            parse_csv(csv.as_bytes()),
            Err(DashboardError::MalformedInput(_))
        ));
    }

    #[test]
    fn strips_utf8_bom_and_header_padding() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b" Listing Exchange , Round Lot Size ,ETF\nNYSE, 100 ,N\n");
        let ds = parse_csv(&bytes).unwrap();
        assert_eq!(ds.columns()[0], "Listing Exchange");
        assert_eq!(ds.records()[0].exchange, "NYSE");
        assert_eq!(ds.records()[0].round_lot_size, 100.0);
    }

    #[test]
    fn decodes_utf16le_exports() {
        let text = "Listing Exchange,Round Lot Size,ETF\nNYSE,100,N\n";
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let ds = parse_csv(&bytes).unwrap();
        assert_eq!(ds.len(), 1);
    }
}
