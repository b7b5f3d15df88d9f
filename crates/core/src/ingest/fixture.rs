use crate::domain::dataset::Dataset;
use crate::domain::listing::{
    Listing, COL_ETF, COL_EXCHANGE, COL_FINANCIAL_STATUS, COL_MARKET_CAP, COL_ROUND_LOT_SIZE,
    COL_SYMBOL,
};
use once_cell::sync::Lazy;
use std::sync::Arc;

// (symbol, exchange, round lot size, etf, financial status, market cap in USD)
const ROWS: [(&str, &str, f64, &str, &str, f64); 10] = [
    ("AAPL", "NASDAQ", 100.0, "N", "Normal", 2.95e12),
    ("MSFT", "NASDAQ", 100.0, "N", "Normal", 3.10e12),
    ("QQQ", "NASDAQ", 100.0, "Y", "Normal", 2.60e11),
    ("SIRI", "NASDAQ", 50.0, "N", "Deficient", 9.50e9),
    ("TLT", "NASDAQ", 100.0, "Y", "Normal", 5.80e10),
    ("IBM", "NYSE", 100.0, "N", "Normal", 1.70e11),
    ("KO", "NYSE", 100.0, "N", "Normal", 2.60e11),
    ("SPY", "NYSE", 100.0, "Y", "Normal", 5.00e11),
    ("BRK.A", "NYSE", 10.0, "N", "Normal", 8.90e11),
    ("GME", "NYSE", 100.0, "N", "Deficient", 7.20e9),
];

static FIXTURE: Lazy<Arc<Dataset>> = Lazy::new(|| {
    let columns = [
        COL_SYMBOL,
        COL_EXCHANGE,
        COL_ROUND_LOT_SIZE,
        COL_ETF,
        COL_FINANCIAL_STATUS,
        COL_MARKET_CAP,
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();

    let records = ROWS
        .iter()
        .map(|&(symbol, exchange, lot, etf, status, cap)| Listing {
            symbol: Some(symbol.to_string()),
            exchange: exchange.to_string(),
            round_lot_size: lot,
            etf: etf.to_string(),
            financial_status: Some(status.to_string()),
            market_cap: Some(cap),
        })
        .collect();

    Arc::new(Dataset::new(columns, records))
});

/// The built-in dataset, built once per process.
pub fn fixture_dataset() -> &'static Dataset {
    &FIXTURE
}

pub(crate) fn shared() -> Arc<Dataset> {
    Arc::clone(&FIXTURE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_spans_two_exchanges_with_every_column_populated() {
        let ds = fixture_dataset();
        assert_eq!(ds.len(), 10);
        assert_eq!(ds.exchanges(), vec!["NASDAQ", "NYSE"]);
        assert!(ds.has_column(COL_MARKET_CAP));
        for r in ds.records() {
            assert!(r.symbol.is_some());
            assert!(r.financial_status.is_some());
            assert!(r.market_cap.is_some());
            assert!(r.round_lot_size.is_finite());
        }
    }

    #[test]
    fn shared_handle_points_at_the_memoized_dataset() {
        assert!(std::ptr::eq(&*shared(), fixture_dataset()));
    }
}
