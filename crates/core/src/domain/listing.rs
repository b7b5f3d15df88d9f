use serde::{Deserialize, Serialize};

pub const COL_SYMBOL: &str = "Symbol";
pub const COL_EXCHANGE: &str = "Listing Exchange";
pub const COL_ROUND_LOT_SIZE: &str = "Round Lot Size";
pub const COL_ETF: &str = "ETF";
pub const COL_FINANCIAL_STATUS: &str = "Financial Status";
pub const COL_MARKET_CAP: &str = "Market Cap";

/// One security's metadata row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub symbol: Option<String>,
    pub exchange: String,
    pub round_lot_size: f64,
    /// `Y` or `N` in well-formed input; kept verbatim otherwise.
    pub etf: String,
    pub financial_status: Option<String>,
    pub market_cap: Option<f64>,
}

/// Numeric columns that can be averaged per exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericColumn {
    #[serde(rename = "Round Lot Size")]
    RoundLotSize,
    #[serde(rename = "Market Cap")]
    MarketCap,
}

impl NumericColumn {
    pub fn name(self) -> &'static str {
        match self {
            Self::RoundLotSize => COL_ROUND_LOT_SIZE,
            Self::MarketCap => COL_MARKET_CAP,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            COL_ROUND_LOT_SIZE => Some(Self::RoundLotSize),
            COL_MARKET_CAP => Some(Self::MarketCap),
            _ => None,
        }
    }

    pub fn value(self, listing: &Listing) -> Option<f64> {
        match self {
            Self::RoundLotSize => Some(listing.round_lot_size),
            Self::MarketCap => listing.market_cap,
        }
    }
}

impl std::fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
