//! Domain types for EdgeLab

pub mod bar;
pub mod forecast;
pub mod idea;
pub mod trade;

pub use bar::{parse_timestamp, Bar};
pub use forecast::{ForecastDistribution, Side};
pub use idea::{AssetClass, TradeIdea};
pub use trade::{parse_trade_date, CloseReason, PaperTrade, TradeStatus};

/// Symbol type alias
pub type Symbol = String;
