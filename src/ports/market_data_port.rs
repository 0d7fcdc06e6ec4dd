//! Market data access port.

use crate::domain::error::TradeError;
use crate::domain::ohlcv::Bar;

pub trait MarketDataPort {
    /// Bars for `symbol` on `timeframe`, oldest first, strictly increasing
    /// timestamps.
    fn load_ohlcv(&self, symbol: &str, timeframe: &str) -> Result<Vec<Bar>, TradeError>;
}
