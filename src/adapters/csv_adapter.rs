//! CSV file market data adapter.

use crate::domain::error::TradeError;
use crate::domain::ohlcv::{is_strictly_increasing, Bar};
use crate::ports::market_data_port::MarketDataPort;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Reads `<base_path>/<SYMBOL>_<timeframe>.csv` with the header
/// `timestamp,open,high,low,close,volume`.
pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, timeframe: &str) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", symbol.to_uppercase(), timeframe))
    }

    /// Lists `(symbol, timeframe)` pairs with a data file.
    pub fn list_series(&self) -> Result<Vec<(String, String)>, TradeError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TradeError::MarketData {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut series = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TradeError::MarketData {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let pair = name
                .strip_suffix(".csv")
                .and_then(|stem| stem.rsplit_once('_'));
            if let Some((symbol, timeframe)) = pair {
                series.push((symbol.to_string(), timeframe.to_string()));
            }
        }
        series.sort();
        Ok(series)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TradeError> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).ok_or_else(|| TradeError::MarketData {
            reason: format!("unix timestamp out of range: {}", raw),
        });
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TradeError::MarketData {
            reason: format!("invalid timestamp '{}': {}", raw, e),
        })
}

fn parse_price(record: &csv::StringRecord, index: usize, column: &str) -> Result<f64, TradeError> {
    let value: f64 = record
        .get(index)
        .ok_or_else(|| TradeError::MarketData {
            reason: format!("missing {} column", column),
        })?
        .trim()
        .parse()
        .map_err(|e| TradeError::MarketData {
            reason: format!("invalid {} value: {}", column, e),
        })?;
    if !value.is_finite() {
        return Err(TradeError::MarketData {
            reason: format!("non-finite {} value", column),
        });
    }
    Ok(value)
}

impl MarketDataPort for CsvAdapter {
    fn load_ohlcv(&self, symbol: &str, timeframe: &str) -> Result<Vec<Bar>, TradeError> {
        let path = self.csv_path(symbol, timeframe);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TradeError::NoData {
                    symbol: symbol.to_string(),
                    timeframe: timeframe.to_string(),
                });
            }
            Err(e) => {
                return Err(TradeError::MarketData {
                    reason: format!("failed to read {}: {}", path.display(), e),
                });
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| TradeError::MarketData {
                reason: format!("CSV parse error: {}", e),
            })?;

            let timestamp = parse_timestamp(record.get(0).ok_or_else(|| {
                TradeError::MarketData {
                    reason: "missing timestamp column".into(),
                }
            })?)?;

            bars.push(Bar {
                timestamp,
                open: parse_price(&record, 1, "open")?,
                high: parse_price(&record, 2, "high")?,
                low: parse_price(&record, 3, "low")?,
                close: parse_price(&record, 4, "close")?,
                volume: parse_price(&record, 5, "volume")?,
            });
        }

        if bars.is_empty() {
            return Err(TradeError::NoData {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        if !is_strictly_increasing(&bars) {
            return Err(TradeError::MarketData {
                reason: format!("duplicate timestamps in {}", path.display()),
            });
        }

        tracing::debug!(
            symbol,
            timeframe,
            bars = bars.len(),
            path = %path.display(),
            "loaded market data"
        );
        Ok(bars)
    }
}
