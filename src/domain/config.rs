//! Typed, validated application configuration.
//!
//! Built from any [`ConfigPort`]; every value is checked before the pipeline
//! is assembled so misconfiguration fails at startup, not per request.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::detector::DetectorConfig;
use crate::domain::error::TradeError;
use crate::domain::execution::RetryPolicy;
use crate::domain::signal::{SignalLevels, SignalSettings};
use crate::domain::sizing::{RiskSettings, round_lots};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8000";

#[derive(Debug, Clone, PartialEq)]
pub struct BrokerSettings {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub listen: String,
    pub csv_dir: PathBuf,
    pub model_path: PathBuf,
    pub feature_window: usize,
    pub broker: BrokerSettings,
    pub risk: RiskSettings,
    pub detector: DetectorConfig,
    pub signal: SignalSettings,
}

impl AppConfig {
    pub fn from_port(config: &dyn ConfigPort) -> Result<Self, TradeError> {
        Ok(AppConfig {
            listen: config
                .get_string("web", "listen")
                .unwrap_or_else(|| DEFAULT_LISTEN.to_string()),
            csv_dir: PathBuf::from(required_string(config, "data", "csv_dir")?),
            model_path: PathBuf::from(required_string(config, "classifier", "model_path")?),
            feature_window: positive_int(config, "classifier", "feature_window", 60)? as usize,
            broker: broker_settings(config)?,
            risk: risk_settings(config)?,
            detector: detector_config(config)?,
            signal: signal_settings(config)?,
        })
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TradeError {
    TradeError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn required_string(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, TradeError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(TradeError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<u64, TradeError> {
    let value = config.get_int(section, key, default);
    if value <= 0 {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    Ok(value as u64)
}

fn positive_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, TradeError> {
    let value = config.get_double(section, key, default);
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    Ok(value)
}

fn broker_settings(config: &dyn ConfigPort) -> Result<BrokerSettings, TradeError> {
    let endpoint = required_string(config, "broker", "endpoint")?;
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(invalid(
            "broker",
            "endpoint",
            "endpoint must be an http(s) URL",
        ));
    }
    let api_key = required_string(config, "broker", "api_key")?;

    let timeout_ms = positive_int(config, "broker", "timeout_ms", 5_000)?;
    let max_attempts = positive_int(config, "broker", "max_attempts", 3)?;
    if max_attempts > 10 {
        return Err(invalid(
            "broker",
            "max_attempts",
            "max_attempts must be between 1 and 10",
        ));
    }
    let base_ms = config.get_int("broker", "backoff_base_ms", 200);
    let max_ms = config.get_int("broker", "backoff_max_ms", 2_000);
    if base_ms < 0 || max_ms < base_ms {
        return Err(invalid(
            "broker",
            "backoff_max_ms",
            "backoff delays must satisfy 0 <= backoff_base_ms <= backoff_max_ms",
        ));
    }

    Ok(BrokerSettings {
        endpoint,
        api_key,
        timeout: Duration::from_millis(timeout_ms),
        retry: RetryPolicy {
            max_attempts: max_attempts as u32,
            base_delay: Duration::from_millis(base_ms as u64),
            max_delay: Duration::from_millis(max_ms as u64),
        },
    })
}

fn risk_settings(config: &dyn ConfigPort) -> Result<RiskSettings, TradeError> {
    let risk_pct = config.get_double("risk", "risk_pct", 1.5);
    if !risk_pct.is_finite() || risk_pct <= 0.0 || risk_pct > 100.0 {
        return Err(invalid("risk", "risk_pct", "risk_pct must be in (0, 100]"));
    }
    let max_lot_size = match config.get_double("risk", "max_lot_size", 0.0) {
        cap if cap == 0.0 => None,
        cap if cap.is_finite() && round_lots(cap) > 0.0 => Some(cap),
        _ => {
            return Err(invalid(
                "risk",
                "max_lot_size",
                "max_lot_size must be at least 0.01 (0 disables the cap)",
            ));
        }
    };
    Ok(RiskSettings {
        risk_pct,
        max_lot_size,
    })
}

fn detector_config(config: &dyn ConfigPort) -> Result<DetectorConfig, TradeError> {
    let defaults = DetectorConfig::default();
    let min_gap_pct = config.get_double("detector", "min_gap_pct", defaults.min_gap_pct);
    if !min_gap_pct.is_finite() || min_gap_pct < 0.0 {
        return Err(invalid(
            "detector",
            "min_gap_pct",
            "min_gap_pct must be non-negative",
        ));
    }
    Ok(DetectorConfig {
        swing_length: positive_int(
            config,
            "detector",
            "swing_length",
            defaults.swing_length as i64,
        )? as usize,
        order_block_lookback: positive_int(
            config,
            "detector",
            "order_block_lookback",
            defaults.order_block_lookback as i64,
        )? as usize,
        fvg_lookback: positive_int(
            config,
            "detector",
            "fvg_lookback",
            defaults.fvg_lookback as i64,
        )? as usize,
        min_gap_pct,
    })
}

fn levels(
    config: &dyn ConfigPort,
    section: &str,
    fallback: SignalLevels,
) -> Result<SignalLevels, TradeError> {
    Ok(SignalLevels {
        stop_loss_pips: positive_double(config, section, "stop_loss_pips", fallback.stop_loss_pips)?,
        take_profit_pips: positive_double(
            config,
            section,
            "take_profit_pips",
            fallback.take_profit_pips,
        )?,
    })
}

fn signal_settings(config: &dyn ConfigPort) -> Result<SignalSettings, TradeError> {
    let defaults = SignalSettings::default();
    let default_levels = levels(config, "signal", defaults.default_levels)?;

    // [signal.xauusd] and [signal.xauusd.15m]; the more specific section
    // inherits from the symbol one
    let mut override_sections: Vec<String> = config
        .sections()
        .into_iter()
        .filter(|s| s.starts_with("signal."))
        .collect();
    override_sections.sort_by_key(|s| s.matches('.').count());

    let mut level_overrides = HashMap::new();
    for section in override_sections {
        let key = section["signal.".len()..].to_lowercase();
        let parent = key
            .split_once('.')
            .and_then(|(symbol, _)| level_overrides.get(symbol).copied())
            .unwrap_or(default_levels);
        level_overrides.insert(key, levels(config, &section, parent)?);
    }

    let default_pip_value =
        positive_double(config, "pip_values", "default", defaults.default_pip_value)?;
    let mut pip_values = HashMap::new();
    for key in config.keys("pip_values") {
        if key == "default" {
            continue;
        }
        let value = positive_double(config, "pip_values", &key, default_pip_value)?;
        pip_values.insert(key.to_lowercase(), value);
    }

    Ok(SignalSettings {
        default_levels,
        level_overrides,
        default_pip_value,
        pip_values,
    })
}
