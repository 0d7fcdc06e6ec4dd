//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive and reported lowercase.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(|e| std::io::Error::other(e))?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn sections(&self) -> Vec<String> {
        let mut sections = self.config.sections();
        sections.sort();
        sections
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .config
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[web]
listen = 0.0.0.0:8000

[broker]
endpoint = https://broker.example/trade
timeout_ms = 5000

[risk]
risk_pct = 1.5
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("web", "listen"),
            Some("0.0.0.0:8000".to_string())
        );
        assert_eq!(
            adapter.get_string("broker", "endpoint"),
            Some("https://broker.example/trade".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[broker]
timeout_ms = 100
").unwrap();
        assert_eq!(adapter.get_string("broker", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[broker]
max_attempts = 5
bad = abc
").unwrap();
        assert_eq!(adapter.get_int("broker", "max_attempts", 0), 5);
        assert_eq!(adapter.get_int("broker", "missing", 42), 42);
        assert_eq!(adapter.get_int("broker", "bad", 42), 42);
    }

    #[test]
    fn get_double_returns_value_or_default() {
        let adapter =
            FileConfigAdapter::from_string("[risk]
risk_pct = 2.5
bad = not_a_number
").unwrap();
        assert_eq!(adapter.get_double("risk", "risk_pct", 0.0), 2.5);
        assert_eq!(adapter.get_double("risk", "missing", 99.9), 99.9);
        assert_eq!(adapter.get_double("risk", "bad", 99.9), 99.9);
    }

    #[test]
    fn sections_and_keys_are_lowercase() {
        let content = "[signal]\nstop_loss_pips = 50\n\n[signal.XAUUSD.15m]\nTake_Profit_Pips = 120\n\n[pip_values]\nXAUUSD = 10\ndefault = 1\n";
        let adapter = FileConfigAdapter::from_string(content).unwrap();

        let sections = adapter.sections();
        assert!(sections.contains(&"signal".to_string()));
        assert!(sections.contains(&"signal.xauusd.15m".to_string()));
        assert_eq!(adapter.keys("pip_values"), vec!["default", "xauusd"]);
        assert_eq!(adapter.keys("SIGNAL.XAUUSD.15M"), vec!["take_profit_pips"]);
        assert!(adapter.keys("missing").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[classifier]\nmodel_path = /models/filter.json\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("classifier", "model_path"),
            Some("/models/filter.json".to_string())
        );
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(result.is_err());
    }
}
