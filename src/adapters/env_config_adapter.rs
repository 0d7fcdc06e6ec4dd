//! Environment variable overlay for another configuration source.
//!
//! `[broker] api_key` is read from `SMCTRADER_BROKER_API_KEY`; dots in
//! section names become underscores, so `[signal.xauusd]` maps to
//! `SMCTRADER_SIGNAL_XAUUSD_*`. Set variables win over the inner source.

use crate::ports::config_port::ConfigPort;
use std::collections::HashMap;

pub const ENV_PREFIX: &str = "SMCTRADER";

pub struct EnvConfigAdapter<C> {
    inner: C,
    vars: HashMap<String, String>,
}

impl<C: ConfigPort> EnvConfigAdapter<C> {
    /// Snapshot of the process environment taken once.
    pub fn from_env(inner: C) -> Self {
        Self::with_vars(inner, std::env::vars().collect())
    }

    pub fn with_vars(inner: C, vars: HashMap<String, String>) -> Self {
        let vars = vars
            .into_iter()
            .filter(|(name, _)| name.starts_with(ENV_PREFIX))
            .map(|(name, value)| (name.to_uppercase(), value))
            .collect();
        Self { inner, vars }
    }

    fn section_prefix(section: &str) -> String {
        format!("{}_{}_", ENV_PREFIX, section.replace('.', "_")).to_uppercase()
    }

    fn lookup(&self, section: &str, key: &str) -> Option<&str> {
        let name = format!("{}{}", Self::section_prefix(section), key.to_uppercase());
        self.vars
            .get(&name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

impl<C: ConfigPort> ConfigPort for EnvConfigAdapter<C> {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        match self.lookup(section, key) {
            Some(value) => Some(value.to_string()),
            None => self.inner.get_string(section, key),
        }
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match self.lookup(section, key).and_then(|v| v.parse().ok()) {
            Some(value) => value,
            None => self.inner.get_int(section, key, default),
        }
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        match self.lookup(section, key).and_then(|v| v.parse().ok()) {
            Some(value) => value,
            None => self.inner.get_double(section, key, default),
        }
    }

    // Section names cannot be recovered from variable names, so only the
    // inner source contributes sections.
    fn sections(&self) -> Vec<String> {
        self.inner.sections()
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let prefix = Self::section_prefix(section);
        let mut keys = self.inner.keys(section);
        for name in self.vars.keys() {
            if let Some(key) = name.strip_prefix(&prefix) {
                let key = key.to_lowercase();
                if !key.is_empty() && !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        keys
    }
}
