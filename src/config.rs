//! Engine configuration.
//!
//! Layered lowest to highest: built-in defaults, an optional JSON file, then
//! environment variables. The CLI applies its own flags on top.
//!
//! ```json
//! {
//!   "max_duration_minutes": 45.0,
//!   "transporter_column": "Sekundär Servicepersonal Id",
//!   "delimiters": [";", ","]
//! }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::ingest::DEFAULT_DELIMITERS;
use crate::schema::DEFAULT_TRANSPORTER_COLUMN;

pub const ENV_MAX_DURATION: &str = "TRANSPORT_MAX_DURATION_MINUTES";
pub const ENV_TRANSPORTER_COLUMN: &str = "TRANSPORTER_ID_COLUMN";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ceiling in minutes; longer transports are dropped at load time.
    pub max_duration_minutes: f64,
    pub transporter_column: String,
    pub delimiters: Vec<char>,
    /// Rows returned by an exact-match filter query.
    pub filter_row_limit: usize,
    pub sample_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_duration_minutes: 30.0,
            transporter_column: DEFAULT_TRANSPORTER_COLUMN.to_string(),
            delimiters: DEFAULT_DELIMITERS.to_vec(),
            filter_row_limit: 100,
            sample_size: 10,
        }
    }
}

impl EngineConfig {
    /// Loads the config from a JSON file at `path`. Missing keys keep their
    /// defaults.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading engine config '{path}'"))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("parsing engine config '{path}'"))?;
        Ok(config)
    }

    /// Applies overrides from the process environment.
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = lookup(ENV_MAX_DURATION) {
            self.max_duration_minutes = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_MAX_DURATION} is not a number: '{raw}'"))?;
        }
        if let Some(column) = lookup(ENV_TRANSPORTER_COLUMN) {
            self.transporter_column = column;
        }
        Ok(self)
    }
}
