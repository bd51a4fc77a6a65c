use serde::Deserialize;
use std::path::Path;

/// Settings for the throughput harness.
///
/// Every field has a default, so an empty file (or no file) is valid.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    /// Slot count of the benchmark queue (usable capacity is one less).
    #[serde(default = "defaults::capacity")]
    pub capacity: usize,
    /// Values transferred producer → consumer per run.
    #[serde(default = "defaults::iterations")]
    pub iterations: u64,
    #[serde(default = "defaults::runs")]
    pub runs: usize,
    #[serde(default)]
    pub producer_core: Option<usize>,
    #[serde(default)]
    pub consumer_core: Option<usize>,
    /// Yield after a short spin instead of busy-waiting forever. Needed when
    /// producer and consumer share a CPU.
    #[serde(default)]
    pub backoff: bool,
    /// Where to write the JSON report, if anywhere.
    #[serde(default)]
    pub report_path: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

mod defaults {
    pub fn log_level() -> String {
        "info".into()
    }

    pub fn capacity() -> usize {
        1024
    }

    pub fn iterations() -> u64 {
        1_000_000_000
    }

    pub fn runs() -> usize {
        1
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level(),
            capacity: defaults::capacity(),
            iterations: defaults::iterations(),
            runs: defaults::runs(),
            producer_core: None,
            consumer_core: None,
            backoff: false,
            report_path: None,
        }
    }
}

impl BenchConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml(&toml_to_str)
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: BenchConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the harness cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity < 2 {
            return Err(ConfigError::Invalid("capacity must be at least 2 slots"));
        }
        if self.iterations == 0 {
            return Err(ConfigError::Invalid("iterations must be non-zero"));
        }
        if self.runs == 0 {
            return Err(ConfigError::Invalid("runs must be non-zero"));
        }
        Ok(())
    }
}
