mod config;

pub use config::{BenchConfig, ConfigError};
