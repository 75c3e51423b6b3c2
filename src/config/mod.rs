use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cycle::{DepthPolicy, ExecutionStrategy};
use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub run: RunConfig,
    pub analyzers: AnalyzerConfig,
    pub logging: LoggingConfig,
}

/// Settings for one orchestration run. Immutable while the run executes.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Upper bound on the number of cycles (at least 1)
    pub max_cycles: u32,
    /// Average confidence at which the run stops early (0.0-1.0)
    pub min_confidence_threshold: f64,
    /// Wall-clock budget, checked after each cycle
    pub time_limit_seconds: u64,
    /// Strategy used when the caller does not pick one
    pub strategy_default: ExecutionStrategy,
    /// How analysis depth evolves across cycles
    pub depth_policy: DepthPolicy,
    /// Whether the adaptive strategy may reuse earlier results
    pub cache_results: bool,
    /// Previous-cycle confidence above which the adaptive strategy reuses a result
    pub cache_reuse_threshold: f64,
    /// First cycle analysed at deep depth under the increasing policy
    pub deep_from_cycle: u32,
}

/// Analyzer call configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let defaults = RunConfig::default();

        let run = RunConfig {
            max_cycles: parse_var("ANALYSIS_MAX_CYCLES").unwrap_or(defaults.max_cycles),
            min_confidence_threshold: parse_var("ANALYSIS_MIN_CONFIDENCE")
                .unwrap_or(defaults.min_confidence_threshold),
            time_limit_seconds: parse_var("ANALYSIS_TIME_LIMIT_SECS")
                .unwrap_or(defaults.time_limit_seconds),
            strategy_default: match env::var("ANALYSIS_STRATEGY") {
                Ok(s) => ExecutionStrategy::from_str(&s)
                    .map_err(|message| AppError::Config { message })?,
                Err(_) => defaults.strategy_default,
            },
            depth_policy: match env::var("ANALYSIS_DEPTH_POLICY") {
                Ok(s) => {
                    DepthPolicy::from_str(&s).map_err(|message| AppError::Config { message })?
                }
                Err(_) => defaults.depth_policy,
            },
            cache_results: env::var("ANALYSIS_CACHE_RESULTS")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(defaults.cache_results),
            cache_reuse_threshold: parse_var("ANALYSIS_CACHE_REUSE_THRESHOLD")
                .unwrap_or(defaults.cache_reuse_threshold),
            deep_from_cycle: parse_var("ANALYSIS_DEEP_FROM_CYCLE")
                .unwrap_or(defaults.deep_from_cycle),
        };
        run.validate()?;

        let analyzers = AnalyzerConfig {
            timeout_ms: parse_var("ANALYZER_TIMEOUT_MS").unwrap_or(30000),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Config {
            run,
            analyzers,
            logging,
        })
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl RunConfig {
    /// Reject settings the cycle loop cannot honour.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_cycles == 0 {
            return Err(AppError::Config {
                message: "max_cycles must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.min_confidence_threshold) {
            return Err(AppError::Config {
                message: format!(
                    "min_confidence_threshold must be within [0, 1], got {}",
                    self.min_confidence_threshold
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.cache_reuse_threshold) {
            return Err(AppError::Config {
                message: format!(
                    "cache_reuse_threshold must be within [0, 1], got {}",
                    self.cache_reuse_threshold
                ),
            });
        }
        Ok(())
    }

    /// The wall-clock budget as a [`Duration`].
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_seconds)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_cycles: 5,
            min_confidence_threshold: 0.85,
            time_limit_seconds: 300,
            strategy_default: ExecutionStrategy::Adaptive,
            depth_policy: DepthPolicy::Increasing,
            cache_results: true,
            cache_reuse_threshold: 0.9,
            deep_from_cycle: 3,
        }
    }
}

impl AnalyzerConfig {
    /// Per-call timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { timeout_ms: 30000 }
    }
}
