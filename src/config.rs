//! Service configuration
//!
//! Loaded once from the environment (after `.env`) and passed explicitly to
//! the components that need it.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::batcher::{BatcherConfig, DEFAULT_BATCH_WINDOW_MS};
use crate::catalog::DEFAULT_COURSES_URL;
use crate::completion::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::runner::process::{DEFAULT_DEADLINE_MS, DEFAULT_OUTPUT_LIMIT_BYTES};
use crate::runner::RunnerConfig;

/// Service configuration
#[derive(Clone)]
pub struct ServiceConfig {
    /// HTTP listen address (default: 0.0.0.0:8080)
    pub bind_addr: String,
    /// Completion API credential (required)
    pub api_key: String,
    /// Completion API base URL
    pub api_base_url: String,
    /// Completion model name
    pub model: String,
    /// Per-call timeout for completion and catalog requests
    pub http_timeout: Duration,
    /// Batch window (default: 100ms)
    pub batch_window: Duration,
    /// Code run deadline (default: 3000ms)
    pub run_deadline: Duration,
    /// Captured bytes kept per stream (default: 1 MiB)
    pub run_output_limit_bytes: usize,
    /// Parent directory for run scratch directories
    pub scratch_dir: PathBuf,
    /// Directory of `<kind>.txt` system prompts overriding the built-in ones
    pub prompts_dir: Option<PathBuf>,
    /// TOML file with a `[features]` table overriding the built-in one
    pub features_config: Option<PathBuf>,
    /// Course catalog endpoint
    pub courses_url: String,
}

impl ServiceConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .context("OPENAI_API_KEY must be set")?;

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".into()),
            api_key,
            api_base_url: lookup("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            model: lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            http_timeout: Duration::from_secs(parse_or(&lookup, "COMPLETION_TIMEOUT_SECS", 120)?),
            batch_window: Duration::from_millis(parse_or(
                &lookup,
                "BATCH_WINDOW_MS",
                DEFAULT_BATCH_WINDOW_MS,
            )?),
            run_deadline: Duration::from_millis(parse_or(
                &lookup,
                "RUN_DEADLINE_MS",
                DEFAULT_DEADLINE_MS,
            )?),
            run_output_limit_bytes: parse_or(
                &lookup,
                "RUN_OUTPUT_LIMIT_BYTES",
                DEFAULT_OUTPUT_LIMIT_BYTES,
            )?,
            scratch_dir: lookup("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            prompts_dir: lookup("PROMPTS_DIR").map(PathBuf::from),
            features_config: lookup("FEATURES_CONFIG").map(PathBuf::from),
            courses_url: lookup("COURSES_URL").unwrap_or_else(|| DEFAULT_COURSES_URL.into()),
        })
    }

    pub fn batcher_config(&self) -> BatcherConfig {
        BatcherConfig {
            window: self.batch_window,
        }
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            deadline: self.run_deadline,
            output_limit_bytes: self.run_output_limit_bytes,
            scratch_dir: self.scratch_dir.clone(),
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("bind_addr", &self.bind_addr)
            .field("api_key", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("http_timeout", &self.http_timeout)
            .field("batch_window", &self.batch_window)
            .field("run_deadline", &self.run_deadline)
            .field("run_output_limit_bytes", &self.run_output_limit_bytes)
            .field("scratch_dir", &self.scratch_dir)
            .field("prompts_dir", &self.prompts_dir)
            .field("features_config", &self.features_config)
            .field("courses_url", &self.courses_url)
            .finish()
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {}", name, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")])).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.batch_window, Duration::from_millis(100));
        assert_eq!(config.run_deadline, Duration::from_millis(3000));
        assert_eq!(config.runner_config().deadline, Duration::from_millis(3000));
        assert_eq!(config.batcher_config().window, Duration::from_millis(100));
        assert!(config.prompts_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("BATCH_WINDOW_MS", "250"),
            ("RUN_DEADLINE_MS", " 5000 "),
            ("SCRATCH_DIR", "/var/tmp/runs"),
        ]))
        .unwrap();

        assert_eq!(config.batch_window, Duration::from_millis(250));
        assert_eq!(config.run_deadline, Duration::from_millis(5000));
        assert_eq!(config.scratch_dir, PathBuf::from("/var/tmp/runs"));
    }

    #[test]
    fn test_missing_api_key() {
        let err = ServiceConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_invalid_number() {
        let err = ServiceConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("BATCH_WINDOW_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("BATCH_WINDOW_MS"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ServiceConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-secret")])).unwrap();
        assert!(!format!("{:?}", config).contains("sk-secret"));
    }
}
