//! CLI configuration.

use anyhow::{Context, Result};
use std::time::Duration;

/// CLI configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    /// Root URL of the sample and unit library
    pub library_url: String,

    /// Ticks to run in `simulate`
    pub ticks: usize,

    /// Seed for scheduling jitter and paste offsets
    pub seed: Option<u64>,

    /// Fixed elapsed time for clock-powered nodes, wall clock if unset
    pub elapsed_ms: Option<f64>,

    /// HTTP request timeout
    pub http_timeout: Duration,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            library_url: "http://localhost:8080/".to_string(),
            ticks: 64,
            seed: None,
            elapsed_ms: None,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SEQLOGIC_LIBRARY_URL`: Library root URL
    /// - `SEQLOGIC_TICKS`: Ticks to simulate
    /// - `SEQLOGIC_SEED`: Random seed
    /// - `SEQLOGIC_ELAPSED_MS`: Fixed clock time in milliseconds
    /// - `SEQLOGIC_HTTP_TIMEOUT_SECS`: HTTP timeout in seconds
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("SEQLOGIC_LIBRARY_URL") {
            config.library_url = url;
        }

        if let Some(ticks) = lookup("SEQLOGIC_TICKS") {
            config.ticks = ticks.parse().context("Invalid SEQLOGIC_TICKS")?;
        }

        if let Some(seed) = lookup("SEQLOGIC_SEED") {
            config.seed = Some(seed.parse().context("Invalid SEQLOGIC_SEED")?);
        }

        if let Some(elapsed) = lookup("SEQLOGIC_ELAPSED_MS") {
            config.elapsed_ms = Some(elapsed.parse().context("Invalid SEQLOGIC_ELAPSED_MS")?);
        }

        if let Some(secs) = lookup("SEQLOGIC_HTTP_TIMEOUT_SECS") {
            config.http_timeout =
                Duration::from_secs(secs.parse().context("Invalid SEQLOGIC_HTTP_TIMEOUT_SECS")?);
        }

        Ok(config)
    }

    /// Apply `--flag value` overrides, returning the remaining arguments.
    ///
    /// Parsing stops at a bare `--`; it and everything after it are returned
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns error if a flag is missing its value or the value cannot be
    /// parsed.
    pub fn apply_flags(&mut self, args: &[String]) -> Result<Vec<String>> {
        let mut rest = Vec::new();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let flag = arg.as_str();
            if flag == "--" {
                rest.push(arg.clone());
                rest.extend(iter.by_ref().cloned());
                break;
            }
            if !matches!(
                flag,
                "--library" | "--ticks" | "--seed" | "--elapsed-ms" | "--timeout"
            ) {
                rest.push(arg.clone());
                continue;
            }
            let value = iter
                .next()
                .with_context(|| format!("Missing value for {flag}"))?;
            match flag {
                "--library" => self.library_url.clone_from(value),
                "--ticks" => self.ticks = value.parse().context("Invalid --ticks")?,
                "--seed" => self.seed = Some(value.parse().context("Invalid --seed")?),
                "--elapsed-ms" => {
                    self.elapsed_ms = Some(value.parse().context("Invalid --elapsed-ms")?);
                }
                _ => {
                    self.http_timeout =
                        Duration::from_secs(value.parse().context("Invalid --timeout")?);
                }
            }
        }
        Ok(rest)
    }
}
