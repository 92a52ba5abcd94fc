use crate::error::{Error, Result};
use crate::oracle::{DEFAULT_TOLERANCE, ScoringRule};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub suite: SuiteConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Where fixture sources live.
#[derive(Debug, Deserialize)]
pub struct SuiteConfig {
    #[serde(default = "default_sources")]
    pub sources: Vec<PathBuf>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub rule: ScoringRule,
    /// Allowed distance of a distribution's total mass from 1.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            rule: ScoringRule::default(),
            tolerance: default_tolerance(),
        }
    }
}

/// Analyzer under test, run once per case as
/// `command args.. <method id> <arguments>`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Concurrent analyzer invocations.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            timeout_secs: default_timeout_secs(),
            jobs: default_jobs(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_history_dir")]
    pub dir: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_history_dir(),
        }
    }
}

// Defaults
fn default_sources() -> Vec<PathBuf> {
    vec![PathBuf::from("src/main/java")]
}
fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_jobs() -> usize {
    4
}
fn default_history_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".case-oracle").join("history")
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| Error::config(format!("Failed to parse config: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.scoring.tolerance.is_finite() || self.scoring.tolerance <= 0.0 {
            return Err(Error::config(format!(
                "scoring.tolerance must be a positive number, got {}",
                self.scoring.tolerance
            )));
        }
        if self.analyzer.jobs == 0 {
            return Err(Error::config("analyzer.jobs must be at least 1"));
        }
        if self.analyzer.timeout_secs == 0 {
            return Err(Error::config("analyzer.timeout_secs must be at least 1"));
        }
        Ok(())
    }
}
