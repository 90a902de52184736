// Walk configuration loaded from a JSON file

use crate::error::{CoreError, Result};
use crate::report::OutputFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strata_scanner::{FetchOptions, TargetSpec};
use url::Url;

fn default_source_name() -> String {
    "walk".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_retries() -> u32 {
    8
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_timeout_secs() -> u64 {
    10
}

/// Everything a walk needs, with documented defaults for the optional parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkConfig {
    pub seed_url: String,
    /// Identifies the dump written for this walk.
    #[serde(default = "default_source_name")]
    pub source_name: String,
    /// One target per depth level.
    pub targets: Vec<TargetSpec>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
    /// Fixed user agent; rotates through a built-in list when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl WalkConfig {
    pub fn new(seed_url: impl Into<String>, targets: Vec<TargetSpec>) -> Self {
        Self {
            seed_url: seed_url.into(),
            source_name: default_source_name(),
            targets,
            output_dir: default_output_dir(),
            format: OutputFormat::default(),
            user_agent: None,
            retries: default_retries(),
            backoff_factor: default_backoff_factor(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Check the preconditions a walk relies on. Selector syntax is checked
    /// later, when the walker compiles the targets.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.seed_url).map_err(|e| {
            CoreError::Config(format!("seed_url '{}' is not a valid URL: {}", self.seed_url, e))
        })?;

        if self.source_name.trim().is_empty() {
            return Err(CoreError::Config("source_name must not be empty".to_string()));
        }

        if self.targets.is_empty() {
            return Err(CoreError::Config("at least one target is required".to_string()));
        }

        if let Some(depth) = self
            .targets
            .iter()
            .position(|t| t.selector.trim().is_empty())
        {
            return Err(CoreError::Config(format!(
                "target at depth {} has no selector",
                depth
            )));
        }

        if !self.backoff_factor.is_finite() || self.backoff_factor < 0.0 {
            return Err(CoreError::Config(
                "backoff_factor must be a non-negative number".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(CoreError::Config(
                "timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            user_agent: self.user_agent.clone(),
            timeout_secs: self.timeout_secs,
            retries: self.retries,
            backoff_factor: self.backoff_factor,
        }
    }

    /// Output directory with `~` expanded.
    pub fn output_dir(&self) -> PathBuf {
        let raw = self.output_dir.to_string_lossy();
        PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
    }

    /// Where the record dump for this walk is written.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir()
            .join(format!("{}.{}", self.source_name, self.format.extension()))
    }

    /// Sample configuration written by `strata init`.
    pub fn default_template() -> String {
        let mut sample = WalkConfig::new(
            "https://example.com/catalogue",
            vec![
                TargetSpec::new("//nav//a[@class='category']"),
                TargetSpec::new("//ul[@class='listing']/li/a").with_param("page", "1"),
            ],
        );
        sample.source_name = "example".to_string();

        // Serialising plain data with string keys cannot fail
        serde_json::to_string_pretty(&sample).unwrap_or_default()
    }
}
