//! YAML configuration for a batch run.
//!
//! The configuration is an explicit value loaded once and threaded through
//! the orchestrator constructor down to every component; there is no global
//! config object. `validate()` checks every field and reports the first
//! violation as a `ConfigError::ValidationFailed`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::ops::tasks::{TaskKind, TaskSpec};
use crate::pacing::SampleRange;
use crate::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// IO error while reading the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid YAML or does not match the schema.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A task name in `flow.tasks` is not a known task kind.
    #[error("Unknown task '{0}' in flow.tasks")]
    UnknownTask(String),

    /// A field-level validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Concurrency, selection and pacing settings.
    #[serde(default)]
    pub settings: SettingsConfig,
    /// The task flow executed for each account.
    #[serde(default)]
    pub flow: FlowConfig,
    /// Remote service endpoints.
    #[serde(default)]
    pub service: ServiceConfig,
    /// Outcome ledger settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Concurrency, account selection and pacing settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Maximum number of account pipelines admitted at once.
    pub threads: usize,
    /// Attempt budget for retryable operations.
    pub attempts: u32,
    /// Inclusive 1-based account range; `[0, 0]` means "not set".
    pub accounts_range: (usize, usize),
    /// Explicit 1-based account indices; empty means "not set".
    pub exact_accounts: Vec<usize>,
    /// Pause between retry attempts, seconds.
    pub pause_between_attempts: SampleRange,
    /// Warm-up pause before an account initializes, seconds.
    pub initialization_pause: SampleRange,
    /// Cooldown pause after an account reports, seconds.
    pub pause_between_accounts: SampleRange,
    /// Pause after each task in the flow, seconds.
    pub pause_between_tasks: SampleRange,
    /// Base seed for all randomness; drawn from OS entropy when absent.
    pub seed: Option<u64>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            attempts: DEFAULT_MAX_ATTEMPTS,
            accounts_range: (0, 0),
            exact_accounts: Vec::new(),
            pause_between_attempts: SampleRange::fixed(5),
            initialization_pause: SampleRange::fixed(5),
            pause_between_accounts: SampleRange::fixed(10),
            pause_between_tasks: SampleRange::fixed(2),
            seed: None,
        }
    }
}

impl SettingsConfig {
    /// Whether the account range is the degenerate "not set" value.
    pub fn range_is_degenerate(&self) -> bool {
        self.accounts_range == (0, 0)
    }
}

/// The per-account task flow.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Ordered task entries; a list entry means "pick one at random".
    pub tasks: Vec<TaskEntry>,
    /// Quest items attempted per account.
    pub quests_per_account: SampleRange,
    /// Pause after each completed quest item, seconds.
    pub pause_between_quests: SampleRange,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            quests_per_account: SampleRange::fixed(1),
            pause_between_quests: SampleRange::fixed(5),
        }
    }
}

/// One entry of `flow.tasks`: a task name, or a set of alternatives from
/// which exactly one is chosen per account.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TaskEntry {
    /// A single task name.
    One(String),
    /// Alternative task names; one is chosen uniformly at pipeline start.
    AnyOf(Vec<String>),
}

impl FlowConfig {
    /// Resolves the configured task names into typed [`TaskSpec`]s.
    pub fn task_specs(&self) -> Result<Vec<TaskSpec>, ConfigError> {
        let mut specs = Vec::with_capacity(self.tasks.len());
        for entry in &self.tasks {
            match entry {
                TaskEntry::One(name) => specs.push(TaskSpec::Single(parse_task(name)?)),
                TaskEntry::AnyOf(names) => {
                    if names.is_empty() {
                        return Err(ConfigError::ValidationFailed(
                            "flow.tasks contains an empty alternative list".to_string(),
                        ));
                    }
                    let kinds = names
                        .iter()
                        .map(|n| parse_task(n))
                        .collect::<Result<Vec<_>, _>>()?;
                    specs.push(TaskSpec::OneOf(kinds));
                }
            }
        }
        Ok(specs)
    }
}

fn parse_task(name: &str) -> Result<TaskKind, ConfigError> {
    TaskKind::parse(name).ok_or_else(|| ConfigError::UnknownTask(name.to_string()))
}

/// Remote service endpoints and transport settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the remote service, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout, seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://service.invalid".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ServiceConfig {
    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Outcome ledger settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Directory under which the success/failure ledger roots are created.
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data"),
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Validates every field, returning the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settings.threads == 0 {
            return Err(ConfigError::ValidationFailed(
                "settings.threads must be at least 1".to_string(),
            ));
        }

        if self.settings.attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "settings.attempts must be at least 1".to_string(),
            ));
        }

        let (start, end) = self.settings.accounts_range;
        if !self.settings.range_is_degenerate() && end < start {
            return Err(ConfigError::ValidationFailed(format!(
                "settings.accounts_range end {end} is before start {start}"
            )));
        }

        if self.settings.exact_accounts.iter().any(|&i| i == 0) {
            return Err(ConfigError::ValidationFailed(
                "settings.exact_accounts indices are 1-based; 0 is not a valid index".to_string(),
            ));
        }

        if self.flow.tasks.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "flow.tasks must contain at least one task".to_string(),
            ));
        }

        // Surfaces unknown task names and empty alternative lists.
        self.flow.task_specs()?;

        if self.service.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "service.base_url must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// The retry policy shared by the initialize and flow phases.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.settings.attempts, self.settings.pause_between_attempts)
    }
}
