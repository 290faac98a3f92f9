//! Top-level batch driver.
//!
//! Composes account selection and resource cycling into an immutable
//! [`AccountBatch`], launches one pipeline per account through a shared
//! [`ConcurrencyGate`], waits for every pipeline to reach a terminal state
//! (one account's failure never cancels another), and finishes with the
//! aggregate statistics output.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};
use uuid::Uuid;

use super::account::AccountPipeline;
use super::gate::ConcurrencyGate;
use crate::batch::{cycle_or_placeholder, cycle_to, AccountBatch, AccountSelector};
use crate::config::Config;
use crate::error::SetupError;
use crate::inputs::BatchInputs;
use crate::ops::OpsFactory;
use crate::pacing::PacingRng;
use crate::report::OutcomeReporter;
use crate::stats::{self, StatsCollector};

/// Aggregate outcome of one batch run.
#[derive(Debug, Clone)]
pub struct BatchStats {
    /// Run identifier.
    pub run_id: String,
    /// When the batch started.
    pub started_at: DateTime<Utc>,
    /// Total accounts launched.
    pub total: usize,
    /// Accounts whose pipeline succeeded.
    pub succeeded: u64,
    /// Accounts whose pipeline failed.
    pub failed: u64,
    /// Wall-clock duration of the batch.
    pub duration: Duration,
    /// Account labels in launch order, i.e. the applied permutation.
    pub order: Vec<usize>,
}

impl BatchStats {
    fn new(run_id: String, started_at: DateTime<Utc>, total: usize, order: Vec<usize>) -> Self {
        Self {
            run_id,
            started_at,
            total,
            succeeded: 0,
            failed: 0,
            duration: Duration::ZERO,
            order,
        }
    }

    fn record_success(&mut self) {
        self.succeeded += 1;
    }

    fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Success rate as a percentage of launched accounts.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.succeeded as f64 / self.total as f64) * 100.0
    }
}

/// Drives a whole account batch to completion.
pub struct Orchestrator {
    config: Arc<Config>,
    ops: Arc<dyn OpsFactory>,
    reporter: Arc<OutcomeReporter>,
    stats: Arc<StatsCollector>,
}

impl Orchestrator {
    /// Creates an orchestrator over validated configuration.
    pub fn new(
        config: Arc<Config>,
        ops: Arc<dyn OpsFactory>,
        reporter: Arc<OutcomeReporter>,
        stats: Arc<StatsCollector>,
    ) -> Result<Self, SetupError> {
        config.validate()?;
        Ok(Self {
            config,
            ops,
            reporter,
            stats,
        })
    }

    /// Runs one batch over the loaded inputs.
    ///
    /// Setup failures abort before any pipeline launches and before any
    /// ledger write. Once pipelines are launched the batch always runs to
    /// completion; individual failures surface only in the returned stats
    /// and the ledgers.
    pub async fn run_batch(&self, inputs: BatchInputs) -> Result<BatchStats, SetupError> {
        let run_id = format!("run-{}", Uuid::new_v4());
        let started_at = Utc::now();
        let start = Instant::now();

        if inputs.secrets.is_empty() {
            return Err(SetupError::MissingResource("account secrets"));
        }
        if inputs.proxies.is_empty() {
            return Err(SetupError::MissingResource("proxies"));
        }

        let task_specs = self.config.flow.task_specs()?;

        let seed = self
            .config
            .settings
            .seed
            .unwrap_or_else(|| rand::rng().random());
        info!("{run_id} | Base seed: {seed}");
        let mut seeder = ChaCha8Rng::seed_from_u64(seed);

        let selector = AccountSelector::from_settings(&self.config.settings);
        let mut selection = selector.select(&inputs.secrets);
        if selection.is_empty() {
            return Err(SetupError::NoAccounts);
        }
        selection.shuffle(&mut seeder);

        let count = selection.len();
        let proxies = cycle_to("proxies", &inputs.proxies, count)?
            .into_iter()
            .map(Some)
            .collect();
        let tokens = cycle_or_placeholder(&inputs.tokens, count);
        let emails = cycle_or_placeholder(&inputs.emails, count);
        let batch = AccountBatch::assemble(selection, proxies, tokens, emails);

        info!(
            "{run_id} | Starting {count} accounts (range {}-{}) in random order: {}",
            batch.start(),
            batch.end(),
            batch.order_string()
        );

        let gate = ConcurrencyGate::new(self.config.settings.threads);
        let order = batch.order().to_vec();

        let pipelines: Vec<AccountPipeline> = batch
            .into_inputs()
            .into_iter()
            .map(|input| {
                let rng = PacingRng::seeded(seeder.random());
                let ops = self.ops.create(&input, rng.clone());
                AccountPipeline::new(
                    input,
                    &task_specs,
                    Arc::clone(&self.config),
                    ops,
                    Arc::clone(&self.reporter),
                    gate.clone(),
                    rng,
                )
            })
            .collect();

        let results = join_all(pipelines.into_iter().map(AccountPipeline::run)).await;

        let mut batch_stats = BatchStats::new(run_id.clone(), started_at, count, order);
        for result in &results {
            if result.succeeded {
                batch_stats.record_success();
            } else {
                batch_stats.record_failure();
            }
        }
        batch_stats.duration = start.elapsed();

        if batch_stats.failed > 0 {
            warn!(
                "{run_id} | Batch finished: {}/{count} succeeded, {} failed ({:.1}% success) in {:?}",
                batch_stats.succeeded,
                batch_stats.failed,
                batch_stats.success_rate(),
                batch_stats.duration
            );
        } else {
            info!(
                "{run_id} | Batch finished: all {count} accounts succeeded in {:?}",
                batch_stats.duration
            );
        }

        // The aggregate statistics step runs unconditionally once the
        // setup phase has succeeded.
        let entries = self.stats.snapshot().await;
        stats::log_summary(&entries);

        Ok(batch_stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::AccountInput;
    use crate::ops::{AccountOps, TaskKind};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct AlwaysOk;

    #[async_trait]
    impl AccountOps for AlwaysOk {
        async fn initialize(&self, _account: &AccountInput) -> anyhow::Result<bool> {
            Ok(true)
        }

        async fn run_flow(
            &self,
            _account: &AccountInput,
            _plan: &[TaskKind],
        ) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    struct AlwaysOkFactory;

    impl OpsFactory for AlwaysOkFactory {
        fn create(&self, _account: &AccountInput, _rng: PacingRng) -> Arc<dyn AccountOps> {
            Arc::new(AlwaysOk)
        }
    }

    fn test_config(seed: u64) -> Arc<Config> {
        let yaml = format!(
            r#"
settings:
  threads: 2
  attempts: 2
  seed: {seed}
  pause_between_attempts: [0, 0]
  initialization_pause: [0, 0]
  pause_between_accounts: [0, 0]
  pause_between_tasks: [0, 0]
flow:
  tasks: [checkin]
"#
        );
        Arc::new(serde_yaml::from_str(&yaml).expect("valid test config"))
    }

    fn orchestrator(dir: &TempDir, seed: u64) -> Orchestrator {
        Orchestrator::new(
            test_config(seed),
            Arc::new(AlwaysOkFactory),
            Arc::new(OutcomeReporter::new(dir.path())),
            Arc::new(StatsCollector::new()),
        )
        .expect("valid config")
    }

    fn test_inputs(accounts: usize) -> BatchInputs {
        BatchInputs {
            secrets: (1..=accounts).map(|i| format!("secret-{i}")).collect(),
            proxies: vec!["proxy-a".to_string(), "proxy-b".to_string()],
            tokens: Vec::new(),
            emails: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_empty_secrets_abort_before_launch() {
        let dir = TempDir::new().expect("temp dir");
        let orchestrator = orchestrator(&dir, 1);
        let result = orchestrator
            .run_batch(BatchInputs {
                proxies: vec!["p".to_string()],
                ..Default::default()
            })
            .await;
        assert!(matches!(
            result,
            Err(SetupError::MissingResource("account secrets"))
        ));
        // No ledger writes happened.
        assert!(!dir.path().join(crate::report::SUCCESS_DIR).exists());
        assert!(!dir.path().join(crate::report::FAILURE_DIR).exists());
    }

    #[tokio::test]
    async fn test_empty_proxies_abort_before_launch() {
        let dir = TempDir::new().expect("temp dir");
        let orchestrator = orchestrator(&dir, 1);
        let result = orchestrator
            .run_batch(BatchInputs {
                secrets: vec!["s".to_string()],
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(SetupError::MissingResource("proxies"))));
    }

    #[tokio::test]
    async fn test_all_accounts_run_to_completion() {
        let dir = TempDir::new().expect("temp dir");
        let orchestrator = orchestrator(&dir, 42);

        let stats = orchestrator
            .run_batch(test_inputs(5))
            .await
            .expect("batch runs");

        assert_eq!(stats.total, 5);
        assert_eq!(stats.succeeded, 5);
        assert_eq!(stats.failed, 0);
        assert!((stats.success_rate() - 100.0).abs() < f64::EPSILON);

        let mut order = stats.order.clone();
        order.sort_unstable();
        assert_eq!(order, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_same_seed_same_launch_order() {
        let dir_a = TempDir::new().expect("temp dir");
        let dir_b = TempDir::new().expect("temp dir");

        let first = orchestrator(&dir_a, 7)
            .run_batch(test_inputs(10))
            .await
            .expect("batch runs");
        let second = orchestrator(&dir_b, 7)
            .run_batch(test_inputs(10))
            .await
            .expect("batch runs");

        assert_eq!(first.order, second.order);
    }
}
