//! The production `AccountOps` implementation.
//!
//! `initialize` establishes the account's proxied HTTP session; `run_flow`
//! walks the resolved task plan through the registry. Task failures are
//! isolated per task: a failed or erroring task is logged and the flow moves
//! on to the next one, sleeping the configured inter-task pause after every
//! task either way.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::session;
use super::tasks::{TaskContext, TaskKind, TaskRegistry};
use super::{AccountOps, OpsFactory};
use crate::batch::AccountInput;
use crate::config::Config;
use crate::pacing::{random_pause, PacingRng};
use crate::stats::StatsCollector;

/// HTTP-backed operations for one account.
pub struct HttpAccountOps {
    config: Arc<Config>,
    registry: Arc<TaskRegistry>,
    stats: Arc<StatsCollector>,
    rng: PacingRng,
    session: Mutex<Option<Client>>,
}

impl HttpAccountOps {
    /// Creates the operations instance for one account.
    pub fn new(
        config: Arc<Config>,
        registry: Arc<TaskRegistry>,
        stats: Arc<StatsCollector>,
        rng: PacingRng,
    ) -> Self {
        Self {
            config,
            registry,
            stats,
            rng,
            session: Mutex::new(None),
        }
    }
}

#[async_trait]
impl AccountOps for HttpAccountOps {
    async fn initialize(&self, account: &AccountInput) -> anyhow::Result<bool> {
        let timeout = Duration::from_secs(self.config.service.request_timeout_secs);
        let client = session::build_client(account.egress.as_deref(), timeout)?;
        *self.session.lock().await = Some(client);
        info!("[{}] HTTP session initialized", account.index);
        Ok(true)
    }

    async fn run_flow(&self, account: &AccountInput, plan: &[TaskKind]) -> anyhow::Result<bool> {
        let index = account.index;

        let client = self.session.lock().await.clone();
        let Some(client) = client else {
            error!("[{index}] Session not initialized");
            return Ok(false);
        };

        let plan_msg: Vec<String> = plan
            .iter()
            .enumerate()
            .map(|(i, kind)| format!("{}. {kind}", i + 1))
            .collect();
        info!("[{index}] Task execution plan: {}", plan_msg.join(" | "));

        let ctx = TaskContext {
            account,
            client: &client,
            service: &self.config.service,
            flow: &self.config.flow,
            retry: self.config.retry_policy(),
            stats: self.stats.as_ref(),
            rng: &self.rng,
        };

        for kind in plan {
            match self.registry.get(*kind) {
                Some(task) => match task.execute(&ctx).await {
                    Ok(true) => info!("[{index}] Task {kind} completed"),
                    Ok(false) => warn!("[{index}] Task {kind} failed"),
                    Err(err) => error!("[{index}] Task {kind} failed: {err:#}"),
                },
                None => warn!("[{index}] Task {kind} has no registered handler"),
            }
            random_pause(
                &self.rng,
                self.config.settings.pause_between_tasks,
                &format!("[{index}] After task {kind}"),
            )
            .await;
        }

        Ok(true)
    }
}

/// Builds [`HttpAccountOps`] instances for the orchestrator.
pub struct HttpOpsFactory {
    config: Arc<Config>,
    registry: Arc<TaskRegistry>,
    stats: Arc<StatsCollector>,
}

impl HttpOpsFactory {
    /// Creates a factory over a shared registry and stats collector.
    pub fn new(
        config: Arc<Config>,
        registry: Arc<TaskRegistry>,
        stats: Arc<StatsCollector>,
    ) -> Self {
        Self {
            config,
            registry,
            stats,
        }
    }
}

impl OpsFactory for HttpOpsFactory {
    fn create(&self, _account: &AccountInput, rng: PacingRng) -> Arc<dyn AccountOps> {
        Arc::new(HttpAccountOps::new(
            Arc::clone(&self.config),
            Arc::clone(&self.registry),
            Arc::clone(&self.stats),
            rng,
        ))
    }
}
