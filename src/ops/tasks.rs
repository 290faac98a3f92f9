//! Task kinds, plan resolution, and the task registry.
//!
//! Tasks form a closed set: each kind is a variant of [`TaskKind`], with a
//! uniform `execute(ctx) -> bool` capability behind the [`Task`] trait. The
//! registry maps kinds to implementations and is built once at startup;
//! configuration referencing a name outside the set is rejected at load
//! time, not at execution time.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::batch::AccountInput;
use crate::config::{FlowConfig, ServiceConfig};
use crate::pacing::{random_pause, PacingRng};
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::stats::{AccountStats, StatsCollector};

/// The closed set of task kinds an account flow can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Claim from the service faucet.
    Faucet,
    /// Daily check-in.
    Checkin,
    /// Complete a sampled number of quest items.
    Quests,
    /// Fetch and record account statistics.
    Stats,
}

impl TaskKind {
    /// Every task kind, in registry order.
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Faucet,
        TaskKind::Checkin,
        TaskKind::Quests,
        TaskKind::Stats,
    ];

    /// The configuration name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Faucet => "faucet",
            TaskKind::Checkin => "checkin",
            TaskKind::Quests => "quests",
            TaskKind::Stats => "stats",
        }
    }

    /// Parses a configuration name, case-insensitively.
    pub fn parse(name: &str) -> Option<TaskKind> {
        let name = name.trim().to_ascii_lowercase();
        TaskKind::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One slot of the configured flow: a fixed kind, or alternatives from
/// which exactly one is chosen per account.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskSpec {
    /// Always this kind.
    Single(TaskKind),
    /// One of these kinds, chosen uniformly at pipeline start.
    OneOf(Vec<TaskKind>),
}

impl TaskSpec {
    /// Whether this slot can resolve to `kind`.
    pub fn mentions(&self, kind: TaskKind) -> bool {
        match self {
            TaskSpec::Single(k) => *k == kind,
            TaskSpec::OneOf(kinds) => kinds.contains(&kind),
        }
    }
}

/// Resolves a flow's slots into a concrete plan.
///
/// Each `OneOf` choice is made exactly once here: the plan is fixed before
/// the pipeline starts and is not re-rolled on retries.
pub fn resolve_plan(specs: &[TaskSpec], rng: &PacingRng) -> Vec<TaskKind> {
    specs
        .iter()
        .filter_map(|spec| match spec {
            TaskSpec::Single(kind) => Some(*kind),
            TaskSpec::OneOf(kinds) => rng.pick(kinds),
        })
        .collect()
}

/// Everything a task needs to execute for one account.
pub struct TaskContext<'a> {
    /// The account being driven.
    pub account: &'a AccountInput,
    /// The account's HTTP session.
    pub client: &'a Client,
    /// Remote service endpoints.
    pub service: &'a ServiceConfig,
    /// Flow-level tuning (quest counts, quest pacing).
    pub flow: &'a FlowConfig,
    /// Retry policy for task-internal retryable items.
    pub retry: RetryPolicy,
    /// Out-of-band statistics sink.
    pub stats: &'a StatsCollector,
    /// The account's pacing generator.
    pub rng: &'a PacingRng,
}

/// A single executable task kind.
#[async_trait]
pub trait Task: Send + Sync {
    /// The kind this task implements.
    fn kind(&self) -> TaskKind;

    /// Runs the task for one account. `Ok(false)` and `Err(_)` are both
    /// failures; the flow runner swallows either and moves on.
    async fn execute(&self, ctx: &TaskContext<'_>) -> anyhow::Result<bool>;
}

/// Kind-to-implementation lookup table, built once at startup.
pub struct TaskRegistry {
    tasks: HashMap<TaskKind, Box<dyn Task>>,
}

impl TaskRegistry {
    /// Builds the registry with every standard task registered.
    pub fn standard() -> Self {
        let mut registry = Self {
            tasks: HashMap::new(),
        };
        registry.register(Box::new(FaucetTask));
        registry.register(Box::new(CheckinTask));
        registry.register(Box::new(QuestsTask));
        registry.register(Box::new(StatsTask));
        registry
    }

    fn register(&mut self, task: Box<dyn Task>) {
        self.tasks.insert(task.kind(), task);
    }

    /// Looks up the implementation for `kind`.
    pub fn get(&self, kind: TaskKind) -> Option<&dyn Task> {
        self.tasks.get(&kind).map(|task| &**task)
    }
}

/// Claims from the service faucet.
struct FaucetTask;

#[async_trait]
impl Task for FaucetTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Faucet
    }

    async fn execute(&self, ctx: &TaskContext<'_>) -> anyhow::Result<bool> {
        let index = ctx.account.index;
        let url = format!("{}/faucet/claim", ctx.service.base_url());

        let mut request = ctx.client.post(url).json(&json!({ "account": index }));
        if let Some(token) = &ctx.account.aux.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            info!("[{index}] Faucet claimed");
            Ok(true)
        } else {
            warn!("[{index}] Faucet claim rejected: {}", response.status());
            Ok(false)
        }
    }
}

/// Performs the daily check-in.
struct CheckinTask;

#[async_trait]
impl Task for CheckinTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Checkin
    }

    async fn execute(&self, ctx: &TaskContext<'_>) -> anyhow::Result<bool> {
        let index = ctx.account.index;
        let url = format!("{}/checkin", ctx.service.base_url());

        let mut request = ctx.client.post(url).json(&json!({ "account": index }));
        if let Some(token) = &ctx.account.aux.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            info!("[{index}] Check-in completed");
            Ok(true)
        } else {
            warn!("[{index}] Check-in rejected: {}", response.status());
            Ok(false)
        }
    }
}

/// Completes a sampled number of quest items, each with its own retry
/// budget and a pause after each completed item.
struct QuestsTask;

impl QuestsTask {
    async fn complete_one(&self, ctx: &TaskContext<'_>, quest: u64) -> anyhow::Result<bool> {
        let index = ctx.account.index;
        let url = format!("{}/quests/complete", ctx.service.base_url());

        let response = ctx
            .client
            .post(url)
            .json(&json!({ "account": index, "quest": quest }))
            .send()
            .await?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl Task for QuestsTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Quests
    }

    async fn execute(&self, ctx: &TaskContext<'_>) -> anyhow::Result<bool> {
        let index = ctx.account.index;
        let count = ctx.rng.sample(ctx.flow.quests_per_account);
        info!("[{index}] Will attempt {count} quests");

        let executor = RetryExecutor::new(ctx.retry);
        for quest in 1..=count {
            let label = format!("[{index}] Quest {quest}/{count}");
            let completed = executor
                .execute(ctx.rng, &label, || self.complete_one(ctx, quest))
                .await;
            if !completed {
                return Ok(false);
            }
            random_pause(
                ctx.rng,
                ctx.flow.pause_between_quests,
                &format!("[{index}] Quest {quest}/{count} completed"),
            )
            .await;
        }
        Ok(true)
    }
}

/// Response shape of the account stats endpoint.
#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(default)]
    address: String,
    #[serde(default)]
    balance: f64,
    #[serde(default)]
    operations: u64,
}

/// Fetches account statistics and records them out-of-band.
struct StatsTask;

#[async_trait]
impl Task for StatsTask {
    fn kind(&self) -> TaskKind {
        TaskKind::Stats
    }

    async fn execute(&self, ctx: &TaskContext<'_>) -> anyhow::Result<bool> {
        let index = ctx.account.index;
        let url = format!("{}/accounts/{index}/stats", ctx.service.base_url());

        let response = ctx.client.get(url).send().await?;
        if !response.status().is_success() {
            warn!("[{index}] Stats fetch rejected: {}", response.status());
            return Ok(false);
        }

        let payload: StatsResponse = response.json().await?;
        info!(
            "[{index}] {}: balance {:.4}, operations {}",
            payload.address, payload.balance, payload.operations
        );
        ctx.stats
            .record(AccountStats {
                index,
                address: payload.address,
                balance: payload.balance,
                operations: payload.operations,
            })
            .await;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_every_kind() {
        for kind in TaskKind::ALL {
            assert_eq!(TaskKind::parse(kind.name()), Some(kind));
            assert_eq!(TaskKind::parse(&kind.name().to_uppercase()), Some(kind));
        }
        assert_eq!(TaskKind::parse("warp_drive"), None);
    }

    #[test]
    fn test_registry_covers_every_kind() {
        let registry = TaskRegistry::standard();
        for kind in TaskKind::ALL {
            assert!(registry.get(kind).is_some(), "missing handler for {kind}");
        }
    }

    #[test]
    fn test_resolve_plan_keeps_singles_and_picks_alternatives() {
        let specs = vec![
            TaskSpec::Single(TaskKind::Checkin),
            TaskSpec::OneOf(vec![TaskKind::Faucet, TaskKind::Quests]),
            TaskSpec::Single(TaskKind::Stats),
        ];
        let rng = PacingRng::seeded(11);
        let plan = resolve_plan(&specs, &rng);

        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0], TaskKind::Checkin);
        assert!(matches!(plan[1], TaskKind::Faucet | TaskKind::Quests));
        assert_eq!(plan[2], TaskKind::Stats);
    }

    #[test]
    fn test_resolve_plan_is_deterministic_for_a_seed() {
        let specs = vec![TaskSpec::OneOf(vec![
            TaskKind::Faucet,
            TaskKind::Checkin,
            TaskKind::Quests,
            TaskKind::Stats,
        ])];
        let first = resolve_plan(&specs, &PacingRng::seeded(3));
        let second = resolve_plan(&specs, &PacingRng::seeded(3));
        assert_eq!(first, second);
    }

    #[test]
    fn test_mentions() {
        let spec = TaskSpec::OneOf(vec![TaskKind::Faucet, TaskKind::Quests]);
        assert!(spec.mentions(TaskKind::Faucet));
        assert!(!spec.mentions(TaskKind::Stats));
        assert!(TaskSpec::Single(TaskKind::Stats).mentions(TaskKind::Stats));
    }
}
