//! Remote operation contracts and their HTTP implementation.
//!
//! The pipeline core drives accounts through two opaque async operations,
//! `initialize` and `run_flow`, supplied per account by an [`OpsFactory`].
//! The production implementation ([`HttpAccountOps`]) builds a proxied HTTP
//! session and executes the resolved task plan through the task registry;
//! tests substitute scripted implementations.

pub mod flow;
pub mod session;
pub mod tasks;

pub use flow::{HttpAccountOps, HttpOpsFactory};
pub use tasks::{resolve_plan, Task, TaskContext, TaskKind, TaskRegistry, TaskSpec};

use std::sync::Arc;

use async_trait::async_trait;

use crate::batch::AccountInput;
use crate::pacing::PacingRng;

/// The per-account operations the pipeline core depends on.
///
/// Both operations signal failure either by returning `Ok(false)` or by
/// erroring; the retry layer treats the two identically.
#[async_trait]
pub trait AccountOps: Send + Sync {
    /// Prepares the account for work, e.g. by establishing its session.
    async fn initialize(&self, account: &AccountInput) -> anyhow::Result<bool>;

    /// Executes the resolved task plan for the account.
    async fn run_flow(&self, account: &AccountInput, plan: &[TaskKind]) -> anyhow::Result<bool>;
}

/// Builds one [`AccountOps`] instance per account.
///
/// The provided `rng` is the account's own pacing generator; implementations
/// share it with the pipeline so a fixed base seed reproduces the account's
/// entire behavior.
pub trait OpsFactory: Send + Sync {
    /// Creates the operations instance for `account`.
    fn create(&self, account: &AccountInput, rng: PacingRng) -> Arc<dyn AccountOps>;
}
