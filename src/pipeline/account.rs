//! The per-account pipeline state machine.
//!
//! `Created → Initializing → Running → Reporting → CooledDown`, with
//! `Aborted` reachable from any non-terminal state on an internal error.
//! Both network-bound phases are wrapped in the retry executor; a pipeline
//! never propagates an error to the orchestrator: anything unrecovered is
//! logged, reported as a failure, and ends the pipeline in `Aborted`.

use std::fmt;
use std::sync::Arc;

use tracing::{error, warn};

use super::gate::ConcurrencyGate;
use crate::batch::{AccountInput, PipelineResult};
use crate::config::Config;
use crate::ops::{resolve_plan, AccountOps, TaskKind, TaskSpec};
use crate::pacing::{random_pause, PacingRng};
use crate::report::OutcomeReporter;
use crate::retry::RetryExecutor;

/// Lifecycle states of an account pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Constructed, not yet admitted.
    Created,
    /// Warm-up pause and session initialization.
    Initializing,
    /// Executing the task flow.
    Running,
    /// Recording the outcome.
    Reporting,
    /// Terminal: cooldown finished.
    CooledDown,
    /// Terminal: ended by an internal error.
    Aborted,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Created => "created",
            PipelineState::Initializing => "initializing",
            PipelineState::Running => "running",
            PipelineState::Reporting => "reporting",
            PipelineState::CooledDown => "cooled-down",
            PipelineState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Drives one account from admission to a terminal state.
pub struct AccountPipeline {
    input: AccountInput,
    plan: Vec<TaskKind>,
    config: Arc<Config>,
    ops: Arc<dyn AccountOps>,
    reporter: Arc<OutcomeReporter>,
    gate: ConcurrencyGate,
    rng: PacingRng,
    state: PipelineState,
}

impl AccountPipeline {
    /// Creates a pipeline for one account.
    ///
    /// The task plan is resolved here, once: every `OneOf` slot in the flow
    /// is decided before execution begins and is not re-rolled on retries.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        input: AccountInput,
        specs: &[TaskSpec],
        config: Arc<Config>,
        ops: Arc<dyn AccountOps>,
        reporter: Arc<OutcomeReporter>,
        gate: ConcurrencyGate,
        rng: PacingRng,
    ) -> Self {
        let plan = resolve_plan(specs, &rng);
        Self {
            input,
            plan,
            config,
            ops,
            reporter,
            gate,
            rng,
            state: PipelineState::Created,
        }
    }

    /// The resolved task plan.
    pub fn plan(&self) -> &[TaskKind] {
        &self.plan
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs the pipeline to a terminal state. Never panics across this
    /// boundary and never returns an error: the outcome is the result.
    pub async fn run(mut self) -> PipelineResult {
        let index = self.input.index;

        let permit = match self.gate.acquire().await {
            Ok(permit) => permit,
            Err(err) => {
                error!("[{index}] Admission failed: {err}");
                self.state = PipelineState::Reporting;
                self.report(false).await;
                self.state = PipelineState::Aborted;
                return PipelineResult {
                    index,
                    succeeded: false,
                };
            }
        };

        let outcome = self.drive().await;
        let succeeded = matches!(outcome, Ok(true));

        self.state = PipelineState::Reporting;
        self.report(succeeded).await;

        // Free the slot before cooling down so the pause never blocks
        // another account's admission.
        drop(permit);

        match outcome {
            Ok(_) => {
                random_pause(
                    &self.rng,
                    self.config.settings.pause_between_accounts,
                    &format!("[{index}] Next account"),
                )
                .await;
                self.state = PipelineState::CooledDown;
            }
            Err(err) => {
                error!("[{index}] Account pipeline aborted: {err:#}");
                self.state = PipelineState::Aborted;
            }
        }

        PipelineResult { index, succeeded }
    }

    /// The Initializing and Running phases. An `Err` here is an internal
    /// error, not an operation failure; operation failures are absorbed by
    /// the retry executor into a `false` phase outcome.
    async fn drive(&mut self) -> anyhow::Result<bool> {
        let index = self.input.index;
        let rng = self.rng.clone();

        self.state = PipelineState::Initializing;
        random_pause(
            &rng,
            self.config.settings.initialization_pause,
            &format!("[{index}] Starting"),
        )
        .await;

        let executor = RetryExecutor::new(self.config.retry_policy());
        let ops = Arc::clone(&self.ops);

        let initialized = {
            let input = &self.input;
            executor
                .execute(&rng, &format!("[{index}] Initialization"), || {
                    ops.initialize(input)
                })
                .await
        };
        if !initialized {
            warn!("[{index}] Initialization failed, skipping flow");
            return Ok(false);
        }

        self.state = PipelineState::Running;
        let flow_ok = {
            let input = &self.input;
            let plan = &self.plan;
            executor
                .execute(&rng, &format!("[{index}] Flow"), || {
                    ops.run_flow(input, plan)
                })
                .await
        };

        Ok(flow_ok)
    }

    async fn report(&self, succeeded: bool) {
        let result = self
            .reporter
            .report(
                succeeded,
                self.input.index,
                self.input.egress.as_deref(),
                self.input.aux.token.as_deref(),
            )
            .await;
        if let Err(err) = result {
            error!("[{}] Failed to record outcome: {err}", self.input.index);
        }
    }
}
