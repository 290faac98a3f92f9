//! The orchestration core.
//!
//! One [`AccountPipeline`](account::AccountPipeline) per selected account,
//! admitted through a shared [`ConcurrencyGate`](gate::ConcurrencyGate) and
//! driven to a terminal state by the
//! [`Orchestrator`](orchestrator::Orchestrator). Failures never cross an
//! account boundary: the batch always runs to completion with a mix of
//! successes and failures.

mod account;
mod gate;
mod orchestrator;

pub use account::{AccountPipeline, PipelineState};
pub use gate::{ConcurrencyGate, GateClosed, GatePermit};
pub use orchestrator::{BatchStats, Orchestrator};
