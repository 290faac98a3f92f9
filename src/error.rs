//! Run-level error types for fleet-forge.
//!
//! Component-local errors (`ConfigError`, `InputError`, `ReportError`) live
//! next to the code that produces them; `SetupError` is the taxonomy the
//! orchestrator surfaces to the host process. Everything in this enum is
//! fatal: it aborts the run before any pipeline launches and before any
//! ledger write happens.

use thiserror::Error;

use crate::config::ConfigError;
use crate::inputs::InputError;

/// Errors that abort a batch before any account pipeline is launched.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Configuration failed to load or validate.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An input file failed to load.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Selection produced no accounts to process.
    #[error("No accounts selected for processing")]
    NoAccounts,

    /// A required input list was present but empty.
    #[error("No {0} available")]
    MissingResource(&'static str),

    /// A resource list cannot be cycled because it is empty.
    #[error("Cannot cycle an empty {0} list")]
    EmptyResource(&'static str),
}
