//! On-disk input files for a batch run.
//!
//! Inputs are plain text files, one value per line; blank lines and
//! surrounding whitespace are dropped. The account secret file and the proxy
//! file are required; auxiliary credential files are optional and default to
//! empty lists.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

/// Account secrets, one per line.
pub const ACCOUNT_KEYS_FILE: &str = "account_keys.txt";
/// Secrets used instead of [`ACCOUNT_KEYS_FILE`] when the flow claims from
/// the faucet.
pub const FAUCET_KEYS_FILE: &str = "faucet_keys.txt";
/// Egress proxies, one per line.
pub const PROXIES_FILE: &str = "proxies.txt";
/// Optional auxiliary tokens, one per line.
pub const TOKENS_FILE: &str = "tokens.txt";
/// Optional account emails, one per line.
pub const EMAILS_FILE: &str = "emails.txt";

/// Errors that can occur while loading input files.
#[derive(Debug, Error)]
pub enum InputError {
    /// A required input file does not exist.
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),

    /// IO error while reading an input file.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads a required input file into trimmed, non-empty lines.
pub fn read_required(kind: &str, path: &Path) -> Result<Vec<String>, InputError> {
    if !path.exists() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }
    let lines = read_lines(path)?;
    info!("Loaded {} {kind} from {}", lines.len(), path.display());
    Ok(lines)
}

/// Reads an optional input file; a missing file yields an empty list.
pub fn read_optional(kind: &str, path: &Path) -> Result<Vec<String>, InputError> {
    if !path.exists() {
        debug!("No {kind} file at {}, continuing without", path.display());
        return Ok(Vec::new());
    }
    let lines = read_lines(path)?;
    info!("Loaded {} {kind} from {}", lines.len(), path.display());
    Ok(lines)
}

fn read_lines(path: &Path) -> Result<Vec<String>, InputError> {
    let contents = std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// All per-run input lists, loaded before any pipeline launches.
#[derive(Debug, Clone, Default)]
pub struct BatchInputs {
    /// Account secrets, in file order.
    pub secrets: Vec<String>,
    /// Egress proxies; cycled across accounts when shorter.
    pub proxies: Vec<String>,
    /// Auxiliary tokens; may be empty.
    pub tokens: Vec<String>,
    /// Account emails; may be empty.
    pub emails: Vec<String>,
}

impl BatchInputs {
    /// Loads all input lists from `data_dir`.
    ///
    /// When `use_faucet_keys` is set the secrets come from
    /// [`FAUCET_KEYS_FILE`] instead of [`ACCOUNT_KEYS_FILE`].
    pub fn load(data_dir: &Path, use_faucet_keys: bool) -> Result<Self, InputError> {
        let keys_file = if use_faucet_keys {
            FAUCET_KEYS_FILE
        } else {
            ACCOUNT_KEYS_FILE
        };

        Ok(Self {
            secrets: read_required("account secrets", &data_dir.join(keys_file))?,
            proxies: read_required("proxies", &data_dir.join(PROXIES_FILE))?,
            tokens: read_optional("tokens", &data_dir.join(TOKENS_FILE))?,
            emails: read_optional("emails", &data_dir.join(EMAILS_FILE))?,
        })
    }
}
