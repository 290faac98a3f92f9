//! Per-account statistics collection and the end-of-run summary.
//!
//! The stats task records one [`AccountStats`] entry per account it manages
//! to fetch; the orchestrator reads the collector once, after every pipeline
//! has finished, and logs the aggregate summary. Collection is out-of-band:
//! the core never writes here itself.

use tokio::sync::Mutex;
use tracing::info;

/// Remote-service statistics for one account.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountStats {
    /// The account's stable label.
    pub index: usize,
    /// The account's identifier on the remote service.
    pub address: String,
    /// Current balance.
    pub balance: f64,
    /// Total operations performed by the account.
    pub operations: u64,
}

/// Lock-guarded, append-only stats collection.
#[derive(Debug, Default)]
pub struct StatsCollector {
    entries: Mutex<Vec<AccountStats>>,
}

impl StatsCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one account's statistics.
    pub async fn record(&self, stats: AccountStats) {
        self.entries.lock().await.push(stats);
    }

    /// Returns all recorded entries, sorted by account index.
    pub async fn snapshot(&self) -> Vec<AccountStats> {
        let mut entries = self.entries.lock().await.clone();
        entries.sort_by_key(|e| e.index);
        entries
    }
}

/// Aggregate totals over all collected entries.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSummary {
    /// Number of accounts with recorded stats.
    pub accounts: usize,
    /// Sum of balances.
    pub total_balance: f64,
    /// Sum of operation counts.
    pub total_operations: u64,
}

impl StatsSummary {
    /// Computes the summary, or `None` when nothing was collected.
    pub fn compute(entries: &[AccountStats]) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }
        Some(Self {
            accounts: entries.len(),
            total_balance: entries.iter().map(|e| e.balance).sum(),
            total_operations: entries.iter().map(|e| e.operations).sum(),
        })
    }

    /// Mean balance per account.
    pub fn average_balance(&self) -> f64 {
        self.total_balance / self.accounts as f64
    }

    /// Mean operation count per account.
    pub fn average_operations(&self) -> f64 {
        self.total_operations as f64 / self.accounts as f64
    }
}

/// Logs each entry and the aggregate totals.
pub fn log_summary(entries: &[AccountStats]) {
    let Some(summary) = StatsSummary::compute(entries) else {
        info!("No account statistics collected");
        return;
    };

    info!("Account statistics ({} accounts):", summary.accounts);
    for entry in entries {
        info!(
            "  [{}] {}: balance {:.4}, operations {}",
            entry.index, entry.address, entry.balance, entry.operations
        );
    }
    info!(
        "Totals: balance {:.4}, operations {} | averages: balance {:.4}, operations {:.1}",
        summary.total_balance,
        summary.total_operations,
        summary.average_balance(),
        summary.average_operations()
    );
}
