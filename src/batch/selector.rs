//! Account selection and launch-order permutation.
//!
//! Selection rules, in priority order:
//!
//! 1. Degenerate range `(0, 0)` and no explicit indices: every account, in
//!    original order, reported as `start = 1, end = count`.
//! 2. Explicit indices (range still degenerate): exactly those 1-based
//!    indices that are in bounds, out-of-range ones silently dropped. The
//!    reported `start`/`end` are the min/max of the *configured* indices,
//!    not of the filtered result; they feed logging only.
//! 3. Non-degenerate range `[start, end]`: the clamped slice
//!    `[max(0, start - 1), end)` of the original list.
//!
//! After selection, `shuffle` applies a seeded uniform permutation that
//! becomes the launch order.

use rand::prelude::*;

use crate::config::SettingsConfig;

/// One selected account: its stable 1-based label and its secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedAccount {
    /// 1-based position of the account in the original list.
    pub label: usize,
    /// The account's credential.
    pub secret: String,
}

/// The outcome of account selection.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Selected accounts; launch order once shuffled.
    pub picked: Vec<SelectedAccount>,
    /// Reported range start.
    pub start: usize,
    /// Reported range end.
    pub end: usize,
}

impl Selection {
    /// Number of selected accounts.
    pub fn len(&self) -> usize {
        self.picked.len()
    }

    /// Whether nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.picked.is_empty()
    }

    /// Applies a uniform random permutation; the result is the launch order.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.picked.shuffle(rng);
    }
}

/// Resolves which accounts run, per the configured range or explicit set.
#[derive(Debug, Clone)]
pub struct AccountSelector {
    range: (usize, usize),
    exact: Vec<usize>,
}

impl AccountSelector {
    /// Builds a selector from run settings.
    pub fn from_settings(settings: &SettingsConfig) -> Self {
        Self {
            range: settings.accounts_range,
            exact: settings.exact_accounts.clone(),
        }
    }

    /// Builds a selector from an explicit range and index set.
    pub fn new(range: (usize, usize), exact: Vec<usize>) -> Self {
        Self { range, exact }
    }

    /// Selects the subset of `accounts` to process.
    ///
    /// An empty result is not an error here; the orchestrator treats it as a
    /// fatal abort before launching any pipeline.
    pub fn select(&self, accounts: &[String]) -> Selection {
        let (start, end) = self.range;

        if start == 0 && end == 0 {
            if self.exact.is_empty() {
                return Selection {
                    picked: label_all(accounts),
                    start: 1,
                    end: accounts.len(),
                };
            }
            return self.select_exact(accounts);
        }

        let lo = start.saturating_sub(1).min(accounts.len());
        let hi = end.min(accounts.len());
        let picked = if lo < hi {
            accounts[lo..hi]
                .iter()
                .enumerate()
                .map(|(offset, secret)| SelectedAccount {
                    label: lo + offset + 1,
                    secret: secret.clone(),
                })
                .collect()
        } else {
            Vec::new()
        };

        Selection { picked, start, end }
    }

    fn select_exact(&self, accounts: &[String]) -> Selection {
        let picked = self
            .exact
            .iter()
            .filter(|&&index| index >= 1 && index <= accounts.len())
            .map(|&index| SelectedAccount {
                label: index,
                secret: accounts[index - 1].clone(),
            })
            .collect();

        // Reported bounds come from the configured indices, in-bounds or
        // not. Intentional: they describe the request, not the result.
        let start = self.exact.iter().copied().min().unwrap_or(0);
        let end = self.exact.iter().copied().max().unwrap_or(0);

        Selection { picked, start, end }
    }
}

fn label_all(accounts: &[String]) -> Vec<SelectedAccount> {
    accounts
        .iter()
        .enumerate()
        .map(|(i, secret)| SelectedAccount {
            label: i + 1,
            secret: secret.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;

    fn accounts(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("secret-{i}")).collect()
    }

    fn labels(selection: &Selection) -> Vec<usize> {
        selection.picked.iter().map(|a| a.label).collect()
    }

    #[test]
    fn test_degenerate_range_selects_all() {
        let selector = AccountSelector::new((0, 0), Vec::new());
        let selection = selector.select(&accounts(5));

        assert_eq!(labels(&selection), vec![1, 2, 3, 4, 5]);
        assert_eq!(selection.start, 1);
        assert_eq!(selection.end, 5);
    }

    #[test]
    fn test_exact_indices_drop_out_of_range() {
        let selector = AccountSelector::new((0, 0), vec![2, 5, 99]);
        let selection = selector.select(&accounts(10));

        assert_eq!(labels(&selection), vec![2, 5]);
        assert_eq!(selection.picked[0].secret, "secret-2");
        // Bounds reflect the configured indices, including the dropped 99.
        assert_eq!(selection.start, 2);
        assert_eq!(selection.end, 99);
    }

    #[test]
    fn test_range_selects_inclusive_slice() {
        let selector = AccountSelector::new((3, 6), Vec::new());
        let selection = selector.select(&accounts(10));

        assert_eq!(labels(&selection), vec![3, 4, 5, 6]);
        assert_eq!(selection.start, 3);
        assert_eq!(selection.end, 6);
    }

    #[test]
    fn test_range_clamps_to_available_accounts() {
        let selector = AccountSelector::new((8, 20), Vec::new());
        let selection = selector.select(&accounts(10));

        assert_eq!(labels(&selection), vec![8, 9, 10]);
        assert_eq!(selection.end, 20);
    }

    #[test]
    fn test_range_takes_priority_over_exact() {
        let selector = AccountSelector::new((1, 2), vec![5, 6]);
        let selection = selector.select(&accounts(10));
        assert_eq!(labels(&selection), vec![1, 2]);
    }

    #[test]
    fn test_range_beyond_list_is_empty() {
        let selector = AccountSelector::new((11, 20), Vec::new());
        let selection = selector.select(&accounts(10));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_empty_input_is_empty_selection() {
        let selector = AccountSelector::new((0, 0), Vec::new());
        let selection = selector.select(&[]);
        assert!(selection.is_empty());
        assert_eq!(selection.start, 1);
        assert_eq!(selection.end, 0);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let selector = AccountSelector::new((0, 0), Vec::new());
        let mut selection = selector.select(&accounts(20));
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        selection.shuffle(&mut rng);

        let mut shuffled = labels(&selection);
        shuffled.sort_unstable();
        assert_eq!(shuffled, (1..=20).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_is_deterministic_for_a_seed() {
        let selector = AccountSelector::new((0, 0), Vec::new());

        let mut first = selector.select(&accounts(20));
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        first.shuffle(&mut rng);

        let mut second = selector.select(&accounts(20));
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        second.shuffle(&mut rng);

        assert_eq!(labels(&first), labels(&second));
    }
}
