//! Account batch value types.
//!
//! An [`AccountBatch`] is the immutable composition of account selection and
//! resource cycling: one [`AccountInput`] per selected account, already in
//! launch order, with the applied permutation recorded for observability.

mod cycler;
mod selector;

pub use cycler::{cycle_or_placeholder, cycle_to};
pub use selector::{AccountSelector, SelectedAccount, Selection};

use std::fmt;

/// Optional secondary credentials attached to an account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuxCredentials {
    /// Auxiliary service token.
    pub token: Option<String>,
    /// Account email.
    pub email: Option<String>,
}

/// One unit of work: an identity plus its egress path and aux credentials.
///
/// Immutable once constructed; owned exclusively by its pipeline for the
/// pipeline's lifetime.
#[derive(Clone)]
pub struct AccountInput {
    /// Stable 1-based account label.
    pub index: usize,
    /// Opaque account credential. Never logged, never written to ledgers.
    pub secret: String,
    /// Egress proxy descriptor, if any.
    pub egress: Option<String>,
    /// Secondary credentials, if any.
    pub aux: AuxCredentials,
}

impl fmt::Debug for AccountInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountInput")
            .field("index", &self.index)
            .field("secret", &"<redacted>")
            .field("egress", &self.egress)
            .field("aux", &self.aux)
            .finish()
    }
}

/// The final outcome of one account pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineResult {
    /// The account's stable label.
    pub index: usize,
    /// Whether both the initialize and flow phases succeeded.
    pub succeeded: bool,
}

/// A fixed set of per-account inputs in launch order.
#[derive(Debug, Clone)]
pub struct AccountBatch {
    inputs: Vec<AccountInput>,
    order: Vec<usize>,
    start: usize,
    end: usize,
}

impl AccountBatch {
    /// Zips a shuffled selection with its index-aligned resource lists.
    ///
    /// All lists must have the selection's length; resources are aligned by
    /// launch position.
    pub fn assemble(
        selection: Selection,
        proxies: Vec<Option<String>>,
        tokens: Vec<Option<String>>,
        emails: Vec<Option<String>>,
    ) -> Self {
        debug_assert_eq!(selection.len(), proxies.len());
        debug_assert_eq!(selection.len(), tokens.len());
        debug_assert_eq!(selection.len(), emails.len());

        let Selection { picked, start, end } = selection;
        let order: Vec<usize> = picked.iter().map(|account| account.label).collect();
        let inputs = picked
            .into_iter()
            .zip(proxies)
            .zip(tokens)
            .zip(emails)
            .map(|(((account, egress), token), email)| AccountInput {
                index: account.label,
                secret: account.secret,
                egress,
                aux: AuxCredentials { token, email },
            })
            .collect();

        Self {
            inputs,
            order,
            start,
            end,
        }
    }

    /// Number of accounts in the batch.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Inputs in launch order.
    pub fn inputs(&self) -> &[AccountInput] {
        &self.inputs
    }

    /// Consumes the batch, yielding inputs in launch order.
    pub fn into_inputs(self) -> Vec<AccountInput> {
        self.inputs
    }

    /// Account labels in launch order, i.e. the applied permutation.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// The permutation rendered for logging, e.g. `"3 1 2"`.
    pub fn order_string(&self) -> String {
        self.order
            .iter()
            .map(|label| label.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Reported range start.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Reported range end.
    pub fn end(&self) -> usize {
        self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection() -> Selection {
        Selection {
            picked: vec![
                SelectedAccount {
                    label: 2,
                    secret: "s2".to_string(),
                },
                SelectedAccount {
                    label: 1,
                    secret: "s1".to_string(),
                },
            ],
            start: 1,
            end: 2,
        }
    }

    #[test]
    fn test_assemble_aligns_by_launch_position() {
        let batch = AccountBatch::assemble(
            selection(),
            vec![Some("p0".to_string()), Some("p1".to_string())],
            vec![Some("t0".to_string()), None],
            vec![None, Some("e1".to_string())],
        );

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.order(), &[2, 1]);
        assert_eq!(batch.order_string(), "2 1");

        let first = &batch.inputs()[0];
        assert_eq!(first.index, 2);
        assert_eq!(first.secret, "s2");
        assert_eq!(first.egress.as_deref(), Some("p0"));
        assert_eq!(first.aux.token.as_deref(), Some("t0"));
        assert_eq!(first.aux.email, None);

        let second = &batch.inputs()[1];
        assert_eq!(second.index, 1);
        assert_eq!(second.aux.email.as_deref(), Some("e1"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let input = AccountInput {
            index: 7,
            secret: "super-secret".to_string(),
            egress: None,
            aux: AuxCredentials::default(),
        };
        let rendered = format!("{input:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
