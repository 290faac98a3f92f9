//! Resource cycling.
//!
//! Auxiliary per-account resource lists (proxies, tokens, emails) rarely
//! match the account count; `cycle_to` stretches a list to a target length
//! by wrapping around modulo its size.

use crate::error::SetupError;

/// Produces a list of length `len` where element `i` is `source[i % m]`.
///
/// Fails with [`SetupError::EmptyResource`] when `source` is empty; callers
/// with an optional list should substitute placeholders instead of calling
/// this (see [`cycle_or_placeholder`]).
pub fn cycle_to<T: Clone>(kind: &'static str, source: &[T], len: usize) -> Result<Vec<T>, SetupError> {
    if source.is_empty() {
        return Err(SetupError::EmptyResource(kind));
    }
    Ok((0..len).map(|i| source[i % source.len()].clone()).collect())
}

/// Cycles an optional list to `len`, or fills with `None` when absent.
pub fn cycle_or_placeholder(source: &[String], len: usize) -> Vec<Option<String>> {
    if source.is_empty() {
        return vec![None; len];
    }
    (0..len).map(|i| Some(source[i % source.len()].clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_wraps_modulo_source_length() {
        let source = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        for len in [1usize, 3, 5, 8] {
            let cycled = cycle_to("items", &source, len).expect("non-empty source");
            assert_eq!(cycled.len(), len);
            for (i, item) in cycled.iter().enumerate() {
                assert_eq!(item, &source[i % source.len()]);
            }
        }
    }

    #[test]
    fn test_cycle_shrinks_longer_source() {
        let source = vec![1, 2, 3, 4, 5];
        assert_eq!(cycle_to("items", &source, 2).expect("ok"), vec![1, 2]);
    }

    #[test]
    fn test_cycle_empty_source_fails() {
        let source: Vec<String> = Vec::new();
        assert!(matches!(
            cycle_to("proxies", &source, 3),
            Err(SetupError::EmptyResource("proxies"))
        ));
    }

    #[test]
    fn test_placeholder_for_absent_list() {
        assert_eq!(cycle_or_placeholder(&[], 3), vec![None, None, None]);
    }

    #[test]
    fn test_placeholder_cycles_present_list() {
        let source = vec!["t1".to_string(), "t2".to_string()];
        let cycled = cycle_or_placeholder(&source, 3);
        assert_eq!(
            cycled,
            vec![
                Some("t1".to_string()),
                Some("t2".to_string()),
                Some("t1".to_string())
            ]
        );
    }
}
