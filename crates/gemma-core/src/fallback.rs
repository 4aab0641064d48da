//! Ordered fallback strategies
//!
//! A chain is a fixed list of strategy tags tried in order. The first success
//! wins and is reported together with every failed attempt before it, so
//! callers (and tests) can see which path actually produced the value.

use crate::error::{GemmaError, GemmaResult};
use std::fmt;
use std::future::Future;
use tracing::{debug, warn};

/// A strategy that failed before the chain moved on
#[derive(Debug, Clone)]
pub struct FailedAttempt<S> {
    pub strategy: S,
    pub error: GemmaError,
}

/// Value produced by a chain plus the strategy that produced it
#[derive(Debug, Clone)]
pub struct FallbackOutcome<T, S> {
    pub value: T,
    pub strategy: S,
    pub attempts: Vec<FailedAttempt<S>>,
}

impl<T, S> FallbackOutcome<T, S> {
    /// Whether a strategy other than the first one produced the value
    pub fn is_fallback(&self) -> bool {
        !self.attempts.is_empty()
    }

    /// Transform the value, keeping the provenance
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FallbackOutcome<U, S> {
        FallbackOutcome {
            value: f(self.value),
            strategy: self.strategy,
            attempts: self.attempts,
        }
    }
}

/// Try each strategy in `strategies` until one succeeds
///
/// Only errors that allow a fallback (transport failures, 404, 5xx) move the
/// chain forward. Any other error is returned immediately. When every strategy
/// fails, the last error is returned.
pub async fn run_chain<S, T, F, Fut>(
    strategies: &[S],
    mut attempt: F,
) -> GemmaResult<FallbackOutcome<T, S>>
where
    S: Copy + fmt::Display,
    F: FnMut(S) -> Fut,
    Fut: Future<Output = GemmaResult<T>>,
{
    let mut attempts: Vec<FailedAttempt<S>> = Vec::new();

    for (position, strategy) in strategies.iter().copied().enumerate() {
        match attempt(strategy).await {
            Ok(value) => {
                debug!(strategy = %strategy, failed = attempts.len(), "Strategy succeeded");
                return Ok(FallbackOutcome {
                    value,
                    strategy,
                    attempts,
                });
            }
            Err(error) => {
                let is_last = position + 1 == strategies.len();
                if is_last || !error.allows_fallback() {
                    return Err(error);
                }
                warn!(strategy = %strategy, error = %error, "Strategy failed, falling back");
                attempts.push(FailedAttempt { strategy, error });
            }
        }
    }

    Err(GemmaError::other("fallback chain has no strategies"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Source {
        Primary,
        Secondary,
        Tertiary,
    }

    impl fmt::Display for Source {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    const ALL: [Source; 3] = [Source::Primary, Source::Secondary, Source::Tertiary];

    #[tokio::test]
    async fn test_first_success_wins() {
        let outcome = run_chain(&ALL, |s| async move { Ok::<_, GemmaError>(s) })
            .await
            .unwrap();
        assert_eq!(outcome.strategy, Source::Primary);
        assert!(!outcome.is_fallback());
    }

    #[tokio::test]
    async fn test_falls_back_on_404_and_records_attempts() {
        let outcome = run_chain(&ALL, |s| async move {
            match s {
                Source::Primary => Err(GemmaError::http(404, "gone")),
                Source::Secondary => Err(GemmaError::transport("refused")),
                Source::Tertiary => Ok(42),
            }
        })
        .await
        .unwrap();

        assert_eq!(outcome.value, 42);
        assert_eq!(outcome.strategy, Source::Tertiary);
        let failed: Vec<Source> = outcome.attempts.iter().map(|a| a.strategy).collect();
        assert_eq!(failed, vec![Source::Primary, Source::Secondary]);
    }

    #[tokio::test]
    async fn test_non_fallback_error_stops_the_chain() {
        let mut tried = Vec::new();
        let result = run_chain(&ALL, |s| {
            tried.push(s);
            async move { Err::<(), _>(GemmaError::http(400, "bad request")) }
        })
        .await;

        assert!(matches!(result, Err(GemmaError::Http { status: 400, .. })));
        assert_eq!(tried, vec![Source::Primary]);
    }

    #[tokio::test]
    async fn test_all_failing_returns_last_error() {
        let result = run_chain(&ALL[..2], |s| async move {
            Err::<(), _>(GemmaError::http(503, format!("{} down", s)))
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Secondary down"));
    }
}
