/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! Retry of sequential code assignment on numbering conflicts.
//!
//! Codes are assigned as "current maximum plus one" without any lock or
//! database sequence. Two writers that observe the same maximum will propose
//! the same code and the store's uniqueness constraint rejects one of them.
//! [SequentialCodeAssigner] re-runs the loser with the next attempt index so
//! that the caller can derive a fresh candidate.

use crate::DocnumError;
use std::future::Future;

/// Name of the column holding the sequential code of a numbered record.
pub const CODE_COLUMN: &str = "code";

/// Retry limits for [SequentialCodeAssigner].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOptions {
    /// Number of additional attempts after the first one.
    ///
    /// The operation is invoked at most `max_retries + 1` times.
    pub max_retries: u32,
}

impl RetryOptions {
    /// Default value of [Self::max_retries].
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// Return a new instance.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self { max_retries }
    }
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self::with_max_retries(Self::DEFAULT_MAX_RETRIES)
    }
}

/// Decides if a failed attempt lost a race for a code and may be retried.
pub trait ConflictClassifier<E> {
    /// Return `true` if `error` signals that the candidate code was already
    /// taken by a concurrent writer.
    fn is_retryable_conflict(&self, error: &E) -> bool;
}

impl<E, F> ConflictClassifier<E> for F
where
    F: Fn(&E) -> bool,
{
    fn is_retryable_conflict(&self, error: &E) -> bool {
        self(error)
    }
}

/// Classifies uniqueness violations of the constraint covering the numbering
/// column as retryable.
///
/// Violations of other uniqueness constraints are real failures.
#[derive(Debug, Clone)]
pub struct NumberingConflict {
    column: String,
}

impl NumberingConflict {
    /// Return a new instance matching constraints that include `column`.
    pub fn on_column(column: &str) -> Self {
        Self {
            column: column.to_string(),
        }
    }
}

impl Default for NumberingConflict {
    fn default() -> Self {
        Self::on_column(CODE_COLUMN)
    }
}

impl ConflictClassifier<DocnumError> for NumberingConflict {
    fn is_retryable_conflict(&self, error: &DocnumError) -> bool {
        error.is_unique_violation_on(&self.column)
    }
}

/** Runs a "read last code, compute candidate, insert" operation and re-runs it
when a concurrent writer claimed the same code.

Retries are immediate. Errors are never wrapped: the caller either gets the
operation's value or the exact error of the last attempt.
*/
#[derive(Debug, Clone, Default)]
pub struct SequentialCodeAssigner<C> {
    options: RetryOptions,
    classifier: C,
}

impl<C> SequentialCodeAssigner<C> {
    /// Return a new instance.
    pub fn new(options: RetryOptions, classifier: C) -> Self {
        Self {
            options,
            classifier,
        }
    }

    /// Return the retry limits in use.
    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    /// Invoke `operation` with attempt index `0` and, for as long as it fails
    /// with a retryable conflict and retries remain, again with the next
    /// attempt index.
    ///
    /// `operation` must derive its candidate code from the attempt index
    /// (typically `last_code + 1 + attempt`) so that repeated attempts do not
    /// propose the same code even when they observe the same stale maximum.
    ///
    /// Dropping the returned future cancels the in-flight attempt and no
    /// further attempts are made.
    pub async fn run_with_retry<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        C: ConflictClassifier<E>,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e)
                    if attempt < self.options.max_retries
                        && self.classifier.is_retryable_conflict(&e) =>
                {
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Run `operation` with retries on numbering conflicts of the [CODE_COLUMN].
///
/// See [SequentialCodeAssigner::run_with_retry].
pub async fn with_code_retry<T, F, Fut>(
    operation: F,
    options: RetryOptions,
) -> Result<T, DocnumError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, DocnumError>>,
{
    SequentialCodeAssigner::new(options, NumberingConflict::default())
        .run_with_retry(operation)
        .await
}

#[cfg(test)]
mod test {
    //! Retry behavior tests.

    use super::*;
    use crate::DocnumErrorKind;
    use std::collections::HashSet;

    fn code_conflict() -> DocnumError {
        DocnumError::unique_violation(["tenant_id", "sequence", CODE_COLUMN], "code taken")
    }

    #[derive(Debug, PartialEq)]
    struct Created {
        id: &'static str,
        code: u64,
    }

    #[tokio::test]
    async fn test_no_conflict_returns_first_result() {
        let mut attempts = Vec::new();
        let res = with_code_retry(
            |attempt| {
                attempts.push(attempt);
                async { Ok(Created { id: "1", code: 1 }) }
            },
            RetryOptions::default(),
        )
        .await;
        assert_eq!(res.unwrap(), Created { id: "1", code: 1 });
        assert_eq!(attempts, vec![0]);
    }

    #[tokio::test]
    async fn test_single_conflict_is_retried() {
        let mut attempts = Vec::new();
        let res = with_code_retry(
            |attempt| {
                attempts.push(attempt);
                async move {
                    if attempt == 0 {
                        Err(code_conflict())
                    } else {
                        Ok(Created { id: "1", code: 2 })
                    }
                }
            },
            RetryOptions::default(),
        )
        .await;
        assert_eq!(res.unwrap(), Created { id: "1", code: 2 });
        assert_eq!(attempts, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_unrelated_error_is_not_retried() {
        let mut attempts = Vec::new();
        let res: Result<Created, _> = with_code_retry(
            |attempt| {
                attempts.push(attempt);
                async { Err(DocnumErrorKind::Connection.error_with_msg("store offline")) }
            },
            RetryOptions::default(),
        )
        .await;
        let e = res.unwrap_err();
        assert_eq!(e.kind(), &DocnumErrorKind::Connection);
        assert_eq!(e.to_string(), "Connection store offline");
        assert_eq!(attempts, vec![0]);
    }

    #[tokio::test]
    async fn test_unique_violation_on_other_column_is_not_retried() {
        let mut attempts = Vec::new();
        let res: Result<Created, _> = with_code_retry(
            |attempt| {
                attempts.push(attempt);
                async {
                    Err(DocnumError::unique_violation(
                        ["tenant_id", "external_ref"],
                        "reference taken",
                    ))
                }
            },
            RetryOptions::default(),
        )
        .await;
        assert_eq!(res.unwrap_err().columns(), ["tenant_id", "external_ref"]);
        assert_eq!(attempts, vec![0]);
    }

    #[tokio::test]
    async fn test_cancellation_is_not_retried() {
        let mut attempts = Vec::new();
        let res: Result<Created, _> = with_code_retry(
            |attempt| {
                attempts.push(attempt);
                async { Err(DocnumErrorKind::Cancelled.error()) }
            },
            RetryOptions::default(),
        )
        .await;
        assert_eq!(res.unwrap_err().kind(), &DocnumErrorKind::Cancelled);
        assert_eq!(attempts, vec![0]);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_the_conflict() {
        let mut attempts = Vec::new();
        let res: Result<Created, _> = with_code_retry(
            |attempt| {
                attempts.push(attempt);
                async { Err(code_conflict()) }
            },
            RetryOptions::with_max_retries(2),
        )
        .await;
        let e = res.unwrap_err();
        assert_eq!(e.kind(), &DocnumErrorKind::UniqueViolation);
        assert!(e.is_unique_violation_on(CODE_COLUMN));
        assert_eq!(e.to_string(), code_conflict().to_string());
        assert_eq!(attempts, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_default_allows_four_attempts() {
        let mut attempts = Vec::new();
        let res: Result<Created, _> = with_code_retry(
            |attempt| {
                attempts.push(attempt);
                async { Err(code_conflict()) }
            },
            RetryOptions::default(),
        )
        .await;
        assert!(res.is_err());
        assert_eq!(attempts, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_zero_retries_makes_one_attempt() {
        let mut attempts = Vec::new();
        let res: Result<Created, _> = with_code_retry(
            |attempt| {
                attempts.push(attempt);
                async { Err(code_conflict()) }
            },
            RetryOptions::with_max_retries(0),
        )
        .await;
        assert!(res.unwrap_err().is_unique_violation_on(CODE_COLUMN));
        assert_eq!(attempts, vec![0]);
    }

    #[tokio::test]
    async fn test_recovers_after_two_conflicts() {
        let mut attempts = Vec::new();
        let res = with_code_retry(
            |attempt| {
                attempts.push(attempt);
                async move {
                    if attempt < 2 {
                        Err(code_conflict())
                    } else {
                        Ok(Created { id: "3", code: 3 })
                    }
                }
            },
            RetryOptions::with_max_retries(2),
        )
        .await;
        assert_eq!(res.unwrap(), Created { id: "3", code: 3 });
        assert_eq!(attempts, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_attempt_indices_are_contiguous() {
        for max_retries in 0..6u32 {
            for succeed_at in 0..=max_retries + 1 {
                let mut attempts = Vec::new();
                let _res = with_code_retry(
                    |attempt| {
                        attempts.push(attempt);
                        async move {
                            if attempt == succeed_at {
                                Ok(attempt)
                            } else {
                                Err(code_conflict())
                            }
                        }
                    },
                    RetryOptions::with_max_retries(max_retries),
                )
                .await;
                let last = succeed_at.min(max_retries);
                assert_eq!(attempts, (0..=last).collect::<Vec<_>>());
            }
        }
    }

    #[tokio::test]
    async fn test_stale_maximum_converges_on_free_code() {
        // Another writer already holds 1..=3 while this writer still sees 1.
        let taken: HashSet<u64> = (1..=3).collect();
        let stale_max = 1u64;
        let res = with_code_retry(
            |attempt| {
                let candidate = stale_max + 1 + u64::from(attempt);
                let is_taken = taken.contains(&candidate);
                async move {
                    if is_taken {
                        Err(code_conflict())
                    } else {
                        Ok(candidate)
                    }
                }
            },
            RetryOptions::default(),
        )
        .await;
        assert_eq!(res.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_custom_classifier() {
        #[derive(Debug, PartialEq)]
        enum StoreError {
            DuplicateKey,
            Timeout,
        }
        let assigner = SequentialCodeAssigner::new(RetryOptions::default(), |e: &StoreError| {
            *e == StoreError::DuplicateKey
        });
        let mut attempts = Vec::new();
        let res = assigner
            .run_with_retry(|attempt| {
                attempts.push(attempt);
                async move {
                    match attempt {
                        0 => Err::<(), _>(StoreError::DuplicateKey),
                        _ => Err(StoreError::Timeout),
                    }
                }
            })
            .await;
        assert_eq!(res, Err(StoreError::Timeout));
        assert_eq!(attempts, vec![0, 1]);
    }
}
