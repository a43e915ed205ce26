//! Error-first outcome pairs.
//!
//! `attempt` runs a fallible operation and returns `(error, value)` with
//! exactly one side set, so call sites can branch on the pair directly.
//! Errors pass through untouched.

use std::future::Future;

/// `(Some(error), None)` on failure, `(None, Some(value))` on success.
pub type Pair<T, E> = (Option<E>, Option<T>);

pub fn attempt<T, E>(op: impl FnOnce() -> Result<T, E>) -> Pair<T, E> {
    into_pair(op())
}

pub async fn attempt_async<T, E>(op: impl Future<Output = Result<T, E>>) -> Pair<T, E> {
    into_pair(op.await)
}

pub fn into_pair<T, E>(result: Result<T, E>) -> Pair<T, E> {
    match result {
        Ok(value) => (None, Some(value)),
        Err(err) => (Some(err), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    #[test]
    fn success_fills_only_the_value() {
        let (err, value) = attempt(|| "42".parse::<u32>());
        assert!(err.is_none());
        assert_eq!(value, Some(42));
    }

    #[test]
    fn failure_passes_the_error_through() {
        let (err, value) = attempt(|| Err::<(), _>(ApiError::http("Resource not found", 404)));
        assert!(value.is_none());
        let err = err.unwrap();
        assert_eq!(err.message(), "Resource not found");
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn async_operations_are_awaited() {
        let (err, value) = attempt_async(async { Ok::<_, ApiError>(vec![1, 2]) }).await;
        assert!(err.is_none());
        assert_eq!(value, Some(vec![1, 2]));

        let (err, value) = attempt_async(async { Err::<u8, _>(ApiError::generic()) }).await;
        assert!(err.unwrap().is_generic());
        assert!(value.is_none());
    }
}
