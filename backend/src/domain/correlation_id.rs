//! Request-scoped correlation identifier.
//!
//! A `CorrelationId` follows one request through logs and error responses.
//! Callers may supply their own via the `x-correlation-id` header; otherwise
//! a UUID is generated. The value lives in task-local storage so it is
//! available without threading it through every call.
//!
//! Tokio task-local variables are not inherited across spawned tasks. Use
//! [`CorrelationId::scope`] when spawning new tasks or moving work onto
//! blocking threads.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::task_local;
use uuid::Uuid;

task_local! {
    static CORRELATION_ID: CorrelationId;
}

/// Longest caller-supplied identifier that is reused verbatim.
pub const MAX_CORRELATION_ID_LEN: usize = 128;

/// Per-request correlation identifier exposed via task-local storage.
///
/// # Examples
/// ```
/// use b2b_api::domain::CorrelationId;
///
/// async fn handler() {
///     if let Some(id) = CorrelationId::current() {
///         println!("correlation id: {id}");
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Arc::from(Uuid::new_v4().to_string()))
    }

    /// Reuse a caller-supplied identifier when it is non-empty, at most
    /// [`MAX_CORRELATION_ID_LEN`] bytes and printable ASCII.
    ///
    /// # Examples
    /// ```
    /// use b2b_api::domain::CorrelationId;
    ///
    /// assert!(CorrelationId::from_header("req-42").is_some());
    /// assert!(CorrelationId::from_header("").is_none());
    /// ```
    pub fn from_header(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let acceptable = !raw.is_empty()
            && raw.len() <= MAX_CORRELATION_ID_LEN
            && raw.bytes().all(|b| b.is_ascii_graphic());
        acceptable.then(|| Self(Arc::from(raw)))
    }

    /// Returns the current identifier if one is in scope.
    #[must_use]
    pub fn current() -> Option<Self> {
        CORRELATION_ID.try_with(Clone::clone).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Execute the provided future with `id` in scope.
    ///
    /// # Examples
    /// ```
    /// use b2b_api::domain::CorrelationId;
    ///
    /// # tokio::runtime::Runtime::new().expect("runtime").block_on(async {
    /// let id = CorrelationId::from_header("req-42").expect("valid id");
    /// let observed = CorrelationId::scope(id.clone(), async { CorrelationId::current() }).await;
    /// assert_eq!(observed, Some(id));
    /// # });
    /// ```
    pub async fn scope<Fut>(id: CorrelationId, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        CORRELATION_ID.scope(id, fut).await
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[tokio::test]
    async fn generate_produces_uuid() {
        let id = CorrelationId::generate();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[tokio::test]
    async fn current_reflects_scope() {
        let expected = CorrelationId::generate();
        let observed = CorrelationId::scope(expected.clone(), async { CorrelationId::current() }).await;
        assert_eq!(observed, Some(expected));
    }

    #[tokio::test]
    async fn current_is_none_out_of_scope() {
        assert!(CorrelationId::current().is_none());
    }

    #[rstest]
    #[case::plain("abc-123", true)]
    #[case::padded("  abc  ", true)]
    #[case::blank("   ", false)]
    #[case::inner_space("a b", false)]
    #[case::too_long(&"x".repeat(MAX_CORRELATION_ID_LEN + 1), false)]
    fn header_values_are_screened(#[case] raw: &str, #[case] accepted: bool) {
        assert_eq!(CorrelationId::from_header(raw).is_some(), accepted);
    }
}
