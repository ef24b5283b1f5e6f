//! # Result state of one query at a point in time.
//!
//! ```text
//! Loading ──► Success   (callee settled with a response)
//!         └─► Error     (policy gave up, retries exhausted)
//! ```
//!
//! A state never goes back to `Loading`; a new `Loading` only comes from a new
//! attempt chain (a fresh request cell after invalidation, or a new query).

use crate::error::CallError;

/// Bound shared by queries, responses and callee errors: values are cloned
/// into every observer and moved across tasks.
pub trait Payload: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Payload for T {}

/// Tagged outcome produced for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultState<Q, R, E> {
    /// The attempt chain is running (including silent retries).
    Loading {
        /// Query the attempt chain was created for.
        query: Q,
    },
    /// The callee settled with a response.
    Success {
        /// Query the attempt chain was created for.
        query: Q,
        /// Callee response.
        response: R,
    },
    /// The retry policy gave up.
    Error {
        /// Query the attempt chain was created for.
        query: Q,
        /// Give-up reason chosen by the retry policy.
        error: CallError<E>,
    },
}

impl<Q, R, E> ResultState<Q, R, E> {
    /// Query this state belongs to.
    pub fn query(&self) -> &Q {
        match self {
            ResultState::Loading { query }
            | ResultState::Success { query, .. }
            | ResultState::Error { query, .. } => query,
        }
    }

    #[inline]
    pub fn is_loading(&self) -> bool {
        matches!(self, ResultState::Loading { .. })
    }

    /// True for `Success` and `Error`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !self.is_loading()
    }

    pub fn response(&self) -> Option<&R> {
        match self {
            ResultState::Success { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&CallError<E>> {
        match self {
            ResultState::Error { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Short stable label (`loading` / `success` / `error`) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ResultState::Loading { .. } => "loading",
            ResultState::Success { .. } => "success",
            ResultState::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type State = ResultState<&'static str, u32, &'static str>;

    #[test]
    fn accessors_follow_the_tag() {
        let loading: State = ResultState::Loading { query: "a" };
        assert!(loading.is_loading());
        assert_eq!(loading.query(), &"a");
        assert!(loading.response().is_none());

        let ok: State = ResultState::Success {
            query: "a",
            response: 7,
        };
        assert!(ok.is_terminal());
        assert_eq!(ok.response(), Some(&7));
        assert_eq!(ok.as_label(), "success");

        let err: State = ResultState::Error {
            query: "b",
            error: CallError::Failed("boom"),
        };
        assert_eq!(err.query(), &"b");
        assert_eq!(err.error(), Some(&CallError::Failed("boom")));
    }
}
