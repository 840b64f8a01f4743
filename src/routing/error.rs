//! Routing error definitions.
//!
//! These are programming-time conditions raised while an application
//! registers routes or builds URLs. Request-time failures (no route,
//! wrong method) never surface as errors; the dispatcher turns them into
//! responses.

use thiserror::Error;

/// Errors raised by route registration and URL building.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// The method set was empty or held something that is not an HTTP verb.
    #[error("invalid method set for route {pattern}: {reason}")]
    InvalidMethodSet { pattern: String, reason: String },

    /// A pattern variable had no value (or an empty/zero value) during encoding.
    #[error("route variable `{0}` has no value")]
    MissingVariable(String),

    /// A pattern segment opens `<` without a closing `>` after it.
    #[error("malformed route pattern: {0}")]
    MalformedPattern(String),

    /// Another route already carries this name.
    #[error("route name `{0}` is already registered")]
    DuplicateRouteName(String),

    /// No route carries this name.
    #[error("no route named `{0}`")]
    UnknownRouteName(String),
}
