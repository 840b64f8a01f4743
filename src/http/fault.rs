//! Request-time fault taxonomy.
//!
//! Every fault the core detects while serving a request has a fixed HTTP
//! status. Faults are always converted into a response by the dispatcher;
//! they never escape a dispatch call.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestFault {
    /// No route pattern matched the path.
    #[error("no route matched {path}")]
    NoRouteMatched { path: String },

    /// A route matched but does not accept the request method.
    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },

    /// The path looked like a static asset but no file was found.
    #[error("static asset {path} not found")]
    StaticAssetNotFound { path: String },

    /// The handler returned something that cannot become a response.
    #[error("incompatible handler result: {reason}")]
    UnrecognizedHandlerResult { reason: String },
}

impl RequestFault {
    /// HTTP status code this fault is answered with.
    pub fn status(&self) -> u16 {
        match self {
            RequestFault::NoRouteMatched { .. } => 404,
            RequestFault::MethodNotAllowed { .. } => 405,
            RequestFault::StaticAssetNotFound { .. } => 404,
            RequestFault::UnrecognizedHandlerResult { .. } => 400,
        }
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestFault::NoRouteMatched { .. } => "no_route",
            RequestFault::MethodNotAllowed { .. } => "method_not_allowed",
            RequestFault::StaticAssetNotFound { .. } => "static_not_found",
            RequestFault::UnrecognizedHandlerResult { .. } => "incompatible_result",
        }
    }
}
