//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (startup, or later via copy-on-write):
//!     (pattern, handler, methods, name)
//!     → router.rs (validate methods, drop duplicate patterns)
//!     → append to RouteTable
//!
//! Incoming request path
//!     → router.rs (scan routes in registration order)
//!     → matcher.rs (segment-wise pattern match, extract variables)
//!     → Return: first matching Route + PathParams, or no match
//!
//! Reverse routing:
//!     route name → router.rs (find pattern) → matcher.rs (encode)
//! ```
//!
//! # Design Decisions
//! - First match wins (registration order), not most-specific match
//! - No regex: literal segments, `<name>` and greedy `<path:name>`
//! - Deterministic: same input always matches same route

pub mod error;
pub mod matcher;
pub mod router;

pub use error::RoutingError;
pub use matcher::{encode, match_route, MatchResult, PathParams, RouteValue};
pub use router::{Route, RouteTable, DEFAULT_METHODS};
