//! Application subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext (built by the transport)
//!     → dispatcher.rs (hooks, bootstrap page, static check)
//!     → static_files (file found → response)
//!     → routing (first matching route, method check)
//!     → handler / view.rs (per-method capability)
//!     → http::response (normalize to canonical Response)
//!     → back to the transport
//! ```
//!
//! # Design Decisions
//! - `Application` is shared as `Arc<Application>` across requests
//! - Every fault converges to a well-formed response
//! - Handlers are plain closures or [`View`] implementations

pub mod dispatcher;
pub mod view;

pub use dispatcher::{logo, Application, Handler, Outcome, SharedHandler};
pub use view::View;
