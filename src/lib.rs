//! Minimus: a minimal web framework.
//!
//! Routes map URL patterns to handlers; handlers return loosely shaped
//! results that are normalized into one canonical response.
//!
//! ```no_run
//! use std::sync::Arc;
//! use minimus::{AppConfig, Application, HttpServer, PathParams, RequestContext};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let app = Application::new(AppConfig::default())?;
//! app.route("/hello/<name>", |_ctx: &RequestContext, params: &PathParams| {
//!     format!("Hello {}!", params.get("name").unwrap_or("World"))
//! })?;
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:5000").await?;
//! let shutdown = minimus::Shutdown::new();
//! HttpServer::new(Arc::new(app)).run(listener, shutdown.subscribe()).await?;
//! # Ok(())
//! # }
//! ```

// Core
pub mod app;
pub mod http;
pub mod routing;
pub mod static_files;
pub mod templates;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use app::{Application, View};
pub use config::AppConfig;
pub use http::{HandlerResult, HttpServer, RequestContext, Response};
pub use lifecycle::Shutdown;
pub use routing::PathParams;
