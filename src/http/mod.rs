//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, body read)
//!     → request.rs (RequestContext: method, path, query, headers, body)
//!     → [application dispatch]
//!     → response.rs (normalize handler result, default headers)
//!     → server.rs (canonical response → HTTP response)
//!     → Send to client
//! ```
//!
//! cookies.rs builds `Set-Cookie` headers and reads `Cookie` headers;
//! fault.rs lists the per-request faults and their status codes.

pub mod cookies;
pub mod fault;
pub mod request;
pub mod response;
pub mod server;

pub use fault::RequestFault;
pub use request::{MultiDict, RequestContext};
pub use response::{abort, jsonify, redirect, HandlerResult, Response, ResponseModel, StatusSpec};
pub use server::HttpServer;
