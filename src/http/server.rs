//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router funnelling every request into the application
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Bind server to listener and shut down gracefully
//! - Convert between HTTP messages and [`RequestContext`] / [`Response`]
//!
//! # Design Decisions
//! - One catch-all handler; routing is the application's job
//! - Dispatch runs on the blocking pool: handlers are synchronous and may
//!   read files
//! - A panicking handler becomes a 500 for that request only

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{request::Parts, HeaderName, HeaderValue, Request, StatusCode},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::app::Application;
use crate::http::request::RequestContext;
use crate::http::response::Response;
use crate::lifecycle::ShutdownSignal;

pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for an [`Application`].
pub struct HttpServer {
    app: Arc<Application>,
    router: Router,
}

impl HttpServer {
    pub fn new(app: Arc<Application>) -> Self {
        let router = Self::build_router(Arc::clone(&app));
        Self { app, router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(app: Arc<Application>) -> Router {
        let listener = &app.config().listener;
        let timeout = Duration::from_secs(app.config().timeouts.request_secs);
        let body_limit = listener.max_body_bytes;

        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(RequestBodyLimitLayer::new(body_limit))
            .layer(TimeoutLayer::new(timeout));

        Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(app)
            .layer(middleware)
    }

    /// The router, e.g. for driving with `tower::ServiceExt::oneshot`.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn application(&self) -> &Arc<Application> {
        &self.app
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, routes = self.app.routes().len(), "HTTP server starting");

        let service = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the per-request context from the request head and a fully read body.
pub fn request_context(parts: &Parts, body: bytes::Bytes) -> RequestContext {
    let raw_path = parts.uri.path();
    let path = urlencoding::decode(raw_path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| raw_path.to_string());

    let headers = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let mut ctx = RequestContext::new(parts.method.as_str(), path)
        .with_query(parts.uri.query().unwrap_or(""))
        .with_headers(headers)
        .with_body(body)
        .with_protocol(format!("{:?}", parts.version));
    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        ctx = ctx.with_remote_addr(*addr);
    }
    ctx
}

/// Convert a canonical response into an HTTP response, keeping header order.
pub fn into_http_response(response: Response) -> axum::response::Response {
    let status = StatusCode::from_u16(response.status()).unwrap_or_else(|_| {
        tracing::warn!(status = response.status(), "Unsendable status, answering 500");
        StatusCode::INTERNAL_SERVER_ERROR
    });
    let body = response.body_bytes();
    let (_, _, headers) = response.into_triple();

    let mut http = axum::response::Response::new(Body::from(body));
    *http.status_mut() = status;
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            (Ok(name), Ok(value)) => {
                http.headers_mut().append(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping invalid response header"),
        }
    }
    http
}

/// Catch-all handler: read the body, dispatch on the blocking pool.
async fn dispatch_handler(
    State(app): State<Arc<Application>>,
    request: Request<Body>,
) -> axum::response::Response {
    let (parts, body) = request.into_parts();
    let limit = app.config().listener.max_body_bytes;
    let body = match axum::body::to_bytes(body, limit).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(path = %parts.uri.path(), error = %e, "Failed to read request body");
            let model = app.response_model();
            return into_http_response(model.html(413, "<h1>413 Payload Too Large</h1>"));
        }
    };

    let ctx = request_context(&parts, body);
    let worker = Arc::clone(&app);
    match tokio::task::spawn_blocking(move || worker.dispatch(&ctx)).await {
        Ok(response) => into_http_response(response),
        Err(e) => {
            tracing::error!(
                method = %parts.method,
                path = %parts.uri.path(),
                error = %e,
                "Handler panicked"
            );
            let model = app.response_model();
            into_http_response(model.html(500, "<h1>500 Internal Server Error</h1>"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::routing::PathParams;
    use tower::ServiceExt;

    fn server() -> HttpServer {
        let app = Application::new(AppConfig::default()).unwrap();
        app.route("/hello/<name>", |ctx: &RequestContext, params: &PathParams| {
            format!("{} {}", ctx.method(), params.get("name").unwrap_or(""))
        })
        .unwrap();
        app.add_route(
            "/echo",
            |ctx: &RequestContext, _: &PathParams| ctx.form().get("msg").unwrap_or("").to_string(),
            ["POST"],
            None,
        )
        .unwrap();
        app.route("/boom", |_: &RequestContext, _: &PathParams| -> String {
            panic!("handler failure")
        })
        .unwrap();
        HttpServer::new(Arc::new(app))
    }

    async fn send(
        server: &HttpServer,
        request: Request<Body>,
    ) -> (StatusCode, axum::http::HeaderMap, String) {
        let response = server.router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn test_dispatch_through_router() {
        let server = server();
        let request = Request::get("/hello/World%20Wide").body(Body::empty()).unwrap();
        let (status, headers, body) = send(&server, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "GET World Wide");
        assert_eq!(headers["content-type"], "text/html;charset=UTF-8");
        assert!(headers.contains_key(X_REQUEST_ID));
    }

    #[tokio::test]
    async fn test_form_body() {
        let server = server();
        let request = Request::post("/echo")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("msg=hi+there"))
            .unwrap();
        let (status, _, body) = send(&server, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "hi there");
    }

    #[tokio::test]
    async fn test_panicking_handler_is_500() {
        let server = server();
        let request = Request::get("/boom").body(Body::empty()).unwrap();
        let (status, _, _) = send(&server, request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        // the server keeps answering
        let request = Request::get("/hello/again").body(Body::empty()).unwrap();
        assert_eq!(send(&server, request).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_body_limit_and_timeout_layers() {
        let mut config = AppConfig::default();
        config.listener.max_body_bytes = 8;
        config.timeouts.request_secs = 1;
        let app = Application::new(config).unwrap();
        app.add_route(
            "/upload",
            |ctx: &RequestContext, _: &PathParams| ctx.body().len().to_string(),
            ["POST"],
            None,
        )
        .unwrap();
        app.route("/slow", |_: &RequestContext, _: &PathParams| {
            std::thread::sleep(Duration::from_millis(1500));
            "late"
        })
        .unwrap();
        let server = HttpServer::new(Arc::new(app));

        let request = Request::post("/upload").body(Body::from("tiny")).unwrap();
        assert_eq!(send(&server, request).await.2, "4");

        let request = Request::post("/upload")
            .header("content-length", "64")
            .body(Body::from(vec![b'x'; 64]))
            .unwrap();
        assert_eq!(send(&server, request).await.0, StatusCode::PAYLOAD_TOO_LARGE);

        let request = Request::get("/slow").body(Body::empty()).unwrap();
        assert_eq!(send(&server, request).await.0, StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_status_outside_wire_range_is_400() {
        let app = Application::new(AppConfig::default()).unwrap();
        app.route("/zero", |_: &RequestContext, _: &PathParams| ("x", 0u16)).unwrap();
        let server = HttpServer::new(Arc::new(app));

        let request = Request::get("/zero").body(Body::empty()).unwrap();
        let (status, _, body) = send(&server, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("/zero produced incompatible response."));
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let server = server();
        let request = Request::get("/hello/x")
            .header(X_REQUEST_ID, "abc-123")
            .body(Body::empty())
            .unwrap();
        let (_, headers, _) = send(&server, request).await;
        assert_eq!(headers[X_REQUEST_ID], "abc-123");
    }

    #[test]
    fn test_request_context_from_parts() {
        let request = Request::put("/a%2Fb/c?x=1&y=2")
            .header("Cookie", "k=v")
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();
        let ctx = request_context(&parts, bytes::Bytes::from_static(b"payload"));
        assert_eq!(ctx.method(), "PUT");
        assert_eq!(ctx.path(), "/a/b/c");
        assert_eq!(ctx.query_string(), "x=1&y=2");
        assert_eq!(ctx.cookie("k", None).as_deref(), Some("v"));
        assert_eq!(ctx.protocol(), "HTTP/1.1");
        assert_eq!(ctx.body().as_ref(), b"payload");
    }

    #[test]
    fn test_into_http_response_keeps_headers() {
        let model = crate::http::response::ResponseModel::default();
        let response = model.normalize((
            "x",
            201u16,
            vec![("Set-Cookie", "a=1"), ("Set-Cookie", "b=2")],
        ));
        let http = into_http_response(response);
        assert_eq!(http.status(), StatusCode::CREATED);
        let cookies: Vec<_> = http.headers().get_all("set-cookie").iter().collect();
        assert_eq!(cookies.len(), 2);
        assert_eq!(http.headers()["content-length"], "1");
    }
}
