//! Minimus development server.
//!
//! Loads configuration, sets up logging and metrics, optionally registers
//! a handful of demo routes and serves until Ctrl+C or SIGTERM.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use minimus::app::{logo, Application, View};
use minimus::config::{load_config, AppConfig};
use minimus::http::cookies::{cookie_header, DEFAULT_COOKIE_DAYS};
use minimus::http::{abort, jsonify, redirect, HandlerResult, HttpServer, RequestContext};
use minimus::lifecycle::{signals, Shutdown};
use minimus::observability;
use minimus::routing::{PathParams, RoutingError};
use minimus::static_files::{send_from_directory, SendOptions};

#[derive(Parser)]
#[command(name = "minimus")]
#[command(about = "A minimal web framework development server", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the host of the bind address
    #[arg(long)]
    host: Option<String>,

    /// Override the port of the bind address
    #[arg(short, long)]
    port: Option<u16>,

    /// Register the demo routes
    #[arg(long)]
    demo: bool,

    /// Do not print the logo
    #[arg(short, long)]
    quiet: bool,
}

fn bind_address(config: &AppConfig, host: Option<&str>, port: Option<u16>) -> String {
    let current = &config.listener.bind_address;
    let (current_host, current_port) = current
        .rsplit_once(':')
        .unwrap_or((current.as_str(), "5000"));
    let host = host.unwrap_or(current_host);
    match port {
        Some(port) => format!("{host}:{port}"),
        None => format!("{host}:{current_port}"),
    }
}

struct Counter {
    hits: AtomicU64,
}

impl View for Counter {
    fn on_get(&self, _ctx: &RequestContext, _params: &PathParams) -> Option<HandlerResult> {
        Some(jsonify(&json!({"hits": self.hits.load(Ordering::Relaxed)})))
    }

    fn on_post(&self, _ctx: &RequestContext, _params: &PathParams) -> Option<HandlerResult> {
        let hits = self.hits.fetch_add(1, Ordering::Relaxed) + 1;
        Some(HandlerResult::json(&json!({"hits": hits})).with_status(201))
    }

    fn on_delete(&self, _ctx: &RequestContext, _params: &PathParams) -> Option<HandlerResult> {
        self.hits.store(0, Ordering::Relaxed);
        Some(("", 204u16).into())
    }
}

fn register_demo_routes(app: &Arc<Application>) -> Result<(), RoutingError> {
    app.add_route(
        "/",
        |_: &RequestContext, _: &PathParams| {
            "<h1>Minimus</h1>\
             <ul>\
             <li><a href=\"/hello/World\">/hello/World</a></li>\
             <li><a href=\"/data.json\">/data.json</a></li>\
             <li><a href=\"/counter\">/counter</a></li>\
             <li><a href=\"/greet\">/greet</a></li>\
             </ul>"
        },
        ["GET"],
        Some("index"),
    )?;

    app.add_route(
        "/hello/<name>",
        |_: &RequestContext, params: &PathParams| {
            format!("<h1>Hello {}!</h1>", params.get("name").unwrap_or("World"))
        },
        ["GET"],
        Some("hello"),
    )?;

    app.route("/data.json", |ctx: &RequestContext, _: &PathParams| {
        jsonify(&json!({
            "path": ctx.path(),
            "query": ctx.query().iter().collect::<Vec<_>>(),
        }))
    })?;

    app.add_route(
        "/greet",
        |ctx: &RequestContext, _: &PathParams| -> HandlerResult {
            if ctx.method() == "POST" {
                let name = ctx.form().get("name").unwrap_or("stranger").to_string();
                let cookie = cookie_header("greeted", &name, None, DEFAULT_COOKIE_DAYS);
                return HandlerResult::text(format!("<p>Nice to meet you, {name}.</p>"))
                    .with_headers(200, vec![cookie]);
            }
            match ctx.cookie("greeted", None) {
                Some(name) => format!("<p>Welcome back, {name}.</p>").into(),
                None => {
                    "<form method=\"post\"><input name=\"name\"><button>Greet</button></form>"
                        .into()
                }
            }
        },
        ["GET", "POST"],
        Some("greet"),
    )?;

    // weak: the route table owning this handler lives inside the application
    let weak = Arc::downgrade(app);
    app.route("/go/<name>", move |ctx: &RequestContext, params: &PathParams| {
        let Some(app) = weak.upgrade() else {
            return abort(503, None);
        };
        match app.url_for("hello", params) {
            Ok(url) => redirect(&url, None, ctx.protocol()),
            Err(e) => abort(400, Some(&e.to_string())),
        }
    })?;

    let templates = app.templates();
    app.route("/page/<name>", move |_: &RequestContext, params: &PathParams| {
        let name = params.get("name").unwrap_or("index");
        templates.render(&format!("{name}.html"), json!({"name": name}))
    })?;

    let dirs = app.config().app.candidate_dirs();
    app.route("/files/<path:file>", move |_: &RequestContext, params: &PathParams| {
        let file = params.get("file").unwrap_or("");
        send_from_directory(file, &dirs, &SendOptions::default())
    })?;

    app.add_view("/counter", Counter { hits: AtomicU64::new(0) }, Some("counter"))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    config.listener.bind_address = bind_address(&config, cli.host.as_deref(), cli.port);

    observability::init_logging(&config.observability);
    if !cli.quiet {
        println!("{}", logo());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        root_dir = %config.app.root_dir.display(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = Arc::new(Application::new(config)?);
    if cli.demo {
        register_demo_routes(&app)?;
        tracing::info!(routes = app.routes().len(), "Demo routes registered");
    }

    let listener = TcpListener::bind(&app.config().listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    HttpServer::new(app).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
