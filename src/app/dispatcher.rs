//! Request dispatch.
//!
//! # Responsibilities
//! - Own the route table, static resolver and response model
//! - Run the per-request state machine:
//!   bootstrap page → static check → route scan → method check →
//!   handler → normalize
//! - Map every request fault to a response
//! - Run before/after hooks, log and record metrics per request
//!
//! # Design Decisions
//! - The route table sits behind an `ArcSwap`; registration is
//!   copy-on-write and each dispatch works on one snapshot
//! - First registered matching route wins; a method mismatch on that
//!   route is final (405) and scanning stops
//! - Nothing request-scoped is stored on the application
//! - Handler panics are not caught here; the transport decides

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;

use crate::app::view::{View, ViewHandler, METHOD_NOT_ALLOWED_BODY, VIEW_METHODS};
use crate::config::validation::validate_config;
use crate::config::{AppConfig, ConfigError};
use crate::http::cookies;
use crate::http::fault::RequestFault;
use crate::http::request::RequestContext;
use crate::http::response::{Charset, Header, HandlerResult, Response, ResponseModel};
use crate::observability::metrics;
use crate::routing::{PathParams, RouteTable, RoutingError, DEFAULT_METHODS};
use crate::static_files::StaticResolver;
use crate::templates::TemplateRenderer;

const NOT_FOUND_BODY: &str = "<h1>404 Not Found</h1>";

const LOGO: &str = r"
  __  __ _       _
 |  \/  (_)     (_)
 | \  / |_ _ __  _ _ __ ___  _   _ ___
 | |\/| | | '_ \| | '_ ` _ \| | | / __|
 | |  | | | | | | | | | | | | |_| \__ \
 |_|  |_|_|_| |_|_|_| |_| |_|\__,_|___/
------------------------------------------";

/// Text banner shown at startup and on an application with no routes.
pub fn logo() -> String {
    format!(
        "{LOGO}\n a minimal web framework, v{}\n------------------------------------------\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Something that answers requests for a route.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: &RequestContext, params: &PathParams) -> HandlerResult;
}

impl<F, R> Handler for F
where
    F: Fn(&RequestContext, &PathParams) -> R + Send + Sync + 'static,
    R: Into<HandlerResult>,
{
    fn call(&self, ctx: &RequestContext, params: &PathParams) -> HandlerResult {
        self(ctx, params).into()
    }
}

pub type SharedHandler = Arc<dyn Handler>;

type BeforeHook = Arc<dyn Fn(&RequestContext) + Send + Sync>;
type AfterHook = Arc<dyn Fn(&RequestContext, &Response) + Send + Sync>;
type NotFoundProvider = Arc<dyn Fn(&RequestContext) -> String + Send + Sync>;

#[derive(Clone, Default)]
struct Hooks {
    before: Vec<BeforeHook>,
    after: Vec<AfterHook>,
    not_found: Option<NotFoundProvider>,
}

/// Which branch of the state machine produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Bootstrap,
    Static,
    Handler,
    Fault(&'static str),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Bootstrap => "bootstrap",
            Outcome::Static => "static",
            Outcome::Handler => "handler",
            Outcome::Fault(kind) => *kind,
        }
    }
}

/// The application: routes plus everything needed to answer a request.
pub struct Application {
    config: Arc<AppConfig>,
    model: ResponseModel,
    routes: ArcSwap<RouteTable<SharedHandler>>,
    hooks: ArcSwap<Hooks>,
    statics: StaticResolver,
    templates: Arc<TemplateRenderer>,
}

impl Application {
    /// Build an application from a configuration, validating it first.
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        // validated above
        let charset: Charset = config.app.charset.parse().unwrap_or_default();
        let dirs = config.app.candidate_dirs();
        tracing::debug!(dirs = ?dirs, charset = %charset, "Application created");

        Ok(Self {
            model: ResponseModel::new(charset),
            routes: ArcSwap::from_pointee(RouteTable::new()),
            hooks: ArcSwap::from_pointee(Hooks::default()),
            statics: StaticResolver::new(dirs.clone()),
            templates: Arc::new(TemplateRenderer::new(dirs)),
            config: Arc::new(config),
        })
    }

    /// Replace the template renderer, e.g. one with extra filters.
    pub fn with_templates(mut self, templates: TemplateRenderer) -> Self {
        self.templates = Arc::new(templates);
        self
    }

    pub fn config(&self) -> &Arc<AppConfig> {
        &self.config
    }

    pub fn response_model(&self) -> ResponseModel {
        self.model
    }

    pub fn static_resolver(&self) -> &StaticResolver {
        &self.statics
    }

    /// Shared renderer, for handlers to capture.
    pub fn templates(&self) -> Arc<TemplateRenderer> {
        Arc::clone(&self.templates)
    }

    /// Snapshot of the current route table.
    pub fn routes(&self) -> Arc<RouteTable<SharedHandler>> {
        self.routes.load_full()
    }

    /// Register a closure handler. Returns `Ok(false)` when `pattern` is
    /// already registered (the first registration wins).
    pub fn add_route<F, R, I, S>(
        &self,
        pattern: &str,
        handler: F,
        methods: I,
        name: Option<&str>,
    ) -> Result<bool, RoutingError>
    where
        F: Fn(&RequestContext, &PathParams) -> R + Send + Sync + 'static,
        R: Into<HandlerResult>,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.add_handler(pattern, Arc::new(handler), methods, name)
    }

    /// Register a GET-only closure handler without a name.
    pub fn route<F, R>(&self, pattern: &str, handler: F) -> Result<bool, RoutingError>
    where
        F: Fn(&RequestContext, &PathParams) -> R + Send + Sync + 'static,
        R: Into<HandlerResult>,
    {
        self.add_route(pattern, handler, DEFAULT_METHODS, None)
    }

    /// Register a view for GET, POST, PUT and DELETE.
    pub fn add_view<V: View>(
        &self,
        pattern: &str,
        view: V,
        name: Option<&str>,
    ) -> Result<bool, RoutingError> {
        self.add_handler(pattern, Arc::new(ViewHandler::new(view)), VIEW_METHODS, name)
    }

    /// Register any shared handler.
    pub fn add_handler<I, S>(
        &self,
        pattern: &str,
        handler: SharedHandler,
        methods: I,
        name: Option<&str>,
    ) -> Result<bool, RoutingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let methods: Vec<String> = methods.into_iter().map(|m| m.as_ref().to_string()).collect();
        let mut outcome = Ok(false);
        self.routes.rcu(|current| {
            let mut table = RouteTable::clone(current);
            outcome = table.add(pattern, Arc::clone(&handler), &methods, name);
            table
        });
        outcome
    }

    /// URL for the route registered under `name`.
    pub fn url_for(&self, name: &str, params: &PathParams) -> Result<String, RoutingError> {
        self.routes.load().url_for(name, params)
    }

    /// Replace the default `<h1>404 Not Found</h1>` body.
    pub fn set_not_found<F>(&self, provider: F)
    where
        F: Fn(&RequestContext) -> String + Send + Sync + 'static,
    {
        let provider: NotFoundProvider = Arc::new(provider);
        self.hooks.rcu(|hooks| {
            let mut hooks = Hooks::clone(hooks);
            hooks.not_found = Some(Arc::clone(&provider));
            hooks
        });
    }

    /// Call `hook` before every dispatch.
    pub fn before_request<F>(&self, hook: F)
    where
        F: Fn(&RequestContext) + Send + Sync + 'static,
    {
        let hook: BeforeHook = Arc::new(hook);
        self.hooks.rcu(|hooks| {
            let mut hooks = Hooks::clone(hooks);
            hooks.before.push(Arc::clone(&hook));
            hooks
        });
    }

    /// Call `hook` with every finished response.
    pub fn after_request<F>(&self, hook: F)
    where
        F: Fn(&RequestContext, &Response) + Send + Sync + 'static,
    {
        let hook: AfterHook = Arc::new(hook);
        self.hooks.rcu(|hooks| {
            let mut hooks = Hooks::clone(hooks);
            hooks.after.push(Arc::clone(&hook));
            hooks
        });
    }

    /// Cookie `name` from the request, de-obscured with the configured
    /// secret when there is one.
    pub fn cookie(&self, ctx: &RequestContext, name: &str) -> Option<String> {
        ctx.cookie(name, self.config.app.cookie_secret.as_deref())
    }

    /// `Set-Cookie` header using the configured secret.
    pub fn set_cookie(&self, name: &str, value: &str, days: u32) -> Header {
        cookies::cookie_header(name, value, self.config.app.cookie_secret.as_deref(), days)
    }

    /// Answer one request.
    pub fn dispatch(&self, ctx: &RequestContext) -> Response {
        let start = Instant::now();
        let hooks = self.hooks.load();
        for hook in &hooks.before {
            hook(ctx);
        }

        let (response, outcome) = self.respond(ctx, &hooks);

        for hook in &hooks.after {
            hook(ctx, &response);
        }

        tracing::debug!(
            method = %ctx.method(),
            path = %ctx.path(),
            status = response.status(),
            outcome = outcome.label(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Request dispatched"
        );
        metrics::record_request(ctx.method(), response.status(), outcome.label(), start);
        response
    }

    fn respond(&self, ctx: &RequestContext, hooks: &Hooks) -> (Response, Outcome) {
        let routes = self.routes.load();
        if routes.is_empty() {
            return (
                self.model.html(200, format!("<pre>{}</pre>", logo())),
                Outcome::Bootstrap,
            );
        }

        let path = ctx.path();
        if path.contains(self.config.app.static_marker()) {
            return match self.statics.serve(path) {
                Ok(result) => (self.model.normalize(result), Outcome::Static),
                Err(fault) => self.fault(ctx, fault, hooks),
            };
        }

        let Some((route, params)) = routes.match_path(path) else {
            return self.fault(ctx, RequestFault::NoRouteMatched { path: path.to_string() }, hooks);
        };

        if !route.allows(ctx.method()) {
            let fault = RequestFault::MethodNotAllowed {
                method: ctx.method().to_string(),
                path: path.to_string(),
            };
            return self.fault(ctx, fault, hooks);
        }

        tracing::trace!(pattern = %route.pattern(), params = ?params, "Route matched");
        let raw = route.handler().call(ctx, &params);
        match self.model.try_normalize(raw) {
            Ok(response) => (response, Outcome::Handler),
            Err(fault) => self.fault(ctx, fault, hooks),
        }
    }

    fn fault(
        &self,
        ctx: &RequestContext,
        fault: RequestFault,
        hooks: &Hooks,
    ) -> (Response, Outcome) {
        let status = fault.status();
        let response = match &fault {
            RequestFault::NoRouteMatched { .. } | RequestFault::StaticAssetNotFound { .. } => {
                tracing::debug!(path = %ctx.path(), error = %fault, "Not found");
                let body = match &hooks.not_found {
                    Some(provider) => provider(ctx),
                    None => NOT_FOUND_BODY.to_string(),
                };
                self.model.html(status, body)
            }
            RequestFault::MethodNotAllowed { .. } => {
                tracing::debug!(error = %fault, "Method not allowed");
                self.model.html(status, METHOD_NOT_ALLOWED_BODY)
            }
            RequestFault::UnrecognizedHandlerResult { .. } => {
                tracing::warn!(
                    path = %ctx.path(),
                    error = %fault,
                    "Handler returned an unusable result"
                );
                self.model.incompatible(Some(ctx.path()), &fault)
            }
        };
        (response, Outcome::Fault(fault.kind()))
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("routes", &self.routes.load().len())
            .field("charset", &self.model.charset())
            .finish_non_exhaustive()
    }
}
