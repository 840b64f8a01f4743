//! Capability-set views.
//!
//! A view answers some subset of GET, POST, PUT and DELETE for one route.
//! Methods a view does not implement fall through to the default `None`,
//! which the dispatcher answers with 405.

use crate::app::dispatcher::Handler;
use crate::http::request::RequestContext;
use crate::http::response::HandlerResult;
use crate::routing::PathParams;

/// Methods a view is registered for.
pub const VIEW_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE"];

pub const METHOD_NOT_ALLOWED_BODY: &str = "<h1>405 Method not allowed</h1>";

pub trait View: Send + Sync + 'static {
    fn on_get(&self, _ctx: &RequestContext, _params: &PathParams) -> Option<HandlerResult> {
        None
    }

    fn on_post(&self, _ctx: &RequestContext, _params: &PathParams) -> Option<HandlerResult> {
        None
    }

    fn on_put(&self, _ctx: &RequestContext, _params: &PathParams) -> Option<HandlerResult> {
        None
    }

    fn on_delete(&self, _ctx: &RequestContext, _params: &PathParams) -> Option<HandlerResult> {
        None
    }
}

/// Adapts a [`View`] to the [`Handler`] interface.
pub(crate) struct ViewHandler<V> {
    view: V,
}

impl<V: View> ViewHandler<V> {
    pub(crate) fn new(view: V) -> Self {
        Self { view }
    }
}

impl<V: View> Handler for ViewHandler<V> {
    fn call(&self, ctx: &RequestContext, params: &PathParams) -> HandlerResult {
        let result = match ctx.method() {
            "GET" => self.view.on_get(ctx, params),
            "POST" => self.view.on_post(ctx, params),
            "PUT" => self.view.on_put(ctx, params),
            "DELETE" => self.view.on_delete(ctx, params),
            _ => None,
        };
        result.unwrap_or_else(|| {
            tracing::debug!(
                method = %ctx.method(),
                path = %ctx.path(),
                "View has no handler for method"
            );
            HandlerResult::text(METHOD_NOT_ALLOWED_BODY).with_status(405)
        })
    }
}
