//! End-to-end dispatch over HTTP.

use minimus::http::{abort, redirect};
use minimus::routing::PathParams;
use minimus::{AppConfig, Application, HandlerResult, RequestContext, View};
use serde_json::{json, Value};

mod common;

fn app() -> Application {
    Application::new(AppConfig::default()).unwrap()
}

#[tokio::test]
async fn test_empty_application_serves_logo() {
    let server = common::start_server(app()).await;

    let res = common::client().get(server.url("/whatever")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let body = res.text().await.unwrap();
    assert!(body.starts_with("<pre>"));

    server.stop().await;
}

#[tokio::test]
async fn test_routes_status_and_headers() {
    let app = app();
    app.add_route(
        "/hello/<name>",
        |_: &RequestContext, params: &PathParams| {
            format!("Hello {}!", params.get("name").unwrap_or(""))
        },
        ["GET"],
        Some("hello"),
    )
    .unwrap();
    app.route("/x", |_: &RequestContext, _: &PathParams| "x").unwrap();

    let server = common::start_server(app).await;
    let client = common::client();

    let res = client.get(server.url("/hello/World")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "text/html;charset=UTF-8");
    assert_eq!(res.headers()["content-length"], "12");
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "Hello World!");

    let res = client.get(server.url("/nowhere")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "<h1>404 Not Found</h1>");

    let res = client.post(server.url("/x")).send().await.unwrap();
    assert_eq!(res.status(), 405);
    assert_eq!(res.text().await.unwrap(), "<h1>405 Method not allowed</h1>");

    let res = client.get(server.url("/hello")).send().await.unwrap();
    assert_eq!(res.status(), 404, "arity mismatch is not a match");

    server.stop().await;
}

#[tokio::test]
async fn test_result_shapes() {
    let app = app();
    app.route("/json", |ctx: &RequestContext, _: &PathParams| {
        json!({"q": ctx.query().get("q"), "tags": ctx.query().get_all("tag")})
    })
    .unwrap();
    app.route("/created", |_: &RequestContext, _: &PathParams| {
        ("made", "201 Created", vec![("X-Thing", "yes"), ("Content-Length", "999")])
    })
    .unwrap();
    app.route("/css", |_: &RequestContext, _: &PathParams| ("p {}", 200u16, "text/css")).unwrap();
    app.route("/bytes", |_: &RequestContext, _: &PathParams| vec![0u8, 1, 2, 255]).unwrap();
    app.route("/nothing", |_: &RequestContext, _: &PathParams| HandlerResult::Empty).unwrap();
    app.route("/forbidden", |_: &RequestContext, _: &PathParams| abort(403, None)).unwrap();
    app.route("/away", |ctx: &RequestContext, _: &PathParams| {
        redirect("/json", None, ctx.protocol())
    })
    .unwrap();

    let server = common::start_server(app).await;
    let client = common::client();

    let res = client.get(server.url("/json?q=rust&tag=a&tag=b")).send().await.unwrap();
    assert_eq!(res.headers()["content-type"], "application/json;charset=UTF-8");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"q": "rust", "tags": ["a", "b"]}));

    let res = client.get(server.url("/created")).send().await.unwrap();
    assert_eq!(res.status(), 201);
    assert_eq!(res.headers()["x-thing"], "yes");
    assert_eq!(res.headers()["content-length"], "4");
    assert_eq!(res.text().await.unwrap(), "made");

    let res = client.get(server.url("/css")).send().await.unwrap();
    assert_eq!(res.headers()["content-type"], "text/css");

    let res = client.get(server.url("/bytes")).send().await.unwrap();
    assert_eq!(res.bytes().await.unwrap().as_ref(), &[0u8, 1, 2, 255]);

    let res = client.get(server.url("/nothing")).send().await.unwrap();
    assert_eq!(res.status(), 400);
    assert!(res.text().await.unwrap().contains("/nothing produced incompatible response."));

    let res = client.get(server.url("/forbidden")).send().await.unwrap();
    assert_eq!(res.status(), 403);
    assert_eq!(res.text().await.unwrap(), "<h1>403 Forbidden</h1>");

    let res = client.get(server.url("/away")).send().await.unwrap();
    assert_eq!(res.status(), 303);
    assert_eq!(res.headers()["location"], "/json");

    server.stop().await;
}

#[tokio::test]
async fn test_greedy_route() {
    let app = app();
    app.route("/files/<path:rest>", |_: &RequestContext, params: &PathParams| {
        params.get("rest").unwrap_or("").to_string()
    })
    .unwrap();

    let server = common::start_server(app).await;
    let res = common::client().get(server.url("/files/a/b/c.txt")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "a/b/c.txt");
    server.stop().await;
}

#[tokio::test]
async fn test_routes_added_while_serving() {
    let app = app();
    app.route("/", |_: &RequestContext, _: &PathParams| "home").unwrap();
    let server = common::start_server(app).await;
    let client = common::client();

    let res = client.get(server.url("/late")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    server
        .app
        .route("/late", |_: &RequestContext, _: &PathParams| "better late")
        .unwrap();
    let res = client.get(server.url("/late")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "better late");

    server.stop().await;
}

struct Notes;

impl View for Notes {
    fn on_get(&self, _: &RequestContext, params: &PathParams) -> Option<HandlerResult> {
        Some(HandlerResult::text(format!("note {}", params.get("id").unwrap_or(""))))
    }

    fn on_put(&self, ctx: &RequestContext, _: &PathParams) -> Option<HandlerResult> {
        let text = ctx.form().get("text").unwrap_or("").to_string();
        Some(HandlerResult::json(&json!({"saved": text})))
    }
}

#[tokio::test]
async fn test_view_capabilities() {
    let app = app();
    app.add_view("/notes/<id>", Notes, Some("note")).unwrap();
    let server = common::start_server(app).await;
    let client = common::client();

    let res = client.get(server.url("/notes/4")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "note 4");

    let res = client
        .put(server.url("/notes/4"))
        .form(&[("text", "buy milk")])
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"saved": "buy milk"}));

    let res = client.delete(server.url("/notes/4")).send().await.unwrap();
    assert_eq!(res.status(), 405);

    server.stop().await;
}

#[tokio::test]
async fn test_obscured_cookie_round_trip() {
    let mut config = AppConfig::default();
    config.app.cookie_secret = Some("s3cret".to_string());
    let app = Application::new(config).unwrap();

    let header = app.set_cookie("user", "ada", 1);
    app.route("/login", move |_: &RequestContext, _: &PathParams| {
        ("welcome", 200u16, vec![header.clone()])
    })
    .unwrap();

    let server = common::start_server(app).await;
    let weak_app = std::sync::Arc::downgrade(&server.app);
    server
        .app
        .route("/whoami", move |ctx: &RequestContext, _: &PathParams| {
            weak_app
                .upgrade()
                .and_then(|app| app.cookie(ctx, "user"))
                .unwrap_or_else(|| "anonymous".to_string())
        })
        .unwrap();
    let client = common::client();

    let res = client.get(server.url("/login")).send().await.unwrap();
    let set_cookie = res.headers()["set-cookie"].to_str().unwrap().to_string();
    let pair = set_cookie.split("; ").next().unwrap().to_string();
    assert!(pair.starts_with("user="));
    assert_ne!(pair, "user=ada");

    let res = client
        .get(server.url("/whoami"))
        .header("Cookie", pair)
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "ada");

    server.stop().await;
}
