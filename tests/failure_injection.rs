//! Failure injection: handlers and clients misbehaving.

use std::time::Duration;

use minimus::routing::PathParams;
use minimus::{AppConfig, Application, RequestContext};

mod common;

#[tokio::test]
async fn test_panicking_handler_does_not_take_down_server() {
    let app = Application::new(AppConfig::default()).unwrap();
    app.route("/boom", |_: &RequestContext, _: &PathParams| -> String {
        panic!("injected failure")
    })
    .unwrap();
    app.route("/ok", |_: &RequestContext, _: &PathParams| "ok").unwrap();

    let server = common::start_server(app).await;
    let client = common::client();

    for _ in 0..3 {
        let res = client.get(server.url("/boom")).send().await.unwrap();
        assert_eq!(res.status(), 500);
    }
    let res = client.get(server.url("/ok")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    server.stop().await;
}

#[tokio::test]
async fn test_slow_handler_times_out() {
    let mut config = AppConfig::default();
    config.timeouts.request_secs = 1;
    let app = Application::new(config).unwrap();
    app.route("/slow", |_: &RequestContext, _: &PathParams| {
        std::thread::sleep(Duration::from_secs(3));
        "too late"
    })
    .unwrap();

    let server = common::start_server(app).await;
    let res = common::client().get(server.url("/slow")).send().await.unwrap();
    assert_eq!(res.status(), 408);

    server.stop().await;
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let mut config = AppConfig::default();
    config.listener.max_body_bytes = 16;
    let app = Application::new(config).unwrap();
    app.add_route(
        "/upload",
        |ctx: &RequestContext, _: &PathParams| ctx.body().len().to_string(),
        ["POST"],
        None,
    )
    .unwrap();

    let server = common::start_server(app).await;
    let client = common::client();

    let res = client.post(server.url("/upload")).body("small").send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "5");

    let res = client
        .post(server.url("/upload"))
        .body(vec![b'x'; 1024])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 413);

    server.stop().await;
}

#[tokio::test]
async fn test_graceful_shutdown_stops_accepting() {
    let app = Application::new(AppConfig::default()).unwrap();
    app.route("/", |_: &RequestContext, _: &PathParams| "up").unwrap();

    let server = common::start_server(app).await;
    let url = server.url("/");
    let client = reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap();

    assert_eq!(client.get(&url).send().await.unwrap().status(), 200);

    server.stop().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(client.get(&url).send().await.is_err(), "listener should be closed");
}
