//! End-to-end tests for the relay endpoint.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use ai_relay::config::RelayConfig;
use ai_relay::http::HttpServer;
use ai_relay::lifecycle::Shutdown;
use tokio::sync::mpsc;

mod common;

const FALLBACK_BODY: &str = r#"{"status":"ok","message":"AI is offline, using local logic."}"#;

fn relay_config(backend_addr: SocketAddr) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.upstream.chat_url = format!("http://{}/chat", backend_addr);
    config.health_check.enabled = false;
    config
}

async fn start_relay(config: RelayConfig, addr: SocketAddr, shutdown: &Shutdown) {
    let (_config_tx, config_updates) = mpsc::unbounded_channel::<RelayConfig>();
    let server = HttpServer::new(config);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
}

fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn streams_upstream_body_with_event_stream_headers() {
    let backend_addr: SocketAddr = "127.0.0.1:29181".parse().unwrap();
    let relay_addr: SocketAddr = "127.0.0.1:29182".parse().unwrap();

    common::start_mock_backend(backend_addr, "data: hi\n\n").await;

    let shutdown = Shutdown::new();
    start_relay(relay_config(backend_addr), relay_addr, &shutdown).await;

    let res = test_client()
        .post(format!("http://{}/api/ai/apply", relay_addr))
        .header("content-type", "application/json")
        .body(r#"{"prompt":"hello","elements":[]}"#)
        .send()
        .await
        .expect("relay unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    assert_eq!(res.headers().get("cache-control").unwrap(), "no-cache");

    let body = res.text().await.unwrap();
    assert_eq!(body, "data: hi\n\n");

    shutdown.trigger();
}

#[tokio::test]
async fn upstream_error_status_degrades_to_fallback() {
    let backend_addr: SocketAddr = "127.0.0.1:29201".parse().unwrap();
    let relay_addr: SocketAddr = "127.0.0.1:29202".parse().unwrap();

    common::start_programmable_backend(backend_addr, || async {
        (500, "Internal Server Error".into())
    })
    .await;

    let shutdown = Shutdown::new();
    start_relay(relay_config(backend_addr), relay_addr, &shutdown).await;

    let res = test_client()
        .post(format!("http://{}/api/ai/apply", relay_addr))
        .header("content-type", "application/json")
        .body("{}")
        .send()
        .await
        .expect("relay unreachable");

    assert_eq!(res.status(), 200, "Degraded responses still report 200");
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "application/json"
    );
    assert_eq!(res.text().await.unwrap(), FALLBACK_BODY);

    shutdown.trigger();
}

#[tokio::test]
async fn invalid_json_body_is_forwarded_as_empty_object() {
    let backend_addr: SocketAddr = "127.0.0.1:29221".parse().unwrap();
    let relay_addr: SocketAddr = "127.0.0.1:29222".parse().unwrap();

    let mut captured = common::start_capturing_backend(backend_addr).await;

    let shutdown = Shutdown::new();
    start_relay(relay_config(backend_addr), relay_addr, &shutdown).await;

    let res = test_client()
        .post(format!("http://{}/api/ai/apply", relay_addr))
        .header("content-type", "application/json")
        .body("this is not json{{")
        .send()
        .await
        .expect("relay unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let upstream_body = captured.recv().await.unwrap();
    assert_eq!(upstream_body, "{}");

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_upstream_degrades_to_fallback() {
    // Nothing listens on the upstream port
    let backend_addr: SocketAddr = "127.0.0.1:29241".parse().unwrap();
    let relay_addr: SocketAddr = "127.0.0.1:29242".parse().unwrap();

    let shutdown = Shutdown::new();
    start_relay(relay_config(backend_addr), relay_addr, &shutdown).await;

    let res = test_client()
        .post(format!("http://{}/api/ai/apply", relay_addr))
        .header("content-type", "application/json")
        .body(r#"{"prompt":"hello"}"#)
        .send()
        .await
        .expect("relay unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), FALLBACK_BODY);

    shutdown.trigger();
}

#[tokio::test]
async fn parsed_body_is_reserialized_before_forwarding() {
    let backend_addr: SocketAddr = "127.0.0.1:29261".parse().unwrap();
    let relay_addr: SocketAddr = "127.0.0.1:29262".parse().unwrap();

    let mut captured = common::start_capturing_backend(backend_addr).await;

    let shutdown = Shutdown::new();
    start_relay(relay_config(backend_addr), relay_addr, &shutdown).await;

    let original = r#"{ "prompt" : "hi" ,  "elements" : [ ] }"#;
    test_client()
        .post(format!("http://{}/api/ai/apply", relay_addr))
        .header("content-type", "application/json")
        .body(original)
        .send()
        .await
        .expect("relay unreachable");

    let upstream_body = captured.recv().await.unwrap();
    let parsed: serde_json::Value = serde_json::from_str(original).unwrap();

    // Same value, compacted by re-serialization; not the original bytes
    assert_eq!(upstream_body, serde_json::to_string(&parsed).unwrap());
    assert_ne!(upstream_body, original);

    shutdown.trigger();
}

#[tokio::test]
async fn empty_body_is_forwarded_as_empty_object() {
    let backend_addr: SocketAddr = "127.0.0.1:29281".parse().unwrap();
    let relay_addr: SocketAddr = "127.0.0.1:29282".parse().unwrap();

    let mut captured = common::start_capturing_backend(backend_addr).await;

    let shutdown = Shutdown::new();
    start_relay(relay_config(backend_addr), relay_addr, &shutdown).await;

    let res = test_client()
        .post(format!("http://{}/api/ai/apply", relay_addr))
        .send()
        .await
        .expect("relay unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(captured.recv().await.unwrap(), "{}");

    shutdown.trigger();
}

#[tokio::test]
async fn slow_upstream_degrades_when_bound_is_configured() {
    let backend_addr: SocketAddr = "127.0.0.1:29301".parse().unwrap();
    let relay_addr: SocketAddr = "127.0.0.1:29302".parse().unwrap();

    common::start_programmable_backend(backend_addr, || async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        (200, "data: late\n\n".into())
    })
    .await;

    let mut config = relay_config(backend_addr);
    config.timeouts.upstream_secs = Some(1);

    let shutdown = Shutdown::new();
    start_relay(config, relay_addr, &shutdown).await;

    let started = Instant::now();
    let res = test_client()
        .post(format!("http://{}/api/ai/apply", relay_addr))
        .header("content-type", "application/json")
        .body("{}")
        .send()
        .await
        .expect("relay unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), FALLBACK_BODY);
    assert!(
        started.elapsed() < Duration::from_secs(4),
        "Should have degraded at the configured bound, not waited for the upstream"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let backend_addr: SocketAddr = "127.0.0.1:29321".parse().unwrap();
    let relay_addr: SocketAddr = "127.0.0.1:29322".parse().unwrap();

    let shutdown = Shutdown::new();
    start_relay(relay_config(backend_addr), relay_addr, &shutdown).await;

    let res = test_client()
        .get(format!("http://{}/", relay_addr))
        .send()
        .await
        .expect("relay unreachable");

    assert_eq!(res.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn config_update_switches_upstream() {
    let backend_a: SocketAddr = "127.0.0.1:29341".parse().unwrap();
    let backend_b: SocketAddr = "127.0.0.1:29342".parse().unwrap();
    let relay_addr: SocketAddr = "127.0.0.1:29343".parse().unwrap();

    common::start_mock_backend(backend_a, "data: a\n\n").await;
    common::start_mock_backend(backend_b, "data: b\n\n").await;

    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(relay_config(backend_a));
    let listener = tokio::net::TcpListener::bind(relay_addr).await.unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    let client = test_client();
    let url = format!("http://{}/api/ai/apply", relay_addr);

    let body = client
        .post(&url)
        .body("{}")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "data: a\n\n");

    config_tx.send(relay_config(backend_b)).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let body = client
        .post(&url)
        .body("{}")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "data: b\n\n");

    shutdown.trigger();
}
