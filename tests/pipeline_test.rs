//! End-to-end pipeline tests
//!
//! Drives a full `Lifecycle` (listener, plugin workers and executor) over
//! an in-process queue and checks what reaches the index store and the
//! response key.

mod common;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use botbot_plugins::config::{Config, DispatchConfig, ElasticsearchConfig, QueueConfig};
use botbot_plugins::error::{BotbotError, Result};
use botbot_plugins::plugins::{build_plugins, DebugPlugin, PingPlugin, StorePlugin};
use botbot_plugins::queue::{MemoryQueue, Queue};
use botbot_plugins::storage::{Elasticsearch, IndexStore};
use botbot_plugins::{Action, Context, Lifecycle, LifecycleState, Line, Plugin};

use common::{eventually, memory_context};

/// Plugin that remembers every line it was invoked with
#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl Plugin for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn invoke(&self, line: &Line, _ctx: &Context) -> Result<Action> {
        self.seen.lock().await.push(line.content.clone());
        Ok(Action::NoOp)
    }
}

#[derive(Debug)]
struct FailingStore;

#[async_trait::async_trait]
impl IndexStore for FailingStore {
    async fn submit(&self, _document: Bytes) -> Result<Bytes> {
        Err(BotbotError::Storage("index unavailable".to_string()).into())
    }
}

fn dispatch() -> DispatchConfig {
    DispatchConfig {
        grace_period_secs: 5,
        ..Default::default()
    }
}

fn builtins() -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(PingPlugin),
        Arc::new(StorePlugin),
        Arc::new(DebugPlugin),
    ]
}

#[tokio::test]
async fn test_privmsg_is_stored_verbatim_and_not_answered() {
    let (ctx, queue, store) = memory_context();
    let payload = r#"{"Text":"hello world","Nick":"yml","Command":"PRIVMSG"}"#;
    queue
        .push("q", Bytes::from_static(payload.as_bytes()))
        .await
        .unwrap();

    let lifecycle = Lifecycle::new(ctx, builtins(), dispatch());
    let token = lifecycle.shutdown_token();
    let handle = tokio::spawn(lifecycle.run());

    eventually(|| {
        let store = store.clone();
        async move { !store.documents().await.is_empty() }
    })
    .await;
    token.cancel();
    let report = handle.await.unwrap();

    assert!(report.clean);
    assert_eq!(
        store.documents().await,
        vec![Bytes::from_static(payload.as_bytes())]
    );
    assert!(queue.is_empty("bot").await);

    let executor = report.executor.unwrap();
    assert_eq!(executor.stored, 1);
    // Ping and debug both answered with a no-op.
    assert_eq!(executor.skipped, 2);
    assert_eq!(executor.responded, 0);
}

#[tokio::test]
async fn test_ping_is_answered_on_response_key() {
    let (ctx, queue, _) = memory_context();
    let payload = serde_json::json!({
        "Content": "Bot: PING",
        "BotNick": "bot",
        "User": "alice",
        "Channel": "#botbot",
        "ChatBotId": 42,
        "Command": "PRIVMSG"
    });
    queue
        .push("q", Bytes::from(payload.to_string()))
        .await
        .unwrap();

    let lifecycle = Lifecycle::new(ctx, builtins(), dispatch());
    let token = lifecycle.shutdown_token();
    let handle = tokio::spawn(lifecycle.run());

    eventually(|| {
        let queue = queue.clone();
        async move { !queue.is_empty("bot").await }
    })
    .await;
    token.cancel();
    handle.await.unwrap();

    assert_eq!(
        queue.drain("bot").await,
        vec![Bytes::from_static(
            b"WRITE 42 #botbot Are you in need of my services, alice ?"
        )]
    );
}

#[tokio::test]
async fn test_every_plugin_sees_every_line_once_in_order() {
    let (ctx, queue, _) = memory_context();
    let first = Arc::new(Recorder::default());
    let second = Arc::new(Recorder::default());

    for text in ["a", "b", "c", "d"] {
        let payload = serde_json::json!({ "Content": text }).to_string();
        queue.push("q", Bytes::from(payload)).await.unwrap();
    }
    queue
        .push("q", Bytes::from_static(b"garbage"))
        .await
        .unwrap();

    let plugins: Vec<Arc<dyn Plugin>> = vec![first.clone(), second.clone()];
    let lifecycle = Lifecycle::new(ctx, plugins, dispatch());
    let token = lifecycle.shutdown_token();
    let handle = tokio::spawn(lifecycle.run());

    eventually(|| {
        let second = second.clone();
        async move { second.seen.lock().await.len() == 4 }
    })
    .await;
    token.cancel();
    let report = handle.await.unwrap();

    let expected = vec!["a", "b", "c", "d"];
    assert_eq!(*first.seen.lock().await, expected);
    assert_eq!(*second.seen.lock().await, expected);
    let listener = report.listener.unwrap();
    assert_eq!(listener.dispatched, 4);
    assert_eq!(listener.malformed, 1);
}

#[tokio::test]
async fn test_store_failure_does_not_halt_pipeline() {
    let queue = Arc::new(MemoryQueue::new());
    let ctx = Context::new(
        queue.clone(),
        Arc::new(FailingStore),
        QueueConfig {
            url: "memory://".to_string(),
            pop_timeout_secs: 1,
            ..Default::default()
        },
    );
    let ping = serde_json::json!({
        "Content": "bot: ping", "BotNick": "bot", "User": "bob",
        "Channel": "#c", "ChatBotId": "3", "Command": "PRIVMSG"
    });
    for _ in 0..2 {
        queue
            .push("q", Bytes::from(ping.to_string()))
            .await
            .unwrap();
    }

    let lifecycle = Lifecycle::new(ctx, builtins(), dispatch());
    let token = lifecycle.shutdown_token();
    let handle = tokio::spawn(lifecycle.run());

    eventually(|| {
        let queue = queue.clone();
        async move { queue.len("bot").await == 2 }
    })
    .await;
    token.cancel();
    let report = handle.await.unwrap();

    let executor = report.executor.unwrap();
    assert_eq!(executor.failed, 2);
    assert_eq!(executor.responded, 2);
}

#[tokio::test]
async fn test_shutdown_stops_popping_and_reaches_stopped() {
    let (ctx, queue, store) = memory_context();
    let lifecycle = Lifecycle::new(ctx, builtins(), dispatch());
    let token = lifecycle.shutdown_token();
    let state = lifecycle.subscribe();
    let handle = tokio::spawn(lifecycle.run());

    // Let the listener sit through at least one empty pop.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(*state.borrow(), LifecycleState::Running);

    token.cancel();
    let report = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("drain within grace period")
        .unwrap();
    assert!(report.clean);
    assert_eq!(*state.borrow(), LifecycleState::Stopped);

    queue
        .push("q", Bytes::from_static(br#"{"Content":"late","Command":"PRIVMSG"}"#))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(queue.len("q").await, 1);
    assert!(store.documents().await.is_empty());
}

#[tokio::test]
async fn test_lines_reach_elasticsearch() {
    let server = MockServer::start().await;
    let payload = r#"{"Content":"indexed","Command":"privmsg"}"#;
    Mock::given(method("POST"))
        .and(path("/botbot/line"))
        .and(body_string(payload))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"created":true}"#))
        .expect(1)
        .mount(&server)
        .await;

    let queue = Arc::new(MemoryQueue::new());
    let es = Elasticsearch::new(&ElasticsearchConfig {
        addr: server.uri(),
        ..Default::default()
    })
    .unwrap();
    let ctx = Context::new(
        queue.clone(),
        Arc::new(es),
        QueueConfig {
            url: "memory://".to_string(),
            pop_timeout_secs: 1,
            ..Default::default()
        },
    );
    queue
        .push("q", Bytes::from_static(payload.as_bytes()))
        .await
        .unwrap();

    let plugins = build_plugins(&["store".to_string()]).unwrap();
    let lifecycle = Lifecycle::new(ctx, plugins, dispatch());
    let token = lifecycle.shutdown_token();
    let handle = tokio::spawn(lifecycle.run());

    eventually(|| {
        let queue = queue.clone();
        async move { queue.is_empty("q").await }
    })
    .await;
    token.cancel();
    let report = handle.await.unwrap();

    assert_eq!(report.executor.unwrap().stored, 1);
    // The mock's `expect(1)` is verified when the server drops.
}

#[tokio::test]
async fn test_from_config_rejects_unknown_plugin() {
    let mut config = Config::default();
    config.queue.url = "memory://".to_string();
    config.dispatch.plugins = vec!["karma".to_string()];

    let err = Lifecycle::from_config(&config).await.err().unwrap();
    let err = err.downcast_ref::<BotbotError>().unwrap();
    assert!(matches!(err, BotbotError::Config(_)));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_from_config_rejects_unreachable_queue() {
    let mut config = Config::default();
    config.queue.url = "redis://127.0.0.1:1".to_string();

    let err = Lifecycle::from_config(&config).await.err().unwrap();
    let err = err.downcast_ref::<BotbotError>().unwrap();
    assert!(matches!(err, BotbotError::Startup(_)));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_lifecycle_from_yaml_config() {
    let (_dir, path) = common::temp_config_file(
        r#"
queue:
  url: "memory://"
  pop_timeout_secs: 1
elasticsearch:
  addr: "127.0.0.1:9200"
  id_policy: fixed
dispatch:
  plugins: [ping, store]
  grace_period_secs: 3
"#,
    );
    let config = Config::load(path.to_str().unwrap(), &Default::default()).unwrap();
    config.validate().unwrap();

    let lifecycle = Lifecycle::from_config(&config).await.unwrap();
    lifecycle.shutdown_token().cancel();
    let report = lifecycle.run().await;

    assert!(report.clean);
    assert_eq!(
        report.handled,
        vec![("ping".to_string(), 0), ("store".to_string(), 0)]
    );
}
