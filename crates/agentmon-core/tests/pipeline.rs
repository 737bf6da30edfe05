// End-to-end pipeline tests against a mock collector
//
// Covers the delivery properties the pipeline guarantees: ordering under
// concurrent hook threads, exactly-once delivery with a healthy backend,
// bounded retries, auth halting with bounded buffering, hook teardown,
// and deterministic framework selection.

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use agentmon_core::{
    AgentMonitor, FrameworkDescriptor, FrameworkId, HostCallback, HostRegistry, MonitorConfig,
    RawCallback, RetryPolicy, SessionStatus,
};

fn test_config(server: &MockServer) -> MonitorConfig {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    MonitorConfig::new(server.uri(), "am-test-key")
        .with_batch_size(4)
        .with_queue_cap(256)
        .with_flush_interval(Duration::from_millis(50))
        .with_heartbeat_interval(Duration::ZERO)
        .with_retry(
            RetryPolicy::exponential()
                .with_initial_interval(Duration::from_millis(20))
                .with_jitter(0.0),
        )
}

async fn mount_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/heartbeat"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

fn event_requests(requests: &[Request]) -> Vec<serde_json::Value> {
    requests
        .iter()
        .filter(|r| r.url.path() == "/events")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

fn delivered_sequences(batches: &[serde_json::Value]) -> Vec<u64> {
    batches
        .iter()
        .flat_map(|b| b["events"].as_array().unwrap().iter())
        .map(|e| e["sequence_number"].as_u64().unwrap())
        .collect()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

#[tokio::test]
async fn concurrent_hooks_deliver_in_sequence_order() {
    let server = MockServer::start().await;
    mount_ok(&server).await;

    let host = HostRegistry::new();
    let slot = host.announce(FrameworkDescriptor::new(FrameworkId::LangChain));

    let handle = AgentMonitor::start(test_config(&server), &host).unwrap();

    let mut threads = Vec::new();
    for _ in 0..4 {
        let slot = slot.clone();
        threads.push(std::thread::spawn(move || {
            for _ in 0..25 {
                slot.dispatch(&HostCallback::new("on_chain_start").with_name("step"));
            }
        }));
    }
    for thread in threads {
        thread.join().unwrap();
    }

    let session_id = handle.session_id().to_string();
    handle.stop().await;

    let requests = server.received_requests().await.unwrap();
    let batches = event_requests(&requests);
    let sequences = delivered_sequences(&batches);

    // All 100 events delivered exactly once, in non-decreasing order
    // across batches
    assert_eq!(sequences, (0..100).collect::<Vec<u64>>());
    for batch in &batches {
        assert!(batch["events"].as_array().unwrap().len() <= 4);
        assert_eq!(batch["session_id"].as_str().unwrap(), session_id);
    }
}

#[tokio::test]
async fn healthy_backend_delivers_every_event_once() {
    let server = MockServer::start().await;
    mount_ok(&server).await;

    let host = HostRegistry::new();
    let handle = AgentMonitor::start(test_config(&server), &host).unwrap();

    // No framework announced: manual fallback, caller-driven events
    for i in 0..10 {
        handle.emit(RawCallback::tool_call(format!("tool_{i}")));
    }

    handle.stop().await;

    let requests = server.received_requests().await.unwrap();
    let batches = event_requests(&requests);
    let sequences = delivered_sequences(&batches);

    assert_eq!(sequences, (0..10).collect::<Vec<u64>>());
    for batch in &batches {
        assert!(batch["events"].as_array().unwrap().len() <= 4);
    }
}

#[tokio::test]
async fn transient_failures_retry_then_deliver() {
    let server = MockServer::start().await;
    // First two attempts fail, then the backend recovers
    Mock::given(method("POST"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let host = HostRegistry::new();
    let handle = AgentMonitor::start(test_config(&server), &host).unwrap();
    handle.emit(RawCallback::step_start("plan"));

    let mut attempts = 0;
    for _ in 0..200 {
        attempts = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/events")
            .count();
        if attempts >= 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(attempts, 3);

    handle.stop().await;

    let requests = server.received_requests().await.unwrap();
    let batches = event_requests(&requests);
    // Same single-event batch on all three attempts, delivered on the third
    assert_eq!(batches.len(), 3);
    for batch in &batches {
        assert_eq!(delivered_sequences(std::slice::from_ref(batch)), vec![0]);
    }
}

#[tokio::test]
async fn auth_rejection_halts_and_buffers_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let host = HostRegistry::new();
    let config = test_config(&server).with_queue_cap(8);
    let handle = AgentMonitor::start(config, &host).unwrap();

    handle.emit(RawCallback::step_start("plan"));

    // One attempt, no retries, session errored
    wait_until(|| handle.status() == SessionStatus::Errored).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let attempts = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/events")
        .count();
    assert_eq!(attempts, 1);

    // Buffering continues up to the cap with an accurate eviction counter.
    // In the queue already: the requeued event plus the auth diagnostic.
    for _ in 0..20 {
        handle.emit(RawCallback::step_start("buffered"));
    }
    assert_eq!(handle.eviction_count(), 22 - 8);
    assert_eq!(handle.status(), SessionStatus::Errored);

    handle.stop().await;

    // Halted: the final flush made no further attempts
    let attempts_after = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/events")
        .count();
    assert_eq!(attempts_after, 1);
}

#[tokio::test]
async fn poison_batch_dropped_and_following_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(422))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let host = HostRegistry::new();
    let handle = AgentMonitor::start(test_config(&server), &host).unwrap();

    handle.emit(RawCallback::step_start("poison"));
    wait_until(|| handle.dropped_count() == 1).await;

    handle.emit(RawCallback::step_start("healthy"));
    handle.stop().await;

    let requests = server.received_requests().await.unwrap();
    let batches = event_requests(&requests);
    let all_events: Vec<&serde_json::Value> = batches
        .iter()
        .flat_map(|b| b["events"].as_array().unwrap().iter())
        .collect();

    // The batch_rejected diagnostic and the healthy event both arrive
    assert!(all_events
        .iter()
        .any(|e| e["payload"]["reason"] == serde_json::json!("batch_rejected")));
    assert!(all_events
        .iter()
        .any(|e| e["payload"]["name"] == serde_json::json!("healthy")));
}

#[tokio::test]
async fn stop_removes_hooks_and_ships_final_heartbeat() {
    let server = MockServer::start().await;
    mount_ok(&server).await;

    let host = HostRegistry::new();
    let slot = host.announce(FrameworkDescriptor::new(FrameworkId::LangChain));

    let config = test_config(&server).with_heartbeat_interval(Duration::from_millis(50));
    let handle = AgentMonitor::start(config, &host).unwrap();

    slot.dispatch(&HostCallback::new("on_chain_start").with_name("step"));
    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.stop().await;

    let requests = server.received_requests().await.unwrap();
    let before = requests.len();

    // Heartbeats ticked while running and a stopped heartbeat went last
    let heartbeats: Vec<serde_json::Value> = requests
        .iter()
        .filter(|r| r.url.path() == "/heartbeat")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();
    assert!(heartbeats.len() >= 2);
    assert_eq!(
        heartbeats.last().unwrap()["status"],
        serde_json::json!("stopped")
    );

    // The dispatch path is restored: host callbacks no longer reach us
    for _ in 0..5 {
        slot.dispatch(&HostCallback::new("on_chain_start").with_name("after_stop"));
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), before);
}

#[tokio::test]
async fn ambiguous_detection_is_deterministic_and_single_hooked() {
    let server = MockServer::start().await;
    mount_ok(&server).await;

    let host = HostRegistry::new();
    let langchain_slot = host.announce(
        FrameworkDescriptor::new(FrameworkId::LangChain).with_modules(["agents", "chains"]),
    );
    host.announce(FrameworkDescriptor::new(FrameworkId::LangGraph).with_modules(["graph"]));

    // LangGraph extends LangChain, so it wins on every run
    for _ in 0..3 {
        let handle = AgentMonitor::start(test_config(&server), &host).unwrap();
        assert_eq!(
            handle.session().metadata["framework"],
            serde_json::json!("langgraph")
        );
        handle.stop().await;
    }

    let handle = AgentMonitor::start(test_config(&server), &host).unwrap();

    // Only the langgraph adapter installed hooks: langchain dispatches
    // produce nothing
    for _ in 0..3 {
        langchain_slot.dispatch(&HostCallback::new("on_chain_start").with_name("ignored"));
    }
    handle.stop().await;

    let requests = server.received_requests().await.unwrap();
    let batches = event_requests(&requests);
    let all_events: Vec<&serde_json::Value> = batches
        .iter()
        .flat_map(|b| b["events"].as_array().unwrap().iter())
        .collect();

    // The ambiguity diagnostic shipped; the unhooked framework's events
    // did not
    assert!(all_events
        .iter()
        .any(|e| e["payload"]["reason"] == serde_json::json!("ambiguous_framework_detection")
            && e["payload"]["selected"] == serde_json::json!("langgraph")));
    assert!(!all_events
        .iter()
        .any(|e| e["payload"]["name"] == serde_json::json!("ignored")));
}
