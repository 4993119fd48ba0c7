//! End-to-end behaviour of the connection manager against a live endpoint.

#![allow(clippy::panic)]

mod common;

use std::time::Duration;

use emu_monitor::config::MonitorConfig;
use emu_monitor::domain::{MonitorEvent, Phase};
use emu_monitor::error::MonitorError;
use emu_monitor::monitor::Monitor;
use emu_monitor::monitor::reconnect::{BackoffConfig, ReconnectPolicy};
use serde_json::json;
use tokio::time::Instant;
use tokio_test::assert_ok;

use common::{ScriptedServer, manual_config, start_stub, unused_addr, wait_for, wait_for_stats};

/// Long enough that no heartbeat fires during a test.
const QUIET: Duration = Duration::from_secs(60);

fn start(config: MonitorConfig) -> Monitor {
    let Ok(monitor) = Monitor::start(config) else {
        panic!("monitor failed to start");
    };
    monitor
}

#[tokio::test]
async fn open_sets_connected_and_clears_error() {
    let stub = start_stub().await;
    let monitor = start(manual_config(stub.endpoint(), QUIET));
    let mut events = monitor.subscribe_events();

    assert_eq!(monitor.state().phase(), Phase::Disconnected);
    assert_ok!(monitor.connect());
    wait_for(&mut events, "connected").await;

    let state = monitor.state();
    assert!(state.connected);
    assert!(!state.error);
    assert!(!state.connecting);

    monitor.shutdown().await;
}

#[tokio::test]
async fn close_with_auto_reconnect_opens_again() {
    let stub = start_stub().await;
    let monitor = start(manual_config(stub.endpoint(), QUIET));
    let mut events = monitor.subscribe_events();

    assert_ok!(monitor.connect());
    let first = wait_for(&mut events, "connected").await;

    wait_for_stats(&stub, |s| s.open == 1).await;
    assert_eq!(stub.kick_all(), 1);
    let MonitorEvent::Closed { will_reconnect, .. } = wait_for(&mut events, "closed").await else {
        panic!("expected closed event");
    };
    assert!(will_reconnect);

    let second = wait_for(&mut events, "connected").await;
    assert_ne!(first.session_id(), second.session_id());
    assert!(monitor.state().connected);
    assert_eq!(stub.stats().connections, 2);

    monitor.shutdown().await;
}

#[tokio::test]
async fn disconnect_stops_further_attempts() {
    let stub = start_stub().await;
    let monitor = start(manual_config(stub.endpoint(), QUIET));
    let mut events = monitor.subscribe_events();

    assert_ok!(monitor.connect());
    wait_for(&mut events, "connected").await;

    assert_ok!(monitor.disconnect());
    let MonitorEvent::Closed { will_reconnect, .. } = wait_for(&mut events, "closed").await else {
        panic!("expected closed event");
    };
    assert!(!will_reconnect);

    let _ = stub.kick_all();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(stub.stats().connections, 1);
    assert_eq!(monitor.state().phase(), Phase::Disconnected);
    assert!(events.try_recv().is_err());

    monitor.shutdown().await;
}

#[tokio::test]
async fn manual_connect_after_disconnect_reenables_reconnect() {
    let stub = start_stub().await;
    let monitor = start(manual_config(stub.endpoint(), QUIET));
    let mut events = monitor.subscribe_events();

    assert_ok!(monitor.connect());
    wait_for(&mut events, "connected").await;
    assert_ok!(monitor.disconnect());
    wait_for(&mut events, "closed").await;

    assert_ok!(monitor.connect());
    wait_for(&mut events, "connected").await;
    wait_for_stats(&stub, |s| s.connections == 2 && s.open == 1).await;
    assert_eq!(stub.kick_all(), 1);
    wait_for(&mut events, "closed").await;
    wait_for(&mut events, "connected").await;

    wait_for_stats(&stub, |s| s.connections == 3 && s.open == 1).await;
    monitor.shutdown().await;
}

#[tokio::test]
async fn connect_while_connected_replaces_the_socket() {
    let stub = start_stub().await;
    let monitor = start(manual_config(stub.endpoint(), QUIET));
    let mut events = monitor.subscribe_events();

    assert_ok!(monitor.connect());
    wait_for(&mut events, "connected").await;
    assert_ok!(monitor.connect());
    wait_for(&mut events, "closed").await;
    wait_for(&mut events, "connected").await;

    wait_for_stats(&stub, |s| s.connections == 2 && s.open == 1).await;
    assert!(monitor.state().connected);

    monitor.shutdown().await;
}

#[tokio::test]
async fn inbound_frame_replaces_snapshot_wholesale() {
    let server = ScriptedServer::start(vec![
        r#"{"pc": 1, "old": true}"#,
        r#"{"pc": 4096, "regs": {"a": 1}}"#,
    ])
    .await;
    let monitor = start(manual_config(server.endpoint(), QUIET));
    let mut events = monitor.subscribe_events();

    assert_ok!(monitor.connect());
    wait_for(&mut events, "snapshot").await;
    wait_for(&mut events, "snapshot").await;

    let view = monitor.view();
    assert_eq!(
        view.snapshot.as_value(),
        &json!({"pc": 4096, "regs": {"a": 1}})
    );
    assert!(view.updated_at.is_some());

    monitor.shutdown().await;
}

#[tokio::test]
async fn malformed_frame_keeps_snapshot_and_session() {
    let server = ScriptedServer::start(vec![r#"{"pc": 8}"#, "not json"]).await;
    let monitor = start(manual_config(server.endpoint(), QUIET));
    let mut events = monitor.subscribe_events();

    assert_ok!(monitor.connect());
    wait_for(&mut events, "snapshot").await;
    wait_for(&mut events, "malformed_frame").await;

    let view = monitor.view();
    assert!(view.state.connected);
    assert_eq!(view.snapshot.as_value(), &json!({"pc": 8}));

    monitor.shutdown().await;
}

#[tokio::test]
async fn pause_and_step_send_exactly_one_frame_each() {
    let server = ScriptedServer::start(vec![]).await;
    let monitor = start(manual_config(server.endpoint(), QUIET));
    let mut events = monitor.subscribe_events();

    assert_ok!(monitor.connect());
    wait_for(&mut events, "connected").await;

    assert_ok!(monitor.pause());
    assert_ok!(monitor.step());
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(*server.received.lock().await, vec!["P", "S"]);
    monitor.shutdown().await;
}

#[tokio::test]
async fn stub_applies_pause_and_step() {
    let stub = start_stub().await;
    let monitor = start(manual_config(stub.endpoint(), QUIET));
    let mut events = monitor.subscribe_events();

    assert_ok!(monitor.connect());
    wait_for(&mut events, "connected").await;

    assert_ok!(monitor.pause());
    wait_for(&mut events, "snapshot").await;
    assert_ok!(monitor.step());
    wait_for(&mut events, "snapshot").await;

    let Some(regs) = monitor.view().snapshot.cpu_registers() else {
        panic!("stub reply lacks cpu object");
    };
    assert_eq!(regs.pc, 0xbfc0_0004);

    let stats = stub.stats();
    assert_eq!((stats.pauses, stats.steps, stats.heartbeats), (1, 1, 0));
    monitor.shutdown().await;
}

#[tokio::test]
async fn heartbeat_runs_only_while_connected() {
    let stub = start_stub().await;
    let monitor = start(manual_config(stub.endpoint(), Duration::from_millis(100)));
    let mut events = monitor.subscribe_events();

    assert_ok!(monitor.connect());
    wait_for(&mut events, "connected").await;
    tokio::time::sleep(Duration::from_millis(1_000)).await;

    assert_ok!(monitor.disconnect());
    wait_for(&mut events, "closed").await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let beats = stub.stats().heartbeats;
    assert!((8..=11).contains(&beats), "{beats} heartbeats in ~1s");

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(stub.stats().heartbeats, beats);

    monitor.shutdown().await;
}

#[tokio::test]
async fn snapshot_is_cleared_on_close() {
    let stub = start_stub().await;
    let monitor = start(manual_config(stub.endpoint(), Duration::from_millis(50)));
    let mut events = monitor.subscribe_events();

    assert_ok!(monitor.connect());
    wait_for(&mut events, "snapshot").await;
    assert!(!monitor.view().snapshot.is_empty());

    assert_ok!(monitor.disconnect());
    wait_for(&mut events, "closed").await;

    let view = monitor.view();
    assert!(view.snapshot.is_empty());
    assert!(view.updated_at.is_none());
    assert!(!view.state.connected);

    monitor.shutdown().await;
}

#[tokio::test]
async fn failed_handshake_sets_error_and_retries() {
    let addr = unused_addr().await;
    let mut config = manual_config(format!("ws://{addr}"), QUIET);
    config.reconnect = ReconnectPolicy::Backoff(BackoffConfig {
        initial_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(50),
        multiplier: 2.0,
    });
    let monitor = start(config);
    let mut events = monitor.subscribe_events();

    assert_ok!(monitor.connect());
    let MonitorEvent::TransportError { will_reconnect, .. } =
        wait_for(&mut events, "transport_error").await
    else {
        panic!("expected transport error");
    };
    assert!(will_reconnect);
    let state = monitor.state();
    assert!(state.error);
    assert!(!state.connected);

    wait_for(&mut events, "connecting").await;
    wait_for(&mut events, "transport_error").await;

    assert_ok!(monitor.disconnect());
    monitor.shutdown().await;
}

#[tokio::test]
async fn immediate_policy_retries_refused_endpoint_without_delay() {
    let addr = unused_addr().await;
    let mut config = manual_config(format!("ws://{addr}"), QUIET);
    config.reconnect = ReconnectPolicy::Immediate;
    let monitor = start(config);
    let mut events = monitor.subscribe_events();

    assert_ok!(monitor.connect());
    let MonitorEvent::TransportError { will_reconnect, .. } =
        wait_for(&mut events, "transport_error").await
    else {
        panic!("expected transport error");
    };
    assert!(will_reconnect);

    let first = Instant::now();
    wait_for(&mut events, "transport_error").await;
    let gap = first.elapsed();

    // Well under the default backoff's first delay.
    assert!(gap < Duration::from_millis(200), "retry took {gap:?}");

    assert_ok!(monitor.disconnect());
    monitor.shutdown().await;
}

#[tokio::test]
async fn commands_while_disconnected_are_dropped_silently() {
    let server = ScriptedServer::start(vec![]).await;
    let monitor = start(manual_config(server.endpoint(), QUIET));

    assert_ok!(monitor.pause());
    assert_ok!(monitor.step());
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(server.accepted.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(monitor.state().phase(), Phase::Disconnected);
    monitor.shutdown().await;
}

#[tokio::test]
async fn auto_connect_dials_on_start() {
    let stub = start_stub().await;
    let mut config = MonitorConfig::new(stub.endpoint());
    config.heartbeat_interval = QUIET;
    let monitor = start(config);
    let mut view_rx = monitor.subscribe_view();

    let connected = tokio::time::timeout(common::WAIT, view_rx.wait_for(|v| v.state.connected))
        .await
        .is_ok_and(|r| r.is_ok());
    assert!(connected);

    monitor.shutdown().await;
}

#[tokio::test]
async fn invalid_endpoint_is_rejected_at_start() {
    let result = Monitor::start(MonitorConfig::new("http://127.0.0.1:3000"));
    assert!(matches!(result, Err(MonitorError::InvalidEndpoint(_))));
}

#[tokio::test]
async fn zero_heartbeat_is_rejected_at_start() {
    let stub = start_stub().await;
    let result = Monitor::start(manual_config(stub.endpoint(), Duration::ZERO));
    assert!(matches!(result, Err(MonitorError::Config(_))));
    assert_eq!(stub.stats().connections, 0);
}

#[tokio::test]
async fn malformed_endpoint_is_rejected_at_start() {
    for endpoint in ["ws://exa mple:3000", "ws://host:notaport", "ws://[::1"] {
        let result = Monitor::start(MonitorConfig::new(endpoint));
        assert!(
            matches!(result, Err(MonitorError::InvalidEndpoint(_))),
            "{endpoint} accepted"
        );
    }
}

#[tokio::test]
async fn shutdown_closes_the_socket() {
    let stub = start_stub().await;
    let monitor = start(manual_config(stub.endpoint(), QUIET));
    let mut events = monitor.subscribe_events();

    assert_ok!(monitor.connect());
    wait_for(&mut events, "connected").await;
    wait_for_stats(&stub, |s| s.open == 1).await;
    monitor.shutdown().await;

    wait_for_stats(&stub, |s| s.open == 0).await;
    stub.shutdown().await;
}
