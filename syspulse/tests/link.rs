//! Link tests against an in-process WebSocket server.
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use syspulse::connection::{Backoff, ConnectionManager, ConnectionState};
use syspulse::ws::{run_link, LinkEvent};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::{accept_async, tungstenite::Message};

const SAMPLE: &str = r#"{"cpu":{"usage":12.5,"cores":2,"load1":0.1},"memory":{"usage":40.0,"used":1,"total":2}}"#;

fn fast_backoff(max_attempts: u32) -> Backoff {
    Backoff {
        step: Duration::from_millis(10),
        cap: Duration::from_millis(40),
        max_attempts,
    }
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<LinkEvent>) -> LinkEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event within timeout")
        .expect("link still running")
}

/// Collect state events until the first sample arrives.
async fn states_until_sample(
    rx: &mut mpsc::UnboundedReceiver<LinkEvent>,
) -> (Vec<ConnectionState>, syspulse::types::MetricSample) {
    let mut states = Vec::new();
    loop {
        match next_event(rx).await {
            LinkEvent::State(s) => states.push(s),
            LinkEvent::Sample(m) => return (states, *m),
        }
    }
}

fn refused_url() -> String {
    let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = l.local_addr().unwrap().port();
    drop(l);
    format!("ws://127.0.0.1:{port}/ws")
}

#[tokio::test]
async fn malformed_frame_is_skipped_and_link_stays_up() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text("not json".into())).await.unwrap();
        ws.send(Message::Text(r#"{"cpu": "hot"}"#.into())).await.unwrap();
        ws.send(Message::Text(SAMPLE.into())).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);
    let link = tokio::spawn(run_link(
        format!("ws://{addr}/ws"),
        ConnectionManager::default(),
        tx,
        stop_rx,
    ));

    let (states, sample) = states_until_sample(&mut rx).await;
    assert_eq!(states, vec![ConnectionState::Connecting, ConnectionState::Connected]);
    assert_eq!(sample.cpu.map(|c| c.usage), Some(12.5));
    assert_eq!(sample.memory.map(|m| m.usage), Some(40.0));

    stop_tx.send(true).unwrap();
    let mgr = timeout(Duration::from_secs(2), link).await.unwrap().unwrap();
    assert!(!mgr.is_alive());
    assert!(!mgr.is_terminal());
    assert_eq!(mgr.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn reconnects_after_server_close_and_resets_attempts() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.close(None).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}

        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(SAMPLE.into())).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);
    let link = tokio::spawn(run_link(
        format!("ws://{addr}/ws"),
        ConnectionManager::new(fast_backoff(5)),
        tx,
        stop_rx,
    ));

    let (states, _sample) = states_until_sample(&mut rx).await;
    assert_eq!(
        states,
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Reconnecting,
            ConnectionState::Connecting,
            ConnectionState::Connected,
        ]
    );

    stop_tx.send(true).unwrap();
    let mgr = timeout(Duration::from_secs(2), link).await.unwrap().unwrap();
    assert_eq!(mgr.attempts(), 0);
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (_stop_tx, stop_rx) = watch::channel(false);
    let mgr = timeout(
        Duration::from_secs(10),
        run_link(refused_url(), ConnectionManager::new(fast_backoff(3)), tx, stop_rx),
    )
    .await
    .expect("link gives up on its own");

    assert!(mgr.is_terminal());
    assert_eq!(mgr.state(), ConnectionState::Error);

    let mut states = Vec::new();
    while let Ok(LinkEvent::State(s)) = rx.try_recv() {
        states.push(s);
    }
    let count = |want: ConnectionState| states.iter().filter(|s| **s == want).count();
    // initial attempt + 3 retries, no fourth retry
    assert_eq!(count(ConnectionState::Connecting), 4, "{states:?}");
    assert_eq!(count(ConnectionState::Reconnecting), 3, "{states:?}");
    assert_eq!(states.last(), Some(&ConnectionState::Error));
    assert!(!states.contains(&ConnectionState::Connected));
}

#[tokio::test]
async fn shutdown_cancels_pending_reconnect() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (stop_tx, stop_rx) = watch::channel(false);
    let slow = Backoff {
        step: Duration::from_secs(30),
        cap: Duration::from_secs(60),
        max_attempts: 5,
    };
    let link = tokio::spawn(run_link(refused_url(), ConnectionManager::new(slow), tx, stop_rx));

    loop {
        if let LinkEvent::State(ConnectionState::Reconnecting) = next_event(&mut rx).await {
            break;
        }
    }
    stop_tx.send(true).unwrap();
    let mgr = timeout(Duration::from_secs(2), link)
        .await
        .expect("link stops without waiting out the delay")
        .unwrap();
    assert!(!mgr.is_alive());
    assert_eq!(mgr.attempts(), 1);
    assert!(!mgr.is_terminal());
}
