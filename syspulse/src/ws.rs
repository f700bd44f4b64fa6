//! WebSocket link to the backend's push stream.
//!
//! `run_link` owns the socket and a [`ConnectionManager`]; it reports every
//! state change and every parsed sample over an mpsc channel, in arrival
//! order. Frames are processed one at a time.

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::connection::{ConnectionManager, ConnectionState};
use crate::types::MetricSample;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub enum LinkEvent {
    State(ConnectionState),
    Sample(Box<MetricSample>),
}

// Connect to the backend and return the WS stream
pub async fn connect(url: &str) -> Result<WsStream, tokio_tungstenite::tungstenite::Error> {
    let (ws, _) = connect_async(url).await?;
    Ok(ws)
}

pub fn parse_frame(text: &str) -> Result<MetricSample, serde_json::Error> {
    serde_json::from_str::<MetricSample>(text)
}

enum Ended {
    Closed,
    Failed,
    Shutdown,
}

/// Drive the link until shutdown, until the event receiver goes away, or
/// until reconnect attempts are exhausted.
pub async fn run_link(
    url: String,
    mut mgr: ConnectionManager,
    events: mpsc::UnboundedSender<LinkEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> ConnectionManager {
    let emit = |ev: LinkEvent| events.send(ev).is_ok();

    loop {
        if *shutdown.borrow() || !emit(LinkEvent::State(mgr.state())) {
            mgr.shutdown();
            return mgr;
        }

        tracing::info!(%url, attempt = mgr.attempts(), "connecting");
        let attempt = tokio::select! {
            r = connect(&url) => r,
            _ = shutdown.changed() => {
                mgr.shutdown();
                return mgr;
            }
        };

        let ended = match attempt {
            Ok(mut ws) => {
                if !mgr.on_open() {
                    let _ = ws.close(None).await;
                    return mgr;
                }
                tracing::info!(%url, "connected");
                if !emit(LinkEvent::State(mgr.state())) {
                    let _ = ws.close(None).await;
                    mgr.shutdown();
                    return mgr;
                }
                let ended = read_frames(&mut ws, &events, &mut shutdown).await;
                if matches!(ended, Ended::Shutdown) {
                    let _ = ws.close(None).await;
                }
                ended
            }
            Err(e) => {
                tracing::warn!(%url, "connect failed: {e}");
                Ended::Failed
            }
        };

        match ended {
            Ended::Shutdown => {
                mgr.shutdown();
                let _ = emit(LinkEvent::State(mgr.state()));
                return mgr;
            }
            Ended::Failed => {
                mgr.on_error();
                let _ = emit(LinkEvent::State(mgr.state()));
            }
            Ended::Closed => {}
        }

        let Some(timer) = mgr.on_close() else {
            if mgr.is_terminal() {
                tracing::error!(
                    attempts = mgr.attempts(),
                    "reconnect attempts exhausted; giving up"
                );
            }
            let _ = emit(LinkEvent::State(mgr.state()));
            return mgr;
        };
        tracing::info!(
            attempt = timer.attempt,
            delay_ms = timer.delay.as_millis() as u64,
            "scheduling reconnect"
        );
        if !emit(LinkEvent::State(mgr.state())) {
            mgr.shutdown();
            return mgr;
        }

        tokio::select! {
            _ = tokio::time::sleep(timer.delay) => {}
            _ = shutdown.changed() => {
                mgr.shutdown();
                return mgr;
            }
        }
        if !mgr.on_timer(&timer) {
            return mgr;
        }
    }
}

async fn read_frames(
    ws: &mut WsStream,
    events: &mpsc::UnboundedSender<LinkEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> Ended {
    loop {
        let next = tokio::select! {
            m = ws.next() => m,
            _ = shutdown.changed() => return Ended::Shutdown,
        };
        match next {
            Some(Ok(Message::Text(text))) => match parse_frame(&text) {
                Ok(sample) => {
                    if events.send(LinkEvent::Sample(Box::new(sample))).is_err() {
                        return Ended::Shutdown;
                    }
                }
                Err(e) => {
                    tracing::warn!(len = text.len(), "dropping malformed frame: {e}");
                }
            },
            Some(Ok(Message::Binary(bytes))) => match serde_json::from_slice::<MetricSample>(&bytes) {
                Ok(sample) => {
                    if events.send(LinkEvent::Sample(Box::new(sample))).is_err() {
                        return Ended::Shutdown;
                    }
                }
                Err(e) => tracing::warn!(len = bytes.len(), "dropping malformed frame: {e}"),
            },
            Some(Ok(Message::Close(frame))) => {
                tracing::info!(?frame, "server closed the channel");
                return Ended::Closed;
            }
            // tungstenite answers pings on the next read/write
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                tracing::warn!("channel error: {e}");
                return Ended::Failed;
            }
            None => return Ended::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_frame_accepts_push_envelope() {
        let js = r#"{
            "timestamp": "2024-01-01T10:00:00Z",
            "cpu": {"usage": 42.0, "cores": 4, "load1": 0.5},
            "memory": {"usage": 50.0, "used": 1024, "total": 2048},
            "disk": {"usage": 70.0, "used": 7, "total": 10},
            "processes": [{"pid": 1, "process": "init", "cpu_percent": 0.1}],
            "alerts": []
        }"#;
        let s = parse_frame(js).unwrap();
        assert_eq!(s.cpu.unwrap().cores, 4);
        assert_eq!(s.processes.unwrap().len(), 1);
        assert_eq!(s.alerts, Some(vec![]));
    }

    #[test]
    fn parse_frame_rejects_garbage() {
        assert!(parse_frame("not json").is_err());
        assert!(parse_frame(r#"{"cpu": "hot"}"#).is_err());
    }
}
