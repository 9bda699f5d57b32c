// WebSocket connection manager - owns the push channel from the splitflap server
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::domain::display_state::DisplayState;
use crate::infrastructure::wire::{parse_display_message, StateRequest};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

// How a connected socket ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketEnd {
    ClosedLocally,
    /// Clean close handshake started by the server
    ClosedByServer,
    Dropped,
}

/// Starts and owns the reconnecting connection task
pub struct ConnectionManager {
    url: String,
    reconnect_delay: Duration,
    state_tx: watch::Sender<ConnectionState>,
    pushes: broadcast::Sender<DisplayState>,
    outbound: mpsc::Receiver<Message>,
    shutdown: watch::Receiver<bool>,
}

/// Cheap to clone; every clone talks to the same connection
#[derive(Clone)]
pub struct ConnectionHandle {
    state: watch::Receiver<ConnectionState>,
    pushes: broadcast::Sender<DisplayState>,
    outbound: mpsc::Sender<Message>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl ConnectionManager {
    pub fn start(url: impl Into<String>, reconnect_delay: Duration) -> ConnectionHandle {
        let (state_tx, state) = watch::channel(ConnectionState::Connecting);
        let (pushes, _) = broadcast::channel(32);
        let (outbound_tx, outbound) = mpsc::channel(8);
        let (shutdown_tx, shutdown) = watch::channel(false);

        let manager = Self {
            url: url.into(),
            reconnect_delay,
            state_tx,
            pushes: pushes.clone(),
            outbound,
            shutdown,
        };
        tokio::spawn(manager.run());

        ConnectionHandle {
            state,
            pushes,
            outbound: outbound_tx,
            shutdown: Arc::new(shutdown_tx),
        }
    }

    fn closed_locally(&self) -> bool {
        *self.shutdown.borrow()
    }

    async fn run(mut self) {
        tracing::info!("Connection manager started for {}", self.url);
        while !self.closed_locally() {
            self.state_tx.send_replace(ConnectionState::Connecting);

            let connected = tokio::select! {
                result = connect_async(self.url.as_str()) => Some(result),
                _ = self.shutdown.changed() => None,
            };
            match connected {
                None => break,
                Some(Ok((socket, _response))) => {
                    tracing::info!("WebSocket connected to {}", self.url);
                    // requests queued while disconnected are stale; the server sends state on connect
                    while self.outbound.try_recv().is_ok() {}
                    self.state_tx.send_replace(ConnectionState::Open);
                    match self.pump(socket).await {
                        SocketEnd::ClosedLocally => break,
                        SocketEnd::ClosedByServer => {
                            tracing::info!("Server closed the connection cleanly; not reconnecting");
                            break;
                        }
                        SocketEnd::Dropped => {}
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!("WebSocket connection to {} failed: {}", self.url, e);
                }
            }

            self.state_tx.send_replace(ConnectionState::Closed);
            tracing::debug!("Reconnecting in {:?}", self.reconnect_delay);
            tokio::select! {
                _ = sleep(self.reconnect_delay) => {}
                _ = self.shutdown.changed() => {}
            }
        }
        self.state_tx.send_replace(ConnectionState::Closed);
        tracing::info!("Connection manager stopped");
    }

    /// Move frames until the socket ends. Only a dropped socket is retried.
    async fn pump(&mut self, socket: Socket) -> SocketEnd {
        let (mut write, mut read) = socket.split();
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    let _ = write.send(Message::Close(None)).await;
                    return SocketEnd::ClosedLocally;
                }
                Some(message) = self.outbound.recv() => {
                    if let Err(e) = write.send(message).await {
                        tracing::warn!("WebSocket send failed: {}", e);
                        return SocketEnd::Dropped;
                    }
                }
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => match parse_display_message(&text) {
                        Ok(state) => {
                            tracing::debug!("Display push for dashboard {:?}", state.active_dashboard);
                            // no subscribers is fine
                            let _ = self.pushes.send(state);
                        }
                        Err(e) => tracing::warn!("Skipping unreadable display message: {}", e),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!("WebSocket closed by server: {:?}", frame);
                        return SocketEnd::ClosedByServer;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket read failed: {}", e);
                        return SocketEnd::Dropped;
                    }
                    None => return SocketEnd::Dropped,
                },
            }
        }
    }
}

impl ConnectionHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<DisplayState> {
        self.pushes.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Ask the server for a fresh push. Only sent while the socket is open;
    /// returns whether the request was queued.
    pub fn request_state(&self) -> bool {
        if self.state() != ConnectionState::Open {
            return false;
        }
        let Ok(body) = serde_json::to_string(&StateRequest::get_state()) else {
            return false;
        };
        self.outbound.try_send(Message::Text(body)).is_ok()
    }

    /// Close for good; no reconnect follows
    pub fn close(&self) {
        self.shutdown.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_async;

    const PUSH: &str = r#"{"activeDashboard":"home","state":"HELLO","currentTime":"2024-05-01T10:00:00Z"}"#;

    async fn listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws", listener.local_addr().unwrap());
        (listener, url)
    }

    async fn wait_for(handle: &ConnectionHandle, wanted: ConnectionState) {
        let mut state = handle.watch_state();
        timeout(Duration::from_secs(5), state.wait_for(|s| *s == wanted))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_pushes_reach_subscribers_and_bad_frames_are_skipped() {
        let (listener, url) = listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.send(Message::Text(PUSH.to_string())).await.unwrap();
            ws.send(Message::Text("garbage".to_string())).await.unwrap();
            ws.send(Message::Text(PUSH.replace("HELLO", "WORLD"))).await.unwrap();

            // next text frame from the client is the state request
            loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => return text,
                    Some(Ok(_)) => continue,
                    other => panic!("unexpected frame {:?}", other),
                }
            }
        });

        let handle = ConnectionManager::start(url, Duration::from_millis(20));
        let mut pushes = handle.subscribe();

        let first = timeout(Duration::from_secs(5), pushes.recv()).await.unwrap().unwrap();
        assert_eq!(first.text, "HELLO");
        assert_eq!(first.active_dashboard, "home");
        let second = timeout(Duration::from_secs(5), pushes.recv()).await.unwrap().unwrap();
        assert_eq!(second.text, "WORLD");

        wait_for(&handle, ConnectionState::Open).await;
        assert!(handle.request_state());
        let request = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
        assert_eq!(request, r#"{"type":"getState"}"#);

        handle.close();
        wait_for(&handle, ConnectionState::Closed).await;
    }

    #[tokio::test]
    async fn test_reconnects_after_server_drop() {
        let (listener, url) = listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = accept_async(stream).await.unwrap();
            drop(ws);

            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            ws.send(Message::Text(PUSH.to_string())).await.unwrap();
            // hold the socket until the client goes away
            while let Some(Ok(_)) = ws.next().await {}
        });

        let handle = ConnectionManager::start(url, Duration::from_millis(20));
        let mut pushes = handle.subscribe();
        let state = timeout(Duration::from_secs(5), pushes.recv()).await.unwrap().unwrap();
        assert_eq!(state.text, "HELLO");

        handle.close();
        wait_for(&handle, ConnectionState::Closed).await;
        timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_clean_server_close_is_not_retried() {
        let (listener, url) = listener().await;
        let handle = ConnectionManager::start(url, Duration::from_millis(10));

        let (stream, _) = timeout(Duration::from_secs(5), listener.accept()).await.unwrap().unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.close(None).await.unwrap();

        wait_for(&handle, ConnectionState::Closed).await;
        // several reconnect delays pass without a second attempt
        assert!(timeout(Duration::from_millis(200), listener.accept()).await.is_err());
        assert_eq!(handle.state(), ConnectionState::Closed);
        assert!(!handle.request_state());
    }

    #[tokio::test]
    async fn test_request_state_needs_open_socket() {
        // nothing listens on port 9 locally; the manager keeps retrying
        let handle = ConnectionManager::start("ws://127.0.0.1:9/ws", Duration::from_millis(10));
        assert!(!handle.request_state());
        handle.close();
        wait_for(&handle, ConnectionState::Closed).await;
        assert!(!handle.request_state());
    }
}
