//! Connection to the pointer actuator
//!
//! A single WebSocket carries JSON command records to the actuator process.
//! Delivery is at-most-once: while the socket is not open every send is
//! dropped on the floor, and nothing is retried or replayed. One connection
//! attempt is made per channel; reconnecting is up to the caller.

use crate::messages::{ConnectionState, OutboundCommand};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};

/// Hand-off slots to the socket writer: at most one tick's click plus its
/// movement. Anything beyond that is dropped, never queued.
const OUTBOUND_SLOTS: usize = 2;

/// Outbound boundary of the engine
pub trait CommandSink: Send + Sync {
    /// True only while commands can actually leave
    fn is_ready(&self) -> bool;

    /// Hand a command over; returns false when it was dropped
    fn send(&self, command: OutboundCommand) -> bool;
}

/// Persistent WebSocket link to the actuator
pub struct RemoteChannel {
    url: String,
    state_rx: watch::Receiver<ConnectionState>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    outbound_tx: mpsc::Sender<OutboundCommand>,
    close_tx: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RemoteChannel {
    /// Start connecting to `url` in the background
    ///
    /// Must be called inside a tokio runtime. A failed attempt leaves the
    /// channel disconnected; it is never fatal.
    pub fn connect(url: impl Into<String>) -> Self {
        let url = url.into();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let state_tx = Arc::new(state_tx);
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_SLOTS);
        let (close_tx, close_rx) = oneshot::channel();

        let task = tokio::spawn(run_connection(
            url.clone(),
            outbound_rx,
            close_rx,
            Arc::clone(&state_tx),
        ));

        Self {
            url,
            state_rx,
            state_tx,
            outbound_tx,
            close_tx: Mutex::new(Some(close_tx)),
            task: Mutex::new(Some(task)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch connectivity changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Wait until the connection reaches `target`; false if the channel is gone
    pub async fn wait_for(&self, target: ConnectionState) -> bool {
        let mut rx = self.state_rx.clone();
        let reached = rx.wait_for(|state| *state == target).await.is_ok();
        reached
    }

    /// Close the socket and stop the connection task
    pub async fn close(&self) {
        if let Some(close_tx) = self.close_tx.lock().take() {
            let _ = close_tx.send(());
        }

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Remote channel task ended abnormally: {}", e);
            }
        }

        self.state_tx.send_replace(ConnectionState::Disconnected);
    }
}

impl CommandSink for RemoteChannel {
    fn is_ready(&self) -> bool {
        self.state().is_connected()
    }

    fn send(&self, command: OutboundCommand) -> bool {
        if !self.is_ready() {
            trace!("Remote not ready; dropped {:?}", command);
            return false;
        }

        match self.outbound_tx.try_send(command) {
            Ok(()) => true,
            Err(e) => {
                debug!("Remote busy; dropped {:?}: {}", command, e);
                false
            }
        }
    }
}

async fn run_connection(
    url: String,
    mut outbound_rx: mpsc::Receiver<OutboundCommand>,
    mut close_rx: oneshot::Receiver<()>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
) {
    let connected = tokio::select! {
        result = tokio_tungstenite::connect_async(url.as_str()) => result,
        _ = &mut close_rx => {
            debug!("Remote channel closed before connecting");
            return;
        }
    };

    let ws = match connected {
        Ok((ws, _response)) => ws,
        Err(e) => {
            warn!("Could not reach pointer driver at {}: {}", url, e);
            return;
        }
    };

    info!("Connected to pointer driver at {}", url);
    state_tx.send_replace(ConnectionState::Connected);

    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            command = outbound_rx.recv() => {
                let Some(command) = command else {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                };

                let json = match command.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to encode {:?}: {}", command, e);
                        continue;
                    }
                };

                if let Err(e) = write.send(Message::Text(json)).await {
                    warn!("Send to pointer driver failed: {}", e);
                    break;
                }
            }
            incoming = read.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => {
                    info!("Pointer driver closed the connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Pointer driver connection failed: {}", e);
                    break;
                }
            },
            _ = &mut close_rx => {
                let _ = write.send(Message::Close(None)).await;
                break;
            }
        }
    }

    state_tx.send_replace(ConnectionState::Disconnected);
    info!("Disconnected from pointer driver");
}
