//! Remote channel tests against a local WebSocket driver

use futures::StreamExt;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use vocal_joystick::messages::{ConnectionState, OutboundCommand};
use vocal_joystick::remote::{CommandSink, RemoteChannel};

/// Accept one client, forward every decoded command, hang up on request
async fn spawn_driver() -> (
    String,
    mpsc::UnboundedReceiver<OutboundCommand>,
    oneshot::Sender<()>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (hangup_tx, mut hangup_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        loop {
            tokio::select! {
                msg = ws.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        let cmd: OutboundCommand = serde_json::from_str(&text).unwrap();
                        let _ = cmd_tx.send(cmd);
                    }
                    Some(Ok(_)) => {}
                    _ => break,
                },
                _ = &mut hangup_rx => {
                    let _ = ws.close(None).await;
                    break;
                }
            }
        }
    });

    (format!("ws://{}/ws", addr), cmd_rx, hangup_tx)
}

async fn within<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

#[tokio::test]
async fn test_commands_reach_driver() {
    let (url, mut received, _hangup) = spawn_driver().await;
    let remote = RemoteChannel::connect(url);

    assert!(within(remote.wait_for(ConnectionState::Connected)).await);
    assert!(remote.is_ready());

    assert!(remote.send(OutboundCommand::movement(0, -25)));
    assert!(remote.send(OutboundCommand::click()));

    assert_eq!(
        within(received.recv()).await,
        Some(OutboundCommand::movement(0, -25))
    );
    assert_eq!(within(received.recv()).await, Some(OutboundCommand::click()));

    remote.close().await;
    assert_eq!(remote.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_driver_hangup_flips_state() {
    let (url, _received, hangup) = spawn_driver().await;
    let remote = RemoteChannel::connect(url);
    assert!(within(remote.wait_for(ConnectionState::Connected)).await);

    let mut state = remote.subscribe();
    hangup.send(()).unwrap();
    within(state.wait_for(|s| *s == ConnectionState::Disconnected))
        .await
        .unwrap();

    assert!(!remote.is_ready());
    assert!(!remote.send(OutboundCommand::click()));
}

#[tokio::test]
async fn test_no_driver_means_no_sends() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let remote = RemoteChannel::connect(format!("ws://{}/ws", addr));
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(remote.state(), ConnectionState::Disconnected);
    assert!(!remote.send(OutboundCommand::movement(25, 0)));
    remote.close().await;
}
