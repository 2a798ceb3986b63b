//! End-to-end tests: `Client` over the WebSocket adapter against an
//! in-test zone server.

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use zonelink::prelude::*;
use zonelink_protocol::{ClientRequest, ServerReply};

type ServerWs = WebSocketStream<TcpStream>;

// =========================================================================
// Mock zone server
// =========================================================================

async fn spawn_server<F, Fut>(script: F) -> u16
where
    F: FnOnce(ServerWs) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let port = listener.local_addr().expect("should have addr").port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("should accept");
        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .expect("websocket upgrade");
        script(ws).await;
    });

    port
}

async fn recv_request(ws: &mut ServerWs) -> Option<ClientRequest> {
    while let Some(Ok(msg)) = ws.next().await {
        if msg.is_binary() || msg.is_text() {
            return Some(serde_json::from_slice(&msg.into_data()).expect("valid request"));
        }
        if msg.is_close() {
            return None;
        }
    }
    None
}

async fn reply(ws: &mut ServerWs, reply: ServerReply) {
    let bytes = serde_json::to_vec(&reply).expect("encodable");
    ws.send(Message::Binary(bytes.into()))
        .await
        .expect("server send");
}

/// Answers the handshake, crypto bootstrap and login requests.
/// `password` decides whether the login is accepted.
async fn zone_server(mut ws: ServerWs, password: &'static str) -> ServerWs {
    while let Some(request) = recv_request(&mut ws).await {
        match request {
            ClientRequest::Handshake { api_version, .. } => {
                reply(&mut ws, ServerReply::HandshakeAck { api_version }).await;
            }
            ClientRequest::InitCrypto => {
                reply(
                    &mut ws,
                    ServerReply::CryptoInit {
                        success: true,
                        error_message: None,
                    },
                )
                .await;
            }
            ClientRequest::Login(login) => {
                if login.password == password {
                    reply(
                        &mut ws,
                        ServerReply::LoginOk {
                            user_name: login.user_name,
                            zone: login.zone,
                        },
                    )
                    .await;
                } else {
                    reply(
                        &mut ws,
                        ServerReply::LoginError {
                            error_message: Some("bad credential".into()),
                        },
                    )
                    .await;
                }
                break;
            }
        }
    }
    ws
}

async fn drain(ws: &mut ServerWs) {
    while let Some(Ok(msg)) = ws.next().await {
        if msg.is_close() {
            break;
        }
    }
}

fn config(port: u16, password: &str) -> SessionConfig {
    SessionConfig::builder("alice")
        .zone("TestZone")
        .http_port(port)
        .password(password)
        .build()
        .expect("valid config")
}

async fn bounded<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_connect_login_and_logout() {
    let port = spawn_server(|ws| async move {
        let mut ws = zone_server(ws, "secret").await;
        drain(&mut ws).await;
    })
    .await;

    let mut client = Client::new();
    bounded(client.connect(config(port, "secret"), WebSocketAdapter::new()))
        .await
        .expect("login should succeed");
    assert_eq!(client.state(), ConnectionState::Authenticated);

    bounded(client.logout()).await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(
        client.events(),
        &[
            LifecycleEvent::Connected(TransportKind::WebSocket),
            LifecycleEvent::LoginSucceeded
        ]
    );
}

#[tokio::test]
async fn test_bad_password_reports_login_failure() {
    let port = spawn_server(|ws| async move {
        let mut ws = zone_server(ws, "secret").await;
        drain(&mut ws).await;
    })
    .await;

    let mut client = Client::new();
    let err = bounded(client.connect(config(port, "wrong"), WebSocketAdapter::new()))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Login failed due to the following error:\nbad credential"
    );
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_server_kick_ends_session_with_reason() {
    let port = spawn_server(|ws| async move {
        let mut ws = zone_server(ws, "").await;
        reply(
            &mut ws,
            ServerReply::Disconnect {
                reason: DisconnectReason::Kicked,
            },
        )
        .await;
        let _ = ws.close(None).await;
    })
    .await;

    let mut client = Client::new();
    bounded(client.connect(config(port, ""), WebSocketAdapter::new()))
        .await
        .expect("login should succeed");

    assert_eq!(
        bounded(client.run_until_disconnected()).await,
        Some(DisconnectReason::Kicked)
    );
    assert_eq!(
        client.events().last(),
        Some(&LifecycleEvent::Failed(
            SessionFailure::UnexpectedDisconnection(DisconnectReason::Kicked)
        ))
    );
}

#[tokio::test]
async fn test_no_server_reports_connection_failure() {
    // Bind then drop to get a port nobody listens on.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
        listener.local_addr().expect("should have addr").port()
    };

    let mut client = Client::new();
    let err = bounded(client.connect(config(port, ""), WebSocketAdapter::new()))
        .await
        .unwrap_err();

    assert_eq!(err.failure(), Some(&SessionFailure::ConnectionFailed));
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_shutdown_during_handshake_ends_attempt_silently() {
    let port = spawn_server(|mut ws| async move {
        // Read the handshake, never acknowledge it.
        let _ = recv_request(&mut ws).await;
        drain(&mut ws).await;
    })
    .await;

    let mut machine = ConnectionMachine::new(Vec::<LifecycleEvent>::new());
    machine
        .start_connection(config(port, ""), WebSocketAdapter::new())
        .expect("attempt should start");
    tokio::time::sleep(Duration::from_millis(50)).await;

    machine.shutdown();
    bounded(async {
        while machine.state().is_active() {
            machine.next_event().await;
        }
    })
    .await;

    assert_eq!(machine.state(), ConnectionState::Disconnected);
    assert!(machine.observer().is_empty());
}
