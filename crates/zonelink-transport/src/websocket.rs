//! WebSocket adapter using `tokio-tungstenite`.
//!
//! [`WebSocketAdapter::open`] spawns one background task per connection.
//! The adapter handle forwards requests to it over an unbounded channel;
//! the task owns the socket, speaks the JSON frames from
//! `zonelink-protocol`, and raises events through the shared listener set.

use std::io;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use zonelink_protocol::{
    API_VERSION, ClientRequest, Codec, DisconnectReason, JsonCodec, LoginRequest, ProtocolError,
    ServerReply,
};

use crate::{
    ConnectSettings, EventKind, Listener, ListenerId, SharedListeners, TransportAdapter,
    TransportError, TransportEvent, TransportKind,
};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// What the adapter handle asks the background task to do.
#[derive(Debug)]
enum Outbound {
    Request(ClientRequest),
    Close,
}

/// A [`TransportAdapter`] that connects to `ws[s]://host:port/websocket`.
///
/// Needs a Tokio runtime when [`open`](TransportAdapter::open) is called;
/// without one the attempt fails with `Connection { success: false }`.
#[derive(Debug, Default)]
pub struct WebSocketAdapter {
    listeners: SharedListeners,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
}

impl WebSocketAdapter {
    /// Creates an adapter with no connection and no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// The URL `open` will connect to.
    pub fn url(settings: &ConnectSettings) -> String {
        let scheme = if settings.secure { "wss" } else { "ws" };
        format!("{scheme}://{}/websocket", settings.address())
    }

    fn forward(&self, outbound: Outbound) {
        match &self.outbound {
            Some(tx) => {
                if tx.send(outbound).is_err() {
                    tracing::debug!("websocket session already ended, request dropped");
                }
            }
            None => tracing::debug!(?outbound, "websocket not open, request dropped"),
        }
    }
}

impl TransportAdapter for WebSocketAdapter {
    fn kind(&self) -> TransportKind {
        TransportKind::WebSocket
    }

    fn open(&mut self, settings: &ConnectSettings) {
        if self.outbound.is_some() {
            tracing::warn!("websocket adapter already opened, ignoring open");
            return;
        }

        let url = Self::url(settings);
        let zone = settings.zone.clone();
        let listeners = self.listeners.clone();

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!(error = %e, "no Tokio runtime, cannot open websocket");
                listeners.emit(&TransportEvent::Connection { success: false });
                return;
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);
        tracing::debug!(%url, "opening websocket");
        runtime.spawn(run_session(url, zone, rx, listeners));
    }

    fn init_encryption(&mut self) {
        self.forward(Outbound::Request(ClientRequest::InitCrypto));
    }

    fn send_login(&mut self, request: &LoginRequest) {
        self.forward(Outbound::Request(ClientRequest::Login(request.clone())));
    }

    fn close(&mut self) {
        self.forward(Outbound::Close);
        // Nothing can be sent after a close.
        self.outbound = None;
    }

    fn add_listener(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        self.listeners.add(kind, listener)
    }

    fn remove_listener(&mut self, kind: EventKind, id: ListenerId) -> bool {
        self.listeners.remove(kind, id)
    }
}

// ---------------------------------------------------------------------------
// Background task
// ---------------------------------------------------------------------------

/// Owns the socket for one connection, from connect to close.
async fn run_session(
    url: String,
    zone: String,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    listeners: SharedListeners,
) {
    let codec = JsonCodec;

    // A close must be able to abort the connect and the handshake too.
    let handshake = connect(&url, &zone, &codec);
    tokio::pin!(handshake);
    let connected = loop {
        tokio::select! {
            result = &mut handshake => break result,
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Request(request)) => {
                    tracing::debug!(?request, "handshake still running, request dropped");
                }
                Some(Outbound::Close) | None => {
                    tracing::debug!(%url, "closed before handshake completed");
                    listeners.emit(&TransportEvent::Connection { success: false });
                    return;
                }
            },
        }
    };

    let mut ws = match connected {
        Ok(ws) => ws,
        Err(e) => {
            tracing::info!(%url, error = %e, "websocket connection failed");
            listeners.emit(&TransportEvent::Connection { success: false });
            return;
        }
    };
    listeners.emit(&TransportEvent::Connection { success: true });

    // A `disconnect` frame announces the reason before the server closes.
    let mut announced: Option<DisconnectReason> = None;

    let reason = loop {
        tokio::select! {
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Request(request)) => {
                    if let Err(e) = send(&mut ws, &codec, &request).await {
                        tracing::debug!(error = %e, "websocket send failed");
                        break announced.unwrap_or(DisconnectReason::Unknown);
                    }
                }
                // A dropped adapter closes just like an explicit close.
                Some(Outbound::Close) | None => {
                    if let Err(e) = ws.close(None).await {
                        tracing::debug!(error = %e, "websocket close handshake failed");
                    }
                    break DisconnectReason::Manual;
                }
            },
            frame = ws.next() => match frame {
                Some(Ok(Message::Binary(data))) => {
                    on_reply(&codec, &data, &listeners, &mut announced);
                }
                Some(Ok(Message::Text(text))) => {
                    on_reply(&codec, text.as_bytes(), &listeners, &mut announced);
                }
                Some(Ok(Message::Close(_))) | None => {
                    break announced.unwrap_or(DisconnectReason::Unknown);
                }
                Some(Ok(_)) => {} // ping/pong/frame
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "websocket receive failed");
                    break announced.unwrap_or(DisconnectReason::Unknown);
                }
            },
        }
    };

    tracing::debug!(%reason, "websocket session ended");
    listeners.emit(&TransportEvent::ConnectionLost { reason });
}

/// Connects and completes the handshake.
async fn connect(url: &str, zone: &str, codec: &JsonCodec) -> Result<WsStream, TransportError> {
    let (mut ws, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

    let handshake = ClientRequest::Handshake {
        api_version: API_VERSION,
        zone: zone.to_string(),
    };
    send(&mut ws, codec, &handshake).await?;

    loop {
        let data: Vec<u8> = match ws.next().await {
            Some(Ok(Message::Binary(data))) => data.into(),
            Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
            Some(Ok(Message::Close(_))) | None => {
                return Err(TransportError::ConnectionClosed(
                    "closed during handshake".into(),
                ));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                return Err(TransportError::ReceiveFailed(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    e,
                )));
            }
        };

        return match codec.decode::<ServerReply>(&data)? {
            ServerReply::HandshakeAck { api_version } => {
                tracing::debug!(api_version, "handshake acknowledged");
                Ok(ws)
            }
            other => Err(ProtocolError::Unexpected(format!(
                "{other:?} before handshake acknowledgement"
            ))
            .into()),
        };
    }
}

async fn send(
    ws: &mut WsStream,
    codec: &JsonCodec,
    request: &ClientRequest,
) -> Result<(), TransportError> {
    let bytes = codec.encode(request)?;
    ws.send(Message::Binary(bytes.into()))
        .await
        .map_err(|e| TransportError::SendFailed(io::Error::new(io::ErrorKind::BrokenPipe, e)))
}

/// Turns one server frame into an event (or remembers a disconnect reason).
fn on_reply(
    codec: &JsonCodec,
    data: &[u8],
    listeners: &SharedListeners,
    announced: &mut Option<DisconnectReason>,
) {
    let reply: ServerReply = match codec.decode(data) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring undecodable frame");
            return;
        }
    };

    let event = match reply {
        ServerReply::CryptoInit {
            success,
            error_message,
        } => TransportEvent::CryptoInit {
            success,
            error_message,
        },
        ServerReply::LoginOk { user_name, zone } => {
            tracing::debug!(%user_name, %zone, "login accepted");
            TransportEvent::Login
        }
        ServerReply::LoginError { error_message } => TransportEvent::LoginError { error_message },
        ServerReply::Disconnect { reason } => {
            *announced = Some(reason);
            return;
        }
        ServerReply::HandshakeAck { .. } => {
            tracing::debug!("ignoring repeated handshake acknowledgement");
            return;
        }
    };
    listeners.emit(&event);
}
