//! Integration tests for the connection state machine, driven through a
//! scripted transport.

use zonelink_protocol::DisconnectReason;
use zonelink_session::{
    ConnectionMachine, ConnectionState, LifecycleEvent, LifecycleObserver, SessionConfig,
    SessionError, SessionFailure,
};
use zonelink_transport::{Request, RequestKind, ScriptedAdapter, TransportEvent, TransportKind};

// =========================================================================
// Helpers
// =========================================================================

type Machine = ConnectionMachine<ScriptedAdapter, Vec<LifecycleEvent>>;

fn config(encrypt: bool) -> SessionConfig {
    SessionConfig::builder("alice")
        .host("play.example.com")
        .zone("Lobby")
        .password("hunter2")
        .encrypt(encrypt)
        .build()
        .unwrap()
}

fn socket() -> ScriptedAdapter {
    ScriptedAdapter::new(TransportKind::Socket)
}

fn lost(reason: DisconnectReason) -> TransportEvent {
    TransportEvent::ConnectionLost { reason }
}

/// Starts an attempt on `transport` and pumps whatever it replied.
fn start(machine: &mut Machine, transport: &ScriptedAdapter, encrypt: bool) {
    machine
        .start_connection(config(encrypt), transport.clone())
        .unwrap();
    machine.process_events();
}

/// Raises `event` on `transport` and pumps the queue.
fn raise(machine: &mut Machine, transport: &ScriptedAdapter, event: TransportEvent) {
    transport.emit(event);
    machine.process_events();
}

fn kinds(transport: &ScriptedAdapter) -> Vec<RequestKind> {
    transport.requests().iter().map(Request::kind).collect()
}

/// Brings a fresh machine to `Authenticated` over a plain connection.
fn authenticated() -> (Machine, ScriptedAdapter) {
    let mut machine = Machine::new(Vec::new());
    let transport = socket();
    transport
        .reply_to(RequestKind::Open, TransportEvent::Connection { success: true })
        .reply_to(RequestKind::SendLogin, TransportEvent::Login);
    start(&mut machine, &transport, false);
    assert_eq!(machine.state(), ConnectionState::Authenticated);
    (machine, transport)
}

// =========================================================================
// Happy paths
// =========================================================================

#[test]
fn test_plain_connection_sends_login_and_waits() {
    let mut machine = Machine::new(Vec::new());
    let transport = socket();
    start(&mut machine, &transport, false);
    assert_eq!(machine.state(), ConnectionState::Connecting);

    raise(&mut machine, &transport, TransportEvent::Connection { success: true });

    assert_eq!(machine.state(), ConnectionState::Authenticating);
    assert_eq!(kinds(&transport), vec![RequestKind::Open, RequestKind::SendLogin]);
    assert_eq!(
        machine.observer(),
        &vec![LifecycleEvent::Connected(TransportKind::Socket)]
    );
}

#[test]
fn test_encrypted_connection_bootstraps_crypto_before_login() {
    let mut machine = Machine::new(Vec::new());
    let transport = socket();
    start(&mut machine, &transport, true);

    raise(&mut machine, &transport, TransportEvent::Connection { success: true });
    assert_eq!(machine.state(), ConnectionState::EncryptionPending);
    assert_eq!(transport.count(RequestKind::InitEncryption), 1);
    assert_eq!(transport.count(RequestKind::SendLogin), 0);

    raise(
        &mut machine,
        &transport,
        TransportEvent::CryptoInit {
            success: true,
            error_message: None,
        },
    );
    assert_eq!(machine.state(), ConnectionState::Authenticating);
    assert_eq!(
        kinds(&transport),
        vec![
            RequestKind::Open,
            RequestKind::InitEncryption,
            RequestKind::SendLogin
        ]
    );
}

#[test]
fn test_login_success_is_reported_once() {
    let (machine, transport) = authenticated();
    assert_eq!(
        machine.observer(),
        &vec![
            LifecycleEvent::Connected(TransportKind::Socket),
            LifecycleEvent::LoginSucceeded
        ]
    );
    assert_eq!(transport.listener_count(), 5);
}

#[test]
fn test_open_and_login_use_configured_values() {
    let (_machine, transport) = authenticated();
    let requests = transport.requests();

    let Request::Open(settings) = &requests[0] else {
        panic!("first request was {:?}", requests[0]);
    };
    assert_eq!(settings.host, "play.example.com");
    assert_eq!(settings.port, 9933);
    assert_eq!(settings.zone, "Lobby");

    let Request::SendLogin(login) = &requests[1] else {
        panic!("second request was {:?}", requests[1]);
    };
    assert_eq!(login.user_name, "alice");
    assert_eq!(login.zone, "Lobby");
    assert_eq!(login.password, "hunter2");
}

#[test]
fn test_websocket_connection_uses_http_port() {
    let mut machine = Machine::new(Vec::new());
    let transport = ScriptedAdapter::new(TransportKind::WebSocket);
    start(&mut machine, &transport, false);

    let Request::Open(settings) = &transport.requests()[0] else {
        panic!("expected open");
    };
    assert_eq!(settings.port, 8080);
    assert!(!settings.secure);
}

// =========================================================================
// Failures
// =========================================================================

#[test]
fn test_login_rejected_closes_then_disconnects_silently() {
    let mut machine = Machine::new(Vec::new());
    let transport = socket();
    transport.reply_to(RequestKind::Open, TransportEvent::Connection { success: true });
    start(&mut machine, &transport, false);
    assert_eq!(machine.state(), ConnectionState::Authenticating);

    raise(
        &mut machine,
        &transport,
        TransportEvent::LoginError {
            error_message: Some("bad credential".into()),
        },
    );
    assert_eq!(transport.count(RequestKind::Close), 1);
    assert_eq!(machine.state(), ConnectionState::Authenticating);
    assert!(machine.is_closing());

    raise(&mut machine, &transport, lost(DisconnectReason::Manual));

    assert_eq!(machine.state(), ConnectionState::Disconnected);
    let failures: Vec<_> = machine
        .observer()
        .iter()
        .filter_map(LifecycleEvent::failure)
        .collect();
    assert_eq!(
        failures,
        vec![&SessionFailure::LoginFailed(Some("bad credential".into()))]
    );
    assert_eq!(transport.listener_count(), 0);
}

#[test]
fn test_kicked_while_authenticated_reports_fixed_message() {
    struct Messages(Vec<(DisconnectReason, String)>);

    impl LifecycleObserver for Messages {
        fn on_connection_failed(&mut self) {}
        fn on_encryption_failed(&mut self, _message: Option<&str>) {}
        fn on_login_succeeded(&mut self) {}
        fn on_login_failed(&mut self, _message: Option<&str>) {}
        fn on_unexpected_disconnection(&mut self, reason: DisconnectReason, message: &str) {
            self.0.push((reason, message.to_string()));
        }
    }

    let mut machine = ConnectionMachine::new(Messages(Vec::new()));
    let transport = socket();
    transport
        .reply_to(RequestKind::Open, TransportEvent::Connection { success: true })
        .reply_to(RequestKind::SendLogin, TransportEvent::Login);
    machine
        .start_connection(config(false), transport.clone())
        .unwrap();
    machine.process_events();

    transport.emit(lost(DisconnectReason::Kicked));
    machine.process_events();

    assert_eq!(machine.state(), ConnectionState::Disconnected);
    assert_eq!(
        machine.observer().0,
        vec![(DisconnectReason::Kicked, "you have been kicked".to_string())]
    );
}

#[test]
fn test_every_unexpected_reason_maps_to_its_message() {
    let cases = [
        (DisconnectReason::IdleTimeout, "you have been idle for too much time"),
        (DisconnectReason::Kicked, "you have been kicked"),
        (DisconnectReason::Banned, "you have been banned"),
        (DisconnectReason::Unknown, "reason is unknown."),
    ];
    for (reason, text) in cases {
        let (mut machine, transport) = authenticated();
        raise(&mut machine, &transport, lost(reason));

        let failure = machine.observer().last().and_then(LifecycleEvent::failure);
        assert_eq!(
            failure,
            Some(&SessionFailure::UnexpectedDisconnection(reason))
        );
        assert_eq!(
            SessionFailure::UnexpectedDisconnection(reason).to_string(),
            format!("An unexpected disconnection occurred; {text}")
        );
    }
}

#[test]
fn test_connection_failure_disconnects_and_cleans_up() {
    let mut machine = Machine::new(Vec::new());
    let transport = socket();
    transport.reply_to(RequestKind::Open, TransportEvent::Connection { success: false });
    start(&mut machine, &transport, false);

    assert_eq!(machine.state(), ConnectionState::Disconnected);
    assert_eq!(
        machine.observer(),
        &vec![LifecycleEvent::Failed(SessionFailure::ConnectionFailed)]
    );
    assert_eq!(transport.listener_count(), 0);
    assert_eq!(kinds(&transport), vec![RequestKind::Open]);
}

#[test]
fn test_encryption_failure_closes_then_disconnects() {
    let mut machine = Machine::new(Vec::new());
    let transport = socket();
    transport
        .reply_to(RequestKind::Open, TransportEvent::Connection { success: true })
        .reply_to(
            RequestKind::InitEncryption,
            TransportEvent::CryptoInit {
                success: false,
                error_message: Some("handshake refused".into()),
            },
        )
        .reply_to(RequestKind::Close, lost(DisconnectReason::Manual));
    start(&mut machine, &transport, true);

    assert_eq!(machine.state(), ConnectionState::Disconnected);
    assert_eq!(transport.count(RequestKind::SendLogin), 0);
    assert_eq!(
        machine.observer().last(),
        Some(&LifecycleEvent::Failed(SessionFailure::EncryptionFailed(
            Some("handshake refused".into())
        )))
    );
    assert_eq!(transport.listener_count(), 0);
}

// =========================================================================
// Caller operations
// =========================================================================

#[test]
fn test_start_while_active_is_rejected_without_side_effects() {
    let mut machine = Machine::new(Vec::new());
    let first = socket();
    start(&mut machine, &first, false);

    let second = socket();
    let result = machine.start_connection(config(false), second.clone());

    assert_eq!(
        result,
        Err(SessionError::AlreadyConnecting(ConnectionState::Connecting))
    );
    assert!(second.requests().is_empty());
    assert_eq!(second.listener_count(), 0);
    assert_eq!(machine.state(), ConnectionState::Connecting);
}

#[test]
fn test_logout_is_silent_and_idempotent() {
    let (mut machine, transport) = authenticated();
    let before = machine.observer().len();

    machine.logout();
    machine.logout();
    machine.process_events();
    assert_eq!(transport.count(RequestKind::Close), 1);
    assert_eq!(machine.state(), ConnectionState::Authenticated);

    raise(&mut machine, &transport, lost(DisconnectReason::Manual));

    assert_eq!(machine.state(), ConnectionState::Disconnected);
    assert_eq!(machine.observer().len(), before);
    assert_eq!(transport.listener_count(), 0);
}

#[test]
fn test_logout_after_disconnect_is_a_noop() {
    let (mut machine, transport) = authenticated();
    machine.logout();
    raise(&mut machine, &transport, lost(DisconnectReason::Manual));
    assert_eq!(machine.state(), ConnectionState::Disconnected);
    let before = machine.observer().len();

    machine.logout();
    machine.process_events();

    assert_eq!(machine.state(), ConnectionState::Disconnected);
    assert_eq!(transport.count(RequestKind::Close), 1);
    assert_eq!(machine.observer().len(), before);
}

#[test]
fn test_logout_without_connection_does_nothing() {
    let mut machine = Machine::new(Vec::new());
    machine.logout();
    machine.shutdown();
    assert_eq!(machine.state(), ConnectionState::Idle);
    assert!(machine.observer().is_empty());
}

#[test]
fn test_logout_while_connecting_suppresses_connection_failure() {
    let mut machine = Machine::new(Vec::new());
    let transport = socket();
    start(&mut machine, &transport, false);

    machine.shutdown();
    raise(&mut machine, &transport, TransportEvent::Connection { success: false });

    assert_eq!(machine.state(), ConnectionState::Disconnected);
    assert!(machine.observer().is_empty());
    assert_eq!(transport.listener_count(), 0);
}

#[test]
fn test_events_after_close_request_are_ignored_until_lost() {
    let mut machine = Machine::new(Vec::new());
    let transport = socket();
    transport.reply_to(RequestKind::Open, TransportEvent::Connection { success: true });
    start(&mut machine, &transport, false);

    machine.logout();
    raise(&mut machine, &transport, TransportEvent::Login);

    assert_eq!(machine.state(), ConnectionState::Authenticating);
    assert!(!machine.observer().contains(&LifecycleEvent::LoginSucceeded));
}

#[test]
fn test_reconnect_after_disconnect_starts_fresh_attempt() {
    let (mut machine, first) = authenticated();
    raise(&mut machine, &first, lost(DisconnectReason::IdleTimeout));
    assert_eq!(machine.state(), ConnectionState::Disconnected);

    let second = socket();
    second.reply_to(RequestKind::Open, TransportEvent::Connection { success: true });
    start(&mut machine, &second, false);

    assert_eq!(machine.state(), ConnectionState::Authenticating);
    assert_eq!(first.listener_count(), 0);
    assert_eq!(second.listener_count(), 5);
}

// =========================================================================
// Ignored events
// =========================================================================

#[test]
fn test_duplicate_login_when_authenticated_is_ignored() {
    let (mut machine, transport) = authenticated();
    let before = machine.observer().clone();

    raise(&mut machine, &transport, TransportEvent::Login);

    assert_eq!(machine.state(), ConnectionState::Authenticated);
    assert_eq!(machine.observer(), &before);
}

#[test]
fn test_no_reply_stalls_in_pending_state() {
    let mut machine = Machine::new(Vec::new());
    let transport = socket();
    transport.reply_to(RequestKind::Open, TransportEvent::Connection { success: true });
    start(&mut machine, &transport, true);

    assert_eq!(machine.process_events(), 0);
    assert_eq!(machine.state(), ConnectionState::EncryptionPending);
    assert_eq!(transport.listener_count(), 5);
}

#[test]
fn test_events_from_dropped_attempt_do_not_reach_new_one() {
    let (mut machine, first) = authenticated();
    // Queued while listeners are still bound, then the attempt ends.
    first.emit(TransportEvent::Login);
    first.emit(lost(DisconnectReason::Banned));
    machine.process_events();
    assert_eq!(machine.state(), ConnectionState::Disconnected);

    let second = socket();
    start(&mut machine, &second, false);
    first.emit(TransportEvent::Connection { success: true });
    machine.process_events();

    assert_eq!(machine.state(), ConnectionState::Connecting);
    assert_eq!(second.count(RequestKind::SendLogin), 0);
}

#[tokio::test]
async fn test_next_event_waits_for_adapter() {
    let mut machine = Machine::new(Vec::new());
    let transport = socket();
    machine
        .start_connection(config(false), transport.clone())
        .unwrap();

    let raiser = transport.clone();
    tokio::spawn(async move {
        tokio::task::yield_now().await;
        raiser.emit(TransportEvent::Connection { success: true });
    });
    machine.next_event().await;

    assert_eq!(machine.state(), ConnectionState::Authenticating);
}
