//! Session configuration: where to connect and who to log in as.
//!
//! A [`SessionConfig`] is a plain value. The caller builds one (usually
//! through [`SessionConfig::builder`]), hands it to
//! [`ConnectionMachine::start_connection`](crate::ConnectionMachine::start_connection),
//! and from that moment the attempt owns it: nothing can change the host
//! or the credentials of an attempt that is already in flight.

use std::fmt;

use serde::{Deserialize, Serialize};
use zonelink_protocol::LoginRequest;
use zonelink_transport::{ConnectSettings, TransportKind, TunnelSettings};

use crate::SessionError;

// ---------------------------------------------------------------------------
// LogLevel
// ---------------------------------------------------------------------------

/// Client-side logging verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// The matching `tracing` filter directive.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Everything needed to connect and log in.
///
/// `Default` gives the stock local setup (`127.0.0.1`, ports 9933 / 8080 /
/// 8443, zone `BasicExamples`) but no user name, so a default config
/// does not pass [`validate`](Self::validate) until one is set.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Server address. Must be a domain name when `encrypt` is set,
    /// since certificates are issued for names.
    pub host: String,
    /// TCP socket port.
    pub tcp_port: u16,
    /// HTTP port: WebSocket connections and the HTTP tunnel.
    pub http_port: u16,
    /// HTTPS port: secure WebSocket connections and the HTTPS tunnel.
    pub https_port: u16,
    /// Fall back to HTTP tunnelling when a socket can't be opened.
    /// Ignored by WebSocket transports.
    pub use_http_tunnel: bool,
    /// Bootstrap protocol encryption before logging in.
    pub encrypt: bool,
    /// Zone to log into.
    pub zone: String,
    /// Display name to log in as.
    pub user_name: String,
    /// Optional password; empty for guest zones.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Verbose adapter output.
    pub debug: bool,
    pub log_level: LogLevel,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            tcp_port: 9933,
            http_port: 8080,
            https_port: 8443,
            use_http_tunnel: false,
            encrypt: false,
            zone: "BasicExamples".to_string(),
            user_name: String::new(),
            password: String::new(),
            debug: false,
            log_level: LogLevel::default(),
        }
    }
}

/// Hand-written so the password never reaches the logs.
impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("host", &self.host)
            .field("tcp_port", &self.tcp_port)
            .field("http_port", &self.http_port)
            .field("https_port", &self.https_port)
            .field("use_http_tunnel", &self.use_http_tunnel)
            .field("encrypt", &self.encrypt)
            .field("zone", &self.zone)
            .field("user_name", &self.user_name)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("debug", &self.debug)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl SessionConfig {
    /// Starts a builder for `user_name` with every other field at its
    /// default.
    pub fn builder(user_name: impl Into<String>) -> SessionConfigBuilder {
        SessionConfigBuilder {
            config: SessionConfig {
                user_name: user_name.into(),
                ..SessionConfig::default()
            },
        }
    }

    /// Checks that every required field is present.
    ///
    /// Only presence is checked, not format: a host that doesn't resolve
    /// is the transport's problem and surfaces as a failed connection.
    ///
    /// # Errors
    /// [`SessionError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), SessionError> {
        fn required(field: &'static str, value: &str) -> Result<(), SessionError> {
            if value.trim().is_empty() {
                return Err(SessionError::InvalidConfig {
                    field,
                    reason: "must not be empty",
                });
            }
            Ok(())
        }

        fn port(field: &'static str, value: u16) -> Result<(), SessionError> {
            if value == 0 {
                return Err(SessionError::InvalidConfig {
                    field,
                    reason: "must be a positive port number",
                });
            }
            Ok(())
        }

        required("host", &self.host)?;
        port("tcp_port", self.tcp_port)?;
        port("http_port", self.http_port)?;
        port("https_port", self.https_port)?;
        required("zone", &self.zone)?;
        required("user_name", &self.user_name)?;
        Ok(())
    }

    /// Derives the parameters for opening a connection with an adapter
    /// of the given kind.
    ///
    /// - **Socket**: connects to `tcp_port`. The HTTP tunnel is available
    ///   and tunnels over HTTPS when `encrypt` is set. Encryption itself
    ///   is bootstrapped in-band after connecting, so `secure` is off.
    /// - **WebSocket**: connects to `https_port` with `secure` on when
    ///   `encrypt` is set, to `http_port` otherwise. There is no tunnel.
    pub fn connect_settings(&self, kind: TransportKind) -> ConnectSettings {
        let (port, secure, tunnel) = match kind {
            TransportKind::Socket => (
                self.tcp_port,
                false,
                TunnelSettings {
                    enabled: self.use_http_tunnel,
                    use_https: self.encrypt,
                    http_port: self.http_port,
                    https_port: self.https_port,
                },
            ),
            TransportKind::WebSocket => {
                if self.use_http_tunnel {
                    tracing::warn!("HTTP tunnelling is not available over WebSocket, ignoring");
                }
                let port = if self.encrypt {
                    self.https_port
                } else {
                    self.http_port
                };
                (port, self.encrypt, TunnelSettings::default())
            }
        };

        ConnectSettings {
            host: self.host.clone(),
            port,
            secure,
            zone: self.zone.clone(),
            tunnel,
            debug: self.debug,
        }
    }

    /// The credentials presented once the connection is ready.
    pub fn login_request(&self) -> LoginRequest {
        LoginRequest {
            zone: self.zone.clone(),
            user_name: self.user_name.clone(),
            password: self.password.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for [`SessionConfig`]. `build` validates.
///
/// ```rust
/// use zonelink_session::SessionConfig;
///
/// let config = SessionConfig::builder("alice")
///     .host("play.example.com")
///     .zone("Lobby")
///     .encrypt(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.https_port, 8443);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn tcp_port(mut self, port: u16) -> Self {
        self.config.tcp_port = port;
        self
    }

    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = port;
        self
    }

    pub fn https_port(mut self, port: u16) -> Self {
        self.config.https_port = port;
        self
    }

    pub fn use_http_tunnel(mut self, enabled: bool) -> Self {
        self.config.use_http_tunnel = enabled;
        self
    }

    pub fn encrypt(mut self, enabled: bool) -> Self {
        self.config.encrypt = enabled;
        self
    }

    pub fn zone(mut self, zone: impl Into<String>) -> Self {
        self.config.zone = zone.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.log_level = level;
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    /// See [`SessionConfig::validate`].
    pub fn build(self) -> Result<SessionConfig, SessionError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
