use std::fs;
use std::path::PathBuf;

use clap::Parser;
use clap::builder::BoolishValueParser;
use zonelink::prelude::*;
use zonelink::{RequestKind, ScriptedAdapter, TransportEvent};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Every connection option can also come from a `ZONELINK_*` variable.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "console-login")]
#[command(about = "Log into a zone server, then log out again")]
struct Args {
    /// Name to log in as.
    #[arg(env = "ZONELINK_USER", default_value = "guest")]
    user_name: String,

    /// JSON session config. Replaces every connection option below.
    #[arg(long, env = "ZONELINK_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "ZONELINK_HOST")]
    host: Option<String>,

    /// WebSocket port, used for plain and encrypted connections alike.
    #[arg(long, env = "ZONELINK_PORT")]
    port: Option<u16>,

    #[arg(long, env = "ZONELINK_ZONE")]
    zone: Option<String>,

    #[arg(long, env = "ZONELINK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, env = "ZONELINK_ENCRYPT", value_parser = BoolishValueParser::new())]
    encrypt: bool,

    /// Debug output from the Zonelink crates.
    #[arg(long, env = "ZONELINK_DEBUG", value_parser = BoolishValueParser::new())]
    debug: bool,

    /// Use a scripted in-memory transport instead of a server.
    #[arg(long)]
    offline: bool,

    /// Stay logged in until the server ends the session.
    #[arg(long)]
    stay: bool,
}

fn load_config(args: &Args) -> Result<SessionConfig, Box<dyn std::error::Error>> {
    if let Some(path) = &args.config {
        let mut config: SessionConfig = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.user_name = args.user_name.clone();
        config.validate()?;
        return Ok(config);
    }

    let mut builder = SessionConfig::builder(args.user_name.as_str())
        .encrypt(args.encrypt)
        .debug(args.debug);
    if let Some(host) = &args.host {
        builder = builder.host(host.as_str());
    }
    if let Some(port) = args.port {
        builder = builder.http_port(port).https_port(port);
    }
    if let Some(zone) = &args.zone {
        builder = builder.zone(zone.as_str());
    }
    if let Some(password) = &args.password {
        builder = builder.password(password.as_str());
    }
    Ok(builder.build()?)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Logs in, reports the outcome, then logs out (or waits for the server
/// to end the session with `--stay`).
async fn session<T: TransportAdapter>(
    config: SessionConfig,
    transport: T,
    stay: bool,
) -> Result<(), ZonelinkError> {
    let user_name = config.user_name.clone();
    let zone = config.zone.clone();

    let mut client = Client::new();
    client.connect(config, transport).await?;
    println!("logged in as {user_name} in zone {zone}");

    if stay {
        match client.run_until_disconnected().await {
            Some(reason) => println!("disconnected by server: {reason}"),
            None => println!("disconnected"),
        }
    } else {
        client.logout().await;
        println!("logged out");
    }
    Ok(())
}

/// An adapter that accepts everything, for trying the flow without a
/// server.
fn offline_adapter() -> ScriptedAdapter {
    let adapter = ScriptedAdapter::new(TransportKind::WebSocket);
    adapter
        .reply_to(RequestKind::Open, TransportEvent::Connection { success: true })
        .reply_to(
            RequestKind::InitEncryption,
            TransportEvent::CryptoInit {
                success: true,
                error_message: None,
            },
        )
        .reply_to(RequestKind::SendLogin, TransportEvent::Login)
        .reply_to(
            RequestKind::Close,
            TransportEvent::ConnectionLost {
                reason: DisconnectReason::Manual,
            },
        );
    adapter
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args)?;
    zonelink::init_logging(&config);

    let result = if args.offline {
        session(config, offline_adapter(), args.stay).await
    } else {
        session(config, WebSocketAdapter::new(), args.stay).await
    };
    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
    Ok(())
}
