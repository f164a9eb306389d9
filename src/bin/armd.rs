//! armd - arm control daemon
//!
//! Connects to the arm controller, runs the telemetry session, and streams
//! newline-delimited commands from stdin through the coordinator. One JSON
//! event per state transition goes to stdout; logs go to stderr.

use anyhow::{Context, Result};
use armd::{CommandKind, Config, Outcome, Session};
use clap::Parser;
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "armd")]
#[command(about = "Articulated arm daemon - telemetry tracking and command streaming")]
#[command(version)]
struct Args {
    /// Path to the daemon configuration file
    #[arg(short, long, default_value = "config/armd.yaml")]
    config: String,

    /// Override the controller host from the configuration
    #[arg(long)]
    host: Option<String>,

    /// Origin id stamped on every command issued by this process
    #[arg(long, default_value_t = 1)]
    origin: u32,
}

fn timestamp() -> f64 {
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();
    (t * 1_000_000.0).round() / 1_000_000.0
}

fn emit(event: serde_json::Value) {
    println!("{}", event);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load_from_path(&args.config)
        .with_context(|| format!("failed to load {}", args.config))?;
    if let Some(host) = args.host {
        config.connection.host = host;
    }

    info!("arm daemon starting");
    info!(
        "controller: {} (telemetry :{}, commands :{})",
        config.connection.host, config.connection.telemetry_port, config.connection.command_port
    );

    let session = Session::connect(&config)
        .await
        .context("failed to connect to arm controller")?;
    let coordinator = session.coordinator();
    info!("session up, reading commands from stdin");

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin);
    let mut buffer = String::new();

    loop {
        buffer.clear();
        tokio::select! {
            read = reader.read_line(&mut buffer) => {
                match read {
                    Ok(0) => {
                        info!("end of command input");
                        break;
                    }
                    Ok(_) => {
                        let line = buffer.trim();
                        if line.is_empty() || line.starts_with('#') {
                            continue;
                        }
                        let kind = match CommandKind::parse(line) {
                            Ok(kind) => kind,
                            Err(e) => {
                                emit(json!({
                                    "timestamp": timestamp(),
                                    "type": "command_rejected",
                                    "command": line,
                                    "error": e.to_string(),
                                }));
                                continue;
                            }
                        };
                        let name = kind.name();
                        emit(json!({
                            "timestamp": timestamp(),
                            "type": "command_sent",
                            "command": name,
                        }));
                        match coordinator.execute(kind, args.origin).await {
                            Ok(Outcome::Completed) => emit(json!({
                                "timestamp": timestamp(),
                                "type": "command_completed",
                                "command": name,
                            })),
                            Ok(Outcome::Failed { reason }) => emit(json!({
                                "timestamp": timestamp(),
                                "type": "command_failed",
                                "command": name,
                                "reason": reason,
                            })),
                            Ok(Outcome::TimedOut) => emit(json!({
                                "timestamp": timestamp(),
                                "type": "command_timed_out",
                                "command": name,
                            })),
                            Err(e) => {
                                emit(json!({
                                    "timestamp": timestamp(),
                                    "type": "command_rejected",
                                    "command": name,
                                    "error": e.to_string(),
                                }));
                                if session.is_shut_down() {
                                    error!("session is down, stopping");
                                    break;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!("failed to read from stdin: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                session.signal_shutdown();
                break;
            }
        }
    }

    info!("shutting down session");
    session.shutdown().await.context("session failed")?;
    info!("arm daemon stopped");
    Ok(())
}
