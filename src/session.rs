//! Arm connection session
//!
//! Owns both sockets and the shutdown flag, and runs the two long-lived
//! loops of a connection: the telemetry reader feeding decoded frames into
//! the coordinator, and the command writer draining the outbound queue.
//!
//! A framing loss or socket error on the telemetry side is fatal to the
//! whole session: the loop logs, flips the shutdown flag and exits. There
//! is no reconnect here; reconnection policy belongs to the caller.

use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::error::{ArmError, DecodeError, Result};
use crate::packet::{self, FRAME_SIZE};
use chrono::Utc;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Outbound queue depth; one sweep never has more than a handful of
/// primitives in flight.
const COMMAND_QUEUE_DEPTH: usize = 64;

pub struct Session {
    coordinator: Arc<Coordinator>,
    shutdown_tx: watch::Sender<bool>,
    telemetry_task: JoinHandle<Result<()>>,
    writer_task: JoinHandle<Result<()>>,
}

impl Session {
    /// Connect both sockets and spawn the telemetry and writer loops.
    pub async fn connect(config: &Config) -> Result<Self> {
        let conn = &config.connection;

        let telemetry_socket = TcpStream::connect((conn.host.as_str(), conn.telemetry_port))
            .await
            .map_err(|e| {
                ArmError::Connection(format!(
                    "telemetry socket {}:{}: {}",
                    conn.host, conn.telemetry_port, e
                ))
            })?;
        let command_socket = TcpStream::connect((conn.host.as_str(), conn.command_port))
            .await
            .map_err(|e| {
                ArmError::Connection(format!(
                    "command socket {}:{}: {}",
                    conn.host, conn.command_port, e
                ))
            })?;
        info!(host = %conn.host, "connected to arm controller");

        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let coordinator = Arc::new(Coordinator::new(
            config.coordinator(),
            Some(config.continuum.clone()),
            command_tx,
            shutdown_rx.clone(),
        ));

        let telemetry_task = tokio::spawn(telemetry_loop(
            telemetry_socket,
            coordinator.clone(),
            shutdown_tx.clone(),
            shutdown_rx.clone(),
        ));
        let writer_task = tokio::spawn(writer_loop(command_socket, command_rx, shutdown_rx));

        Ok(Self {
            coordinator,
            shutdown_tx,
            telemetry_task,
            writer_task,
        })
    }

    pub fn coordinator(&self) -> Arc<Coordinator> {
        self.coordinator.clone()
    }

    /// True once the session has failed or been shut down.
    pub fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Signal shutdown without waiting for the loops to finish.
    pub fn signal_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Flip the shutdown flag and wait for both loops to exit. Returns the
    /// telemetry loop's error if the session died on a framing loss or
    /// socket failure.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        let telemetry = self.telemetry_task.await;
        let _ = self.writer_task.await;
        match telemetry {
            Ok(result) => result,
            Err(join_err) => Err(ArmError::Connection(format!(
                "telemetry task panicked: {}",
                join_err
            ))),
        }
    }
}

/// Read one fixed-size frame, accumulating partial reads. `Ok(None)` on a
/// clean end of stream at a frame boundary; a mid-frame EOF is a length
/// mismatch, since the stream has no other framing.
async fn read_frame(socket: &mut TcpStream, buf: &mut [u8; FRAME_SIZE]) -> Result<Option<usize>> {
    let mut filled = 0;
    while filled < FRAME_SIZE {
        let n = socket.read(&mut buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(DecodeError::LengthMismatch {
                expected: FRAME_SIZE,
                actual: filled,
            }
            .into());
        }
        filled += n;
    }
    Ok(Some(filled))
}

/// Blocking read of fixed-size frames; each decoded status replaces the
/// coordinator's current one and wakes any command waiter. Any error here
/// takes the whole session down.
async fn telemetry_loop(
    mut socket: TcpStream,
    coordinator: Arc<Coordinator>,
    shutdown_tx: watch::Sender<bool>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    let mut buf = [0u8; FRAME_SIZE];
    let result = loop {
        tokio::select! {
            frame = read_frame(&mut socket, &mut buf) => {
                match frame {
                    Ok(Some(_)) => match packet::decode(&buf, Utc::now()) {
                        Ok(status) => coordinator.ingest(status),
                        Err(e) => {
                            error!("telemetry decode failed, stream desynchronized: {}", e);
                            break Err(e.into());
                        }
                    },
                    Ok(None) => {
                        info!("telemetry stream closed by peer");
                        break Ok(());
                    }
                    Err(e) => {
                        error!("telemetry read failed: {}", e);
                        break Err(e);
                    }
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break Ok(());
                }
            }
        }
    };
    // Telemetry ending, for any reason, ends the session.
    let _ = shutdown_tx.send(true);
    result
}

/// Drain the outbound queue, one serialized command per write. No reply is
/// read here: command outcomes are inferred from telemetry only.
async fn writer_loop(
    mut socket: TcpStream,
    mut command_rx: mpsc::Receiver<String>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<()> {
    loop {
        tokio::select! {
            line = command_rx.recv() => {
                match line {
                    Some(line) => {
                        socket.write_all(line.as_bytes()).await?;
                        socket.flush().await?;
                    }
                    None => return Ok(()),
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    return Ok(());
                }
            }
        }
    }
}
