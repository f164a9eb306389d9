//! Error types for arm telemetry and command operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArmError>;

/// Errors raised while decoding a telemetry frame.
///
/// Both variants are fatal to the telemetry read loop: the stream has no
/// framing delimiter beyond the fixed length, so after a bad frame the
/// stream can no longer be trusted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("telemetry frame length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("unknown mode value in telemetry frame: {0}")]
    UnknownMode(i64),
}

/// Errors returned synchronously to a command caller.
///
/// These never affect the telemetry loop or any other command.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("joint id {0} out of range, must be 0..=5")]
    InvalidJoint(usize),

    #[error("unsafe precondition: {0}")]
    UnsafePrecondition(String),

    #[error("another command is outstanding")]
    Busy,

    #[error("command cancelled by shutdown")]
    Cancelled,

    #[error("malformed command line: {0}")]
    Malformed(String),

    #[error("command channel closed, session is down")]
    ChannelClosed,
}

#[derive(Error, Debug)]
pub enum ArmError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("command error: {0}")]
    Command(#[from] CommandError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
