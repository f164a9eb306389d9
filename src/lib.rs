//! armd - articulated arm control over a network link
//!
//! Decodes the arm controller's fixed-size binary telemetry stream, issues
//! typed motion and safety commands back to it, and correlates the two so a
//! caller knows when a command has completed, failed or timed out. Command
//! outcome is inferred from telemetry only; the command socket carries no
//! acknowledgement.
//!
//! # Architecture
//!
//! - **packet**: fixed-size big-endian frame codec producing [`Status`]
//! - **status**: decoded snapshot plus robot/joint mode enumerations
//! - **command**: closed command family with envelope and wire form
//! - **coordinator**: queues, gates, transmits and tracks commands against
//!   the live telemetry stream
//! - **session**: owns the sockets, the telemetry and writer loops, and the
//!   shutdown flag
//! - **sweep**/**config**: the preconfigured continuum scan and its
//!   declarative parameters
//! - **units**: unit-tagged quantities for physical command fields

pub mod command;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod packet;
pub mod session;
pub mod status;
pub mod sweep;
pub mod units;

pub use command::{Command, CommandKind};
pub use config::{Config, ConnectionConfig, ContinuumConfig, CoordinatorConfig, ScanConfig};
pub use coordinator::{Coordinator, Outcome};
pub use error::{ArmError, CommandError, DecodeError, Result};
pub use packet::{decode, FRAME_SIZE};
pub use session::Session;
pub use status::{JointMode, RobotMode, Status, JOINTS};
pub use sweep::SweepPlan;
pub use units::{Deg, Meters, Quantity, Rad, DEG, METERS, RAD};
