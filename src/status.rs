//! Decoded arm status and mode enumerations
//!
//! One `Status` is produced per telemetry frame and never mutated afterwards.
//! The mode enums carry both the integer form used in the binary telemetry
//! and the canonical string form used on the wire/config side; the two are
//! losslessly interconvertible and unknown values are decode errors, never
//! silently mapped to a default.

use crate::error::DecodeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of joints in the arm. Joint arrays are indexed 0..5 in
/// protocol-defined order and must not be reordered.
pub const JOINTS: usize = 6;

/// Controller-reported operating state of the whole arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotMode {
    Running = 0,
    Freedrive = 1,
    Ready = 2,
    Initializing = 3,
    SecurityStopped = 4,
    EStopped = 5,
    FatalError = 6,
    NoPower = 7,
    NotConnected = 8,
    Shutdown = 9,
    SafeguardStop = 10,
}

impl RobotMode {
    /// Map the integer form found in the binary telemetry.
    pub fn from_wire(raw: i64) -> Result<Self, DecodeError> {
        use RobotMode::*;
        Ok(match raw {
            0 => Running,
            1 => Freedrive,
            2 => Ready,
            3 => Initializing,
            4 => SecurityStopped,
            5 => EStopped,
            6 => FatalError,
            7 => NoPower,
            8 => NotConnected,
            9 => Shutdown,
            10 => SafeguardStop,
            _ => return Err(DecodeError::UnknownMode(raw)),
        })
    }

    pub fn as_str(&self) -> &'static str {
        use RobotMode::*;
        match self {
            Running => "running",
            Freedrive => "freedrive",
            Ready => "ready",
            Initializing => "initializing",
            SecurityStopped => "security_stopped",
            EStopped => "estopped",
            FatalError => "fatal_error",
            NoPower => "no_power",
            NotConnected => "not_connected",
            Shutdown => "shutdown",
            SafeguardStop => "safeguard_stop",
        }
    }

    /// True if the arm has servo power.
    pub fn is_powered(&self) -> bool {
        !matches!(
            self,
            RobotMode::NoPower | RobotMode::NotConnected | RobotMode::Shutdown
        )
    }

    /// True if the brakes are engaged or motion is otherwise inhibited.
    pub fn brakes_engaged(&self) -> bool {
        matches!(
            self,
            RobotMode::SecurityStopped
                | RobotMode::EStopped
                | RobotMode::SafeguardStop
                | RobotMode::FatalError
        )
    }
}

impl FromStr for RobotMode {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use RobotMode::*;
        Ok(match s {
            "running" => Running,
            "freedrive" => Freedrive,
            "ready" => Ready,
            "initializing" => Initializing,
            "security_stopped" => SecurityStopped,
            "estopped" => EStopped,
            "fatal_error" => FatalError,
            "no_power" => NoPower,
            "not_connected" => NotConnected,
            "shutdown" => Shutdown,
            "safeguard_stop" => SafeguardStop,
            _ => return Err(DecodeError::UnknownMode(-1)),
        })
    }
}

impl std::fmt::Display for RobotMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controller-reported operating state of an individual joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointMode {
    PowerOff = 239,
    Error = 242,
    Freedrive = 243,
    Calibration = 245,
    Stopped = 247,
    Running = 253,
    Initializing = 254,
    Idle = 255,
}

impl JointMode {
    pub fn from_wire(raw: i64) -> Result<Self, DecodeError> {
        use JointMode::*;
        Ok(match raw {
            239 => PowerOff,
            242 => Error,
            243 => Freedrive,
            245 => Calibration,
            247 => Stopped,
            253 => Running,
            254 => Initializing,
            255 => Idle,
            _ => return Err(DecodeError::UnknownMode(raw)),
        })
    }

    pub fn as_str(&self) -> &'static str {
        use JointMode::*;
        match self {
            PowerOff => "power_off",
            Error => "error",
            Freedrive => "freedrive",
            Calibration => "calibration",
            Stopped => "stopped",
            Running => "running",
            Initializing => "initializing",
            Idle => "idle",
        }
    }

    /// True for the settled servo states a motion command ends in.
    pub fn is_steady(&self) -> bool {
        matches!(self, JointMode::Running | JointMode::Idle)
    }
}

impl FromStr for JointMode {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use JointMode::*;
        Ok(match s {
            "power_off" => PowerOff,
            "error" => Error,
            "freedrive" => Freedrive,
            "calibration" => Calibration,
            "stopped" => Stopped,
            "running" => Running,
            "initializing" => Initializing,
            "idle" => Idle,
            _ => return Err(DecodeError::UnknownMode(-1)),
        })
    }
}

impl std::fmt::Display for JointMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded telemetry snapshot.
///
/// Derives `Serialize` so external record serializers can walk the fields in
/// canonical order; the core itself renders no text. Angles, velocities and
/// pose follow the wire convention: radians and meters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    /// Capture time stamped by the reader; the wire carries only
    /// time-since-boot.
    pub timestamp: DateTime<Utc>,
    /// Tool center point position [x, y, z] in meters.
    pub position: [f64; 3],
    /// Tool center point orientation [rx, ry, rz], rotation vector.
    pub orientation: [f64; 3],
    /// Joint angles in radians.
    pub joint_angles: [f64; JOINTS],
    /// Joint angular velocities in radians per second.
    pub velocities: [f64; JOINTS],
    /// Joint motor currents in amperes.
    pub currents: [f64; JOINTS],
    /// Joint forces (torques) reported by the controller.
    pub forces: [f64; JOINTS],
    /// Joint temperatures in degrees Celsius.
    pub temperatures: [f64; JOINTS],
    pub robot_mode: RobotMode,
    pub joint_modes: [JointMode; JOINTS],
    /// Binary length of the message received.
    pub length: u32,
    /// Seconds since controller boot.
    pub time_since_boot: f64,
}

impl Status {
    /// Precondition gate for motion commands: servo power on and no brake
    /// or stop condition active.
    pub fn safe_for_motion(&self) -> std::result::Result<(), String> {
        if !self.robot_mode.is_powered() {
            return Err(format!("arm is not powered (robot mode: {})", self.robot_mode));
        }
        if self.robot_mode.brakes_engaged() {
            return Err(format!("brakes engaged (robot mode: {})", self.robot_mode));
        }
        Ok(())
    }

    /// True when every joint has settled into a steady servo state.
    pub fn all_joints_steady(&self) -> bool {
        self.joint_modes.iter().all(JointMode::is_steady)
    }

    /// True once every joint reports running, i.e. initialization finished.
    pub fn all_joints_running(&self) -> bool {
        self.joint_modes.iter().all(|m| *m == JointMode::Running)
    }

    /// Largest joint force magnitude in this snapshot.
    pub fn max_joint_force(&self) -> f64 {
        self.forces.iter().fold(0.0_f64, |acc, f| acc.max(f.abs()))
    }
}
