//! Typed command family sent to the arm controller
//!
//! Every command shares an envelope (origin id, per-origin sequence number,
//! name derived from the variant) over a variant-specific payload with
//! unit-tagged fields. Commands are immutable once built; the sequence
//! number is assigned at enqueue time by the coordinator, never by callers.
//!
//! The wire form is one newline-terminated, comma-separated line per
//! command, fields in canonical order, keyed by the command name. Angles go
//! out in degrees.

use crate::error::CommandError;
use crate::status::JOINTS;
use crate::units::{Deg, Meters, Quantity, DEG, METERS};
use serde::Serialize;

/// Variant payloads of the closed command set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum CommandKind {
    MoveCam {
        pan: Quantity<Deg>,
        tilt: Quantity<Deg>,
        height: Quantity<Meters>,
    },
    MoveEffector {
        offset: [f64; 3],
        pan: Quantity<Deg>,
        tilt: Quantity<Deg>,
        roll: Quantity<Deg>,
    },
    MoveJoints {
        joints: [Quantity<Deg>; JOINTS],
    },
    JointMove {
        joint_id: usize,
        forward: bool,
    },
    AutoInit,
    AutoInitForce {
        force: f64,
    },
    Power {
        is_on: bool,
    },
    Brakes {
        enable: bool,
    },
    SetPosition {
        position: [f64; 3],
    },
    SetHome,
    SweepCam {
        use_world_frame: bool,
        file_tag: String,
    },
}

impl CommandKind {
    /// Wire name, also the tag of the serialized line.
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::MoveCam { .. } => "move_cam",
            CommandKind::MoveEffector { .. } => "move_effector",
            CommandKind::MoveJoints { .. } => "move_joints",
            CommandKind::JointMove { .. } => "joint_move",
            CommandKind::AutoInit => "auto_init",
            CommandKind::AutoInitForce { .. } => "auto_init_force",
            CommandKind::Power { .. } => "power",
            CommandKind::Brakes { .. } => "brakes",
            CommandKind::SetPosition { .. } => "set_position",
            CommandKind::SetHome => "set_home",
            CommandKind::SweepCam { .. } => "sweep_cam",
        }
    }

    /// Whether the command drives the arm and must pass the safety gate.
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            CommandKind::MoveCam { .. }
                | CommandKind::MoveEffector { .. }
                | CommandKind::MoveJoints { .. }
                | CommandKind::JointMove { .. }
                | CommandKind::SetPosition { .. }
                | CommandKind::SweepCam { .. }
        )
    }

    /// Parse the payload side of a wire line, `<name>[,fields…]`, as read
    /// from the daemon's stdin command stream. Origin and sequence number
    /// are not part of caller input.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let mut fields = line.split(',').map(str::trim);
        let name = fields
            .next()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| CommandError::Malformed("empty command line".to_string()))?;
        let rest: Vec<&str> = fields.collect();

        let expect = |n: usize| -> Result<(), CommandError> {
            if rest.len() == n {
                Ok(())
            } else {
                Err(CommandError::Malformed(format!(
                    "{}: expected {} fields, got {}",
                    name,
                    n,
                    rest.len()
                )))
            }
        };
        let num = |s: &str| -> Result<f64, CommandError> {
            s.parse::<f64>()
                .map_err(|_| CommandError::Malformed(format!("{}: bad number '{}'", name, s)))
        };
        let flag = |s: &str| -> Result<bool, CommandError> {
            match s {
                "1" | "true" => Ok(true),
                "0" | "false" => Ok(false),
                other => Err(CommandError::Malformed(format!(
                    "{}: bad flag '{}'",
                    name, other
                ))),
            }
        };

        match name {
            "move_cam" => {
                expect(3)?;
                Ok(CommandKind::MoveCam {
                    pan: num(rest[0])? * DEG,
                    tilt: num(rest[1])? * DEG,
                    height: num(rest[2])? * METERS,
                })
            }
            "move_effector" => {
                expect(6)?;
                Ok(CommandKind::MoveEffector {
                    offset: [num(rest[0])?, num(rest[1])?, num(rest[2])?],
                    pan: num(rest[3])? * DEG,
                    tilt: num(rest[4])? * DEG,
                    roll: num(rest[5])? * DEG,
                })
            }
            "move_joints" => {
                expect(JOINTS)?;
                let mut joints = [Quantity::<Deg>::default(); JOINTS];
                for (j, s) in joints.iter_mut().zip(rest.iter().copied()) {
                    *j = num(s)? * DEG;
                }
                Ok(CommandKind::MoveJoints { joints })
            }
            "joint_move" => {
                expect(2)?;
                let joint_id = rest[0].parse::<usize>().map_err(|_| {
                    CommandError::Malformed(format!("joint_move: bad joint id '{}'", rest[0]))
                })?;
                Ok(CommandKind::JointMove {
                    joint_id,
                    forward: flag(rest[1])?,
                })
            }
            "auto_init" => {
                expect(0)?;
                Ok(CommandKind::AutoInit)
            }
            "auto_init_force" => {
                expect(1)?;
                Ok(CommandKind::AutoInitForce { force: num(rest[0])? })
            }
            "power" => {
                expect(1)?;
                Ok(CommandKind::Power { is_on: flag(rest[0])? })
            }
            "brakes" => {
                expect(1)?;
                Ok(CommandKind::Brakes { enable: flag(rest[0])? })
            }
            "set_position" => {
                expect(3)?;
                Ok(CommandKind::SetPosition {
                    position: [num(rest[0])?, num(rest[1])?, num(rest[2])?],
                })
            }
            "set_home" => {
                expect(0)?;
                Ok(CommandKind::SetHome)
            }
            "sweep_cam" => {
                expect(2)?;
                Ok(CommandKind::SweepCam {
                    use_world_frame: flag(rest[0])?,
                    file_tag: rest[1].to_string(),
                })
            }
            other => Err(CommandError::Malformed(format!("unknown command '{}'", other))),
        }
    }
}

/// A command with its envelope, ready for the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub origin_id: u32,
    pub sequence_number: u64,
    #[serde(flatten)]
    pub kind: CommandKind,
}

impl Command {
    /// Build a command, validating variant payloads. `joint_move` with a
    /// joint id outside 0..=5 is rejected; six-angle payloads are enforced
    /// by the array types themselves.
    pub fn new(kind: CommandKind, origin_id: u32, sequence_number: u64) -> Result<Self, CommandError> {
        if let CommandKind::JointMove { joint_id, .. } = kind {
            if joint_id >= JOINTS {
                return Err(CommandError::InvalidJoint(joint_id));
            }
        }
        Ok(Self {
            origin_id,
            sequence_number,
            kind,
        })
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Deterministic wire form: `<name>,<origin_id>,<sequence_number>[,fields…]\n`.
    pub fn serialize(&self) -> String {
        let mut line = format!("{},{},{}", self.name(), self.origin_id, self.sequence_number);
        let push_num = |line: &mut String, v: f64| {
            line.push_str(&format!(",{:.6}", v));
        };
        match &self.kind {
            CommandKind::MoveCam { pan, tilt, height } => {
                push_num(&mut line, pan.magnitude());
                push_num(&mut line, tilt.magnitude());
                push_num(&mut line, height.magnitude());
            }
            CommandKind::MoveEffector { offset, pan, tilt, roll } => {
                for v in offset {
                    push_num(&mut line, *v);
                }
                push_num(&mut line, pan.magnitude());
                push_num(&mut line, tilt.magnitude());
                push_num(&mut line, roll.magnitude());
            }
            CommandKind::MoveJoints { joints } => {
                for j in joints {
                    push_num(&mut line, j.magnitude());
                }
            }
            CommandKind::JointMove { joint_id, forward } => {
                line.push_str(&format!(",{},{}", joint_id, u8::from(*forward)));
            }
            CommandKind::AutoInit | CommandKind::SetHome => {}
            CommandKind::AutoInitForce { force } => {
                push_num(&mut line, *force);
            }
            CommandKind::Power { is_on } => {
                line.push_str(&format!(",{}", u8::from(*is_on)));
            }
            CommandKind::Brakes { enable } => {
                line.push_str(&format!(",{}", u8::from(*enable)));
            }
            CommandKind::SetPosition { position } => {
                for v in position {
                    push_num(&mut line, *v);
                }
            }
            CommandKind::SweepCam { use_world_frame, file_tag } => {
                line.push_str(&format!(",{},{}", u8::from(*use_world_frame), file_tag));
            }
        }
        line.push('\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_move_cam() {
        let cmd = Command::new(
            CommandKind::MoveCam {
                pan: 10.0 * DEG,
                tilt: -20.5 * DEG,
                height: 0.4 * METERS,
            },
            1,
            7,
        )
        .unwrap();
        assert_eq!(
            cmd.serialize(),
            "move_cam,1,7,10.000000,-20.500000,0.400000\n"
        );
    }

    #[test]
    fn serializes_move_joints_with_six_angles() {
        let joints = [
            0.0 * DEG,
            -45.0 * DEG,
            90.0 * DEG,
            15.0 * DEG,
            -15.0 * DEG,
            180.0 * DEG,
        ];
        let cmd = Command::new(CommandKind::MoveJoints { joints }, 2, 1).unwrap();
        assert_eq!(
            cmd.serialize(),
            "move_joints,2,1,0.000000,-45.000000,90.000000,15.000000,-15.000000,180.000000\n"
        );
    }

    #[test]
    fn serializes_envelope_only_commands() {
        let cmd = Command::new(CommandKind::SetHome, 3, 42).unwrap();
        assert_eq!(cmd.serialize(), "set_home,3,42\n");
        let cmd = Command::new(CommandKind::AutoInit, 3, 43).unwrap();
        assert_eq!(cmd.serialize(), "auto_init,3,43\n");
    }

    #[test]
    fn serializes_flags_and_tags() {
        let cmd = Command::new(CommandKind::Power { is_on: true }, 1, 1).unwrap();
        assert_eq!(cmd.serialize(), "power,1,1,1\n");
        let cmd = Command::new(
            CommandKind::SweepCam {
                use_world_frame: false,
                file_tag: "scan-03".to_string(),
            },
            1,
            2,
        )
        .unwrap();
        assert_eq!(cmd.serialize(), "sweep_cam,1,2,0,scan-03\n");
    }

    #[test]
    fn rejects_out_of_range_joint() {
        let err = Command::new(
            CommandKind::JointMove {
                joint_id: 6,
                forward: true,
            },
            1,
            1,
        )
        .unwrap_err();
        assert_eq!(err, CommandError::InvalidJoint(6));
    }

    #[test]
    fn parse_agrees_with_serialize() {
        let cases = [
            "move_cam,10.000000,-20.500000,0.400000",
            "move_effector,0.100000,0.200000,0.300000,5.000000,-5.000000,90.000000",
            "move_joints,0.000000,-45.000000,90.000000,15.000000,-15.000000,180.000000",
            "joint_move,4,1",
            "auto_init",
            "auto_init_force,50.000000",
            "power,0",
            "brakes,1",
            "set_position,0.100000,0.200000,0.300000",
            "set_home",
            "sweep_cam,1,scan-03",
        ];
        for case in cases {
            let kind = CommandKind::parse(case).unwrap();
            let cmd = Command::new(kind, 9, 99).unwrap();
            let line = cmd.serialize();
            // Strip name/envelope and reparse; the payload must survive.
            let payload = line.trim_end().splitn(4, ',').nth(3).unwrap_or("");
            let round = if payload.is_empty() {
                cmd.name().to_string()
            } else {
                format!("{},{}", cmd.name(), payload)
            };
            assert_eq!(CommandKind::parse(&round).unwrap(), cmd.kind, "case {}", case);
        }
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!(matches!(
            CommandKind::parse("move_joints,1,2,3"),
            Err(CommandError::Malformed(_))
        ));
        assert!(matches!(
            CommandKind::parse("warp,1"),
            Err(CommandError::Malformed(_))
        ));
        assert!(matches!(
            CommandKind::parse("power,maybe"),
            Err(CommandError::Malformed(_))
        ));
        assert!(matches!(
            CommandKind::parse(""),
            Err(CommandError::Malformed(_))
        ));
    }

    #[test]
    fn motion_classification() {
        assert!(CommandKind::parse("move_joints,0,0,0,0,0,0").unwrap().is_motion());
        assert!(!CommandKind::AutoInit.is_motion());
        assert!(!CommandKind::Power { is_on: true }.is_motion());
        assert!(CommandKind::SweepCam {
            use_world_frame: true,
            file_tag: "t".into()
        }
        .is_motion());
    }
}
