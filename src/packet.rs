//! Telemetry frame codec for the arm's real-time status feed
//!
//! The controller emits fixed-size 812-byte frames with no delimiter: the
//! length is the framing. Every multi-byte field is big-endian. Decoding is
//! pure; the caller stamps the capture time since the wire only carries
//! seconds since controller boot.

use crate::error::DecodeError;
use crate::status::{JointMode, RobotMode, Status, JOINTS};
use chrono::{DateTime, Utc};

/// Protocol-defined frame size in bytes.
pub const FRAME_SIZE: usize = 812;

// Byte offsets into the frame. Fields between the ones we extract (target
// kinematics, tool accelerometer, digital inputs, controller timer) are
// skipped, not reordered.
const OFFSET_LENGTH: usize = 0;
const OFFSET_TIME_SINCE_BOOT: usize = 4;
const OFFSET_JOINT_ANGLES: usize = 252;
const OFFSET_VELOCITIES: usize = 300;
const OFFSET_CURRENTS: usize = 348;
const OFFSET_FORCES: usize = 540;
const OFFSET_TOOL_POSE: usize = 588;
const OFFSET_TEMPERATURES: usize = 692;
const OFFSET_ROBOT_MODE: usize = 756;
const OFFSET_JOINT_MODES: usize = 764;

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_be_bytes(raw)
}

fn read_f64(buf: &[u8], offset: usize) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    f64::from_be_bytes(raw)
}

fn read_f64_array(buf: &[u8], offset: usize) -> [f64; JOINTS] {
    let mut out = [0.0; JOINTS];
    for (i, v) in out.iter_mut().enumerate() {
        *v = read_f64(buf, offset + i * 8);
    }
    out
}

/// Decode one telemetry frame into a [`Status`].
///
/// The buffer must be exactly [`FRAME_SIZE`] bytes and carry a matching
/// on-wire length field; anything else means the stream has lost framing
/// and the error is fatal to the calling read loop. A frame is never
/// partially decoded.
pub fn decode(buf: &[u8], timestamp: DateTime<Utc>) -> Result<Status, DecodeError> {
    if buf.len() != FRAME_SIZE {
        return Err(DecodeError::LengthMismatch {
            expected: FRAME_SIZE,
            actual: buf.len(),
        });
    }

    let length = read_u32(buf, OFFSET_LENGTH);
    if length as usize != FRAME_SIZE {
        return Err(DecodeError::LengthMismatch {
            expected: FRAME_SIZE,
            actual: length as usize,
        });
    }

    let robot_mode = RobotMode::from_wire(read_f64(buf, OFFSET_ROBOT_MODE) as i64)?;

    let mut joint_modes = [JointMode::Idle; JOINTS];
    for (i, mode) in joint_modes.iter_mut().enumerate() {
        *mode = JointMode::from_wire(read_f64(buf, OFFSET_JOINT_MODES + i * 8) as i64)?;
    }

    let pose = read_f64_array(buf, OFFSET_TOOL_POSE);

    Ok(Status {
        timestamp,
        position: [pose[0], pose[1], pose[2]],
        orientation: [pose[3], pose[4], pose[5]],
        joint_angles: read_f64_array(buf, OFFSET_JOINT_ANGLES),
        velocities: read_f64_array(buf, OFFSET_VELOCITIES),
        currents: read_f64_array(buf, OFFSET_CURRENTS),
        forces: read_f64_array(buf, OFFSET_FORCES),
        temperatures: read_f64_array(buf, OFFSET_TEMPERATURES),
        robot_mode,
        joint_modes,
        length,
        time_since_boot: read_f64(buf, OFFSET_TIME_SINCE_BOOT),
    })
}

#[cfg(test)]
pub(crate) mod test_frames {
    //! Synthetic frame builder shared by codec and coordinator tests.

    use super::*;

    pub struct FrameBuilder {
        buf: [u8; FRAME_SIZE],
    }

    impl FrameBuilder {
        pub fn new() -> Self {
            let mut buf = [0u8; FRAME_SIZE];
            buf[OFFSET_LENGTH..OFFSET_LENGTH + 4]
                .copy_from_slice(&(FRAME_SIZE as u32).to_be_bytes());
            let mut b = Self { buf };
            b.set_robot_mode(RobotMode::Running);
            b.set_joint_modes([JointMode::Running; JOINTS]);
            b
        }

        fn put_f64(&mut self, offset: usize, value: f64) {
            self.buf[offset..offset + 8].copy_from_slice(&value.to_be_bytes());
        }

        fn put_array(&mut self, offset: usize, values: [f64; JOINTS]) {
            for (i, v) in values.iter().enumerate() {
                self.put_f64(offset + i * 8, *v);
            }
        }

        pub fn set_wire_length(&mut self, length: u32) -> &mut Self {
            self.buf[OFFSET_LENGTH..OFFSET_LENGTH + 4].copy_from_slice(&length.to_be_bytes());
            self
        }

        pub fn set_time_since_boot(&mut self, t: f64) -> &mut Self {
            self.put_f64(OFFSET_TIME_SINCE_BOOT, t);
            self
        }

        pub fn set_joint_angles(&mut self, angles: [f64; JOINTS]) -> &mut Self {
            self.put_array(OFFSET_JOINT_ANGLES, angles);
            self
        }

        pub fn set_velocities(&mut self, v: [f64; JOINTS]) -> &mut Self {
            self.put_array(OFFSET_VELOCITIES, v);
            self
        }

        pub fn set_forces(&mut self, forces: [f64; JOINTS]) -> &mut Self {
            self.put_array(OFFSET_FORCES, forces);
            self
        }

        pub fn set_tool_pose(&mut self, pose: [f64; JOINTS]) -> &mut Self {
            self.put_array(OFFSET_TOOL_POSE, pose);
            self
        }

        pub fn set_temperatures(&mut self, t: [f64; JOINTS]) -> &mut Self {
            self.put_array(OFFSET_TEMPERATURES, t);
            self
        }

        pub fn set_robot_mode(&mut self, mode: RobotMode) -> &mut Self {
            self.put_f64(OFFSET_ROBOT_MODE, mode as i64 as f64);
            self
        }

        pub fn set_raw_robot_mode(&mut self, raw: f64) -> &mut Self {
            self.put_f64(OFFSET_ROBOT_MODE, raw);
            self
        }

        pub fn set_joint_modes(&mut self, modes: [JointMode; JOINTS]) -> &mut Self {
            for (i, m) in modes.iter().enumerate() {
                self.put_f64(OFFSET_JOINT_MODES + i * 8, *m as i64 as f64);
            }
            self
        }

        pub fn set_raw_joint_mode(&mut self, joint: usize, raw: f64) -> &mut Self {
            self.put_f64(OFFSET_JOINT_MODES + joint * 8, raw);
            self
        }

        pub fn build(&self) -> [u8; FRAME_SIZE] {
            self.buf
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_frames::FrameBuilder;
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn decodes_well_formed_frame() {
        let angles = [0.1, -0.2, 0.3, -0.4, 0.5, -0.6];
        let pose = [0.25, -0.5, 0.75, 0.01, 0.02, 0.03];
        let frame = FrameBuilder::new()
            .set_time_since_boot(1234.5)
            .set_joint_angles(angles)
            .set_velocities([0.0; 6])
            .set_forces([1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .set_tool_pose(pose)
            .set_temperatures([30.0; 6])
            .set_robot_mode(RobotMode::Running)
            .set_joint_modes([JointMode::Idle; 6])
            .build();

        let status = decode(&frame, now()).unwrap();
        assert_eq!(status.joint_angles, angles);
        assert_eq!(status.position, [0.25, -0.5, 0.75]);
        assert_eq!(status.orientation, [0.01, 0.02, 0.03]);
        assert_eq!(status.forces[5], 6.0);
        assert_eq!(status.robot_mode, RobotMode::Running);
        assert_eq!(status.joint_modes, [JointMode::Idle; 6]);
        assert_eq!(status.length, FRAME_SIZE as u32);
        assert_eq!(status.time_since_boot, 1234.5);
    }

    #[test]
    fn decode_is_deterministic() {
        let frame = FrameBuilder::new()
            .set_joint_angles([0.5; 6])
            .set_robot_mode(RobotMode::Ready)
            .build();
        let t = now();
        let a = decode(&frame, t).unwrap();
        let b = decode(&frame, t).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn short_buffer_is_length_mismatch() {
        let frame = FrameBuilder::new().build();
        let err = decode(&frame[..100], now()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::LengthMismatch {
                expected: FRAME_SIZE,
                actual: 100
            }
        );
    }

    #[test]
    fn long_buffer_is_length_mismatch() {
        let mut long = FrameBuilder::new().build().to_vec();
        long.push(0);
        let err = decode(&long, now()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::LengthMismatch {
                expected: FRAME_SIZE,
                actual: FRAME_SIZE + 1
            }
        );
    }

    #[test]
    fn bad_wire_length_field_is_length_mismatch() {
        let frame = FrameBuilder::new().set_wire_length(760).build();
        let err = decode(&frame, now()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::LengthMismatch {
                expected: FRAME_SIZE,
                actual: 760
            }
        );
    }

    #[test]
    fn unknown_robot_mode_is_rejected() {
        let frame = FrameBuilder::new().set_raw_robot_mode(99.0).build();
        assert_eq!(decode(&frame, now()).unwrap_err(), DecodeError::UnknownMode(99));
    }

    #[test]
    fn unknown_joint_mode_is_rejected() {
        let frame = FrameBuilder::new().set_raw_joint_mode(2, 17.0).build();
        assert_eq!(decode(&frame, now()).unwrap_err(), DecodeError::UnknownMode(17));
    }
}
