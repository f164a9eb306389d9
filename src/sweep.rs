//! Sweep plan for the preconfigured continuum scan
//!
//! A sweep is a linear sequence of primitive move commands: first to the
//! home pose, then successive joint moves stepping the scan joint across
//! [min, max] while the other joints hold the home pose. The coordinator
//! executes the steps one at a time, each awaited to completion.

use crate::command::CommandKind;
use crate::config::ContinuumConfig;
use crate::status::JOINTS;
use crate::units::{Deg, Quantity, DEG};

/// Joint swept across the scan range, the wrist tilt.
pub const SCAN_JOINT: usize = 3;

/// Angular increment between scan steps, in degrees.
pub const STEP_DEGREES: f64 = 5.0;

/// Ordered primitive commands making up one sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPlan {
    pub steps: Vec<CommandKind>,
}

impl SweepPlan {
    /// Build the plan from the continuum configuration. Bounds are assumed
    /// validated upstream (min <= max).
    pub fn build(config: &ContinuumConfig) -> Self {
        let home = home_pose(config);
        let mut steps = vec![CommandKind::MoveJoints { joints: home }];

        let mut angle = config.scan.min;
        loop {
            let mut joints = home;
            joints[SCAN_JOINT] = angle * DEG;
            steps.push(CommandKind::MoveJoints { joints });
            if angle >= config.scan.max {
                break;
            }
            // Last step lands exactly on max rather than overshooting.
            angle = (angle + STEP_DEGREES).min(config.scan.max);
        }

        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn home_pose(config: &ContinuumConfig) -> [Quantity<Deg>; JOINTS] {
    let mut home = [Quantity::<Deg>::default(); JOINTS];
    for (q, d) in home.iter_mut().zip(&config.home_position) {
        *q = *d * DEG;
    }
    home
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use std::path::PathBuf;

    fn config(min: f64, max: f64) -> ContinuumConfig {
        ContinuumConfig {
            home_position: [0.0, -90.0, 0.0, -45.0, 0.0, 0.0],
            work_directory: PathBuf::from("/tmp"),
            scan: ScanConfig { min, max },
        }
    }

    fn scan_angle(step: &CommandKind) -> f64 {
        match step {
            CommandKind::MoveJoints { joints } => joints[SCAN_JOINT].magnitude(),
            other => panic!("sweep plan must contain only move_joints, got {:?}", other),
        }
    }

    #[test]
    fn first_step_is_home() {
        let cfg = config(-45.0, 15.0);
        let plan = SweepPlan::build(&cfg);
        match &plan.steps[0] {
            CommandKind::MoveJoints { joints } => {
                for (j, d) in joints.iter().zip(&cfg.home_position) {
                    assert_eq!(j.magnitude(), *d);
                }
            }
            other => panic!("expected move_joints home step, got {:?}", other),
        }
    }

    #[test]
    fn steps_are_monotone_and_land_on_max() {
        let plan = SweepPlan::build(&config(-45.0, 15.0));
        let angles: Vec<f64> = plan.steps[1..].iter().map(scan_angle).collect();
        assert_eq!(angles.first().copied(), Some(-45.0));
        assert_eq!(angles.last().copied(), Some(15.0));
        for pair in angles.windows(2) {
            assert!(pair[1] > pair[0]);
            assert!(pair[1] - pair[0] <= STEP_DEGREES + 1e-9);
        }
    }

    #[test]
    fn non_multiple_range_still_ends_exactly_on_max() {
        let plan = SweepPlan::build(&config(0.0, 7.0));
        let angles: Vec<f64> = plan.steps[1..].iter().map(scan_angle).collect();
        assert_eq!(angles, vec![0.0, 5.0, 7.0]);
    }

    #[test]
    fn degenerate_range_is_single_scan_step() {
        let plan = SweepPlan::build(&config(10.0, 10.0));
        // Home plus one step at the single scan angle.
        assert_eq!(plan.len(), 2);
        assert_eq!(scan_angle(&plan.steps[1]), 10.0);
    }

    #[test]
    fn other_joints_hold_home_during_scan() {
        let cfg = config(-10.0, 10.0);
        let plan = SweepPlan::build(&cfg);
        for step in &plan.steps[1..] {
            if let CommandKind::MoveJoints { joints } = step {
                for (i, j) in joints.iter().enumerate() {
                    if i != SCAN_JOINT {
                        assert_eq!(j.magnitude(), cfg.home_position[i]);
                    }
                }
            }
        }
    }
}
