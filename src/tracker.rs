// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Frame to frame tracking of the 3-point marker.
//!
//! Every call to [`Tracker::track`] labels the detected points,
//! solves for the pose with [`posit::solve`] and commits it.
//! Labels come from the marker geometry while in the initial phase
//! (first frame, after [`Tracker::reset_state`], or when the last successful frame is too old),
//! and from the positions of the previous frame afterwards.

use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use nalgebra::Point3;

use crate::camera::CameraInfo;
use crate::model::PointModel;
use crate::{Iso3, Vec2, Vec3};

pub mod correspondence;
pub mod posit;

use posit::PointOrder;

/// Stateful pose tracker, one per video stream.
#[derive(Debug, Clone)]
pub struct Tracker {
    /// Transform from model to camera.
    pose: Iso3,
    /// Continuity prior used to pick between the two coplanar solutions.
    expected: Iso3,
    /// Points of the last successful frame, in model order.
    prev_positions: Option<PointOrder>,
    last_success: Option<Instant>,
    init_phase: bool,
    last_iterations: Option<usize>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracker {
    /// Tracker in its initial phase, with identity pose and prior.
    pub fn new() -> Self {
        Self {
            pose: Iso3::identity(),
            expected: Iso3::identity(),
            prev_positions: None,
            last_success: None,
            init_phase: true,
            last_iterations: None,
        }
    }

    /// Update the pose from the three detected points of a new frame.
    ///
    /// `points` are in normalized image coordinates:
    /// centered, divided by the image width, with y pointing up.
    /// If no frame was successfully tracked within `init_timeout`
    /// (always, for a zero timeout), points are labeled from the marker geometry only.
    ///
    /// A frame whose points do not yield a finite pose is dropped,
    /// and the tracker goes back to its initial phase.
    pub fn track(
        &mut self,
        points: &[Vec2; PointModel::N_POINTS],
        model: &PointModel,
        camera: &CameraInfo,
        init_timeout: Duration,
    ) {
        let focal_length = camera.focal_length();
        let timed_out = init_timeout.is_zero()
            || self
                .last_success
                .map_or(true, |t| t.elapsed() > init_timeout);

        let order = match self.prev_positions {
            Some(ref previous) if !self.init_phase && !timed_out => {
                correspondence::by_continuity(points, previous)
            }
            _ => {
                if !self.init_phase {
                    debug!("tracking timed out, labeling points from the marker geometry");
                }
                self.init_phase = true;
                correspondence::by_geometry(points, model)
            }
        };

        let solution = posit::solve(
            model,
            &order,
            focal_length,
            &self.expected.rotation,
            self.pose.translation.z,
        );
        match solution {
            Some(solution) => {
                if solution.converged {
                    trace!("posit converged in {} iterations", solution.iterations);
                } else {
                    debug!("posit did not converge in {} iterations", solution.iterations);
                }
                self.pose = solution.pose;
                self.expected = solution.pose;
                self.prev_positions = Some(order);
                self.last_success = Some(Instant::now());
                self.init_phase = false;
                self.last_iterations = Some(solution.iterations);
            }
            None => {
                warn!("no finite pose for points {:?}, resetting tracker", points);
                self.reset_state();
            }
        }
    }

    /// Current transform from model to camera coordinates.
    pub fn pose(&self) -> Iso3 {
        self.pose
    }

    /// Prior used to disambiguate the next frame.
    pub fn expected_pose(&self) -> Iso3 {
        self.expected
    }

    /// Replace the prior used to disambiguate the next frame,
    /// for instance with the output of a motion model.
    pub fn set_expected_pose(&mut self, pose: Iso3) {
        self.expected = pose;
    }

    /// Whether the next frame will be labeled from the marker geometry
    /// regardless of the timeout.
    pub fn is_init_phase(&self) -> bool {
        self.init_phase
    }

    /// Number of POSIT iterations of the last successful frame.
    pub fn last_iterations(&self) -> Option<usize> {
        self.last_iterations
    }

    /// Image of a model point under the current pose.
    pub fn project(&self, point: &Vec3, focal_length: f64) -> Vec2 {
        project(point, focal_length, &self.pose)
    }

    /// Forget previous positions and go back to the initial phase.
    /// To be called when the marker is lost, e.g. fewer than three points were detected.
    pub fn reset_state(&mut self) {
        self.init_phase = true;
        self.expected = Iso3::identity();
        self.prev_positions = None;
    }
}

/// Pinhole projection of a model point seen with `pose`,
/// in the normalized image coordinates expected by [`Tracker::track`].
pub fn project(point: &Vec3, focal_length: f64, pose: &Iso3) -> Vec2 {
    let v = pose * Point3::from(*point);
    Vec2::new(focal_length * v.x / v.z, focal_length * v.y / v.z)
}

// Tests #######################################################################
