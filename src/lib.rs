#![warn(missing_docs)]

//! This package tracks the pose of a rigid marker made of three points
//! (a clip or a cap worn on the head, or any custom triangle)
//! from the unlabeled 2D positions of those points in successive camera frames.
//!
//! Three coplanar points always admit two valid poses, mirrored about the line of sight.
//! The [`tracker::Tracker`] solves for both with the coplanar variant of POSIT
//! and keeps the one closest to its continuity prior:
//!
//!  - Iterative Pose Estimation Using Coplanar Feature Points.
//!    Denis Oberkampf, Daniel F. DeMenthon, Larry S. Davis. CVIU 1996.
//!
//! Detected points carry no identity, so the tracker also decides which point is which,
//! from the marker geometry when tracking (re)starts and from the previous frame afterwards.
//!
//! ```
//! use std::time::Duration;
//! use point_tracker::{CameraInfo, ModelConfig, PointModel, Tracker, Vec2};
//!
//! let model = PointModel::new(&ModelConfig::default()).unwrap();
//! let camera = CameraInfo::default();
//! let mut tracker = Tracker::new();
//!
//! let points = [
//!     Vec2::new(0.01, 0.02),
//!     Vec2::new(0.02, 0.07),
//!     Vec2::new(0.0, -0.06),
//! ];
//! tracker.track(&points, &model, &camera, Duration::from_millis(250));
//! let _pose = tracker.pose();
//! ```

use nalgebra::{Isometry3, Matrix2, Matrix3, Vector2, Vector3};

pub mod camera;
pub mod model;
pub mod tracker;

pub use camera::CameraInfo;
pub use model::{ModelConfig, ModelError, PointModel};
pub use tracker::{project, Tracker};

/// 2D point in normalized image coordinates.
pub type Vec2 = Vector2<f64>;
/// 3D vector, in model or camera coordinates.
pub type Vec3 = Vector3<f64>;
/// 2x2 matrix.
pub type Mat2 = Matrix2<f64>;
/// 3x3 matrix.
pub type Mat3 = Matrix3<f64>;
/// Rigid transform from model coordinates to camera coordinates.
pub type Iso3 = Isometry3<f64>;
