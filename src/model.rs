// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Geometry of the 3-point marker.
//!
//! Nomenclature follows
//! "Iterative Pose Estimation Using Coplanar Feature Points",
//! Oberkampf, D., DeMenthon, D. F. and Davis, L. S.:
//! model point 0 is the reference point at the origin of the model frame,
//! $\bm{M_{01}}$ and $\bm{M_{02}}$ point from it to the two other points.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Mat2, Vec2, Vec3};

/// Errors raised when a marker configuration cannot be turned into a model.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ModelError {
    /// A dimension of the configuration is NaN or infinite.
    #[error("model dimensions must be finite")]
    NonFinite,
    /// The three model points do not span a plane.
    #[error("model points are collinear and do not span a plane")]
    Collinear,
}

/// Supported physical markers, with their defining dimensions.
///
/// All dimensions are given in the same (arbitrary) unit,
/// which is the unit of the translation reported by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelConfig {
    /// Clip worn on the side of the head.
    /// The reference point sits between a top and a bottom point.
    Clip {
        /// Height of the top point above the reference point.
        top_y: f64,
        /// Depth of the top point behind the reference point.
        top_z: f64,
        /// Height of the bottom point below the reference point.
        bottom_y: f64,
        /// Depth of the bottom point behind the reference point.
        bottom_z: f64,
    },
    /// Cap with the reference point on top and two symmetric side points.
    Cap {
        /// Half distance between the two side points.
        x: f64,
        /// Height of the side points below the reference point.
        y: f64,
        /// Depth of the side points behind the reference point.
        z: f64,
    },
    /// Any triangle, given by the two displacement vectors.
    Custom {
        /// Displacement from the reference point to model point 1.
        m01: [f64; 3],
        /// Displacement from the reference point to model point 2.
        m02: [f64; 3],
    },
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::Clip {
            top_y: 40.0,
            top_z: 30.0,
            bottom_y: 70.0,
            bottom_z: 80.0,
        }
    }
}

impl ModelConfig {
    /// Default cap dimensions.
    pub fn default_cap() -> Self {
        Self::Cap {
            x: 40.0,
            y: 60.0,
            z: 100.0,
        }
    }

    fn displacements(&self) -> (Vec3, Vec3) {
        match *self {
            Self::Clip {
                top_y,
                top_z,
                bottom_y,
                bottom_z,
            } => (
                Vec3::new(0.0, top_y, -top_z),
                Vec3::new(0.0, -bottom_y, -bottom_z),
            ),
            Self::Cap { x, y, z } => (Vec3::new(-x, -y, -z), Vec3::new(x, -y, -z)),
            Self::Custom { m01, m02 } => (Vec3::from(m01), Vec3::from(m02)),
        }
    }
}

/// Marker geometry together with the quantities POSIT needs every frame.
///
/// Built once per configuration and then only read,
/// so a single model can be shared by several trackers.
#[derive(Debug, Clone, PartialEq)]
pub struct PointModel {
    m01: Vec3,
    m02: Vec3,
    u: Vec3,
    p: Mat2,
}

impl PointModel {
    /// Number of points of the marker.
    pub const N_POINTS: usize = 3;

    /// Build the model of the given marker configuration.
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let (m01, m02) = config.displacements();
        if !(m01.iter().all(|c| c.is_finite()) && m02.iter().all(|c| c.is_finite())) {
            return Err(ModelError::NonFinite);
        }

        let cross = m01.cross(&m02);
        let cross_norm = cross.norm();
        if !(cross_norm > 1e-9 * m01.norm() * m02.norm()) {
            return Err(ModelError::Collinear);
        }

        // Inverse of the Gram matrix of (M01, M02).
        // Its determinant is the squared norm of the cross product.
        let s11 = m01.dot(&m01);
        let s12 = m01.dot(&m02);
        let s22 = m02.dot(&m02);
        let p = Mat2::new(s22, -s12, -s12, s11) / (cross_norm * cross_norm);

        Ok(Self {
            m01,
            m02,
            u: cross / cross_norm,
            p,
        })
    }

    /// Replace the geometry with the one of a new configuration.
    /// On error the current geometry is kept.
    pub fn set_model(&mut self, config: &ModelConfig) -> Result<(), ModelError> {
        *self = Self::new(config)?;
        Ok(())
    }

    /// Displacement from the reference point to model point 1.
    pub fn m01(&self) -> &Vec3 {
        &self.m01
    }

    /// Displacement from the reference point to model point 2.
    pub fn m02(&self) -> &Vec3 {
        &self.m02
    }

    /// Unit normal of the marker plane, $\bm{M_{01}} \times \bm{M_{02}}$ normalized.
    pub fn normal(&self) -> &Vec3 {
        &self.u
    }

    /// Inverse Gram matrix of $(\bm{M_{01}}, \bm{M_{02}})$.
    ///
    /// Multiplying it with the scalar products $(\bm{v} \cdot \bm{M_{01}}, \bm{v} \cdot \bm{M_{02}})$
    /// gives the coordinates, in the $(\bm{M_{01}}, \bm{M_{02}})$ basis,
    /// of the projection of $\bm{v}$ onto the marker plane.
    pub fn basis(&self) -> &Mat2 {
        &self.p
    }

    /// The three model points, reference point first.
    pub fn points(&self) -> [Vec3; Self::N_POINTS] {
        [Vec3::zeros(), self.m01, self.m02]
    }

    /// Vector in the image plane along which the marker is most easily told apart,
    /// $\bm{M_{01}} - \bm{M_{02}}$ dropped onto the xy plane.
    pub fn direction(&self) -> Vec2 {
        (self.m01 - self.m02).xy()
    }

    /// Point position in the model plane used for ordering, see [`Self::direction`].
    pub(crate) fn planar_points(&self) -> [Vec2; Self::N_POINTS] {
        [Vec2::zeros(), self.m01.xy(), self.m02.xy()]
    }

    /// Coordinates in the $(\bm{M_{01}}, \bm{M_{02}})$ basis turned back into a model vector.
    pub(crate) fn in_plane(&self, coeffs: &Vec2) -> Vec3 {
        coeffs.x * self.m01 + coeffs.y * self.m02
    }

    /// Indices of `points` sorted by increasing scalar product with `direction`.
    /// Equal products keep their index order.
    pub fn order_by_direction(
        points: &[Vec2; Self::N_POINTS],
        direction: &Vec2,
    ) -> [usize; Self::N_POINTS] {
        let mut order = [0, 1, 2];
        order.sort_by(|&a, &b| {
            direction
                .dot(&points[a])
                .total_cmp(&direction.dot(&points[b]))
        });
        order
    }
}

// Tests #######################################################################

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn custom(m01: [f64; 3], m02: [f64; 3]) -> ModelConfig {
        ModelConfig::Custom { m01, m02 }
    }

    #[test]
    fn normal_is_unit_and_orthogonal() {
        for config in [
            ModelConfig::default(),
            ModelConfig::default_cap(),
            custom([-40.0, -30.0, 5.0], [35.0, -25.0, -10.0]),
        ] {
            let model = PointModel::new(&config).unwrap();
            assert_relative_eq!(model.normal().norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(model.normal().dot(model.m01()), 0.0, epsilon = 1e-9);
            assert_relative_eq!(model.normal().dot(model.m02()), 0.0, epsilon = 1e-9);
            assert!(model.normal().dot(&model.m01().cross(model.m02())) > 0.0);
        }
    }

    #[test]
    fn basis_recovers_plane_coordinates() {
        let model = PointModel::new(&ModelConfig::default_cap()).unwrap();
        let v = 0.3 * *model.m01() - 1.7 * *model.m02();
        let products = Vec2::new(v.dot(model.m01()), v.dot(model.m02()));
        let coeffs = model.basis() * products;
        assert_relative_eq!(coeffs, Vec2::new(0.3, -1.7), epsilon = 1e-12);
        assert_relative_eq!(model.in_plane(&coeffs), v, epsilon = 1e-9);
    }

    #[test]
    fn clip_and_cap_layouts() {
        let clip = PointModel::new(&ModelConfig::default()).unwrap();
        assert_eq!(*clip.m01(), Vec3::new(0.0, 40.0, -30.0));
        assert_eq!(*clip.m02(), Vec3::new(0.0, -70.0, -80.0));

        let cap = PointModel::new(&ModelConfig::default_cap()).unwrap();
        assert_eq!(*cap.m01(), Vec3::new(-40.0, -60.0, -100.0));
        assert_eq!(*cap.m02(), Vec3::new(40.0, -60.0, -100.0));
        assert_eq!(cap.direction(), Vec2::new(-80.0, 0.0));
    }

    #[test]
    fn collinear_points_are_rejected() {
        let config = custom([10.0, 20.0, 30.0], [-5.0, -10.0, -15.0]);
        assert_eq!(PointModel::new(&config), Err(ModelError::Collinear));

        let config = custom([0.0, 0.0, 0.0], [10.0, 0.0, 0.0]);
        assert_eq!(PointModel::new(&config), Err(ModelError::Collinear));

        let config = ModelConfig::Cap {
            x: 0.0,
            y: 10.0,
            z: 10.0,
        };
        assert_eq!(PointModel::new(&config), Err(ModelError::Collinear));
    }

    #[test]
    fn non_finite_dimensions_are_rejected() {
        let config = custom([f64::NAN, 0.0, 0.0], [0.0, 10.0, 0.0]);
        assert_eq!(PointModel::new(&config), Err(ModelError::NonFinite));
    }

    #[test]
    fn failed_reconfiguration_keeps_model() {
        let mut model = PointModel::new(&ModelConfig::default()).unwrap();
        let before = model.clone();
        let err = model.set_model(&custom([1.0, 1.0, 1.0], [2.0, 2.0, 2.0]));
        assert_eq!(err, Err(ModelError::Collinear));
        assert_eq!(model, before);

        model.set_model(&ModelConfig::default_cap()).unwrap();
        assert_eq!(*model.m01(), Vec3::new(-40.0, -60.0, -100.0));
    }

    #[test]
    fn order_by_direction_sorts_by_projection() {
        let points = [
            Vec2::new(0.0, 0.0),
            Vec2::new(-0.1, 0.3),
            Vec2::new(0.2, -0.4),
        ];
        assert_eq!(
            PointModel::order_by_direction(&points, &Vec2::new(1.0, 0.0)),
            [1, 0, 2]
        );
        assert_eq!(
            PointModel::order_by_direction(&points, &Vec2::new(0.0, 1.0)),
            [2, 0, 1]
        );
        assert_eq!(
            PointModel::order_by_direction(&points, &Vec2::zeros()),
            [0, 1, 2]
        );
    }

    #[test]
    fn deserialize_from_json() {
        let config: ModelConfig =
            serde_json::from_str(r#"{ "kind": "cap", "x": 40.0, "y": 60.0, "z": 100.0 }"#)
                .unwrap();
        assert_eq!(config, ModelConfig::default_cap());

        let config: ModelConfig = serde_json::from_str(
            r#"{ "kind": "custom", "m01": [0.0, 40.0, -30.0], "m02": [0.0, -70.0, -80.0] }"#,
        )
        .unwrap();
        let custom = PointModel::new(&config).unwrap();
        let clip = PointModel::new(&ModelConfig::default()).unwrap();
        assert_eq!(custom, clip);
    }
}
