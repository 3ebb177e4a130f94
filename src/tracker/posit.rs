// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! POSIT for coplanar points, as presented in
//! "Iterative Pose Estimation Using Coplanar Feature Points",
//! Oberkampf, D., DeMenthon, D. F. and Davis, L. S. CVIU 1996.
//! Notations follow the paper.
//!
//! With a pose $(\bm{R}, \bm{t})$ of rows $\bm{i}, \bm{j}, \bm{k}$
//! and $Z_0$ the depth of the reference point,
//! the image $\bm{p_n}$ of model point $n$ seen with focal length $f$ verifies
//! $$
//! \bm{I} \cdot \bm{M_{0n}} = x_n (1 + \varepsilon_n) - x_0,\quad
//! \bm{J} \cdot \bm{M_{0n}} = y_n (1 + \varepsilon_n) - y_0,\quad
//! \varepsilon_n = \frac{\bm{k} \cdot \bm{M_{0n}}}{Z_0}
//! $$
//! where $\bm{I} = \frac{f}{Z_0} \bm{i}$ and $\bm{J} = \frac{f}{Z_0} \bm{j}$.
//! Fixing the $\varepsilon_n$ makes this linear in $\bm{I}$ and $\bm{J}$,
//! up to their component along the plane normal $\bm{u}$,
//! which has two opposite solutions.

use log::trace;
use nalgebra::{Rotation3, Translation3, UnitQuaternion};

use crate::model::PointModel;
use crate::{Iso3, Mat3, Vec2, Vec3};

/// Iteration cap of [`solve`].
pub const MAX_ITERATIONS: usize = 100;

/// Convergence threshold on the change of rotation between two iterations,
/// measured as $2 (1 - \cos \theta)$ (about $\theta = 10^{-7}$ rad).
pub const TOLERANCE: f64 = 1e-14;

/// Depth assumed when no previous estimate is available.
pub const DEFAULT_DEPTH: f64 = 1000.0;

const MIN_DEPTH: f64 = 1e-4;

/// Image points sorted in model order.
pub type PointOrder = [Vec2; PointModel::N_POINTS];

/// Pose found by [`solve`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Solution {
    /// Transform from model to camera coordinates.
    pub pose: Iso3,
    /// Number of iterations performed.
    pub iterations: usize,
    /// False when [`MAX_ITERATIONS`] was reached before convergence.
    pub converged: bool,
}

/// Estimate the pose of `model` from its image points `order`, given in model order.
///
/// Of the two poses compatible with three coplanar points,
/// the one with the rotation closest to `prior` is kept at every iteration.
/// `depth` seeds the distance of the reference point;
/// values below `1e-4` fall back to [`DEFAULT_DEPTH`].
///
/// Iterations stop once the rotation no longer changes, see [`TOLERANCE`].
/// Not converging is not an error, the last estimate is returned with `converged` unset.
/// `None` is returned only when the estimate degenerates to non finite values,
/// for instance when two image points coincide.
pub fn solve(
    model: &PointModel,
    order: &PointOrder,
    focal_length: f64,
    prior: &UnitQuaternion<f64>,
    depth: f64,
) -> Option<Solution> {
    let r_expected = prior.to_rotation_matrix().into_inner();
    let u = *model.normal();

    let mut k: Vec3 = r_expected.row(2).transpose();
    let mut z0 = if depth < MIN_DEPTH { DEFAULT_DEPTH } else { depth };

    let mut rotation: Option<Mat3> = None;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < MAX_ITERATIONS {
        iterations += 1;

        let epsilon_1 = k.dot(model.m01()) / z0;
        let epsilon_2 = k.dot(model.m02()) / z0;

        // Scalar products <I0, M0i> and <J0, M0i>.
        let i0_m0i = Vec2::new(
            order[1].x * (1.0 + epsilon_1) - order[0].x,
            order[2].x * (1.0 + epsilon_2) - order[0].x,
        );
        let j0_m0i = Vec2::new(
            order[1].y * (1.0 + epsilon_1) - order[0].y,
            order[2].y * (1.0 + epsilon_2) - order[0].y,
        );

        // Projections of I and J onto the model plane.
        let i0 = model.in_plane(&(model.basis() * i0_m0i));
        let j0 = model.in_plane(&(model.basis() * j0_m0i));

        // Components along u: (lambda + i mu)^2 = (JJ0 - II0) - 2i IJ0.
        let ii0 = i0.norm_squared();
        let ij0 = i0.dot(&j0);
        let jj0 = j0.norm_squared();
        let rho = ((jj0 - ii0).powi(2) + 4.0 * ij0 * ij0).sqrt().sqrt();
        let theta = 0.5 * (-2.0 * ij0).atan2(jj0 - ii0);
        let lambda = rho * theta.cos();
        let mu = rho * theta.sin();

        // Both candidates share the same norm.
        let norm_const = 1.0 / (i0 + lambda * u).norm();
        z0 = norm_const * focal_length;

        let [r_1, r_2] = [1.0, -1.0].map(|sign: f64| {
            let i = (i0 + sign * lambda * u) * norm_const;
            let j = (j0 + sign * mu * u) * norm_const;
            Mat3::from_rows(&[i.transpose(), j.transpose(), i.cross(&j).transpose()])
        });
        if !z0.is_finite() || !r_1.iter().chain(r_2.iter()).all(|x| x.is_finite()) {
            trace!("posit degenerated after {} iterations", iterations);
            return None;
        }
        let r_1 = nearest_rotation(&r_1)?;
        let r_2 = nearest_rotation(&r_2)?;

        let current = if deviation(&r_expected, &r_1) < deviation(&r_expected, &r_2) {
            r_1
        } else {
            r_2
        };
        k = current.row(2).transpose();

        // The first pass has nothing to compare with.
        let previous = rotation.replace(current);
        if previous.map_or(false, |previous| deviation(&previous, &current) <= TOLERANCE) {
            converged = true;
            break;
        }
    }

    let rotation = rotation?;
    let translation = Translation3::new(
        order[0].x * z0 / focal_length,
        order[0].y * z0 / focal_length,
        z0,
    );
    if !translation.vector.iter().all(|x| x.is_finite()) {
        return None;
    }
    let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation));

    Some(Solution {
        pose: Iso3::from_parts(translation, rotation),
        iterations,
        converged,
    })
}

/// Distance between two rotations, $\|\bm{I} - \bm{A B^T}\|^2 / 2$,
/// which is $2 (1 - \cos \theta)$ for a rotation angle $\theta$ between them.
#[inline]
fn deviation(a: &Mat3, b: &Mat3) -> f64 {
    3.0 - (a * b.transpose()).trace()
}

/// Closest rotation to `m` in the Frobenius sense, the orthogonal factor of its polar decomposition.
///
/// With noisy points $\bm{I}$ and $\bm{J}$ are neither of equal norm nor exactly orthogonal,
/// so the rows built from them only approximate a rotation.
fn nearest_rotation(m: &Mat3) -> Option<Mat3> {
    let svd = m.try_svd(true, true, f64::EPSILON, 100)?;
    let (u, v_t) = (svd.u?, svd.v_t?);
    let rot = u * v_t;
    if rot.determinant() < 0.0 {
        // Flip the axis of smallest singular value.
        let mut u = u;
        u.column_mut(2).neg_mut();
        return Some(u * v_t);
    }
    Some(rot)
}

// Tests #######################################################################
