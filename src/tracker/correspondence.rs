// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Assignment of unlabeled image points to model points.

use super::posit::PointOrder;
use crate::model::PointModel;
use crate::Vec2;

/// All assignments of three points, identity first.
const PERMUTATIONS: [[usize; PointModel::N_POINTS]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

/// Label points from the marker shape alone.
///
/// Image points and model points are both sorted along the model direction,
/// and matched rank for rank.
/// This holds as long as the marker is not rolled too far from its upright position.
pub fn by_geometry(points: &PointOrder, model: &PointModel) -> PointOrder {
    let direction = model.direction();
    let point_order = PointModel::order_by_direction(points, &direction);
    let model_order = PointModel::order_by_direction(&model.planar_points(), &direction);

    let mut order: PointOrder = [Vec2::zeros(); PointModel::N_POINTS];
    for (&m, &p) in model_order.iter().zip(&point_order) {
        order[m] = points[p];
    }
    order
}

/// Label points after the previous frame,
/// picking the assignment with the smallest total displacement.
pub fn by_continuity(points: &PointOrder, previous: &PointOrder) -> PointOrder {
    let cost = |perm: &[usize; PointModel::N_POINTS]| -> f64 {
        previous
            .iter()
            .zip(perm)
            .map(|(prev, &p)| (prev - points[p]).norm())
            .sum()
    };

    let mut best = &PERMUTATIONS[0];
    let mut best_cost = cost(best);
    for perm in &PERMUTATIONS[1..] {
        let c = cost(perm);
        if c < best_cost {
            best = perm;
            best_cost = c;
        }
    }
    (*best).map(|p| points[p])
}

// Tests #######################################################################

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelConfig;

    #[test]
    fn geometry_follows_marker_shape() {
        let model = PointModel::new(&ModelConfig::default_cap()).unwrap();
        // Upright cap seen from the front: point 1 on the left, point 2 on the right.
        let reference = Vec2::new(0.0, 0.1);
        let left = Vec2::new(-0.08, -0.05);
        let right = Vec2::new(0.08, -0.05);

        for points in [
            [reference, left, right],
            [right, reference, left],
            [left, right, reference],
        ] {
            assert_eq!(by_geometry(&points, &model), [reference, left, right]);
        }
    }

    #[test]
    fn continuity_keeps_identities() {
        let previous = [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.1, 0.0),
            Vec2::new(0.0, 0.1),
        ];
        let moved = previous.map(|p| p + Vec2::new(0.02, -0.01));
        let shuffled = [moved[2], moved[0], moved[1]];
        assert_eq!(by_continuity(&shuffled, &previous), moved);
    }

    #[test]
    fn continuity_minimizes_total_displacement() {
        // Matching previous[0] to its closest point first
        // would leave previous[1] with a far away one.
        let previous = [Vec2::new(0.0, 0.0), Vec2::new(0.1, 0.0), Vec2::new(0.5, 0.5)];
        let points = [Vec2::new(0.06, 0.0), Vec2::new(-0.1, 0.0), Vec2::new(0.5, 0.45)];
        assert_eq!(
            by_continuity(&points, &previous),
            [points[1], points[0], points[2]]
        );
    }
}
