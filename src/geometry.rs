// Copyright 2021 The volray Authors under the terms of the MIT License as detailed
// in the accompanying file README.md or <https://opensource.org/licenses/MIT>.

//! Geometries that place a voxel grid in world space.

use cgmath::{Matrix4, SquareMatrix as _};

use crate::homogeneous::{scale, translate};
use crate::math::{FreeCoordinate, Position};

/// A shape that derives the affine transform mapping a world-space region
/// onto normalized grid space, the centered unit cube `[-0.5, 0.5]³`.
pub trait GridGeometry {
    /// The world→grid transform for this geometry.
    fn transform(&self) -> Matrix4<FreeCoordinate>;

    /// The grid→world transform for this geometry.
    ///
    /// Panics if the geometry is degenerate (e.g. a box of zero extent).
    fn inverse_transform(&self) -> Matrix4<FreeCoordinate> {
        self.transform()
            .invert()
            .expect("geometry transform is not invertible")
    }
}

/// An axis-aligned box given by two opposite corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    corners: [Position; 2],
}

impl BBox {
    /// Constructs a box from two opposite corners (homogeneous points).
    pub fn new(c0: Position, c1: Position) -> Self {
        Self { corners: [c0, c1] }
    }

    /// The corners this box was constructed from.
    pub fn corners(&self) -> [Position; 2] {
        self.corners
    }
}

impl GridGeometry for BBox {
    fn transform(&self) -> Matrix4<FreeCoordinate> {
        let [c0, c1] = self.corners;
        // Scale the box extents to unit size, after centering on the origin.
        let s = scale(
            1.0 / (c1.x - c0.x),
            1.0 / (c1.y - c0.y),
            1.0 / (c1.z - c0.z),
        );
        let center = (c0 + c1) / 2.0;
        s * translate(-center.x, -center.y, -center.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::point;
    use cgmath::Vector4;

    fn assert_position_eq(actual: Position, expected: Position) {
        for i in 0..4 {
            assert!(
                (actual[i] - expected[i]).abs() < 1e-5,
                "{:?} != {:?}",
                actual,
                expected
            );
        }
    }

    fn bbox() -> BBox {
        BBox::new(point(1.0, 1.0, 1.0), point(5.0, 5.0, 5.0))
    }

    #[test]
    fn transform_maps_corners_to_unit_cube() {
        let b = bbox();
        let m = b.transform();
        assert_position_eq(m * b.corners()[0], point(-0.5, -0.5, -0.5));
        assert_position_eq(m * b.corners()[1], point(0.5, 0.5, 0.5));
    }

    #[test]
    fn transform_maps_center_to_origin() {
        let b = bbox();
        let center = (b.corners()[0] + b.corners()[1]) / 2.0;
        assert_position_eq(b.transform() * center, point(0.0, 0.0, 0.0));
    }

    #[test]
    fn inverse_transform_round_trips() {
        let b = bbox();
        assert_position_eq(b.inverse_transform() * point(-0.5, -0.5, -0.5), b.corners()[0]);
        assert_position_eq(b.inverse_transform() * point(0.5, 0.5, 0.5), b.corners()[1]);
        assert_position_eq(
            b.inverse_transform() * point(0.0, 0.0, 0.0),
            point(3.0, 3.0, 3.0),
        );
    }

    #[test]
    fn transform_handles_anisotropic_boxes() {
        let b = BBox::new(point(0.0, 0.0, 0.0), point(2.0, 4.0, 8.0));
        let m = b.transform();
        assert_position_eq(m * point(2.0, 4.0, 8.0), point(0.5, 0.5, 0.5));
        assert_position_eq(m * point(1.0, 2.0, 4.0), point(0.0, 0.0, 0.0));
        assert_position_eq(m * Vector4::new(0.0, 0.0, 0.0, 1.0), point(-0.5, -0.5, -0.5));
    }
}
