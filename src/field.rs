// Copyright 2021 The volray Authors under the terms of the MIT License as detailed
// in the accompanying file README.md or <https://opensource.org/licenses/MIT>.

//! The batched field abstraction that unifies voxel grids, analytic
//! closures, and constants behind one evaluation contract.
//!
//! The ray integrator queries fields once per marching step over an entire
//! chunk of rays, so implementations receive the whole batch of homogeneous
//! world points at once; per-call dispatch overhead is amortized and the
//! inner loops can stay tight.
//!
//! Implementations must be safe to call concurrently from multiple worker
//! threads (hence the [`Send`] + [`Sync`] bounds); a closure that mutates
//! captured state has no defined meaning during a render.

use cgmath::{Matrix4, Vector3};
use std::sync::Arc;

use crate::math::{FreeCoordinate, Position, Rgb};

/// A scalar-valued field over homogeneous world-space points.
///
/// `evaluate` writes one output per input point; `out.len()` must equal
/// `points.len()`.
pub trait ScalarField: Send + Sync {
    fn evaluate(&self, points: &[Position], out: &mut [f32]);
}

/// A color-valued (RGB) field over homogeneous world-space points.
pub trait ColorField: Send + Sync {
    fn evaluate(&self, points: &[Position], out: &mut [Vector3<f32>]);
}

/// A field with the same value everywhere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Constant(pub f32);

impl ScalarField for Constant {
    fn evaluate(&self, points: &[Position], out: &mut [f32]) {
        debug_assert_eq!(points.len(), out.len());
        for slot in out.iter_mut() {
            *slot = self.0;
        }
    }
}

/// A color field with the same color everywhere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantColor(pub Rgb);

impl ColorField for ConstantColor {
    fn evaluate(&self, points: &[Position], out: &mut [Vector3<f32>]) {
        debug_assert_eq!(points.len(), out.len());
        let value = Vector3::from(self.0);
        for slot in out.iter_mut() {
            *slot = value;
        }
    }
}

/// Adapts a pointwise function into a batched field.
///
/// The wrapped function is called once per point; if the computation can be
/// vectorized over the batch, implement [`ScalarField`]/[`ColorField`]
/// directly instead.
#[derive(Clone, Copy, Debug)]
pub struct FnField<F>(pub F);

impl<F> ScalarField for FnField<F>
where
    F: Fn(Position) -> f32 + Send + Sync,
{
    fn evaluate(&self, points: &[Position], out: &mut [f32]) {
        debug_assert_eq!(points.len(), out.len());
        for (slot, &p) in out.iter_mut().zip(points) {
            *slot = (self.0)(p);
        }
    }
}

impl<F> ColorField for FnField<F>
where
    F: Fn(Position) -> Vector3<f32> + Send + Sync,
{
    fn evaluate(&self, points: &[Position], out: &mut [Vector3<f32>]) {
        debug_assert_eq!(points.len(), out.len());
        for (slot, &p) in out.iter_mut().zip(points) {
            *slot = (self.0)(p);
        }
    }
}

/// A field evaluated in a transformed coordinate frame: each query point is
/// carried through `transform` before the inner field sees it.
#[derive(Clone, Debug)]
pub struct Transformed<T> {
    pub field: T,
    pub transform: Matrix4<FreeCoordinate>,
}

impl<T> Transformed<T> {
    fn mapped(&self, points: &[Position]) -> Vec<Position> {
        points.iter().map(|&p| self.transform * p).collect()
    }
}

impl<T: ScalarField> ScalarField for Transformed<T> {
    fn evaluate(&self, points: &[Position], out: &mut [f32]) {
        self.field.evaluate(&self.mapped(points), out);
    }
}

impl<T: ColorField> ColorField for Transformed<T> {
    fn evaluate(&self, points: &[Position], out: &mut [Vector3<f32>]) {
        self.field.evaluate(&self.mapped(points), out);
    }
}

impl<T: ScalarField + ?Sized> ScalarField for Arc<T> {
    fn evaluate(&self, points: &[Position], out: &mut [f32]) {
        (**self).evaluate(points, out);
    }
}

impl<T: ColorField + ?Sized> ColorField for Arc<T> {
    fn evaluate(&self, points: &[Position], out: &mut [Vector3<f32>]) {
        (**self).evaluate(points, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::homogeneous::translate;
    use crate::math::point;

    #[test]
    fn constant_fills_batch() {
        let field = Constant(2.5);
        let points = [point(0.0, 0.0, 0.0), point(9.0, 9.0, 9.0)];
        let mut out = [0.0; 2];
        field.evaluate(&points, &mut out);
        assert_eq!(out, [2.5, 2.5]);
    }

    #[test]
    fn constant_color_fills_batch() {
        let field = ConstantColor(Rgb::new(1.0, 0.0, 0.5));
        let points = [point(0.0, 0.0, 0.0)];
        let mut out = [Vector3::new(0.0, 0.0, 0.0)];
        field.evaluate(&points, &mut out);
        assert_eq!(out[0], Vector3::new(1.0, 0.0, 0.5));
    }

    #[test]
    fn fn_field_is_pointwise() {
        let field = FnField(|p: Position| p.x + p.y);
        let points = [point(1.0, 2.0, 0.0), point(3.0, 4.0, 0.0)];
        let mut out = [0.0; 2];
        field.evaluate(&points, &mut out);
        assert_eq!(out, [3.0, 7.0]);
    }

    #[test]
    fn transformed_moves_the_query_frame() {
        let field = Transformed {
            field: FnField(|p: Position| p.x),
            transform: translate(10.0, 0.0, 0.0),
        };
        let points = [point(1.0, 0.0, 0.0)];
        let mut out = [0.0];
        field.evaluate(&points, &mut out);
        assert_eq!(out, [11.0]);
    }

    #[test]
    fn arc_delegates() {
        let field: Arc<dyn ScalarField> = Arc::new(Constant(7.0));
        let mut out = [0.0];
        field.evaluate(&[point(0.0, 0.0, 0.0)], &mut out);
        assert_eq!(out, [7.0]);
    }
}
