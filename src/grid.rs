// Copyright 2021 The volray Authors under the terms of the MIT License as detailed
// in the accompanying file README.md or <https://opensource.org/licenses/MIT>.

//! Voxel grids with affine world placement and trilinear sampling.
//!
//! A [`Grid`] stores a rank-3 (scalar) or rank-4 (vector) array of `f64`
//! voxels and a transform mapping world space into *normalized grid space*,
//! the centered unit cube `[-0.5, 0.5]³`. Lattice index `i ∈ [0, N−1]` on an
//! axis corresponds to normalized coordinate `i/(N−1) − 0.5`. Queries outside
//! the cube produce a configurable default value; queries inside blend the
//! eight surrounding voxels trilinearly.

use cgmath::{Matrix4, SquareMatrix as _, Vector3};
use itertools::iproduct;

use crate::field::{ColorField, ScalarField};
use crate::math::{FreeCoordinate, GridCoordinate, Position};
use crate::peval::{peval, EvalError};

/// Lower bound of normalized grid space on each axis (inclusive).
pub const GRID_MIN: FreeCoordinate = -0.5;
/// Upper bound of normalized grid space on each axis (inclusive).
pub const GRID_MAX: FreeCoordinate = 0.5;

/// Determinants smaller than this mark a placement transform as
/// non-invertible for sampling purposes.
const DETERMINANT_EPSILON: FreeCoordinate = 1e-12;

/// Errors arising from [`Grid`] construction and mutation.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum GridError {
    /// The voxel array's rank (number of dimensions) was not 3 or 4.
    #[error("unsupported grid rank: {0}")]
    InvalidShape(usize),

    /// The voxel data length disagreed with the product of the shape.
    #[error("grid shape requires {expected} values, but {actual} were given")]
    DataLength { expected: usize, actual: usize },

    /// The placement transform cannot be inverted.
    #[error("grid transform is not invertible")]
    InvalidTransform,

    /// A per-voxel operation was applied to a grid with the wrong number of
    /// channels (e.g. a scalar stamp on a vector grid).
    #[error("operation requires a {expected}-channel grid, but grid has {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    /// A parallel stamp failed in the worker pool.
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// A voxel grid placed in world space.
///
/// Construct with [`Grid::new`] (or [`Grid::filled`]), then optionally adjust
/// placement and out-of-bounds behavior:
///
/// ```
/// use volray::geometry::{BBox, GridGeometry as _};
/// use volray::grid::Grid;
/// use volray::math::point;
///
/// let bbox = BBox::new(point(-1.0, -1.0, 1.0), point(1.0, 1.0, 3.0));
/// let grid = Grid::filled(&[16, 16, 16], 1.0)
///     .unwrap()
///     .with_transform(bbox.transform())
///     .unwrap()
///     .with_default(0.0);
/// assert_eq!(grid.sample(&[point(0.0, 0.0, 2.0)]), vec![1.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    data: Box<[f64]>,
    size: (usize, usize, usize),
    channels: usize,
    /// Distinguishes a rank-4 single-channel grid from a rank-3 grid.
    vector: bool,
    transform: Matrix4<FreeCoordinate>,
    itransform: Matrix4<FreeCoordinate>,
    default: f32,
}

impl Grid {
    /// Constructs a grid from voxel data in lexicographic order (first axis
    /// outermost, channels innermost).
    ///
    /// `shape` must have 3 entries (scalar grid) or 4 (vector grid, last
    /// entry is the channel count). The placement transform defaults to the
    /// identity and the out-of-bounds default to 0.
    pub fn new(data: Vec<f64>, shape: &[usize]) -> Result<Self, GridError> {
        let (size, channels, vector) = match *shape {
            [nx, ny, nz] => ((nx, ny, nz), 1, false),
            [nx, ny, nz, d] => ((nx, ny, nz), d, true),
            _ => return Err(GridError::InvalidShape(shape.len())),
        };
        let expected = size.0 * size.1 * size.2 * channels;
        if data.len() != expected {
            return Err(GridError::DataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data: data.into_boxed_slice(),
            size,
            channels,
            vector,
            transform: Matrix4::identity(),
            itransform: Matrix4::identity(),
            default: 0.0,
        })
    }

    /// Constructs a grid with every voxel set to `value`.
    pub fn filled(shape: &[usize], value: f64) -> Result<Self, GridError> {
        let volume = match *shape {
            [nx, ny, nz] => nx * ny * nz,
            [nx, ny, nz, d] => nx * ny * nz * d,
            _ => return Err(GridError::InvalidShape(shape.len())),
        };
        Self::new(vec![value; volume], shape)
    }

    /// Replaces the world→grid placement transform.
    ///
    /// Fails with [`GridError::InvalidTransform`] if the matrix cannot be
    /// inverted (the inverse is needed to position voxels in world space).
    pub fn with_transform(
        mut self,
        transform: Matrix4<FreeCoordinate>,
    ) -> Result<Self, GridError> {
        if transform.determinant().abs() <= DETERMINANT_EPSILON {
            return Err(GridError::InvalidTransform);
        }
        self.itransform = transform.invert().ok_or(GridError::InvalidTransform)?;
        self.transform = transform;
        Ok(self)
    }

    /// Replaces the value reported for out-of-bounds queries. For vector
    /// grids the value is broadcast across all channels.
    pub fn with_default(mut self, default: f32) -> Self {
        self.default = default;
        self
    }

    /// Grid extent along each axis, in voxels.
    pub fn size(&self) -> (usize, usize, usize) {
        self.size
    }

    /// Number of channels per voxel; 1 for scalar grids.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Whether this grid was constructed with rank 4 (an explicit channel
    /// axis), even if that axis has length 1.
    pub fn is_vector(&self) -> bool {
        self.vector
    }

    /// Total number of voxels (not counting channels).
    pub fn voxel_count(&self) -> usize {
        self.size.0 * self.size.1 * self.size.2
    }

    /// The world→grid placement transform.
    pub fn transform(&self) -> Matrix4<FreeCoordinate> {
        self.transform
    }

    /// The grid→world placement transform (inverse of [`Self::transform`]).
    pub fn itransform(&self) -> Matrix4<FreeCoordinate> {
        self.itransform
    }

    /// The out-of-bounds default value.
    pub fn default_value(&self) -> f32 {
        self.default
    }

    /// Raw voxel storage, lexicographic order, channels innermost.
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    fn offset(&self, i: usize, j: usize, k: usize) -> usize {
        ((i * self.size.1 + j) * self.size.2 + k) * self.channels
    }

    /// Samples the grid at one homogeneous world point, writing one value per
    /// channel into `out`.
    #[inline]
    pub fn sample_one(&self, p: Position, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.channels);
        let g = self.transform * p;
        // Boundary values exactly on ±0.5 are in bounds; NaN is out.
        if !((GRID_MIN..=GRID_MAX).contains(&g.x)
            && (GRID_MIN..=GRID_MAX).contains(&g.y)
            && (GRID_MIN..=GRID_MAX).contains(&g.z))
        {
            for slot in out.iter_mut() {
                *slot = self.default;
            }
            return;
        }

        let (i0, i1, fu) = axis_span(g.x, self.size.0);
        let (j0, j1, fv) = axis_span(g.y, self.size.1);
        let (k0, k1, fw) = axis_span(g.z, self.size.2);
        let corners = [
            (i0, j0, k0, (1.0 - fu) * (1.0 - fv) * (1.0 - fw)),
            (i1, j0, k0, fu * (1.0 - fv) * (1.0 - fw)),
            (i0, j1, k0, (1.0 - fu) * fv * (1.0 - fw)),
            (i1, j1, k0, fu * fv * (1.0 - fw)),
            (i0, j0, k1, (1.0 - fu) * (1.0 - fv) * fw),
            (i1, j0, k1, fu * (1.0 - fv) * fw),
            (i0, j1, k1, (1.0 - fu) * fv * fw),
            (i1, j1, k1, fu * fv * fw),
        ];

        for slot in out.iter_mut() {
            *slot = 0.0;
        }
        for &(i, j, k, weight) in &corners {
            let base = self.offset(i, j, k);
            for (c, slot) in out.iter_mut().enumerate() {
                *slot += weight * self.data[base + c] as f32;
            }
        }
    }

    /// Samples the grid at a batch of homogeneous world points.
    ///
    /// The result holds `channels` consecutive values per input point.
    pub fn sample(&self, points: &[Position]) -> Vec<f32> {
        let mut out = vec![0.0f32; points.len() * self.channels];
        for (p, slot) in points.iter().zip(out.chunks_mut(self.channels)) {
            self.sample_one(*p, slot);
        }
        out
    }

    /// All voxel indices `(i, j, k)` in lexicographic order (`i` outermost,
    /// `k` innermost).
    pub fn indices(&self) -> Vec<[GridCoordinate; 3]> {
        let (nx, ny, nz) = self.size;
        iproduct!(0..nx, 0..ny, 0..nz)
            .map(|(i, j, k)| [i, j, k])
            .collect()
    }

    /// Maps voxel indices to their normalized grid-space positions.
    pub fn igspace(&self, indices: &[[GridCoordinate; 3]]) -> Vec<Position> {
        let (nx, ny, nz) = self.size;
        indices
            .iter()
            .map(|&[i, j, k]| {
                Position::new(
                    normalized_axis(i, nx),
                    normalized_axis(j, ny),
                    normalized_axis(k, nz),
                    1.0,
                )
            })
            .collect()
    }

    /// Maps grid-space positions to world space through the inverse placement
    /// transform.
    pub fn gwspace(&self, gspace: &[Position]) -> Vec<Position> {
        gspace.iter().map(|&g| self.itransform * g).collect()
    }

    /// World-space position of every voxel, in storage order.
    pub fn world_positions(&self) -> Vec<Position> {
        self.gwspace(&self.igspace(&self.indices()))
    }

    /// Overwrites every voxel with `field` evaluated at the voxel's world
    /// position. Scalar grids only.
    pub fn stamp(&mut self, field: &dyn ScalarField) -> Result<(), GridError> {
        self.check_channels(1)?;
        let positions = self.world_positions();
        let mut values = vec![0.0f32; positions.len()];
        field.evaluate(&positions, &mut values);
        for (voxel, value) in self.data.iter_mut().zip(&values) {
            *voxel = f64::from(*value);
        }
        Ok(())
    }

    /// Overwrites every voxel with `field` evaluated at the voxel's world
    /// position. Three-channel grids only.
    pub fn stamp_color(&mut self, field: &dyn ColorField) -> Result<(), GridError> {
        self.check_channels(3)?;
        let positions = self.world_positions();
        let mut values = vec![Vector3::new(0.0f32, 0.0, 0.0); positions.len()];
        field.evaluate(&positions, &mut values);
        for (voxel, value) in self.data.chunks_mut(3).zip(&values) {
            voxel[0] = f64::from(value.x);
            voxel[1] = f64::from(value.y);
            voxel[2] = f64::from(value.z);
        }
        Ok(())
    }

    /// [`Self::stamp`] with the field evaluation split across the worker
    /// pool; `method` is a concurrency method name as for
    /// [`peval`](crate::peval::peval). Produces the same result as the
    /// serial stamp.
    pub fn pstamp(
        &mut self,
        field: &dyn ScalarField,
        workers: Option<usize>,
        method: &str,
    ) -> Result<(), GridError> {
        self.check_channels(1)?;
        let positions = self.world_positions();
        let values = peval(
            |chunk: &[Position]| {
                let mut out = vec![0.0f32; chunk.len()];
                field.evaluate(chunk, &mut out);
                out
            },
            &positions,
            workers,
            method,
        )?;
        for (voxel, value) in self.data.iter_mut().zip(&values) {
            *voxel = f64::from(*value);
        }
        Ok(())
    }

    fn check_channels(&self, expected: usize) -> Result<(), GridError> {
        if self.channels == expected {
            Ok(())
        } else {
            Err(GridError::ChannelMismatch {
                expected,
                actual: self.channels,
            })
        }
    }
}

/// Lattice index `i` to normalized coordinate `i/(N−1) − 0.5`.
#[inline]
fn normalized_axis(i: usize, n: usize) -> FreeCoordinate {
    if n <= 1 {
        0.0
    } else {
        i as FreeCoordinate / (n - 1) as FreeCoordinate - 0.5
    }
}

/// Continuous voxel coordinate for one axis: the two bounding lattice
/// indices and the fractional blend weight toward the upper one.
#[inline]
fn axis_span(g: FreeCoordinate, n: usize) -> (usize, usize, FreeCoordinate) {
    if n <= 1 {
        return (0, 0, 0.0);
    }
    let u = ((g - GRID_MIN) * (n - 1) as FreeCoordinate).max(0.0);
    let i0 = (u as usize).min(n - 1);
    let fu = u - i0 as FreeCoordinate;
    (i0, (i0 + 1).min(n - 1), fu)
}

impl ScalarField for Grid {
    fn evaluate(&self, points: &[Position], out: &mut [f32]) {
        assert_eq!(
            self.channels, 1,
            "scalar field evaluation requires a single-channel grid"
        );
        for (p, slot) in points.iter().zip(out.iter_mut()) {
            self.sample_one(*p, std::slice::from_mut(slot));
        }
    }
}

impl ColorField for Grid {
    fn evaluate(&self, points: &[Position], out: &mut [Vector3<f32>]) {
        assert_eq!(
            self.channels, 3,
            "color field evaluation requires a three-channel grid"
        );
        let mut rgb = [0.0f32; 3];
        for (p, slot) in points.iter().zip(out.iter_mut()) {
            self.sample_one(*p, &mut rgb);
            *slot = Vector3::new(rgb[0], rgb[1], rgb[2]);
        }
    }
}
