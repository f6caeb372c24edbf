// Copyright 2021 The volray Authors under the terms of the MIT License as detailed
// in the accompanying file README.md or <https://opensource.org/licenses/MIT>.

//! Pinhole camera: an orthonormal viewing basis plus a field of view, from
//! which batches of primary rays are generated.

use cgmath::{InnerSpace as _, Point3, Vector3};

use crate::math::FreeCoordinate;

/// Aspect ratio of a 16:9 image.
pub const ASPECT_16_9: FreeCoordinate = 16.0 / 9.0;
/// Aspect ratio of a 16:10 image.
pub const ASPECT_16_10: FreeCoordinate = 16.0 / 10.0;
/// Aspect ratio of a 4:3 image.
pub const ASPECT_4_3: FreeCoordinate = 4.0 / 3.0;

/// Errors arising from [`Camera::cast`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum CastError {
    /// An image-plane coordinate fell outside `[0, 1]`.
    #[error("imx and imy must be in range [0, 1]")]
    InvalidRange,
    /// The two coordinate arrays had different lengths.
    #[error("imx and imy must have same length")]
    LengthMismatch,
}

/// A pinhole camera.
///
/// The viewing basis `(right, up, view)` is kept orthonormal: every
/// assignment to `view` or `up` re-runs Gram-Schmidt, so reading `up` after
/// setting `view` reflects the reprojection, and `right` is always the
/// derived `view × up`. There is deliberately no way to assign `right`.
///
/// `view` and `up` must not be collinear.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    eye: Point3<FreeCoordinate>,
    view: Vector3<FreeCoordinate>,
    up: Vector3<FreeCoordinate>,
    right: Vector3<FreeCoordinate>,
    fov: FreeCoordinate,
    aspect_ratio: FreeCoordinate,
    near: FreeCoordinate,
    far: FreeCoordinate,
    tan_hfov: FreeCoordinate,
    tan_vfov: FreeCoordinate,
}

impl Camera {
    /// Constructs a camera at `eye` looking along `view`, with the default
    /// up vector `(0, 1, 0)`, a horizontal field of view of 60°, a 16:9
    /// aspect ratio, and near/far planes at 0.1 and 2.0.
    pub fn new(
        eye: impl Into<Point3<FreeCoordinate>>,
        view: impl Into<Vector3<FreeCoordinate>>,
    ) -> Self {
        let mut camera = Self {
            eye: eye.into(),
            view: view.into(),
            up: Vector3::new(0.0, 1.0, 0.0),
            right: Vector3::new(0.0, 0.0, 0.0),
            fov: 60.0,
            aspect_ratio: ASPECT_16_9,
            near: 0.1,
            far: 2.0,
            tan_hfov: 0.0,
            tan_vfov: 0.0,
        };
        camera.orthonormalize();
        camera.update_fov();
        camera
    }

    /// The camera position.
    pub fn eye(&self) -> Point3<FreeCoordinate> {
        self.eye
    }
    /// The unit view direction.
    pub fn view(&self) -> Vector3<FreeCoordinate> {
        self.view
    }
    /// The unit up vector, orthogonal to `view`.
    pub fn up(&self) -> Vector3<FreeCoordinate> {
        self.up
    }
    /// The derived unit right vector, `view × up`.
    pub fn right(&self) -> Vector3<FreeCoordinate> {
        self.right
    }
    /// Horizontal field of view in degrees.
    pub fn fov(&self) -> FreeCoordinate {
        self.fov
    }
    /// Image aspect ratio (width / height).
    pub fn aspect_ratio(&self) -> FreeCoordinate {
        self.aspect_ratio
    }
    /// Near plane distance; rays originate here.
    pub fn near(&self) -> FreeCoordinate {
        self.near
    }
    /// Far plane distance; marching stops here.
    pub fn far(&self) -> FreeCoordinate {
        self.far
    }

    /// Moves the camera without changing its orientation.
    pub fn set_eye(&mut self, eye: impl Into<Point3<FreeCoordinate>>) {
        self.eye = eye.into();
    }

    /// Points the camera along a new view direction, reprojecting `up` to
    /// stay orthonormal.
    pub fn set_view(&mut self, view: impl Into<Vector3<FreeCoordinate>>) {
        self.view = view.into();
        self.orthonormalize();
    }

    /// Replaces the up vector, reprojecting it against the current view.
    pub fn set_up(&mut self, up: impl Into<Vector3<FreeCoordinate>>) {
        self.up = up.into();
        self.orthonormalize();
    }

    /// Sets the horizontal field of view in degrees.
    pub fn set_fov(&mut self, fov: FreeCoordinate) {
        self.fov = fov;
        self.update_fov();
    }

    /// Sets the aspect ratio (width / height).
    pub fn set_aspect_ratio(&mut self, aspect_ratio: FreeCoordinate) {
        self.aspect_ratio = aspect_ratio;
        self.update_fov();
    }

    /// Sets the near plane distance.
    pub fn set_near(&mut self, near: FreeCoordinate) {
        self.near = near;
    }

    /// Sets the far plane distance.
    pub fn set_far(&mut self, far: FreeCoordinate) {
        self.far = far;
    }

    /// Casts one ray per normalized image coordinate pair.
    ///
    /// `imx` and `imy` must be equal-length arrays of values in `[0, 1]`;
    /// `(0.5, 0.5)` is the image center. Returns ray origins projected onto
    /// the near plane, and unit ray directions.
    pub fn cast(
        &self,
        imx: &[FreeCoordinate],
        imy: &[FreeCoordinate],
    ) -> Result<(Vec<Point3<FreeCoordinate>>, Vec<Vector3<FreeCoordinate>>), CastError> {
        if !imx
            .iter()
            .chain(imy)
            .all(|value| (0.0..=1.0).contains(value))
        {
            return Err(CastError::InvalidRange);
        }
        if imx.len() != imy.len() {
            return Err(CastError::LengthMismatch);
        }

        let mut origins = Vec::with_capacity(imx.len());
        let mut directions = Vec::with_capacity(imx.len());
        for (&ix, &iy) in imx.iter().zip(imy) {
            let x = (2.0 * ix - 1.0) * self.tan_hfov;
            let y = (2.0 * iy - 1.0) * self.tan_vfov;
            let direction = (self.up * y + self.right * x + self.view).normalize();
            origins.push(self.eye + direction * self.near);
            directions.push(direction);
        }
        Ok((origins, directions))
    }

    fn orthonormalize(&mut self) {
        self.view = self.view.normalize();
        self.up = (self.up - self.view * self.up.dot(self.view)).normalize();
        self.right = self.view.cross(self.up);
    }

    fn update_fov(&mut self) {
        self.tan_hfov = (self.fov.to_radians() / 2.0).tan();
        self.tan_vfov = self.tan_hfov / self.aspect_ratio;
    }
}

impl Default for Camera {
    /// A camera at the origin looking along +Z.
    fn default() -> Self {
        Self::new((0.0, 0.0, 0.0), (0.0, 0.0, 1.0))
    }
}
