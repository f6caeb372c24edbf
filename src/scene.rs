// Copyright 2021 The volray Authors under the terms of the MIT License as detailed
// in the accompanying file README.md or <https://opensource.org/licenses/MIT>.

//! Scene assembly and the render driver.
//!
//! A [`Scene`] bundles a camera, up to two volumetric elements (an *ambient*
//! channel that emits on its own and a *diffuse* channel lit by [`Light`]s),
//! and a global scatter coefficient. [`Scene::render`] generates one ray per
//! pixel, marches them through the scene on the worker pool, and returns a
//! row-major RGBA [`Image`].
//!
//! The scene is read-only for the duration of a render: workers share `&self`
//! and no synchronization is needed.

use cgmath::Vector4;
use instant::Instant;
use itertools::iproduct;
use std::fmt;
use std::panic;
use std::thread;

use crate::camera::{Camera, CastError};
use crate::field::{ColorField, ScalarField};
use crate::math::{linspace, FreeCoordinate, Rgb, Rgba};
use crate::peval::{chunk_size, resolve_workers, EvalError, ExecMethod};
use crate::raytracer::{trace_chunk, TraceInfo};

/// Errors arising from [`Scene::render`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    /// Tolerance was zero or negative.
    #[error("Tolerance must be >0.")]
    InvalidTolerance,
    /// Neither the ambient nor the diffuse element is set.
    #[error("At least one scene element is required.")]
    EmptyScene,
    /// Worker-pool configuration was invalid.
    #[error(transparent)]
    Eval(#[from] EvalError),
    /// Ray generation failed.
    #[error(transparent)]
    Cast(#[from] CastError),
}

/// A volumetric element: a density field with an optional color field.
/// Without a color the element emits white.
pub struct Element {
    density: Box<dyn ScalarField>,
    color: Option<Box<dyn ColorField>>,
}

impl Element {
    /// An element emitting white light in proportion to `density`.
    pub fn new(density: impl ScalarField + 'static) -> Self {
        Self {
            density: Box::new(density),
            color: None,
        }
    }

    /// An element whose emission is tinted by a color field.
    pub fn with_color(
        density: impl ScalarField + 'static,
        color: impl ColorField + 'static,
    ) -> Self {
        Self {
            density: Box::new(density),
            color: Some(Box::new(color)),
        }
    }

    /// Replaces the color field.
    pub fn set_color(&mut self, color: impl ColorField + 'static) {
        self.color = Some(Box::new(color));
    }

    /// The density field.
    pub fn density(&self) -> &dyn ScalarField {
        &*self.density
    }

    /// The color field, if any.
    pub fn color(&self) -> Option<&dyn ColorField> {
        self.color.as_deref()
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Element")
            .field("colored", &self.color.is_some())
            .finish()
    }
}

/// A light source: a color, and an occlusion field giving the fraction of
/// that light reaching each world point (0 = fully shadowed, 1 = fully lit).
///
/// Supplying the shadow term as a field keeps the integrator linear in
/// `rays × steps`; there is no inner shadow-ray march.
pub struct Light {
    occlusion: Box<dyn ScalarField>,
    color: Rgb,
}

impl Light {
    /// A light of the given color.
    pub fn new(occlusion: impl ScalarField + 'static, color: Rgb) -> Self {
        Self {
            occlusion: Box::new(occlusion),
            color,
        }
    }

    /// A white light.
    pub fn white(occlusion: impl ScalarField + 'static) -> Self {
        Self::new(occlusion, Rgb::WHITE)
    }

    /// The occlusion field.
    pub fn occlusion(&self) -> &dyn ScalarField {
        &*self.occlusion
    }

    /// The light color.
    pub fn color(&self) -> Rgb {
        self.color
    }
}

impl fmt::Debug for Light {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Light").field("color", &self.color).finish()
    }
}

/// Options for [`Scene::render`].
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    /// Marching step size; `None` divides the near–far range into 100 steps.
    pub step: Option<FreeCoordinate>,
    /// Worker count; `None` uses one worker per CPU.
    pub workers: Option<usize>,
    /// Transmissivity below which a ray is considered opaque.
    pub tol: FreeCoordinate,
    /// Worker-pool concurrency method name, `"thread"` or `"fork"`; any
    /// other name fails the render with
    /// [`EvalError::InvalidMethod`](crate::peval::EvalError::InvalidMethod).
    pub method: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            step: None,
            workers: None,
            tol: 1e-6,
            method: "thread".to_owned(),
        }
    }
}

/// A rendered image: row-major RGBA with `f32` channels in `[0, 1]`.
///
/// Row index grows with the normalized image-plane `imy` coordinate; alpha is
/// the accumulated opacity `1 − T` of the pixel's ray.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    width: usize,
    height: usize,
    pixels: Box<[Vector4<f32>]>,
}

impl Image {
    fn new(width: usize, height: usize, pixels: Vec<Vector4<f32>>) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        Self {
            width,
            height,
            pixels: pixels.into_boxed_slice(),
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// One pixel, by row (top first) and column.
    ///
    /// Panics if a user field produced a NaN channel; fields are contracted
    /// to return finite values.
    pub fn pixel(&self, row: usize, column: usize) -> Rgba {
        let p = self.pixels[row * self.width + column];
        Rgba::new(p.x, p.y, p.z, p.w)
    }

    /// All pixels in row-major order.
    pub fn pixels(&self) -> &[Vector4<f32>] {
        &self.pixels
    }

    /// Consumes the image, returning its pixels in row-major order.
    pub fn into_pixels(self) -> Box<[Vector4<f32>]> {
        self.pixels
    }
}

/// A volumetric scene.
///
/// `lights` is append-only ([`Scene::add_light`]); the other fields may be
/// reassigned freely between renders.
pub struct Scene {
    /// Self-emitting element.
    pub ambient: Option<Element>,
    /// Element lit by the scene's lights.
    pub diffuse: Option<Element>,
    lights: Vec<Light>,
    /// The camera rays are cast from.
    pub camera: Camera,
    /// Global extinction coefficient applied to all density fields,
    /// in units of inverse distance.
    pub scatter: FreeCoordinate,
}

impl Scene {
    /// An empty scene with the default camera and a scatter coefficient of 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a light source. Lights illuminate the diffuse element only.
    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    /// The scene's light sources.
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Renders this scene to a `shape = (width, height)` image.
    ///
    /// One ray is cast per pixel through a regular grid of normalized image
    /// coordinates; the ray batch is split into contiguous chunks which the
    /// worker pool marches independently, and the chunk results are
    /// concatenated in order so pixel layout is deterministic regardless of
    /// worker scheduling.
    pub fn render(
        &self,
        shape: (usize, usize),
        options: &RenderOptions,
    ) -> Result<Image, RenderError> {
        let start = Instant::now();
        let workers = resolve_workers(options.workers)?;
        if !(options.tol > 0.0) {
            return Err(RenderError::InvalidTolerance);
        }
        if self.ambient.is_none() && self.diffuse.is_none() {
            return Err(RenderError::EmptyScene);
        }
        // Both methods execute on threads; parsing still rejects unknown
        // names. See `ExecMethod`.
        let _ = ExecMethod::parse(&options.method)?;
        let (width, height) = shape;
        let step = options
            .step
            .unwrap_or((self.camera.far() - self.camera.near()) / 100.0);
        let tol = options.tol;

        // Normalized pixel coordinates: imy varies across rows (outer), imx
        // across columns (inner), matching the row-major output layout.
        let imx: Vec<FreeCoordinate> = linspace(0.0, 1.0, width).collect();
        let imy: Vec<FreeCoordinate> = linspace(0.0, 1.0, height).collect();
        let mut xs = Vec::with_capacity(width * height);
        let mut ys = Vec::with_capacity(width * height);
        for (y, x) in iproduct!(imy.iter(), imx.iter()) {
            xs.push(*x);
            ys.push(*y);
        }
        let (mut origins, directions) = self.camera.cast(&xs, &ys)?;

        let chunk = chunk_size(origins.len(), workers);
        let (pixels, info) = thread::scope(|scope| {
            let handles: Vec<_> = origins
                .chunks_mut(chunk)
                .zip(directions.chunks(chunk))
                .map(|(positions, dirs)| {
                    scope.spawn(move || trace_chunk(self, positions, dirs, step, tol))
                })
                .collect();
            let mut pixels = Vec::with_capacity(width * height);
            let mut info = TraceInfo::default();
            for handle in handles {
                let (chunk_pixels, chunk_info) = handle
                    .join()
                    .unwrap_or_else(|cause| panic::resume_unwind(cause));
                pixels.extend(chunk_pixels);
                info += chunk_info;
            }
            (pixels, info)
        });

        log::debug!(
            "rendered {}x{} pixels ({} rays, {} chunk steps) in {:?}",
            width,
            height,
            info.rays,
            info.steps,
            start.elapsed()
        );
        Ok(Image::new(width, height, pixels))
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            ambient: None,
            diffuse: None,
            lights: Vec::new(),
            camera: Camera::default(),
            scatter: 1.0,
        }
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Scene")
            .field("ambient", &self.ambient)
            .field("diffuse", &self.diffuse)
            .field("lights", &self.lights)
            .field("camera", &self.camera)
            .field("scatter", &self.scatter)
            .finish()
    }
}
