// Copyright 2021 The volray Authors under the terms of the MIT License as detailed
// in the accompanying file README.md or <https://opensource.org/licenses/MIT>.

//! Ray-marching integrator for volumetric scenes.
//!
//! Each worker receives a contiguous chunk of rays and marches them together
//! from the near plane to the far plane in fixed steps, querying the scene's
//! fields once per step for the whole chunk. Per-step extinction uses the
//! closed-form Beer-Lambert factor `τ = exp(−scatter·σ·Δs)`, which preserves
//! energy for any step size in the limit of a homogeneous medium within the
//! step. Ambient and diffuse channels keep separate exponentials so each can
//! carry its own color while sharing extinction accounting.

use cgmath::{ElementWise as _, Point3, Vector3, Vector4, Zero as _};

use crate::scene::Scene;

/// When both ambient and diffuse densities are active, each channel's
/// emission is weighted by its share of the combined extinction; this floor
/// keeps the share defined where both densities vanish.
const CHANNEL_EPSILON: f32 = 1e-8;

/// Statistics from marching one or more ray chunks.
///
/// The contents of this structure are subject to change; use [`Debug`] to view it.
/// The [`Default`] value is the zero value.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct TraceInfo {
    /// Rays marched.
    pub rays: usize,
    /// Marching iterations summed over chunks (not over rays).
    pub steps: usize,
}

impl std::ops::AddAssign<TraceInfo> for TraceInfo {
    fn add_assign(&mut self, other: Self) {
        self.rays += other.rays;
        self.steps += other.steps;
    }
}

impl std::iter::Sum for TraceInfo {
    fn sum<I>(iter: I) -> Self
    where
        I: Iterator<Item = Self>,
    {
        let mut sum = Self::default();
        for part in iter {
            sum += part;
        }
        sum
    }
}

/// Marches one chunk of rays through `scene`.
///
/// `positions` are advanced in place, one `step` along `directions` per
/// iteration; marching stops once the accumulated distance reaches the
/// camera's far plane or every ray's transmissivity has dropped to `tol`.
/// Returns one RGBA value per ray, where alpha is the accumulated opacity
/// `1 − T`.
pub(crate) fn trace_chunk(
    scene: &Scene,
    positions: &mut [Point3<f32>],
    directions: &[Vector3<f32>],
    step: f32,
    tol: f32,
) -> (Vec<Vector4<f32>>, TraceInfo) {
    debug_assert_eq!(positions.len(), directions.len());
    let count = positions.len();
    let optical_length = scene.scatter * step;
    let mut distance = scene.camera.near();
    let far = scene.camera.far();

    let mut transmissivity = vec![1.0f32; count];
    let mut light = vec![Vector4::zero(); count];

    // Worker-local scratch, reused across steps.
    let mut points = vec![Vector4::zero(); count];
    let mut sigma_ambient = vec![0.0f32; count];
    let mut sigma_diffuse = vec![0.0f32; count];
    let mut occlusion = vec![0.0f32; count];
    let mut color = vec![Vector3::zero(); count];

    let white = Vector3::new(1.0f32, 1.0, 1.0);
    let mut info = TraceInfo {
        rays: count,
        steps: 0,
    };

    while distance < far && transmissivity.iter().any(|&t| t > tol) {
        info.steps += 1;
        for (homogeneous, position) in points.iter_mut().zip(positions.iter()) {
            *homogeneous = position.to_homogeneous();
        }

        let ambient = scene.ambient.as_ref();
        let diffuse = scene.diffuse.as_ref();
        if let Some(element) = ambient {
            element.density().evaluate(&points, &mut sigma_ambient);
        }
        if let Some(element) = diffuse {
            element.density().evaluate(&points, &mut sigma_diffuse);
        }

        if let Some(element) = ambient {
            match element.color() {
                Some(field) => field.evaluate(&points, &mut color),
                None => color.iter_mut().for_each(|slot| *slot = white),
            }
            for k in 0..count {
                let t = transmissivity[k];
                if t <= tol {
                    // Opaque ray; nothing further reaches the camera.
                    continue;
                }
                let tau_ambient = (-optical_length * sigma_ambient[k]).exp();
                let share = if diffuse.is_some() {
                    sigma_ambient[k] / (sigma_ambient[k] + sigma_diffuse[k]).max(CHANNEL_EPSILON)
                } else {
                    1.0
                };
                let emitted = color[k] * (t * (1.0 - tau_ambient) * share);
                light[k] += emitted.extend(0.0);
            }
        }

        if let Some(element) = diffuse {
            match element.color() {
                Some(field) => field.evaluate(&points, &mut color),
                None => color.iter_mut().for_each(|slot| *slot = white),
            }
            for source in scene.lights() {
                source.occlusion().evaluate(&points, &mut occlusion);
                let light_color: Vector3<f32> = source.color().into();
                for k in 0..count {
                    let t = transmissivity[k];
                    if t <= tol {
                        continue;
                    }
                    let tau_diffuse = (-optical_length * sigma_diffuse[k]).exp();
                    let share = if ambient.is_some() {
                        sigma_diffuse[k]
                            / (sigma_ambient[k] + sigma_diffuse[k]).max(CHANNEL_EPSILON)
                    } else {
                        1.0
                    };
                    let emitted = color[k].mul_element_wise(light_color)
                        * (t * (1.0 - tau_diffuse) * occlusion[k] * share);
                    light[k] += emitted.extend(0.0);
                }
            }
        }

        for k in 0..count {
            let sigma = sigma_ambient[k] + sigma_diffuse[k];
            transmissivity[k] *= (-optical_length * sigma).exp();
            positions[k] += directions[k] * step;
        }
        distance += step;
    }

    for (pixel, &t) in light.iter_mut().zip(&transmissivity) {
        pixel.w = 1.0 - t;
    }
    (light, info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Constant, ConstantColor, FnField};
    use crate::math::{Position, Rgb};
    use crate::scene::{Element, Light, Scene};
    use cgmath::{EuclideanSpace as _, InnerSpace as _};

    fn march(scene: &Scene, steps: usize) -> (Vec<Vector4<f32>>, TraceInfo) {
        let step = (scene.camera.far() - scene.camera.near()) / steps as f32;
        let mut positions = vec![Point3::new(0.0, 0.0, scene.camera.near())];
        let directions = vec![Vector3::new(0.0, 0.0, 1.0)];
        trace_chunk(scene, &mut positions, &directions, step, 1e-6)
    }

    #[test]
    fn homogeneous_medium_matches_beer_lambert() {
        let mut scene = Scene::new();
        scene.ambient = Some(Element::new(Constant(1.0)));
        scene.scatter = 1.0;
        let (pixels, info) = march(&scene, 100);
        assert_eq!(info.steps, 100);
        assert_eq!(info.rays, 1);

        let depth = scene.camera.far() - scene.camera.near();
        let expected_alpha = 1.0 - (-depth).exp();
        assert!(
            (pixels[0].w - expected_alpha).abs() < 1e-3,
            "alpha {} != {}",
            pixels[0].w,
            expected_alpha
        );
        // White emission: all color channels equal alpha.
        for channel in 0..3 {
            assert!((pixels[0][channel] - pixels[0].w).abs() < 1e-3);
        }
    }

    #[test]
    fn vacuum_contributes_nothing() {
        let mut scene = Scene::new();
        scene.ambient = Some(Element::new(Constant(0.0)));
        let (pixels, _) = march(&scene, 50);
        assert_eq!(pixels[0], Vector4::new(0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn transmissivity_bounds_hold() {
        let mut scene = Scene::new();
        scene.ambient = Some(Element::new(Constant(25.0)));
        scene.scatter = 5.0;
        let (pixels, _) = march(&scene, 100);
        let alpha = pixels[0].w;
        assert!((0.0..=1.0).contains(&alpha));
        // Strongly absorbing medium saturates.
        assert!(alpha > 0.999);
    }

    #[test]
    fn colored_emission_is_scaled_per_channel() {
        let mut scene = Scene::new();
        scene.ambient = Some(Element::with_color(
            Constant(1.0),
            ConstantColor(Rgb::new(1.0, 0.0, 0.0)),
        ));
        let (pixels, _) = march(&scene, 100);
        assert!(pixels[0].x > 0.0);
        assert_eq!(pixels[0].y, 0.0);
        assert_eq!(pixels[0].z, 0.0);
        // Red equals alpha for a unit-red emitter.
        assert!((pixels[0].x - pixels[0].w).abs() < 1e-3);
    }

    #[test]
    fn positions_advance_with_the_march() {
        let mut scene = Scene::new();
        scene.ambient = Some(Element::new(Constant(0.0)));
        let step = (scene.camera.far() - scene.camera.near()) / 10.0;
        let mut positions = vec![Point3::new(0.0, 0.0, scene.camera.near())];
        let directions = vec![Vector3::new(0.0, 0.0, 1.0)];
        let (_, info) = trace_chunk(&scene, &mut positions, &directions, step, 1e-6);
        let travelled = positions[0].z - scene.camera.near();
        assert!((travelled - info.steps as f32 * step).abs() < 1e-5);
    }

    #[test]
    fn opaque_rays_terminate_early() {
        let mut scene = Scene::new();
        scene.ambient = Some(Element::new(Constant(1e4)));
        scene.scatter = 10.0;
        let (pixels, info) = march(&scene, 100);
        assert!(info.steps < 100);
        assert!((pixels[0].w - 1.0).abs() < 1e-6);
    }

    #[test]
    fn diffuse_needs_a_light() {
        let mut scene = Scene::new();
        scene.diffuse = Some(Element::new(Constant(1.0)));
        let (pixels, _) = march(&scene, 50);
        // Extinction happens, but nothing is emitted toward the camera.
        assert!(pixels[0].w > 0.0);
        assert_eq!(pixels[0].truncate(), Vector3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn occlusion_scales_diffuse_emission() {
        let build = |occlusion: f32| {
            let mut scene = Scene::new();
            scene.diffuse = Some(Element::new(Constant(1.0)));
            scene.add_light(Light::white(Constant(occlusion)));
            scene
        };
        let (lit, _) = march(&build(1.0), 50);
        let (half, _) = march(&build(0.5), 50);
        let (shadowed, _) = march(&build(0.0), 50);
        assert!(lit[0].x > half[0].x && half[0].x > shadowed[0].x);
        assert_eq!(shadowed[0].truncate(), Vector3::new(0.0, 0.0, 0.0));
        // Occlusion does not change extinction.
        assert_eq!(lit[0].w, shadowed[0].w);
        assert!((half[0].x / lit[0].x - 0.5).abs() < 1e-4);
    }

    #[test]
    fn light_color_tints_diffuse_emission() {
        let mut scene = Scene::new();
        scene.diffuse = Some(Element::new(Constant(1.0)));
        scene.add_light(Light::new(Constant(1.0), Rgb::new(0.0, 1.0, 0.0)));
        let (pixels, _) = march(&scene, 50);
        assert_eq!(pixels[0].x, 0.0);
        assert!(pixels[0].y > 0.0);
        assert_eq!(pixels[0].z, 0.0);
    }

    #[test]
    fn vanishing_diffuse_density_leaves_ambient_unchanged() {
        // With a zero-density diffuse channel present, the ambient share is
        // σ_a/σ = 1 and the diffuse exponential is 1, so the image must match
        // the ambient-only scene.
        let mut both = Scene::new();
        both.ambient = Some(Element::new(Constant(1.0)));
        both.diffuse = Some(Element::new(Constant(0.0)));
        both.add_light(Light::white(Constant(1.0)));
        let (both_pixels, _) = march(&both, 100);

        let mut ambient_only = Scene::new();
        ambient_only.ambient = Some(Element::new(Constant(1.0)));
        let (ambient_pixels, _) = march(&ambient_only, 100);

        assert!((both_pixels[0].w - ambient_pixels[0].w).abs() < 1e-6);
        assert!((both_pixels[0].x - ambient_pixels[0].x).abs() < 1e-6);
    }

    #[test]
    fn inhomogeneous_field_attenuates_with_depth() {
        // Density confined to the first half of the depth range.
        let mut scene = Scene::new();
        scene.ambient = Some(Element::new(FnField(|p: Position| {
            if p.z < 1.0 {
                1.0
            } else {
                0.0
            }
        })));
        let (pixels, _) = march(&scene, 200);
        let depth = 1.0 - scene.camera.near();
        let expected_alpha = 1.0 - (-depth).exp();
        assert!((pixels[0].w - expected_alpha).abs() < 1e-2);
    }

    #[test]
    fn trace_info_sums() {
        let a = TraceInfo { rays: 2, steps: 10 };
        let b = TraceInfo { rays: 3, steps: 5 };
        let total: TraceInfo = vec![a, b].into_iter().sum();
        assert_eq!(total, TraceInfo { rays: 5, steps: 15 });
    }

    #[test]
    fn direction_magnitude_is_respected() {
        // Advancement is exactly step · direction even off-axis.
        let mut scene = Scene::new();
        scene.ambient = Some(Element::new(Constant(0.0)));
        let direction = Vector3::new(0.6, 0.0, 0.8);
        let mut positions = vec![Point3::new(0.0, 0.0, 0.0)];
        let (_, info) = trace_chunk(&scene, &mut positions, &[direction], 0.1, 1e-6);
        let travelled = positions[0].to_vec().magnitude();
        assert!((travelled - info.steps as f32 * 0.1).abs() < 1e-5);
    }
}
