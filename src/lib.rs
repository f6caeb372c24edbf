// Copyright 2021 The volray Authors under the terms of the MIT License as detailed
// in the accompanying file README.md or <https://opensource.org/licenses/MIT>.

//! Volumetric renderer: rays cast from a pinhole camera are marched through
//! scalar/vector fields under an emission-absorption light transport model
//! (with optional single-scatter diffuse lighting), producing linear RGBA
//! images.
//!
//! Fields are compositional: a [`grid::Grid`] of voxels with an affine world
//! placement and trilinear interpolation, an analytic closure over world
//! space, or a constant. All of them sit behind the batched [`field`]
//! contract the integrator marches against. Rendering is parallel over
//! contiguous ray chunks; see [`scene::Scene::render`] and [`peval::peval`].

#![allow(clippy::collapsible_if)]
#![warn(clippy::cast_lossless)]

pub mod camera;
pub mod field;
pub mod geometry;
pub mod grid;
pub mod homogeneous;
pub mod math;
pub mod peval;
pub mod raytracer;
pub mod scene;
