// Copyright 2021 The volray Authors under the terms of the MIT License as detailed
// in the accompanying file README.md or <https://opensource.org/licenses/MIT>.

//! Mathematical value types for volumetric rendering: coordinate aliases,
//! homogeneous points, and NaN-rejecting color types.

use cgmath::{Vector3, Vector4};
pub use ordered_float::NotNan;
use std::fmt;
use std::ops::Mul;

/// Scalar type used for all world-space and grid-space arithmetic.
///
/// Voxel *storage* is [`f64`] (see [`crate::grid::Grid`]); it is promoted on
/// write and truncated on read, so interpolation runs entirely in `f32`.
pub type FreeCoordinate = f32;

/// Integer type used for voxel lattice indices.
pub type GridCoordinate = usize;

/// A homogeneous coordinate: a world- or grid-space point when `w == 1`,
/// a direction when `w == 0`.
pub type Position = Vector4<FreeCoordinate>;

/// Constructs a homogeneous point (`w = 1`) from Cartesian components.
#[inline]
pub fn point(x: FreeCoordinate, y: FreeCoordinate, z: FreeCoordinate) -> Position {
    Vector4::new(x, y, z, 1.0)
}

/// Iterator over `count` evenly spaced values covering `[start, end]`
/// inclusive. A single-element span yields just `start`.
pub fn linspace(
    start: FreeCoordinate,
    end: FreeCoordinate,
    count: usize,
) -> impl Iterator<Item = FreeCoordinate> {
    let span = end - start;
    (0..count).map(move |i| {
        if count < 2 {
            start
        } else {
            start + span * (i as FreeCoordinate) / ((count - 1) as FreeCoordinate)
        }
    })
}

/// Wraps a channel literal whose finiteness is known at the call site.
///
/// Safety: must only be invoked with non-NaN constants.
const fn channel(value: f32) -> NotNan<f32> {
    unsafe { NotNan::unchecked_new(value) }
}

/// A linear RGB color with finite `f32` channels.
///
/// Channel values nominally cover `[0, 1]`, but nothing stops a brighter
/// light source from exceeding one. NaN is refused at construction, which is
/// what makes colors comparable and hashable.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Rgb {
    red: NotNan<f32>,
    green: NotNan<f32>,
    blue: NotNan<f32>,
}

impl Rgb {
    /// All channels zero.
    pub const BLACK: Rgb = Rgb {
        red: channel(0.0),
        green: channel(0.0),
        blue: channel(0.0),
    };
    /// All channels one. Brighter colors exist; this is the nominal white.
    pub const WHITE: Rgb = Rgb {
        red: channel(1.0),
        green: channel(1.0),
        blue: channel(1.0),
    };

    /// Builds a color from channel values. Panics on NaN; values outside
    /// `[0, 1]` are kept as given.
    #[inline]
    pub fn new(red: f32, green: f32, blue: f32) -> Self {
        Self {
            red: NotNan::new(red).expect("color channel is NaN"),
            green: NotNan::new(green).expect("color channel is NaN"),
            blue: NotNan::new(blue).expect("color channel is NaN"),
        }
    }

    /// The red channel.
    #[inline]
    pub fn red(self) -> f32 {
        self.red.into_inner()
    }
    /// The green channel.
    #[inline]
    pub fn green(self) -> f32 {
        self.green.into_inner()
    }
    /// The blue channel.
    #[inline]
    pub fn blue(self) -> f32 {
        self.blue.into_inner()
    }

    /// Attaches an opacity, producing an [`Rgba`]. Panics if `alpha` is NaN.
    #[inline]
    pub fn with_alpha(self, alpha: f32) -> Rgba {
        Rgba {
            color: self,
            alpha: NotNan::new(alpha).expect("alpha channel is NaN"),
        }
    }
}

/// An [`Rgb`] color plus an opacity channel.
///
/// The opacity is not premultiplied into the color. In rendered output it is
/// the accumulated `1 − T` of the ray that produced the pixel.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Rgba {
    color: Rgb,
    alpha: NotNan<f32>,
}

impl Rgba {
    /// Builds a color from channel values. Panics on NaN.
    #[inline]
    pub fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Rgb::new(red, green, blue).with_alpha(alpha)
    }

    /// The red channel.
    #[inline]
    pub fn red(self) -> f32 {
        self.color.red()
    }
    /// The green channel.
    #[inline]
    pub fn green(self) -> f32 {
        self.color.green()
    }
    /// The blue channel.
    #[inline]
    pub fn blue(self) -> f32 {
        self.color.blue()
    }
    /// The opacity channel.
    #[inline]
    pub fn alpha(self) -> f32 {
        self.alpha.into_inner()
    }

    /// True when the opacity is zero or negative.
    #[inline]
    pub fn is_transparent(self) -> bool {
        self.alpha() <= 0.0
    }
    /// True when the opacity is one or more.
    #[inline]
    pub fn is_opaque(self) -> bool {
        self.alpha() >= 1.0
    }

    /// Drops the opacity channel.
    #[inline]
    pub fn to_rgb(self) -> Rgb {
        self.color
    }
}

impl From<Rgb> for Vector3<f32> {
    fn from(value: Rgb) -> Self {
        Vector3::new(value.red(), value.green(), value.blue())
    }
}
impl From<Rgba> for Vector4<f32> {
    fn from(value: Rgba) -> Self {
        Vector4::new(value.red(), value.green(), value.blue(), value.alpha())
    }
}

/// Channelwise product, for tinting one color by another.
impl Mul<Rgb> for Rgb {
    type Output = Self;
    fn mul(self, other: Rgb) -> Self {
        Self {
            red: self.red * other.red,
            green: self.green * other.green,
            blue: self.blue * other.blue,
        }
    }
}

/// Scales every channel. Panics if the factor is NaN.
impl Mul<f32> for Rgb {
    type Output = Self;
    fn mul(self, factor: f32) -> Self {
        let factor = NotNan::new(factor).expect("scale factor is NaN");
        Self {
            red: self.red * factor,
            green: self.green * factor,
            blue: self.blue * factor,
        }
    }
}

impl fmt::Debug for Rgb {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "Rgb({}, {}, {})",
            self.red(),
            self.green(),
            self.blue()
        )
    }
}
impl fmt::Debug for Rgba {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "Rgba({}, {}, {}, {})",
            self.red(),
            self.green(),
            self.blue(),
            self.alpha()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_endpoints() {
        let values: Vec<f32> = linspace(0.0, 1.0, 5).collect();
        assert_eq!(values, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn linspace_degenerate() {
        assert_eq!(linspace(0.0, 1.0, 1).collect::<Vec<f32>>(), vec![0.0]);
        assert_eq!(linspace(0.0, 1.0, 0).count(), 0);
    }

    #[test]
    fn point_is_homogeneous() {
        assert_eq!(point(1.0, 2.0, 3.0), Vector4::new(1.0, 2.0, 3.0, 1.0));
    }

    #[test]
    fn color_constants() {
        assert_eq!(Rgb::BLACK, Rgb::new(0.0, 0.0, 0.0));
        assert_eq!(Rgb::WHITE, Rgb::new(1.0, 1.0, 1.0));
    }

    #[test]
    #[should_panic(expected = "color channel is NaN")]
    fn rgb_rejects_nan() {
        Rgb::new(0.0, f32::NAN, 0.0);
    }

    #[test]
    #[should_panic(expected = "alpha channel is NaN")]
    fn alpha_rejects_nan() {
        Rgb::WHITE.with_alpha(f32::NAN);
    }

    #[test]
    fn rgb_tinting() {
        assert_eq!(
            Rgb::new(0.25, 2.0, 1.0) * Rgb::new(2.0, 0.5, 0.0),
            Rgb::new(0.5, 1.0, 0.0)
        );
    }

    #[test]
    fn rgb_scaling() {
        assert_eq!(Rgb::new(0.5, 1.0, 0.0) * 0.5, Rgb::new(0.25, 0.5, 0.0));
    }

    #[test]
    fn alpha_round_trip() {
        let color = Rgb::new(0.75, 0.5, 0.125);
        let with_alpha = color.with_alpha(0.25);
        assert_eq!(with_alpha.to_rgb(), color);
        assert_eq!(with_alpha.alpha(), 0.25);
    }

    #[test]
    fn opacity_predicates() {
        assert!(Rgb::BLACK.with_alpha(0.0).is_transparent());
        assert!(Rgb::WHITE.with_alpha(1.5).is_opaque());
        let halfway = Rgba::new(0.0, 0.0, 0.0, 0.5);
        assert!(!halfway.is_transparent());
        assert!(!halfway.is_opaque());
    }

    #[test]
    fn vector_conversions() {
        assert_eq!(
            Vector3::from(Rgb::new(0.75, 0.5, 0.125)),
            Vector3::new(0.75, 0.5, 0.125)
        );
        assert_eq!(
            Vector4::from(Rgba::new(0.75, 0.5, 0.125, 1.0)),
            Vector4::new(0.75, 0.5, 0.125, 1.0)
        );
    }

    #[test]
    fn debug_output_lists_channels() {
        assert_eq!(
            format!("{:?}", Rgb::new(0.5, 0.25, 1.0)),
            "Rgb(0.5, 0.25, 1)"
        );
        assert_eq!(
            format!("{:?}", Rgba::new(0.0, 0.75, 0.5, 0.25)),
            "Rgba(0, 0.75, 0.5, 0.25)"
        );
    }
}
