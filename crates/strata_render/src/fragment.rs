//! Fragment Data Types
//!
//! - [`PremultipliedColor`]: RGBA whose RGB already carries the alpha factor
//! - [`FragmentRecord`]: one entry of a pixel bucket (normalized depth + color)
//! - [`Fragment`]: a rasterized transparent sample submitted to the gather stage

use std::cmp::Ordering;

use bytemuck::{Pod, Zeroable};
use glam::Vec4;

/// Premultiplied-alpha RGBA color.
///
/// With premultiplied storage the "over" operator reduces to
/// `front + (1 - front.a) * back`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PremultipliedColor(pub Vec4);

impl PremultipliedColor {
    pub const TRANSPARENT: Self = Self(Vec4::ZERO);
    pub const BLACK: Self = Self(Vec4::new(0.0, 0.0, 0.0, 1.0));

    /// Builds a color from components that are already premultiplied.
    #[inline]
    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self(Vec4::new(r, g, b, a))
    }

    /// Premultiplies a straight-alpha color.
    #[inline]
    #[must_use]
    pub fn from_straight(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self(Vec4::new(r * a, g * a, b * a, a))
    }

    #[inline]
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.0.w
    }

    /// Composites `self` in front of `back`.
    #[inline]
    #[must_use]
    pub fn over(self, back: Self) -> Self {
        Self(self.0 + back.0 * (1.0 - self.0.w))
    }

    /// Valid premultiplied colors have alpha in [0, 1] and no channel above alpha.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        const TOLERANCE: f32 = 1e-5;
        let a = self.0.w;
        self.0.is_finite()
            && (0.0..=1.0).contains(&a)
            && self.0.x >= 0.0
            && self.0.y >= 0.0
            && self.0.z >= 0.0
            && self.0.truncate().max_element() <= a + TOLERANCE
    }

    /// Undoes premultiplication. Fully transparent colors map to zero.
    #[must_use]
    pub fn to_straight(&self) -> Vec4 {
        let a = self.0.w;
        if a <= f32::EPSILON {
            Vec4::ZERO
        } else {
            Vec4::new(self.0.x / a, self.0.y / a, self.0.z / a, a)
        }
    }

    /// Quantizes to 8-bit straight-alpha RGBA.
    #[must_use]
    pub fn to_rgba8(&self) -> [u8; 4] {
        let straight = self.to_straight().clamp(Vec4::ZERO, Vec4::ONE) * 255.0;
        [
            straight.x.round() as u8,
            straight.y.round() as u8,
            straight.z.round() as u8,
            straight.w.round() as u8,
        ]
    }

    fn total_cmp(&self, other: &Self) -> Ordering {
        self.0
            .to_array()
            .iter()
            .zip(other.0.to_array().iter())
            .map(|(a, b)| a.total_cmp(b))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl From<Vec4> for PremultipliedColor {
    fn from(value: Vec4) -> Self {
        Self(value)
    }
}

/// One entry of a pixel bucket.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FragmentRecord {
    /// Depth normalized against the frame's depth range, in [0, 1].
    pub depth: f32,
    pub color: PremultipliedColor,
}

impl FragmentRecord {
    #[inline]
    #[must_use]
    pub const fn new(depth: f32, color: PremultipliedColor) -> Self {
        Self { depth, color }
    }

    /// Total order used inside buckets: depth first, then color components.
    ///
    /// Breaking depth ties on color keeps bucket content independent of the
    /// arrival order of equal-depth fragments.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        self.depth
            .total_cmp(&other.depth)
            .then_with(|| self.color.total_cmp(&other.color))
    }

    /// Blends `self` (front) with `back` into one entry at the front depth.
    #[inline]
    #[must_use]
    pub fn merged_with(&self, back: &Self) -> Self {
        Self {
            depth: self.depth,
            color: self.color.over(back.color),
        }
    }
}

/// A rasterized transparent sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub x: u32,
    pub y: u32,
    /// Window-space depth in [0, 1], before normalization.
    pub depth: f32,
    pub color: PremultipliedColor,
}

impl Fragment {
    #[inline]
    #[must_use]
    pub const fn new(x: u32, y: u32, depth: f32, color: PremultipliedColor) -> Self {
        Self { x, y, depth, color }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_over_opaque_front_hides_back() {
        let front = PremultipliedColor::new(1.0, 0.0, 0.0, 1.0);
        let back = PremultipliedColor::new(0.0, 1.0, 0.0, 1.0);
        assert_eq!(front.over(back), front);
    }

    #[test]
    fn test_over_transparent_is_identity() {
        let color = PremultipliedColor::from_straight(0.2, 0.4, 0.6, 0.5);
        assert_eq!(PremultipliedColor::TRANSPARENT.over(color), color);
        assert_eq!(color.over(PremultipliedColor::TRANSPARENT), color);
    }

    #[test]
    fn test_validity() {
        assert!(PremultipliedColor::TRANSPARENT.is_valid());
        assert!(PremultipliedColor::from_straight(1.0, 1.0, 1.0, 0.25).is_valid());
        assert!(!PremultipliedColor::new(0.9, 0.0, 0.0, 0.5).is_valid());
        assert!(!PremultipliedColor::new(0.0, 0.0, 0.0, 1.5).is_valid());
    }

    #[test]
    fn test_sort_cmp_breaks_depth_ties_on_color() {
        let a = FragmentRecord::new(0.5, PremultipliedColor::new(0.1, 0.0, 0.0, 0.5));
        let b = FragmentRecord::new(0.5, PremultipliedColor::new(0.2, 0.0, 0.0, 0.5));
        assert_eq!(a.sort_cmp(&b), Ordering::Less);
        assert_eq!(b.sort_cmp(&a), Ordering::Greater);
        assert_eq!(a.sort_cmp(&a), Ordering::Equal);
    }

    #[test]
    fn test_rgba8_unpremultiplies() {
        let color = PremultipliedColor::from_straight(1.0, 0.0, 0.0, 0.5);
        assert_eq!(color.to_rgba8(), [255, 0, 0, 128]);
    }
}
