//! Per-Frame Depth Range
//!
//! Fragments are stored with depths normalized against the window-space
//! depth range actually covered by the transparent geometry this frame.
//! [`BoundingBoxTracker`] derives that range by projecting the geometry's
//! bounding box through the camera.

use glam::Vec4;
use strata_core::{BoundingBox, Camera};

/// Window-space depth range used to normalize fragment depths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Default for FrameState {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FrameState {
    /// Full window-space range, used whenever no usable bounds exist.
    pub const DEFAULT: Self = Self {
        min_depth: 0.0,
        max_depth: 1.0,
    };

    /// Builds a range, falling back to [`FrameState::DEFAULT`] when the range
    /// is empty, inverted or non-finite.
    #[must_use]
    pub fn new(min_depth: f32, max_depth: f32) -> Self {
        let valid = min_depth.is_finite()
            && max_depth.is_finite()
            && max_depth - min_depth > f32::EPSILON;
        if valid {
            Self {
                min_depth,
                max_depth,
            }
        } else {
            log::debug!("Degenerate depth range [{min_depth}, {max_depth}], using [0, 1]");
            Self::DEFAULT
        }
    }

    /// Maps a window-space depth into [0, 1] relative to this range.
    #[inline]
    #[must_use]
    pub fn normalize(&self, depth: f32) -> f32 {
        ((depth - self.min_depth) / (self.max_depth - self.min_depth)).clamp(0.0, 1.0)
    }
}

/// Tracks the depth range of the transparent geometry for the current frame.
#[derive(Debug, Clone, Default)]
pub struct BoundingBoxTracker {
    frame: FrameState,
}

impl BoundingBoxTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn frame_state(&self) -> FrameState {
        self.frame
    }

    /// Projects the 8 corners of `bounding_box` through the camera's
    /// view-projection and publishes the resulting depth range.
    ///
    /// Corners behind the eye clamp to the near plane. A degenerate box
    /// falls back to the default range.
    pub fn set_screen_space_bounding_box(
        &mut self,
        bounding_box: &BoundingBox,
        camera: &Camera,
    ) -> FrameState {
        if bounding_box.is_degenerate() {
            log::debug!("Degenerate transparency bounds {bounding_box:?}, using [0, 1]");
            self.frame = FrameState::DEFAULT;
            return self.frame;
        }

        let view_projection = camera.view_projection_matrix();
        let mut min_depth = f32::INFINITY;
        let mut max_depth = f32::NEG_INFINITY;

        for corner in bounding_box.corners() {
            let clip = view_projection * Vec4::from((corner, 1.0));
            let depth = if clip.w <= f32::EPSILON {
                0.0
            } else {
                (clip.z / clip.w).clamp(0.0, 1.0)
            };
            min_depth = min_depth.min(depth);
            max_depth = max_depth.max(depth);
        }

        self.frame = FrameState::new(min_depth, max_depth);
        self.frame
    }
}
