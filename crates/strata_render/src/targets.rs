//! Scene Targets
//!
//! CPU-side render targets exchanged with the OIT renderer:
//!
//! - [`ColorBuffer`]: premultiplied RGBA image (scene color / resolve output)
//! - [`DepthBuffer`]: window-space depth of the opaque scene, cleared to 1.0
//! - [`SceneTargets`]: the pair the resolve pass composites against

use strata_core::{Result, StrataError};

use crate::fragment::PremultipliedColor;

fn pixel_count(width: u32, height: u32, what: &'static str) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(StrataError::InvalidResolution { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .ok_or(StrataError::AllocationFailed {
            what,
            requested: usize::MAX,
        })
}

fn try_filled<T: Clone>(len: usize, value: T, what: &'static str) -> Result<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| StrataError::AllocationFailed {
            what,
            requested: len,
        })?;
    data.resize(len, value);
    Ok(data)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorBuffer {
    width: u32,
    height: u32,
    pixels: Vec<PremultipliedColor>,
}

impl ColorBuffer {
    pub fn new(width: u32, height: u32, clear: PremultipliedColor) -> Result<Self> {
        let len = pixel_count(width, height, "color buffer")?;
        Ok(Self {
            width,
            height,
            pixels: try_filled(len, clear, "color buffer")?,
        })
    }

    #[inline]
    #[must_use]
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<PremultipliedColor> {
        self.offset(x, y).map(|i| self.pixels[i])
    }

    pub fn set(&mut self, x: u32, y: u32, color: PremultipliedColor) {
        if let Some(i) = self.offset(x, y) {
            self.pixels[i] = color;
        }
    }

    pub fn fill(&mut self, color: PremultipliedColor) {
        self.pixels.fill(color);
    }

    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[PremultipliedColor] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [PremultipliedColor] {
        &mut self.pixels
    }

    /// Raw `f32` RGBA bytes, e.g. for a texture upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// 8-bit straight-alpha RGBA, row-major.
    #[must_use]
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(PremultipliedColor::to_rgba8).collect()
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepthBuffer {
    width: u32,
    height: u32,
    depths: Vec<f32>,
}

impl DepthBuffer {
    pub const CLEAR_DEPTH: f32 = 1.0;

    pub fn new(width: u32, height: u32) -> Result<Self> {
        let len = pixel_count(width, height, "depth buffer")?;
        Ok(Self {
            width,
            height,
            depths: try_filled(len, Self::CLEAR_DEPTH, "depth buffer")?,
        })
    }

    #[inline]
    #[must_use]
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        self.offset(x, y).map(|i| self.depths[i])
    }

    pub fn set(&mut self, x: u32, y: u32, depth: f32) {
        if let Some(i) = self.offset(x, y) {
            self.depths[i] = depth;
        }
    }

    pub fn clear(&mut self) {
        self.depths.fill(Self::CLEAR_DEPTH);
    }

    /// `LessEqual` test of a window-space depth against the stored value.
    #[inline]
    #[must_use]
    pub fn passes(&self, index: usize, depth: f32) -> bool {
        self.depths.get(index).is_none_or(|&scene| depth <= scene)
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }
}

/// Opaque scene color and depth the transparent layers are composited onto.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneTargets {
    pub color: ColorBuffer,
    pub depth: DepthBuffer,
}

impl SceneTargets {
    pub fn new(width: u32, height: u32, background: PremultipliedColor) -> Result<Self> {
        Ok(Self {
            color: ColorBuffer::new(width, height, background)?,
            depth: DepthBuffer::new(width, height)?,
        })
    }

    #[inline]
    #[must_use]
    pub fn resolution(&self) -> (u32, u32) {
        self.color.resolution()
    }

    /// Resets color to `background` and depth to the far plane.
    pub fn clear(&mut self, background: PremultipliedColor) {
        self.color.fill(background);
        self.depth.clear();
    }
}
