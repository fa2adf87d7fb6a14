//! Single-channel float rasters standing in for device textures.
//!
//! Kernels are dispatched row-parallel on the compute task pool. Host code
//! never indexes a raster's storage directly to make a decision; it goes
//! through [`Raster::read_region`], which is the explicit (and fallible)
//! readback boundary. Texel storage is shared copy-on-write so a snapshot can
//! be handed to an async readback while kernels keep writing.

use std::fmt;
use std::sync::Arc;

use bevy::tasks::{ComputeTaskPool, TaskPool};

/// A rectangle of texels, in texel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRegion {
    pub x: u32,
    pub z: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRegion {
    pub const fn new(x: u32, z: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            z,
            width,
            height,
        }
    }

    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intersection with a `width` x `height` texture.
    pub fn clipped_to(&self, width: u32, height: u32) -> Self {
        let x0 = self.x.min(width);
        let z0 = self.z.min(height);
        let x1 = self.x.saturating_add(self.width).min(width);
        let z1 = self.z.saturating_add(self.height).min(height);
        Self::new(x0, z0, x1 - x0, z1 - z0)
    }

    /// Grows the region by `margin` texels on every side, stopping at zero.
    pub fn expanded(&self, margin: u32) -> Self {
        let x = self.x.saturating_sub(margin);
        let z = self.z.saturating_sub(margin);
        Self::new(
            x,
            z,
            self.x + self.width + margin - x,
            self.z + self.height + margin - z,
        )
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x.checked_add(self.width).is_some_and(|end| end <= width)
            && self.z.checked_add(self.height).is_some_and(|end| end <= height)
    }
}

/// Errors raised when reading a raster back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadbackError {
    RegionOutOfBounds {
        region: PixelRegion,
        texture_width: u32,
        texture_height: u32,
    },
}

impl fmt::Display for ReadbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadbackError::RegionOutOfBounds {
                region,
                texture_width,
                texture_height,
            } => write!(
                f,
                "readback region {}x{} at ({}, {}) exceeds texture bounds {}x{}",
                region.width, region.height, region.x, region.z, texture_width, texture_height
            ),
        }
    }
}

impl std::error::Error for ReadbackError {}

#[derive(Debug, Clone, Default)]
pub struct Raster {
    width: u32,
    height: u32,
    texels: Arc<Vec<f32>>,
    revision: u64,
}

// Equality is by contents, the revision only tracks writes.
impl PartialEq for Raster {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.texels == other.texels
    }
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0.0)
    }

    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self {
            width,
            height,
            texels: Arc::new(vec![value; width as usize * height as usize]),
            revision: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texel_count(&self) -> usize {
        self.texels.len()
    }

    pub fn is_allocated(&self) -> bool {
        !self.texels.is_empty()
    }

    /// Bumped by every write, so consumers mirroring the texels can tell
    /// when their copy is stale.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Reallocates to the new size. Previous contents are discarded.
    pub fn resize(&mut self, width: u32, height: u32) {
        let revision = self.revision + 1;
        *self = Self::new(width, height);
        self.revision = revision;
    }

    pub fn clear(&mut self, value: f32) {
        Arc::make_mut(&mut self.texels).fill(value);
        self.revision += 1;
    }

    /// Replaces the whole texture. Missing texels are zero, extra ones are dropped.
    pub fn upload(&mut self, texels: &[f32]) {
        let len = self.width as usize * self.height as usize;
        let storage = Arc::make_mut(&mut self.texels);
        storage.clear();
        storage.extend(texels.iter().copied().take(len));
        storage.resize(len, 0.0);
        self.revision += 1;
    }

    /// Cheap copy sharing storage until either side writes.
    pub fn snapshot(&self) -> Raster {
        self.clone()
    }

    /// Texel lookup with coordinates clamped to the texture edge.
    pub fn texel_clamped(&self, x: i64, z: i64) -> f32 {
        if self.texels.is_empty() {
            return 0.0;
        }
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let z = z.clamp(0, self.height as i64 - 1) as usize;
        self.texels[z * self.width as usize + x]
    }

    /// Bilinear sample at fractional texel coordinates, `None` outside the texture.
    pub fn sample_bilinear(&self, x: f32, z: f32) -> Option<f32> {
        if self.texels.is_empty()
            || x < 0.0
            || z < 0.0
            || x > (self.width - 1) as f32
            || z > (self.height - 1) as f32
        {
            return None;
        }
        let x0 = x.floor();
        let z0 = z.floor();
        let tx = x - x0;
        let tz = z - z0;
        let (x0, z0) = (x0 as i64, z0 as i64);
        let h00 = self.texel_clamped(x0, z0);
        let h10 = self.texel_clamped(x0 + 1, z0);
        let h01 = self.texel_clamped(x0, z0 + 1);
        let h11 = self.texel_clamped(x0 + 1, z0 + 1);
        let top = h00 + (h10 - h00) * tx;
        let bottom = h01 + (h11 - h01) * tx;
        Some(top + (bottom - top) * tz)
    }

    /// Copies a region to the host. Regions reaching past the texture fail
    /// rather than returning partial data.
    pub fn read_region(&self, region: PixelRegion) -> Result<Vec<f32>, ReadbackError> {
        if !region.fits_within(self.width, self.height) {
            return Err(ReadbackError::RegionOutOfBounds {
                region,
                texture_width: self.width,
                texture_height: self.height,
            });
        }
        let width = self.width as usize;
        let mut out = Vec::with_capacity(region.width as usize * region.height as usize);
        for z in region.z..region.z + region.height {
            let start = z as usize * width + region.x as usize;
            out.extend_from_slice(&self.texels[start..start + region.width as usize]);
        }
        Ok(out)
    }

    /// Runs `kernel(x, z, current)` for every texel of `region` (clipped to the
    /// texture) and stores the result. Rows are processed in parallel.
    pub fn dispatch<K>(&mut self, region: PixelRegion, kernel: K)
    where
        K: Fn(u32, u32, f32) -> f32 + Sync,
    {
        let region = region.clipped_to(self.width, self.height);
        if region.is_empty() {
            return;
        }
        self.revision += 1;
        let width = self.width as usize;
        let texels = Arc::make_mut(&mut self.texels);
        let kernel = &kernel;
        let pool = ComputeTaskPool::get_or_init(TaskPool::default);
        pool.scope(|scope| {
            let rows = texels
                .chunks_mut(width)
                .enumerate()
                .skip(region.z as usize)
                .take(region.height as usize);
            for (z, row) in rows {
                scope.spawn(async move {
                    for x in region.x..region.x + region.width {
                        let texel = &mut row[x as usize];
                        *texel = kernel(x, z as u32, *texel);
                    }
                });
            }
        });
    }
}
