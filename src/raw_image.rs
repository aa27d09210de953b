// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use std::collections::TryReserveError;

use image::{DynamicImage, GenericImageView};

/// Decoded CPU-side pixel buffer, tightly packed rows, `components` bytes per texel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawImage {
    width: u32,
    height: u32,
    components: u8,
    data: Vec<u8>,
}

impl RawImage {
    pub fn new(width: u32, height: u32, components: u8, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            components,
            data,
        }
    }

    /// Every texel set to `texel`, which must hold `components` bytes.
    pub fn filled(width: u32, height: u32, texel: &[u8]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * texel.len());
        for _ in 0..count {
            data.extend_from_slice(texel);
        }
        Self::new(width, height, texel.len() as u8, data)
    }

    pub fn from_dynamic_image(img: &DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        match img {
            DynamicImage::ImageLuma8(buf) => Self::new(width, height, 1, buf.as_raw().clone()),
            DynamicImage::ImageLumaA8(buf) => Self::new(width, height, 2, buf.as_raw().clone()),
            DynamicImage::ImageRgb8(buf) => Self::new(width, height, 3, buf.as_raw().clone()),
            _ => Self::new(width, height, 4, img.to_rgba8().into_raw()),
        }
    }

    /// Replaces the contents with a zeroed buffer of `size` bytes.
    /// Allocation failure leaves the image empty instead of aborting.
    pub fn allocate_data_size(
        &mut self,
        width: u32,
        height: u32,
        components: u8,
        size: usize,
    ) -> Result<(), TryReserveError> {
        self.delete_data();
        let mut data = Vec::new();
        data.try_reserve_exact(size)?;
        data.resize(size, 0);
        self.width = width;
        self.height = height;
        self.components = components;
        self.data = data;
        Ok(())
    }

    pub fn allocate_data(&mut self, width: u32, height: u32, components: u8) -> Result<(), TryReserveError> {
        let size = width as usize * height as usize * components as usize;
        self.allocate_data_size(width, height, components, size)
    }

    pub fn delete_data(&mut self) {
        self.data = Vec::new();
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn components(&self) -> u8 {
        self.components
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn is_buffer_valid(&self) -> bool {
        !self.data.is_empty()
            && self.width > 0
            && self.height > 0
            && (1..=4).contains(&self.components)
    }
}

/// Box-filters `src` (a `width` x `height` image) down one level.
/// Each output texel averages the 2x2 block it covers; odd or unit edges reuse the last row/column.
pub fn generate_mip(
    src: &[u8],
    width: u32,
    height: u32,
    components: u8,
) -> Result<Vec<u8>, TryReserveError> {
    let comps = components as usize;
    let (width, height) = (width as usize, height as usize);
    let dst_width = (width / 2).max(1);
    let dst_height = (height / 2).max(1);

    let mut dst = Vec::new();
    dst.try_reserve_exact(dst_width * dst_height * comps)?;

    for y in 0..dst_height {
        let y0 = (y * 2).min(height - 1);
        let y1 = (y * 2 + 1).min(height - 1);
        for x in 0..dst_width {
            let x0 = (x * 2).min(width - 1);
            let x1 = (x * 2 + 1).min(width - 1);
            for c in 0..comps {
                let sample = |sx: usize, sy: usize| src[(sy * width + sx) * comps + c] as u32;
                let total = sample(x0, y0) + sample(x1, y0) + sample(x0, y1) + sample(x1, y1);
                dst.push((total >> 2) as u8);
            }
        }
    }
    Ok(dst)
}
