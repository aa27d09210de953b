// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

//! Static format table: bits per texel, component counts and image region sizes
//! for every pixel format a texture can be uploaded with.

use crate::error::InvariantViolation;

/// Compatibility-profile enums that glow does not export.
pub mod gl_legacy {
    pub const COLOR_INDEX: u32 = 0x1900;
    pub const ALPHA8: u32 = 0x803C;
    pub const LUMINANCE8: u32 = 0x8040;
    pub const LUMINANCE8_ALPHA8: u32 = 0x8045;
    pub const COMPRESSED_ALPHA: u32 = 0x84E9;
    pub const COMPRESSED_LUMINANCE: u32 = 0x84EA;
    pub const COMPRESSED_LUMINANCE_ALPHA: u32 = 0x84EB;
}

/// Primary (client-side) pixel format of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Dxt1,
    Dxt1SrgbAlpha,
    Dxt3,
    Dxt3SrgbAlpha,
    Dxt5,
    Dxt5SrgbAlpha,
    Luminance,
    Alpha,
    ColorIndex,
    LuminanceAlpha,
    Rgb,
    Srgb,
    Rgb8,
    Rgba,
    SrgbAlpha,
    /// Used for media textures streamed in BGRA order.
    Bgra,
}

impl PixelFormat {
    pub fn from_gl_enum(value: u32) -> Result<Self, InvariantViolation> {
        let format = match value {
            glow::COMPRESSED_RGBA_S3TC_DXT1_EXT => PixelFormat::Dxt1,
            glow::COMPRESSED_SRGB_ALPHA_S3TC_DXT1_EXT => PixelFormat::Dxt1SrgbAlpha,
            glow::COMPRESSED_RGBA_S3TC_DXT3_EXT => PixelFormat::Dxt3,
            glow::COMPRESSED_SRGB_ALPHA_S3TC_DXT3_EXT => PixelFormat::Dxt3SrgbAlpha,
            glow::COMPRESSED_RGBA_S3TC_DXT5_EXT => PixelFormat::Dxt5,
            glow::COMPRESSED_SRGB_ALPHA_S3TC_DXT5_EXT => PixelFormat::Dxt5SrgbAlpha,
            glow::LUMINANCE => PixelFormat::Luminance,
            glow::ALPHA => PixelFormat::Alpha,
            gl_legacy::COLOR_INDEX => PixelFormat::ColorIndex,
            glow::LUMINANCE_ALPHA => PixelFormat::LuminanceAlpha,
            glow::RGB => PixelFormat::Rgb,
            glow::SRGB => PixelFormat::Srgb,
            glow::RGB8 => PixelFormat::Rgb8,
            glow::RGBA => PixelFormat::Rgba,
            glow::SRGB_ALPHA => PixelFormat::SrgbAlpha,
            glow::BGRA => PixelFormat::Bgra,
            other => return Err(InvariantViolation::UnknownFormat(other)),
        };
        Ok(format)
    }

    pub fn gl_enum(self) -> u32 {
        match self {
            PixelFormat::Dxt1 => glow::COMPRESSED_RGBA_S3TC_DXT1_EXT,
            PixelFormat::Dxt1SrgbAlpha => glow::COMPRESSED_SRGB_ALPHA_S3TC_DXT1_EXT,
            PixelFormat::Dxt3 => glow::COMPRESSED_RGBA_S3TC_DXT3_EXT,
            PixelFormat::Dxt3SrgbAlpha => glow::COMPRESSED_SRGB_ALPHA_S3TC_DXT3_EXT,
            PixelFormat::Dxt5 => glow::COMPRESSED_RGBA_S3TC_DXT5_EXT,
            PixelFormat::Dxt5SrgbAlpha => glow::COMPRESSED_SRGB_ALPHA_S3TC_DXT5_EXT,
            PixelFormat::Luminance => glow::LUMINANCE,
            PixelFormat::Alpha => glow::ALPHA,
            PixelFormat::ColorIndex => gl_legacy::COLOR_INDEX,
            PixelFormat::LuminanceAlpha => glow::LUMINANCE_ALPHA,
            PixelFormat::Rgb => glow::RGB,
            PixelFormat::Srgb => glow::SRGB,
            PixelFormat::Rgb8 => glow::RGB8,
            PixelFormat::Rgba => glow::RGBA,
            PixelFormat::SrgbAlpha => glow::SRGB_ALPHA,
            PixelFormat::Bgra => glow::BGRA,
        }
    }

    pub fn bits_per_texel(self) -> u32 {
        match self {
            PixelFormat::Dxt1 | PixelFormat::Dxt1SrgbAlpha => 4,
            PixelFormat::Dxt3 | PixelFormat::Dxt3SrgbAlpha => 8,
            PixelFormat::Dxt5 | PixelFormat::Dxt5SrgbAlpha => 8,
            PixelFormat::Luminance | PixelFormat::Alpha | PixelFormat::ColorIndex => 8,
            PixelFormat::LuminanceAlpha => 16,
            PixelFormat::Rgb | PixelFormat::Srgb | PixelFormat::Rgb8 => 24,
            PixelFormat::Rgba | PixelFormat::SrgbAlpha | PixelFormat::Bgra => 32,
        }
    }

    pub fn components(self) -> u8 {
        match self {
            PixelFormat::Dxt1 | PixelFormat::Dxt1SrgbAlpha => 3,
            PixelFormat::Dxt3 | PixelFormat::Dxt3SrgbAlpha => 4,
            PixelFormat::Dxt5 | PixelFormat::Dxt5SrgbAlpha => 4,
            PixelFormat::Luminance | PixelFormat::Alpha | PixelFormat::ColorIndex => 1,
            PixelFormat::LuminanceAlpha => 2,
            PixelFormat::Rgb | PixelFormat::Srgb | PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba | PixelFormat::SrgbAlpha | PixelFormat::Bgra => 4,
        }
    }

    pub fn is_compressed(self) -> bool {
        matches!(
            self,
            PixelFormat::Dxt1
                | PixelFormat::Dxt1SrgbAlpha
                | PixelFormat::Dxt3
                | PixelFormat::Dxt3SrgbAlpha
                | PixelFormat::Dxt5
                | PixelFormat::Dxt5SrgbAlpha
        )
    }

    /// True for the formats a pick mask can be built from.
    pub fn is_rgba_family(self) -> bool {
        matches!(self, PixelFormat::Rgba | PixelFormat::SrgbAlpha)
    }

    /// Size in bytes of a `width` x `height` region, rounded up to 4-byte alignment.
    /// Block-compressed formats cover whole 4x4 blocks.
    pub fn region_bytes(self, width: u32, height: u32) -> usize {
        let (width, height) = if self.is_compressed() {
            (round_up_to_block(width), round_up_to_block(height))
        } else {
            (width, height)
        };
        let bits = width as usize * height as usize * self.bits_per_texel() as usize;
        let bytes = (bits + 7) >> 3;
        (bytes + 3) & !3
    }
}

fn round_up_to_block(dim: u32) -> u32 {
    dim.max(1).div_ceil(4) * 4
}

/// Bits per texel of a raw GL format enum. Unknown formats are an invariant violation.
pub fn data_format_bits(format: u32) -> Result<u32, InvariantViolation> {
    PixelFormat::from_gl_enum(format).map(PixelFormat::bits_per_texel)
}

pub fn data_format_bytes(format: u32, width: u32, height: u32) -> Result<usize, InvariantViolation> {
    PixelFormat::from_gl_enum(format).map(|format| format.region_bytes(width, height))
}

pub fn data_format_components(format: u32) -> Result<u8, InvariantViolation> {
    PixelFormat::from_gl_enum(format).map(PixelFormat::components)
}

/// Generic driver-compressed counterpart of an uncompressed internal format.
pub fn compressed_internal_format(internal_format: u32) -> Option<u32> {
    let compressed = match internal_format {
        glow::RED | glow::R8 => glow::COMPRESSED_RED,
        glow::RG | glow::RG8 => glow::COMPRESSED_RG,
        glow::RGB | glow::RGB8 => glow::COMPRESSED_RGB,
        glow::SRGB | glow::SRGB8 => glow::COMPRESSED_SRGB,
        glow::RGBA | glow::RGBA8 => glow::COMPRESSED_RGBA,
        glow::SRGB_ALPHA | glow::SRGB8_ALPHA8 => glow::COMPRESSED_SRGB_ALPHA,
        glow::LUMINANCE | gl_legacy::LUMINANCE8 => gl_legacy::COMPRESSED_LUMINANCE,
        glow::LUMINANCE_ALPHA | gl_legacy::LUMINANCE8_ALPHA8 => {
            gl_legacy::COMPRESSED_LUMINANCE_ALPHA
        }
        glow::ALPHA | gl_legacy::ALPHA8 => gl_legacy::COMPRESSED_ALPHA,
        _ => return None,
    };
    Some(compressed)
}
