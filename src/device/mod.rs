// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

//! The device-side half of the texture contract. Every GL call a texture makes goes
//! through [`TextureDevice`], which is passed explicitly into each operation so that
//! a single owner (the thread holding the GL context) serialises all device access.

mod glow_device;
mod headless;

use std::num::NonZeroU32;

pub use glow_device::GlowDevice;
pub use headless::{HeadlessDevice, UploadRecord};

/// Name of a texture object allocated on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceTexture(pub NonZeroU32);

impl DeviceTexture {
    pub fn name(self) -> u32 {
        self.0.get()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCaps {
    /// `GL_EXT_texture_sRGB_decode`: sRGB internal formats are usable for colour textures.
    pub srgb_decode: bool,
    /// The driver can build the mip chain with `glGenerateMipmap`.
    pub mipmap_generation: bool,
    /// Core profile context: legacy luminance/alpha formats are unavailable.
    pub core_profile: bool,
    pub texture_swizzle: bool,
    pub anisotropic: bool,
    pub max_anisotropy: f32,
}

impl Default for DeviceCaps {
    fn default() -> Self {
        Self {
            srgb_decode: false,
            mipmap_generation: true,
            core_profile: false,
            texture_swizzle: false,
            anisotropic: false,
            max_anisotropy: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    #[default]
    Wrap,
    Mirror,
    Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterOption {
    Point,
    Bilinear,
    Trilinear,
    #[default]
    Anisotropic,
}

/// Sampler parameters applied to the bound texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerState {
    pub address_mode: AddressMode,
    pub filter: FilterOption,
    pub has_mip_maps: bool,
    /// Anisotropy applied for [`FilterOption::Anisotropic`]; 1.0 disables it.
    pub anisotropy: f32,
}

impl SamplerState {
    pub fn wrap_mode(&self) -> u32 {
        match self.address_mode {
            AddressMode::Wrap => glow::REPEAT,
            AddressMode::Mirror => glow::MIRRORED_REPEAT,
            AddressMode::Clamp => glow::CLAMP_TO_EDGE,
        }
    }

    pub fn min_filter(&self) -> u32 {
        match (self.filter, self.has_mip_maps) {
            (FilterOption::Point, false) => glow::NEAREST,
            (FilterOption::Point, true) => glow::NEAREST_MIPMAP_NEAREST,
            (FilterOption::Bilinear, false) => glow::LINEAR,
            (FilterOption::Bilinear, true) => glow::LINEAR_MIPMAP_NEAREST,
            (_, false) => glow::LINEAR,
            (_, true) => glow::LINEAR_MIPMAP_LINEAR,
        }
    }

    pub fn mag_filter(&self) -> u32 {
        match self.filter {
            FilterOption::Point => glow::NEAREST,
            _ => glow::LINEAR,
        }
    }

    pub fn effective_anisotropy(&self) -> f32 {
        if self.filter == FilterOption::Anisotropic {
            self.anisotropy.max(1.0)
        } else {
            1.0
        }
    }
}

/// GL texture operations on the `TEXTURE_2D` target of texture unit 0.
/// Calls act on the currently bound texture, as in GL itself.
pub trait TextureDevice {
    fn caps(&self) -> &DeviceCaps;

    fn create_texture(&mut self) -> Result<DeviceTexture, String>;
    fn delete_texture(&mut self, texture: DeviceTexture);
    fn bind_texture(&mut self, texture: Option<DeviceTexture>);
    fn bound_texture(&self) -> Option<DeviceTexture>;

    /// `GL_TEXTURE_BASE_LEVEL` / `GL_TEXTURE_MAX_LEVEL`.
    fn set_mip_range(&mut self, base_level: i32, max_level: i32);
    fn set_unpack_swap_bytes(&mut self, swap: bool);
    /// Source row length in texels for sub-image uploads; 0 means tightly packed.
    fn set_unpack_row_length(&mut self, texels: i32);
    fn set_swizzle(&mut self, mask: [u32; 4]);
    fn apply_sampler(&mut self, sampler: &SamplerState);

    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &mut self,
        level: i32,
        internal_format: u32,
        width: u32,
        height: u32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    );
    fn compressed_tex_image_2d(&mut self, level: i32, format: u32, width: u32, height: u32, data: &[u8]);
    #[allow(clippy::too_many_arguments)]
    fn tex_sub_image_2d(
        &mut self,
        x_offset: i32,
        y_offset: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    );
    /// Copies a framebuffer rectangle starting at `fb_x`,`fb_y` into level 0 at `x_offset`,`y_offset`.
    fn copy_tex_sub_image_2d(&mut self, x_offset: i32, y_offset: i32, fb_x: i32, fb_y: i32, width: i32, height: i32);
    fn generate_mipmap(&mut self);

    /// Width and height of `level` as the device reports them; zero when the level is absent.
    fn level_size(&mut self, level: i32) -> (i32, i32);
    /// Byte size of `level` when it is stored compressed.
    fn level_compressed_size(&mut self, level: i32) -> Option<usize>;
    fn get_tex_image(&mut self, level: i32, format: u32, ty: u32, out: &mut [u8]);
    fn get_compressed_tex_image(&mut self, level: i32, out: &mut [u8]);
    /// Pops the next queued device error, `glow::NO_ERROR` when the queue is empty.
    fn get_error(&mut self) -> u32;
}
