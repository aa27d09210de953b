// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use std::collections::HashMap;
use std::ffi::c_void;
use std::num::NonZeroU32;
use std::rc::Rc;

use glow::{HasContext, PixelPackData, PixelUnpackData};

use super::{DeviceCaps, DeviceTexture, SamplerState, TextureDevice};

type GetTexLevelParameterIv = unsafe extern "system" fn(target: u32, level: i32, pname: u32, params: *mut i32);
type GetCompressedTexImage = unsafe extern "system" fn(target: u32, level: i32, img: *mut c_void);

/// [`TextureDevice`] over a live OpenGL context.
///
/// Holds the context through an `Rc`, so a device (and anything borrowing it) cannot
/// leave the thread that owns the context.
pub struct GlowDevice {
    gl: Rc<glow::Context>,
    caps: DeviceCaps,
    bound: Option<DeviceTexture>,
    // glow does not expose these two queries; loaded through the context's loader.
    get_tex_level_parameter_iv: Option<GetTexLevelParameterIv>,
    get_compressed_tex_image: Option<GetCompressedTexImage>,
    // Level sizes as uploaded, used when the level query is unavailable.
    shadow_levels: HashMap<(DeviceTexture, i32), (i32, i32)>,
}

impl GlowDevice {
    /// Wraps an existing context. Level queries fall back to the sizes this device uploaded.
    pub fn new(gl: Rc<glow::Context>) -> Self {
        let caps = unsafe { Self::query_caps(&gl) };
        Self {
            gl,
            caps,
            bound: None,
            get_tex_level_parameter_iv: None,
            get_compressed_tex_image: None,
            shadow_levels: HashMap::new(),
        }
    }

    /// Creates the glow context and the extra entry points from one loader function.
    ///
    /// # Safety
    /// A GL context must be current on this thread and `loader` must return valid
    /// function pointers for it (or null).
    pub unsafe fn from_loader_function<F>(mut loader: F) -> Self
    where
        F: FnMut(&str) -> *const c_void,
    {
        let gl = glow::Context::from_loader_function(&mut loader);
        let mut device = Self::new(Rc::new(gl));

        let level_parameter = loader("glGetTexLevelParameteriv");
        if !level_parameter.is_null() {
            device.get_tex_level_parameter_iv =
                Some(std::mem::transmute::<*const c_void, GetTexLevelParameterIv>(level_parameter));
        }
        let compressed_image = loader("glGetCompressedTexImage");
        if !compressed_image.is_null() {
            device.get_compressed_tex_image =
                Some(std::mem::transmute::<*const c_void, GetCompressedTexImage>(compressed_image));
        }
        device
    }

    pub fn context(&self) -> &Rc<glow::Context> {
        &self.gl
    }

    unsafe fn query_caps(gl: &glow::Context) -> DeviceCaps {
        let version = gl.version();
        let extensions = gl.supported_extensions();
        let at_least = |major: u32, minor: u32| {
            !version.is_embedded && (version.major, version.minor) >= (major, minor)
        };

        let core_profile = at_least(3, 2)
            && (gl.get_parameter_i32(glow::CONTEXT_PROFILE_MASK) as u32
                & glow::CONTEXT_CORE_PROFILE_BIT)
                != 0;
        let anisotropic = extensions.contains("GL_EXT_texture_filter_anisotropic")
            || extensions.contains("GL_ARB_texture_filter_anisotropic");
        let max_anisotropy = if anisotropic {
            gl.get_parameter_f32(glow::MAX_TEXTURE_MAX_ANISOTROPY)
        } else {
            1.0
        };

        let caps = DeviceCaps {
            srgb_decode: extensions.contains("GL_EXT_texture_sRGB_decode"),
            mipmap_generation: at_least(3, 0) || extensions.contains("GL_ARB_framebuffer_object"),
            core_profile,
            texture_swizzle: at_least(3, 3) || extensions.contains("GL_ARB_texture_swizzle"),
            anisotropic,
            max_anisotropy,
        };
        log::debug!(
            "GL {}.{} texture caps: {:?}",
            version.major,
            version.minor,
            caps
        );
        caps
    }

    fn native(texture: DeviceTexture) -> glow::NativeTexture {
        glow::NativeTexture(texture.0)
    }

    fn record_level(&mut self, level: i32, width: u32, height: u32) {
        if let Some(texture) = self.bound {
            self.shadow_levels
                .insert((texture, level), (width as i32, height as i32));
        }
    }
}

impl TextureDevice for GlowDevice {
    fn caps(&self) -> &DeviceCaps {
        &self.caps
    }

    fn create_texture(&mut self) -> Result<DeviceTexture, String> {
        let texture = unsafe { self.gl.create_texture()? };
        Ok(DeviceTexture(texture.0))
    }

    fn delete_texture(&mut self, texture: DeviceTexture) {
        if self.bound == Some(texture) {
            self.bind_texture(None);
        }
        self.shadow_levels.retain(|(owner, _), _| *owner != texture);
        unsafe { self.gl.delete_texture(Self::native(texture)) };
    }

    fn bind_texture(&mut self, texture: Option<DeviceTexture>) {
        unsafe {
            self.gl
                .bind_texture(glow::TEXTURE_2D, texture.map(Self::native));
        }
        self.bound = texture;
    }

    fn bound_texture(&self) -> Option<DeviceTexture> {
        self.bound
    }

    fn set_mip_range(&mut self, base_level: i32, max_level: i32) {
        unsafe {
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_BASE_LEVEL, base_level);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAX_LEVEL, max_level);
        }
    }

    fn set_unpack_swap_bytes(&mut self, swap: bool) {
        unsafe { self.gl.pixel_store_bool(glow::UNPACK_SWAP_BYTES, swap) };
    }

    fn set_unpack_row_length(&mut self, texels: i32) {
        unsafe { self.gl.pixel_store_i32(glow::UNPACK_ROW_LENGTH, texels) };
    }

    fn set_swizzle(&mut self, mask: [u32; 4]) {
        let mask = mask.map(|channel| channel as i32);
        unsafe {
            self.gl
                .tex_parameter_i32_slice(glow::TEXTURE_2D, glow::TEXTURE_SWIZZLE_RGBA, &mask);
        }
    }

    fn apply_sampler(&mut self, sampler: &SamplerState) {
        unsafe {
            let gl = &self.gl;
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, sampler.wrap_mode() as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, sampler.wrap_mode() as i32);
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                sampler.min_filter() as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                sampler.mag_filter() as i32,
            );
            if self.caps.anisotropic {
                let anisotropy = sampler.effective_anisotropy().min(self.caps.max_anisotropy);
                gl.tex_parameter_f32(glow::TEXTURE_2D, glow::TEXTURE_MAX_ANISOTROPY, anisotropy);
            }
        }
    }

    fn tex_image_2d(
        &mut self,
        level: i32,
        internal_format: u32,
        width: u32,
        height: u32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    ) {
        unsafe {
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                level,
                internal_format as i32,
                width as i32,
                height as i32,
                0,
                format,
                ty,
                PixelUnpackData::Slice(pixels),
            );
        }
        self.record_level(level, width, height);
    }

    fn compressed_tex_image_2d(&mut self, level: i32, format: u32, width: u32, height: u32, data: &[u8]) {
        unsafe {
            self.gl.compressed_tex_image_2d(
                glow::TEXTURE_2D,
                level,
                format as i32,
                width as i32,
                height as i32,
                0,
                data.len() as i32,
                data,
            );
        }
        self.record_level(level, width, height);
    }

    fn tex_sub_image_2d(
        &mut self,
        x_offset: i32,
        y_offset: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    ) {
        unsafe {
            self.gl.tex_sub_image_2d(
                glow::TEXTURE_2D,
                0,
                x_offset,
                y_offset,
                width,
                height,
                format,
                ty,
                PixelUnpackData::Slice(Some(pixels)),
            );
        }
    }

    fn copy_tex_sub_image_2d(&mut self, x_offset: i32, y_offset: i32, fb_x: i32, fb_y: i32, width: i32, height: i32) {
        unsafe {
            self.gl
                .copy_tex_sub_image_2d(glow::TEXTURE_2D, 0, x_offset, y_offset, fb_x, fb_y, width, height);
        }
    }

    fn generate_mipmap(&mut self) {
        unsafe { self.gl.generate_mipmap(glow::TEXTURE_2D) };
        let Some(texture) = self.bound else {
            return;
        };
        let Some(&(mut width, mut height)) = self.shadow_levels.get(&(texture, 0)) else {
            return;
        };
        let mut level = 0;
        while width > 1 || height > 1 {
            width = (width >> 1).max(1);
            height = (height >> 1).max(1);
            level += 1;
            self.shadow_levels.insert((texture, level), (width, height));
        }
    }

    fn level_size(&mut self, level: i32) -> (i32, i32) {
        if let Some(query) = self.get_tex_level_parameter_iv {
            let (mut width, mut height) = (0, 0);
            unsafe {
                query(glow::TEXTURE_2D, level, glow::TEXTURE_WIDTH, &mut width);
                query(glow::TEXTURE_2D, level, glow::TEXTURE_HEIGHT, &mut height);
            }
            return (width, height);
        }
        self.bound
            .and_then(|texture| self.shadow_levels.get(&(texture, level)).copied())
            .unwrap_or((0, 0))
    }

    fn level_compressed_size(&mut self, level: i32) -> Option<usize> {
        let query = self.get_tex_level_parameter_iv?;
        self.get_compressed_tex_image?;
        let (mut compressed, mut size) = (0, 0);
        unsafe {
            query(glow::TEXTURE_2D, level, glow::TEXTURE_COMPRESSED, &mut compressed);
            if compressed == 0 {
                return None;
            }
            query(
                glow::TEXTURE_2D,
                level,
                glow::TEXTURE_COMPRESSED_IMAGE_SIZE,
                &mut size,
            );
        }
        usize::try_from(size).ok()
    }

    fn get_tex_image(&mut self, level: i32, format: u32, ty: u32, out: &mut [u8]) {
        unsafe {
            self.gl.get_tex_image(
                glow::TEXTURE_2D,
                level,
                format,
                ty,
                PixelPackData::Slice(Some(out)),
            );
        }
    }

    fn get_compressed_tex_image(&mut self, level: i32, out: &mut [u8]) {
        if let Some(read) = self.get_compressed_tex_image {
            unsafe { read(glow::TEXTURE_2D, level, out.as_mut_ptr() as *mut c_void) };
        }
    }

    fn get_error(&mut self) -> u32 {
        unsafe { self.gl.get_error() }
    }
}

/// Lets a name allocated elsewhere be adopted as a texture's device handle.
impl From<glow::NativeTexture> for DeviceTexture {
    fn from(texture: glow::NativeTexture) -> Self {
        DeviceTexture(texture.0)
    }
}

impl TryFrom<u32> for DeviceTexture {
    type Error = ();

    fn try_from(name: u32) -> Result<Self, Self::Error> {
        NonZeroU32::new(name).map(DeviceTexture).ok_or(())
    }
}
