// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

//! A single GL texture: its size and discard-level bookkeeping, format resolution,
//! the mip upload pipeline and the alpha/pick-mask side data derived from level 0.

use crate::alpha::{analyze_alpha, AlphaLayout};
use crate::device::{AddressMode, DeviceTexture, FilterOption, SamplerState, TextureDevice};
use crate::error::{InvariantViolation, TextureError};
use crate::format::{compressed_internal_format, data_format_bytes, gl_legacy, PixelFormat};
use crate::memory::{TextureCategory, TextureStats};
use crate::pick_mask::{mask_hit, PickMask};
use crate::raw_image::{generate_mip, RawImage};
use crate::scope_timer::ScopeTimer;
use crate::settings::TextureSettings;

/// Ceiling for `max_discard_level`.
pub const MAX_DISCARD_LEVEL: i32 = 12;

/// Seconds a texture counts as recently bound.
pub const MIN_TEXTURE_LIFETIME: f32 = 10.0;

/// Shared state every texture operation reads or updates: memory counters and options.
#[derive(Debug, Clone, Default)]
pub struct TextureContext {
    pub stats: TextureStats,
    pub settings: TextureSettings,
}

impl TextureContext {
    pub fn new(settings: TextureSettings) -> Self {
        Self {
            stats: TextureStats::default(),
            settings,
        }
    }
}

/// The GL formats a texture is uploaded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureFormat {
    pub internal: u32,
    pub primary: u32,
    pub ty: u32,
    /// Source data is in the opposite byte order to the host.
    pub swap_bytes: bool,
}

impl TextureFormat {
    /// Format inferred from the component count of the source image.
    pub fn inferred(components: u8, srgb_decode: bool) -> Result<Self, InvariantViolation> {
        let (internal, primary) = match components {
            1 => (gl_legacy::LUMINANCE8, glow::LUMINANCE),
            2 => (gl_legacy::LUMINANCE8_ALPHA8, glow::LUMINANCE_ALPHA),
            3 if srgb_decode => (glow::SRGB8, glow::RGB),
            3 => (glow::RGB8, glow::RGB),
            4 if srgb_decode => (glow::SRGB8_ALPHA8, glow::RGBA),
            4 => (glow::RGBA8, glow::RGBA),
            other => return Err(InvariantViolation::BadComponentCount(other)),
        };
        Ok(Self {
            internal,
            primary,
            ty: glow::UNSIGNED_BYTE,
            swap_bytes: false,
        })
    }
}

#[derive(Debug, Clone)]
struct SavedImage {
    raw: RawImage,
    discard_level: i32,
}

fn is_power_of_two_or_zero(dim: u32) -> bool {
    dim == 0 || dim.is_power_of_two()
}

fn compute_max_discard_level(width: u32, height: u32, components: u8, discard_level: i32) -> i32 {
    if components == 0 {
        return MAX_DISCARD_LEVEL;
    }
    let (mut width, mut height) = (width, height);
    let mut max_level = 0;
    while width > 1 && height > 1 && max_level < MAX_DISCARD_LEVEL {
        max_level += 1;
        width >>= 1;
        height >>= 1;
    }
    if discard_level > 0 {
        max_level = max_level.max(discard_level);
    }
    max_level
}

fn shift_dim(dim: u32, level: i32) -> u32 {
    dim.checked_shr(level.max(0) as u32).unwrap_or(0)
}

#[derive(Debug)]
pub struct TextureResource {
    width: u32,
    height: u32,
    components: u8,
    current_discard_level: i32,
    max_discard_level: i32,

    format: Option<TextureFormat>,
    has_explicit_format: bool,
    allow_compression: bool,

    use_mip_maps: bool,
    has_mip_maps: bool,
    auto_gen_mips: bool,
    mip_levels: i32,

    name: Option<DeviceTexture>,
    gl_texture_created: bool,
    texture_memory: i64,
    // category the current footprint was added under
    memory_category: TextureCategory,
    category: TextureCategory,
    last_bind_time: f32,

    address_mode: AddressMode,
    filter_option: FilterOption,
    tex_options_dirty: bool,

    needs_alpha_and_pick_mask: bool,
    alpha_layout: Option<AlphaLayout>,
    is_mask: bool,
    mask_rmse: f32,
    mask_mid_percentile: f32,
    pick_mask: Option<PickMask>,

    saved: Option<SavedImage>,
}

impl TextureResource {
    pub fn new(use_mip_maps: bool) -> Self {
        Self {
            width: 0,
            height: 0,
            components: 0,
            current_discard_level: -1,
            max_discard_level: MAX_DISCARD_LEVEL,
            format: None,
            has_explicit_format: false,
            allow_compression: true,
            use_mip_maps,
            has_mip_maps: false,
            auto_gen_mips: false,
            mip_levels: -1,
            name: None,
            gl_texture_created: false,
            texture_memory: 0,
            memory_category: TextureCategory::UNCATEGORIZED,
            category: TextureCategory::UNCATEGORIZED,
            last_bind_time: 0.0,
            address_mode: AddressMode::Wrap,
            filter_option: FilterOption::Anisotropic,
            tex_options_dirty: true,
            needs_alpha_and_pick_mask: false,
            alpha_layout: None,
            is_mask: false,
            mask_rmse: 1.0,
            mask_mid_percentile: 1.0,
            pick_mask: None,
            saved: None,
        }
    }

    pub fn with_size(width: u32, height: u32, components: u8, use_mip_maps: bool) -> Result<Self, TextureError> {
        let mut texture = Self::new(use_mip_maps);
        texture.apply_size(width, height, components, 0)?;
        Ok(texture)
    }

    fn apply_size(&mut self, width: u32, height: u32, components: u8, discard_level: i32) -> Result<(), TextureError> {
        if !is_power_of_two_or_zero(width) || !is_power_of_two_or_zero(height) {
            log::warn!("Texture has non power of two dimension: {}x{}", width, height);
            return Err(TextureError::NonPowerOfTwo { width, height });
        }
        // both were built for the old size
        self.pick_mask = None;
        self.saved = None;
        self.width = width;
        self.height = height;
        self.components = components;
        self.max_discard_level = compute_max_discard_level(width, height, components, discard_level);
        Ok(())
    }

    /// Sets the full-resolution size. A changed size releases the device texture.
    pub fn set_size<D: TextureDevice>(
        &mut self,
        device: &mut D,
        ctx: &mut TextureContext,
        width: u32,
        height: u32,
        components: u8,
        discard_level: i32,
    ) -> Result<(), TextureError> {
        if width == self.width && height == self.height && components == self.components {
            return Ok(());
        }
        if !is_power_of_two_or_zero(width) || !is_power_of_two_or_zero(height) {
            log::warn!("Texture has non power of two dimension: {}x{}", width, height);
            return Err(TextureError::NonPowerOfTwo { width, height });
        }
        self.destroy_gl_texture(device, ctx);
        self.apply_size(width, height, components, discard_level)
    }

    /// Overrides format inference. Must be called before the device texture is created,
    /// and the caller is responsible for matching the component count.
    pub fn set_explicit_format(&mut self, internal: u32, primary: u32, ty: u32, swap_bytes: bool) {
        let ty = if ty == 0 { glow::UNSIGNED_BYTE } else { ty };
        self.has_explicit_format = true;
        self.format = Some(TextureFormat {
            internal,
            primary,
            ty,
            swap_bytes,
        });
        self.calc_alpha_channel_layout();
    }

    pub fn set_allow_compression(&mut self, allow: bool) {
        self.allow_compression = allow;
    }

    pub fn set_category(&mut self, category: TextureCategory) {
        self.category = category;
    }

    fn resolve_discard_level(&self, discard_level: Option<i32>) -> Result<i32, InvariantViolation> {
        match discard_level {
            Some(level) if level >= 0 => Ok(level),
            _ if self.current_discard_level >= 0 => Ok(self.current_discard_level),
            _ => Err(InvariantViolation::NoCurrentDiscardLevel),
        }
    }

    /// Creates the device texture from a decoded image at `discard_level`.
    ///
    /// With `to_create` false only the size, format and discard level are recorded and
    /// any existing device texture is released.
    #[allow(clippy::too_many_arguments)]
    pub fn create_gl_texture_from_raw<D: TextureDevice>(
        &mut self,
        device: &mut D,
        ctx: &mut TextureContext,
        discard_level: Option<i32>,
        raw: &RawImage,
        reuse: Option<DeviceTexture>,
        to_create: bool,
        category: TextureCategory,
    ) -> Result<(), TextureError> {
        let _timer = ScopeTimer::new("create_gl_texture(raw)");
        self.gl_texture_created = false;

        if !raw.is_buffer_valid() {
            log::warn!("Trying to create a texture from invalid image data");
            return Err(TextureError::InvalidImage);
        }

        let level = self.resolve_discard_level(discard_level)?;
        // full-resolution size must not shift bits out of u32
        let max_level = raw.width().leading_zeros().min(raw.height().leading_zeros());
        if level as u32 > max_level {
            log::warn!(
                "discard level {} overflows the full size of a {}x{} image",
                level,
                raw.width(),
                raw.height()
            );
            return Err(TextureError::DiscardLevelOutOfRange {
                level,
                min: 0,
                max: max_level as i32,
            });
        }
        let width = raw.width() << level;
        let height = raw.height() << level;

        if let Err(e) = self.set_size(device, ctx, width, height, raw.components(), level) {
            log::warn!("Trying to create a texture with incorrect dimensions!");
            return Err(e);
        }

        if let Some(format) = self.format.filter(|_| self.has_explicit_format) {
            if (format.primary == glow::RGBA && self.components < 4)
                || (format.primary == glow::RGB && self.components < 3)
            {
                log::warn!(
                    "Incorrect format: 0x{:X} components: {}",
                    format.primary,
                    self.components
                );
                self.has_explicit_format = false;
            }
        }

        if !self.has_explicit_format {
            self.format = Some(TextureFormat::inferred(
                self.components,
                device.caps().srgb_decode,
            )?);
            self.calc_alpha_channel_layout();
        }

        if !to_create {
            self.destroy_gl_texture(device, ctx);
            self.current_discard_level = level;
            self.last_bind_time = ctx.stats.last_frame_time();
            return Ok(());
        }

        self.category = category;
        self.create_gl_texture(device, ctx, Some(level), raw.data(), false, reuse)
    }

    /// Uploads `data` at `discard_level`, allocating a new device texture unless the
    /// current one already holds that level.
    ///
    /// With `has_mips` the buffer holds every level down to `max_discard_level`,
    /// smallest first and the requested level last.
    pub fn create_gl_texture<D: TextureDevice>(
        &mut self,
        device: &mut D,
        ctx: &mut TextureContext,
        discard_level: Option<i32>,
        data: &[u8],
        has_mips: bool,
        reuse: Option<DeviceTexture>,
    ) -> Result<(), TextureError> {
        let _timer = ScopeTimer::new("create_gl_texture");
        let level = self
            .resolve_discard_level(discard_level)?
            .clamp(0, self.max_discard_level);

        if self.name.is_some() && level == self.current_discard_level {
            // size unchanged: re-upload into the existing texture
            return self.set_image_data(device, ctx, data, has_mips);
        }

        let new_memory = self.mip_bytes(Some(level))? as i64;
        let old_name = self.name;

        let name = match reuse {
            Some(name) => name,
            None => match device.create_texture() {
                Ok(name) => {
                    device.bind_texture(Some(name));
                    device.set_mip_range(0, self.max_discard_level - level);
                    name
                }
                Err(e) => {
                    if let Some(old) = old_name {
                        self.release_memory(&mut ctx.stats);
                        device.delete_texture(old);
                        self.name = None;
                        self.current_discard_level = -1;
                    }
                    log::warn!("create_gl_texture failed to make texture: {}", e);
                    return Err(TextureError::CreateFailed(e));
                }
            },
        };
        self.name = Some(name);

        if self.use_mip_maps {
            self.auto_gen_mips = device.caps().mipmap_generation;
        }
        self.current_discard_level = level;

        let replaced = old_name.filter(|old| *old != name);
        if let Err(e) = self.set_image_data(device, ctx, data, has_mips) {
            device.bind_texture(None);
            self.release_memory(&mut ctx.stats);
            if let Some(old) = replaced {
                device.delete_texture(old);
            }
            // an adopted name stays with its owner
            if reuse.is_none() {
                device.delete_texture(name);
            }
            self.name = None;
            self.current_discard_level = -1;
            self.gl_texture_created = false;
            return Err(e);
        }

        device.apply_sampler(&self.sampler_state(&ctx.settings));
        self.tex_options_dirty = false;
        device.bind_texture(None);

        if let Some(old) = replaced {
            device.delete_texture(old);
        }
        self.release_memory(&mut ctx.stats);
        self.texture_memory = new_memory;
        self.memory_category = self.category;
        ctx.stats.add_resident(self.category, new_memory);

        // just created, so don't let a cache evict it this frame
        self.last_bind_time = ctx.stats.last_frame_time();
        Ok(())
    }

    /// Allocates a device texture name only. The contents are filled in elsewhere,
    /// so the texture is not saved across a device loss.
    pub fn create_empty_gl_texture<D: TextureDevice>(
        &mut self,
        device: &mut D,
        ctx: &mut TextureContext,
    ) -> Result<(), TextureError> {
        self.gl_texture_created = false;
        if let Some(old) = self.name.take() {
            self.release_memory(&mut ctx.stats);
            device.delete_texture(old);
        }
        match device.create_texture() {
            Ok(name) => {
                self.name = Some(name);
                Ok(())
            }
            Err(e) => {
                log::warn!("create_empty_gl_texture failed to make an empty texture: {}", e);
                Err(TextureError::CreateFailed(e))
            }
        }
    }

    fn release_memory(&mut self, stats: &mut TextureStats) {
        if self.texture_memory != 0 {
            stats.sub_resident(self.memory_category, self.texture_memory);
            self.texture_memory = 0;
        }
    }

    /// Releases the device texture. Does nothing when none is allocated.
    pub fn destroy_gl_texture<D: TextureDevice>(&mut self, device: &mut D, ctx: &mut TextureContext) {
        if let Some(name) = self.name.take() {
            self.release_memory(&mut ctx.stats);
            device.delete_texture(name);
            self.current_discard_level = -1;
            self.gl_texture_created = false;
        }
    }

    pub fn force_to_invalidate_gl_texture<D: TextureDevice>(&mut self, device: &mut D, ctx: &mut TextureContext) {
        if self.name.is_some() {
            self.destroy_gl_texture(device, ctx);
        } else {
            self.current_discard_level = -1;
        }
    }

    /// Re-uploads a full image for the current discard level.
    pub fn set_image<D: TextureDevice>(
        &mut self,
        device: &mut D,
        ctx: &mut TextureContext,
        raw: &RawImage,
    ) -> Result<(), TextureError> {
        let level = self.current_discard_level;
        if raw.width() != self.width(Some(level))
            || raw.height() != self.height(Some(level))
            || raw.components() != self.components
        {
            return Err(InvariantViolation::ImageSizeMismatch {
                width: raw.width(),
                height: raw.height(),
                components: raw.components(),
                level,
            }
            .into());
        }
        self.set_image_data(device, ctx, raw.data(), false)
    }

    /// Uploads `data` into the existing device texture through the mip pipeline.
    pub fn set_image_data<D: TextureDevice>(
        &mut self,
        device: &mut D,
        ctx: &mut TextureContext,
        data: &[u8],
        has_mips: bool,
    ) -> Result<(), TextureError> {
        let _timer = ScopeTimer::new("set_image");
        let format = self.format.ok_or(InvariantViolation::UnknownFormat(0))?;
        let is_compressed = PixelFormat::from_gl_enum(format.primary)?.is_compressed();
        let name = self.name.ok_or(TextureError::NoDeviceTexture)?;

        if self.use_mip_maps {
            // set before binding so the sampler picks up the mip filter
            device.bind_texture(None);
            self.has_mip_maps = true;
            self.tex_options_dirty = true;
            self.set_filtering_option(FilterOption::Anisotropic);
        } else {
            self.has_mip_maps = false;
        }

        device.bind_texture(Some(name));
        self.apply_dirty_options(device, &ctx.settings);

        if self.use_mip_maps && has_mips {
            self.upload_precomputed_mips(device, &ctx.settings, format, is_compressed, data)?;
        } else if self.use_mip_maps && is_compressed {
            return Err(InvariantViolation::CompressedMipsUnavailable.into());
        } else if self.use_mip_maps && self.auto_gen_mips {
            let (w, h) = (self.width(None), self.height(None));
            self.check_base_level_size(data, w, h)?;
            self.mip_levels = w.max(h).ilog2() as i32;

            self.set_swap_bytes(device, format, true);
            self.set_manual_image(device, &ctx.settings, 0, w, h, format, data);
            self.analyze_alpha(&ctx.settings, data, w, h);
            self.update_pick_mask(w, h, data);
            self.set_swap_bytes(device, format, false);

            device.generate_mipmap();
        } else if self.use_mip_maps {
            self.upload_manual_mips(device, &ctx.settings, format, data)?;
        } else {
            self.mip_levels = 0;
            let (w, h) = (self.width(None), self.height(None));
            if is_compressed {
                let size = data_format_bytes(format.primary, w, h)?;
                let level_data = data.get(..size).ok_or(TextureError::InvalidImage)?;
                device.compressed_tex_image_2d(0, format.primary, w, h, level_data);
            } else {
                self.check_base_level_size(data, w, h)?;
                self.set_swap_bytes(device, format, true);
                self.set_manual_image(device, &ctx.settings, 0, w, h, format, data);
                self.analyze_alpha(&ctx.settings, data, w, h);
                self.update_pick_mask(w, h, data);
                self.set_swap_bytes(device, format, false);
            }
        }

        self.gl_texture_created = true;
        Ok(())
    }

    fn upload_precomputed_mips<D: TextureDevice>(
        &mut self,
        device: &mut D,
        settings: &TextureSettings,
        format: TextureFormat,
        is_compressed: bool,
        data: &[u8],
    ) -> Result<(), TextureError> {
        let levels = self.current_discard_level..=self.max_discard_level;
        let level_bytes = levels
            .clone()
            .map(|d| data_format_bytes(format.primary, self.width(Some(d)), self.height(Some(d))))
            .collect::<Result<Vec<_>, _>>()?;

        // smaller levels are stored before the base level
        let base_offset: usize = level_bytes[1..].iter().sum();
        if data.len() < base_offset + level_bytes[0] {
            log::warn!(
                "mip chain needs {} bytes but got {}",
                base_offset + level_bytes[0],
                data.len()
            );
            return Err(TextureError::InvalidImage);
        }

        let mut offset = base_offset;
        for (gl_level, d) in levels.enumerate() {
            let (w, h) = (self.width(Some(d)), self.height(Some(d)));
            if gl_level > 0 {
                offset -= level_bytes[gl_level];
            }
            let level_data = &data[offset..offset + level_bytes[gl_level]];
            let gl_level = gl_level as i32;
            self.mip_levels = self.mip_levels.max(gl_level);

            if is_compressed {
                device.compressed_tex_image_2d(gl_level, format.primary, w, h, level_data);
                continue;
            }

            let format = TextureFormat {
                ty: glow::UNSIGNED_BYTE,
                ..format
            };
            self.set_swap_bytes(device, format, true);
            self.set_manual_image(device, settings, gl_level, w, h, format, level_data);
            if gl_level == 0 {
                self.analyze_alpha(settings, level_data, w, h);
                self.update_pick_mask(w, h, level_data);
            }
            self.set_swap_bytes(device, format, false);
        }
        Ok(())
    }

    /// Builds the chain on the CPU with a 2x2 box filter.
    fn upload_manual_mips<D: TextureDevice>(
        &mut self,
        device: &mut D,
        settings: &TextureSettings,
        format: TextureFormat,
        data: &[u8],
    ) -> Result<(), TextureError> {
        let (mut w, mut h) = (self.width(None), self.height(None));
        self.check_base_level_size(data, w, h)?;
        let num_mips = self.max_discard_level - self.current_discard_level + 1;
        self.mip_levels = num_mips;

        let mut mip: Option<Vec<u8>> = None;
        for m in 0..num_mips {
            if m > 0 {
                let (src_w, src_h) = (w, h);
                w = (w >> 1).max(1);
                h = (h >> 1).max(1);
                let src = mip.as_deref().unwrap_or(data);
                match generate_mip(src, src_w, src_h, self.components) {
                    Ok(next) => mip = Some(next),
                    Err(e) => {
                        let bytes = w as usize * h as usize * self.components as usize;
                        log::warn!("mip level {} allocation of {} bytes failed: {}", m, bytes, e);
                        self.gl_texture_created = false;
                        return Err(TextureError::Allocation { level: m, bytes });
                    }
                }
            }

            let level_data = mip.as_deref().unwrap_or(data);
            self.set_swap_bytes(device, format, true);
            self.set_manual_image(device, settings, m, w, h, format, level_data);
            if m == 0 {
                self.analyze_alpha(settings, data, w, h);
                self.update_pick_mask(w, h, data);
            }
            self.set_swap_bytes(device, format, false);
        }
        Ok(())
    }

    fn check_base_level_size(&self, data: &[u8], width: u32, height: u32) -> Result<(), TextureError> {
        let required = width as usize * height as usize * self.components as usize;
        if data.len() < required {
            log::warn!(
                "image data of {} bytes is too small for {}x{}x{}",
                data.len(),
                width,
                height,
                self.components
            );
            return Err(TextureError::InvalidImage);
        }
        Ok(())
    }

    fn set_swap_bytes<D: TextureDevice>(&self, device: &mut D, format: TextureFormat, swap: bool) {
        if format.swap_bytes {
            device.set_unpack_swap_bytes(swap);
        }
    }

    /// Uploads one level, translating legacy formats on core profiles and applying
    /// driver-side compression when enabled.
    #[allow(clippy::too_many_arguments)]
    fn set_manual_image<D: TextureDevice>(
        &self,
        device: &mut D,
        settings: &TextureSettings,
        level: i32,
        width: u32,
        height: u32,
        format: TextureFormat,
        pixels: &[u8],
    ) {
        let mut internal = format.internal;
        let mut primary = format.primary;
        let mut scratch: Option<Vec<[u8; 4]>> = None;
        let caps = device.caps().clone();

        if caps.core_profile {
            if caps.texture_swizzle {
                let swizzle = match primary {
                    glow::ALPHA => Some(([glow::ZERO, glow::ZERO, glow::ZERO, glow::RED], glow::RED, glow::R8)),
                    glow::LUMINANCE => Some(([glow::RED, glow::RED, glow::RED, glow::ONE], glow::RED, glow::R8)),
                    glow::LUMINANCE_ALPHA => Some(([glow::RED, glow::RED, glow::RED, glow::GREEN], glow::RG, glow::RG8)),
                    _ => None,
                };
                if let Some((mask, swizzled_primary, swizzled_internal)) = swizzle {
                    device.set_swizzle(mask);
                    primary = swizzled_primary;
                    internal = swizzled_internal;
                }
            } else if format.ty == glow::UNSIGNED_BYTE {
                let count = width as usize * height as usize;
                let expanded: Option<(Vec<[u8; 4]>, u32)> = match primary {
                    glow::ALPHA => Some((
                        pixels.iter().take(count).map(|&a| [0, 0, 0, a]).collect(),
                        glow::RGBA8,
                    )),
                    glow::LUMINANCE_ALPHA => Some((
                        pixels
                            .chunks_exact(2)
                            .take(count)
                            .map(|la| [la[0], la[0], la[0], la[1]])
                            .collect(),
                        glow::RGBA8,
                    )),
                    glow::LUMINANCE => Some((
                        pixels.iter().take(count).map(|&l| [l, l, l, 255]).collect(),
                        glow::RGB8,
                    )),
                    _ => None,
                };
                if let Some((texels, expanded_internal)) = expanded {
                    scratch = Some(texels);
                    primary = glow::RGBA;
                    internal = expanded_internal;
                }
            }
        }

        if settings.compress_textures && self.allow_compression {
            match compressed_internal_format(internal) {
                Some(compressed) => internal = compressed,
                None => log::warn!("Could not compress format: 0x{:X}", internal),
            }
        }

        let pixels = scratch
            .as_deref()
            .map_or(pixels, |texels| bytemuck::cast_slice(texels));
        device.tex_image_2d(level, internal, width, height, primary, format.ty, Some(pixels));
    }

    /// Updates a region of level 0 from a `data_width` x `data_height` source image.
    ///
    /// A full-surface update with a matching source goes through [`Self::set_image_data`]
    /// unless `force_fast_update` is set.
    #[allow(clippy::too_many_arguments)]
    pub fn set_sub_image<D: TextureDevice>(
        &mut self,
        device: &mut D,
        ctx: &mut TextureContext,
        data: &[u8],
        data_width: i32,
        data_height: i32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        force_fast_update: bool,
    ) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        let name = self.name.ok_or(TextureError::NoDeviceTexture)?;
        if data.is_empty() {
            return Err(TextureError::InvalidImage);
        }

        let tex_width = self.width(None) as i32;
        let tex_height = self.height(None) as i32;
        if !force_fast_update
            && x == 0
            && y == 0
            && width == tex_width
            && height == tex_height
            && data_width == width
            && data_height == height
        {
            return self.set_image_data(device, ctx, data, false);
        }

        if self.use_mip_maps {
            self.dump();
            return Err(InvariantViolation::SubImageOnMipmapped.into());
        }
        if self.current_discard_level != 0 {
            return Err(InvariantViolation::SubImageDiscardLevel(self.current_discard_level).into());
        }
        let out_of_bounds = |target: &'static str, bound_width: i32, bound_height: i32| {
            InvariantViolation::SubImageOutOfBounds {
                x,
                y,
                width,
                height,
                target,
                bound_width,
                bound_height,
            }
        };
        if x < 0 || y < 0 || width < 0 || height < 0 || x + width > tex_width || y + height > tex_height {
            self.dump();
            return Err(out_of_bounds("target", tex_width, tex_height).into());
        }
        if x + width > data_width || y + height > data_height {
            self.dump();
            return Err(out_of_bounds("source", data_width, data_height).into());
        }

        let format = self.format.ok_or(InvariantViolation::UnknownFormat(0))?;
        let offset = (y as usize * data_width as usize + x as usize) * self.components as usize;
        let pixels = data.get(offset..).ok_or(TextureError::InvalidImage)?;

        device.set_unpack_row_length(data_width);
        self.set_swap_bytes(device, format, true);
        device.bind_texture(Some(name));
        device.tex_sub_image_2d(x, y, width, height, format.primary, format.ty, pixels);
        device.bind_texture(None);
        self.set_swap_bytes(device, format, false);
        device.set_unpack_row_length(0);

        self.gl_texture_created = true;
        Ok(())
    }

    pub fn set_sub_image_raw<D: TextureDevice>(
        &mut self,
        device: &mut D,
        ctx: &mut TextureContext,
        raw: &RawImage,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<(), TextureError> {
        self.set_sub_image(
            device,
            ctx,
            raw.data(),
            raw.width() as i32,
            raw.height() as i32,
            x,
            y,
            width,
            height,
            false,
        )
    }

    /// Copies a framebuffer rectangle at `fb_x`,`fb_y` into level 0 at `x`,`y`.
    #[allow(clippy::too_many_arguments)]
    pub fn set_sub_image_from_frame_buffer<D: TextureDevice>(
        &mut self,
        device: &mut D,
        ctx: &mut TextureContext,
        fb_x: i32,
        fb_y: i32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> Result<(), TextureError> {
        if !self.bind(device, ctx) {
            return Err(TextureError::NoDeviceTexture);
        }
        device.copy_tex_sub_image_2d(x, y, fb_x, fb_y, width, height);
        self.gl_texture_created = true;
        Ok(())
    }

    /// Reads a level back from the device. `None` reads the current discard level.
    pub fn read_back_raw<D: TextureDevice>(
        &self,
        device: &mut D,
        ctx: &TextureContext,
        discard_level: Option<i32>,
        compressed_ok: bool,
    ) -> Result<RawImage, TextureError> {
        let name = self.name.ok_or(TextureError::NoDeviceTexture)?;
        let level = discard_level.unwrap_or(self.current_discard_level);
        if level < self.current_discard_level || level > self.max_discard_level {
            return Err(TextureError::DiscardLevelOutOfRange {
                level,
                min: self.current_discard_level,
                max: self.max_discard_level,
            });
        }
        let gl_level = level - self.current_discard_level;

        device.bind_texture(None);
        device.bind_texture(Some(name));

        let (gl_width, _) = device.level_size(gl_level);
        if gl_width == 0 {
            // no mip data below the current discard level
            return Err(TextureError::MissingLevel(level));
        }

        let width = self.width(Some(level));
        let height = self.height(Some(level));
        let components = self.components;
        if components == 0 {
            return Err(TextureError::InvalidImage);
        }
        if (width as i64) < i64::from(gl_width) {
            log::warn!(
                "texture size is smaller than it should be. width: {} device width: {} full width: {} current level: {} level: {}",
                width,
                gl_width,
                self.width,
                self.current_discard_level,
                level
            );
            return Err(TextureError::DeviceSizeMismatch {
                expected: width,
                device: gl_width,
            });
        }

        let max_dim = ctx.settings.max_readback_dimension;
        if width > max_dim || height > max_dim || !(1..=4).contains(&components) {
            return Err(InvariantViolation::BogusReadbackParams {
                width,
                height,
                components,
            }
            .into());
        }

        let compressed_size = if compressed_ok {
            device.level_compressed_size(gl_level)
        } else {
            None
        };

        drain_device_errors(device, "before reading back texture");

        let mut raw = RawImage::default();
        let size = compressed_size
            .unwrap_or(width as usize * height as usize * components as usize);
        if let Err(e) = raw.allocate_data_size(width, height, components, size) {
            log::warn!(
                "Memory allocation failed for reading back texture. Size is: {} ({}x{}x{}): {}",
                size,
                width,
                height,
                components,
                e
            );
            return Err(TextureError::Allocation { level, bytes: size });
        }

        let format = self.format.ok_or(InvariantViolation::UnknownFormat(0))?;
        if compressed_size.is_some() {
            device.get_compressed_tex_image(gl_level, raw.data_mut());
        } else {
            device.get_tex_image(gl_level, format.primary, format.ty, raw.data_mut());
        }

        let error = device.get_error();
        if error != glow::NO_ERROR {
            log::warn!("GL Error happens after reading back texture. Error code: 0x{:X}", error);
            raw.delete_data();
            drain_device_errors(device, "after reading back texture");
            return Err(TextureError::Device(error));
        }
        Ok(raw)
    }

    /// Reads the current level into the saved image and releases the device texture.
    pub(crate) fn save_and_destroy<D: TextureDevice>(
        &mut self,
        device: &mut D,
        ctx: &mut TextureContext,
        save_state: bool,
    ) -> Result<(), TextureError> {
        if self.name.is_none() {
            return Ok(());
        }
        if save_state && self.gl_texture_created && self.components > 0 {
            self.saved = match self.read_back_raw(device, ctx, None, false) {
                Ok(raw) => Some(SavedImage {
                    raw,
                    discard_level: self.current_discard_level,
                }),
                Err(e) if e.is_invariant_violation() => return Err(e),
                Err(e) => {
                    log::warn!("could not save texture across device loss: {}", e);
                    None
                }
            };
        }
        self.destroy_gl_texture(device, ctx);
        Ok(())
    }

    /// Recreates the device texture from the image saved by `save_and_destroy`.
    pub(crate) fn restore<D: TextureDevice>(
        &mut self,
        device: &mut D,
        ctx: &mut TextureContext,
    ) -> Result<(), TextureError> {
        if self.name.is_some() {
            return Err(InvariantViolation::RestoreOverLiveTexture.into());
        }
        let Some(saved) = self.saved.take() else {
            return Ok(());
        };
        if self.components == 0 || saved.raw.components() == 0 {
            return Ok(());
        }

        let width = self.width(Some(saved.discard_level));
        let height = self.height(Some(saved.discard_level));
        if saved.raw.width() != width || saved.raw.height() != height || saved.raw.components() != self.components {
            return Err(InvariantViolation::SavedImageMismatch {
                saved_width: saved.raw.width(),
                saved_height: saved.raw.height(),
                saved_components: saved.raw.components(),
                width,
                height,
                components: self.components,
            }
            .into());
        }

        let category = self.category;
        self.create_gl_texture_from_raw(
            device,
            ctx,
            Some(saved.discard_level),
            &saved.raw,
            None,
            true,
            category,
        )
    }

    /// Verifies the device's level 0 matches `width >> current_discard_level`.
    pub fn check_tex_size<D: TextureDevice>(&self, device: &mut D) -> Result<(), TextureError> {
        let Some(name) = self.name else {
            return Ok(());
        };
        if self.current_discard_level < 0 {
            return Ok(());
        }
        device.bind_texture(Some(name));
        let (device_width, device_height) = device.level_size(0);
        device.bind_texture(None);
        if device_width == 0 || device_height == 0 {
            return Ok(());
        }

        let width = shift_dim(self.width, self.current_discard_level);
        let height = shift_dim(self.height, self.current_discard_level);
        if device_width as u32 != width || device_height as u32 != height {
            self.dump();
            return Err(InvariantViolation::DeviceSizeMismatch {
                device_width,
                device_height,
                width,
                height,
                level: self.current_discard_level,
            }
            .into());
        }
        Ok(())
    }

    fn sampler_state(&self, settings: &TextureSettings) -> SamplerState {
        SamplerState {
            address_mode: self.address_mode,
            filter: self.filter_option,
            has_mip_maps: self.has_mip_maps,
            anisotropy: if settings.use_anisotropic {
                settings.max_anisotropy
            } else {
                1.0
            },
        }
    }

    fn apply_dirty_options<D: TextureDevice>(&mut self, device: &mut D, settings: &TextureSettings) {
        if self.tex_options_dirty {
            device.apply_sampler(&self.sampler_state(settings));
            self.tex_options_dirty = false;
        }
    }

    /// Binds the texture, applying stale sampler options and counting the bind.
    /// Returns false when there is no device texture.
    pub fn bind<D: TextureDevice>(&mut self, device: &mut D, ctx: &mut TextureContext) -> bool {
        let Some(name) = self.name else {
            return false;
        };
        device.bind_texture(Some(name));
        self.apply_dirty_options(device, &ctx.settings);
        self.update_bind_stats(&mut ctx.stats);
        true
    }

    /// Counts a bind; the footprint is added to the frame's bound memory only on the
    /// first bind of the frame. Returns true for that first bind.
    pub fn update_bind_stats(&mut self, stats: &mut TextureStats) -> bool {
        if self.name.is_none() {
            return false;
        }
        stats.record_bind();
        if self.last_bind_time != stats.last_frame_time() {
            stats.record_unique_bind(self.texture_memory);
            self.last_bind_time = stats.last_frame_time();
            return true;
        }
        false
    }

    pub fn force_update_bind_stats(&mut self, stats: &TextureStats) {
        self.last_bind_time = stats.last_frame_time();
    }

    pub fn time_passed_since_last_bound(&self, stats: &TextureStats) -> f32 {
        stats.last_frame_time() - self.last_bind_time
    }

    pub fn is_just_bound(&self, ctx: &TextureContext) -> bool {
        self.time_passed_since_last_bound(&ctx.stats) < ctx.settings.just_bound_secs
    }

    pub fn bound_recently(&self, stats: &TextureStats) -> bool {
        self.time_passed_since_last_bound(stats) < MIN_TEXTURE_LIFETIME
    }

    pub fn set_address_mode(&mut self, mode: AddressMode) {
        if self.address_mode != mode {
            self.tex_options_dirty = true;
            self.address_mode = mode;
        }
    }

    pub fn set_filtering_option(&mut self, option: FilterOption) {
        if self.filter_option != option {
            self.tex_options_dirty = true;
            self.filter_option = option;
        }
    }

    pub fn dirty_tex_options(&mut self) {
        self.tex_options_dirty = true;
    }

    pub fn set_needs_alpha_and_pick_mask(&mut self, needs: bool) {
        if self.needs_alpha_and_pick_mask == needs {
            return;
        }
        self.needs_alpha_and_pick_mask = needs;
        if needs {
            self.calc_alpha_channel_layout();
        } else {
            self.alpha_layout = None;
            self.is_mask = false;
        }
    }

    fn calc_alpha_channel_layout(&mut self) {
        if !self.needs_alpha_and_pick_mask {
            return;
        }
        let Some(format) = self.format else {
            return;
        };
        if matches!(format.primary, glow::RGB | glow::SRGB) {
            // no alpha channel
            self.set_needs_alpha_and_pick_mask(false);
            return;
        }
        match AlphaLayout::for_format(format.primary, format.ty) {
            Some(layout) => self.alpha_layout = Some(layout),
            None => {
                log::warn!(
                    "Cannot analyze alpha for image with format 0x{:X} type 0x{:X}",
                    format.primary,
                    format.ty
                );
                self.set_needs_alpha_and_pick_mask(false);
            }
        }
    }

    fn analyze_alpha(&mut self, settings: &TextureSettings, data: &[u8], width: u32, height: u32) {
        if !self.needs_alpha_and_pick_mask || settings.skip_analyze_alpha {
            return;
        }
        let Some(layout) = self.alpha_layout else {
            return;
        };
        if let Some(result) = analyze_alpha(data, width, height, layout) {
            self.is_mask = result.is_mask;
            self.mask_mid_percentile = result.mask_mid_percentile;
            self.mask_rmse = result.mask_rmse;
        }
    }

    fn update_pick_mask(&mut self, width: u32, height: u32, data: &[u8]) {
        if !self.needs_alpha_and_pick_mask {
            return;
        }
        self.pick_mask = None;
        let Some(format) = self.format else {
            return;
        };
        let rgba = PixelFormat::from_gl_enum(format.primary).is_ok_and(PixelFormat::is_rgba_family);
        if format.ty != glow::UNSIGNED_BYTE || !rgba {
            return;
        }
        self.pick_mask = PickMask::from_rgba8(width, height, data);
    }

    /// Hit test against the pick mask; true when the texture has no mask.
    pub fn get_mask(&self, u: f32, v: f32) -> bool {
        mask_hit(self.pick_mask.as_ref(), u, v)
    }

    /// Width at `discard_level` (`None` for the current level), never below 1.
    pub fn width(&self, discard_level: Option<i32>) -> u32 {
        shift_dim(self.width, discard_level.unwrap_or(self.current_discard_level)).max(1)
    }

    pub fn height(&self, discard_level: Option<i32>) -> u32 {
        shift_dim(self.height, discard_level.unwrap_or(self.current_discard_level)).max(1)
    }

    fn primary_format(&self) -> Result<PixelFormat, InvariantViolation> {
        let primary = self.format.map_or(0, |format| format.primary);
        PixelFormat::from_gl_enum(primary)
    }

    /// Bytes of a single level.
    pub fn bytes(&self, discard_level: Option<i32>) -> Result<usize, InvariantViolation> {
        Ok(self
            .primary_format()?
            .region_bytes(self.width(discard_level), self.height(discard_level)))
    }

    /// Bytes of the level plus, for mipmapped textures, every smaller level.
    pub fn mip_bytes(&self, discard_level: Option<i32>) -> Result<usize, InvariantViolation> {
        let format = self.primary_format()?;
        let level = discard_level.unwrap_or(self.current_discard_level);
        let mut w = shift_dim(self.width, level);
        let mut h = shift_dim(self.height, level);
        let mut total = format.region_bytes(w, h);
        if self.use_mip_maps {
            while w > 1 && h > 1 {
                w = (w >> 1).max(1);
                h = (h >> 1).max(1);
                total += format.region_bytes(w, h);
            }
        }
        Ok(total)
    }

    /// Logs the full resource state.
    pub fn dump(&self) {
        log::info!(
            "max_discard_level {} last_bind_time {} use_mip_maps {} has_mip_maps {} current_discard_level {} format {:?} explicit_format {}",
            self.max_discard_level,
            self.last_bind_time,
            self.use_mip_maps,
            self.has_mip_maps,
            self.current_discard_level,
            self.format,
            self.has_explicit_format
        );
        log::info!(
            " texture_memory {} name {:?} size {}x{}x{} category {:?}",
            self.texture_memory,
            self.name.map(DeviceTexture::name),
            self.width,
            self.height,
            self.components,
            self.category
        );
    }

    pub fn components(&self) -> u8 {
        self.components
    }

    pub fn current_discard_level(&self) -> i32 {
        self.current_discard_level
    }

    pub fn max_discard_level(&self) -> i32 {
        self.max_discard_level
    }

    pub fn format(&self) -> Option<TextureFormat> {
        self.format
    }

    pub fn has_explicit_format(&self) -> bool {
        self.has_explicit_format
    }

    pub fn is_compressed(&self) -> bool {
        self.primary_format().is_ok_and(PixelFormat::is_compressed)
    }

    pub fn use_mip_maps(&self) -> bool {
        self.use_mip_maps
    }

    pub fn has_mip_maps(&self) -> bool {
        self.has_mip_maps
    }

    pub fn mip_levels(&self) -> i32 {
        self.mip_levels
    }

    pub fn device_texture(&self) -> Option<DeviceTexture> {
        self.name
    }

    pub fn is_gl_texture_created(&self) -> bool {
        self.gl_texture_created
    }

    pub fn texture_memory(&self) -> i64 {
        self.texture_memory
    }

    pub fn category(&self) -> TextureCategory {
        self.category
    }

    pub fn last_bind_time(&self) -> f32 {
        self.last_bind_time
    }

    pub fn address_mode(&self) -> AddressMode {
        self.address_mode
    }

    pub fn filter_option(&self) -> FilterOption {
        self.filter_option
    }

    pub fn tex_options_dirty(&self) -> bool {
        self.tex_options_dirty
    }

    pub fn needs_alpha_and_pick_mask(&self) -> bool {
        self.needs_alpha_and_pick_mask
    }

    pub fn alpha_layout(&self) -> Option<AlphaLayout> {
        self.alpha_layout
    }

    pub fn is_mask(&self) -> bool {
        self.is_mask
    }

    pub fn mask_rmse(&self) -> f32 {
        self.mask_rmse
    }

    pub fn mask_mid_percentile(&self) -> f32 {
        self.mask_mid_percentile
    }

    pub fn pick_mask(&self) -> Option<&PickMask> {
        self.pick_mask.as_ref()
    }

    pub fn has_saved_image(&self) -> bool {
        self.saved.is_some()
    }
}

fn drain_device_errors<D: TextureDevice>(device: &mut D, when: &str) {
    loop {
        let error = device.get_error();
        if error == glow::NO_ERROR {
            break;
        }
        log::warn!("GL Error happens {}. Error code: 0x{:X}", when, error);
    }
}

impl Drop for TextureResource {
    fn drop(&mut self) {
        if let Some(name) = self.name {
            log::warn!(
                "texture dropped while device texture {} is still allocated",
                name.name()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCaps, HeadlessDevice};
    use approx::assert_relative_eq;

    fn setup() -> (HeadlessDevice, TextureContext) {
        (HeadlessDevice::default(), TextureContext::default())
    }

    fn release(texture: &mut TextureResource, device: &mut HeadlessDevice, ctx: &mut TextureContext) {
        texture.destroy_gl_texture(device, ctx);
    }

    #[test]
    fn test_set_size_rejects_non_power_of_two() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::with_size(64, 32, 4, true).unwrap();
        let result = texture.set_size(&mut device, &mut ctx, 48, 32, 4, 0);
        assert!(matches!(result, Err(TextureError::NonPowerOfTwo { width: 48, height: 32 })));
        // prior state untouched
        assert_eq!(texture.width(Some(0)), 64);
        assert_eq!(texture.max_discard_level(), 5);

        assert!(texture.set_size(&mut device, &mut ctx, 0, 0, 4, 0).is_ok());
        assert!(TextureResource::with_size(3, 4, 1, false).is_err());
    }

    #[test]
    fn test_max_discard_level() {
        let texture = TextureResource::with_size(256, 256, 4, true).unwrap();
        assert_eq!(texture.max_discard_level(), 8);

        let texture = TextureResource::with_size(256, 4, 4, true).unwrap();
        assert_eq!(texture.max_discard_level(), 2);

        let texture = TextureResource::with_size(8192, 8192, 4, true).unwrap();
        assert_eq!(texture.max_discard_level(), MAX_DISCARD_LEVEL);

        let texture = TextureResource::with_size(0, 0, 0, true).unwrap();
        assert_eq!(texture.max_discard_level(), MAX_DISCARD_LEVEL);
    }

    #[test]
    fn test_create_infers_format_from_components() {
        let (mut device, mut ctx) = setup();
        let cases = [
            (1, gl_legacy::LUMINANCE8, glow::LUMINANCE),
            (2, gl_legacy::LUMINANCE8_ALPHA8, glow::LUMINANCE_ALPHA),
            (3, glow::RGB8, glow::RGB),
            (4, glow::RGBA8, glow::RGBA),
        ];
        for (components, internal, primary) in cases {
            let texel = vec![100u8; components as usize];
            let raw = RawImage::filled(4, 4, &texel);
            let mut texture = TextureResource::new(false);
            texture
                .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
                .unwrap();
            let format = texture.format().unwrap();
            assert_eq!((format.internal, format.primary), (internal, primary));
            release(&mut texture, &mut device, &mut ctx);
        }
    }

    #[test]
    fn test_srgb_formats_follow_device_caps() {
        let mut device = HeadlessDevice::new(DeviceCaps {
            srgb_decode: true,
            ..Default::default()
        });
        let mut ctx = TextureContext::default();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(2, 2, &[1, 2, 3, 4]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        assert_eq!(texture.format().unwrap().internal, glow::SRGB8_ALPHA8);
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_explicit_rgba_with_three_components_is_discarded() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        texture.set_explicit_format(glow::RGBA8, glow::RGBA, 0, false);
        let raw = RawImage::filled(2, 2, &[1, 2, 3]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        assert!(!texture.has_explicit_format());
        assert_eq!(texture.format().unwrap().primary, glow::RGB);
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_bad_component_count_is_invariant_violation() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::new(2, 2, 5, vec![0; 20]);
        // 5 components is not a valid buffer either
        let err = texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap_err();
        assert!(matches!(err, TextureError::InvalidImage));
        assert_eq!(
            TextureFormat::inferred(5, false),
            Err(InvariantViolation::BadComponentCount(5))
        );
    }

    #[test]
    fn test_create_without_upload_records_level_only() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(true);
        let raw = RawImage::filled(8, 8, &[0, 0, 0, 255]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(2), &raw, None, false, TextureCategory::UNCATEGORIZED)
            .unwrap();
        assert_eq!(texture.width(Some(0)), 32);
        assert_eq!(texture.current_discard_level(), 2);
        assert!(texture.device_texture().is_none());
        assert_eq!(device.live_textures(), 0);
    }

    #[test]
    fn test_manual_mip_chain_and_memory() {
        let mut device = HeadlessDevice::new(DeviceCaps {
            mipmap_generation: false,
            ..Default::default()
        });
        let mut ctx = TextureContext::default();
        let mut texture = TextureResource::new(true);
        let raw = RawImage::filled(8, 8, &[10, 20, 30, 40]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory(2))
            .unwrap();

        let name = texture.device_texture().unwrap();
        // 8x8, 4x4, 2x2, 1x1
        assert_eq!(device.level_count(name), 4);
        assert_eq!(texture.mip_levels(), 4);
        assert_eq!(device.level_data(name, 3), Some(&[10u8, 20, 30, 40][..]));
        assert_eq!(device.mip_range(name), Some((0, 3)));

        let expected = 256 + 64 + 16 + 4;
        assert_eq!(texture.mip_bytes(Some(0)).unwrap(), expected);
        assert_eq!(texture.texture_memory(), expected as i64);
        assert_eq!(ctx.stats.total_resident_bytes(), expected as i64);
        assert_eq!(ctx.stats.category_bytes(TextureCategory(2)), expected as i64);

        release(&mut texture, &mut device, &mut ctx);
        assert_eq!(ctx.stats.total_resident_bytes(), 0);
    }

    #[test]
    fn test_hardware_mips_upload_base_level_only() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(true);
        let raw = RawImage::filled(4, 4, &[0, 0, 0, 255]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        let uploaded: Vec<i32> = device.uploads().iter().map(|record| record.level).collect();
        assert_eq!(uploaded, vec![0]);
        let name = texture.device_texture().unwrap();
        assert_eq!(device.level_count(name), 3);
        assert!(texture.has_mip_maps());
        assert_eq!(device.sampler(name).unwrap().filter, FilterOption::Anisotropic);
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_precomputed_mips_are_read_smallest_first() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::with_size(4, 4, 1, true).unwrap();
        texture.set_explicit_format(gl_legacy::LUMINANCE8, glow::LUMINANCE, glow::UNSIGNED_BYTE, false);
        // 1x1 (padded to 4 bytes), then 2x2, then the 4x4 base
        let mut data = vec![7, 0, 0, 0];
        data.extend_from_slice(&[5; 4]);
        data.extend_from_slice(&[3; 16]);
        texture
            .create_gl_texture(&mut device, &mut ctx, Some(0), &data, true, None)
            .unwrap();

        let name = texture.device_texture().unwrap();
        assert_eq!(device.level_data(name, 0), Some(&[3u8; 16][..]));
        assert_eq!(device.level_data(name, 1), Some(&[5u8; 4][..]));
        assert_eq!(device.level_data(name, 2), Some(&[7u8][..]));
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_compressed_without_precomputed_mips_is_fatal() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::with_size(4, 4, 4, true).unwrap();
        texture.set_explicit_format(
            glow::COMPRESSED_RGBA_S3TC_DXT5_EXT,
            glow::COMPRESSED_RGBA_S3TC_DXT5_EXT,
            0,
            false,
        );
        let err = texture
            .create_gl_texture(&mut device, &mut ctx, Some(0), &[0; 16], false, None)
            .unwrap_err();
        assert!(err.is_invariant_violation());
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_same_level_reuploads_in_place() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(4, 4, &[1, 1, 1, 1]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        let name = texture.device_texture();
        let memory = ctx.stats.total_resident_bytes();

        let raw = RawImage::filled(4, 4, &[2, 2, 2, 2]);
        texture.set_image(&mut device, &mut ctx, &raw).unwrap();
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        assert_eq!(texture.device_texture(), name);
        assert_eq!(ctx.stats.total_resident_bytes(), memory);
        assert_eq!(device.live_textures(), 1);
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_set_image_size_mismatch() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(4, 4, &[1, 1, 1, 1]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        let small = RawImage::filled(2, 2, &[1, 1, 1, 1]);
        let err = texture.set_image(&mut device, &mut ctx, &small).unwrap_err();
        assert!(err.is_invariant_violation());
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_failed_upload_rolls_back_and_retry_is_accounted() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::with_size(4, 4, 4, false).unwrap();
        texture.set_explicit_format(glow::RGBA8, glow::RGBA, 0, false);

        let err = texture
            .create_gl_texture(&mut device, &mut ctx, Some(0), &[0; 8], false, None)
            .unwrap_err();
        assert!(matches!(err, TextureError::InvalidImage));
        assert!(texture.device_texture().is_none());
        assert_eq!(texture.current_discard_level(), -1);
        assert!(!texture.is_gl_texture_created());
        assert_eq!(device.live_textures(), 0);
        assert_eq!(ctx.stats.total_resident_bytes(), 0);

        texture
            .create_gl_texture(&mut device, &mut ctx, Some(0), &[7; 64], false, None)
            .unwrap();
        let expected = texture.mip_bytes(Some(0)).unwrap() as i64;
        assert_eq!(expected, 64);
        assert_eq!(texture.texture_memory(), expected);
        assert_eq!(ctx.stats.total_resident_bytes(), expected);
        release(&mut texture, &mut device, &mut ctx);
        assert_eq!(ctx.stats.total_resident_bytes(), 0);
    }

    #[test]
    fn test_failed_upload_replacing_level_releases_old_texture() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        let low = RawImage::filled(2, 2, &[1, 2, 3, 4]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(1), &low, None, true, TextureCategory(4))
            .unwrap();
        assert_eq!(ctx.stats.category_bytes(TextureCategory(4)), 16);

        let err = texture
            .create_gl_texture(&mut device, &mut ctx, Some(0), &[0; 4], false, None)
            .unwrap_err();
        assert!(matches!(err, TextureError::InvalidImage));
        assert!(texture.device_texture().is_none());
        assert_eq!(device.live_textures(), 0);
        assert_eq!(ctx.stats.total_resident_bytes(), 0);
        assert_eq!(ctx.stats.category_bytes(TextureCategory(4)), 0);
    }

    #[test]
    fn test_failed_upload_keeps_adopted_name_alive() {
        let (mut device, mut ctx) = setup();
        let external = device.create_texture().unwrap();
        let mut texture = TextureResource::with_size(4, 4, 4, false).unwrap();
        texture.set_explicit_format(glow::RGBA8, glow::RGBA, 0, false);
        assert!(texture
            .create_gl_texture(&mut device, &mut ctx, Some(0), &[0; 8], false, Some(external))
            .is_err());
        assert!(texture.device_texture().is_none());
        assert!(device.is_live(external));
    }

    #[test]
    fn test_discard_level_overflowing_full_size_is_rejected() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(4, 4, &[1]);
        let err = texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(30), &raw, None, false, TextureCategory::UNCATEGORIZED)
            .unwrap_err();
        assert!(matches!(
            err,
            TextureError::DiscardLevelOutOfRange { level: 30, min: 0, max: 29 }
        ));
        assert_eq!(texture.width(Some(0)), 1);

        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(29), &raw, None, false, TextureCategory::UNCATEGORIZED)
            .unwrap();
        assert_eq!(texture.width(Some(0)), 1 << 31);
        assert_eq!(texture.current_discard_level(), 29);
    }

    #[test]
    fn test_resize_drops_saved_image() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(8, 8, &[1, 2, 3, 4]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        texture.save_and_destroy(&mut device, &mut ctx, true).unwrap();
        assert!(texture.has_saved_image());

        texture.set_size(&mut device, &mut ctx, 16, 16, 4, 0).unwrap();
        assert!(!texture.has_saved_image());
        texture.restore(&mut device, &mut ctx).unwrap();
        assert!(texture.device_texture().is_none());
    }

    #[test]
    fn test_name_allocation_failure_keeps_counters() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(4, 4, &[1, 1, 1, 1]);
        device.fail_next_create();
        let err = texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap_err();
        assert!(matches!(err, TextureError::CreateFailed(_)));
        assert_eq!(ctx.stats.total_resident_bytes(), 0);
        assert!(texture.device_texture().is_none());
    }

    #[test]
    fn test_reuse_name_adopts_external_texture() {
        let (mut device, mut ctx) = setup();
        let external = device.create_texture().unwrap();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(2, 2, &[9, 9, 9, 9]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, Some(external), true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        assert_eq!(texture.device_texture(), Some(external));
        assert_eq!(device.level_data(external, 0), Some(&[9u8; 16][..]));
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_destroy_twice_is_safe() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(2, 2, &[1, 2, 3, 4]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        texture.destroy_gl_texture(&mut device, &mut ctx);
        assert_eq!(texture.current_discard_level(), -1);
        texture.destroy_gl_texture(&mut device, &mut ctx);
        assert_eq!(texture.current_discard_level(), -1);
        assert_eq!(device.live_textures(), 0);
        assert_eq!(ctx.stats.total_resident_bytes(), 0);
    }

    #[test]
    fn test_read_back_matches_upload() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        let data: Vec<u8> = (0..48).collect();
        let raw = RawImage::new(4, 4, 3, data.clone());
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(1), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();

        let back = texture.read_back_raw(&mut device, &ctx, None, false).unwrap();
        assert_eq!((back.width(), back.height(), back.components()), (4, 4, 3));
        assert_eq!(back.data(), &data[..]);

        let err = texture.read_back_raw(&mut device, &ctx, Some(0), false).unwrap_err();
        assert!(matches!(err, TextureError::DiscardLevelOutOfRange { .. }));
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_read_back_device_error_discards_data() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(2, 2, &[1, 2, 3, 4]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();

        // errors queued before the read are drained and ignored
        device.push_error(glow::INVALID_ENUM);
        assert!(texture.read_back_raw(&mut device, &ctx, None, false).is_ok());

        device.set_level_size_override(Some((8, 8)));
        let err = texture.read_back_raw(&mut device, &ctx, None, false).unwrap_err();
        assert!(matches!(err, TextureError::DeviceSizeMismatch { expected: 2, device: 8 }));
        device.set_level_size_override(None);
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_read_back_too_large_is_bogus() {
        let (mut device, mut ctx) = setup();
        ctx.settings.max_readback_dimension = 4;
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(8, 8, &[1]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        let err = texture.read_back_raw(&mut device, &ctx, None, false).unwrap_err();
        assert!(err.is_invariant_violation());
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_sub_image_updates_region() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(4, 4, &[0]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();

        let source = RawImage::new(3, 2, 1, vec![1, 2, 3, 4, 5, 6]);
        texture
            .set_sub_image_raw(&mut device, &mut ctx, &source, 1, 0, 2, 2)
            .unwrap();
        let name = texture.device_texture().unwrap();
        let level = device.level_data(name, 0).unwrap();
        assert_eq!(&level[..4], &[0, 2, 3, 0]);
        assert_eq!(&level[4..8], &[0, 5, 6, 0]);
        assert_eq!(device.row_length(), 0);

        // zero-sized update is a no-op
        assert!(texture
            .set_sub_image(&mut device, &mut ctx, &[], 0, 0, 0, 0, 0, 0, false)
            .is_ok());
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_sub_image_out_of_bounds_is_fatal() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(4, 4, &[0]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        let err = texture
            .set_sub_image(&mut device, &mut ctx, &[0; 16], 4, 4, 3, 3, 2, 2, false)
            .unwrap_err();
        assert!(matches!(
            err,
            TextureError::Invariant(InvariantViolation::SubImageOutOfBounds { target: "target", .. })
        ));
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_sub_image_without_texture_fails() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::with_size(4, 4, 1, false).unwrap();
        let err = texture
            .set_sub_image(&mut device, &mut ctx, &[0; 4], 2, 2, 0, 0, 2, 2, false)
            .unwrap_err();
        assert!(matches!(err, TextureError::NoDeviceTexture));
    }

    #[test]
    fn test_sub_image_on_mipmapped_is_fatal() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(true);
        let raw = RawImage::filled(4, 4, &[0]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        let err = texture
            .set_sub_image(&mut device, &mut ctx, &[0; 4], 2, 2, 0, 0, 2, 2, false)
            .unwrap_err();
        assert!(matches!(err, TextureError::Invariant(InvariantViolation::SubImageOnMipmapped)));
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_alpha_analysis_and_pick_mask_on_opt_in() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        texture.set_needs_alpha_and_pick_mask(true);
        let raw = RawImage::filled(8, 8, &[255, 255, 255, 0]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();

        assert_eq!(texture.alpha_layout(), Some(AlphaLayout { offset: 3, stride: 4 }));
        assert!(texture.is_mask());
        assert_relative_eq!(texture.mask_rmse(), 0.0);
        let mask = texture.pick_mask().unwrap();
        assert_eq!((mask.width(), mask.height()), (4, 4));
        assert!(!texture.get_mask(0.5, 0.5));
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_rgb_opts_out_of_alpha_analysis() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        texture.set_needs_alpha_and_pick_mask(true);
        let raw = RawImage::filled(4, 4, &[1, 2, 3]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        assert!(!texture.needs_alpha_and_pick_mask());
        assert!(texture.pick_mask().is_none());
        assert!(texture.get_mask(0.2, 0.9));
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_size_change_frees_pick_mask() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        texture.set_needs_alpha_and_pick_mask(true);
        let raw = RawImage::filled(4, 4, &[0, 0, 0, 255]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        assert!(texture.pick_mask().is_some());

        texture.set_size(&mut device, &mut ctx, 8, 8, 4, 0).unwrap();
        assert!(texture.pick_mask().is_none());
        assert!(texture.device_texture().is_none());
        assert_eq!(ctx.stats.total_resident_bytes(), 0);
    }

    #[test]
    fn test_core_profile_swizzles_luminance() {
        let mut device = HeadlessDevice::new(DeviceCaps {
            core_profile: true,
            texture_swizzle: true,
            ..Default::default()
        });
        let mut ctx = TextureContext::default();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(2, 2, &[77]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        let name = texture.device_texture().unwrap();
        assert_eq!(
            device.swizzle(name),
            Some([glow::RED, glow::RED, glow::RED, glow::ONE])
        );
        assert_eq!(device.uploads()[0].internal_format, glow::R8);
        assert_eq!(device.uploads()[0].format, glow::RED);
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_core_profile_expands_luminance_alpha_without_swizzle() {
        let mut device = HeadlessDevice::new(DeviceCaps {
            core_profile: true,
            ..Default::default()
        });
        let mut ctx = TextureContext::default();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(2, 1, &[40, 200]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        let name = texture.device_texture().unwrap();
        assert_eq!(device.uploads()[0].internal_format, glow::RGBA8);
        assert_eq!(
            device.level_data(name, 0),
            Some(&[40u8, 40, 40, 200, 40, 40, 40, 200][..])
        );
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_compress_textures_maps_internal_format() {
        let (mut device, mut ctx) = setup();
        ctx.settings.compress_textures = true;
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(2, 2, &[1, 2, 3, 4]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        assert_eq!(device.uploads()[0].internal_format, glow::COMPRESSED_RGBA);

        texture.set_allow_compression(false);
        texture.set_image(&mut device, &mut ctx, &raw).unwrap();
        assert_eq!(device.uploads()[1].internal_format, glow::RGBA8);
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_swap_bytes_toggled_around_upload() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::with_size(2, 2, 4, false).unwrap();
        texture.set_explicit_format(glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE, true);
        texture
            .create_gl_texture(&mut device, &mut ctx, Some(0), &[0; 16], false, None)
            .unwrap();
        assert!(device.uploads()[0].swap_bytes);
        assert!(!device.swap_bytes_enabled());
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_bind_stats_count_once_per_frame() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(2, 2, &[1, 2, 3, 4]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();

        ctx.stats.update_stats(1.0);
        assert!(texture.bind(&mut device, &mut ctx));
        assert!(texture.bind(&mut device, &mut ctx));
        assert_eq!(ctx.stats.bind_count(), 2);
        assert_eq!(ctx.stats.unique_bind_count(), 1);
        assert_eq!(ctx.stats.bound_bytes_this_frame(), 16);
        assert!(texture.is_just_bound(&ctx));

        ctx.stats.update_stats(5.0);
        assert_eq!(ctx.stats.bound_bytes_last_frame(), 16);
        assert!(!texture.is_just_bound(&ctx));
        assert!(texture.bound_recently(&ctx.stats));
        assert_relative_eq!(texture.time_passed_since_last_bound(&ctx.stats), 4.0);

        ctx.stats.update_stats(20.0);
        assert!(!texture.bound_recently(&ctx.stats));
        texture.force_update_bind_stats(&ctx.stats);
        assert!(texture.is_just_bound(&ctx));
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_dirty_options_applied_on_bind() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(2, 2, &[1, 2, 3, 4]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        assert!(!texture.tex_options_dirty());

        texture.set_address_mode(AddressMode::Clamp);
        assert!(texture.tex_options_dirty());
        texture.bind(&mut device, &mut ctx);
        let name = texture.device_texture().unwrap();
        assert_eq!(device.sampler(name).unwrap().address_mode, AddressMode::Clamp);
        assert!(!texture.tex_options_dirty());
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_width_height_and_bytes_per_level() {
        let texture = TextureResource::with_size(16, 4, 4, true).unwrap();
        assert_eq!(texture.width(Some(3)), 2);
        assert_eq!(texture.height(Some(3)), 1);
        assert!(texture.bytes(Some(0)).is_err());

        let mut texture = texture;
        texture.set_explicit_format(glow::RGBA8, glow::RGBA, 0, false);
        assert_eq!(texture.bytes(Some(0)).unwrap(), 256);
        // 16x4 + 8x2 + 4x1
        assert_eq!(texture.mip_bytes(Some(0)).unwrap(), 256 + 64 + 16);
    }

    #[test]
    fn test_check_tex_size() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(4, 4, &[1, 2, 3, 4]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(1), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        assert!(texture.check_tex_size(&mut device).is_ok());

        device.set_level_size_override(Some((2, 2)));
        let err = texture.check_tex_size(&mut device).unwrap_err();
        assert!(matches!(
            err,
            TextureError::Invariant(InvariantViolation::DeviceSizeMismatch { .. })
        ));
        device.set_level_size_override(None);
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_frame_buffer_copy() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        let raw = RawImage::filled(2, 2, &[0, 0, 0, 0]);
        texture
            .create_gl_texture_from_raw(&mut device, &mut ctx, Some(0), &raw, None, true, TextureCategory::UNCATEGORIZED)
            .unwrap();
        device.set_framebuffer(1, 1, vec![9, 8, 7, 6]);
        texture
            .set_sub_image_from_frame_buffer(&mut device, &mut ctx, 0, 0, 1, 1, 1, 1)
            .unwrap();
        let name = texture.device_texture().unwrap();
        assert_eq!(&device.level_data(name, 0).unwrap()[12..], &[9, 8, 7, 6]);
        release(&mut texture, &mut device, &mut ctx);
    }

    #[test]
    fn test_empty_texture_is_not_created() {
        let (mut device, mut ctx) = setup();
        let mut texture = TextureResource::new(false);
        texture.create_empty_gl_texture(&mut device, &mut ctx).unwrap();
        assert!(texture.device_texture().is_some());
        assert!(!texture.is_gl_texture_created());
        release(&mut texture, &mut device, &mut ctx);
    }
}
