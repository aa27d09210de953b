// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::num::NonZeroU32;

use super::{DeviceCaps, DeviceTexture, SamplerState, TextureDevice};
use crate::format::gl_legacy;
use crate::raw_image::generate_mip;

/// One level upload as seen by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub texture: DeviceTexture,
    pub level: i32,
    pub width: u32,
    pub height: u32,
    pub internal_format: u32,
    pub format: u32,
    pub compressed: bool,
    pub swap_bytes: bool,
}

#[derive(Debug, Clone)]
struct HeadlessLevel {
    width: u32,
    height: u32,
    format: u32,
    ty: u32,
    compressed: bool,
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct HeadlessTexture {
    levels: BTreeMap<i32, HeadlessLevel>,
    mip_range: (i32, i32),
    swizzle: Option<[u32; 4]>,
    sampler: Option<SamplerState>,
}

/// Software stand-in for a GL context: texture storage lives in host memory.
///
/// Used by the tests and by the audit tool, and able to inject the failures a
/// real driver produces (name allocation failure, queued errors, bogus level sizes).
#[derive(Debug)]
pub struct HeadlessDevice {
    caps: DeviceCaps,
    next_name: u32,
    textures: HashMap<DeviceTexture, HeadlessTexture>,
    bound: Option<DeviceTexture>,
    swap_bytes: bool,
    row_length: i32,
    errors: VecDeque<u32>,
    fail_next_create: bool,
    level_size_override: Option<(i32, i32)>,
    uploads: Vec<UploadRecord>,
    framebuffer: (u32, u32, Vec<u8>),
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new(DeviceCaps::default())
    }
}

impl HeadlessDevice {
    pub fn new(caps: DeviceCaps) -> Self {
        Self {
            caps,
            next_name: 1,
            textures: HashMap::new(),
            bound: None,
            swap_bytes: false,
            row_length: 0,
            errors: VecDeque::new(),
            fail_next_create: false,
            level_size_override: None,
            uploads: Vec::new(),
            framebuffer: (0, 0, Vec::new()),
        }
    }

    pub fn caps_mut(&mut self) -> &mut DeviceCaps {
        &mut self.caps
    }

    /// The next `create_texture` call fails.
    pub fn fail_next_create(&mut self) {
        self.fail_next_create = true;
    }

    pub fn push_error(&mut self, code: u32) {
        self.errors.push_back(code);
    }

    /// Forces every `level_size` query to report `size`.
    pub fn set_level_size_override(&mut self, size: Option<(i32, i32)>) {
        self.level_size_override = size;
    }

    /// RGBA8 contents read by `copy_tex_sub_image_2d`.
    pub fn set_framebuffer(&mut self, width: u32, height: u32, rgba: Vec<u8>) {
        self.framebuffer = (width, height, rgba);
    }

    pub fn uploads(&self) -> &[UploadRecord] {
        &self.uploads
    }

    pub fn clear_uploads(&mut self) {
        self.uploads.clear();
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn is_live(&self, texture: DeviceTexture) -> bool {
        self.textures.contains_key(&texture)
    }

    pub fn level_data(&self, texture: DeviceTexture, level: i32) -> Option<&[u8]> {
        self.textures
            .get(&texture)?
            .levels
            .get(&level)
            .map(|level| level.data.as_slice())
    }

    pub fn level_count(&self, texture: DeviceTexture) -> usize {
        self.textures
            .get(&texture)
            .map_or(0, |texture| texture.levels.len())
    }

    pub fn mip_range(&self, texture: DeviceTexture) -> Option<(i32, i32)> {
        self.textures.get(&texture).map(|texture| texture.mip_range)
    }

    pub fn swizzle(&self, texture: DeviceTexture) -> Option<[u32; 4]> {
        self.textures.get(&texture)?.swizzle
    }

    pub fn sampler(&self, texture: DeviceTexture) -> Option<SamplerState> {
        self.textures.get(&texture)?.sampler
    }

    pub fn swap_bytes_enabled(&self) -> bool {
        self.swap_bytes
    }

    pub fn row_length(&self) -> i32 {
        self.row_length
    }

    fn bound_mut(&mut self) -> Option<&mut HeadlessTexture> {
        let texture = self.bound?;
        self.textures.get_mut(&texture)
    }

    fn record_upload(&mut self, level: i32, width: u32, height: u32, internal_format: u32, format: u32, compressed: bool) {
        if let Some(texture) = self.bound {
            self.uploads.push(UploadRecord {
                texture,
                level,
                width,
                height,
                internal_format,
                format,
                compressed,
                swap_bytes: self.swap_bytes,
            });
        }
    }
}

fn texel_bytes(format: u32, ty: u32) -> usize {
    if ty == glow::UNSIGNED_INT_8_8_8_8 || ty == glow::UNSIGNED_INT_8_8_8_8_REV {
        return 4;
    }
    match format {
        glow::RED | glow::ALPHA | glow::LUMINANCE | gl_legacy::COLOR_INDEX => 1,
        glow::RG | glow::LUMINANCE_ALPHA => 2,
        glow::RGB | glow::SRGB | glow::RGB8 => 3,
        _ => 4,
    }
}

impl TextureDevice for HeadlessDevice {
    fn caps(&self) -> &DeviceCaps {
        &self.caps
    }

    fn create_texture(&mut self) -> Result<DeviceTexture, String> {
        if std::mem::take(&mut self.fail_next_create) {
            return Err(String::from("out of texture names"));
        }
        let name = NonZeroU32::new(self.next_name).ok_or("texture names exhausted")?;
        self.next_name += 1;
        let texture = DeviceTexture(name);
        self.textures.insert(texture, HeadlessTexture::default());
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: DeviceTexture) {
        self.textures.remove(&texture);
        if self.bound == Some(texture) {
            self.bound = None;
        }
    }

    fn bind_texture(&mut self, texture: Option<DeviceTexture>) {
        // GL creates the object on first bind of an adopted name.
        if let Some(texture) = texture {
            self.textures.entry(texture).or_default();
            self.next_name = self.next_name.max(texture.name() + 1);
        }
        self.bound = texture;
    }

    fn bound_texture(&self) -> Option<DeviceTexture> {
        self.bound
    }

    fn set_mip_range(&mut self, base_level: i32, max_level: i32) {
        if let Some(texture) = self.bound_mut() {
            texture.mip_range = (base_level, max_level);
        }
    }

    fn set_unpack_swap_bytes(&mut self, swap: bool) {
        self.swap_bytes = swap;
    }

    fn set_unpack_row_length(&mut self, texels: i32) {
        self.row_length = texels;
    }

    fn set_swizzle(&mut self, mask: [u32; 4]) {
        if let Some(texture) = self.bound_mut() {
            texture.swizzle = Some(mask);
        }
    }

    fn apply_sampler(&mut self, sampler: &SamplerState) {
        if let Some(texture) = self.bound_mut() {
            texture.sampler = Some(*sampler);
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
        self.record_upload(level, width, height, internal_format, format, false);
        let size = width as usize * height as usize * texel_bytes(format, ty);
        let mut data = vec![0u8; size];
        if let Some(pixels) = pixels {
            let count = pixels.len().min(size);
            data[..count].copy_from_slice(&pixels[..count]);
        }
        let Some(texture) = self.bound_mut() else {
            self.errors.push_back(glow::INVALID_OPERATION);
            return;
        };
        texture.levels.insert(
            level,
            HeadlessLevel {
                width,
                height,
                format,
                ty,
                compressed: false,
                data,
            },
        );
    }

    fn compressed_tex_image_2d(&mut self, level: i32, format: u32, width: u32, height: u32, data: &[u8]) {
        self.record_upload(level, width, height, format, format, true);
        let Some(texture) = self.bound_mut() else {
            self.errors.push_back(glow::INVALID_OPERATION);
            return;
        };
        texture.levels.insert(
            level,
            HeadlessLevel {
                width,
                height,
                format,
                ty: glow::UNSIGNED_BYTE,
                compressed: true,
                data: data.to_vec(),
            },
        );
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
        let row_length = if self.row_length > 0 { self.row_length } else { width } as usize;
        let Some(level) = self.bound_mut().and_then(|texture| texture.levels.get_mut(&0)) else {
            self.errors.push_back(glow::INVALID_OPERATION);
            return;
        };
        if x_offset < 0
            || y_offset < 0
            || (x_offset + width) as u32 > level.width
            || (y_offset + height) as u32 > level.height
        {
            self.errors.push_back(glow::INVALID_VALUE);
            return;
        }
        let bpp = texel_bytes(format, ty);
        let dst_stride = level.width as usize * bpp;
        let row_bytes = width as usize * bpp;
        for row in 0..height as usize {
            let src_start = row * row_length * bpp;
            let Some(src) = pixels.get(src_start..src_start + row_bytes) else {
                break;
            };
            let dst_start = (y_offset as usize + row) * dst_stride + x_offset as usize * bpp;
            level.data[dst_start..dst_start + row_bytes].copy_from_slice(src);
        }
    }

    fn copy_tex_sub_image_2d(&mut self, x_offset: i32, y_offset: i32, fb_x: i32, fb_y: i32, width: i32, height: i32) {
        let (fb_width, fb_height, fb_data) = std::mem::take(&mut self.framebuffer);
        if let Some(level) = self.bound_mut().and_then(|texture| texture.levels.get_mut(&0)) {
            let bpp = texel_bytes(level.format, level.ty).min(4);
            let level_bpp = texel_bytes(level.format, level.ty);
            for y in 0..height.max(0) as u32 {
                for x in 0..width.max(0) as u32 {
                    let (sx, sy) = (fb_x as u32 + x, fb_y as u32 + y);
                    let (dx, dy) = (x_offset as u32 + x, y_offset as u32 + y);
                    if sx >= fb_width || sy >= fb_height || dx >= level.width || dy >= level.height {
                        continue;
                    }
                    let src = ((sy * fb_width + sx) * 4) as usize;
                    let dst = ((dy * level.width + dx) as usize) * level_bpp;
                    level.data[dst..dst + bpp].copy_from_slice(&fb_data[src..src + bpp]);
                }
            }
        }
        self.framebuffer = (fb_width, fb_height, fb_data);
    }

    fn generate_mipmap(&mut self) {
        let Some(texture) = self.bound_mut() else {
            return;
        };
        let Some(base) = texture.levels.get(&0).cloned() else {
            return;
        };
        if base.compressed {
            return;
        }
        let components = texel_bytes(base.format, base.ty) as u8;
        let max_level = if texture.mip_range.1 > 0 { texture.mip_range.1 } else { i32::MAX };
        let mut current = base;
        let mut level = 0;
        while (current.width > 1 || current.height > 1) && level < max_level {
            let Ok(data) = generate_mip(&current.data, current.width, current.height, components) else {
                return;
            };
            level += 1;
            current = HeadlessLevel {
                width: (current.width / 2).max(1),
                height: (current.height / 2).max(1),
                data,
                ..current
            };
            texture.levels.insert(level, current.clone());
        }
    }

    fn level_size(&mut self, level: i32) -> (i32, i32) {
        if let Some(size) = self.level_size_override {
            return size;
        }
        self.bound_mut()
            .and_then(|texture| texture.levels.get(&level))
            .map_or((0, 0), |level| (level.width as i32, level.height as i32))
    }

    fn level_compressed_size(&mut self, level: i32) -> Option<usize> {
        let level = self.bound_mut()?.levels.get(&level)?;
        level.compressed.then_some(level.data.len())
    }

    fn get_tex_image(&mut self, level: i32, _format: u32, _ty: u32, out: &mut [u8]) {
        let Some(level) = self.bound_mut().and_then(|texture| texture.levels.get(&level)) else {
            self.errors.push_back(glow::INVALID_OPERATION);
            return;
        };
        let count = level.data.len().min(out.len());
        out[..count].copy_from_slice(&level.data[..count]);
    }

    fn get_compressed_tex_image(&mut self, level: i32, out: &mut [u8]) {
        self.get_tex_image(level, 0, 0, out);
    }

    fn get_error(&mut self) -> u32 {
        self.errors.pop_front().unwrap_or(glow::NO_ERROR)
    }
}
