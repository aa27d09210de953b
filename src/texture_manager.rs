// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use std::marker::PhantomData;
use std::rc::Rc;

use slotmap::SlotMap;

use crate::device::TextureDevice;
use crate::error::TextureError;
use crate::handles::TextureHandle;
use crate::memory::{TextureCategory, TextureStats};
use crate::raw_image::RawImage;
use crate::scope_timer::ScopeTimer;
use crate::settings::TextureSettings;
use crate::texture::{TextureContext, TextureResource};

/// Owns every texture of one GL context along with the shared memory counters.
///
/// Not `Send`: it belongs to the thread that owns the device.
#[derive(Debug, Default)]
pub struct TextureManager {
    textures: SlotMap<TextureHandle, TextureResource>,
    context: TextureContext,
    _not_send: PhantomData<Rc<()>>,
}

impl TextureManager {
    pub fn new(settings: TextureSettings) -> Self {
        Self {
            textures: SlotMap::with_key(),
            context: TextureContext::new(settings),
            _not_send: PhantomData,
        }
    }

    pub fn insert(&mut self, texture: TextureResource) -> TextureHandle {
        self.textures.insert(texture)
    }

    /// Creates a texture from a decoded image at full resolution.
    pub fn create_from_raw<D: TextureDevice>(
        &mut self,
        device: &mut D,
        raw: &RawImage,
        use_mip_maps: bool,
        needs_alpha_and_pick_mask: bool,
    ) -> Result<TextureHandle, TextureError> {
        let mut texture = TextureResource::new(use_mip_maps);
        texture.set_needs_alpha_and_pick_mask(needs_alpha_and_pick_mask);
        texture.create_gl_texture_from_raw(
            device,
            &mut self.context,
            Some(0),
            raw,
            None,
            true,
            TextureCategory::UNCATEGORIZED,
        )?;
        Ok(self.textures.insert(texture))
    }

    /// Destroys the device texture and forgets the handle.
    pub fn release<D: TextureDevice>(&mut self, device: &mut D, handle: TextureHandle) -> Result<(), TextureError> {
        let mut texture = self.textures.remove(handle).ok_or(TextureError::UnknownHandle)?;
        texture.destroy_gl_texture(device, &mut self.context);
        Ok(())
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&TextureResource> {
        self.textures.get(handle)
    }

    pub fn get_mut(&mut self, handle: TextureHandle) -> Option<&mut TextureResource> {
        self.textures.get_mut(handle)
    }

    /// A texture together with the context its operations need.
    pub fn texture_and_context_mut(
        &mut self,
        handle: TextureHandle,
    ) -> Option<(&mut TextureResource, &mut TextureContext)> {
        let texture = self.textures.get_mut(handle)?;
        Some((texture, &mut self.context))
    }

    pub fn context(&self) -> &TextureContext {
        &self.context
    }

    pub fn stats(&self) -> &TextureStats {
        &self.context.stats
    }

    pub fn settings(&self) -> &TextureSettings {
        &self.context.settings
    }

    pub fn settings_mut(&mut self) -> &mut TextureSettings {
        &mut self.context.settings
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureHandle, &TextureResource)> {
        self.textures.iter()
    }

    /// Textures currently holding a device texture.
    pub fn live_count(&self) -> usize {
        self.textures
            .values()
            .filter(|texture| texture.device_texture().is_some())
            .count()
    }

    /// Starts a new frame for bind statistics.
    pub fn update_stats(&mut self, current_time: f32) {
        let _timer = ScopeTimer::new("update_stats");
        self.context.stats.update_stats(current_time);
    }

    /// Releases every device texture, optionally reading each one back first so
    /// [`Self::restore_gl`] can recreate it.
    pub fn destroy_gl<D: TextureDevice>(&mut self, device: &mut D, save_state: bool) -> Result<(), TextureError> {
        device.bind_texture(None);
        for (handle, texture) in self.textures.iter_mut() {
            if let Err(e) = texture.save_and_destroy(device, &mut self.context, save_state) {
                log::error!("destroying texture {:?} failed: {}", handle, e);
                return Err(e);
            }
        }
        log::debug!(
            "device textures destroyed, {} bytes still accounted",
            self.context.stats.total_resident_bytes()
        );
        Ok(())
    }

    /// Recreates every texture saved by [`Self::destroy_gl`].
    pub fn restore_gl<D: TextureDevice>(&mut self, device: &mut D) -> Result<(), TextureError> {
        for (handle, texture) in self.textures.iter_mut() {
            if let Err(e) = texture.restore(device, &mut self.context) {
                log::error!("restoring texture {:?} failed: {}", handle, e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Marks every texture's sampler options stale.
    pub fn dirty_tex_options(&mut self) {
        for texture in self.textures.values_mut() {
            texture.dirty_tex_options();
        }
    }

    /// Checks every uploaded texture's device size against its bookkeeping.
    pub fn audit<D: TextureDevice>(&self, device: &mut D) -> Result<(), TextureError> {
        self.textures
            .values()
            .filter(|texture| texture.device_texture().is_some() && texture.is_gl_texture_created())
            .try_for_each(|texture| texture.check_tex_size(device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;

    fn checker(size: u32) -> RawImage {
        let mut data = Vec::new();
        for y in 0..size {
            for x in 0..size {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, 128, 64, v]);
            }
        }
        RawImage::new(size, size, 4, data)
    }

    #[test]
    fn test_create_and_release() {
        let mut device = HeadlessDevice::default();
        let mut manager = TextureManager::default();
        let handle = manager.create_from_raw(&mut device, &checker(4), false, false).unwrap();
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.live_count(), 1);
        assert_eq!(manager.stats().total_resident_bytes(), 64);

        manager.release(&mut device, handle).unwrap();
        assert!(manager.is_empty());
        assert!(manager.get(handle).is_none());
        assert_eq!(device.live_textures(), 0);
        assert_eq!(manager.stats().total_resident_bytes(), 0);
        assert!(matches!(
            manager.release(&mut device, handle),
            Err(TextureError::UnknownHandle)
        ));
    }

    #[test]
    fn test_device_loss_round_trip() {
        let mut device = HeadlessDevice::default();
        let mut manager = TextureManager::default();
        let raw = checker(8);
        let handle = manager.create_from_raw(&mut device, &raw, false, false).unwrap();
        let empty = manager.insert(TextureResource::new(false));
        let bytes = manager.stats().total_resident_bytes();

        manager.destroy_gl(&mut device, true).unwrap();
        assert_eq!(manager.live_count(), 0);
        assert_eq!(manager.stats().total_resident_bytes(), 0);
        assert!(manager.get(handle).unwrap().has_saved_image());
        assert!(!manager.get(empty).unwrap().has_saved_image());

        manager.restore_gl(&mut device).unwrap();
        assert_eq!(manager.live_count(), 1);
        assert_eq!(manager.stats().total_resident_bytes(), bytes);

        let texture = manager.get(handle).unwrap();
        assert!(!texture.has_saved_image());
        let name = texture.device_texture().unwrap();
        assert_eq!(device.level_data(name, 0), Some(raw.data()));
        manager.audit(&mut device).unwrap();

        manager.release(&mut device, handle).unwrap();
    }

    #[test]
    fn test_resize_after_device_loss_restores_cleanly() {
        let mut device = HeadlessDevice::default();
        let mut manager = TextureManager::default();
        let handle = manager.create_from_raw(&mut device, &checker(8), false, false).unwrap();
        manager.destroy_gl(&mut device, true).unwrap();

        let (texture, ctx) = manager.texture_and_context_mut(handle).unwrap();
        texture.set_size(&mut device, ctx, 16, 16, 4, 0).unwrap();
        assert!(!texture.has_saved_image());

        manager.restore_gl(&mut device).unwrap();
        assert_eq!(manager.live_count(), 0);
        assert_eq!(manager.stats().total_resident_bytes(), 0);
    }

    #[test]
    fn test_destroy_without_save_restores_nothing() {
        let mut device = HeadlessDevice::default();
        let mut manager = TextureManager::default();
        let handle = manager.create_from_raw(&mut device, &checker(4), true, false).unwrap();
        manager.destroy_gl(&mut device, false).unwrap();
        manager.restore_gl(&mut device).unwrap();
        assert!(manager.get(handle).unwrap().device_texture().is_none());
    }

    #[test]
    fn test_dirty_tex_options_marks_all() {
        let mut device = HeadlessDevice::default();
        let mut manager = TextureManager::default();
        let handle = manager.create_from_raw(&mut device, &checker(2), false, false).unwrap();
        assert!(!manager.get(handle).unwrap().tex_options_dirty());
        manager.dirty_tex_options();
        assert!(manager.get(handle).unwrap().tex_options_dirty());

        let (texture, ctx) = manager.texture_and_context_mut(handle).unwrap();
        assert!(texture.bind(&mut device, ctx));
        assert!(!texture.tex_options_dirty());
        manager.release(&mut device, handle).unwrap();
    }

    #[test]
    fn test_audit_reports_size_mismatch() {
        let mut device = HeadlessDevice::default();
        let mut manager = TextureManager::default();
        let handle = manager.create_from_raw(&mut device, &checker(4), false, false).unwrap();
        device.set_level_size_override(Some((16, 16)));
        let err = manager.audit(&mut device).unwrap_err();
        assert!(err.is_invariant_violation());
        device.set_level_size_override(None);
        manager.release(&mut device, handle).unwrap();
    }
}
