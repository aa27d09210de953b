// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use approx::assert_relative_eq;
use glimage::raw_image::generate_mip;
use glimage::{
    DeviceCaps, HeadlessDevice, RawImage, TextureCategory, TextureError, TextureManager, TextureResource,
    TextureSettings,
};

fn gradient_rgba(size: u32) -> RawImage {
    let mut data = Vec::new();
    for y in 0..size {
        for x in 0..size {
            let alpha = if x < size / 2 { 255 } else { 0 };
            data.extend_from_slice(&[(x * 16) as u8, (y * 16) as u8, 0, alpha]);
        }
    }
    RawImage::new(size, size, 4, data)
}

#[test]
fn create_read_back_lose_and_restore() {
    let mut device = HeadlessDevice::default();
    let mut manager = TextureManager::new(TextureSettings::default());
    let raw = gradient_rgba(8);

    let handle = manager.create_from_raw(&mut device, &raw, true, true).unwrap();
    let texture = manager.get(handle).unwrap();
    assert_eq!(texture.max_discard_level(), 3);
    assert!(texture.is_mask());
    assert_relative_eq!(texture.pick_mask().unwrap().coverage(), 0.5);
    // 8x8 + 4x4 + 2x2 + 1x1 RGBA
    assert_eq!(manager.stats().total_resident_bytes(), 256 + 64 + 16 + 4);

    // driver-generated level 1 matches a CPU box filter of the base level
    let level1 = texture.read_back_raw(&mut device, manager.context(), Some(1), false).unwrap();
    assert_eq!(level1.data(), &generate_mip(raw.data(), 8, 8, 4).unwrap()[..]);

    let before = manager.stats().total_resident_bytes();
    manager.destroy_gl(&mut device, true).unwrap();
    assert_eq!(device.live_textures(), 0);
    assert_eq!(manager.stats().total_resident_bytes(), 0);

    manager.restore_gl(&mut device).unwrap();
    assert_eq!(manager.stats().total_resident_bytes(), before);
    let texture = manager.get(handle).unwrap();
    let restored = texture.read_back_raw(&mut device, manager.context(), None, false).unwrap();
    assert_eq!(restored.data(), raw.data());
    // alpha data is recomputed from the restored base level
    assert!(texture.is_mask());
    assert!(texture.pick_mask().is_some());

    manager.release(&mut device, handle).unwrap();
    assert_eq!(manager.stats().total_resident_bytes(), 0);
}

#[test]
fn reduced_resolution_then_full_resolution() {
    let mut device = HeadlessDevice::new(DeviceCaps {
        mipmap_generation: false,
        ..Default::default()
    });
    let mut manager = TextureManager::default();
    let handle = manager.insert(TextureResource::new(true));
    let (texture, ctx) = manager.texture_and_context_mut(handle).unwrap();

    // a 64x64 image streamed in at discard level 2
    let low = RawImage::filled(16, 16, &[0, 0, 0, 255]);
    texture
        .create_gl_texture_from_raw(&mut device, ctx, Some(2), &low, None, true, TextureCategory(7))
        .unwrap();
    assert_eq!(texture.width(Some(0)), 64);
    assert_eq!(texture.current_discard_level(), 2);
    let low_bytes = texture.texture_memory();
    assert_eq!(ctx.stats.category_bytes(TextureCategory(7)), low_bytes);

    let full = RawImage::filled(64, 64, &[0, 0, 0, 255]);
    texture
        .create_gl_texture_from_raw(&mut device, ctx, Some(0), &full, None, true, TextureCategory(7))
        .unwrap();
    assert_eq!(texture.current_discard_level(), 0);
    assert!(texture.texture_memory() > low_bytes);
    assert_eq!(ctx.stats.total_resident_bytes(), texture.texture_memory());
    // only the new texture survives
    assert_eq!(device.live_textures(), 1);

    manager.release(&mut device, handle).unwrap();
    assert_eq!(manager.stats().category_bytes(TextureCategory(7)), 0);
}

#[test]
fn sub_image_then_read_back() {
    let mut device = HeadlessDevice::default();
    let mut manager = TextureManager::default();
    let handle = manager
        .create_from_raw(&mut device, &RawImage::filled(4, 4, &[0, 0]), false, false)
        .unwrap();
    let (texture, ctx) = manager.texture_and_context_mut(handle).unwrap();

    // region offsets index the source image as well as the texture
    let patch = RawImage::filled(4, 4, &[9, 10]);
    texture.set_sub_image_raw(&mut device, ctx, &patch, 2, 2, 2, 2).unwrap();
    let back = texture.read_back_raw(&mut device, ctx, None, false).unwrap();
    let row3 = &back.data()[3 * 4 * 2..];
    assert_eq!(row3, &[0, 0, 0, 0, 9, 10, 9, 10]);

    manager.release(&mut device, handle).unwrap();
}

#[test]
fn invariant_violations_are_distinguished() {
    let mut device = HeadlessDevice::default();
    let mut manager = TextureManager::default();
    let handle = manager
        .create_from_raw(&mut device, &RawImage::filled(4, 4, &[1]), false, false)
        .unwrap();
    let (texture, ctx) = manager.texture_and_context_mut(handle).unwrap();

    let recoverable = texture
        .set_size(&mut device, ctx, 5, 4, 1, 0)
        .unwrap_err();
    assert!(!recoverable.is_invariant_violation());
    assert!(matches!(recoverable, TextureError::NonPowerOfTwo { .. }));

    let fatal = texture
        .set_sub_image(&mut device, ctx, &[0; 16], 4, 4, 0, 0, 8, 8, false)
        .unwrap_err();
    assert!(fatal.is_invariant_violation());

    manager.release(&mut device, handle).unwrap();
}

#[test]
fn bind_statistics_across_frames() {
    let mut device = HeadlessDevice::default();
    let mut manager = TextureManager::default();
    let a = manager
        .create_from_raw(&mut device, &RawImage::filled(4, 4, &[1, 2, 3, 4]), false, false)
        .unwrap();
    let b = manager
        .create_from_raw(&mut device, &RawImage::filled(2, 2, &[1, 2, 3, 4]), false, false)
        .unwrap();

    manager.update_stats(1.0);
    for _ in 0..3 {
        for handle in [a, b] {
            let (texture, ctx) = manager.texture_and_context_mut(handle).unwrap();
            assert!(texture.bind(&mut device, ctx));
        }
    }
    assert_eq!(manager.stats().bind_count(), 6);
    assert_eq!(manager.stats().unique_bind_count(), 2);
    assert_eq!(manager.stats().bound_bytes_this_frame(), 64 + 16);

    manager.update_stats(2.0);
    assert_eq!(manager.stats().bound_bytes_last_frame(), 64 + 16);
    assert_eq!(manager.stats().bound_bytes_this_frame(), 0);

    manager.release(&mut device, a).unwrap();
    manager.release(&mut device, b).unwrap();
}

#[test]
fn repeated_create_destroy_returns_counters_to_baseline() {
    let mut device = HeadlessDevice::default();
    let mut manager = TextureManager::default();
    let resident = manager
        .create_from_raw(&mut device, &RawImage::filled(4, 4, &[1, 2, 3, 4]), false, false)
        .unwrap();
    let baseline = manager.stats().total_resident_bytes();
    let category = TextureCategory(5);

    let handle = manager.insert(TextureResource::with_size(8, 8, 4, true).unwrap());
    let (texture, ctx) = manager.texture_and_context_mut(handle).unwrap();
    texture.set_explicit_format(glow::RGBA8, glow::RGBA, 0, false);
    texture.set_category(category);
    let footprint = texture.mip_bytes(Some(0)).unwrap() as i64;

    for cycle in 0..5 {
        if cycle == 2 {
            // truncated upload fails and leaves nothing behind
            let err = texture
                .create_gl_texture(&mut device, ctx, Some(0), &[0; 16], false, None)
                .unwrap_err();
            assert!(!err.is_invariant_violation());
            assert!(texture.device_texture().is_none());
            assert_eq!(ctx.stats.total_resident_bytes(), baseline);
        }

        texture
            .create_gl_texture(&mut device, ctx, Some(0), &[cycle as u8; 256], false, None)
            .unwrap();
        assert_eq!(ctx.stats.total_resident_bytes(), baseline + footprint);
        assert_eq!(ctx.stats.category_bytes(category), footprint);

        texture.destroy_gl_texture(&mut device, ctx);
        assert_eq!(ctx.stats.total_resident_bytes(), baseline);
        assert_eq!(ctx.stats.category_bytes(category), 0);
    }

    assert_eq!(device.live_textures(), 1);
    manager.release(&mut device, handle).unwrap();
    manager.release(&mut device, resident).unwrap();
    assert_eq!(manager.stats().total_resident_bytes(), 0);
}
