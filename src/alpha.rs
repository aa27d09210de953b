// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

//! Classifies an image's alpha channel as a 1-bit mask or as continuous alpha.
//!
//! The histogram thresholds below are tuned against existing content and must not drift:
//! renderers pick alpha-mask vs. alpha-blend pipelines from `is_mask`.

/// Where the alpha byte of each texel lives in an uploaded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlphaLayout {
    /// Byte offset of the alpha sample inside the first texel.
    pub offset: usize,
    /// Bytes between consecutive alpha samples.
    pub stride: usize,
}

impl AlphaLayout {
    /// Derives the alpha layout for a primary format and pixel type.
    /// `None` when the format has no alpha channel or the combination is not understood.
    pub fn for_format(primary: u32, ty: u32) -> Option<Self> {
        let stride = match primary {
            glow::LUMINANCE | glow::ALPHA => 1,
            glow::LUMINANCE_ALPHA => 2,
            glow::RGBA | glow::SRGB_ALPHA | glow::BGRA => 4,
            _ => return None,
        };

        let offset = match ty {
            glow::UNSIGNED_BYTE => stride - 1,
            glow::UNSIGNED_INT_8_8_8_8 if cfg!(target_endian = "little") => 0,
            glow::UNSIGNED_INT_8_8_8_8 => 3,
            glow::UNSIGNED_INT_8_8_8_8_REV if cfg!(target_endian = "little") => 3,
            glow::UNSIGNED_INT_8_8_8_8_REV => 0,
            _ => return None,
        };

        if primary == glow::BGRA && ty != glow::UNSIGNED_BYTE {
            return None;
        }
        Some(Self { offset, stride })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaAnalysis {
    pub is_mask: bool,
    /// Fraction of texels whose alpha is strictly between 2 and 253.
    pub mask_mid_percentile: f32,
    /// `f32::MAX` when the alpha range does not span a multiple of 255.
    pub mask_rmse: f32,
}

/// Histogram analysis of the alpha samples in a `width` x `height` image.
///
/// Returns `None` when `data` is too short for the given layout.
pub fn analyze_alpha(data: &[u8], width: u32, height: u32, layout: AlphaLayout) -> Option<AlphaAnalysis> {
    let (w, h) = (width as usize, height as usize);
    let texels = w * h;
    if texels == 0 {
        return None;
    }
    let AlphaLayout { offset, stride } = layout;
    let required = offset + (texels - 1) * stride + 1;
    if data.len() < required {
        log::warn!(
            "alpha analysis needs {} bytes for {}x{} but got {}",
            required,
            width,
            height,
            data.len()
        );
        return None;
    }

    let mut sum = 0f64;
    let mut length = texels as u64;
    let mut alpha_total = 0u64;
    let mut sample = [0u64; 16];
    // min deliberately starts at 0 rather than 255
    let (mut min, mut max, mut mids) = (0u32, 0u32, 0u64);
    let is_mid = |s: u32| u64::from(s > 2 && s < 253);

    if w >= 2 && h >= 2 && w % 2 == 0 && h % 2 == 0 {
        // Each 2x2 box contributes its four samples plus their average, so
        // high-frequency alpha (which aliases badly as a mask) skews towards mid-range.
        let row_bytes = w * stride;
        for y in (0..h).step_by(2) {
            let mut current = offset + y * row_bytes;
            for _ in (0..w).step_by(2) {
                let s1 = u32::from(data[current]);
                let s2 = u32::from(data[current + row_bytes]);
                current += stride;
                let s3 = u32::from(data[current]);
                let s4 = u32::from(data[current + row_bytes]);
                current += stride;

                for s in [s1, s2, s3, s4] {
                    alpha_total += u64::from(s);
                    sample[(s / 16) as usize] += 1;
                    min = min.min(s);
                    max = max.max(s);
                    mids += is_mid(s);
                }

                let asum = s1 + s2 + s3 + s4;
                alpha_total += u64::from(asum);
                sample[(asum / (16 * 4)) as usize] += 4;

                let mut avg = (asum / 4) as i32;
                if avg >= 128 {
                    avg -= 255;
                }
                sum += f64::from(avg * avg * 4) / texels as f64;
            }
        }
        length *= 2;
    } else {
        let mut current = offset;
        for i in 0..texels {
            let s1 = u32::from(data[current]);
            alpha_total += u64::from(s1);
            sample[(s1 / 16) as usize] += 1;
            current += stride;

            min = min.min(s1);
            max = max.max(s1);
            mids += is_mid(s1);

            if i + 1 != texels && i % 2 == 0 {
                let s2 = u32::from(data[current]);
                min = min.min(s2);
                max = max.max(s2);
                mids += is_mid(s2);

                let mut avg = ((s1 + s2) / 2) as i32;
                if avg >= 128 {
                    avg -= 255;
                }
                sum += f64::from(avg * avg * 2) / texels as f64;
            }
        }
    }

    let midrange_total: u64 = sample[3..13].iter().sum();
    let lower_half_total: u64 = sample[..8].iter().sum();
    let upper_half_total: u64 = sample[8..].iter().sum();

    // Lots of mid-range, or everything clumped on one half without sitting at the extreme.
    let is_mask = !(midrange_total > length / 48
        || (lower_half_total == length && alpha_total != 0)
        || (upper_half_total == length && alpha_total != 255 * length));

    let mask_rmse = if (max - min) % 255 == 0 {
        (sum.sqrt() / 255.0) as f32
    } else {
        f32::MAX
    };

    Some(AlphaAnalysis {
        is_mask,
        mask_mid_percentile: mids as f32 / texels as f32,
        mask_rmse,
    })
}
