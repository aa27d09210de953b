// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use std::sync::atomic::{AtomicBool, Ordering};

/// Alpha above this counts as opaque for hit testing.
const PICK_ALPHA_THRESHOLD: u8 = 32;

static WARNED_NON_FINITE: AtomicBool = AtomicBool::new(false);
static WARNED_OUT_OF_RANGE: AtomicBool = AtomicBool::new(false);
static WARNED_WIDTH_OVERRUN: AtomicBool = AtomicBool::new(false);
static WARNED_HEIGHT_OVERRUN: AtomicBool = AtomicBool::new(false);

fn warn_once(flag: &AtomicBool, message: &str) {
    if !flag.swap(true, Ordering::Relaxed) {
        log::warn!("{}", message);
    }
}

/// One bit per 2x2 block of the base level: set where the block's top-left alpha is opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickMask {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl PickMask {
    /// Builds the mask from tightly packed 8-bit RGBA texels.
    pub fn from_rgba8(width: u32, height: u32, rgba: &[u8]) -> Option<Self> {
        let (w, h) = (width as usize, height as usize);
        if rgba.len() < w * h * 4 {
            log::warn!(
                "pick mask source of {} bytes is too small for {}x{}",
                rgba.len(),
                width,
                height
            );
            return None;
        }

        // Storage covers one extra row and column beyond the addressable range.
        let pick_width = width / 2 + 1;
        let pick_height = height / 2 + 1;
        let size = (pick_width as usize * pick_height as usize + 7) / 8;
        let mut bits = vec![0u8; size];

        let mut pick_bit = 0usize;
        for y in (0..h).step_by(2) {
            for x in (0..w).step_by(2) {
                if rgba[(y * w + x) * 4 + 3] > PICK_ALPHA_THRESHOLD {
                    bits[pick_bit / 8] |= 1 << (pick_bit % 8);
                }
                pick_bit += 1;
            }
        }

        Some(Self {
            width: pick_width - 1,
            height: pick_height - 1,
            bits,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn byte_len(&self) -> usize {
        self.bits.len()
    }

    fn bit(&self, index: usize) -> bool {
        self.bits
            .get(index / 8)
            .is_some_and(|byte| byte & (1 << (index % 8)) != 0)
    }

    /// Hit test at texture coordinate `u`,`v`. Coordinates wrap to their fractional part.
    pub fn get(&self, u: f32, v: f32) -> bool {
        let (mut u, mut v) = if u.is_finite() && v.is_finite() {
            (u - u.floor(), v - v.floor())
        } else {
            warn_once(&WARNED_NON_FINITE, "non-finite u/v in mask pick");
            (0.0, 0.0)
        };

        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            warn_once(&WARNED_OUT_OF_RANGE, "u/v out of range in image mask pick");
            u = 0.0;
            v = 0.0;
        }

        let mut x = (u * self.width as f32).floor() as u32;
        let mut y = (v * self.height as f32).floor() as u32;
        if x > self.width {
            warn_once(&WARNED_WIDTH_OVERRUN, "width overrun on pick mask read");
            x = self.width;
        }
        if y > self.height {
            warn_once(&WARNED_HEIGHT_OVERRUN, "height overrun on pick mask read");
            y = self.height;
        }

        self.bit(y as usize * self.width as usize + x as usize)
    }

    /// Fraction of addressable cells that pass the hit test.
    pub fn coverage(&self) -> f32 {
        let cells = self.width as usize * self.height as usize;
        if cells == 0 {
            return 0.0;
        }
        let set = (0..cells).filter(|&index| self.bit(index)).count();
        set as f32 / cells as f32
    }
}

/// Hit test against an optional mask; textures without one always pass.
pub fn mask_hit(mask: Option<&PickMask>, u: f32, v: f32) -> bool {
    mask.map_or(true, |mask| mask.get(u, v))
}
