// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

//! GL texture resources: discard-level bookkeeping, mip upload, alpha classification,
//! pick masks and memory accounting over a pluggable [`device::TextureDevice`].

pub mod alpha;
pub mod device;
pub mod error;
pub mod format;
pub mod handles;
pub mod memory;
pub mod pick_mask;
pub mod raw_image;
pub mod scope_timer;
pub mod settings;
pub mod texture;
pub mod texture_manager;

pub use alpha::{analyze_alpha, AlphaAnalysis, AlphaLayout};
pub use device::{AddressMode, DeviceCaps, DeviceTexture, FilterOption, GlowDevice, HeadlessDevice, TextureDevice};
pub use error::{ErrorKind, InvariantViolation, TextureError};
pub use format::PixelFormat;
pub use handles::TextureHandle;
pub use memory::{TextureCategory, TextureStats};
pub use pick_mask::PickMask;
pub use raw_image::RawImage;
pub use settings::TextureSettings;
pub use texture::{TextureContext, TextureFormat, TextureResource, MAX_DISCARD_LEVEL};
pub use texture_manager::TextureManager;
