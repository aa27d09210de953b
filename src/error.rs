// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use thiserror::Error;

/// Which tier an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad caller data. State is unchanged or fully rolled back.
    InvalidInput,
    /// A programming error. The caller must not keep using the resource as if nothing happened.
    InternalInvariantViolation,
}

/// Consistency violations that indicate a bug in the caller or in this crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("unknown pixel format 0x{0:04X}")]
    UnknownFormat(u32),

    #[error("bad number of components for texture: {0}")]
    BadComponentCount(u8),

    #[error("compressed image has mipmaps but data does not (can not generate compressed mips)")]
    CompressedMipsUnavailable,

    #[error("set_sub_image called with a mipmapped image")]
    SubImageOnMipmapped,

    #[error("set_sub_image requires discard level 0, current level is {0}")]
    SubImageDiscardLevel(i32),

    #[error("subimage {x},{y} {width}x{height} not wholly in {target} image of {bound_width}x{bound_height}")]
    SubImageOutOfBounds {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        target: &'static str,
        bound_width: i32,
        bound_height: i32,
    },

    #[error("device texture still allocated while restoring")]
    RestoreOverLiveTexture,

    #[error("saved image is {saved_width}x{saved_height}x{saved_components}, texture expects {width}x{height}x{components}")]
    SavedImageMismatch {
        saved_width: u32,
        saved_height: u32,
        saved_components: u8,
        width: u32,
        height: u32,
        components: u8,
    },

    #[error("readback with bogus params: {width} x {height} x {components}")]
    BogusReadbackParams {
        width: u32,
        height: u32,
        components: u8,
    },

    #[error("image size {width}x{height}x{components} does not match discard level {level}")]
    ImageSizeMismatch {
        width: u32,
        height: u32,
        components: u8,
        level: i32,
    },

    #[error("wrong texture size and discard level: device {device_width}x{device_height}, expected {width}x{height} at level {level}")]
    DeviceSizeMismatch {
        device_width: i32,
        device_height: i32,
        width: u32,
        height: u32,
        level: i32,
    },

    #[error("no current discard level to default to")]
    NoCurrentDiscardLevel,
}

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("texture has non power of two dimension: {width}x{height}")]
    NonPowerOfTwo { width: u32, height: u32 },

    #[error("trying to create a texture from invalid image data")]
    InvalidImage,

    #[error("no device texture allocated")]
    NoDeviceTexture,

    #[error("discard level {level} outside [{min}, {max}]")]
    DiscardLevelOutOfRange { level: i32, min: i32, max: i32 },

    #[error("no mip data at discard level {0}")]
    MissingLevel(i32),

    #[error("texture size is smaller than it should be: expected width {expected}, device reports {device}")]
    DeviceSizeMismatch { expected: u32, device: i32 },

    #[error("device error 0x{0:04X} while reading back texture")]
    Device(u32),

    #[error("failed to allocate {bytes} bytes for mip level {level}")]
    Allocation { level: i32, bytes: usize },

    #[error("failed to create device texture: {0}")]
    CreateFailed(String),

    #[error("unknown texture handle")]
    UnknownHandle,

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

impl TextureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TextureError::Invariant(_) => ErrorKind::InternalInvariantViolation,
            _ => ErrorKind::InvalidInput,
        }
    }

    pub fn is_invariant_violation(&self) -> bool {
        self.kind() == ErrorKind::InternalInvariantViolation
    }
}
