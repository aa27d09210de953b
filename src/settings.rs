// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use dirs_next::config_dir;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Process-wide texture options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextureSettings {
    /// Skip alpha classification even for textures that ask for it.
    pub skip_analyze_alpha: bool,
    /// Let the driver compress uncompressed uploads with its generic formats.
    pub compress_textures: bool,
    pub use_anisotropic: bool,
    pub max_anisotropy: f32,
    /// Readback of a level larger than this on either axis is treated as corrupt state.
    pub max_readback_dimension: u32,
    /// Seconds after a bind during which a texture counts as just bound.
    pub just_bound_secs: f32,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            skip_analyze_alpha: false,
            compress_textures: false,
            use_anisotropic: false,
            max_anisotropy: 16.0,
            max_readback_dimension: 2048,
            just_bound_secs: 0.5,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Deserialization Error: {0}")]
    Deserialize(#[from] toml::de::Error),

    #[error("Serialization Error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Configuration Directory Not Found")]
    ConfigDirNotFound,
}

impl TextureSettings {
    /// Retrieves the path to the settings file.
    pub fn settings_path() -> Result<PathBuf, SettingsError> {
        let config_dir = config_dir().ok_or(SettingsError::ConfigDirNotFound)?;
        Ok(config_dir.join("glimage").join("texture_settings.toml"))
    }

    /// Loads settings from a specified file path.
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        let settings: TextureSettings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Saves settings to a specified file path, ensuring the directory exists.
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Loads `path`, or writes and returns the defaults when it does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            return Self::load_from_file(path);
        }
        log::info!("{} not found, writing default texture settings", path.display());
        let settings = TextureSettings::default();
        settings.save_to_file(path)?;
        Ok(settings)
    }

    /// Settings from the user's config directory, falling back to defaults on any error.
    pub fn load_user_settings() -> Self {
        match Self::settings_path().and_then(|path| Self::load_or_create(&path)) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Error loading texture settings: {}. Using defaults.", e);
                TextureSettings::default()
            }
        }
    }
}
