// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use std::collections::HashMap;

/// Memory-accounting bucket a texture's footprint is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureCategory(pub i32);

impl TextureCategory {
    pub const UNCATEGORIZED: TextureCategory = TextureCategory(-1);
}

impl Default for TextureCategory {
    fn default() -> Self {
        Self::UNCATEGORIZED
    }
}

/// Aggregate texture memory and bind counters shared by every texture of a manager.
#[derive(Debug, Clone, Default)]
pub struct TextureStats {
    total_resident_bytes: i64,
    bound_bytes_this_frame: i64,
    bound_bytes_last_frame: i64,
    bind_count: u64,
    unique_bind_count: u64,
    last_frame_time: f32,
    category_bytes: HashMap<TextureCategory, i64>,
}

impl TextureStats {
    pub fn total_resident_bytes(&self) -> i64 {
        self.total_resident_bytes
    }

    pub fn bound_bytes_this_frame(&self) -> i64 {
        self.bound_bytes_this_frame
    }

    pub fn bound_bytes_last_frame(&self) -> i64 {
        self.bound_bytes_last_frame
    }

    pub fn bind_count(&self) -> u64 {
        self.bind_count
    }

    pub fn unique_bind_count(&self) -> u64 {
        self.unique_bind_count
    }

    /// Frame timestamp of the most recent `update_stats`.
    pub fn last_frame_time(&self) -> f32 {
        self.last_frame_time
    }

    pub fn category_bytes(&self, category: TextureCategory) -> i64 {
        self.category_bytes.get(&category).copied().unwrap_or(0)
    }

    pub(crate) fn add_resident(&mut self, category: TextureCategory, bytes: i64) {
        self.total_resident_bytes += bytes;
        *self.category_bytes.entry(category).or_insert(0) += bytes;
    }

    pub(crate) fn sub_resident(&mut self, category: TextureCategory, bytes: i64) {
        self.add_resident(category, -bytes);
        if self.category_bytes.get(&category) == Some(&0) {
            self.category_bytes.remove(&category);
        }
    }

    pub(crate) fn record_bind(&mut self) {
        self.bind_count += 1;
    }

    pub(crate) fn record_unique_bind(&mut self, bytes: i64) {
        self.unique_bind_count += 1;
        self.bound_bytes_this_frame += bytes;
    }

    /// Starts a new frame: this frame's bound memory becomes last frame's.
    pub fn update_stats(&mut self, current_time: f32) {
        self.last_frame_time = current_time;
        self.bound_bytes_last_frame = self.bound_bytes_this_frame;
        self.bound_bytes_this_frame = 0;
    }
}
