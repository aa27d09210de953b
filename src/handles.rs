// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use slotmap::new_key_type;

new_key_type! {
    /// Generation-checked key of a texture living in a [`crate::TextureManager`].
    /// A key outlives its texture safely: lookups after release return `None`.
    pub struct TextureHandle;
}
