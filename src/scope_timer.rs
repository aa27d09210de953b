// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use std::time::Instant;

/// Logs how long a texture operation took when dropped.
pub struct ScopeTimer<'a> {
    name: &'a str,
    start_time: Instant,
}

impl<'a> ScopeTimer<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            start_time: Instant::now(),
        }
    }
}

impl Drop for ScopeTimer<'_> {
    fn drop(&mut self) {
        log::trace!("{} took {:.2?}", self.name, self.start_time.elapsed());
    }
}
