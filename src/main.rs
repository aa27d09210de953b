// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use glimage::{HeadlessDevice, RawImage, TextureError, TextureManager, TextureSettings};
use log::{error, info};
use thiserror::Error;

#[derive(Debug, Error)]
enum AuditError {
    #[error("usage: texaudit <image>...")]
    Usage,

    #[error("{}: {source}", path.display())]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("{}: {source}", path.display())]
    Texture { path: PathBuf, source: TextureError },

    #[error("device loss changed counters: {0}")]
    CounterDrift(String),

    #[error(transparent)]
    Restore(#[from] TextureError),
}

impl AuditError {
    fn exit_code(&self) -> ExitCode {
        let fatal = match self {
            AuditError::Texture { source, .. } | AuditError::Restore(source) => source.is_invariant_violation(),
            AuditError::CounterDrift(_) => true,
            _ => false,
        };
        ExitCode::from(if fatal { 2 } else { 1 })
    }
}

fn load_raw(path: &Path) -> Result<RawImage, AuditError> {
    let img = image::open(path).map_err(|source| AuditError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(RawImage::from_dynamic_image(&img))
}

#[derive(Debug, PartialEq)]
struct Counters {
    resident: i64,
    live: usize,
}

impl Counters {
    fn capture(manager: &TextureManager) -> Self {
        Self {
            resident: manager.stats().total_resident_bytes(),
            live: manager.live_count(),
        }
    }
}

fn run(paths: &[PathBuf]) -> Result<(), AuditError> {
    if paths.is_empty() {
        return Err(AuditError::Usage);
    }

    let mut device = HeadlessDevice::default();
    let mut manager = TextureManager::new(TextureSettings::load_user_settings());

    for path in paths {
        let raw = load_raw(path)?;
        let handle = manager
            .create_from_raw(&mut device, &raw, true, true)
            .map_err(|source| AuditError::Texture {
                path: path.clone(),
                source,
            })?;
        let Some(texture) = manager.get(handle) else {
            continue;
        };

        let footprint = texture
            .bytes(None)
            .and_then(|bytes| texture.mip_bytes(None).map(|mip_bytes| (bytes, mip_bytes)))
            .map_err(|e| AuditError::Texture {
                path: path.clone(),
                source: e.into(),
            })?;
        let coverage = texture.pick_mask().map(|mask| mask.coverage());

        println!("{}", path.display());
        println!(
            "  size {}x{}x{}  max discard {}",
            raw.width(),
            raw.height(),
            raw.components(),
            texture.max_discard_level()
        );
        println!(
            "  is_mask {}  mid percentile {:.4}  rmse {:.4}",
            texture.is_mask(),
            texture.mask_mid_percentile(),
            texture.mask_rmse()
        );
        println!("  bytes {}  mip_bytes {}", footprint.0, footprint.1);
        match coverage {
            Some(coverage) => println!("  pick coverage {:.1}%", coverage * 100.0),
            None => println!("  pick coverage n/a"),
        }
    }

    manager.audit(&mut device)?;

    let before = Counters::capture(&manager);
    manager.destroy_gl(&mut device, true)?;
    manager.restore_gl(&mut device)?;
    let after = Counters::capture(&manager);
    info!("device loss simulated: before {:?} after {:?}", before, after);

    if before != after {
        return Err(AuditError::CounterDrift(format!("{:?} -> {:?}", before, after)));
    }
    println!(
        "device loss round trip ok: {} textures, {} bytes resident",
        after.live, after.resident
    );

    let handles: Vec<_> = manager.iter().map(|(handle, _)| handle).collect();
    for handle in handles {
        manager.release(&mut device, handle)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();

    match run(&paths) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("texaudit: {}", e);
            e.exit_code()
        }
    }
}
