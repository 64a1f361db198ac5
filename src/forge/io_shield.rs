// SYNOID I/O Shield
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Every strategy renders into a staged sibling of the destination. Only a
// fully successful operation commits it; a failure or panic drops the stage
// and the destination is never touched.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ForgeError, ForgeResult, IoContext};

pub struct AtomicMover;

impl AtomicMover {
    /// Same filesystem: `fs::rename`. Otherwise copy then delete.
    pub fn commit(temp_path: &Path, final_path: &Path) -> ForgeResult<()> {
        if !temp_path.exists() {
            return Err(ForgeError::resource(
                format!("committing {}", final_path.display()),
                std::io::Error::new(std::io::ErrorKind::NotFound, "staged file missing"),
            ));
        }

        match fs::rename(temp_path, final_path) {
            Ok(()) => {
                info!("[IO_SHIELD] ✅ {} → {}", temp_path.display(), final_path.display());
                Ok(())
            }
            Err(_) => {
                warn!("[IO_SHIELD] Rename failed (cross-device?). Falling back to copy-delete.");
                fs::copy(temp_path, final_path)
                    .io_context(|| format!("copying to {}", final_path.display()))?;
                fs::remove_file(temp_path)
                    .io_context(|| format!("removing {}", temp_path.display()))?;
                info!("[IO_SHIELD] ✅ Cross-device move complete: {}", final_path.display());
                Ok(())
            }
        }
    }

    /// `render/output.mp4` → `render/output.forge-<uuid>.mp4`. The extension is
    /// kept so engines still pick the container from it.
    pub fn staging_path_for(final_path: &Path) -> PathBuf {
        let stem = final_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let name = match final_path.extension() {
            Some(ext) => format!("{}.forge-{}.{}", stem, Uuid::new_v4().simple(), ext.to_string_lossy()),
            None => format!("{}.forge-{}", stem, Uuid::new_v4().simple()),
        };
        final_path.with_file_name(name)
    }
}

/// A reserved staging file, deleted on drop unless committed.
#[derive(Debug)]
pub struct StagedOutput {
    staged: PathBuf,
    destination: PathBuf,
    committed: bool,
}

impl StagedOutput {
    pub fn new(destination: &Path) -> ForgeResult<Self> {
        let destination = absolute(destination)?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .io_context(|| format!("creating {}", parent.display()))?;
        }
        Ok(Self {
            staged: AtomicMover::staging_path_for(&destination),
            destination,
            committed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.staged
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Move into place, refusing an empty stage.
    pub fn commit(mut self) -> ForgeResult<PathBuf> {
        match fs::metadata(&self.staged) {
            Ok(meta) if meta.len() == 0 => {
                return Err(ForgeError::PartialArtifact { path: self.destination.clone() });
            }
            _ => {}
        }
        AtomicMover::commit(&self.staged, &self.destination)?;
        self.committed = true;
        Ok(self.destination.clone())
    }
}

impl Drop for StagedOutput {
    fn drop(&mut self) {
        if self.committed || !self.staged.exists() {
            return;
        }
        if let Err(e) = fs::remove_file(&self.staged) {
            warn!("[IO_SHIELD] Could not remove stage {}: {}", self.staged.display(), e);
        }
    }
}

pub fn absolute(path: &Path) -> ForgeResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().io_context(|| "reading current directory".to_string())?;
    Ok(cwd.join(path))
}
