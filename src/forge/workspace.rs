// SYNOID Frame Workspace
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Ephemeral per-operation directory: `input/` and `output/` frame folders
// plus side files such as the extracted audio. Uniquely named, owned by one
// operation, and removed when the guard drops, including on error and panic.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ForgeResult, IoContext};

pub const FRAME_DIGITS: usize = 8;

#[derive(Debug)]
pub struct FrameWorkspace {
    root: PathBuf,
    input: PathBuf,
    output: PathBuf,
}

impl FrameWorkspace {
    /// Creates `<temp_root>/synoid-<label>-<uuid>/{input,output}`.
    pub fn allocate(temp_root: &Path, label: &str) -> ForgeResult<Self> {
        let root = temp_root.join(format!("synoid-{}-{}", label, Uuid::new_v4().simple()));
        let input = root.join("input");
        let output = root.join("output");
        fs::create_dir_all(&input).io_context(|| format!("creating {}", input.display()))?;
        let ws = Self { root, input, output };
        fs::create_dir_all(&ws.output).io_context(|| format!("creating {}", ws.output.display()))?;
        debug!("[WORKSPACE] Allocated {}", ws.root.display());
        Ok(ws)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn input_dir(&self) -> &Path {
        &self.input
    }

    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    /// Path for a side file living next to the frame folders.
    pub fn side_file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Numbered frame pattern such as `frame_%08d.jpg`.
    pub fn frame_pattern(dir: &Path, prefix: &str, ext: &str) -> PathBuf {
        dir.join(format!("{}%0{}d.{}", prefix, FRAME_DIGITS, ext))
    }

    /// Frame files in `dir`, in recombination order.
    pub fn frames_in(dir: &Path) -> Vec<PathBuf> {
        let mut frames: Vec<PathBuf> = walkdir::WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        frames.sort();
        frames
    }

    /// Between passes: empty `input/`, then move every `output/` frame into it.
    pub fn promote_output(&self) -> ForgeResult<usize> {
        fs::remove_dir_all(&self.input).io_context(|| format!("clearing {}", self.input.display()))?;
        fs::create_dir_all(&self.input).io_context(|| format!("recreating {}", self.input.display()))?;

        let frames = Self::frames_in(&self.output);
        for frame in &frames {
            if let Some(name) = frame.file_name() {
                let dest = self.input.join(name);
                fs::rename(frame, &dest).io_context(|| format!("moving {}", frame.display()))?;
            }
        }
        Ok(frames.len())
    }
}

impl Drop for FrameWorkspace {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => debug!("[WORKSPACE] Removed {}", self.root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("[WORKSPACE] Cleanup failed for {}: {}", self.root.display(), e),
        }
    }
}

/// Audio extracted from a source. Only counts when it clears the size threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSidecar {
    path: PathBuf,
}

impl AudioSidecar {
    pub fn detect(path: &Path, min_bytes: u64) -> Option<Self> {
        let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        if size > min_bytes {
            info!("[WORKSPACE] Audio sidecar found ({} bytes)", size);
            Some(Self { path: path.to_path_buf() })
        } else {
            if size > 0 {
                debug!("[WORKSPACE] Audio sidecar too small ({} bytes), ignoring", size);
            }
            None
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
