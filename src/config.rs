// SYNOID Forge Configuration
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Immutable configuration shared by every operation. Built once from
// defaults, an optional JSON file and environment overrides, then handed
// around behind an `Arc`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{ForgeError, ForgeResult};
use crate::forge::request::Quality;

const CONFIG_ENV: &str = "SYNOID_FORGE_CONFIG";
const TOOLS_ENV: &str = "SYNOID_TOOLS_DIR";
const TEMP_ENV: &str = "SYNOID_TEMP_DIR";

/// Per-quality-tier encoding constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityTable {
    pub crf_high: u32,
    pub crf_medium: u32,
    pub crf_low: u32,
    pub jpeg_high: u8,
    pub jpeg_medium: u8,
    pub jpeg_low: u8,
    /// libmp3lame VBR quality for High; every other tier uses `mp3_vbr_other`.
    pub mp3_vbr_high: u32,
    pub mp3_vbr_other: u32,
    pub audio_bitrate: String,
    pub webm_crf: u32,
}

impl Default for QualityTable {
    fn default() -> Self {
        Self {
            crf_high: 18,
            crf_medium: 23,
            crf_low: 28,
            jpeg_high: 100,
            jpeg_medium: 85,
            jpeg_low: 60,
            mp3_vbr_high: 2,
            mp3_vbr_other: 5,
            audio_bitrate: "192k".to_string(),
            webm_crf: 30,
        }
    }
}

impl QualityTable {
    pub fn crf(&self, quality: Quality) -> u32 {
        match quality {
            Quality::High => self.crf_high,
            Quality::Medium => self.crf_medium,
            Quality::Low => self.crf_low,
        }
    }

    pub fn jpeg_quality(&self, quality: Quality) -> u8 {
        match quality {
            Quality::High => self.jpeg_high,
            Quality::Medium => self.jpeg_medium,
            Quality::Low => self.jpeg_low,
        }
    }

    pub fn mp3_vbr(&self, quality: Quality) -> u32 {
        match quality {
            Quality::High => self.mp3_vbr_high,
            _ => self.mp3_vbr_other,
        }
    }
}

/// Tiling constants for the learned super-resolution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilingTable {
    pub default_tile: u32,
    pub default_threads: String,
    pub safe_tile: u32,
    pub safe_threads: String,
    /// Explicit tiles at or above this size get `large_threads`.
    pub large_tile_threshold: u32,
    pub large_threads: String,
    pub small_threads: String,
}

impl Default for TilingTable {
    fn default() -> Self {
        Self {
            default_tile: 256,
            default_threads: "1:2:2".to_string(),
            safe_tile: 64,
            safe_threads: "1:1:1".to_string(),
            large_tile_threshold: 400,
            large_threads: "2:2:2".to_string(),
            small_threads: "1:2:2".to_string(),
        }
    }
}

/// Model names handed to the learned super-resolution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelTable {
    pub image: String,
    pub video: String,
    pub safe: String,
}

impl Default for ModelTable {
    fn default() -> Self {
        Self {
            image: "realesrgan-x4plus".to_string(),
            video: "realesr-animevideov3".to_string(),
            safe: "realesr-animevideov3".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    /// Explicitly configured engine directory, searched first.
    pub tools_dir: Option<PathBuf>,
    /// Fallback engine directory, relative paths resolve against the cwd.
    pub default_tools_dir: PathBuf,
    /// Parent directory for frame workspaces.
    pub temp_root: PathBuf,
    pub quality: QualityTable,
    pub tiling: TilingTable,
    pub models: ModelTable,
    /// Extracted audio at or below this size is treated as absent.
    pub audio_min_bytes: u64,
    /// Used when the source frame rate cannot be probed.
    pub default_fps: f64,
    /// Characters of stderr kept in a failure report.
    pub diagnostic_tail_chars: usize,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            tools_dir: None,
            default_tools_dir: PathBuf::from("."),
            temp_root: std::env::temp_dir(),
            quality: QualityTable::default(),
            tiling: TilingTable::default(),
            models: ModelTable::default(),
            audio_min_bytes: 1000,
            default_fps: 30.0,
            diagnostic_tail_chars: 300,
        }
    }
}

impl ForgeConfig {
    /// Defaults, then the JSON file, then environment overrides.
    ///
    /// The file is `explicit` if given, else `$SYNOID_FORGE_CONFIG`, else
    /// `<config_dir>/synoid/forge.json` when it exists.
    pub fn load(explicit: Option<&Path>) -> ForgeResult<Self> {
        let file = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV)
                .map(PathBuf::from)
                .or_else(|| Self::default_file().filter(|p| p.exists())),
        };

        let mut config = match file {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ForgeResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            ForgeError::config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let config: ForgeConfig = serde_json::from_str(&raw).map_err(|e| {
            ForgeError::config(format!("invalid config {}: {}", path.display(), e))
        })?;
        info!("[CONFIG] Loaded {}", path.display());
        Ok(config)
    }

    fn default_file() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("synoid").join("forge.json"))
    }

    fn apply_env(&mut self) {
        if let Some(dir) = std::env::var_os(TOOLS_ENV) {
            self.tools_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = std::env::var_os(TEMP_ENV) {
            self.temp_root = PathBuf::from(dir);
        }
    }

    pub fn with_tools_dir(mut self, dir: Option<PathBuf>) -> Self {
        if dir.is_some() {
            self.tools_dir = dir;
        }
        self
    }

    pub fn validate(&self) -> ForgeResult<()> {
        if !(self.default_fps.is_finite() && self.default_fps > 0.0) {
            return Err(ForgeError::config("default_fps must be positive"));
        }
        if self.tiling.default_tile == 0 || self.tiling.safe_tile == 0 {
            return Err(ForgeError::config("tile sizes must be non-zero"));
        }
        if let Some(dir) = &self.tools_dir {
            if !dir.is_dir() {
                warn!("[CONFIG] tools_dir {} does not exist", dir.display());
            }
        }
        Ok(())
    }
}
