// SYNOID Forge Requests
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// The immutable description of one transformation: inputs, destination and a
// closed set of operations carrying their parameters.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ForgeError, ForgeResult};

/// Extensions treated as still images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp", "tiff", "ico"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaCategory {
    Image,
    Video,
}

impl MediaCategory {
    pub fn of(path: &Path) -> Self {
        if has_extension(path, IMAGE_EXTENSIONS) {
            MediaCategory::Image
        } else {
            MediaCategory::Video
        }
    }
}

/// Case-insensitive extension check.
pub fn has_extension(path: &Path, set: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            set.iter().any(|s| *s == e)
        })
        .unwrap_or(false)
}

pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

// ─────────────────────────────────────────────────────────────────────────────
// Parameter enums
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Quality {
    #[default]
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Speed {
    Ultrafast,
    Fast,
    #[default]
    Medium,
    Slow,
}

impl Speed {
    pub fn preset(self) -> &'static str {
        match self {
            Speed::Ultrafast => "ultrafast",
            Speed::Fast => "fast",
            Speed::Medium => "medium",
            Speed::Slow => "slow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ResizeMode {
    #[default]
    Stretch,
    Fit,
    Crop,
}

impl ResizeMode {
    pub fn label(self) -> &'static str {
        match self {
            ResizeMode::Stretch => "stretch",
            ResizeMode::Fit => "fit",
            ResizeMode::Crop => "crop",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Anchor {
    #[default]
    Center,
    TopLeft,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UpscaleBackend {
    #[default]
    Classical,
    Learned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScaleAlgorithm {
    #[default]
    Lanczos,
    Spline,
    Neighbor,
}

impl ScaleAlgorithm {
    pub fn flag(self) -> &'static str {
        match self {
            ScaleAlgorithm::Lanczos => "lanczos",
            ScaleAlgorithm::Spline => "spline",
            ScaleAlgorithm::Neighbor => "neighbor",
        }
    }
}

/// Tile size for learned super-resolution. `Auto` enables the safe-mode retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Tiling {
    #[default]
    Auto,
    Tile(u32),
}

impl Tiling {
    /// Named presets: Low 64, Medium 200, High 400, Ultra 512.
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "auto" => Some(Tiling::Auto),
            "low" => Some(Tiling::Tile(64)),
            "medium" => Some(Tiling::Tile(200)),
            "high" => Some(Tiling::Tile(400)),
            "ultra" => Some(Tiling::Tile(512)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InterpolationMethod {
    #[default]
    Classical,
    Learned,
}

// ─────────────────────────────────────────────────────────────────────────────
// Operation parameters
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GifOptions {
    pub fps: u32,
    /// Relative size, 1.0 keeps the source resolution.
    pub scale: f64,
    /// Playback speed multiplier, 1.0 keeps timing.
    pub speed: f64,
}

impl GifOptions {
    pub fn for_quality(quality: Quality) -> Self {
        match quality {
            Quality::High => Self { fps: 15, scale: 1.0, speed: 1.0 },
            _ => Self { fps: 10, scale: 0.5, speed: 1.0 },
        }
    }

    /// fps 1..=60, scale 0.1..=1.0, speed 0.1..=10.0.
    pub fn validate(&self) -> ForgeResult<()> {
        if !(1..=60).contains(&self.fps) {
            return Err(ForgeError::config(format!("GIF fps must be 1-60, got {}", self.fps)));
        }
        if !(0.1..=1.0).contains(&self.scale) {
            return Err(ForgeError::config(format!("GIF scale must be 0.1-1.0, got {}", self.scale)));
        }
        if !(0.1..=10.0).contains(&self.speed) {
            return Err(ForgeError::config(format!("GIF speed must be 0.1-10.0, got {}", self.speed)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConvertParams {
    pub quality: Quality,
    pub speed: Speed,
    /// Overrides the quality-derived GIF settings for `.gif` targets.
    pub gif: Option<GifOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizeParams {
    pub width: u32,
    pub height: u32,
    pub mode: ResizeMode,
    pub anchor: Anchor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpscaleParams {
    pub factor: u32,
    pub backend: UpscaleBackend,
    pub algorithm: ScaleAlgorithm,
    pub sharpen: bool,
    /// Explicit output size for the classical backend.
    pub target: Option<(u32, u32)>,
    pub tiling: Tiling,
    pub enhance_faces: bool,
}

impl Default for UpscaleParams {
    fn default() -> Self {
        Self {
            factor: 2,
            backend: UpscaleBackend::Classical,
            algorithm: ScaleAlgorithm::Lanczos,
            sharpen: false,
            target: None,
            tiling: Tiling::Auto,
            enhance_faces: false,
        }
    }
}

impl UpscaleParams {
    pub fn validate(&self) -> ForgeResult<()> {
        if self.factor != 2 && self.factor != 4 {
            return Err(ForgeError::config(format!(
                "upscale factor must be 2 or 4, got {}",
                self.factor
            )));
        }
        if let Some((w, h)) = self.target {
            if w == 0 || h == 0 {
                return Err(ForgeError::config("upscale target must be non-zero"));
            }
        }
        if self.tiling == Tiling::Tile(0) {
            return Err(ForgeError::config("tile size must be non-zero"));
        }
        Ok(())
    }

    /// Output dimensions for a source of `width`×`height`.
    pub fn target_dims(&self, width: u32, height: u32) -> (u32, u32) {
        self.target
            .unwrap_or((width * self.factor, height * self.factor))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolateParams {
    pub method: InterpolationMethod,
    /// Classical target frame rate.
    pub target_fps: u32,
    /// Learned frame multiplier, 2 or 4.
    pub multiplier: u32,
}

impl Default for InterpolateParams {
    fn default() -> Self {
        Self {
            method: InterpolationMethod::Classical,
            target_fps: 60,
            multiplier: 2,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Convert(ConvertParams),
    Resize(ResizeParams),
    Upscale(UpscaleParams),
    Interpolate(InterpolateParams),
    Trim { start: f64, end: f64 },
    DeleteSection { start: f64, end: f64 },
    InsertClip { clip: PathBuf, at: f64 },
    Concatenate,
    ExtractFrame { at: f64 },
}

/// Routing label for an `Operation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Convert,
    Resize,
    Upscale,
    Interpolate,
    Trim,
    DeleteSection,
    InsertClip,
    Concatenate,
    ExtractFrame,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Convert(_) => OperationKind::Convert,
            Operation::Resize(_) => OperationKind::Resize,
            Operation::Upscale(_) => OperationKind::Upscale,
            Operation::Interpolate(_) => OperationKind::Interpolate,
            Operation::Trim { .. } => OperationKind::Trim,
            Operation::DeleteSection { .. } => OperationKind::DeleteSection,
            Operation::InsertClip { .. } => OperationKind::InsertClip,
            Operation::Concatenate => OperationKind::Concatenate,
            Operation::ExtractFrame { .. } => OperationKind::ExtractFrame,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Destination {
    File(PathBuf),
    /// Batch output: one `<stem>_conv.<extension>` per input.
    Directory { dir: PathBuf, extension: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRequest {
    pub inputs: Vec<PathBuf>,
    pub destination: Destination,
    pub operation: Operation,
}

impl TransformRequest {
    pub fn single(input: impl Into<PathBuf>, output: impl Into<PathBuf>, operation: Operation) -> Self {
        Self {
            inputs: vec![input.into()],
            destination: Destination::File(output.into()),
            operation,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension() {
        assert_eq!(MediaCategory::of(Path::new("a/photo.JPG")), MediaCategory::Image);
        assert_eq!(MediaCategory::of(Path::new("icon.ico")), MediaCategory::Image);
        assert_eq!(MediaCategory::of(Path::new("clip.mkv")), MediaCategory::Video);
        assert_eq!(MediaCategory::of(Path::new("noext")), MediaCategory::Video);
    }

    #[test]
    fn upscale_factor_validation() {
        let mut p = UpscaleParams::default();
        assert!(p.validate().is_ok());
        p.factor = 3;
        assert!(matches!(p.validate(), Err(ForgeError::Configuration(_))));
    }

    #[test]
    fn target_dims_double() {
        let p = UpscaleParams::default();
        assert_eq!(p.target_dims(640, 480), (1280, 960));
        let p = UpscaleParams { target: Some((1920, 1080)), ..UpscaleParams::default() };
        assert_eq!(p.target_dims(640, 480), (1920, 1080));
    }

    #[test]
    fn tiling_presets() {
        assert_eq!(Tiling::preset("ultra"), Some(Tiling::Tile(512)));
        assert_eq!(Tiling::preset("Auto"), Some(Tiling::Auto));
        assert_eq!(Tiling::preset("huge"), None);
    }

    #[test]
    fn gif_defaults_follow_quality() {
        assert_eq!(GifOptions::for_quality(Quality::High).fps, 15);
        let low = GifOptions::for_quality(Quality::Low);
        assert_eq!(low.fps, 10);
        assert_eq!(low.scale, 0.5);
        assert!(low.validate().is_ok());
        assert!(GifOptions { fps: 90, ..low }.validate().is_err());
        assert!(GifOptions { speed: 0.0, ..low }.validate().is_err());
    }
}
