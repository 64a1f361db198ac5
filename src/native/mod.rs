// SYNOID Native Media Library
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// The in-process fallback behind every ladder: libav (ffmpeg-next) for
// video, the `image` crate for stills. All calls are blocking and run on
// `spawn_blocking` threads.

pub mod geometry;
pub mod picture;
pub mod render;
pub mod still;

use ffmpeg_next as ffmpeg;
use std::path::{Path, PathBuf};

pub use geometry::{Geometry, Placement};

use crate::engine::probe::ClipInfo;
use crate::error::{ForgeError, ForgeResult};

/// A time range of one source. `end: None` runs to the end of the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub source: PathBuf,
    pub start: f64,
    pub end: Option<f64>,
}

impl Segment {
    pub fn whole(source: impl Into<PathBuf>) -> Self {
        Self { source: source.into(), start: 0.0, end: None }
    }

    pub fn range(source: impl Into<PathBuf>, start: f64, end: f64) -> Self {
        Self { source: source.into(), start, end: Some(end) }
    }

    pub fn tail(source: impl Into<PathBuf>, start: f64) -> Self {
        Self { source: source.into(), start, end: None }
    }
}

/// Segments joined in order, optionally reshaped, encoded as H.264.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub segments: Vec<Segment>,
    pub geometry: Option<Geometry>,
    pub crf: u32,
    pub preset: String,
}

impl RenderPlan {
    pub fn splice(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            geometry: None,
            crf: 23,
            preset: "ultrafast".to_string(),
        }
    }

    pub fn reshape(source: &Path, geometry: Geometry) -> Self {
        Self {
            segments: vec![Segment::whole(source)],
            geometry: Some(geometry),
            crf: 23,
            preset: "ultrafast".to_string(),
        }
    }
}

/// In-process media operations. Swappable so ladders can be tested without libav.
pub trait MediaLibrary: Send + Sync {
    fn inspect(&self, path: &Path) -> ForgeResult<ClipInfo>;
    fn render(&self, plan: &RenderPlan, output: &Path) -> ForgeResult<()>;
    /// Returns the timestamp actually used.
    fn still(&self, path: &Path, at: f64, output: &Path) -> ForgeResult<f64>;
    fn resize_image(&self, input: &Path, output: &Path, geometry: &Geometry) -> ForgeResult<()>;
}

pub struct LibavLibrary;

impl MediaLibrary for LibavLibrary {
    fn inspect(&self, path: &Path) -> ForgeResult<ClipInfo> {
        inspect(path)
    }

    fn render(&self, plan: &RenderPlan, output: &Path) -> ForgeResult<()> {
        render::render(plan, output)
    }

    fn still(&self, path: &Path, at: f64, output: &Path) -> ForgeResult<f64> {
        still::extract(path, at, output)
    }

    fn resize_image(&self, input: &Path, output: &Path, geometry: &Geometry) -> ForgeResult<()> {
        picture::resize_file(input, output, geometry)
    }
}

pub fn inspect(path: &Path) -> ForgeResult<ClipInfo> {
    ffmpeg::init()?;
    let ictx = ffmpeg::format::input(&path)?;
    let mut info = ClipInfo {
        duration: if ictx.duration() > 0 { ictx.duration() as f64 / 1_000_000.0 } else { 0.0 },
        has_audio: ictx.streams().best(ffmpeg::media::Type::Audio).is_some(),
        ..ClipInfo::default()
    };

    let stream = ictx
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or_else(|| ForgeError::native(format!("no video stream in {}", path.display())))?;
    let rate = f64::from(stream.avg_frame_rate());
    info.fps = if rate.is_finite() && rate > 0.0 { rate } else { 0.0 };

    let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())?
        .decoder()
        .video()?;
    info.width = decoder.width();
    info.height = decoder.height();
    Ok(info)
}
