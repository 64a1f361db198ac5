// SYNOID Frame Pipeline
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Video → numbered stills → engine over the whole sequence → video again,
// with the original audio remuxed and the frame rate recomputed.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::progress::Progress;
use super::workspace::{AudioSidecar, FrameWorkspace};
use super::ForgeContext;
use crate::engine::ffmpeg;
use crate::engine::runner::Invocation;
use crate::engine::EngineKind;
use crate::error::{ForgeError, ForgeResult};

pub const FRAME_PREFIX: &str = "frame_";
pub const SIDECAR_NAME: &str = "audio.m4a";

pub struct FramePipeline<'a> {
    ctx: &'a ForgeContext,
    ffmpeg: PathBuf,
}

impl<'a> FramePipeline<'a> {
    pub fn new(ctx: &'a ForgeContext) -> ForgeResult<Self> {
        Ok(Self {
            ctx,
            ffmpeg: ctx.toolbox.resolve(EngineKind::Ffmpeg)?,
        })
    }

    /// Extract every frame into `input/` as `frame_%08d.<ext>`. Returns the frame count.
    pub async fn decompose(&self, input: &Path, ws: &FrameWorkspace, ext: &str) -> ForgeResult<usize> {
        info!("[FRAMES] Extracting frames from {}", input.display());
        let pattern = FrameWorkspace::frame_pattern(ws.input_dir(), FRAME_PREFIX, ext);
        let inv = ffmpeg::extract_sequence(&self.ffmpeg, input, &pattern, ws.input_dir());
        self.ctx.runner.run(&inv, &Progress::silent()).await?;

        let count = FrameWorkspace::frames_in(ws.input_dir()).len();
        info!("[FRAMES] {} frames extracted", count);
        Ok(count)
    }

    /// One engine invocation over the whole sequence.
    pub async fn process(&self, inv: &Invocation) -> ForgeResult<()> {
        self.ctx.runner.run(inv, &Progress::silent()).await.map(|_| ())
    }

    /// Extraction failures just mean there is no usable audio.
    pub async fn extract_audio(&self, input: &Path, ws: &FrameWorkspace) -> Option<AudioSidecar> {
        let sidecar = ws.side_file(SIDECAR_NAME);
        let inv = ffmpeg::extract_audio(&self.ffmpeg, input, &sidecar);
        match self.ctx.runner.run(&inv, &Progress::silent()).await {
            Ok(_) => AudioSidecar::detect(&sidecar, self.ctx.config.audio_min_bytes),
            Err(e) => {
                info!("[FRAMES] No audio track extracted ({})", e);
                None
            }
        }
    }

    /// Probed rate, or the configured default.
    pub async fn source_fps(&self, input: &Path) -> f64 {
        let default_fps = self.ctx.config.default_fps;
        match self.ctx.inspect(input).await {
            Ok(info) if info.fps > 0.0 => info.fps,
            Ok(_) => default_fps,
            Err(e) => {
                warn!("[FRAMES] Could not probe fps ({}), assuming {}", e, default_fps);
                default_fps
            }
        }
    }

    pub async fn recombine(
        &self,
        pattern: &Path,
        fps: f64,
        audio: Option<&AudioSidecar>,
        output: &Path,
    ) -> ForgeResult<()> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(ForgeError::config(format!("invalid output frame rate {}", fps)));
        }
        info!(
            "[FRAMES] Recombining at {} fps ({})",
            ffmpeg::fmt_fps(fps),
            if audio.is_some() { "with audio" } else { "video only" }
        );
        let inv = ffmpeg::recombine(&self.ffmpeg, pattern, fps, audio.map(|a| a.path()), output);
        self.ctx.runner.run(&inv, &Progress::silent()).await.map(|_| ())
    }
}
