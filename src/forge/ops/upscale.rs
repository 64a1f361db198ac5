// SYNOID Upscale Engine
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Resolution upscaling by factor 2 or 4:
//
//   • Classical – ffmpeg scale filter (lanczos / spline / neighbor), optional unsharp
//   • Learned   – Real-ESRGAN on a still, or on every frame of a video via the
//                 frame pipeline, with optional CodeFormer face restoration
//
// A learned run under automatic tiling that crashes is retried once in safe
// mode (small tiles, single-threaded, lighter model).

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::engine::learned::{self, TileProfile};
use crate::engine::runner::Artifact;
use crate::engine::{ffmpeg, EngineKind};
use crate::error::ForgeResult;
use crate::forge::frames::{FramePipeline, FRAME_PREFIX};
use crate::forge::io_shield::StagedOutput;
use crate::forge::ladder::FallbackLadder;
use crate::forge::progress::Progress;
use crate::forge::request::{MediaCategory, Tiling, UpscaleBackend, UpscaleParams};
use crate::forge::workspace::FrameWorkspace;
use crate::forge::ForgeContext;

pub struct UpscaleEngine;

impl UpscaleEngine {
    // ── Public API ───────────────────────────────────────────────────────────

    pub async fn upscale(
        ctx: &ForgeContext,
        input: &Path,
        output: &Path,
        params: &UpscaleParams,
        progress: &Progress,
    ) -> ForgeResult<PathBuf> {
        params.validate()?;
        info!(
            "[UPSCALE] {} → {} ({:?}, {}x)",
            input.display(),
            output.display(),
            params.backend,
            params.factor
        );

        let stage = StagedOutput::new(output)?;
        progress.report(0.0);

        match (params.backend, MediaCategory::of(input)) {
            (UpscaleBackend::Classical, _) => {
                Self::classical(ctx, input, stage.path(), params, progress).await?
            }
            (UpscaleBackend::Learned, MediaCategory::Image) => {
                Self::learned_still(ctx, input, stage.path(), params, progress).await?
            }
            (UpscaleBackend::Learned, MediaCategory::Video) => {
                Self::learned_video(ctx, input, stage.path(), params, progress).await?
            }
        }

        let out = stage.commit()?;
        progress.report(1.0);
        info!("[UPSCALE] Complete: {}", out.display());
        Ok(out)
    }

    // ── Classical Backend ────────────────────────────────────────────────────

    async fn classical(
        ctx: &ForgeContext,
        input: &Path,
        staged: &Path,
        params: &UpscaleParams,
        progress: &Progress,
    ) -> ForgeResult<()> {
        let program = ctx.toolbox.resolve(EngineKind::Ffmpeg)?;
        // With known source dimensions the filter gets an exact size; otherwise
        // ffmpeg multiplies the input size itself.
        let (sized, duration) = match ctx.inspect(input).await {
            Ok(info) if info.width > 0 && info.height > 0 => {
                let dims = params.target_dims(info.width, info.height);
                let duration = match MediaCategory::of(input) {
                    MediaCategory::Video if info.duration > 0.0 => Some(info.duration),
                    _ => None,
                };
                (UpscaleParams { target: Some(dims), ..params.clone() }, duration)
            }
            _ => {
                warn!("[UPSCALE] Source size unknown for {}; scaling by expression", input.display());
                (params.clone(), None)
            }
        };
        info!("[UPSCALE] Classical filter: {}", ffmpeg::upscale_filter(&sized));
        let inv = ffmpeg::upscale(&program, input, staged, &sized, duration);
        ctx.runner.run(&inv, progress).await.map(|_| ())
    }

    // ── Learned Backend ──────────────────────────────────────────────────────

    /// Primary model under the requested tiling; with automatic tiling, one
    /// safe-mode retry after a failure.
    #[allow(clippy::too_many_arguments)]
    async fn super_resolve(
        ctx: &ForgeContext,
        program: &Path,
        input: &Path,
        output: &Path,
        model: &str,
        params: &UpscaleParams,
        artifact: Artifact,
        progress: &Progress,
    ) -> ForgeResult<()> {
        let table = &ctx.config.tiling;
        let format = learned::image_format_for(output);
        let primary = learned::super_resolution(
            program,
            input,
            output,
            model,
            params.factor,
            format,
            &TileProfile::for_tiling(params.tiling, table),
            artifact.clone(),
        );
        let safe = learned::super_resolution(
            program,
            input,
            output,
            &ctx.config.models.safe,
            params.factor,
            format,
            &TileProfile::safe(table),
            artifact,
        );

        FallbackLadder::new("super-resolution")
            .rung("primary", move || async move {
                ctx.runner.run(&primary, &Progress::silent()).await.map(|_| ())
            })
            .rung_if(params.tiling == Tiling::Auto, "safe-mode", move || async move {
                warn!("[UPSCALE] Learned engine crashed. Retrying in safe mode…");
                progress.report(0.2);
                ctx.runner.run(&safe, &Progress::silent()).await.map(|_| ())
            })
            .climb()
            .await
    }

    async fn restore_faces(ctx: &ForgeContext, target: &Path) -> ForgeResult<()> {
        match ctx.toolbox.locate(EngineKind::FaceRestore) {
            Some(script) => {
                info!("[UPSCALE] Restoring faces in {}", target.display());
                let inv = learned::face_restore(&script, target);
                ctx.runner.run(&inv, &Progress::silent()).await.map(|_| ())
            }
            None => {
                warn!("[UPSCALE] Face restoration requested but the CodeFormer script was not found; skipping");
                Ok(())
            }
        }
    }

    async fn learned_still(
        ctx: &ForgeContext,
        input: &Path,
        staged: &Path,
        params: &UpscaleParams,
        progress: &Progress,
    ) -> ForgeResult<()> {
        let program = ctx.toolbox.resolve(EngineKind::SuperResolution)?;
        progress.report(0.1);

        Self::super_resolve(
            ctx,
            &program,
            input,
            staged,
            &ctx.config.models.image,
            params,
            Artifact::File(staged.to_path_buf()),
            progress,
        )
        .await?;
        progress.report(0.5);

        if params.enhance_faces {
            Self::restore_faces(ctx, staged).await?;
        }
        Ok(())
    }

    async fn learned_video(
        ctx: &ForgeContext,
        input: &Path,
        staged: &Path,
        params: &UpscaleParams,
        progress: &Progress,
    ) -> ForgeResult<()> {
        let program = ctx.toolbox.resolve(EngineKind::SuperResolution)?;
        let pipeline = FramePipeline::new(ctx)?;
        let ws = FrameWorkspace::allocate(&ctx.config.temp_root, "upscale")?;

        progress.report(0.1);
        pipeline.decompose(input, &ws, "jpg").await?;
        progress.report(0.2);

        Self::super_resolve(
            ctx,
            &program,
            ws.input_dir(),
            ws.output_dir(),
            &ctx.config.models.video,
            params,
            Artifact::Directory(ws.output_dir().to_path_buf()),
            progress,
        )
        .await?;
        progress.report(0.7);

        if params.enhance_faces {
            Self::restore_faces(ctx, ws.output_dir()).await?;
        }

        let audio = pipeline.extract_audio(input, &ws).await;
        let fps = pipeline.source_fps(input).await;
        let pattern = FrameWorkspace::frame_pattern(ws.output_dir(), FRAME_PREFIX, "jpg");
        pipeline.recombine(&pattern, fps, audio.as_ref(), staged).await
    }
}
