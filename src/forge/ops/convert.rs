// SYNOID Convert
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Format conversion for stills (in-process) and video/audio (classical
// engine), single or batch.

use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::engine::{ffmpeg, EngineKind};
use crate::error::{ForgeError, ForgeResult};
use crate::forge::dispatch::{BatchFailure, BatchReport};
use crate::forge::io_shield::StagedOutput;
use crate::forge::progress::Progress;
use crate::forge::request::{
    extension_of, has_extension, ConvertParams, GifOptions, MediaCategory, IMAGE_EXTENSIONS,
};
use crate::forge::ForgeContext;
use crate::native::picture;

/// Batch output name: `<stem>_conv.<ext>`, or `<stem>.gif` for GIF batches.
pub fn batch_output_path(dir: &Path, input: &Path, extension: &str) -> PathBuf {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    if ext == "gif" {
        dir.join(format!("{}.gif", stem))
    } else {
        dir.join(format!("{}_conv.{}", stem.replace("_converted", ""), ext))
    }
}

pub async fn convert_one(
    ctx: &ForgeContext,
    input: &Path,
    output: &Path,
    params: &ConvertParams,
    progress: &Progress,
) -> ForgeResult<PathBuf> {
    let stage = StagedOutput::new(output)?;
    let target = extension_of(output);
    info!("[CONVERT] {} → .{}", input.display(), target);
    progress.report(0.0);

    match MediaCategory::of(input) {
        MediaCategory::Image => {
            if !has_extension(output, IMAGE_EXTENSIONS) {
                return Err(ForgeError::config(format!(
                    "cannot convert an image to .{}",
                    target
                )));
            }
            let quality = ctx.config.quality.jpeg_quality(params.quality);
            let (src, dst) = (input.to_path_buf(), stage.path().to_path_buf());
            ctx.native(move |_| picture::convert_file(&src, &dst, quality, &target))
                .await?;
        }
        MediaCategory::Video => {
            let program = ctx.toolbox.resolve(EngineKind::Ffmpeg)?;
            let duration = ctx.duration_hint(input).await;
            let inv = if target == "gif" {
                let opts = params.gif.unwrap_or_else(|| GifOptions::for_quality(params.quality));
                opts.validate()?;
                ffmpeg::gif(&program, input, stage.path(), &opts, duration)
            } else {
                ffmpeg::convert(&program, input, stage.path(), params, &ctx.config.quality, duration)
            };
            ctx.runner.run(&inv, progress).await?;
        }
    }

    let out = stage.commit()?;
    progress.report(1.0);
    Ok(out)
}

/// Converts every input, collecting failures instead of aborting.
pub async fn convert_batch(
    ctx: &ForgeContext,
    inputs: &[PathBuf],
    dir: &Path,
    extension: &str,
    params: &ConvertParams,
    progress: &Progress,
) -> ForgeResult<BatchReport> {
    let total = inputs.len();
    let mut report = BatchReport::default();

    for (i, input) in inputs.iter().enumerate() {
        let slot = progress.scoped(i as f32 / total as f32, (i + 1) as f32 / total as f32);
        let output = batch_output_path(dir, input, extension);
        info!("[CONVERT] Batch {}/{}: {}", i + 1, total, input.display());

        match convert_one(ctx, input, &output, params, &slot).await {
            Ok(path) => report.succeeded.push(path),
            Err(e) => {
                error!("[CONVERT] {} failed: {}", input.display(), e);
                report.failed.push(BatchFailure {
                    input: input.clone(),
                    error: e.to_string(),
                });
            }
        }
        progress.report((i + 1) as f32 / total as f32);
    }

    info!("[CONVERT] Batch done: {}/{} converted", report.succeeded.len(), total);
    Ok(report)
}
