// SYNOID Resize
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Stretch / fit / crop to an exact resolution. Classical filter graph
// first, in-process geometry second.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::engine::{ffmpeg, EngineKind};
use crate::error::{ForgeResult, IoContext};
use crate::forge::io_shield::StagedOutput;
use crate::forge::ladder::FallbackLadder;
use crate::forge::progress::Progress;
use crate::forge::request::{MediaCategory, ResizeMode, ResizeParams};
use crate::forge::ForgeContext;
use crate::native::{Geometry, RenderPlan};

/// `RESIZED_<mode>_<w>x<h>_<stem>.mp4`, used for batch resizes.
pub fn resized_name(input: &Path, params: &ResizeParams) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string());
    format!(
        "RESIZED_{}_{}x{}_{}.mp4",
        params.mode.label(),
        params.width,
        params.height,
        stem
    )
}

pub async fn resize(
    ctx: &ForgeContext,
    input: &Path,
    output: &Path,
    params: &ResizeParams,
    progress: &Progress,
) -> ForgeResult<PathBuf> {
    if params.width == 0 || params.height == 0 {
        return Err(crate::error::ForgeError::config("resize target must be non-zero"));
    }

    let stage = StagedOutput::new(output)?;
    progress.report(0.0);

    if params.mode == ResizeMode::Stretch {
        if let Ok(info) = ctx.inspect(input).await {
            if (info.width, info.height) == (params.width, params.height) {
                info!("[RESIZE] {} already {}x{}, skipping", input.display(), params.width, params.height);
                std::fs::copy(input, stage.path())
                    .io_context(|| format!("copying {}", input.display()))?;
                let out = stage.commit()?;
                progress.report(1.0);
                return Ok(out);
            }
        }
    }

    let geometry = Geometry::from(params);
    let staged = stage.path().to_path_buf();
    let is_image = MediaCategory::of(input) == MediaCategory::Image;

    FallbackLadder::new("resize")
        .rung("ffmpeg", {
            let staged = staged.clone();
            move || async move {
                let program = ctx.toolbox.resolve(EngineKind::Ffmpeg)?;
                let duration = if is_image { None } else { ctx.duration_hint(input).await };
                let inv = ffmpeg::resize(&program, input, &staged, params, duration);
                ctx.runner.run(&inv, progress).await.map(|_| ())
            }
        })
        .rung("native", move || async move {
            let (src, dst) = (input.to_path_buf(), staged);
            info!("[RESIZE] Native fallback ({})", params.mode.label());
            ctx.native(move |lib| {
                if is_image {
                    lib.resize_image(&src, &dst, &geometry)
                } else {
                    lib.render(&RenderPlan::reshape(&src, geometry), &dst)
                }
            })
            .await
        })
        .climb()
        .await?;

    let out = stage.commit()?;
    progress.report(1.0);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::request::Anchor;

    #[test]
    fn batch_name_encodes_mode_and_size() {
        let p = ResizeParams { width: 1080, height: 1920, mode: ResizeMode::Crop, anchor: Anchor::Center };
        assert_eq!(resized_name(Path::new("/v/trip.mov"), &p), "RESIZED_crop_1080x1920_trip.mp4");
    }
}
