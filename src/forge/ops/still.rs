// SYNOID Frame Grab
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use std::path::{Path, PathBuf};
use tracing::info;

use crate::engine::{ffmpeg, EngineKind};
use crate::error::ForgeResult;
use crate::forge::io_shield::StagedOutput;
use crate::forge::ladder::FallbackLadder;
use crate::forge::progress::Progress;
use crate::forge::ForgeContext;
use crate::native::still::clamp_timestamp;

/// Single still at `at` seconds, clamped so a request at or past the end
/// lands on the last frame. Falls back to in-process decoding.
pub async fn extract_frame(
    ctx: &ForgeContext,
    input: &Path,
    at: f64,
    output: &Path,
    progress: &Progress,
) -> ForgeResult<PathBuf> {
    let at = if at.is_finite() { at.max(0.0) } else { 0.0 };
    let at = match ctx.inspect(input).await {
        Ok(info) => clamp_timestamp(at, info.duration, info.fps),
        Err(_) => at,
    };
    info!("[FRAMES] Still from {} at {:.3}s", input.display(), at);
    let stage = StagedOutput::new(output)?;
    let staged = stage.path().to_path_buf();
    progress.report(0.0);

    FallbackLadder::new("extract-frame")
        .rung("ffmpeg", {
            let staged = staged.clone();
            move || async move {
                let program = ctx.toolbox.resolve(EngineKind::Ffmpeg)?;
                let inv = ffmpeg::extract_frame(&program, input, &staged, at);
                ctx.runner.run(&inv, &Progress::silent()).await.map(|_| ())
            }
        })
        .rung("native", move || async move {
            let src = input.to_path_buf();
            let used = ctx.native(move |lib| lib.still(&src, at, &staged)).await?;
            info!("[FRAMES] Grabbed still at {:.3}s", used);
            Ok(())
        })
        .climb()
        .await?;

    let out = stage.commit()?;
    progress.report(1.0);
    Ok(out)
}
