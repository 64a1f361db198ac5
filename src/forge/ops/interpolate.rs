// SYNOID Interpolate
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Frame-rate increase. Classical motion-compensated interpolation to a
// target rate, or learned doubling passes (RIFE) for a 2x / 4x multiplier.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::engine::{ffmpeg, learned, EngineKind};
use crate::error::{ForgeError, ForgeResult};
use crate::forge::frames::FramePipeline;
use crate::forge::io_shield::StagedOutput;
use crate::forge::progress::Progress;
use crate::forge::request::{InterpolateParams, InterpolationMethod};
use crate::forge::workspace::FrameWorkspace;
use crate::forge::ForgeContext;

/// RIFE names its output frames `%08d.png`.
const PASS_OUTPUT_PREFIX: &str = "";

/// Doubling passes needed for a multiplier. Anything but 2 or 4 becomes 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassPlan {
    pub multiplier: u32,
    pub passes: u32,
}

impl PassPlan {
    pub fn for_multiplier(requested: u32) -> Self {
        let multiplier = match requested {
            2 | 4 => requested,
            other => {
                warn!("[INTERP] Multiplier {} unsupported, using 2", other);
                2
            }
        };
        Self {
            multiplier,
            passes: multiplier.trailing_zeros(),
        }
    }

    pub fn output_fps(&self, source_fps: f64) -> f64 {
        source_fps * self.multiplier as f64
    }
}

pub async fn interpolate(
    ctx: &ForgeContext,
    input: &Path,
    output: &Path,
    params: &InterpolateParams,
    progress: &Progress,
) -> ForgeResult<PathBuf> {
    let stage = StagedOutput::new(output)?;
    progress.report(0.0);

    match params.method {
        InterpolationMethod::Classical => {
            if params.target_fps == 0 {
                return Err(ForgeError::config("target fps must be positive"));
            }
            let program = ctx.toolbox.resolve(EngineKind::Ffmpeg)?;
            let duration = ctx.duration_hint(input).await;
            info!("[INTERP] Classical interpolation to {} fps", params.target_fps);
            let inv = ffmpeg::interpolate(&program, input, stage.path(), params.target_fps, duration);
            ctx.runner.run(&inv, progress).await?;
        }
        InterpolationMethod::Learned => {
            learned_passes(ctx, input, stage.path(), params.multiplier, progress).await?;
        }
    }

    let out = stage.commit()?;
    progress.report(1.0);
    Ok(out)
}

async fn learned_passes(
    ctx: &ForgeContext,
    input: &Path,
    staged: &Path,
    multiplier: u32,
    progress: &Progress,
) -> ForgeResult<()> {
    let program = ctx.toolbox.resolve(EngineKind::Interpolation)?;
    let plan = PassPlan::for_multiplier(multiplier);
    let pipeline = FramePipeline::new(ctx)?;
    let ws = FrameWorkspace::allocate(&ctx.config.temp_root, "interp")?;

    progress.report(0.1);
    pipeline.decompose(input, &ws, "png").await?;
    progress.report(0.2);

    let pass_span = 0.6 / plan.passes as f32;
    for pass in 1..=plan.passes {
        info!("[INTERP] Pass {}/{}", pass, plan.passes);
        let inv = learned::interpolation_pass(&program, ws.input_dir(), ws.output_dir());
        pipeline.process(&inv).await?;
        if pass < plan.passes {
            let moved = ws.promote_output()?;
            info!("[INTERP] {} frames carried into pass {}", moved, pass + 1);
        }
        progress.report(0.2 + pass_span * pass as f32);
    }
    progress.report(0.8);

    let fps = plan.output_fps(pipeline.source_fps(input).await);
    let audio = pipeline.extract_audio(input, &ws).await;
    let pattern = FrameWorkspace::frame_pattern(ws.output_dir(), PASS_OUTPUT_PREFIX, "png");
    pipeline.recombine(&pattern, fps, audio.as_ref(), staged).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_x_needs_two_passes() {
        let plan = PassPlan::for_multiplier(4);
        assert_eq!(plan.passes, 2);
        assert_eq!(plan.output_fps(30.0), 120.0);
    }

    #[test]
    fn unsupported_multiplier_defaults_to_two() {
        let plan = PassPlan::for_multiplier(3);
        assert_eq!(plan, PassPlan { multiplier: 2, passes: 1 });
        assert_eq!(PassPlan::for_multiplier(8).multiplier, 2);
    }
}
