// SYNOID Timeline Edits
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Trim, delete-section, insert-clip and concatenate. Trim has a stream-copy
// fast path; everything else is planned as segments and rendered in-process.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::engine::{ffmpeg, EngineKind};
use crate::error::{ForgeError, ForgeResult};
use crate::forge::io_shield::StagedOutput;
use crate::forge::ladder::FallbackLadder;
use crate::forge::progress::Progress;
use crate::forge::ForgeContext;
use crate::native::{RenderPlan, Segment};

fn check_range(start: f64, end: f64) -> ForgeResult<()> {
    if !(start.is_finite() && end.is_finite()) || start < 0.0 {
        return Err(ForgeError::config(format!("invalid range {}..{}", start, end)));
    }
    if end <= start {
        return Err(ForgeError::config(format!(
            "end ({:.3}s) must be after start ({:.3}s)",
            end, start
        )));
    }
    Ok(())
}

/// Segments kept when `[start, end)` is cut out of a clip of `duration` seconds.
pub fn delete_plan(source: &Path, start: f64, end: f64, duration: f64) -> ForgeResult<Vec<Segment>> {
    check_range(start, end)?;
    if start <= 0.0 && end >= duration {
        return Err(ForgeError::config("deleting the whole clip leaves nothing to render"));
    }
    let plan = if start <= 0.0 {
        vec![Segment::tail(source, end)]
    } else if end >= duration {
        vec![Segment::range(source, 0.0, start)]
    } else {
        vec![Segment::range(source, 0.0, start), Segment::tail(source, end)]
    };
    Ok(plan)
}

/// Segments for splicing `clip` into `main` at `at` seconds.
pub fn insert_plan(main: &Path, clip: &Path, at: f64, duration: f64) -> Vec<Segment> {
    if at <= 0.0 {
        vec![Segment::whole(clip), Segment::whole(main)]
    } else if at >= duration {
        vec![Segment::whole(main), Segment::whole(clip)]
    } else {
        vec![
            Segment::range(main, 0.0, at),
            Segment::whole(clip),
            Segment::tail(main, at),
        ]
    }
}

async fn render_staged(
    ctx: &ForgeContext,
    segments: Vec<Segment>,
    output: &Path,
    progress: &Progress,
) -> ForgeResult<PathBuf> {
    let stage = StagedOutput::new(output)?;
    progress.report(0.1);
    let dst = stage.path().to_path_buf();
    let plan = RenderPlan::splice(segments);
    ctx.native(move |lib| lib.render(&plan, &dst)).await?;
    let out = stage.commit()?;
    progress.report(1.0);
    Ok(out)
}

pub async fn trim(
    ctx: &ForgeContext,
    input: &Path,
    output: &Path,
    start: f64,
    end: f64,
    progress: &Progress,
) -> ForgeResult<PathBuf> {
    check_range(start, end)?;
    info!("[EDIT] Trim {} [{:.3}s, {:.3}s)", input.display(), start, end);

    let stage = StagedOutput::new(output)?;
    let staged = stage.path().to_path_buf();
    progress.report(0.0);

    FallbackLadder::new("trim")
        .rung("stream-copy", {
            let staged = staged.clone();
            move || async move {
                let program = ctx.toolbox.resolve(EngineKind::Ffmpeg)?;
                let inv = ffmpeg::trim(&program, input, &staged, start, end);
                ctx.runner.run(&inv, progress).await.map(|_| ())
            }
        })
        .rung("native", move || async move {
            let plan = RenderPlan::splice(vec![Segment::range(input, start, end)]);
            ctx.native(move |lib| lib.render(&plan, &staged)).await
        })
        .climb()
        .await?;

    let out = stage.commit()?;
    progress.report(1.0);
    Ok(out)
}

pub async fn delete_section(
    ctx: &ForgeContext,
    input: &Path,
    output: &Path,
    start: f64,
    end: f64,
    progress: &Progress,
) -> ForgeResult<PathBuf> {
    check_range(start, end)?;
    let duration = ctx.inspect(input).await?.duration;
    let segments = delete_plan(input, start, end, duration)?;
    info!("[EDIT] Delete [{:.3}s, {:.3}s) from {} ({} segments kept)", start, end, input.display(), segments.len());
    render_staged(ctx, segments, output, progress).await
}

pub async fn insert_clip(
    ctx: &ForgeContext,
    input: &Path,
    clip: &Path,
    at: f64,
    output: &Path,
    progress: &Progress,
) -> ForgeResult<PathBuf> {
    if !clip.exists() {
        return Err(ForgeError::config(format!("clip not found: {}", clip.display())));
    }
    let duration = ctx.inspect(input).await?.duration;
    info!("[EDIT] Insert {} into {} at {:.3}s", clip.display(), input.display(), at);
    render_staged(ctx, insert_plan(input, clip, at, duration), output, progress).await
}

pub async fn concatenate(
    ctx: &ForgeContext,
    inputs: &[PathBuf],
    output: &Path,
    progress: &Progress,
) -> ForgeResult<PathBuf> {
    if inputs.len() < 2 {
        return Err(ForgeError::config("concatenation needs at least two clips"));
    }
    info!("[EDIT] Concatenating {} clips", inputs.len());
    let segments = inputs.iter().map(Segment::whole).collect();
    render_staged(ctx, segments, output, progress).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_from_start_keeps_tail() {
        let plan = delete_plan(Path::new("a.mp4"), 0.0, 3.0, 10.0).unwrap();
        assert_eq!(plan, vec![Segment::tail("a.mp4", 3.0)]);
    }

    #[test]
    fn delete_to_end_keeps_head() {
        let plan = delete_plan(Path::new("a.mp4"), 7.0, 12.0, 10.0).unwrap();
        assert_eq!(plan, vec![Segment::range("a.mp4", 0.0, 7.0)]);
    }

    #[test]
    fn delete_middle_joins_both_sides() {
        let plan = delete_plan(Path::new("a.mp4"), 2.0, 5.0, 10.0).unwrap();
        assert_eq!(plan, vec![Segment::range("a.mp4", 0.0, 2.0), Segment::tail("a.mp4", 5.0)]);
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(matches!(
            delete_plan(Path::new("a.mp4"), 5.0, 5.0, 10.0),
            Err(ForgeError::Configuration(_))
        ));
        assert!(delete_plan(Path::new("a.mp4"), 0.0, 10.0, 10.0).is_err());
    }

    #[test]
    fn insert_positions() {
        let (main, clip) = (Path::new("m.mp4"), Path::new("c.mp4"));
        assert_eq!(insert_plan(main, clip, 0.0, 10.0)[0], Segment::whole("c.mp4"));
        assert_eq!(insert_plan(main, clip, 10.0, 10.0)[1], Segment::whole("c.mp4"));
        let mid = insert_plan(main, clip, 4.0, 10.0);
        assert_eq!(mid.len(), 3);
        assert_eq!(mid[0], Segment::range("m.mp4", 0.0, 4.0));
        assert_eq!(mid[2], Segment::tail("m.mp4", 4.0));
    }
}
