// SYNOID Classical Engine Commands
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Argument builders for the ffmpeg filter-graph engine. Pure functions:
// every builder returns an `Invocation` and touches nothing on disk.

use std::path::Path;

use super::runner::{Artifact, Invocation, StdoutMode};
use super::EngineKind;
use crate::config::QualityTable;
use crate::forge::request::{
    extension_of, has_extension, Anchor, ConvertParams, GifOptions, ResizeMode, ResizeParams,
    UpscaleParams,
};

/// Targets that carry no video stream.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a"];

/// Still outputs of the classical upscaler.
const STILL_OUTPUTS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

pub const UNSHARP: &str = "unsharp=5:5:1.0:5:5:0.0";

/// Common prefix. With a known duration the engine streams native progress to stdout.
fn base(program: &Path, duration: Option<f64>) -> Invocation {
    let inv = Invocation::new(EngineKind::Ffmpeg, program).args(["-y", "-hide_banner"]);
    match duration {
        Some(secs) if secs > 0.0 => inv
            .args(["-progress", "pipe:1", "-nostats"])
            .stdout(StdoutMode::FfmpegProgress { duration_secs: secs }),
        _ => inv,
    }
}

fn finish(inv: Invocation, output: &Path) -> Invocation {
    inv.arg(output).produces(Artifact::File(output.to_path_buf()))
}

// ── Convert ─────────────────────────────────────────────────────────────────

pub fn convert(
    program: &Path,
    input: &Path,
    output: &Path,
    params: &ConvertParams,
    table: &QualityTable,
    duration: Option<f64>,
) -> Invocation {
    let mut inv = base(program, duration).arg("-i").arg(input);
    let ext = extension_of(output);

    if has_extension(output, AUDIO_EXTENSIONS) {
        inv = inv.args(["-vn", "-map", "a"]);
        match ext.as_str() {
            "mp3" => {
                inv = inv.args(["-c:a", "libmp3lame", "-q:a"])
                    .arg(table.mp3_vbr(params.quality).to_string());
            }
            "m4a" => {
                inv = inv.args(["-c:a", "aac", "-b:a"]).arg(&table.audio_bitrate);
            }
            _ => {}
        }
        return finish(inv, output);
    }

    if ext == "webm" {
        inv = inv
            .args(["-c:v", "libvpx-vp9", "-crf"])
            .arg(table.webm_crf.to_string())
            .args(["-b:v", "0"]);
    } else {
        inv = inv
            .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-preset", params.speed.preset(), "-crf"])
            .arg(table.crf(params.quality).to_string());
    }
    inv = inv.args(["-c:a", "aac", "-b:a"]).arg(&table.audio_bitrate);
    finish(inv, output)
}

pub fn gif_filter(opts: &GifOptions) -> String {
    let mut chain = Vec::new();
    if opts.speed > 0.0 && (opts.speed - 1.0).abs() > f64::EPSILON {
        chain.push(format!("setpts=PTS/{}", opts.speed));
    }
    chain.push(format!("fps={}", opts.fps));
    if (opts.scale - 1.0).abs() > f64::EPSILON {
        chain.push(format!("scale=trunc(iw*{s}/2)*2:trunc(ih*{s}/2)*2:flags=lanczos", s = opts.scale));
    }
    format!(
        "{},split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse",
        chain.join(",")
    )
}

pub fn gif(program: &Path, input: &Path, output: &Path, opts: &GifOptions, duration: Option<f64>) -> Invocation {
    let inv = base(program, duration)
        .arg("-i")
        .arg(input)
        .args(["-vf", &gif_filter(opts), "-loop", "0"]);
    finish(inv, output)
}

// ── Resize ──────────────────────────────────────────────────────────────────

pub fn resize_filter(params: &ResizeParams) -> String {
    let (w, h) = (params.width, params.height);
    match params.mode {
        ResizeMode::Stretch => format!("scale={}:{}", w, h),
        ResizeMode::Fit => format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
            w = w,
            h = h
        ),
        ResizeMode::Crop => {
            let offsets = match params.anchor {
                Anchor::TopLeft => "0:0".to_string(),
                Anchor::BottomRight => format!("in_w-{}:in_h-{}", w, h),
                Anchor::Center => format!("(in_w-{})/2:(in_h-{})/2", w, h),
            };
            format!(
                "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}:{o}",
                w = w,
                h = h,
                o = offsets
            )
        }
    }
}

pub fn resize(program: &Path, input: &Path, output: &Path, params: &ResizeParams, duration: Option<f64>) -> Invocation {
    let mut inv = base(program, duration)
        .arg("-i")
        .arg(input)
        .args(["-vf", &resize_filter(params)]);
    if has_extension(output, STILL_OUTPUTS) {
        inv = inv.args(["-frames:v", "1", "-q:v", "2"]);
    } else {
        inv = inv.args(["-c:v", "libx264", "-preset", "ultrafast", "-crf", "23", "-c:a", "copy"]);
    }
    finish(inv, output)
}

// ── Upscale ─────────────────────────────────────────────────────────────────

pub fn upscale_filter(params: &UpscaleParams) -> String {
    let algo = params.algorithm.flag();
    let mut filter = match params.target {
        Some((w, h)) => format!("scale={}:{}:flags={}", w, h, algo),
        None => format!("scale=iw*{f}:ih*{f}:flags={a}", f = params.factor, a = algo),
    };
    if params.sharpen {
        filter.push(',');
        filter.push_str(UNSHARP);
    }
    filter
}

pub fn upscale(program: &Path, input: &Path, output: &Path, params: &UpscaleParams, duration: Option<f64>) -> Invocation {
    let mut inv = base(program, duration)
        .arg("-i")
        .arg(input)
        .args(["-vf", &upscale_filter(params)]);
    if has_extension(output, STILL_OUTPUTS) {
        inv = inv.args(["-q:v", "2"]);
    } else {
        inv = inv.args(["-c:v", "libx264", "-preset", "slow", "-crf", "18", "-c:a", "copy"]);
    }
    finish(inv, output)
}

// ── Interpolate ─────────────────────────────────────────────────────────────

pub fn minterpolate_filter(target_fps: u32) -> String {
    format!(
        "minterpolate=fps={}:mi_mode=mci:mc_mode=aobmc:me_mode=bidir:vsbmc=1",
        target_fps
    )
}

pub fn interpolate(program: &Path, input: &Path, output: &Path, target_fps: u32, duration: Option<f64>) -> Invocation {
    let inv = base(program, duration)
        .arg("-i")
        .arg(input)
        .args(["-vf", &minterpolate_filter(target_fps)])
        .args(["-c:v", "libx264", "-preset", "veryfast", "-crf", "20", "-c:a", "copy"]);
    finish(inv, output)
}

// ── Edit ────────────────────────────────────────────────────────────────────

/// Stream-copy trim. Cuts land on keyframes.
pub fn trim(program: &Path, input: &Path, output: &Path, start: f64, end: f64) -> Invocation {
    let inv = base(program, None)
        .arg("-ss")
        .arg(fmt_secs(start))
        .arg("-i")
        .arg(input)
        .arg("-t")
        .arg(fmt_secs(end - start))
        .args(["-c", "copy", "-avoid_negative_ts", "make_zero"]);
    finish(inv, output)
}

pub fn extract_frame(program: &Path, input: &Path, output: &Path, at: f64) -> Invocation {
    let inv = base(program, None)
        .arg("-ss")
        .arg(fmt_secs(at))
        .arg("-i")
        .arg(input)
        .args(["-frames:v", "1", "-q:v", "2"]);
    finish(inv, output)
}

// ── Frame pipeline ──────────────────────────────────────────────────────────

pub fn extract_sequence(program: &Path, input: &Path, pattern: &Path, frames_dir: &Path) -> Invocation {
    let mut inv = base(program, None).arg("-i").arg(input);
    if has_extension(pattern, &["jpg", "jpeg"]) {
        inv = inv.args(["-q:v", "2"]);
    }
    inv.arg(pattern).produces(Artifact::Directory(frames_dir.to_path_buf()))
}

pub fn extract_audio(program: &Path, input: &Path, sidecar: &Path) -> Invocation {
    let inv = base(program, None)
        .arg("-i")
        .arg(input)
        .args(["-vn", "-acodec", "copy"]);
    finish(inv, sidecar)
}

/// Frames plus optional audio back into a video at `fps`.
pub fn recombine(program: &Path, pattern: &Path, fps: f64, audio: Option<&Path>, output: &Path) -> Invocation {
    let mut inv = base(program, None)
        .arg("-framerate")
        .arg(fmt_fps(fps))
        .arg("-i")
        .arg(pattern);
    if let Some(audio) = audio {
        inv = inv.arg("-i").arg(audio);
    }
    inv = inv.args(["-map", "0:v:0"]);
    if audio.is_some() {
        inv = inv.args(["-map", "1:a:0"]);
    }
    inv = inv.args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-crf", "18"]);
    if audio.is_some() {
        inv = inv.args(["-c:a", "copy"]);
    }
    finish(inv, output)
}

fn fmt_secs(secs: f64) -> String {
    format!("{:.3}", secs.max(0.0))
}

/// Shortest decimal form: 120.0 -> "120", 59.94 -> "59.94".
pub fn fmt_fps(fps: f64) -> String {
    let rounded = (fps * 1000.0).round() / 1000.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}
