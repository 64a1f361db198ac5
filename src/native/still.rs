// SYNOID Native Still Extraction
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use ffmpeg_next as ffmpeg;
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling;
use ffmpeg::{codec, format, frame, media};
use std::path::Path;
use tracing::{info, warn};

use super::render::frame_to_image;
use crate::error::{ForgeError, ForgeResult};

/// Frame duration assumed when the rate is unknown.
const FALLBACK_FRAME_SECS: f64 = 0.05;
/// Requests this close to the end snap to the last frame.
const END_SNAP_SECS: f64 = 0.05;
const END_GUARD_SECS: f64 = 0.01;

/// Keep a requested timestamp inside the decodable range. Near the end it
/// snaps back one frame so a frame is always available.
pub fn clamp_timestamp(at: f64, duration: f64, fps: f64) -> f64 {
    let mut t = at;
    if duration > 0.0 {
        let frame_secs = if fps > 0.0 { 1.0 / fps } else { FALLBACK_FRAME_SECS };
        if t >= duration - END_SNAP_SECS {
            t = (duration - frame_secs).max(0.0);
        }
        t = t.min(duration - END_GUARD_SECS);
    }
    t.max(0.0)
}

/// Decode the frame at `at` and save it to `output`. Returns the timestamp used.
pub fn extract(input: &Path, at: f64, output: &Path) -> ForgeResult<f64> {
    ffmpeg::init()?;
    let mut ictx = format::input(&input)?;
    let duration = if ictx.duration() > 0 { ictx.duration() as f64 / 1_000_000.0 } else { 0.0 };

    let (index, tb, params, fps) = {
        let s = ictx
            .streams()
            .best(media::Type::Video)
            .ok_or_else(|| ForgeError::native(format!("no video stream in {}", input.display())))?;
        let rate = f64::from(s.avg_frame_rate());
        (s.index(), s.time_base(), s.parameters(), if rate.is_finite() { rate } else { 0.0 })
    };

    let t = clamp_timestamp(at, duration, fps);
    let ts = (t * 1_000_000.0) as i64;
    if let Err(e) = ictx.seek(ts, ..ts) {
        warn!("[NATIVE] Seek to {:.3}s failed in {} ({}), decoding from the start", t, input.display(), e);
    }

    let mut decoder = codec::context::Context::from_parameters(params)?.decoder().video()?;
    let mut chosen: Option<frame::Video> = None;
    let mut last: Option<frame::Video> = None;

    let mut pick = |decoder: &mut ffmpeg::decoder::Video| -> bool {
        let mut decoded = frame::Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            let secs = decoded
                .timestamp()
                .map(|v| v as f64 * f64::from(tb))
                .unwrap_or(t);
            if secs + 1e-3 >= t {
                chosen = Some(decoded.clone());
                return true;
            }
            last = Some(decoded.clone());
        }
        false
    };

    let mut found = false;
    for (stream, packet) in ictx.packets() {
        if stream.index() != index || decoder.send_packet(&packet).is_err() {
            continue;
        }
        if pick(&mut decoder) {
            found = true;
            break;
        }
    }
    if !found {
        decoder.send_eof()?;
        pick(&mut decoder);
    }
    drop(pick);

    let frame = chosen
        .or(last)
        .ok_or_else(|| ForgeError::native(format!("no frame decodable at {:.3}s", t)))?;

    let mut scaler = scaling::Context::get(
        frame.format(),
        frame.width(),
        frame.height(),
        Pixel::RGB24,
        frame.width(),
        frame.height(),
        scaling::Flags::BILINEAR,
    )?;
    let mut rgb = frame::Video::empty();
    scaler.run(&frame, &mut rgb)?;
    frame_to_image(&rgb)?.save(output)?;

    info!("[NATIVE] Still at {:.3}s → {}", t, output.display());
    Ok(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_end_snaps_back_one_frame() {
        let duration = 10.0;
        let t = clamp_timestamp(duration - 0.01, duration, 30.0);
        assert!((t - (duration - 1.0 / 30.0)).abs() < 1e-9);
    }

    #[test]
    fn unknown_fps_uses_fallback_frame() {
        let t = clamp_timestamp(10.0, 10.0, 0.0);
        assert!((t - 9.95).abs() < 1e-9);
    }

    #[test]
    fn middle_is_untouched_and_negative_floors() {
        assert_eq!(clamp_timestamp(3.2, 10.0, 25.0), 3.2);
        assert_eq!(clamp_timestamp(-1.0, 10.0, 25.0), 0.0);
    }

    #[test]
    fn tiny_clip_never_negative() {
        assert_eq!(clamp_timestamp(0.5, 0.02, 30.0), 0.0);
        assert!(clamp_timestamp(0.5, 0.005, 30.0) >= 0.0);
    }
}
