// SYNOID Native Renderer
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// In-process decode → reshape → H.264 encode over an ordered list of
// segments. Covers subclip, concatenate, resize, pad and crop when the
// classical engine is unavailable or fails. Frames are retimed onto one
// constant-rate timeline taken from the first segment. Audio is
// stream-copied from segments whose codec parameters match the first
// segment's.

use ffmpeg_next as ffmpeg;
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling;
use ffmpeg::{codec, encoder, format, frame, media, Dictionary, Packet, Rational};
use image::{imageops, RgbImage};
use std::ops::Range;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{RenderPlan, Segment};
use crate::error::{ForgeError, ForgeResult};

const MICROS: f64 = 1_000_000.0;

/// yuv420p output needs even, non-zero dimensions.
pub fn check_dims(width: u32, height: u32) -> ForgeResult<()> {
    if width == 0 || height == 0 || width % 2 == 1 || height % 2 == 1 {
        return Err(ForgeError::config(format!(
            "native render needs even dimensions, got {}x{}",
            width, height
        )));
    }
    Ok(())
}

/// The exact average rate of a stream, or 30/1 when the container leaves it unset.
fn output_rate(avg: Rational) -> Rational {
    if avg.numerator() > 0 && avg.denominator() > 0 {
        avg
    } else {
        Rational::new(30, 1)
    }
}

fn secs(ts: i64, tb: Rational) -> f64 {
    ts as f64 * f64::from(tb)
}

fn ticks(seconds: f64, tb: Rational) -> i64 {
    let per_sec = f64::from(tb);
    if per_sec <= 0.0 {
        return 0;
    }
    (seconds / per_sec).round() as i64
}

/// Copy a packed RGB24 frame into an `RgbImage`, honouring the line stride.
pub fn frame_to_image(rgb: &frame::Video) -> ForgeResult<RgbImage> {
    let (w, h) = (rgb.width() as usize, rgb.height() as usize);
    let stride = rgb.stride(0);
    let data = rgb.data(0);
    let mut buf = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let start = row * stride;
        buf.extend_from_slice(&data[start..start + w * 3]);
    }
    RgbImage::from_raw(w as u32, h as u32, buf)
        .ok_or_else(|| ForgeError::native("frame buffer size mismatch"))
}

fn image_to_frame(img: &RgbImage) -> frame::Video {
    let (w, h) = img.dimensions();
    let mut out = frame::Video::new(Pixel::RGB24, w, h);
    let stride = out.stride(0);
    let row_bytes = w as usize * 3;
    let src = img.as_raw();
    let dst = out.data_mut(0);
    for row in 0..h as usize {
        dst[row * stride..row * stride + row_bytes]
            .copy_from_slice(&src[row * row_bytes..(row + 1) * row_bytes]);
    }
    out
}

/// Stream-copy compatibility of an audio track. Packets only move between
/// tracks whose signatures are equal.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AudioSignature {
    codec: codec::Id,
    rate: u32,
    channels: u32,
    format: format::Sample,
}

impl AudioSignature {
    fn of(params: codec::Parameters) -> ForgeResult<Self> {
        let codec = params.id();
        let decoder = codec::context::Context::from_parameters(params)?.decoder().audio()?;
        Ok(Self {
            codec,
            rate: decoder.rate(),
            channels: decoder.ch_layout().channels() as u32,
            format: decoder.format(),
        })
    }
}

struct AudioTrack {
    index: usize,
    signature: AudioSignature,
}

/// Places presentation times on the constant-rate output grid. Slot `n`
/// is shown at `n / rate` seconds.
#[derive(Debug, Clone, Copy)]
struct OutputClock {
    rate: Rational,
    next: i64,
}

impl OutputClock {
    fn new(rate: Rational) -> Self {
        Self { rate, next: 0 }
    }

    fn slot(&self, secs: f64) -> i64 {
        (secs * f64::from(self.rate)).round() as i64
    }

    fn secs(&self) -> f64 {
        self.next as f64 / f64::from(self.rate)
    }

    /// Slots a frame at `secs` covers: the gap since the previous frame, then
    /// its own slot last. `None` drops the frame, either because its slot is
    /// already taken or because it lands at or past `limit`.
    fn take(&mut self, secs: f64, limit: Option<i64>) -> Option<Range<i64>> {
        let slot = self.slot(secs);
        if slot < self.next || limit.map_or(false, |l| slot >= l) {
            return None;
        }
        let covered = self.next..slot + 1;
        self.next = slot + 1;
        Some(covered)
    }

    /// Slots left empty up to `secs`; the caller holds the last frame over them.
    fn fill_to(&mut self, secs: f64) -> Range<i64> {
        let end = self.slot(secs).max(self.next);
        let gap = self.next..end;
        self.next = end;
        gap
    }
}

/// Output seconds a segment occupies: its requested range, cut short when
/// the decoded source ends first. `source_end` is where the last decoded
/// frame stops showing, `None` when nothing was decoded.
fn segment_span(start: f64, end: Option<f64>, source_end: Option<f64>) -> f64 {
    match source_end {
        None => 0.0,
        Some(stop) => (end.map_or(stop, |e| e.min(stop)) - start).max(0.0),
    }
}

/// Per-segment placement state.
struct Cursor {
    /// Output time of the segment's first instant.
    offset: f64,
    limit: Option<i64>,
    frame_secs: f64,
    source_end: Option<f64>,
}

struct Renderer {
    octx: format::context::Output,
    video: encoder::video::Encoder,
    video_index: usize,
    enc_tb: Rational,
    to_yuv: scaling::Context,
    width: u32,
    height: u32,
    clock: OutputClock,
    /// Last encoded frame, repeated over empty slots.
    held: Option<frame::Video>,
    frames_written: i64,
    audio: Option<AudioTrack>,
}

impl Renderer {
    fn open(plan: &RenderPlan, output: &Path) -> ForgeResult<Self> {
        let first = plan
            .segments
            .first()
            .ok_or_else(|| ForgeError::config("render plan has no segments"))?;
        let first_info = super::inspect(&first.source)?;
        let ictx = format::input(&first.source)?;

        let (width, height) = match &plan.geometry {
            Some(g) => (g.width, g.height),
            None => (first_info.width, first_info.height),
        };
        check_dims(width, height)?;

        let avg = ictx
            .streams()
            .best(media::Type::Video)
            .map(|s| s.avg_frame_rate())
            .unwrap_or_else(|| Rational::new(0, 1));
        let rate = output_rate(avg);

        let mut octx = format::output(&output)?;
        let global_header = octx.format().flags().contains(format::Flags::GLOBAL_HEADER);

        let h264 = encoder::find(codec::Id::H264)
            .ok_or_else(|| ForgeError::native("H.264 encoder unavailable"))?;
        let enc_tb = rate.invert();

        let (video, video_index) = {
            let mut ost = octx.add_stream(h264)?;
            let mut enc = codec::context::Context::new_with_codec(h264).encoder().video()?;
            enc.set_width(width);
            enc.set_height(height);
            enc.set_format(Pixel::YUV420P);
            enc.set_time_base(enc_tb);
            enc.set_frame_rate(Some(rate));
            if global_header {
                enc.set_flags(codec::Flags::GLOBAL_HEADER);
            }
            let mut opts = Dictionary::new();
            opts.set("preset", &plan.preset);
            opts.set("crf", &plan.crf.to_string());
            let opened = enc.open_with(opts)?;
            ost.set_parameters(&opened);
            ost.set_time_base(enc_tb);
            (opened, ost.index())
        };

        let audio = Self::add_audio_stream(&mut octx, &ictx)?;

        octx.write_header()?;

        let to_yuv = scaling::Context::get(
            Pixel::RGB24,
            width,
            height,
            Pixel::YUV420P,
            width,
            height,
            scaling::Flags::BILINEAR,
        )?;

        info!(
            "[NATIVE] Rendering {}x{} @ {}/{} fps → {}",
            width,
            height,
            rate.numerator(),
            rate.denominator(),
            output.display()
        );
        Ok(Self {
            octx,
            video,
            video_index,
            enc_tb,
            to_yuv,
            width,
            height,
            clock: OutputClock::new(rate),
            held: None,
            frames_written: 0,
            audio,
        })
    }

    fn add_audio_stream(
        octx: &mut format::context::Output,
        ictx: &format::context::Input,
    ) -> ForgeResult<Option<AudioTrack>> {
        let Some(ist) = ictx.streams().best(media::Type::Audio) else {
            return Ok(None);
        };
        let signature = match AudioSignature::of(ist.parameters()) {
            Ok(sig) => sig,
            Err(e) => {
                warn!("[NATIVE] Unreadable audio parameters ({}); output will be silent", e);
                return Ok(None);
            }
        };
        let mut ost = octx.add_stream(encoder::find(codec::Id::None))?;
        ost.set_parameters(ist.parameters());
        // Let the muxer pick a tag valid for the output container.
        // SAFETY: the pointer is the codec parameters of a stream owned by
        // `octx`, alive for this scope, and `ost` is the only handle to it.
        unsafe {
            (*ost.parameters().as_mut_ptr()).codec_tag = 0;
        }
        Ok(Some(AudioTrack { index: ost.index(), signature }))
    }

    fn segment(&mut self, seg: &Segment, geometry: Option<&super::Geometry>) -> ForgeResult<()> {
        let offset = self.clock.secs();
        let mut ictx = format::input(&seg.source)?;

        let (v_idx, v_tb, v_params, v_rate) = {
            let s = ictx
                .streams()
                .best(media::Type::Video)
                .ok_or_else(|| ForgeError::native(format!("no video stream in {}", seg.source.display())))?;
            (s.index(), s.time_base(), s.parameters(), s.avg_frame_rate())
        };
        let audio_in = match &self.audio {
            Some(track) => ictx
                .streams()
                .best(media::Type::Audio)
                .filter(|s| AudioSignature::of(s.parameters()).map_or(false, |sig| sig == track.signature))
                .map(|s| (s.index(), s.time_base())),
            None => None,
        };
        if self.audio.is_some() && audio_in.is_none() {
            warn!(
                "[NATIVE] {} has no audio matching the first segment's codec parameters; segment will be silent",
                seg.source.display()
            );
        }

        let mut decoder = codec::context::Context::from_parameters(v_params)?.decoder().video()?;

        if seg.start > 0.0 {
            let ts = (seg.start * MICROS) as i64;
            if let Err(e) = ictx.seek(ts, ..ts) {
                warn!("[NATIVE] Seek failed ({}), decoding from start", e);
            }
        }

        let mut cursor = Cursor {
            offset,
            limit: seg.end.map(|end| self.clock.slot(offset + end - seg.start)),
            frame_secs: f64::from(output_rate(v_rate).invert()),
            source_end: None,
        };
        debug!("[NATIVE] Segment {} [{:.3}, {:?}) at {:.3}s", seg.source.display(), seg.start, seg.end, offset);

        let mut to_rgb: Option<scaling::Context> = None;
        let mut done = false;

        for (stream, mut packet) in ictx.packets() {
            if stream.index() == v_idx {
                if decoder.send_packet(&packet).is_err() {
                    continue;
                }
                done = self.drain_decoder(&mut decoder, &mut to_rgb, v_tb, seg, &mut cursor, geometry)?;
            } else if let Some((a_idx, a_tb)) = audio_in {
                if stream.index() == a_idx {
                    self.copy_audio(&mut packet, a_tb, seg, offset)?;
                }
            }
            if done {
                break;
            }
        }

        if !done {
            decoder.send_eof()?;
            self.drain_decoder(&mut decoder, &mut to_rgb, v_tb, seg, &mut cursor, geometry)?;
        }

        let span = segment_span(seg.start, seg.end, cursor.source_end);
        self.hold_until(offset + span)
    }

    /// Returns true once a frame past the segment end is seen.
    fn drain_decoder(
        &mut self,
        decoder: &mut ffmpeg::decoder::Video,
        to_rgb: &mut Option<scaling::Context>,
        tb: Rational,
        seg: &Segment,
        cursor: &mut Cursor,
        geometry: Option<&super::Geometry>,
    ) -> ForgeResult<bool> {
        let mut decoded = frame::Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            let t = decoded.timestamp().or(decoded.pts()).map(|ts| secs(ts, tb)).unwrap_or(seg.start);
            let shown_until = t + cursor.frame_secs;
            cursor.source_end = Some(cursor.source_end.map_or(shown_until, |e| e.max(shown_until)));

            if t + 1e-3 < seg.start {
                continue;
            }
            if seg.end.map_or(false, |end| t >= end) {
                return Ok(true);
            }
            let Some(slots) = self.clock.take(cursor.offset + (t - seg.start).max(0.0), cursor.limit) else {
                continue;
            };

            if to_rgb.is_none() {
                *to_rgb = Some(scaling::Context::get(
                    decoded.format(),
                    decoded.width(),
                    decoded.height(),
                    Pixel::RGB24,
                    decoded.width(),
                    decoded.height(),
                    scaling::Flags::BILINEAR,
                )?);
            }
            if let Some(scaler) = to_rgb.as_mut() {
                let mut rgb = frame::Video::empty();
                scaler.run(&decoded, &mut rgb)?;
                let img = frame_to_image(&rgb)?;
                let yuv = self.shape(img, geometry)?;
                self.place(yuv, slots)?;
            }
        }
        Ok(false)
    }

    fn shape(&mut self, img: RgbImage, geometry: Option<&super::Geometry>) -> ForgeResult<frame::Video> {
        let mut shaped = match geometry {
            Some(g) => g.apply(&img),
            None => img,
        };
        if shaped.dimensions() != (self.width, self.height) {
            shaped = imageops::resize(&shaped, self.width, self.height, imageops::FilterType::Triangle);
        }

        let rgb = image_to_frame(&shaped);
        let mut yuv = frame::Video::empty();
        self.to_yuv.run(&rgb, &mut yuv)?;
        Ok(yuv)
    }

    /// Encodes `yuv` in the last slot of `slots`, holding the previous frame
    /// over any earlier ones.
    fn place(&mut self, yuv: frame::Video, slots: Range<i64>) -> ForgeResult<()> {
        let own = slots.end - 1;
        for slot in slots.start..own {
            let mut dup = match &self.held {
                Some(prev) => prev.clone(),
                None => yuv.clone(),
            };
            dup.set_pts(Some(slot));
            self.encode(&dup)?;
        }
        let mut current = yuv;
        current.set_pts(Some(own));
        self.encode(&current)?;
        self.held = Some(current);
        Ok(())
    }

    /// Repeats the held frame until the output clock reaches `secs`.
    fn hold_until(&mut self, secs: f64) -> ForgeResult<()> {
        let gap = self.clock.fill_to(secs);
        let Some(held) = self.held.clone() else {
            return Ok(());
        };
        for slot in gap {
            let mut dup = held.clone();
            dup.set_pts(Some(slot));
            self.encode(&dup)?;
        }
        Ok(())
    }

    fn encode(&mut self, yuv: &frame::Video) -> ForgeResult<()> {
        self.video.send_frame(yuv)?;
        self.frames_written += 1;
        self.write_video_packets()
    }

    fn write_video_packets(&mut self) -> ForgeResult<()> {
        let out_tb = self
            .octx
            .stream(self.video_index)
            .map(|s| s.time_base())
            .ok_or(ffmpeg::Error::StreamNotFound)?;
        let mut packet = Packet::empty();
        while self.video.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.video_index);
            packet.rescale_ts(self.enc_tb, out_tb);
            packet.write_interleaved(&mut self.octx)?;
        }
        Ok(())
    }

    fn copy_audio(&mut self, packet: &mut Packet, in_tb: Rational, seg: &Segment, offset: f64) -> ForgeResult<()> {
        let Some(track) = &self.audio else {
            return Ok(());
        };
        let Some(pts) = packet.pts() else {
            return Ok(());
        };
        let t = secs(pts, in_tb);
        if t < seg.start || seg.end.map_or(false, |end| t >= end) {
            return Ok(());
        }

        let index = track.index;
        let out_tb = self
            .octx
            .stream(index)
            .map(|s| s.time_base())
            .ok_or(ffmpeg::Error::StreamNotFound)?;
        packet.rescale_ts(in_tb, out_tb);
        let shift = ticks(offset - seg.start, out_tb);
        packet.set_pts(packet.pts().map(|p| p + shift));
        packet.set_dts(packet.dts().map(|d| d + shift));
        packet.set_position(-1);
        packet.set_stream(index);
        packet.write_interleaved(&mut self.octx)?;
        Ok(())
    }

    fn finish(mut self) -> ForgeResult<i64> {
        self.video.send_eof()?;
        self.write_video_packets()?;
        self.octx.write_trailer()?;
        Ok(self.frames_written)
    }
}

pub fn render(plan: &RenderPlan, output: &Path) -> ForgeResult<()> {
    ffmpeg::init()?;
    let mut renderer = Renderer::open(plan, output)?;
    for seg in &plan.segments {
        renderer.segment(seg, plan.geometry.as_ref())?;
    }
    let frames = renderer.finish()?;
    if frames == 0 {
        return Err(ForgeError::native("no frames decoded for the requested range"));
    }
    info!("[NATIVE] Wrote {} frames to {}", frames, output.display());
    Ok(())
}
