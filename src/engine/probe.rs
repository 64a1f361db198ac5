// SYNOID Media Probe
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Reads resolution, frame rate and duration through ffprobe's JSON output.

use serde::Deserialize;
use std::path::Path;

use super::runner::{EngineRunner, Invocation, StdoutMode};
use super::{EngineKind, Toolbox};
use crate::error::{ForgeError, ForgeResult};
use crate::forge::progress::Progress;

/// What the pipeline needs to know about a source.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClipInfo {
    pub width: u32,
    pub height: u32,
    /// 0.0 when unknown.
    pub fps: f64,
    /// Seconds, 0.0 when unknown.
    pub duration: f64,
    pub has_audio: bool,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

pub fn probe_invocation(program: &Path, input: &Path) -> Invocation {
    Invocation::new(EngineKind::Probe, program)
        .args([
            "-v",
            "error",
            "-show_entries",
            "stream=codec_type,width,height,r_frame_rate:format=duration",
            "-of",
            "json",
        ])
        .arg(input)
        .stdout(StdoutMode::Capture)
}

/// `r_frame_rate` is "num/den" (e.g. "30000/1001").
pub fn parse_rate(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let value = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

pub fn parse_probe_json(json: &str) -> ForgeResult<ClipInfo> {
    let parsed: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| ForgeError::engine("ffprobe", Some(0), format!("unreadable probe output: {}", e)))?;

    let mut info = ClipInfo::default();
    if let Some(video) = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
    {
        info.width = video.width.unwrap_or(0);
        info.height = video.height.unwrap_or(0);
        info.fps = video.r_frame_rate.as_deref().and_then(parse_rate).unwrap_or(0.0);
    }
    info.has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));
    info.duration = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse().ok())
        .unwrap_or(0.0);
    Ok(info)
}

pub struct MediaProbe<'a> {
    toolbox: &'a Toolbox,
    runner: &'a EngineRunner,
}

impl<'a> MediaProbe<'a> {
    pub fn new(toolbox: &'a Toolbox, runner: &'a EngineRunner) -> Self {
        Self { toolbox, runner }
    }

    pub async fn inspect(&self, input: &Path) -> ForgeResult<ClipInfo> {
        let program = self.toolbox.resolve(EngineKind::Probe)?;
        let exit = self
            .runner
            .run(&probe_invocation(&program, input), &Progress::silent())
            .await?;
        parse_probe_json(&exit.stdout)
    }

    /// Duration for native progress, if known.
    pub async fn duration(&self, input: &Path) -> Option<f64> {
        self.inspect(input)
            .await
            .ok()
            .map(|i| i.duration)
            .filter(|d| *d > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ntsc_rate() {
        let fps = parse_rate("30000/1001").unwrap();
        assert!((fps - 29.97).abs() < 0.01);
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("25"), Some(25.0));
    }

    #[test]
    fn parses_probe_json() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 1080, "r_frame_rate": "24/1"},
                {"codec_type": "audio", "r_frame_rate": "0/0"}
            ],
            "format": {"duration": "12.500000"}
        }"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
        assert_eq!(info.fps, 24.0);
        assert_eq!(info.duration, 12.5);
        assert!(info.has_audio);
    }

    #[test]
    fn garbage_is_engine_error() {
        assert!(matches!(
            parse_probe_json("not json"),
            Err(ForgeError::EngineExecution { .. })
        ));
    }
}
