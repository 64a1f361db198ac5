// SYNOID Test Rig
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Scripted engines and a stub media library so pipelines run without
// ffmpeg, GPUs or model files.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use synoid_forge::config::ForgeConfig;
use synoid_forge::engine::probe::ClipInfo;
use synoid_forge::engine::runner::{Artifact, Invocation, ProcessExit, ProcessLauncher};
use synoid_forge::engine::EngineKind;
use synoid_forge::error::{ForgeError, ForgeResult};
use synoid_forge::forge::{ForgeContext, Progress};
use synoid_forge::native::{Geometry, MediaLibrary, RenderPlan};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behaviour {
    Succeed,
    /// Non-zero exit, nothing written.
    Crash,
    /// Exit zero but the declared file is left empty.
    EmptyArtifact,
}

/// Records every invocation and fakes what the real engine would leave on disk.
pub struct ScriptedLauncher {
    pub clip: ClipInfo,
    /// Size of the extracted audio sidecar. 0 writes an empty file.
    pub audio_bytes: usize,
    plan: Mutex<Vec<(EngineKind, Behaviour)>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedLauncher {
    pub fn new(clip: ClipInfo) -> Self {
        Self {
            clip,
            audio_bytes: 4096,
            plan: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The next invocation of `kind` behaves as `behaviour`; later ones succeed.
    pub fn then(self, kind: EngineKind, behaviour: Behaviour) -> Self {
        self.plan.lock().unwrap().push((kind, behaviour));
        self
    }

    pub fn with_audio_bytes(mut self, bytes: usize) -> Self {
        self.audio_bytes = bytes;
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, kind: EngineKind) -> Vec<Invocation> {
        self.calls().into_iter().filter(|c| c.engine == kind).collect()
    }

    fn next_behaviour(&self, kind: EngineKind) -> Behaviour {
        let mut plan = self.plan.lock().unwrap();
        match plan.iter().position(|(k, _)| *k == kind) {
            Some(i) => plan.remove(i).1,
            None => Behaviour::Succeed,
        }
    }

    fn probe_json(&self) -> String {
        format!(
            r#"{{"streams":[{{"codec_type":"video","width":{},"height":{},"r_frame_rate":"{}/1"}}],"format":{{"duration":"{}"}}}}"#,
            self.clip.width, self.clip.height, self.clip.fps as u32, self.clip.duration
        )
    }
}

#[async_trait]
impl ProcessLauncher for ScriptedLauncher {
    async fn launch(&self, invocation: &Invocation, progress: &Progress) -> std::io::Result<ProcessExit> {
        self.calls.lock().unwrap().push(invocation.clone());
        let behaviour = self.next_behaviour(invocation.engine);

        if behaviour == Behaviour::Crash {
            return Ok(ProcessExit::failed(1, "vkQueueSubmit failed: VK_ERROR_DEVICE_LOST"));
        }

        if invocation.engine == EngineKind::Probe {
            return Ok(ProcessExit { code: Some(0), stdout: self.probe_json(), stderr: String::new() });
        }

        match &invocation.artifact {
            Some(Artifact::File(path)) => {
                let bytes = if behaviour == Behaviour::EmptyArtifact {
                    Vec::new()
                } else if path.file_name().map(|n| n == "audio.m4a").unwrap_or(false) {
                    vec![0u8; self.audio_bytes]
                } else {
                    b"forged".to_vec()
                };
                std::fs::write(path, bytes)?;
            }
            Some(Artifact::Directory(dir)) => {
                std::fs::create_dir_all(dir)?;
                if behaviour != Behaviour::EmptyArtifact {
                    std::fs::write(dir.join("00000001.png"), b"frame")?;
                    std::fs::write(dir.join("00000002.png"), b"frame")?;
                }
            }
            None => {}
        }
        progress.report(0.5);
        Ok(ProcessExit::ok())
    }
}

/// In-process library double: counts calls and writes placeholder outputs.
#[derive(Default)]
pub struct StubLibrary {
    pub clip: ClipInfo,
    pub fail: bool,
    pub renders: Mutex<Vec<RenderPlan>>,
    pub stills: AtomicUsize,
    pub resizes: AtomicUsize,
    pub inspects: AtomicUsize,
}

impl StubLibrary {
    pub fn new(clip: ClipInfo) -> Self {
        Self { clip, ..Self::default() }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().unwrap().len()
    }

    fn write(&self, output: &Path) -> ForgeResult<()> {
        if self.fail {
            return Err(ForgeError::native("stub library refused"));
        }
        std::fs::write(output, b"native").map_err(|e| ForgeError::resource("stub write", e))
    }
}

impl MediaLibrary for StubLibrary {
    fn inspect(&self, _path: &Path) -> ForgeResult<ClipInfo> {
        self.inspects.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ForgeError::native("stub library refused"));
        }
        Ok(self.clip)
    }

    fn render(&self, plan: &RenderPlan, output: &Path) -> ForgeResult<()> {
        self.renders.lock().unwrap().push(plan.clone());
        self.write(output)
    }

    fn still(&self, _path: &Path, at: f64, output: &Path) -> ForgeResult<f64> {
        self.stills.fetch_add(1, Ordering::SeqCst);
        self.write(output)?;
        Ok(at)
    }

    fn resize_image(&self, _input: &Path, output: &Path, _geometry: &Geometry) -> ForgeResult<()> {
        self.resizes.fetch_add(1, Ordering::SeqCst);
        self.write(output)
    }
}

/// Real ffmpeg and ffprobe on PATH, for the scenarios that need actual media.
pub fn ffmpeg_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|tool| {
        Command::new(tool).arg("-version").output().map(|o| o.status.success()).unwrap_or(false)
    })
}

/// A lavfi test pattern with a mono sine track, one keyframe per frame.
pub fn make_av_clip(dir: &Path, name: &str, secs: u32, fps: u32, sample_rate: u32) -> PathBuf {
    let path = dir.join(name);
    let out = Command::new("ffmpeg")
        .args(["-y", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=duration={}:size=320x240:rate={}", secs, fps))
        .args(["-f", "lavfi", "-i"])
        .arg(format!("sine=frequency=440:sample_rate={}:duration={}", sample_rate, secs))
        .args(["-c:v", "libx264", "-g", "1", "-pix_fmt", "yuv420p", "-c:a", "aac", "-shortest"])
        .arg(&path)
        .output()
        .expect("Failed to execute ffmpeg");
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    path
}

/// Duration of one stream (`v:0`, `a:0`) as ffprobe reports it.
pub fn stream_duration(path: &Path, stream: &str) -> Option<f64> {
    let out = Command::new("ffprobe")
        .args(["-v", "error", "-select_streams", stream, "-show_entries", "stream=duration", "-of", "csv=p=0"])
        .arg(path)
        .output()
        .ok()?;
    String::from_utf8_lossy(&out.stdout).trim().parse().ok()
}

pub fn hd_clip() -> ClipInfo {
    ClipInfo { width: 1920, height: 1080, fps: 30.0, duration: 10.0, has_audio: true }
}

/// Scratch directories, fake engine binaries and a context wired to the doubles.
pub struct Rig {
    pub tools: TempDir,
    pub temp_root: TempDir,
    pub work: TempDir,
    pub launcher: Arc<ScriptedLauncher>,
    pub library: Arc<StubLibrary>,
    pub ctx: ForgeContext,
}

impl Rig {
    pub fn new(launcher: ScriptedLauncher, library: StubLibrary) -> Self {
        Self::with_engines(
            launcher,
            library,
            &[
                EngineKind::Ffmpeg,
                EngineKind::Probe,
                EngineKind::SuperResolution,
                EngineKind::Interpolation,
            ],
        )
    }

    pub fn with_engines(launcher: ScriptedLauncher, library: StubLibrary, engines: &[EngineKind]) -> Self {
        let tools = tempfile::tempdir().unwrap();
        for kind in engines {
            let exe = kind.descriptor().executable;
            std::fs::write(tools.path().join(exe), b"#!/bin/sh\n").unwrap();
        }
        let temp_root = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();

        let config = ForgeConfig {
            tools_dir: Some(tools.path().to_path_buf()),
            default_tools_dir: tools.path().to_path_buf(),
            temp_root: temp_root.path().to_path_buf(),
            ..ForgeConfig::default()
        };

        let launcher = Arc::new(launcher);
        let library = Arc::new(library);
        let ctx = ForgeContext::new(Arc::new(config), launcher.clone(), library.clone());
        Self { tools, temp_root, work, launcher, library, ctx }
    }

    /// A placeholder input file under the work directory.
    pub fn input(&self, name: &str) -> PathBuf {
        let path = self.work.path().join(name);
        std::fs::write(&path, b"source media").unwrap();
        path
    }

    pub fn out(&self, name: &str) -> PathBuf {
        self.work.path().join("out").join(name)
    }

    /// Entries left in the workspace root.
    pub fn leftover_workspaces(&self) -> usize {
        std::fs::read_dir(self.temp_root.path()).unwrap().count()
    }
}
