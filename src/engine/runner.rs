// SYNOID Engine Runner
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Executes one external engine invocation and applies the success rule:
// exit status zero AND the declared artifact exists with non-zero size.
// Diagnostics are discarded on success; on failure only the stderr tail is
// kept for the report.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::EngineKind;
use crate::error::{ForgeError, ForgeResult};
use crate::forge::progress::Progress;

/// Stderr bytes retained while a process runs.
const STDERR_WINDOW: usize = 8 * 1024;

/// What an invocation must leave behind to count as a success.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    File(PathBuf),
    /// A directory holding at least one non-empty file.
    Directory(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StdoutMode {
    Discard,
    Capture,
    /// Parse `-progress pipe:1` key/value lines against a known duration.
    FfmpegProgress { duration_secs: f64 },
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub engine: EngineKind,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
    pub artifact: Option<Artifact>,
    pub stdout: StdoutMode,
}

impl Invocation {
    pub fn new(engine: EngineKind, program: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            artifact: None,
            stdout: StdoutMode::Discard,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn produces(mut self, artifact: Artifact) -> Self {
        self.artifact = Some(artifact);
        self
    }

    pub fn stdout(mut self, mode: StdoutMode) -> Self {
        self.stdout = mode;
        self
    }

    /// Arguments as lossy strings, for logs and assertions.
    pub fn arg_strings(&self) -> Vec<String> {
        self.args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    /// Value following `flag` in the argument list.
    pub fn arg_after(&self, flag: &str) -> Option<String> {
        let args = self.arg_strings();
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1).cloned())
    }

    pub fn command_line(&self) -> String {
        format!("{} {}", self.program.display(), self.arg_strings().join(" "))
    }
}

/// Raw process outcome before the success rule is applied.
#[derive(Debug, Clone, Default)]
pub struct ProcessExit {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessExit {
    pub fn ok() -> Self {
        Self { code: Some(0), ..Self::default() }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self { code: Some(code), stderr: stderr.into(), ..Self::default() }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Spawns processes. Tests swap in scripted launchers.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(&self, invocation: &Invocation, progress: &Progress) -> std::io::Result<ProcessExit>;
}

// ─────────────────────────────────────────────────────────────────────────────
// SystemLauncher
// ─────────────────────────────────────────────────────────────────────────────

pub struct SystemLauncher;

#[async_trait]
impl ProcessLauncher for SystemLauncher {
    async fn launch(&self, invocation: &Invocation, progress: &Progress) -> std::io::Result<ProcessExit> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd.stdout(match invocation.stdout {
            StdoutMode::Discard => Stdio::null(),
            _ => Stdio::piped(),
        });
        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;

        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut window: Vec<u8> = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    match stderr.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            window.extend_from_slice(&buf[..n]);
                            if window.len() > STDERR_WINDOW {
                                let excess = window.len() - STDERR_WINDOW;
                                window.drain(..excess);
                            }
                        }
                    }
                }
                String::from_utf8_lossy(&window).into_owned()
            })
        });

        let mut stdout_text = String::new();
        if let Some(stdout) = child.stdout.take() {
            match &invocation.stdout {
                StdoutMode::Discard => {}
                StdoutMode::Capture => {
                    let mut reader = BufReader::new(stdout);
                    reader.read_to_string(&mut stdout_text).await?;
                }
                StdoutMode::FfmpegProgress { duration_secs } => {
                    let mut lines = BufReader::new(stdout).lines();
                    while let Some(line) = lines.next_line().await? {
                        if let Some(secs) = parse_progress_line(&line) {
                            if *duration_secs > 0.0 {
                                progress.report((secs / duration_secs) as f32);
                            }
                        }
                    }
                }
            }
        }

        let status = child.wait().await?;
        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        Ok(ProcessExit {
            code: status.code(),
            stdout: stdout_text,
            stderr,
        })
    }
}

/// Reads `out_time_us=` / `out_time_ms=` (both microseconds in ffmpeg) as seconds.
pub fn parse_progress_line(line: &str) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" | "out_time_ms" => {
            let micros: f64 = value.trim().parse().ok()?;
            (micros >= 0.0).then(|| micros / 1_000_000.0)
        }
        _ => None,
    }
}

/// Last `max_chars` characters of a diagnostic stream, char-boundary safe.
pub fn diagnostic_tail(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim_end();
    let count = trimmed.chars().count();
    if count <= max_chars {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - max_chars).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// EngineRunner
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct EngineRunner {
    launcher: Arc<dyn ProcessLauncher>,
    tail_chars: usize,
}

impl EngineRunner {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, tail_chars: usize) -> Self {
        Self { launcher, tail_chars }
    }

    pub fn system(tail_chars: usize) -> Self {
        Self::new(Arc::new(SystemLauncher), tail_chars)
    }

    /// Run once and apply the success rule.
    pub async fn run(&self, invocation: &Invocation, progress: &Progress) -> ForgeResult<ProcessExit> {
        let engine = invocation.engine.name();
        debug!("[RUNNER] {}", invocation.command_line());

        let exit = self
            .launcher
            .launch(invocation, progress)
            .await
            .map_err(|e| ForgeError::engine(engine, None, format!("failed to start: {}", e)))?;

        if !exit.success() {
            let tail = diagnostic_tail(&exit.stderr, self.tail_chars);
            warn!("[RUNNER] {} exited with {:?}", engine, exit.code);
            return Err(ForgeError::engine(engine, exit.code, tail));
        }

        if let Some(artifact) = &invocation.artifact {
            verify_artifact(engine, artifact)?;
        }

        info!("[RUNNER] {} finished", engine);
        Ok(exit)
    }
}

fn verify_artifact(engine: &str, artifact: &Artifact) -> ForgeResult<()> {
    match artifact {
        Artifact::File(path) => match std::fs::metadata(path) {
            Ok(meta) if meta.len() > 0 => Ok(()),
            Ok(_) => {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("[RUNNER] Could not delete empty artifact {}: {}", path.display(), e);
                }
                Err(ForgeError::PartialArtifact { path: path.clone() })
            }
            Err(_) => Err(ForgeError::engine(
                engine,
                Some(0),
                format!("declared artifact missing: {}", path.display()),
            )),
        },
        Artifact::Directory(dir) => {
            if dir_has_content(dir) {
                Ok(())
            } else {
                Err(ForgeError::engine(
                    engine,
                    Some(0),
                    format!("no output produced in {}", dir.display()),
                ))
            }
        }
    }
}

fn dir_has_content(dir: &Path) -> bool {
    walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| e.metadata().map(|m| m.is_file() && m.len() > 0).unwrap_or(false))
}
