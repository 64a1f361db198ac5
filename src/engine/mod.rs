// SYNOID Engine Catalogue
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// External engines the forge drives, how their executables are located,
// and the command builders for each of them.

pub mod ffmpeg;
pub mod learned;
pub mod probe;
pub mod runner;

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::config::ForgeConfig;
use crate::error::{ForgeError, ForgeResult};
use crate::forge::io_shield;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EngineKind {
    /// Classical filter-graph engine.
    Ffmpeg,
    Probe,
    SuperResolution,
    Interpolation,
    FaceRestore,
}

impl EngineKind {
    pub const ALL: [EngineKind; 5] = [
        EngineKind::Ffmpeg,
        EngineKind::Probe,
        EngineKind::SuperResolution,
        EngineKind::Interpolation,
        EngineKind::FaceRestore,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EngineKind::Ffmpeg => "ffmpeg",
            EngineKind::Probe => "ffprobe",
            EngineKind::SuperResolution => "realesrgan-ncnn-vulkan",
            EngineKind::Interpolation => "rife-ncnn-vulkan",
            EngineKind::FaceRestore => "codeformer",
        }
    }

    pub fn descriptor(self) -> EngineDescriptor {
        match self {
            EngineKind::Ffmpeg => EngineDescriptor::binary(self, "ffmpeg", true),
            EngineKind::Probe => EngineDescriptor::binary(self, "ffprobe", true),
            EngineKind::SuperResolution => EngineDescriptor::binary(self, "realesrgan-ncnn-vulkan", false),
            EngineKind::Interpolation => EngineDescriptor::binary(self, "rife-ncnn-vulkan", false),
            EngineKind::FaceRestore => EngineDescriptor {
                kind: self,
                executable: if cfg!(windows) { "run_codeformer.bat" } else { "run_codeformer.sh" }.to_string(),
                search_path: false,
            },
        }
    }
}

/// Identifies one external tool and where it may live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDescriptor {
    pub kind: EngineKind,
    /// File name including the platform suffix.
    pub executable: String,
    /// Whether `PATH` is consulted after the configured directories.
    pub search_path: bool,
}

impl EngineDescriptor {
    fn binary(kind: EngineKind, stem: &str, search_path: bool) -> Self {
        Self {
            kind,
            executable: format!("{}{}", stem, std::env::consts::EXE_SUFFIX),
            search_path,
        }
    }

    /// Configured tools directory, then the default location, then `PATH` when allowed.
    pub fn locate(&self, config: &ForgeConfig) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(dir) = &config.tools_dir {
            candidates.push(dir.join(&self.executable));
        }
        candidates.push(config.default_tools_dir.join(&self.executable));

        for candidate in candidates {
            if candidate.is_file() {
                return Some(io_shield::absolute(&candidate).unwrap_or(candidate));
            }
        }

        if self.search_path {
            return which::which(&self.executable).ok();
        }
        None
    }

    pub fn is_available(&self, config: &ForgeConfig) -> bool {
        self.locate(config).is_some()
    }

    pub fn resolve(&self, config: &ForgeConfig) -> ForgeResult<PathBuf> {
        match self.locate(config) {
            Some(path) => {
                debug!("[ENGINE] {} -> {}", self.kind.name(), path.display());
                Ok(path)
            }
            None => Err(ForgeError::config(format!(
                "{} not found (looked in {}{})",
                self.executable,
                config
                    .tools_dir
                    .as_ref()
                    .map(|d| format!("{}, ", d.display()))
                    .unwrap_or_default(),
                config.default_tools_dir.display()
            ))),
        }
    }
}

/// Resolves engines against one configuration.
#[derive(Debug, Clone)]
pub struct Toolbox {
    config: Arc<ForgeConfig>,
}

impl Toolbox {
    pub fn new(config: Arc<ForgeConfig>) -> Self {
        Self { config }
    }

    pub fn resolve(&self, kind: EngineKind) -> ForgeResult<PathBuf> {
        kind.descriptor().resolve(&self.config)
    }

    pub fn locate(&self, kind: EngineKind) -> Option<PathBuf> {
        kind.descriptor().locate(&self.config)
    }

    /// Availability of every engine, for the `engines` report.
    pub fn report(&self) -> Vec<(EngineKind, Option<PathBuf>)> {
        EngineKind::ALL.iter().map(|k| (*k, self.locate(*k))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(tools: Option<PathBuf>, default_dir: PathBuf) -> ForgeConfig {
        ForgeConfig {
            tools_dir: tools,
            default_tools_dir: default_dir,
            ..ForgeConfig::default()
        }
    }

    #[test]
    fn configured_dir_wins_over_default() {
        let tools = tempfile::tempdir().unwrap();
        let fallback = tempfile::tempdir().unwrap();
        let desc = EngineKind::SuperResolution.descriptor();
        std::fs::write(tools.path().join(&desc.executable), b"bin").unwrap();
        std::fs::write(fallback.path().join(&desc.executable), b"bin").unwrap();

        let cfg = config_with(Some(tools.path().to_path_buf()), fallback.path().to_path_buf());
        assert_eq!(desc.resolve(&cfg).unwrap(), tools.path().join(&desc.executable));
    }

    #[test]
    fn default_dir_used_when_tools_dir_lacks_engine() {
        let tools = tempfile::tempdir().unwrap();
        let fallback = tempfile::tempdir().unwrap();
        let desc = EngineKind::Interpolation.descriptor();
        std::fs::write(fallback.path().join(&desc.executable), b"bin").unwrap();

        let cfg = config_with(Some(tools.path().to_path_buf()), fallback.path().to_path_buf());
        assert_eq!(desc.resolve(&cfg).unwrap(), fallback.path().join(&desc.executable));
    }

    #[test]
    fn missing_learned_engine_is_configuration_error() {
        let empty = tempfile::tempdir().unwrap();
        let cfg = config_with(None, empty.path().to_path_buf());
        let err = EngineKind::SuperResolution.descriptor().resolve(&cfg).unwrap_err();
        assert!(matches!(err, ForgeError::Configuration(_)));
        assert!(!EngineKind::FaceRestore.descriptor().is_available(&cfg));
    }

    #[test]
    fn executable_names_carry_platform_suffix() {
        let desc = EngineKind::Ffmpeg.descriptor();
        assert!(desc.executable.starts_with("ffmpeg"));
        assert!(desc.executable.ends_with(std::env::consts::EXE_SUFFIX));
        assert!(desc.search_path);
        assert!(!EngineKind::Interpolation.descriptor().search_path);
    }

    #[test]
    fn relative_tools_dir_resolves_to_absolute_path() {
        let cwd = std::env::current_dir().unwrap();
        let tools = tempfile::tempdir_in(&cwd).unwrap();
        let desc = EngineKind::FaceRestore.descriptor();
        std::fs::write(tools.path().join(&desc.executable), b"bin").unwrap();

        let relative = tools.path().strip_prefix(&cwd).unwrap().to_path_buf();
        let cfg = config_with(Some(relative), PathBuf::from("no-such-dir"));
        let found = desc.locate(&cfg).unwrap();
        assert!(found.is_absolute());
        assert_eq!(found, tools.path().join(&desc.executable));
    }

    #[test]
    fn path_search_only_for_engines_that_allow_it() {
        let empty = tempfile::tempdir().unwrap();
        let cfg = config_with(None, empty.path().to_path_buf());
        // Learned engines never consult PATH.
        assert!(EngineKind::SuperResolution.descriptor().locate(&cfg).is_none());
        let ffmpeg = EngineKind::Ffmpeg.descriptor().locate(&cfg);
        assert_eq!(ffmpeg, which::which(EngineKind::Ffmpeg.descriptor().executable).ok());
    }
}
