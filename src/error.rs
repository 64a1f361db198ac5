// SYNOID Forge Errors
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Typed failure taxonomy shared by every transformation. Engine failures are
// values, never panics; fallback ladders inspect them and move on.

use std::path::PathBuf;
use thiserror::Error;

pub type ForgeResult<T> = Result<T, ForgeError>;

#[derive(Debug, Error)]
pub enum ForgeError {
    /// Executable unresolved, invalid parameters, or missing input.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Non-zero exit, crash, missing artifact, or in-process library failure.
    #[error("{engine} failed (exit code {}): {detail}", exit_label(.exit_code))]
    EngineExecution {
        engine: String,
        exit_code: Option<i32>,
        detail: String,
    },

    /// The engine reported success but left an empty file. The file is already deleted.
    #[error("engine produced an empty artifact: {}", path.display())]
    PartialArtifact { path: PathBuf },

    #[error("{operation}: {source}")]
    Resource {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// The worker slot is already running a job.
    #[error("worker slot is busy")]
    Busy,
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "none".to_string(),
    }
}

impl ForgeError {
    pub fn config(msg: impl Into<String>) -> Self {
        ForgeError::Configuration(msg.into())
    }

    pub fn engine(engine: impl Into<String>, exit_code: Option<i32>, detail: impl Into<String>) -> Self {
        ForgeError::EngineExecution {
            engine: engine.into(),
            exit_code,
            detail: detail.into(),
        }
    }

    /// In-process (libav / image) failures are reported as engine failures.
    pub fn native(detail: impl std::fmt::Display) -> Self {
        ForgeError::EngineExecution {
            engine: "libav".to_string(),
            exit_code: None,
            detail: detail.to_string(),
        }
    }

    pub fn resource(operation: impl Into<String>, source: std::io::Error) -> Self {
        ForgeError::Resource {
            operation: operation.into(),
            source,
        }
    }
}

/// Attach an operation label to an `io::Result`.
pub trait IoContext<T> {
    fn io_context(self, operation: impl FnOnce() -> String) -> ForgeResult<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(self, operation: impl FnOnce() -> String) -> ForgeResult<T> {
        self.map_err(|e| ForgeError::resource(operation(), e))
    }
}

impl From<ffmpeg_next::Error> for ForgeError {
    fn from(e: ffmpeg_next::Error) -> Self {
        ForgeError::native(e)
    }
}

impl From<image::ImageError> for ForgeError {
    fn from(e: image::ImageError) -> Self {
        ForgeError::EngineExecution {
            engine: "image".to_string(),
            exit_code: None,
            detail: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_display_includes_tail() {
        let err = ForgeError::engine("ffmpeg", Some(1), "Invalid data found");
        let text = err.to_string();
        assert!(text.contains("ffmpeg"));
        assert!(text.contains("exit code 1"));
        assert!(text.contains("Invalid data found"));
    }

    #[test]
    fn io_context_wraps_as_resource() {
        let res: std::io::Result<()> = Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        let err = res.io_context(|| "creating workspace".to_string()).unwrap_err();
        assert!(matches!(err, ForgeError::Resource { .. }));
        assert!(err.to_string().contains("creating workspace"));
    }
}
