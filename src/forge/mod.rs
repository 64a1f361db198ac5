// SYNOID Forge
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// The media transformation pipeline: requests in, one artifact (or a batch
// report) out. Strategies live in `ops`; everything they share hangs off
// `ForgeContext`.

pub mod dispatch;
pub mod frames;
pub mod io_shield;
pub mod ladder;
pub mod ops;
pub mod progress;
pub mod request;
pub mod worker;
pub mod workspace;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ForgeConfig;
use crate::engine::probe::{ClipInfo, MediaProbe};
use crate::engine::runner::{EngineRunner, ProcessLauncher, SystemLauncher};
use crate::engine::Toolbox;
use crate::error::{ForgeError, ForgeResult};
use crate::native::{LibavLibrary, MediaLibrary};
use ladder::FallbackLadder;

pub use dispatch::{BatchReport, Completed, Dispatcher};
pub use progress::Progress;
pub use request::{Destination, Operation, OperationKind, TransformRequest};
pub use worker::{ForgeWorker, JobHandle};

/// Everything one operation needs: configuration, engine resolution, the
/// process runner and the in-process library.
#[derive(Clone)]
pub struct ForgeContext {
    pub config: Arc<ForgeConfig>,
    pub toolbox: Toolbox,
    pub runner: EngineRunner,
    pub library: Arc<dyn MediaLibrary>,
}

impl ForgeContext {
    pub fn new(
        config: Arc<ForgeConfig>,
        launcher: Arc<dyn ProcessLauncher>,
        library: Arc<dyn MediaLibrary>,
    ) -> Self {
        let runner = EngineRunner::new(launcher, config.diagnostic_tail_chars);
        Self {
            toolbox: Toolbox::new(config.clone()),
            config,
            runner,
            library,
        }
    }

    /// Real processes and libav.
    pub fn system(config: ForgeConfig) -> Self {
        Self::new(Arc::new(config), Arc::new(SystemLauncher), Arc::new(LibavLibrary))
    }

    pub fn probe(&self) -> MediaProbe<'_> {
        MediaProbe::new(&self.toolbox, &self.runner)
    }

    /// Run blocking library work off the async executor.
    pub async fn native<T, F>(&self, job: F) -> ForgeResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn MediaLibrary) -> ForgeResult<T> + Send + 'static,
    {
        let library = self.library.clone();
        tokio::task::spawn_blocking(move || job(library.as_ref()))
            .await
            .map_err(|e| ForgeError::native(format!("library task aborted: {}", e)))?
    }

    /// ffprobe first, libav if the probe engine is missing or fails.
    pub async fn inspect(&self, path: &Path) -> ForgeResult<ClipInfo> {
        let probe = self.probe();
        let owned: PathBuf = path.to_path_buf();
        FallbackLadder::new("inspect")
            .rung("ffprobe", move || async move { probe.inspect(path).await })
            .rung("libav", move || async move {
                self.native(move |lib| lib.inspect(&owned)).await
            })
            .climb()
            .await
    }

    /// Native-progress duration for classical runs, if known.
    pub async fn duration_hint(&self, path: &Path) -> Option<f64> {
        self.probe().duration(path).await
    }
}
