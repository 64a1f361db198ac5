// SYNOID Forge Dispatcher
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Validates the shape of a request and hands it to the matching strategy.
// No retries happen here; every ladder lives inside its strategy.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use super::ops::{convert, edit, interpolate, resize, still, upscale::UpscaleEngine};
use super::progress::Progress;
use super::request::{Destination, Operation, OperationKind, TransformRequest};
use super::ForgeContext;
use crate::error::{ForgeError, ForgeResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub input: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Completed {
    /// Absolute path of the single artifact.
    Single(PathBuf),
    Batch(BatchReport),
}

#[derive(Clone)]
pub struct Dispatcher {
    ctx: ForgeContext,
}

impl Dispatcher {
    pub fn new(ctx: ForgeContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &ForgeContext {
        &self.ctx
    }

    pub async fn dispatch(&self, request: &TransformRequest, progress: &Progress) -> ForgeResult<Completed> {
        validate(request)?;
        let kind = request.kind();
        info!("[FORGE] {:?} on {} input(s)", kind, request.inputs.len());

        let output = match &request.destination {
            Destination::Directory { dir, extension } => {
                let Operation::Convert(params) = &request.operation else {
                    return Err(ForgeError::config(format!("{:?} cannot write to a directory", kind)));
                };
                let report =
                    convert::convert_batch(&self.ctx, &request.inputs, dir, extension, params, progress).await?;
                return Ok(Completed::Batch(report));
            }
            Destination::File(path) => path.as_path(),
        };

        let ctx = &self.ctx;
        let input = request.inputs[0].as_path();
        let artifact = match &request.operation {
            Operation::Convert(p) => convert::convert_one(ctx, input, output, p, progress).await?,
            Operation::Resize(p) => resize::resize(ctx, input, output, p, progress).await?,
            Operation::Upscale(p) => UpscaleEngine::upscale(ctx, input, output, p, progress).await?,
            Operation::Interpolate(p) => interpolate::interpolate(ctx, input, output, p, progress).await?,
            Operation::Trim { start, end } => edit::trim(ctx, input, output, *start, *end, progress).await?,
            Operation::DeleteSection { start, end } => {
                edit::delete_section(ctx, input, output, *start, *end, progress).await?
            }
            Operation::InsertClip { clip, at } => {
                edit::insert_clip(ctx, input, clip, *at, output, progress).await?
            }
            Operation::Concatenate => edit::concatenate(ctx, &request.inputs, output, progress).await?,
            Operation::ExtractFrame { at } => still::extract_frame(ctx, input, *at, output, progress).await?,
        };

        info!("[FORGE] {:?} produced {}", kind, artifact.display());
        Ok(Completed::Single(artifact))
    }
}

/// Request shape checks, done before any engine is touched.
pub fn validate(request: &TransformRequest) -> ForgeResult<()> {
    if request.inputs.is_empty() {
        return Err(ForgeError::config("no inputs given"));
    }
    if let Some(missing) = request.inputs.iter().find(|p| !p.exists()) {
        return Err(ForgeError::config(format!("input not found: {}", missing.display())));
    }
    if let Operation::InsertClip { clip, .. } = &request.operation {
        ensure_exists(clip)?;
    }

    let kind = request.kind();
    match (&request.destination, kind) {
        (Destination::Directory { extension, .. }, OperationKind::Convert) => {
            if extension.trim_start_matches('.').is_empty() {
                return Err(ForgeError::config("batch conversion needs a target extension"));
            }
        }
        (Destination::Directory { .. }, _) => {
            return Err(ForgeError::config(format!("{:?} cannot write to a directory", kind)));
        }
        (Destination::File(_), OperationKind::Concatenate) => {
            if request.inputs.len() < 2 {
                return Err(ForgeError::config("concatenation needs at least two clips"));
            }
        }
        (Destination::File(_), _) => {
            if request.inputs.len() != 1 {
                return Err(ForgeError::config(format!(
                    "{:?} takes exactly one input, got {}",
                    kind,
                    request.inputs.len()
                )));
            }
        }
    }
    Ok(())
}

fn ensure_exists(path: &Path) -> ForgeResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ForgeError::config(format!("input not found: {}", path.display())))
    }
}
