// SYNOID Learned Engine Commands
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Real-ESRGAN (super-resolution), RIFE (frame interpolation) and the
// CodeFormer face-restoration script. Learned engines run from their own
// directory so they can find their model files.

use std::path::Path;

use super::runner::{Artifact, Invocation};
use super::EngineKind;
use crate::config::TilingTable;
use crate::forge::request::{extension_of, Tiling};

/// Tile size and thread hint (`load:proc:save`) for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileProfile {
    pub tile: u32,
    pub threads: String,
}

impl TileProfile {
    pub fn for_tiling(tiling: Tiling, table: &TilingTable) -> Self {
        match tiling {
            Tiling::Auto => Self {
                tile: table.default_tile,
                threads: table.default_threads.clone(),
            },
            Tiling::Tile(tile) => Self {
                tile,
                threads: if tile >= table.large_tile_threshold {
                    table.large_threads.clone()
                } else {
                    table.small_threads.clone()
                },
            },
        }
    }

    pub fn safe(table: &TilingTable) -> Self {
        Self {
            tile: table.safe_tile,
            threads: table.safe_threads.clone(),
        }
    }
}

/// Output format flag accepted by the super-resolution engine.
pub fn image_format_for(output: &Path) -> &'static str {
    match extension_of(output).as_str() {
        "png" => "png",
        "webp" => "webp",
        _ => "jpg",
    }
}

fn engine_dir(program: &Path) -> Option<&Path> {
    program.parent().filter(|p| !p.as_os_str().is_empty())
}

#[allow(clippy::too_many_arguments)]
pub fn super_resolution(
    program: &Path,
    input: &Path,
    output: &Path,
    model: &str,
    scale: u32,
    format: &str,
    profile: &TileProfile,
    artifact: Artifact,
) -> Invocation {
    let mut inv = Invocation::new(EngineKind::SuperResolution, program)
        .arg("-i")
        .arg(input)
        .arg("-o")
        .arg(output)
        .args(["-n", model])
        .arg("-s")
        .arg(scale.to_string())
        .args(["-f", format])
        .arg("-t")
        .arg(profile.tile.to_string())
        .args(["-j", profile.threads.as_str()])
        .produces(artifact);
    if let Some(dir) = engine_dir(program) {
        inv = inv.current_dir(dir);
    }
    inv
}

/// One doubling pass over a directory of frames.
pub fn interpolation_pass(program: &Path, input_dir: &Path, output_dir: &Path) -> Invocation {
    let mut inv = Invocation::new(EngineKind::Interpolation, program)
        .arg("-i")
        .arg(input_dir)
        .arg("-o")
        .arg(output_dir)
        .produces(Artifact::Directory(output_dir.to_path_buf()));
    if let Some(dir) = engine_dir(program) {
        inv = inv.current_dir(dir);
    }
    inv
}

/// Restores faces in place on a file or a directory of frames.
pub fn face_restore(program: &Path, target: &Path) -> Invocation {
    let artifact = if target.is_dir() {
        Artifact::Directory(target.to_path_buf())
    } else {
        Artifact::File(target.to_path_buf())
    };
    let mut inv = Invocation::new(EngineKind::FaceRestore, program)
        .arg(target)
        .produces(artifact);
    if let Some(dir) = engine_dir(program) {
        inv = inv.current_dir(dir);
    }
    inv
}
