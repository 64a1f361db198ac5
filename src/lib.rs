// SYNOID Forge Library
// Copyright (c) 2026 Xing_The_Creator | SYNOID

pub mod config;
pub mod engine;
pub mod error;
pub mod forge;
pub mod native;
