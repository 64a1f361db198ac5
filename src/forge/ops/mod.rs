// SYNOID Forge Operations
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// One module per operation family. Each strategy renders into a staged
// output and commits it only after its ladder succeeds.

pub mod convert;
pub mod edit;
pub mod interpolate;
pub mod resize;
pub mod still;
pub mod upscale;
