//! Ripforge - optical-media ripping and transcoding automation
//!
//! This library crate exposes the stage pipeline for integration testing.
//! The building blocks live in the `rf-*` crates: protocol parsing and
//! track selection in `rf-disc`, process execution in `rf-exec`, the
//! transcoder queue in `rf-queue`, and configuration plus the error type
//! in `rf-core`.

pub mod pipeline;
