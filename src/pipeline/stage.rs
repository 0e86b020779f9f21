use std::path::PathBuf;

use async_trait::async_trait;

use crate::pipeline::context::StageContext;

/// What a stage hands to its successor: the produced media file and the
/// per-title directory it lives under.
#[derive(Debug, Clone)]
pub struct StageOutput {
    /// User-supplied title name; stable across the whole pipeline.
    pub title: String,
    /// The media file this stage produced.
    pub full_path: PathBuf,
    /// Final file name (`{title}.mkv`).
    pub file_name: String,
    /// Per-title output directory subsequent stages write into.
    pub output_dir: PathBuf,
}

/// One step of the processing pipeline.
///
/// The first stage in a run receives `prev = None`; stages that transform
/// existing output (transcode, copy) error out when run first.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(
        &self,
        ctx: &StageContext,
        prev: Option<StageOutput>,
    ) -> rf_core::Result<StageOutput>;
}
