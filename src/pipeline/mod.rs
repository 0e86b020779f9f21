//! The processing pipeline: an ordered list of stages (rip, transcode,
//! copy) built from configuration, where each stage consumes the output of
//! its predecessor.

pub mod context;
pub mod factory;
pub mod stage;
pub mod stages;

pub use context::{RunOptions, StageContext};
pub use factory::{create_stages, StageKind};
pub use stage::{Stage, StageOutput};

/// Run all stages in order, threading each stage's output into the next.
///
/// The first failing stage aborts the run; later stages depend on files
/// the failed stage did not produce.
pub async fn run_pipeline(
    stages: &[Box<dyn Stage>],
    ctx: &StageContext,
) -> rf_core::Result<Option<StageOutput>> {
    let mut prev: Option<StageOutput> = None;

    for stage in stages {
        tracing::info!("[{}] stage starting", stage.name());
        let output = stage.run(ctx, prev.take()).await?;
        tracing::info!(
            "[{}] stage finished: {}",
            stage.name(),
            output.full_path.display()
        );
        prev = Some(output);
    }

    Ok(prev)
}
