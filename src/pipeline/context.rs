use std::sync::Arc;

use rf_core::config::Config;
use rf_exec::ToolRegistry;

/// Per-invocation parameters from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// MakeMKV drive index (`disc:N`).
    pub drive: u32,
    /// Title name used for the output directory and final file name.
    pub title: String,
}

/// Shared state every stage sees: resolved configuration, discovered tools,
/// and the parameters of this run.
#[derive(Clone)]
pub struct StageContext {
    pub config: Arc<Config>,
    pub tools: Arc<ToolRegistry>,
    pub options: RunOptions,
}

impl StageContext {
    pub fn new(config: Config, tools: ToolRegistry, options: RunOptions) -> Self {
        Self {
            config: Arc::new(config),
            tools: Arc::new(tools),
            options,
        }
    }
}
