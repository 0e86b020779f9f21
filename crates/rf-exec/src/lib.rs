//! # rf-exec
//!
//! External process execution for ripforge.
//!
//! This crate provides:
//!
//! - **Line decoding** ([`LineReader`]) -- incremental byte-chunk to
//!   complete-line decoder that buffers partial fragments across reads.
//! - **Streaming execution** ([`run_streamed`]) -- spawn a process and
//!   deliver every stdout/stderr line to a handler while it runs.
//! - **One-shot execution** ([`ToolCommand`]) -- capture full output,
//!   treating MakeMKV's "completed with warnings" exit code 1 as success.
//! - **Tool discovery** ([`ToolRegistry`]) -- locate makemkvcon and
//!   HandBrakeCLI via config overrides or `PATH`.
//! - **Terminal status** ([`StatusLine`]) -- ephemeral, overwritable
//!   progress output for long-running tools.

pub mod command;
pub mod console;
pub mod line_reader;
pub mod runner;
pub mod tools;

pub use command::{ToolCommand, ToolOutput};
pub use console::StatusLine;
pub use line_reader::LineReader;
pub use runner::{run_streamed, StreamSource};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
