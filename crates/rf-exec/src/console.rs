//! Ephemeral single-line terminal status output.

use std::io::Write;

/// Writes an overwritable status string to the controlling terminal.
///
/// Each [`StatusLine::set`] erases the current line and rewrites it without
/// emitting a newline, so successive progress updates replace each other.
/// Call [`StatusLine::clear`] (or print a regular newline-terminated message)
/// before normal output resumes.
#[derive(Debug, Default)]
pub struct StatusLine;

impl StatusLine {
    /// Create a status line writer.
    pub fn new() -> Self {
        Self
    }

    /// Replace the current terminal line with `message`.
    pub fn set(&self, message: &str) {
        let mut stdout = std::io::stdout().lock();
        // Erase-line escape, message, carriage return; no newline.
        let _ = write!(stdout, "\x1b[2K{message}\r");
        let _ = stdout.flush();
    }

    /// Erase the current terminal line.
    pub fn clear(&self) {
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "\x1b[2K\r");
        let _ = stdout.flush();
    }
}
