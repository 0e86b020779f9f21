//! The copy stage: moves the finished per-title directory onto its final
//! storage (typically a NAS mount), copying in chunks so progress can be
//! rendered.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use rf_core::Error;
use rf_exec::StatusLine;

use crate::pipeline::context::StageContext;
use crate::pipeline::stage::{Stage, StageOutput};

const CHUNK_SIZE: usize = 64 * 1024;

pub struct CopyStage {
    dest: PathBuf,
}

impl CopyStage {
    pub fn new(dest: PathBuf) -> Self {
        Self { dest }
    }
}

/// Total byte size of all files under `path`, recursively.
fn dir_size(path: &Path) -> std::io::Result<u64> {
    let mut total = 0;
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            total += dir_size(&entry.path())?;
        } else {
            total += metadata.len();
        }
    }
    Ok(total)
}

/// Copy one file in chunks, reporting each chunk's size to `on_chunk`.
fn copy_file(src: &Path, dest: &Path, on_chunk: &mut impl FnMut(u64)) -> std::io::Result<()> {
    let mut reader = std::fs::File::open(src)?;
    let mut writer = std::fs::File::create(dest)?;
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        on_chunk(n as u64);
    }
    writer.flush()
}

fn copy_tree(src: &Path, dest: &Path, on_chunk: &mut impl FnMut(u64)) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.metadata()?.is_dir() {
            copy_tree(&entry.path(), &target, on_chunk)?;
        } else {
            copy_file(&entry.path(), &target, on_chunk)?;
        }
    }
    Ok(())
}

/// Copy `src` into `dest` with a percentage status line.
pub fn copy_dir_with_progress(src: &Path, dest: &Path) -> rf_core::Result<()> {
    if !src.is_dir() {
        return Err(Error::stage(
            "copy",
            format!("source is not a directory: {}", src.display()),
        ));
    }

    let total = dir_size(src)?;
    if total == 0 {
        tracing::info!("[copy] source directory is empty; nothing to copy");
        return Ok(());
    }

    let status = StatusLine::new();
    let mut copied = 0u64;
    copy_tree(src, dest, &mut |chunk| {
        copied += chunk;
        let pct = copied as f64 / total as f64 * 100.0;
        status.set(&format!("[Copy] Progress: {pct:.2}%"));
    })?;
    status.clear();
    Ok(())
}

#[async_trait]
impl Stage for CopyStage {
    fn name(&self) -> &'static str {
        "copy"
    }

    async fn run(
        &self,
        _ctx: &StageContext,
        prev: Option<StageOutput>,
    ) -> rf_core::Result<StageOutput> {
        let prev = prev
            .ok_or_else(|| Error::stage("copy", "requires the output of a previous stage"))?;

        let dest_dir = self.dest.join(&prev.title);
        tracing::info!(
            "[copy] {} -> {}",
            prev.output_dir.display(),
            dest_dir.display()
        );

        // The chunked copy is synchronous I/O; keep it off the async runtime.
        let src = prev.output_dir.clone();
        let dest = dest_dir.clone();
        tokio::task::spawn_blocking(move || copy_dir_with_progress(&src, &dest))
            .await
            .map_err(|e| Error::stage("copy", format!("copy task panicked: {e}")))??;

        Ok(StageOutput {
            full_path: dest_dir.join(&prev.file_name),
            output_dir: dest_dir,
            title: prev.title,
            file_name: prev.file_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, contents: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn dir_size_is_recursive() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("a.bin"), &[0u8; 100]);
        write(&dir.path().join("nested/b.bin"), &[0u8; 50]);
        assert_eq!(dir_size(dir.path()).unwrap(), 150);
    }

    #[test]
    fn tree_is_copied_with_contents() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        write(&src.path().join("movie.mkv"), b"fake video");
        write(&src.path().join("extras/trailer.mkv"), b"fake trailer");

        let target = dest.path().join("My Movie");
        copy_dir_with_progress(src.path(), &target).unwrap();

        assert_eq!(
            std::fs::read(target.join("movie.mkv")).unwrap(),
            b"fake video"
        );
        assert_eq!(
            std::fs::read(target.join("extras/trailer.mkv")).unwrap(),
            b"fake trailer"
        );
    }

    #[test]
    fn copying_a_file_source_is_stage_error() {
        let src = tempfile::tempdir().unwrap();
        let file = src.path().join("not_a_dir");
        std::fs::write(&file, b"x").unwrap();
        let result = copy_dir_with_progress(&file, &src.path().join("out"));
        assert!(matches!(result, Err(Error::Stage { .. })));
    }

    #[test]
    fn empty_source_copies_nothing() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let target = dest.path().join("empty");
        copy_dir_with_progress(src.path(), &target).unwrap();
        assert!(!target.exists());
    }
}
