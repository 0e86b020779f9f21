//! The rip stage: drives `makemkvcon` to scan a disc, pick the main
//! feature, and rip it into the per-title `tmp/` directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use rf_core::Error;
use rf_disc::{DriveRecord, RipProgress, ScanResult, Selection};
use rf_exec::{run_streamed, ToolCommand};

use crate::pipeline::context::StageContext;
use crate::pipeline::stage::{Stage, StageOutput};

pub struct MakeMkvStage {
    tool: PathBuf,
}

impl MakeMkvStage {
    pub fn new(tool: PathBuf) -> Self {
        Self { tool }
    }
}

/// List optical drives without touching any disc.
pub async fn scan_drives(tool: &Path) -> rf_core::Result<ScanResult> {
    let output = ToolCommand::new(tool.to_path_buf())
        .args(["-r", "--cache=1", "info", "--noscan"])
        .execute()
        .await?;
    Ok(ScanResult::parse(&output.stdout))
}

/// Drives that actually exist; makemkvcon pads its drive list with
/// placeholder entries of type 256.
pub fn present_drives(scan: &ScanResult) -> Vec<&DriveRecord> {
    scan.drives.iter().filter(|d| d.drive_type != 256).collect()
}

/// Read the full title/track catalog of the disc in `drive`.
pub async fn disc_info(tool: &Path, drive: u32) -> rf_core::Result<ScanResult> {
    let output = ToolCommand::new(tool.to_path_buf())
        .args([
            "-r".to_string(),
            "info".to_string(),
            format!("disc:{drive}"),
            "--directio=true".to_string(),
            "--noscan".to_string(),
        ])
        .execute()
        .await?;
    Ok(ScanResult::parse(&output.stdout))
}

/// Resolve the makemkvcon executable the same way the stage factory does:
/// an enabled stage's path override first, then the discovered registry.
pub fn resolve_tool(
    config: &rf_core::config::Config,
    tools: &rf_exec::ToolRegistry,
) -> rf_core::Result<PathBuf> {
    for stage in config.enabled_stages().filter(|s| s.name == "makemkv") {
        if let Some(path) = &stage.path {
            if path.exists() {
                return Ok(path.clone());
            }
        }
    }
    Ok(tools.require("makemkvcon")?.path.clone())
}

/// Rip one title into `dest`, rendering `PRGC`/`PRGV` progress to the
/// status line.
///
/// Exit code 1 means "completed with warnings" and is treated as success,
/// matching [`ToolCommand`]'s convention.
async fn rip_title(tool: &Path, drive: u32, title_id: u32, dest: &Path) -> rf_core::Result<()> {
    let args = vec![
        "--progress=-same".to_string(),
        "--noscan".to_string(),
        "-r".to_string(),
        "mkv".to_string(),
        format!("disc:{drive}"),
        title_id.to_string(),
        dest.to_string_lossy().into_owned(),
    ];

    let mut progress = RipProgress::new();
    let mut stderr_lines: Vec<String> = Vec::new();

    let status = run_streamed(tool, &args, |line, source, status_line| {
        if source.is_stderr() {
            stderr_lines.push(line.to_string());
            return;
        }
        if let Some(rendered) = progress.observe(line) {
            status_line.set(&rendered);
        }
    })
    .await?;

    match status.code() {
        Some(0) | Some(1) => Ok(()),
        code => Err(Error::tool("makemkvcon", code, stderr_lines.join("\n"))),
    }
}

#[async_trait]
impl Stage for MakeMkvStage {
    fn name(&self) -> &'static str {
        "makemkv"
    }

    async fn run(
        &self,
        ctx: &StageContext,
        _prev: Option<StageOutput>,
    ) -> rf_core::Result<StageOutput> {
        let defaults = &ctx.config.defaults;
        let title = &ctx.options.title;
        let drive = ctx.options.drive;

        let title_dir = defaults.output_dir.join(title);
        let tmp_dir = title_dir.join("tmp");
        std::fs::create_dir_all(&tmp_dir)?;

        tracing::info!("[makemkv] reading disc:{drive}");
        let scan = disc_info(&self.tool, drive).await?;
        let selection: Selection = rf_disc::select(&scan.catalog, defaults)?;
        tracing::info!(
            "[makemkv] selected title {} ({}), audio {:?}, subtitles {:?}",
            selection.title_id,
            selection.output_name,
            selection.audio_tracks,
            selection.subtitle_tracks
        );

        rip_title(&self.tool, drive, selection.title_id, &tmp_dir).await?;

        // makemkvcon names the file after the title slot; rename to the
        // user's title so downstream stages see a stable name.
        let produced = tmp_dir.join(&selection.output_name);
        let file_name = format!("{title}.mkv");
        let full_path = tmp_dir.join(&file_name);
        std::fs::rename(&produced, &full_path)?;

        Ok(StageOutput {
            title: title.clone(),
            full_path,
            file_name,
            output_dir: title_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_drives_are_filtered() {
        let text = concat!(
            "DRV:0,2,999,1,\"BD-RE ASUS BW-16D1HT\",\"MOVIE_DISC\",\"/dev/sr0\"\n",
            "DRV:1,256,999,0,\"\",\"\",\"\"\n",
            "DRV:2,256,999,0,\"\",\"\",\"\"\n",
        );
        let scan = ScanResult::parse(text);
        let drives = present_drives(&scan);
        assert_eq!(drives.len(), 1);
        assert_eq!(drives[0].disc_path, "/dev/sr0");
    }
}
