//! The transcode stage: re-scans the ripped file with `HandBrakeCLI
//! --scan --json`, picks audio/subtitle tracks with the same preference
//! scoring used for the rip, and encodes while holding the transcoder
//! queue.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use rf_core::config::Defaults;
use rf_core::Error;
use rf_disc::preference_score;
use rf_exec::{run_streamed, ToolCommand};
use rf_queue::{default_queue_path, QueueClient};

use crate::pipeline::context::StageContext;
use crate::pipeline::stage::{Stage, StageOutput};

pub struct HandbrakeStage {
    tool: PathBuf,
    preset: Option<PathBuf>,
}

impl HandbrakeStage {
    pub fn new(tool: PathBuf, preset: Option<PathBuf>) -> Self {
        Self { tool, preset }
    }
}

/// The subset of HandBrake's `--scan --json` title set we act on.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct TitleSet {
    #[serde(default)]
    title_list: Vec<HbTitle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HbTitle {
    #[serde(default)]
    audio_list: Vec<HbAudio>,
    #[serde(default)]
    subtitle_list: Vec<HbSubtitle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HbAudio {
    #[serde(default)]
    track_number: u32,
    language_code: Option<String>,
    codec_name: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HbSubtitle {
    #[serde(default)]
    track_number: u32,
    language_code: Option<String>,
}

/// HandBrake prints the title set after a marker line; everything before it
/// is log noise.
const TITLE_SET_MARKER: &str = "JSON Title Set: ";

pub(crate) fn parse_title_set(scan_output: &str) -> rf_core::Result<TitleSet> {
    let (_, json) = scan_output.split_once(TITLE_SET_MARKER).ok_or_else(|| {
        Error::stage("handbrake", "scan output did not contain a JSON title set")
    })?;
    serde_json::from_str(json.trim())
        .map_err(|e| Error::stage("handbrake", format!("title set parse error: {e}")))
}

fn lang_matches(code: Option<&str>, lang: &str) -> bool {
    code.is_some_and(|c| c.eq_ignore_ascii_case(lang))
}

fn best_audio(tracks: &[&HbAudio], prefs: &Defaults) -> Option<u32> {
    tracks
        .iter()
        .min_by_key(|t| {
            preference_score(
                t.codec_name.as_deref(),
                t.name.as_deref(),
                &prefs.audio_codec,
                &prefs.audio_name,
            )
        })
        .map(|t| t.track_number)
}

/// Choose the audio and subtitle track numbers to keep.
///
/// Mirrors the rip selection: best-scoring audio track per preferred
/// language with a whole-list fallback, first subtitle match per language.
pub(crate) fn select_tracks(title_set: &TitleSet, prefs: &Defaults) -> (Vec<u32>, Vec<u32>) {
    let mut audio = Vec::new();
    let mut subtitles = Vec::new();
    let mut satisfied: Vec<String> = Vec::new();

    for title in &title_set.title_list {
        for lang in &prefs.audio_languages {
            if satisfied.iter().any(|s| s.eq_ignore_ascii_case(lang)) {
                continue;
            }
            let matching: Vec<&HbAudio> = title
                .audio_list
                .iter()
                .filter(|t| lang_matches(t.language_code.as_deref(), lang))
                .collect();
            if let Some(number) = best_audio(&matching, prefs) {
                audio.push(number);
                satisfied.push(lang.clone());
            }
        }
        if audio.is_empty() {
            let all: Vec<&HbAudio> = title.audio_list.iter().collect();
            if let Some(number) = best_audio(&all, prefs) {
                audio.push(number);
            }
        }

        if prefs.include_subs {
            for lang in &prefs.sub_languages {
                if let Some(sub) = title
                    .subtitle_list
                    .iter()
                    .find(|t| lang_matches(t.language_code.as_deref(), lang))
                {
                    if !subtitles.contains(&sub.track_number) {
                        subtitles.push(sub.track_number);
                    }
                }
            }
        }
    }

    (audio, subtitles)
}

/// Extract a fractional progress value from a `--json` state line
/// (`"Progress": 0.1234,`).
fn parse_progress(line: &str) -> Option<f64> {
    let rest = line.trim_start().strip_prefix("\"Progress\":")?;
    rest.trim().trim_end_matches(',').parse().ok()
}

/// Preset files carry their own preset name; `-Z` needs it spelled out.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PresetFile {
    #[serde(default)]
    preset_list: Vec<PresetEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PresetEntry {
    preset_name: String,
}

pub(crate) fn preset_name(preset_json: &str) -> rf_core::Result<String> {
    let file: PresetFile = serde_json::from_str(preset_json)
        .map_err(|e| Error::stage("handbrake", format!("preset parse error: {e}")))?;
    file.preset_list
        .into_iter()
        .next()
        .map(|p| p.preset_name)
        .ok_or_else(|| Error::stage("handbrake", "preset file contains no presets"))
}

async fn scan_title_set(tool: &Path, input: &Path) -> rf_core::Result<TitleSet> {
    let output = ToolCommand::new(tool.to_path_buf())
        .args([
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "--scan".to_string(),
            "--json".to_string(),
        ])
        .execute()
        .await?;
    parse_title_set(&output.stdout)
}

impl HandbrakeStage {
    fn encode_args(
        &self,
        input: &Path,
        output: &Path,
        audio: &[u32],
        subtitles: &[u32],
    ) -> rf_core::Result<Vec<String>> {
        let join = |tracks: &[u32]| {
            tracks
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };

        let mut args = vec![
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-o".to_string(),
            output.to_string_lossy().into_owned(),
            "--json".to_string(),
        ];
        if !audio.is_empty() {
            args.push("-a".to_string());
            args.push(join(audio));
        }
        if !subtitles.is_empty() {
            args.push("-s".to_string());
            args.push(join(subtitles));
        }

        if let Some(preset) = &self.preset {
            let contents = std::fs::read_to_string(preset)?;
            let name = preset_name(&contents)?;
            args.push("--preset-import-file".to_string());
            args.push(preset.to_string_lossy().into_owned());
            args.push("-Z".to_string());
            args.push(name);
        }

        Ok(args)
    }

    async fn encode(&self, args: &[String]) -> rf_core::Result<()> {
        let mut stderr_lines: Vec<String> = Vec::new();

        let status = run_streamed(&self.tool, args, |line, source, status_line| {
            if source.is_stderr() {
                stderr_lines.push(line.to_string());
                return;
            }
            if let Some(fraction) = parse_progress(line) {
                status_line.set(&format!("[HandBrake] Progress: {:.2}%", fraction * 100.0));
            }
        })
        .await?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::tool(
                "HandBrakeCLI",
                status.code(),
                stderr_lines.join("\n"),
            ))
        }
    }
}

#[async_trait]
impl Stage for HandbrakeStage {
    fn name(&self) -> &'static str {
        "handbrake"
    }

    async fn run(
        &self,
        ctx: &StageContext,
        prev: Option<StageOutput>,
    ) -> rf_core::Result<StageOutput> {
        let prev = prev.ok_or_else(|| {
            Error::stage("handbrake", "requires the output of a previous stage")
        })?;

        let title_set = scan_title_set(&self.tool, &prev.full_path).await?;
        let (audio, subtitles) = select_tracks(&title_set, &ctx.config.defaults);
        tracing::info!("[handbrake] keeping audio {audio:?}, subtitles {subtitles:?}");

        let output = prev.output_dir.join(&prev.file_name);
        let args = self.encode_args(&prev.full_path, &output, &audio, &subtitles)?;

        // Only one encode may run at a time across all ripforge instances;
        // the file-backed queue serializes access.
        let queue = QueueClient::new(default_queue_path(&ctx.config.defaults.output_dir));
        queue.join().await?;
        queue.wait_turn().await?;
        let result = self.encode(&args).await;
        queue.leave().await?;
        result?;

        // The ripped intermediate is no longer needed.
        let tmp_dir = prev.output_dir.join("tmp");
        std::fs::remove_dir_all(&tmp_dir)?;
        tracing::info!("[handbrake] removed {}", tmp_dir.display());

        Ok(StageOutput {
            title: prev.title,
            full_path: output,
            file_name: prev.file_name,
            output_dir: prev.output_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCAN_OUTPUT: &str = r#"
[12:00:00] hb_init: starting libhb
Scanning title 1 of 1...
JSON Title Set: {
  "MainFeature": 0,
  "TitleList": [
    {
      "AudioList": [
        {"TrackNumber": 1, "LanguageCode": "eng", "CodecName": "DTS", "Name": "Surround 5.1"},
        {"TrackNumber": 2, "LanguageCode": "eng", "CodecName": "DTS-HD MA", "Name": "Surround 7.1"},
        {"TrackNumber": 3, "LanguageCode": "fra", "CodecName": "DD", "Name": ""}
      ],
      "SubtitleList": [
        {"TrackNumber": 1, "LanguageCode": "fra"},
        {"TrackNumber": 2, "LanguageCode": "eng"},
        {"TrackNumber": 3, "LanguageCode": "eng"}
      ]
    }
  ]
}"#;

    fn prefs() -> Defaults {
        Defaults::default()
    }

    #[test]
    fn title_set_is_extracted_from_noisy_output() {
        let title_set = parse_title_set(SCAN_OUTPUT).unwrap();
        assert_eq!(title_set.title_list.len(), 1);
        assert_eq!(title_set.title_list[0].audio_list.len(), 3);
    }

    #[test]
    fn missing_marker_is_stage_error() {
        let result = parse_title_set("no titles here");
        assert!(matches!(result, Err(Error::Stage { .. })));
    }

    #[test]
    fn best_codec_wins_per_language() {
        let title_set = parse_title_set(SCAN_OUTPUT).unwrap();
        let (audio, subtitles) = select_tracks(&title_set, &prefs());
        assert_eq!(audio, vec![2]);
        // First English subtitle in list order.
        assert_eq!(subtitles, vec![2]);
    }

    #[test]
    fn fallback_audio_when_no_language_matches() {
        let preferences = Defaults {
            audio_languages: vec!["jpn".to_string()],
            ..prefs()
        };
        let title_set = parse_title_set(SCAN_OUTPUT).unwrap();
        let (audio, _) = select_tracks(&title_set, &preferences);
        assert_eq!(audio, vec![2]);
    }

    #[test]
    fn include_subs_false_selects_none() {
        let preferences = Defaults {
            include_subs: false,
            ..prefs()
        };
        let title_set = parse_title_set(SCAN_OUTPUT).unwrap();
        let (_, subtitles) = select_tracks(&title_set, &preferences);
        assert!(subtitles.is_empty());
    }

    #[test]
    fn progress_lines_parse() {
        assert_eq!(parse_progress("    \"Progress\": 0.25,"), Some(0.25));
        assert_eq!(parse_progress("\"Progress\": 1.0"), Some(1.0));
        assert_eq!(parse_progress("\"State\": \"WORKING\","), None);
    }

    #[test]
    fn preset_name_comes_from_first_entry() {
        let json = r#"{"PresetList": [{"PresetName": "Fast 1080p30"}, {"PresetName": "Other"}]}"#;
        assert_eq!(preset_name(json).unwrap(), "Fast 1080p30");
    }

    #[test]
    fn empty_preset_list_is_stage_error() {
        let result = preset_name(r#"{"PresetList": []}"#);
        assert!(matches!(result, Err(Error::Stage { .. })));
    }
}
