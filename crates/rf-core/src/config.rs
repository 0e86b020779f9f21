//! Application configuration types.
//!
//! The top-level [`Config`] struct is (de)serialized from JSON and carries
//! tool paths, selection defaults, and the ordered stage list. Every section
//! defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub defaults: Defaults,
    #[serde(default)]
    pub stages: Vec<StageRef>,
}

/// Explicit paths for external tools. When a path is absent (or does not
/// exist), the tool is looked up in `PATH` instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub makemkv_path: Option<PathBuf>,
    pub handbrake_path: Option<PathBuf>,
}

/// User preferences driving title and track selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Root directory where ripped/encoded output is placed.
    pub output_dir: PathBuf,
    /// Audio languages in preference order (ISO 639-2 codes).
    pub audio_languages: Vec<String>,
    /// Subtitle languages in preference order.
    pub sub_languages: Vec<String>,
    /// Whether subtitle tracks are selected at all.
    pub include_subs: bool,
    /// Audio codec names in preference order (MakeMKV long codec names).
    pub audio_codec: Vec<String>,
    /// Audio track names in preference order.
    pub audio_name: Vec<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            audio_languages: vec!["eng".to_string()],
            sub_languages: vec!["eng".to_string()],
            include_subs: true,
            audio_codec: vec![
                "DTS-HD MA".to_string(),
                "DTS".to_string(),
                "DD".to_string(),
            ],
            audio_name: vec!["Surround 7.1".to_string(), "Surround 5.1".to_string()],
        }
    }
}

/// One entry in the ordered stage list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageRef {
    /// Stage name (`makemkv`, `handbrake`, `copy`).
    pub name: String,
    /// Disabled stages are skipped without error.
    pub enabled: bool,
    /// Stage-specific path: the tool executable for makemkv/handbrake, the
    /// destination directory for copy.
    pub path: Option<PathBuf>,
    /// Free-form stage options.
    pub options: StageOptions,
}

impl Default for StageRef {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: false,
            path: None,
            options: StageOptions::default(),
        }
    }
}

/// Optional per-stage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StageOptions {
    /// HandBrake preset JSON to import (`--preset-import-file`).
    pub preset: Option<PathBuf>,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// The default config written on first run: makemkv enabled, handbrake
    /// and copy present but disabled so the user can fill in paths.
    pub fn generated_default() -> Self {
        Self {
            tools: ToolsConfig::default(),
            defaults: Defaults::default(),
            stages: vec![
                StageRef {
                    name: "makemkv".to_string(),
                    enabled: true,
                    ..StageRef::default()
                },
                StageRef {
                    name: "handbrake".to_string(),
                    ..StageRef::default()
                },
                StageRef {
                    name: "copy".to_string(),
                    ..StageRef::default()
                },
            ],
        }
    }

    /// Write the generated default config to `path` as pretty JSON.
    pub fn write_default(path: &Path) -> Result<Self> {
        let config = Self::generated_default();
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| Error::Config(format!("config serialize error: {e}")))?;
        std::fs::write(path, json)?;
        tracing::info!("Generated default configuration at {}", path.display());
        Ok(config)
    }

    /// Load `path`, generating the default config first if the file is
    /// missing.
    pub fn load_or_generate(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Self::write_default(path)
        }
    }

    /// Enabled stages in configured order.
    pub fn enabled_stages(&self) -> impl Iterator<Item = &StageRef> {
        self.stages.iter().filter(|s| s.enabled)
    }
}
