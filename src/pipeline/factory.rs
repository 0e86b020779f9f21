//! Builds the concrete stage list from configuration.
//!
//! Stage names form a closed set; an unknown name in the config is a hard
//! error rather than a silent skip, so typos surface before any disc is
//! touched. Tool paths are resolved eagerly for the same reason.

use std::path::PathBuf;
use std::str::FromStr;

use rf_core::config::{Config, StageRef};
use rf_core::Error;
use rf_exec::ToolRegistry;

use crate::pipeline::stage::Stage;
use crate::pipeline::stages::{CopyStage, HandbrakeStage, MakeMkvStage};

/// The stages ripforge knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    MakeMkv,
    Handbrake,
    Copy,
}

impl FromStr for StageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "makemkv" => Ok(Self::MakeMkv),
            "handbrake" => Ok(Self::Handbrake),
            "copy" => Ok(Self::Copy),
            other => Err(Error::Config(format!(
                "unknown stage '{other}' (expected makemkv, handbrake, or copy)"
            ))),
        }
    }
}

/// Resolve the executable for a tool-backed stage: an existing per-stage
/// path override wins, otherwise the discovered registry entry is used. A
/// configured override that does not exist is an error, not a fallback.
fn resolve_stage_tool(
    stage: &StageRef,
    tools: &ToolRegistry,
    tool_name: &str,
) -> rf_core::Result<PathBuf> {
    match &stage.path {
        Some(path) if path.exists() => Ok(path.clone()),
        Some(path) => Err(Error::Config(format!(
            "configured path for stage '{}' does not exist: {}",
            stage.name,
            path.display()
        ))),
        None => Ok(tools.require(tool_name)?.path.clone()),
    }
}

/// Instantiate all enabled stages in configured order.
///
/// # Errors
///
/// Returns [`Error::Config`] for unknown stage names, missing required
/// tools, or a copy stage without a destination.
pub fn create_stages(
    config: &Config,
    tools: &ToolRegistry,
) -> rf_core::Result<Vec<Box<dyn Stage>>> {
    let mut stages: Vec<Box<dyn Stage>> = Vec::new();

    for stage_ref in config.enabled_stages() {
        match StageKind::from_str(&stage_ref.name)? {
            StageKind::MakeMkv => {
                let tool = resolve_stage_tool(stage_ref, tools, "makemkvcon")?;
                stages.push(Box::new(MakeMkvStage::new(tool)));
            }
            StageKind::Handbrake => {
                let tool = resolve_stage_tool(stage_ref, tools, "HandBrakeCLI")?;
                stages.push(Box::new(HandbrakeStage::new(
                    tool,
                    stage_ref.options.preset.clone(),
                )));
            }
            StageKind::Copy => {
                let dest = stage_ref.path.clone().ok_or_else(|| {
                    Error::Config("copy stage requires a destination path".to_string())
                })?;
                if !dest.exists() {
                    return Err(Error::Config(format!(
                        "copy destination does not exist: {}",
                        dest.display()
                    )));
                }
                stages.push(Box::new(CopyStage::new(dest)));
            }
        }
    }

    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_parse() {
        assert_eq!("makemkv".parse::<StageKind>().unwrap(), StageKind::MakeMkv);
        assert_eq!(
            "handbrake".parse::<StageKind>().unwrap(),
            StageKind::Handbrake
        );
        assert_eq!("copy".parse::<StageKind>().unwrap(), StageKind::Copy);
    }

    #[test]
    fn unknown_stage_name_is_config_error() {
        let result = "opensubtitles".parse::<StageKind>();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn stage_path_override_must_exist() {
        let stage = StageRef {
            name: "makemkv".to_string(),
            enabled: true,
            path: Some(PathBuf::from("/nonexistent/makemkvcon")),
            ..StageRef::default()
        };
        let tools = ToolRegistry::discover(&rf_core::config::ToolsConfig::default());
        let result = resolve_stage_tool(&stage, &tools, "makemkvcon");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn copy_stage_requires_a_destination() {
        let config = rf_core::config::Config::from_json(
            r#"{"stages": [{"name": "copy", "enabled": true}]}"#,
        )
        .unwrap();
        let tools = ToolRegistry::discover(&config.tools);
        let result = create_stages(&config, &tools);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn disabled_stages_are_skipped() {
        let config = rf_core::config::Config::from_json(
            r#"{"stages": [{"name": "copy", "enabled": false}]}"#,
        )
        .unwrap();
        let tools = ToolRegistry::discover(&config.tools);
        let stages = create_stages(&config, &tools).unwrap();
        assert!(stages.is_empty());
    }
}
