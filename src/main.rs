mod cli;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

use rf_core::config::Config;
use rf_exec::ToolRegistry;
use ripforge::pipeline::{self, stages::makemkv, RunOptions, StageContext};

fn config_path(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path.unwrap_or_else(|| PathBuf::from("./config.json"))
}

async fn run(path: &Path, drive: u32, title: String, output: Option<PathBuf>) -> Result<()> {
    let mut config = Config::load_or_generate(path)?;
    if let Some(output_dir) = output {
        config.defaults.output_dir = output_dir;
    }

    let tools = ToolRegistry::discover(&config.tools);
    let stages = pipeline::create_stages(&config, &tools)?;
    if stages.is_empty() {
        anyhow::bail!("no stages are enabled; edit {} first", path.display());
    }

    let ctx = StageContext::new(config, tools, RunOptions { drive, title });
    let output = pipeline::run_pipeline(&stages, &ctx).await?;
    if let Some(output) = output {
        tracing::info!("Pipeline complete: {}", output.full_path.display());
    }
    Ok(())
}

async fn scan(path: &Path) -> Result<()> {
    let config = Config::load_or_generate(path)?;
    let tools = ToolRegistry::discover(&config.tools);
    let tool = makemkv::resolve_tool(&config, &tools)?;

    let result = makemkv::scan_drives(&tool).await?;
    let drives = makemkv::present_drives(&result);
    if drives.is_empty() {
        println!("No optical drives found");
        return Ok(());
    }
    for drive in drives {
        let disc = if drive.disc_type.is_empty() {
            "no disc".to_string()
        } else {
            drive.disc_type.clone()
        };
        println!("{}: {} - {} ({})", drive.index, drive.disc_path, drive.name, disc);
    }
    Ok(())
}

async fn info(path: &Path, drive: u32) -> Result<()> {
    let config = Config::load_or_generate(path)?;
    let tools = ToolRegistry::discover(&config.tools);
    let tool = makemkv::resolve_tool(&config, &tools)?;

    let result = makemkv::disc_info(&tool, drive).await?;
    for title in result.catalog.iter() {
        println!(
            "title {:>2}  {}  {}  ({} audio, {} subtitle tracks)",
            title.id,
            title.size_text.as_deref().unwrap_or("?"),
            title.output_name,
            title.audio_tracks.len(),
            title.subtitle_tracks.len(),
        );
    }

    let selection = rf_disc::select(&result.catalog, &config.defaults)?;
    println!("{}", serde_json::to_string_pretty(&selection)?);
    Ok(())
}

fn check_tools(path: &Path) -> Result<()> {
    let config = Config::load_or_generate(path)?;
    let tools = ToolRegistry::discover(&config.tools);

    let mut all_found = true;
    for info in tools.check_all() {
        match info.path {
            Some(tool_path) => println!("{:<12} {}", info.name, tool_path.display()),
            None => {
                all_found = false;
                println!("{:<12} NOT FOUND", info.name);
            }
        }
    }
    if !all_found {
        println!("\nMissing tools are only needed by the stages that use them.");
    }
    Ok(())
}

fn init(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("config already exists at {}", path.display());
    }
    Config::write_default(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise derive a filter from --verbose.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "ripforge=trace,rf_core=trace,rf_exec=trace,rf_disc=trace,rf_queue=trace".to_string()
        } else {
            "ripforge=info,rf_core=info,rf_exec=info,rf_disc=info,rf_queue=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let path = config_path(cli.config);
    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Run {
            drive,
            title,
            output,
        } => rt.block_on(run(&path, drive, title, output)),
        Commands::Scan => rt.block_on(scan(&path)),
        Commands::Info { drive } => rt.block_on(info(&path, drive)),
        Commands::CheckTools => check_tools(&path),
        Commands::Init => init(&path),
    }
}
