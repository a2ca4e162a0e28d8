pub mod cli;
pub mod grid_config;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "coriolis")]
#[command(about = "Builds the pleasant-weather grid from NOAA daily summaries and census zips")]
pub struct CliConfig {
    #[arg(long, global = true, default_value = "coriolis.toml", help = "Settings file; defaults apply when it is missing")]
    pub config: PathBuf,

    #[arg(long, global = true, help = "Source data directory (overrides paths.data_dir)")]
    pub data: Option<PathBuf>,

    #[arg(long, global = true, help = "Output work directory (overrides paths.work_dir)")]
    pub work: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Join the census tables into work/zips.json
    BuildZips,
    /// Build info.json, the profile stats and the zip prefix index
    BuildGrid,
    /// Fetch the station history and yearly archives (YEAR or FROM-TO)
    Download {
        #[arg(required = true)]
        years: Vec<String>,
    },
}
