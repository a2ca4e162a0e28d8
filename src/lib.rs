pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use app::pipelines::{GridPipeline, ZipsPipeline};
pub use config::{cli::LocalStorage, grid_config::GridConfig, toml_config::TomlConfig};
pub use core::etl::EtlEngine;
pub use utils::error::{CoriolisError, Result};
