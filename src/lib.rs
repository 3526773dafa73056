pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig};

pub use config::run_config::RunConfig;
pub use core::{etl::EtlEngine, pipeline::QueryPipeline};
pub use utils::error::{EtlError, Result};
