pub mod cli;
pub mod run_config;

#[cfg(feature = "cli")]
use clap::Parser;

pub use run_config::RunConfig;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "gcam-etl")]
#[command(about = "Reshapes GCAM batch query exports into long-format comparison tables")]
pub struct CliConfig {
    /// Path to the TOML run configuration
    #[arg(short, long, default_value = "run.toml")]
    pub config: String,

    /// Override the output directory from the configuration
    #[arg(long)]
    pub output_path: Option<String>,

    /// Generate the HTML report even when the configuration leaves it off
    #[arg(long)]
    pub report: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable system monitoring during the run
    #[arg(long)]
    pub monitor: bool,
}
