use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::ui::OutputMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "export-assistant")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Map LinkedIn profile data to CSV exports with a monthly quota")]
#[command(
    long_about = "export-assistant receives profile and search-result records scraped from \
                  LinkedIn pages, maps them through a configurable field mapping, enforces \
                  the free monthly export quota and keeps a history of recent exports."
)]
#[command(after_help = "EXAMPLES:\n  \
    export-assistant serve < requests.ndjson\n  \
    export-assistant export-profile profile.json --output exports\n  \
    export-assistant export-search results.json --output-format json\n  \
    export-assistant send '{\"type\":\"GET_STATUS\"}'\n  \
    export-assistant status")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file path
    #[arg(short, long, global = true, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Persistent store file
    #[arg(long, global = true, env = "EXPORT_ASSISTANT_STORE")]
    pub store: Option<PathBuf>,

    /// Directory CSV files are written to
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Answer newline-delimited JSON requests on stdin (default)
    Serve,

    /// Deliver one raw request and print the response
    Send {
        /// Request JSON, or '-' to read it from stdin
        request: String,
    },

    /// Export one extracted profile to CSV
    ExportProfile {
        /// Extraction output file, or '-' for stdin
        input: PathBuf,
    },

    /// Export a batch of search results to CSV
    ExportSearch {
        /// Extraction output file, or '-' for stdin
        input: PathBuf,
    },

    /// Show quota usage, field mapping and recent exports
    Status,

    /// Replace the field mapping with the contents of a JSON file
    SetMapping {
        /// Mapping file, or '-' for stdin
        input: PathBuf,
    },

    /// Enable unlimited exports
    Upgrade {
        /// Return to the free plan instead
        #[arg(long)]
        revoke: bool,
    },

    /// Write a sample configuration file
    GenerateConfig {
        /// Destination file
        #[arg(default_value = "export-assistant.toml")]
        path: PathBuf,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl From<&OutputFormat> for OutputMode {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_store_path(self.store.clone())
            .with_output_dir(self.output.clone())
    }

    pub fn output_mode(&self) -> OutputMode {
        OutputMode::from(&self.output_format)
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}
