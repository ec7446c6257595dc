pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod mapping;
pub mod service;
pub mod storage;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, Command, OutputFormat};
pub use config::{CliOverrides, Config};
pub use error::{ExportError, Result, UserFriendlyError};

// Core functionality re-exports
pub use export::{serialize, ExportReport, ExportWriter, HistoryEntry, HistoryKind, HistoryLog};
pub use mapping::{
    map_record, map_records, ExportData, ExtractionOutcome, FieldMapping, FieldSet, FieldSpec,
    MappedRecord, RawRecord, RecordKind,
};
pub use service::{Ack, ExportService, MessageBus, Request, Response, StatusReport};
pub use storage::{JsonFileStore, MemoryStore, Store};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode};

use mapping::MigrationOutcome;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio::task;

/// Main library interface: a file-backed [`ExportService`] plus the terminal
/// output and shutdown handling the CLI needs.
pub struct ExportAssistant {
    config: Config,
    output_formatter: OutputFormatter,
    service: ExportService<JsonFileStore>,
    shutdown: GracefulShutdown,
}

impl ExportAssistant {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let shutdown = GracefulShutdown::new()?;
        Ok(Self::with_shutdown(config, output_mode, verbose, quiet, shutdown))
    }

    /// Same as [`ExportAssistant::new`] without installing a Ctrl+C handler.
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self::with_shutdown(config, output_mode, verbose, quiet, GracefulShutdown::new_for_test())
    }

    fn with_shutdown(
        config: Config,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
        shutdown: GracefulShutdown,
    ) -> Self {
        let store = JsonFileStore::new(config.storage.path.clone());
        let service = ExportService::new(store).with_settings(config.service_settings());

        Self {
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
            config,
            service,
            shutdown,
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        Self::new(
            config,
            cli_args.output_mode(),
            cli_args.verbosity_level(),
            cli_args.quiet,
        )
    }

    /// Migrates the store. Every command runs this first.
    pub async fn initialize(&self) -> Result<MigrationOutcome> {
        let outcome = self.service.migrate().await?;
        match outcome {
            MigrationOutcome::Installed => self.output_formatter.debug(&format!(
                "Initialized store at {}",
                self.config.storage.path.display()
            )),
            MigrationOutcome::Upgraded { from } => self.output_formatter.info(&format!(
                "Upgraded store from schema version {}",
                from
            )),
            MigrationOutcome::Current => {}
        }
        Ok(outcome)
    }

    /// Reads extraction output from `input` ("-" for stdin), runs the export
    /// and writes the CSV file.
    pub async fn export_file(&self, kind: RecordKind, input: &Path) -> Result<ExportReport> {
        self.shutdown.check_shutdown()?;

        let raw = read_input(input).await?;
        let (ack, history_kind) = match kind {
            RecordKind::Profile => {
                let outcome = parse_input(&raw, input)?;
                (self.service.export_profile(outcome).await?, HistoryKind::Profile)
            }
            RecordKind::SearchResult => {
                let outcome = parse_input(&raw, input)?;
                (
                    self.service.export_search_results(outcome).await?,
                    HistoryKind::SearchResults,
                )
            }
        };
        self.shutdown.check_shutdown()?;

        let data = ack.data.ok_or_else(|| ExportError::InvalidData {
            message: "export acknowledged without records".to_string(),
        })?;
        let csv = serialize(&data)?;
        self.output_formatter
            .debug(&format!("Serialized {} record(s)", data.record_count()));

        let writer = ExportWriter::new(self.config.export.output_directory.clone())
            .with_prefix(&self.config.export.filename_prefix);
        let today = chrono::Utc::now().date_naive();
        let file = task::spawn_blocking(move || writer.write(history_kind, &csv, today))
            .await
            .map_err(|e| ExportError::Storage {
                message: format!("Export write task failed: {}", e),
            })??;

        let status = self.service.status().await?;
        Ok(ExportReport {
            kind: history_kind,
            message: ack.message,
            records: data.record_count(),
            file,
            remaining_exports: status.remaining_exports(),
            exported_at: chrono::Utc::now(),
        })
    }

    pub async fn status(&self) -> Result<StatusReport> {
        self.service.status().await
    }

    pub async fn update_mapping_file(&self, input: &Path) -> Result<Ack> {
        let raw = read_input(input).await?;
        let mapping: FieldMapping = parse_input(&raw, input)?;
        self.service.update_field_mapping(mapping).await
    }

    pub async fn set_pro(&self, is_pro_user: bool) -> Result<Ack> {
        self.service.set_pro_status(is_pro_user).await
    }

    /// Delivers one raw request; "-" reads it from stdin.
    pub async fn send(&self, request: &str) -> Result<Response> {
        let raw = if request == "-" {
            read_input(Path::new("-")).await?
        } else {
            request.to_string()
        };
        Ok(self.service.handle_json(raw.trim()).await)
    }

    /// Serves the stdin message bus until EOF or Ctrl+C.
    pub async fn serve(&self) -> Result<usize> {
        MessageBus::new(&self.service, &self.shutdown)
            .run_stdio()
            .await
    }

    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn store_path(&self) -> PathBuf {
        self.service.store().path().to_path_buf()
    }

    pub fn handle_error(&self, error: &ExportError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

async fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut raw = String::new();
        tokio::io::stdin().read_to_string(&mut raw).await?;
        Ok(raw)
    } else {
        tokio::fs::read_to_string(input).await.map_err(|e| {
            ExportError::InvalidRequest {
                message: format!("cannot read {}: {}", input.display(), e),
            }
        })
    }
}

fn parse_input<T: serde::de::DeserializeOwned>(raw: &str, input: &Path) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| ExportError::InvalidRequest {
        message: format!("{} does not hold valid input: {}", input.display(), e),
    })
}

pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        target: std::env::consts::ARCH.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_date: &'static str,
    pub target: String,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "export-assistant {} ({}) built on {} for {}",
            self.version, self.git_hash, self.build_date, self.target
        )
    }
}
