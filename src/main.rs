use clap::Parser;
use export_assistant::{
    Cli, Command, ExportAssistant, ExportError, OutputFormatter, OutputMode, RecordKind,
    UserFriendlyError,
};
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let command = cli.command();
    if let Command::GenerateConfig { path } = &command {
        return handle_generate_config(path);
    }

    let assistant = match ExportAssistant::from_cli(&cli) {
        Ok(assistant) => assistant,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    if let Err(e) = assistant.initialize().await {
        assistant.handle_error(&e);
        return exit_code_for(&e);
    }

    match execute(&assistant, command).await {
        Ok(code) => code,
        Err(e) => {
            assistant.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

async fn execute(assistant: &ExportAssistant, command: Command) -> export_assistant::Result<i32> {
    let formatter = assistant.output_formatter();

    match command {
        Command::Serve => {
            let handled = assistant.serve().await?;
            tracing::info!("Served {} request(s)", handled);
        }
        Command::Send { request } => {
            let response = assistant.send(&request).await?;
            formatter.print_response(&response);
            if !response.is_success() {
                return Ok(1);
            }
        }
        Command::ExportProfile { input } => {
            let report = assistant.export_file(RecordKind::Profile, &input).await?;
            formatter.print_export_report(&report);
        }
        Command::ExportSearch { input } => {
            let report = assistant
                .export_file(RecordKind::SearchResult, &input)
                .await?;
            formatter.print_export_report(&report);
        }
        Command::Status => {
            let status = assistant.status().await?;
            formatter.print_status(&status);
        }
        Command::SetMapping { input } => {
            let ack = assistant.update_mapping_file(&input).await?;
            formatter.success(&ack.message);
        }
        Command::Upgrade { revoke } => {
            let ack = assistant.set_pro(!revoke).await?;
            formatter.success(&ack.message);
        }
        Command::GenerateConfig { path } => return Ok(handle_generate_config(&path)),
    }

    Ok(0)
}

fn exit_code_for(error: &ExportError) -> i32 {
    match error {
        ExportError::Cancelled => 130, // Interrupted (SIGINT)
        ExportError::InvalidRequest { .. } | ExportError::UnknownRequestType { .. } => 2,
        ExportError::QuotaExceeded { .. } => 3,
        ExportError::ExtractionFailed { .. } => 4,
        ExportError::InvalidData { .. } => 5,
        ExportError::Storage { .. } => 6,
        _ => 1,
    }
}

fn handle_generate_config(config_path: &Path) -> i32 {
    match ExportAssistant::generate_sample_config(config_path) {
        Ok(()) => {
            println!(
                "Generated sample configuration file: {}",
                config_path.display()
            );
            println!("\nTo use this configuration:");
            println!("  export-assistant status --config {}", config_path.display());
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!(
                "Failed to generate configuration file: {}",
                e.user_message()
            );
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn print_startup_error(error: &ExportError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

/// Logs go to stderr; stdout carries responses and reports.
fn setup_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
