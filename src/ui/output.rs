use crate::error::{ExportError, UserFriendlyError};
use crate::export::{ExportReport, HistoryEntry};
use crate::mapping::FieldSet;
use crate::service::{Response, StatusReport};
use console::{style, Emoji, Term};
use serde_json;

/// History entries shown by `status`.
pub const RECENT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

impl OutputMode {
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputMode::Json,
            "plain" => OutputMode::Plain,
            _ => OutputMode::Human,
        }
    }
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    // Core messaging methods
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show_message(2) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("  {}", style(message).dim());
                    } else {
                        println!("  DEBUG: {}", message);
                    }
                }
                OutputMode::Json => self.print_json_message("debug", message),
                OutputMode::Plain => println!("DEBUG: {}", message),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &ExportError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    println!();
                    if self.use_colors {
                        println!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        println!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    println!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    /// Prints a protocol response. JSON mode emits it exactly as it would
    /// travel over the message bus.
    pub fn print_response(&self, response: &Response) {
        if self.mode == OutputMode::Json {
            self.print_json_object(
                &serde_json::to_value(response).unwrap_or(serde_json::Value::Null),
            );
            return;
        }

        match response {
            Response::Status(report) => self.print_status(report),
            Response::Ack(ack) if ack.success => {
                self.success(&ack.message);
                if let Some(data) = &ack.data {
                    self.info(&format!("{} record(s) mapped", data.record_count()));
                }
            }
            Response::Ack(ack) => self.error(&ack.message),
        }
    }

    pub fn print_status(&self, report: &StatusReport) {
        match self.mode {
            OutputMode::Json => {
                self.print_json_object(
                    &serde_json::to_value(report).unwrap_or(serde_json::Value::Null),
                );
            }
            OutputMode::Human => self.print_human_status(report),
            OutputMode::Plain => self.print_plain_status(report),
        }
    }

    pub fn print_export_report(&self, report: &ExportReport) {
        match self.mode {
            OutputMode::Json => {
                let json_output =
                    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
                println!("{}", json_output);
            }
            OutputMode::Human => {
                self.success(&report.message);
                if self.quiet {
                    return;
                }
                println!("  Records:   {}", self.highlight(&report.records.to_string()));
                println!(
                    "  File:      {}",
                    self.highlight(&report.file.display().to_string())
                );
                println!("  Remaining: {}", self.highlight(&remaining_label(report.remaining_exports)));
            }
            OutputMode::Plain => {
                println!("SUCCESS: {}", report.message);
                println!("Records: {}", report.records);
                println!("File: {}", report.file.display());
                println!("Remaining: {}", remaining_label(report.remaining_exports));
            }
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{} {}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => {
                println!("=== {} ===", title);
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {}
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn highlight(&self, text: &str) -> String {
        if self.use_colors {
            style(text).cyan().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, color_fn(message)),
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn print_human_status(&self, report: &StatusReport) {
        self.print_header("Export Status");

        let plan = if report.is_pro_user { "PRO" } else { "Free" };
        println!("  Plan:      {}", self.highlight(plan));
        println!("  Exports:   {}", self.highlight(&usage_label(report)));
        println!(
            "  Remaining: {}",
            self.highlight(&remaining_label(report.remaining_exports()))
        );
        println!();

        println!("Profile fields:");
        self.print_field_set(&report.field_mapping.profile);
        println!("Search result fields:");
        self.print_field_set(&report.field_mapping.search_result);

        self.print_separator();
        if report.export_history.is_empty() {
            println!("No exports yet.");
        } else {
            println!("Recent exports:");
            for entry in report.export_history.iter().take(RECENT_HISTORY_LIMIT) {
                println!("  {}", history_line(entry));
            }
        }
    }

    fn print_plain_status(&self, report: &StatusReport) {
        println!("Plan: {}", if report.is_pro_user { "PRO" } else { "Free" });
        println!("Exports: {}", usage_label(report));
        println!("Remaining: {}", remaining_label(report.remaining_exports()));
        for entry in report.export_history.iter().take(RECENT_HISTORY_LIMIT) {
            println!("History: {}", history_line(entry));
        }
    }

    fn print_field_set(&self, fields: &FieldSet) {
        let enabled = fields.enabled_labels();
        if enabled.is_empty() {
            println!("  (none enabled)");
        } else {
            println!("  {}", enabled.join(", "));
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn usage_label(report: &StatusReport) -> String {
    if report.export_limit < 0 {
        format!("{} this month", report.export_count)
    } else {
        format!("{}/{} this month", report.export_count, report.export_limit)
    }
}

fn remaining_label(remaining: Option<u32>) -> String {
    match remaining {
        Some(n) => n.to_string(),
        None => "unlimited".to_string(),
    }
}

fn history_line(entry: &HistoryEntry) -> String {
    format!(
        "{}: {} record(s) ({})",
        entry.kind.display_name(),
        entry.record_count(),
        entry.exported_at
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{FieldMapping, MappedRecord};
    use chrono::{TimeZone, Utc};

    fn report(count: u32, limit: i64) -> StatusReport {
        StatusReport {
            export_count: count,
            export_limit: limit,
            is_pro_user: limit < 0,
            export_history: Vec::new(),
            field_mapping: FieldMapping::default(),
        }
    }

    #[test]
    fn test_output_mode_parsing() {
        assert_eq!(OutputMode::from_string("human"), OutputMode::Human);
        assert_eq!(OutputMode::from_string("json"), OutputMode::Json);
        assert_eq!(OutputMode::from_string("plain"), OutputMode::Plain);
        assert_eq!(OutputMode::from_string("invalid"), OutputMode::Human);
    }

    #[test]
    fn test_quiet_mode() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert_eq!(formatter.verbose_level, 0);
        assert!(formatter.quiet);
    }

    #[test]
    fn test_should_show_message() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, false);
        assert!(formatter.should_show_message(0));
        assert!(formatter.should_show_message(2));
        assert!(!formatter.should_show_message(3));

        let quiet_formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert!(!quiet_formatter.should_show_message(0));
    }

    #[test]
    fn test_usage_and_remaining_labels() {
        assert_eq!(usage_label(&report(5, 20)), "5/20 this month");
        assert_eq!(remaining_label(report(5, 20).remaining_exports()), "15");
        assert_eq!(remaining_label(report(25, 20).remaining_exports()), "0");

        assert_eq!(usage_label(&report(25, -1)), "25 this month");
        assert_eq!(remaining_label(report(25, -1).remaining_exports()), "unlimited");
    }

    #[test]
    fn test_history_line() {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
        let entry = HistoryEntry::search_results(
            vec![MappedRecord::new().with("Name", "A"), MappedRecord::new().with("Name", "B")],
            at,
        );
        assert_eq!(
            history_line(&entry),
            "Search Results: 2 record(s) (2026-02-01T08:00:00.000Z)"
        );
    }
}
