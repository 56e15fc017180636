use crate::error::{DropWatchError, UserFriendlyError};
use crate::watcher::SessionReport;
use console::{style, Emoji, Term};
use serde_json;
use std::path::PathBuf;
use std::time::Duration;

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
static EYES: Emoji = Emoji("👀 ", "> ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");

/// Console output for the watcher. Shared between plugin tasks, so every
/// method takes `&self` and writes whole lines.
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
        if self.quiet {
            return;
        }
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
        if self.should_show_message(0) {
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

    /// Console echo of an audit log entry: `[name] message`.
    pub fn plugin_line(&self, name: &str, message: &str) {
        if !self.should_show_message(0) {
            return;
        }

        match self.mode {
            OutputMode::Human if self.use_colors => {
                println!("{} {}", style(format!("[{}]", name)).magenta(), message);
            }
            OutputMode::Human | OutputMode::Plain => println!("[{}] {}", name, message),
            OutputMode::Json => self.print_json_object(&serde_json::json!({
                "type": "log",
                "source": name,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
        }
    }

    pub fn start_watching(&self, folders: &[PathBuf]) {
        if !self.should_show_message(0) {
            return;
        }

        let listing = folders
            .iter()
            .map(|f| f.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!(
                        "{}{} {}",
                        EYES,
                        style("Watching").bold(),
                        style(&listing).cyan()
                    );
                    println!("{}", style("Press Ctrl+C to stop.").dim());
                } else {
                    println!("> Watching {}", listing);
                    println!("Press Ctrl+C to stop.");
                }
            }
            OutputMode::Json => self.print_json_object(&serde_json::json!({
                "type": "watch_start",
                "folders": folders,
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
            OutputMode::Plain => println!("WATCHING: {}", listing),
        }
    }

    // User-friendly error handling
    pub fn print_user_friendly_error(&self, error: &DropWatchError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    eprintln!();
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    eprintln!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    /// Extension -> plugin table printed at startup and by `--check`.
    pub fn print_routing_table(&self, routes: &[(String, String)], folders: &[PathBuf]) {
        match self.mode {
            OutputMode::Json => {
                let routes: serde_json::Map<String, serde_json::Value> = routes
                    .iter()
                    .map(|(ext, plugin)| (ext.clone(), serde_json::Value::from(plugin.as_str())))
                    .collect();
                self.print_json_object(&serde_json::json!({
                    "type": "routing",
                    "folders": folders,
                    "routes": routes
                }));
            }
            OutputMode::Human | OutputMode::Plain => {
                if self.quiet {
                    return;
                }
                self.print_header("Routing");
                for folder in folders {
                    println!("  folder  {}", folder.display());
                }
                if routes.is_empty() {
                    println!("  (no plugins enabled)");
                }
                for (ext, plugin) in routes {
                    if self.use_colors {
                        println!("  .{:<8} {} {}", ext, style("->").dim(), style(plugin).cyan());
                    } else {
                        println!("  .{:<8} -> {}", ext, plugin);
                    }
                }
            }
        }
    }

    pub fn print_session_summary(&self, report: &SessionReport) {
        match self.mode {
            OutputMode::Json => {
                let json_output =
                    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
                println!("{}", json_output);
            }
            OutputMode::Human => {
                if self.quiet {
                    return;
                }
                self.print_human_summary(report);
            }
            OutputMode::Plain => {
                if self.quiet {
                    return;
                }
                let counts = &report.counts;
                println!("STOPPED: watch session");
                println!("Detected: {}", counts.detected);
                println!("Dispatched: {}", counts.dispatched);
                println!("Skipped: {}", counts.skipped);
                println!("Ignored: {}", counts.ignored);
                println!("Plugin errors: {}", counts.plugin_errors);
                println!("Duration: {:?}", report.duration());
            }
        }
    }

    // Specialized output methods
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
            OutputMode::Json => {} // No separator in JSON mode
        }
    }

    // Private helper methods
    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
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

    fn print_human_summary(&self, report: &SessionReport) {
        let counts = &report.counts;
        let figure = |value: usize| {
            if self.use_colors {
                style(value).cyan().bold().to_string()
            } else {
                value.to_string()
            }
        };

        println!();
        self.print_separator();
        if self.use_colors {
            println!("{} {}", style("Watcher stopped").green().bold(), CHECKMARK);
        } else {
            println!("✓ Watcher stopped");
        }
        println!();
        println!("  Files detected:   {}", figure(counts.detected));
        println!("  Dispatched:       {}", figure(counts.dispatched));
        println!("  Skipped:          {}", figure(counts.skipped));
        println!("  Ignored:          {}", figure(counts.ignored));
        if counts.plugin_errors > 0 {
            println!("  Plugin errors:    {}", counts.plugin_errors);
        }
        println!("  Uptime:           {}", format_duration(report.duration()));
        self.print_separator();
    }
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self::new(OutputMode::Human, 0, false)
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_mode_parsing() {
        assert_eq!(OutputMode::from_string("human"), OutputMode::Human);
        assert_eq!(OutputMode::from_string("json"), OutputMode::Json);
        assert_eq!(OutputMode::from_string("PLAIN"), OutputMode::Plain);
        assert_eq!(OutputMode::from_string("invalid"), OutputMode::Human);
    }

    #[test]
    fn test_formatter_creation() {
        let formatter = OutputFormatter::new(OutputMode::Plain, 1, false);
        assert_eq!(formatter.mode(), OutputMode::Plain);
        assert_eq!(formatter.verbose_level, 1);
        assert!(!formatter.use_colors);
        assert!(!formatter.quiet);
    }

    #[test]
    fn test_quiet_mode() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert_eq!(formatter.verbose_level, 0);
        assert!(formatter.quiet);
        assert!(!formatter.use_colors);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_millis(0)), "0ms");
    }

    #[test]
    fn test_should_show_message() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, false);
        assert!(formatter.should_show_message(0));
        assert!(formatter.should_show_message(1));
        assert!(formatter.should_show_message(2));
        assert!(!formatter.should_show_message(3));

        let quiet_formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert!(!quiet_formatter.should_show_message(0));
        assert!(!quiet_formatter.should_show_message(1));
        assert!(!quiet_formatter.should_show_message(2));
    }

    #[test]
    fn test_formatter_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OutputFormatter>();
    }
}
