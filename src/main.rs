use clap::Parser;
use dropwatch::{Cli, DropWatch, DropWatchError, OutputFormatter, UserFriendlyError};
use std::process;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Handle special commands first
    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    if cli.check {
        return handle_check(&cli);
    }

    let dropwatch = match DropWatch::from_cli(&cli) {
        Ok(dropwatch) => dropwatch,
        Err(e) => {
            print_startup_error(&cli, &e);
            return exit_code_for(&e);
        }
    };

    match dropwatch.run().await {
        Ok(report) => {
            if report.counts.plugin_errors > 0 {
                dropwatch.output_formatter().warning(&format!(
                    "{} plugin invocation(s) ended with an error; see the dispatcher log",
                    report.counts.plugin_errors
                ));
            }
            0
        }
        Err(e) => {
            dropwatch.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

/// Map error types to process exit codes.
fn exit_code_for(error: &DropWatchError) -> i32 {
    match error {
        DropWatchError::Cancelled => 130, // Interrupted (SIGINT)
        DropWatchError::Configuration { .. } => 2,
        DropWatchError::DuplicateExtension { .. } => 3,
        DropWatchError::Watch { .. } => 4,
        _ => 1, // General error
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "dropwatch.toml".to_string());

    match DropWatch::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  dropwatch --config {} --check", config_path);
            println!("  dropwatch --config {}", config_path);
            println!("\nEdit the file to enable plugins and choose folders to watch.");
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

fn handle_check(cli: &Cli) -> i32 {
    let formatter = OutputFormatter::new(cli.output_mode(), cli.verbosity_level(), cli.quiet);

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            formatter.print_user_friendly_error(&e);
            return exit_code_for(&e);
        }
    };

    // One-shot command: no Ctrl+C handler needed.
    let dropwatch = DropWatch::without_signal_handler(
        config,
        cli.output_mode(),
        cli.verbosity_level(),
        cli.quiet,
    );
    match dropwatch.check() {
        Ok(_) => 0,
        Err(e) => {
            dropwatch.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn print_startup_error(cli: &Cli, error: &DropWatchError) {
    // Create a basic formatter for startup errors
    let formatter = OutputFormatter::new(cli.output_mode(), 0, false);
    formatter.print_user_friendly_error(error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_generate_config_command() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let cli = Cli::parse_from([
            "dropwatch",
            "--generate-config",
            "--config",
            config_path.to_str().unwrap(),
        ]);

        assert_eq!(handle_generate_config(&cli), 0);
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[plugins.example]"));
    }

    #[test]
    fn test_check_command_exit_codes() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("dropwatch.toml");

        fs::write(
            &config_path,
            "[watch]\nfolders = [\"./inbox\"]\n\n[plugins.example]\nextensions = [\"txt\"]\n",
        )
        .unwrap();
        let cli = Cli::parse_from(["dropwatch", "-q", "--check", "--config", config_path.to_str().unwrap()]);
        assert_eq!(handle_check(&cli), 0);

        fs::write(&config_path, "[watch]\nfolders = []\n").unwrap();
        assert_eq!(handle_check(&cli), 2);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&DropWatchError::Cancelled), 130);
        assert_eq!(
            exit_code_for(&DropWatchError::configuration("bad")),
            2
        );
        assert_eq!(
            exit_code_for(&DropWatchError::DuplicateExtension {
                extension: "txt".into(),
                existing: "a".into(),
                plugin: "b".into(),
            }),
            3
        );
        assert_eq!(exit_code_for(&DropWatchError::plugin("p", "m")), 1);
    }
}
