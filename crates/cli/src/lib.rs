pub mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use vlog_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "vlog",
    about = "Volunteer activity log",
    long_about = "Log volunteering activities through a short conversation, inspect extraction, and operate the activity store.",
    after_help = "Examples:\n  vlog chat\n  vlog extract \"I'm Sarah and I taught 12 kids at Hope Center yesterday\" --json\n  vlog recent --limit 5\n  vlog doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive conversation that fills and saves one activity at a time")]
    Chat,
    #[command(about = "Extract activity fields from a single message without saving anything")]
    Extract {
        #[arg(help = "Message to extract from")]
        text: String,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "List the most recently logged activities")]
    Recent {
        #[arg(long, default_value_t = 10, help = "Maximum number of rows to show")]
        limit: u32,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, classifier readiness, and database schema")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Chat => commands::chat::run(),
        Command::Extract { text, json } => commands::extract::run(&text, json),
        Command::Recent { limit, json } => commands::recent::run(limit, json),
        Command::Migrate => commands::migrate::run(),
        Command::Config => commands::CommandResult::text(commands::config::run()),
        Command::Doctor { json } => commands::CommandResult::text(commands::doctor::run(json)),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so command output on stdout stays parseable.
pub fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder =
        tracing_subscriber::fmt().with_target(false).with_max_level(log_level).with_writer(std::io::stderr);

    let initialized = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(error) = initialized {
        eprintln!("logging already initialized: {error}");
    }
}
