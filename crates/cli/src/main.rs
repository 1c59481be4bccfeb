//! DayCoach CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — Ask the tutor, once or interactively
//! - `filter`  — Run the content filter over a message
//! - `parse`   — Split model output into text and code blocks
//! - `config`  — Show, validate, or locate the configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "daycoach",
    about = "DayCoach — tutoring assistant for a 90-day programming course",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the tutor
    Chat(commands::chat::ChatArgs),

    /// Check a message against the content filter
    Filter {
        /// Message text
        text: String,

        /// Locale of the blocklist and messages (ru, en)
        #[arg(short, long, default_value = "ru")]
        locale: String,

        /// Override the maximum message length
        #[arg(long)]
        max_length: Option<usize>,
    },

    /// Parse model output from a file (`-` for stdin)
    Parse {
        path: String,

        /// Print the structured response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the default configuration
    Default,
    /// Print the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat(args) => commands::chat::run(args).await?,
        Commands::Filter {
            text,
            locale,
            max_length,
        } => commands::filter::run(&text, &locale, max_length)?,
        Commands::Parse { path, json } => commands::parse::run(&path, json)?,
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Default) {
            ConfigAction::Default => commands::config_cmd::print_default(),
            ConfigAction::Show => commands::config_cmd::show()?,
            ConfigAction::Validate => commands::config_cmd::validate()?,
            ConfigAction::Path => commands::config_cmd::path(),
        },
    }

    Ok(())
}
