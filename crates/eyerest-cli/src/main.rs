use clap::{Parser, Subcommand};
use eyerest_core::Config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod app;
mod commands;

#[derive(Parser)]
#[command(name = "eyerest", version, about = "Recurring eye-rest reminders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether reminders are running and when the next one fires
    Status {
        /// Print the raw status payload
        #[arg(long)]
        json: bool,
    },
    /// Pause or resume the reminder loop
    Toggle {
        /// Print the raw status payload
        #[arg(long)]
        json: bool,
    },
    /// Fire a reminder now
    Test,
    /// Reminder settings
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Run in the foreground, delivering reminders and serving requests on stdin
    Daemon {
        /// Seconds between alarm checks (overrides alarm.poll_secs)
        #[arg(long)]
        poll_secs: Option<u64>,
        /// Ignore stdin and run until interrupted
        #[arg(long)]
        no_stdin: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let configured = Config::load()
            .map(|config| config.log.filter)
            .unwrap_or_default();
        EnvFilter::try_new(configured).unwrap_or_else(|_| EnvFilter::new("eyerest=info"))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Status { json } => commands::reminder::status(json).await,
        Commands::Toggle { json } => commands::reminder::toggle(json).await,
        Commands::Test => commands::reminder::test().await,
        Commands::Settings { action } => commands::settings::run(action).await,
        Commands::Daemon { poll_secs, no_stdin } => {
            commands::daemon::run(commands::daemon::DaemonOptions { poll_secs, no_stdin }).await
        }
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
