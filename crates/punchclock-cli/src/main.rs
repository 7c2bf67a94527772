use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "punchclock", version, about = "Punchclock CLI")]
struct Cli {
    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Task management and timers
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Manual check-in and check-out
    Attendance {
        #[command(subcommand)]
        action: commands::attendance::AttendanceAction,
    },
    /// Automatic check-in settings and signal testing
    AutoCheckIn {
        #[command(subcommand)]
        action: commands::auto_check_in::AutoCheckInAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PUNCHCLOCK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let out = commands::Output { json: cli.json };
    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action, out),
        Commands::Attendance { action } => commands::attendance::run(action, out),
        Commands::AutoCheckIn { action } => commands::auto_check_in::run(action, out),
        Commands::Config { action } => commands::config::run(action, out),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
