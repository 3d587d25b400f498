use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use chimed::{commands, config::DaemonConfig, ticker, AppContext};

#[derive(Parser)]
#[command(
    name = "chimed",
    about = "chimed — always-on reminder scheduling daemon",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Data directory for the task snapshot, timezone preferences, and config
    #[arg(long, env = "CHIMED_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CHIMED_LOG")]
    log: Option<String>,

    /// Write logs to this file path (rotated daily). Optional.
    #[arg(long, env = "CHIMED_LOG_FILE")]
    log_file: Option<std::path::PathBuf>,

    /// Seconds between scheduler sweeps
    #[arg(long, env = "CHIMED_TICK_SECS")]
    tick_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler in the foreground (default when no subcommand given).
    ///
    /// Examples:
    ///   chimed serve
    ///   chimed
    Serve,
    /// Schedule a task from a shorthand entry.
    ///
    /// The entry is a reference keyword ("in", "on", "at", "each", "every",
    /// "per", or an interval name like "daily"), any number of time parts,
    /// then the reminder message.
    ///
    /// Examples:
    ///   chimed add --owner 1 in 1h 30m change laundry
    ///   chimed add --owner 1 at 9:25pm writing sprint
    ///   chimed add --owner 1 every week mon 9:00 standup
    Add {
        /// Owner identity the task belongs to
        #[arg(long, env = "CHIMED_OWNER")]
        owner: u64,
        /// The shorthand entry
        #[arg(required = true, trailing_var_arg = true)]
        entry: Vec<String>,
    },
    /// List scheduled tasks, earliest first.
    ///
    /// The printed positions are the indices `remove` accepts.
    List {
        #[arg(long, env = "CHIMED_OWNER")]
        owner: u64,
    },
    /// Remove a task by its position in the list output.
    Remove {
        #[arg(long, env = "CHIMED_OWNER")]
        owner: u64,
        /// 1-based position in the sorted list
        index: usize,
    },
    /// Show or set the timezone preference.
    ///
    /// Examples:
    ///   chimed tz --owner 1
    ///   chimed tz --owner 1 America/Chicago
    Tz {
        #[arg(long, env = "CHIMED_OWNER")]
        owner: u64,
        /// IANA zone name, e.g. America/Chicago
        zone: Option<String>,
    },
    /// Show the current time in the owner's zone.
    Now {
        #[arg(long, env = "CHIMED_OWNER")]
        owner: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = DaemonConfig::new(args.data_dir.clone(), args.log.clone(), args.tick_secs);
    let _guard = setup_logging(&config.log, args.log_file.as_deref(), &config.log_format);

    let ctx = AppContext::init(config).await?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!(
                data_dir = %ctx.config.data_dir.display(),
                "chimed starting"
            );
            ticker::run(ctx).await;
            Ok(())
        }
        Command::Add { owner, entry } => report(commands::create(&ctx, owner, &entry).await),
        Command::List { owner } => report(commands::list(&ctx, owner).await),
        Command::Remove { owner, index } => report(commands::remove(&ctx, owner, index).await),
        Command::Tz { owner, zone } => {
            report(commands::timezone(&ctx, owner, zone.as_deref()).await)
        }
        Command::Now { owner } => report(commands::now(&ctx, owner).await),
    }
}

/// Print a command's user-facing reply, or its failure text to stderr.
fn report(result: Result<String>) -> Result<()> {
    match result {
        Ok(text) => {
            println!("{text}");
            Ok(())
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

/// Initialize the tracing subscriber.
/// If `log_file` is set, logs go to both stdout and a daily-rolling file.
/// Returns a `WorkerGuard` that must stay alive for the process lifetime.
///
/// If the log directory cannot be created, falls back to stdout-only logging
/// with a warning — never panics.
fn setup_logging(
    log_level: &str,
    log_file: Option<&std::path::Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let use_json = log_format == "json";

    if let Some(path) = log_file {
        let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let filename = path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("chimed.log"));

        // Ensure the directory exists before tracing-appender tries to open it.
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "warn: could not create log directory '{}': {e} — falling back to stdout",
                dir.display()
            );
            if use_json {
                tracing_subscriber::fmt().json().with_env_filter(log_level).init();
            } else {
                tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
            }
            return None;
        }

        let appender = tracing_appender::rolling::daily(dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);

        if use_json {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(non_blocking))
                .init();
        } else {
            tracing_subscriber::registry()
                .with(EnvFilter::new(log_level))
                .with(fmt::layer().compact())
                .with(fmt::layer().with_writer(non_blocking))
                .init();
        }

        Some(guard)
    } else if use_json {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
        None
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
        None
    }
}
