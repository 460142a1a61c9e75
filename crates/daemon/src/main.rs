mod cli;

use clap::Parser;
use owo_colors::OwoColorize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use cli::args::Args;
use cli::op::{Op, OpContext};
use roomdrop_daemon::state::AppState;

/// Log to stderr, and to daily files when the config names a log directory
fn init_tracing(args: &Args) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    // an uninitialized roomdrop directory is fine here; the op reports it
    let log_dir = AppState::load(args.config_path.clone())
        .ok()
        .and_then(|state| state.config.log_dir);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "roomdrop.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _guard = init_tracing(&args);

    let ctx = OpContext::new(args.config_path.clone(), args.remote.clone());

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}
