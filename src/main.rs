use clap::Parser;
use taskai::cli::commands::Cli;
use taskai::cli::handlers;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable overriding the configured log filter
const LOG_ENV: &str = "TAI_LOG";

fn init_tracing(project_dir: Option<&str>) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        let configured =
            handlers::configured_log_filter(project_dir).unwrap_or_else(|| "warn".to_string());
        EnvFilter::new(configured)
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.project_dir.as_deref());

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
