use clap::Parser;
use crosstrader::cli::{configured_log_level, run, Cli};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over `[log] level`, which wins over `info`.
fn init_logging(config_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(configured_log_level(cli.config_path()).as_deref());
    run(cli)
}
