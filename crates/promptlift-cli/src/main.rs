use tracing::Level;

mod cli;
mod commands;
mod display;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse_args();
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
    tracing::debug!("promptlift v{}", env!("CARGO_PKG_VERSION"));
    commands::run_command(cli).await
}
