mod commands;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "blog-kit")]
#[command(version, about = "Publish a static blog from markdown", long_about = None)]
struct Cli {
    /// Site directory containing site.toml
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Output directory (overrides paths.output in site.toml)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Deploy to the target configured in site.toml after building
    #[arg(long)]
    deploy: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    match commands::publish::run(cli.path, cli.output, cli.deploy).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::FAILURE
        }
    }
}
