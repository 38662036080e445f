//! Pod - podcast playback queue and session shell

use anyhow::Context;
use clap::{Parser, Subcommand};
use pod_cli::{
    build_shell,
    config::CliConfig,
    library::Library,
    shell::{Flow, Shell},
};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pod")]
#[command(about = "Podcast playback queue and session shell", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "POD_CONFIG")]
    config: Option<PathBuf>,

    /// Episode library (JSON array), overrides the configured one
    #[arg(short, long)]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read commands interactively (default)
    Shell,
    /// Execute commands from a file, one per line
    Run {
        /// Script path
        script: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = CliConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let library_path = cli.library.or_else(|| config.library.episodes_file.clone());
    let library = Library::load(library_path.as_deref()).context("failed to load library")?;

    let mut shell = build_shell(&config, library, std::io::stdout()).await?;

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => interactive(&mut shell).await?,
        Commands::Run { script } => {
            let contents = tokio::fs::read_to_string(&script)
                .await
                .with_context(|| format!("failed to read {}", script.display()))?;
            for line in contents.lines() {
                if shell.run_line(line).await? == Flow::Quit {
                    break;
                }
            }
        }
    }

    shell.shutdown().await;
    Ok(())
}

async fn interactive<W: Write>(shell: &mut Shell<W>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("pod> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if shell.run_line(&line).await? == Flow::Quit {
            break;
        }
    }
    Ok(())
}
