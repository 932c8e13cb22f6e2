mod cli;
mod delivery;
mod engine;
mod error;
mod logging;
mod model;
mod orchestrator;
mod presenter;
mod render;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;
mod view;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.is_headless();

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success, especially for non-TUI modes
            if is_headless {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            if is_headless {
                eprintln!("error: {e:#}");
                std::process::exit(1);
            } else {
                Err(e)
            }
        }
    }
}
