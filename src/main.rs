mod cli;
mod error;
mod export;
mod logging;
mod model;
mod notify;
mod orchestrator;
mod presenter;
mod transport;
#[cfg(feature = "tui")]
mod tui;
mod validate;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_non_tui = args.is_non_tui();

    let target = match (&args.log_file, is_non_tui) {
        (Some(path), _) => logging::LogTarget::File(path),
        (None, true) => logging::LogTarget::Stderr,
        (None, false) => logging::LogTarget::Off,
    };
    logging::init_tracing(target, logging::level_for(args.verbose))?;

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success, especially for non-TUI modes
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            if is_non_tui {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
            Err(e)
        }
    }
}
