use crate::model::{ClientConfig, ExportFormat};
use crate::notify::{NoticeSink, StderrSink, DEFAULT_NOTICE_DURATION};
use crate::orchestrator::controller::DEFAULT_TIMEOUT;
use crate::orchestrator::Workflow;
use crate::presenter;
use crate::transport::HttpTransport;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "repo-analyst",
    version,
    about = "Analyze a GitHub repository through a remote analysis service"
)]
pub struct Cli {
    /// Repository link, e.g. https://github.com/octocat/Hello-World
    pub repo_url: Option<String>,

    /// Base URL of the analysis service
    #[arg(long, default_value = "http://localhost:5000")]
    pub base_url: String,

    /// Give up on an analysis after this long
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.into())]
    pub timeout: humantime::Duration,

    /// How long a notice stays visible
    #[arg(long, default_value_t = DEFAULT_NOTICE_DURATION.into())]
    pub notice_duration: humantime::Duration,

    /// Print the full report as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Export the report after analysis (repeatable)
    #[arg(long, value_enum)]
    pub export: Vec<ExportFormat>,

    /// Directory exports are saved to (defaults to the Downloads folder)
    #[arg(long)]
    pub output_dir: Option<std::path::PathBuf>,

    /// Check the service health endpoint and exit
    #[arg(long)]
    pub health: bool,

    /// Append logs to this file (the only log destination in TUI mode)
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// True when no interactive terminal UI will be started.
    pub fn is_non_tui(&self) -> bool {
        self.json || self.text || self.health || !cfg!(feature = "tui")
    }
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        request_timeout: Duration::from(args.timeout),
        notice_duration: Duration::from(args.notice_duration),
        download_dir: args
            .output_dir
            .clone()
            .unwrap_or_else(crate::export::default_download_dir),
        user_agent: format!("repo-analyst/{}", env!("CARGO_PKG_VERSION")),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.health {
        return run_health(args).await;
    }

    if !args.is_non_tui() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
    }

    run_text(args).await
}

fn build_workflow(args: &Cli, sink: Arc<dyn NoticeSink>) -> Result<Workflow<HttpTransport>> {
    let cfg = build_config(args);
    let transport = Arc::new(
        HttpTransport::new(&cfg.base_url, &cfg.user_agent).context("create http transport")?,
    );
    Ok(Workflow::new(&cfg, transport, sink))
}

async fn run_health(args: Cli) -> Result<()> {
    let workflow = build_workflow(&args, Arc::new(StderrSink))?;
    let health = workflow
        .controller()
        .health()
        .await
        .with_context(|| format!("health check against {} failed", args.base_url))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&health)?);
    } else {
        println!(
            "{}: {}{}",
            health.service.as_deref().unwrap_or("service"),
            health.status,
            health
                .timestamp
                .as_deref()
                .map(|t| format!(" ({t})"))
                .unwrap_or_default()
        );
    }
    Ok(())
}

/// One analysis, optional exports, then exit. Ctrl-C cancels the pending request.
async fn run_text(args: Cli) -> Result<()> {
    let repo_url = args
        .repo_url
        .clone()
        .context("a repository link is required in --text/--json mode")?;
    let workflow = Arc::new(build_workflow(&args, Arc::new(StderrSink))?);
    let (out_tx, out_handle) = spawn_output_writer();

    let interrupted = CancellationToken::new();
    let ctrl_c = {
        let wf = workflow.clone();
        let interrupted = interrupted.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupted.cancel();
                wf.cancel();
            }
        })
    };

    let model = workflow.analyze(&repo_url).await;
    ctrl_c.abort();

    let Some(model) = model else {
        drop(out_tx);
        let _ = out_handle.await;
        return unfinished_analysis(&repo_url, interrupted.is_cancelled());
    };

    if args.json {
        if let Some(report) = workflow.current_report() {
            let out = serde_json::to_string_pretty(&report)?;
            let _ = out_tx.send(OutputLine::Stdout(out));
        }
    } else {
        for line in presenter::summary_lines(&model) {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    let mut failed_exports = 0usize;
    for format in &args.export {
        match workflow.export(*format).await {
            Some(path) => {
                let _ = out_tx.send(OutputLine::Stderr(format!("Saved: {}", path.display())));
            }
            None => failed_exports += 1,
        }
    }

    drop(out_tx);
    let _ = out_handle.await;

    if failed_exports > 0 {
        return Err(anyhow::anyhow!("{failed_exports} export(s) failed"));
    }
    Ok(())
}

/// Result of a text-mode run that produced no report. A user interrupt is not a failure.
fn unfinished_analysis(repo_url: &str, interrupted: bool) -> Result<()> {
    if interrupted {
        tracing::info!("analysis interrupted by user");
        return Ok(());
    }
    Err(anyhow::anyhow!("analysis of {repo_url} did not complete"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let args = Cli::parse_from(["repo-analyst"]);
        let cfg = build_config(&args);
        assert_eq!(cfg.base_url, "http://localhost:5000");
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(cfg.request_timeout, DEFAULT_TIMEOUT);
        assert_eq!(cfg.notice_duration, DEFAULT_NOTICE_DURATION);
    }

    #[test]
    fn parses_exports_and_output_dir() {
        let args = Cli::parse_from([
            "repo-analyst",
            "https://github.com/octocat/Hello-World",
            "--text",
            "--export",
            "word",
            "--export",
            "pdf",
            "--output-dir",
            "/tmp/out",
            "--timeout",
            "45s",
        ]);
        assert!(args.is_non_tui());
        assert_eq!(args.export, vec![ExportFormat::Word, ExportFormat::Pdf]);
        let cfg = build_config(&args);
        assert_eq!(cfg.download_dir, std::path::PathBuf::from("/tmp/out"));
        assert_eq!(cfg.request_timeout, Duration::from_secs(45));
    }

    #[test]
    fn interrupted_analysis_exits_cleanly() {
        let url = "https://github.com/octocat/Hello-World";
        assert!(unfinished_analysis(url, true).is_ok());
        let err = unfinished_analysis(url, false).unwrap_err();
        assert!(err.to_string().contains("did not complete"));
    }

    #[test]
    fn rejects_unknown_export_format() {
        assert!(Cli::try_parse_from(["repo-analyst", "--export", "html"]).is_err());
    }
}
