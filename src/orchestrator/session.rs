//! Command loop between a UI layer and the [`Workflow`].
//!
//! UI threads send [`UiCommand`]s; long-running work is spawned so a cancel can
//! arrive while an analysis is pending. Results flow back as [`AppEvent`]s.

use super::workflow::Workflow;
use crate::model::{AppEvent, UiCommand};
use crate::transport::Transport;
use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;

pub(crate) async fn run_session<T: Transport + ?Sized + 'static>(
    workflow: Arc<Workflow<T>>,
    event_tx: UnboundedSender<AppEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut tasks = JoinSet::new();
    // Generation of the newest Analyze; only its task may report Idle.
    let latest = Arc::new(AtomicU64::new(0));

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Analyze(input)) => {
                        let _ = event_tx.send(AppEvent::Busy {
                            loading: "Connecting to the analysis service…".into(),
                        });
                        let generation = latest.fetch_add(1, Ordering::SeqCst) + 1;
                        let latest = latest.clone();
                        let wf = workflow.clone();
                        let tx = event_tx.clone();
                        tasks.spawn(async move {
                            if let Some(model) = wf.analyze(&input).await {
                                let _ = tx.send(AppEvent::Presented(Box::new(model)));
                            }
                            // A newer submission keeps the UI busy until it ends.
                            if latest.load(Ordering::SeqCst) == generation {
                                let _ = tx.send(AppEvent::Idle);
                            }
                        });
                    }
                    Some(UiCommand::Cancel) => {
                        workflow.cancel();
                    }
                    Some(UiCommand::Export(format)) => {
                        let wf = workflow.clone();
                        let tx = event_tx.clone();
                        tasks.spawn(async move {
                            if let Some(path) = wf.export(format).await {
                                let _ = tx.send(AppEvent::Exported(path));
                            }
                        });
                    }
                    Some(UiCommand::Quit) | None => {
                        if workflow.is_busy() {
                            tracing::info!("abandoning pending analysis");
                            workflow.controller().cancel();
                        }
                        break;
                    }
                }
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "workflow task failed");
                    let _ = event_tx.send(AppEvent::Idle);
                }
            }
        }
    }

    tasks.shutdown().await;
    Ok(())
}
