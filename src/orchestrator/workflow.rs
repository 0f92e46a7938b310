//! The analysis workflow shell.
//!
//! Owns every component of one session and turns each failure into a single
//! notice. UI layers call into this type; nothing here is global.

use crate::error::{ExportError, RequestError};
use crate::export::ExportDispatcher;
use crate::model::{AnalysisReport, ClientConfig, DisplayModel, ExportFormat, Severity};
use crate::notify::{NoticeSink, Notifier};
use crate::orchestrator::controller::RequestController;
use crate::presenter::{self, ResultPresenter};
use crate::transport::Transport;
use crate::validate::validate;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct Workflow<T: Transport + ?Sized> {
    controller: RequestController<T>,
    presenter: Mutex<ResultPresenter>,
    exporter: ExportDispatcher<T>,
    notifier: Notifier,
}

impl<T: Transport + ?Sized> Workflow<T> {
    pub fn new(cfg: &ClientConfig, transport: Arc<T>, sink: Arc<dyn NoticeSink>) -> Self {
        Self {
            controller: RequestController::new(transport.clone(), cfg.request_timeout),
            presenter: Mutex::new(ResultPresenter::new()),
            exporter: ExportDispatcher::new(
                transport,
                cfg.download_dir.clone(),
                cfg.request_timeout,
            ),
            notifier: Notifier::new(cfg.notice_duration, sink),
        }
    }

    fn presenter(&self) -> MutexGuard<'_, ResultPresenter> {
        self.presenter.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn download_dir(&self) -> &Path {
        self.exporter.download_dir()
    }

    pub fn controller(&self) -> &RequestController<T> {
        &self.controller
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_pending()
    }

    pub fn current_report(&self) -> Option<AnalysisReport> {
        self.presenter().current_report().cloned()
    }

    /// Validate, submit and present. Returns the display model on success.
    pub async fn analyze(&self, input: &str) -> Option<DisplayModel> {
        let reference = match validate(input) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, "rejected repository link");
                self.notifier.notify(e.to_string(), Severity::Error);
                return None;
            }
        };

        match self.controller.submit(reference).await {
            Ok(report) => {
                let message = presenter::completion_message(&report);
                let model = self.presenter().present(report);
                self.notifier.notify(message, Severity::Success);
                Some(model)
            }
            // Announced by `cancel`, or superseded by a newer attempt.
            Err(RequestError::Cancelled) => None,
            Err(RequestError::Timeout) => {
                self.notifier.notify(
                    "Request timed out, check your network connection or try again later",
                    Severity::Error,
                );
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "analysis failed");
                self.notifier
                    .notify(format!("Analysis failed: {e}"), Severity::Error);
                None
            }
        }
    }

    /// Cancel the pending analysis, if any.
    pub fn cancel(&self) -> bool {
        let cancelled = self.controller.cancel();
        if cancelled {
            self.notifier.notify("Analysis cancelled", Severity::Info);
        }
        cancelled
    }

    /// Export the current report. Independent of any pending analysis.
    pub async fn export(&self, format: ExportFormat) -> Option<PathBuf> {
        let report = self.current_report();
        if report.is_some() {
            self.notifier.notify(
                format!(
                    "Generating {} report...",
                    format.as_str().to_uppercase()
                ),
                Severity::Info,
            );
        }
        match self.exporter.export(format, report.as_ref()).await {
            Ok(path) => {
                self.notifier.notify(
                    format!("Export complete: {}", path.display()),
                    Severity::Success,
                );
                Some(path)
            }
            Err(ExportError::NoReportAvailable) => {
                self.notifier
                    .notify("No report available to export", Severity::Error);
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, format = format.as_str(), "export failed");
                self.notifier
                    .notify(format!("Export failed: {e}"), Severity::Error);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::report_json;
    use crate::notify::recording::RecordingSink;
    use crate::transport::fake::{FakeTransport, Reply};
    use std::time::Duration;

    struct Harness {
        transport: Arc<FakeTransport>,
        sink: Arc<RecordingSink>,
        workflow: Arc<Workflow<FakeTransport>>,
        _dir: tempfile::TempDir,
    }

    fn harness(replies: Vec<Reply>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ClientConfig {
            base_url: "http://localhost:5000".into(),
            request_timeout: Duration::from_secs(30),
            notice_duration: Duration::from_secs(5),
            download_dir: dir.path().to_path_buf(),
            user_agent: "test".into(),
        };
        let transport = Arc::new(FakeTransport::new(replies));
        let sink = Arc::new(RecordingSink::default());
        let workflow = Arc::new(Workflow::new(&cfg, transport.clone(), sink.clone()));
        Harness {
            transport,
            sink,
            workflow,
            _dir: dir,
        }
    }

    const HELLO: &str = "https://github.com/octocat/Hello-World";

    #[tokio::test(start_paused = true)]
    async fn scenario_success_notice_reports_processing_time() {
        let h = harness(vec![Reply::json(200, report_json("Hello-World", Some(2.5)))]);

        let model = h.workflow.analyze(HELLO).await.unwrap();
        assert_eq!(model.full_name, "octocat/Hello-World");

        let (severity, message) = h.sink.shown().pop().unwrap();
        assert_eq!(severity, Severity::Success);
        assert!(message.contains("2.5"), "{message}");
        assert!(!h.workflow.is_busy());
    }

    #[tokio::test]
    async fn scenario_malformed_link_never_hits_network() {
        let h = harness(vec![]);
        assert!(h.workflow.analyze("not-a-url").await.is_none());
        assert!(h.transport.calls().is_empty());
        let shown = h.sink.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].0, Severity::Error);
        assert!(shown[0].1.contains("Malformed"));
    }

    #[tokio::test]
    async fn empty_input_is_reported() {
        let h = harness(vec![]);
        assert!(h.workflow.analyze("   ").await.is_none());
        assert_eq!(
            h.sink.shown(),
            vec![(
                Severity::Error,
                "Please enter a GitHub repository link".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn scenario_server_500_without_body() {
        let h = harness(vec![Reply::raw(500, "")]);
        assert!(h.workflow.analyze(HELLO).await.is_none());
        let (severity, message) = h.sink.shown().pop().unwrap();
        assert_eq!(severity, Severity::Error);
        assert!(message.contains("500"), "{message}");
        assert!(!h.workflow.is_busy());
        assert!(h.workflow.current_report().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_produces_single_error_notice() {
        let h = harness(vec![
            Reply::json(200, report_json("Hello-World", None)).after(Duration::from_secs(60)),
        ]);
        assert!(h.workflow.analyze(HELLO).await.is_none());
        let shown = h.sink.shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].0, Severity::Error);
        assert!(shown[0].1.contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn user_cancel_is_info_not_error() {
        let h = harness(vec![
            Reply::json(200, report_json("Hello-World", None)).after(Duration::from_secs(10)),
        ]);
        let task = tokio::spawn({
            let w = h.workflow.clone();
            async move { w.analyze(HELLO).await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(h.workflow.cancel());
        assert!(task.await.unwrap().is_none());

        assert_eq!(
            h.sink.shown(),
            vec![(Severity::Info, "Analysis cancelled".to_string())]
        );
        assert!(!h.workflow.cancel(), "nothing left to cancel");
    }

    #[tokio::test(start_paused = true)]
    async fn stale_response_never_replaces_current_report() {
        let h = harness(vec![
            Reply::json(200, report_json("Stale", None))
                .after(Duration::from_secs(8))
                .ignoring_cancel(),
            Reply::json(200, report_json("Fresh", None)).after(Duration::from_secs(2)),
        ]);
        let first = tokio::spawn({
            let w = h.workflow.clone();
            async move { w.analyze(HELLO).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = h.workflow.analyze(HELLO).await.unwrap();
        assert_eq!(second.full_name, "octocat/Fresh");

        assert!(first.await.unwrap().is_none());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(
            h.workflow.current_report().unwrap().repo_info.name,
            "Fresh"
        );
    }

    #[tokio::test]
    async fn export_before_analysis_is_rejected() {
        let h = harness(vec![]);
        assert!(h.workflow.export(ExportFormat::Pdf).await.is_none());
        assert!(h.transport.calls().is_empty());
        assert_eq!(
            h.sink.shown(),
            vec![(Severity::Error, "No report available to export".to_string())]
        );
    }

    #[tokio::test]
    async fn scenario_word_export_of_retained_report() {
        let h = harness(vec![
            Reply::json(200, report_json("Hello-World", Some(2.5))),
            Reply::raw(200, "docx-bytes"),
        ]);
        h.workflow.analyze(HELLO).await.unwrap();
        let path = h.workflow.export(ExportFormat::Word).await.unwrap();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("github_analysis_Hello-World.docx")
        );

        let shown = h.sink.shown();
        assert_eq!(
            shown[shown.len() - 2],
            (Severity::Info, "Generating WORD report...".to_string())
        );
        assert_eq!(shown[shown.len() - 1].0, Severity::Success);
    }

    #[tokio::test]
    async fn failed_export_keeps_report_for_retry() {
        let h = harness(vec![
            Reply::json(200, report_json("Hello-World", None)),
            Reply::raw(500, ""),
            Reply::raw(200, "pdf"),
        ]);
        h.workflow.analyze(HELLO).await.unwrap();
        assert!(h.workflow.export(ExportFormat::Pdf).await.is_none());
        let (severity, message) = h.sink.shown().pop().unwrap();
        assert_eq!(severity, Severity::Error);
        assert!(message.starts_with("Export failed"), "{message}");

        assert!(h.workflow.export(ExportFormat::Pdf).await.is_some());
    }
}
