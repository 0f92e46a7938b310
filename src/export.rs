//! Report export.
//!
//! Posts the retained report to `/export/{format}` and saves the returned bytes
//! into the download directory.

use crate::error::ExportError;
use crate::model::{AnalysisReport, ExportFormat, ExportJob};
use crate::orchestrator::controller::server_message;
use crate::transport::Transport;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// File name for a downloaded export, e.g. `github_analysis_Hello-World.docx`.
pub fn artifact_file_name(report: &AnalysisReport, format: ExportFormat) -> String {
    let name: String = report
        .repo_info
        .name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    format!("github_analysis_{}.{}", name, format.extension())
}

/// Default download location: the user's Downloads folder, else the working directory.
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub struct ExportDispatcher<T: Transport + ?Sized> {
    transport: Arc<T>,
    download_dir: PathBuf,
    timeout: Duration,
}

impl<T: Transport + ?Sized> ExportDispatcher<T> {
    pub fn new(transport: Arc<T>, download_dir: PathBuf, timeout: Duration) -> Self {
        Self {
            transport,
            download_dir,
            timeout,
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Export `report` as `format`. Returns the path of the saved artifact.
    pub async fn export(
        &self,
        format: ExportFormat,
        report: Option<&AnalysisReport>,
    ) -> Result<PathBuf, ExportError> {
        let job = ExportJob {
            format,
            source: report.ok_or(ExportError::NoReportAvailable)?,
        };
        let path = format!("/export/{}", job.format.as_str());
        let body = serde_json::to_value(job.source)
            .map_err(|e| ExportError::Transport(format!("encode report: {e}")))?;

        tracing::info!(
            format = job.format.as_str(),
            repo = %job.source.repo_info.full_name,
            "exporting report"
        );
        let cancel = CancellationToken::new();
        let resp = tokio::select! {
            res = self.transport.post_json(&path, &body, &cancel) => {
                res.map_err(|e| ExportError::Transport(e.to_string()))?
            }
            _ = tokio::time::sleep(self.timeout) => {
                cancel.cancel();
                tracing::warn!(format = job.format.as_str(), timeout = ?self.timeout, "export timed out");
                return Err(ExportError::Timeout);
            }
        };
        if !resp.is_success() {
            tracing::warn!(status = resp.status, "export rejected");
            return Err(ExportError::Transport(server_message(&resp)));
        }

        let target = self
            .download_dir
            .join(artifact_file_name(job.source, job.format));
        save_download(&target, &resp.body).await?;
        tracing::info!(path = %target.display(), bytes = resp.body.len(), "export saved");
        Ok(target)
    }
}

/// Write `bytes` to `target`, removing any partial file on failure.
async fn save_download(target: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if let Err(e) = tokio::fs::write(target, bytes).await {
        let _ = tokio::fs::remove_file(target).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::report;
    use crate::transport::fake::{FakeTransport, Reply};

    fn dispatcher(
        replies: Vec<Reply>,
        dir: &Path,
    ) -> (Arc<FakeTransport>, ExportDispatcher<FakeTransport>) {
        let transport = Arc::new(FakeTransport::new(replies));
        let d = ExportDispatcher::new(
            transport.clone(),
            dir.to_path_buf(),
            crate::orchestrator::controller::DEFAULT_TIMEOUT,
        );
        (transport, d)
    }

    #[test]
    fn file_name_uses_repo_name_and_extension() {
        let r = report("Hello-World", None);
        assert_eq!(
            artifact_file_name(&r, ExportFormat::Word),
            "github_analysis_Hello-World.docx"
        );
        assert_eq!(
            artifact_file_name(&r, ExportFormat::Pdf),
            "github_analysis_Hello-World.pdf"
        );
        assert_eq!(
            artifact_file_name(&r, ExportFormat::Markdown),
            "github_analysis_Hello-World.markdown"
        );
    }

    #[test]
    fn file_name_cannot_escape_download_dir() {
        let mut r = report("x", None);
        r.repo_info.name = "../../etc/passwd".into();
        assert_eq!(
            artifact_file_name(&r, ExportFormat::Pdf),
            "github_analysis_.._.._etc_passwd.pdf"
        );
    }

    #[tokio::test]
    async fn export_without_report_fails_before_request() {
        let dir = tempfile::tempdir().unwrap();
        let (transport, d) = dispatcher(vec![], dir.path());
        let err = d.export(ExportFormat::Pdf, None).await.unwrap_err();
        assert!(matches!(err, ExportError::NoReportAvailable));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn word_export_downloads_docx() {
        let dir = tempfile::tempdir().unwrap();
        let (transport, d) =
            dispatcher(vec![Reply::raw(200, &b"PK\x03\x04docx"[..])], dir.path());
        let r = report("Hello-World", Some(2.5));

        let path = d.export(ExportFormat::Word, Some(&r)).await.unwrap();
        assert_eq!(path, dir.path().join("github_analysis_Hello-World.docx"));
        assert_eq!(std::fs::read(&path).unwrap(), b"PK\x03\x04docx");

        let calls = transport.calls();
        assert_eq!(calls[0].path, "/export/word");
        // The full report, unknown fields included, is sent back.
        let body = calls[0].body.clone().unwrap();
        assert_eq!(body["report_id"], "a1b2c3d4");
        assert_eq!(body["repo_info"]["name"], "Hello-World");
        assert_eq!(body["processing_time"], 2.5);
    }

    #[tokio::test]
    async fn failed_status_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let (_, d) = dispatcher(
            vec![Reply::json(400, serde_json::json!({ "error": "format not supported" }))],
            dir.path(),
        );
        let r = report("Hello-World", None);
        match d.export(ExportFormat::Word, Some(&r)).await.unwrap_err() {
            ExportError::Transport(msg) => assert_eq!(msg, "format not supported"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn network_failure_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let (_, d) = dispatcher(vec![Reply::network("connection reset")], dir.path());
        let r = report("Hello-World", None);
        assert!(matches!(
            d.export(ExportFormat::Pdf, Some(&r)).await.unwrap_err(),
            ExportError::Transport(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_export_gives_up_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let (_, d) = dispatcher(
            vec![Reply::raw(200, "late").after(Duration::from_secs(300))],
            dir.path(),
        );
        let r = report("Hello-World", None);
        let start = tokio::time::Instant::now();
        let err = d.export(ExportFormat::Pdf, Some(&r)).await.unwrap_err();
        assert!(matches!(err, ExportError::Timeout));
        assert!(start.elapsed() < Duration::from_secs(31));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn creates_missing_download_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("exports").join("today");
        let (_, d) = dispatcher(vec![Reply::raw(200, "# md")], &nested);
        let r = report("Hello-World", None);
        let path = d.export(ExportFormat::Markdown, Some(&r)).await.unwrap();
        assert_eq!(path, nested.join("github_analysis_Hello-World.markdown"));
        assert!(path.exists());
    }
}
