use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub notice_duration: Duration,
    pub download_dir: PathBuf,
    pub user_agent: String,
}

/// Body of `POST /analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub repo_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub forks: u64,
    #[serde(default)]
    pub open_issues: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    // Fields this client does not read (html_url, ...) are kept so exports
    // send back exactly what the service returned.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Successful `/analyze` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub repo_info: RepoInfo,
    pub ai_analysis: String,
    pub analyzed_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Structured failure payload; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Word,
    Markdown,
}

impl ExportFormat {
    /// Path segment used in `/export/{format}`.
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Word => "word",
            ExportFormat::Markdown => "markdown",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Word => "docx",
            other => other.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub id: u64,
    pub message: String,
    pub severity: Severity,
    /// Wall-clock stamp for display only.
    pub shown_at: time::OffsetDateTime,
}

/// One export request. Lives only for the duration of the call.
#[derive(Debug, Clone, Copy)]
pub struct ExportJob<'a> {
    pub format: ExportFormat,
    pub source: &'a AnalysisReport,
}

/// Display-ready view of an [`AnalysisReport`].
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayModel {
    pub full_name: String,
    pub description: String,
    pub stars: String,
    pub forks: String,
    pub open_issues: String,
    pub language: String,
    pub created_at: String,
    pub updated_at: String,
    pub analyzed_at: String,
    pub processing_time: Option<String>,
    pub analysis: String,
}

/// Commands emitted by UI layers to the workflow loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    Analyze(String),
    Cancel,
    Export(ExportFormat),
    Quit,
}

/// Events emitted by the workflow loop and consumed by UI layers.
#[derive(Debug, Clone)]
pub enum AppEvent {
    Busy { loading: String },
    Idle,
    Presented(Box<DisplayModel>),
    Exported(PathBuf),
    NoticeShown(Notice),
    NoticeDismissed { id: u64 },
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn report_json(name: &str, processing_time: Option<f64>) -> serde_json::Value {
        let mut v = serde_json::json!({
            "report_id": "a1b2c3d4",
            "repo_info": {
                "name": name,
                "full_name": format!("octocat/{name}"),
                "description": "My first repository on GitHub!",
                "html_url": format!("https://github.com/octocat/{name}"),
                "language": "Rust",
                "stars": 2631,
                "forks": 2431,
                "open_issues": 1234567,
                "created_at": "2011-01-26",
                "updated_at": "2024-05-01"
            },
            "ai_analysis": "# Report\n\nLooks healthy.",
            "analyzed_at": "2024-05-02 10:00:00"
        });
        if let Some(t) = processing_time {
            v["processing_time"] = serde_json::json!(t);
        }
        v
    }

    pub fn report(name: &str, processing_time: Option<f64>) -> AnalysisReport {
        serde_json::from_value(report_json(name, processing_time)).unwrap()
    }
}
