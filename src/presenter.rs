//! Report presentation.
//!
//! Maps a raw [`AnalysisReport`] to display-ready strings and keeps the most
//! recently presented report as the sole export target.

use crate::model::{AnalysisReport, DisplayModel};

const NO_DESCRIPTION: &str = "No description provided for this project";
const UNKNOWN_LANGUAGE: &str = "Unknown";

#[derive(Debug, Default)]
pub struct ResultPresenter {
    current: Option<AnalysisReport>,
}

impl ResultPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the display model and make `report` the current report.
    pub fn present(&mut self, report: AnalysisReport) -> DisplayModel {
        let model = display_model(&report);
        self.current = Some(report);
        model
    }

    pub fn current_report(&self) -> Option<&AnalysisReport> {
        self.current.as_ref()
    }
}

pub fn display_model(report: &AnalysisReport) -> DisplayModel {
    let info = &report.repo_info;
    DisplayModel {
        full_name: info.full_name.clone(),
        description: info
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(NO_DESCRIPTION)
            .to_string(),
        stars: group_digits(info.stars),
        forks: group_digits(info.forks),
        open_issues: group_digits(info.open_issues),
        language: info
            .language
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(UNKNOWN_LANGUAGE)
            .to_string(),
        created_at: info.created_at.clone(),
        updated_at: info.updated_at.clone(),
        analyzed_at: report.analyzed_at.clone(),
        processing_time: report
            .processing_time
            .filter(|t| *t > 0.0)
            .map(|t| format!("{t}s")),
        analysis: report.ai_analysis.clone(),
    }
}

/// Success notice text for a completed analysis.
pub fn completion_message(report: &AnalysisReport) -> String {
    match report.processing_time.filter(|t| *t > 0.0) {
        Some(t) => format!("Analysis complete! Took {t} s"),
        None => "Analysis complete! Took unknown s".to_string(),
    }
}

/// Plain-text rendering for non-interactive output.
pub fn summary_lines(model: &DisplayModel) -> Vec<String> {
    let mut lines = vec![
        model.full_name.clone(),
        model.description.clone(),
        format!(
            "Stars: {}  Forks: {}  Issues: {}  Language: {}",
            model.stars, model.forks, model.open_issues, model.language
        ),
    ];
    let mut meta = format!(
        "Created: {}  Updated: {}  Analyzed: {}",
        model.created_at, model.updated_at, model.analyzed_at
    );
    if let Some(t) = model.processing_time.as_deref() {
        meta.push_str(&format!("  Took: {t}"));
    }
    lines.push(meta);
    lines.push(String::new());
    lines.extend(model.analysis.lines().map(str::to_string));
    lines
}

/// Format an integer with `,` thousands separators.
pub fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
