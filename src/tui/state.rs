use crate::model::{AppEvent, DisplayModel, Notice};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Report,
}

pub struct UiState {
    pub focus: Focus,
    pub show_help: bool,

    // Repository link editor; `cursor` counts chars, not bytes.
    pub input: String,
    pub cursor: usize,

    pub busy: bool,
    pub loading: String,
    pub busy_since: Option<Instant>,

    pub report: Option<DisplayModel>,
    pub report_scroll: u16,

    pub notice: Option<Notice>,
    pub last_exported_path: Option<PathBuf>,
    pub info: String,

    pub base_url: String,
    pub download_dir: PathBuf,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            focus: Focus::Input,
            show_help: false,
            input: String::new(),
            cursor: 0,
            busy: false,
            loading: String::new(),
            busy_since: None,
            report: None,
            report_scroll: 0,
            notice: None,
            last_exported_path: None,
            info: String::new(),
            base_url: String::new(),
            download_dir: PathBuf::new(),
        }
    }
}

impl UiState {
    pub fn apply_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::Busy { loading } => {
                self.busy = true;
                self.loading = loading;
                self.busy_since = Some(Instant::now());
            }
            AppEvent::Idle => {
                self.busy = false;
                self.loading.clear();
                self.busy_since = None;
            }
            AppEvent::Presented(model) => {
                self.report = Some(*model);
                self.report_scroll = 0;
                self.focus = Focus::Report;
            }
            AppEvent::Exported(path) => {
                self.info = format!("Last export: {}", path.display());
                self.last_exported_path = Some(path);
            }
            AppEvent::NoticeShown(notice) => self.notice = Some(notice),
            AppEvent::NoticeDismissed { id } => {
                if self.notice.as_ref().is_some_and(|n| n.id == id) {
                    self.notice = None;
                }
            }
        }
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index();
        self.input.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index();
        self.input.remove(at);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let at = self.byte_index();
            self.input.remove(at);
        }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.input.chars().count() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    pub fn set_input(&mut self, text: &str) {
        self.input = text.to_string();
        self.cursor_end();
    }

    pub fn scroll_by(&mut self, delta: i32) {
        self.report_scroll = (self.report_scroll as i32 + delta).max(0) as u16;
    }
}
