//! Transient user notices.
//!
//! [`NoticeQueue`] is the pure state: at most one active notice, each expiring
//! after a fixed duration. [`Notifier`] adds the timer and forwards show/dismiss
//! to a [`NoticeSink`] that does the actual rendering.

use crate::model::{AppEvent, Notice, Severity};
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

pub const DEFAULT_NOTICE_DURATION: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct NoticeQueue {
    active: Option<Notice>,
    ttl: Duration,
    next_id: u64,
}

impl NoticeQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            active: None,
            ttl,
            next_id: 1,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Show a new notice. Returns it together with the one it superseded.
    pub fn push(
        &mut self,
        message: impl Into<String>,
        severity: Severity,
    ) -> (Notice, Option<Notice>) {
        let notice = Notice {
            id: self.next_id,
            message: message.into(),
            severity,
            shown_at: time::OffsetDateTime::now_local()
                .unwrap_or_else(|_| time::OffsetDateTime::now_utc()),
        };
        self.next_id += 1;
        let superseded = self.active.replace(notice.clone());
        (notice, superseded)
    }

    /// Remove the notice with `id` if it is still the active one.
    pub fn remove(&mut self, id: u64) -> Option<Notice> {
        if self.active.as_ref().is_some_and(|n| n.id == id) {
            self.active.take()
        } else {
            None
        }
    }

}

/// Rendering side of notices.
pub trait NoticeSink: Send + Sync {
    fn show(&self, notice: &Notice);
    fn dismiss(&self, id: u64);
}

/// Writes notices to stderr; dismissal is a no-op for line output.
pub struct StderrSink;

impl NoticeSink for StderrSink {
    fn show(&self, notice: &Notice) {
        let _ = writeln!(
            std::io::stderr().lock(),
            "[{}] {}",
            notice.severity.label(),
            notice.message
        );
    }

    fn dismiss(&self, _id: u64) {}
}

/// Forwards notices to the TUI thread as [`AppEvent`]s.
pub struct ChannelSink {
    tx: UnboundedSender<AppEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }
}

impl NoticeSink for ChannelSink {
    fn show(&self, notice: &Notice) {
        let _ = self.tx.send(AppEvent::NoticeShown(notice.clone()));
    }

    fn dismiss(&self, id: u64) {
        let _ = self.tx.send(AppEvent::NoticeDismissed { id });
    }
}

#[derive(Clone)]
pub struct Notifier {
    queue: Arc<Mutex<NoticeQueue>>,
    sink: Arc<dyn NoticeSink>,
}

impl Notifier {
    pub fn new(ttl: Duration, sink: Arc<dyn NoticeSink>) -> Self {
        Self {
            queue: Arc::new(Mutex::new(NoticeQueue::new(ttl))),
            sink,
        }
    }

    fn queue(&self) -> MutexGuard<'_, NoticeQueue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace whatever is showing with `message` and schedule its removal.
    pub fn notify(&self, message: impl Into<String>, severity: Severity) {
        let (notice, superseded, ttl) = {
            let mut q = self.queue();
            let (notice, superseded) = q.push(message, severity);
            (notice, superseded, q.ttl())
        };
        tracing::debug!(id = notice.id, severity = severity.label(), message = %notice.message, "notice");
        if let Some(old) = superseded {
            self.sink.dismiss(old.id);
        }
        self.sink.show(&notice);

        // Outside a runtime the notice stays until the next one replaces it.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let this = self.clone();
            let id = notice.id;
            handle.spawn(async move {
                tokio::time::sleep(ttl).await;
                this.dismiss(id);
            });
        }
    }

    /// Remove notice `id` if it is still showing. Never fails.
    pub fn dismiss(&self, id: u64) {
        let removed = self.queue().remove(id);
        if removed.is_some() {
            self.sink.dismiss(id);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::recording::{RecordingSink, SinkCall};
    use super::*;

    #[test]
    fn queue_keeps_only_latest_notice() {
        let mut q = NoticeQueue::new(DEFAULT_NOTICE_DURATION);
        let (first, superseded) = q.push("first", Severity::Info);
        assert!(superseded.is_none());
        let (second, superseded) = q.push("second", Severity::Error);
        assert_eq!(superseded.map(|n| n.id), Some(first.id));
        assert!(second.id > first.id);
    }

    #[test]
    fn removing_superseded_notice_is_noop() {
        let mut q = NoticeQueue::new(DEFAULT_NOTICE_DURATION);
        let (first, _) = q.push("first", Severity::Info);
        let (second, _) = q.push("second", Severity::Info);
        assert!(q.remove(first.id).is_none());
        assert_eq!(q.remove(second.id).map(|n| n.message), Some("second".into()));
        assert!(q.remove(second.id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn second_notify_removes_first_before_showing() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::new(DEFAULT_NOTICE_DURATION, sink.clone());

        notifier.notify("one", Severity::Info);
        notifier.notify("two", Severity::Error);

        assert_eq!(
            sink.calls(),
            vec![
                SinkCall::Show(1, Severity::Info, "one".into()),
                SinkCall::Dismiss(1),
                SinkCall::Show(2, Severity::Error, "two".into()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn notice_expires_after_five_seconds() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::new(DEFAULT_NOTICE_DURATION, sink.clone());

        notifier.notify("done", Severity::Success);
        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert_eq!(sink.calls().len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(sink.calls().last(), Some(&SinkCall::Dismiss(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timer_does_not_remove_newer_notice() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::new(DEFAULT_NOTICE_DURATION, sink.clone());

        notifier.notify("old", Severity::Info);
        tokio::time::sleep(Duration::from_secs(3)).await;
        notifier.notify("new", Severity::Info);

        // The first timer fires at 5 s; the second notice must survive it.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(
            sink.calls().last(),
            Some(&SinkCall::Show(2, Severity::Info, "new".into()))
        );

        tokio::time::sleep(Duration::from_secs(3)).await;
        let dismissals: Vec<_> = sink
            .calls()
            .into_iter()
            .filter(|c| matches!(c, SinkCall::Dismiss(_)))
            .collect();
        assert_eq!(dismissals, vec![SinkCall::Dismiss(1), SinkCall::Dismiss(2)]);
    }

    #[test]
    fn explicit_dismiss_ignores_replaced_notice() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::new(DEFAULT_NOTICE_DURATION, sink.clone());
        notifier.notify("a", Severity::Info);
        notifier.notify("b", Severity::Info);
        notifier.dismiss(1);
        notifier.dismiss(2);
        notifier.dismiss(2);
        assert_eq!(
            sink.calls(),
            vec![
                SinkCall::Show(1, Severity::Info, "a".into()),
                SinkCall::Dismiss(1),
                SinkCall::Show(2, Severity::Info, "b".into()),
                SinkCall::Dismiss(2),
            ]
        );
    }
}
