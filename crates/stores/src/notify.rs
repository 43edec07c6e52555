use std::collections::VecDeque;
use std::time::{Duration, Instant};

use minidesk_settings::UiPreferences;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub kind: NotificationKind,
    pub shown_at: Instant,
}

/// Fire-and-forget toasts. Each entry expires on its own timer.
/// 自動消失的提示訊息佇列，每則訊息各自計時。
#[derive(Debug)]
pub struct Notifications {
    timeout: Duration,
    next_id: u64,
    entries: VecDeque<Notification>,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Notifications {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            next_id: 0,
            entries: VecDeque::new(),
        }
    }

    pub fn from_preferences(preferences: &UiPreferences) -> Self {
        Self::new(Duration::from_secs(preferences.notification_timeout_secs))
    }

    pub fn show(&mut self, message: impl Into<String>, kind: NotificationKind) -> u64 {
        self.show_at(message, kind, Instant::now())
    }

    pub fn show_at(
        &mut self,
        message: impl Into<String>,
        kind: NotificationKind,
        now: Instant,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_back(Notification {
            id,
            message: message.into(),
            kind,
            shown_at: now,
        });
        id
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.show(message, NotificationKind::Success)
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.show(message, NotificationKind::Error)
    }

    pub fn info(&mut self, message: impl Into<String>) -> u64 {
        self.show(message, NotificationKind::Info)
    }

    /// Entries younger than the timeout, oldest first.
    pub fn visible(&self, now: Instant) -> impl Iterator<Item = &Notification> {
        let timeout = self.timeout;
        self.entries
            .iter()
            .filter(move |entry| now.saturating_duration_since(entry.shown_at) < timeout)
    }

    /// Drops expired entries.
    pub fn prune(&mut self, now: Instant) {
        let timeout = self.timeout;
        self.entries
            .retain(|entry| now.saturating_duration_since(entry.shown_at) < timeout);
    }

    pub fn dismiss(&mut self, id: u64) {
        self.entries.retain(|entry| entry.id != id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_toast_expires_on_its_own_timer() {
        let mut toasts = Notifications::default();
        let start = Instant::now();
        toasts.show_at("saved", NotificationKind::Success, start);
        toasts.show_at(
            "failed",
            NotificationKind::Error,
            start + Duration::from_secs(3),
        );

        let at = |secs| start + Duration::from_secs(secs);
        assert_eq!(toasts.visible(at(4)).count(), 2);
        let left: Vec<_> = toasts.visible(at(6)).map(|toast| toast.message.as_str()).collect();
        assert_eq!(left, vec!["failed"]);
        assert_eq!(toasts.visible(at(9)).count(), 0);

        toasts.prune(at(6));
        assert_eq!(toasts.len(), 1);
    }

    #[test]
    fn dismiss_removes_one_entry() {
        let mut toasts = Notifications::new(Duration::from_secs(60));
        let first = toasts.info("one");
        toasts.info("two");
        toasts.dismiss(first);
        assert_eq!(toasts.len(), 1);
        toasts.dismiss(first);
        assert_eq!(toasts.len(), 1);
    }
}
