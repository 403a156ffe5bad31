use chrono::{
    DateTime,
    Local,
};
use std::{
    collections::VecDeque,
    time::{
        Duration,
        Instant,
    },
};

pub const DEFAULT_TOAST_LIFETIME: Duration = Duration::from_secs(5);
const MAX_VISIBLE_TOASTS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Position {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Icon {
    Bell,
    Check,
    Cross,
}

impl Icon {
    pub fn glyph(self) -> &'static str {
        match self {
            Icon::Bell => "🔔",
            Icon::Check => "✅",
            Icon::Cross => "❌",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub position: Position,
    pub icon: Icon,
}

impl Notification {
    /// Toast raised once an entry transaction has been included.
    pub fn transaction_complete() -> Self {
        Self {
            kind: NotificationKind::Info,
            title: String::from("Tx Notification"),
            message: String::from("Transaction complete!"),
            position: Position::TopRight,
            icon: Icon::Bell,
        }
    }
}

/// Fire-and-forget receiver of notifications.
pub trait NotificationSink {
    fn dispatch(&mut self, notification: Notification);
}

impl NotificationSink for Vec<Notification> {
    fn dispatch(&mut self, notification: Notification) {
        self.push(notification);
    }
}

#[derive(Clone, Debug)]
pub struct Toast {
    pub notification: Notification,
    pub raised_at: Instant,
    pub dispatched_at: DateTime<Local>,
}

#[derive(Debug)]
pub struct ToastQueue {
    toasts: VecDeque<Toast>,
    lifetime: Duration,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(DEFAULT_TOAST_LIFETIME)
    }
}

impl ToastQueue {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            toasts: VecDeque::new(),
            lifetime,
        }
    }

    pub fn push_at(&mut self, notification: Notification, now: Instant) {
        if self.toasts.len() == MAX_VISIBLE_TOASTS {
            self.toasts.pop_front();
        }
        self.toasts.push_back(Toast {
            notification,
            raised_at: now,
            dispatched_at: Local::now(),
        });
    }

    /// Drops toasts older than the lifetime. Returns whether anything was removed.
    pub fn expire(&mut self, now: Instant) -> bool {
        let before = self.toasts.len();
        let lifetime = self.lifetime;
        self.toasts
            .retain(|toast| now.saturating_duration_since(toast.raised_at) < lifetime);
        before != self.toasts.len()
    }

    pub fn visible(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

impl NotificationSink for ToastQueue {
    fn dispatch(&mut self, notification: Notification) {
        tracing::info!(title = %notification.title, message = %notification.message, "notification");
        self.push_at(notification, Instant::now());
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn expire__removes_only_toasts_past_their_lifetime() {
        // given
        let start = Instant::now();
        let mut queue = ToastQueue::new(Duration::from_secs(5));
        queue.push_at(Notification::transaction_complete(), start);
        queue.push_at(
            Notification::transaction_complete(),
            start + Duration::from_secs(3),
        );

        // when
        let changed = queue.expire(start + Duration::from_secs(6));

        // then
        assert!(changed);
        assert_eq!(queue.len(), 1);
        assert!(!queue.expire(start + Duration::from_secs(7)));
    }

    #[test]
    fn push_at__full_queue__drops_oldest() {
        // given
        let start = Instant::now();
        let mut queue = ToastQueue::default();
        for i in 0..MAX_VISIBLE_TOASTS {
            let mut note = Notification::transaction_complete();
            note.message = format!("#{i}");
            queue.push_at(note, start);
        }

        // when
        let mut newest = Notification::transaction_complete();
        newest.message = String::from("newest");
        queue.push_at(newest, start);

        // then
        let messages: Vec<_> = queue
            .visible()
            .map(|t| t.notification.message.clone())
            .collect();
        assert_eq!(messages.len(), MAX_VISIBLE_TOASTS);
        assert_eq!(messages.first().map(String::as_str), Some("#1"));
        assert_eq!(messages.last().map(String::as_str), Some("newest"));
    }

    #[test]
    fn transaction_complete__is_top_right_info_bell() {
        let note = Notification::transaction_complete();
        assert_eq!(note.kind, NotificationKind::Info);
        assert_eq!(note.position, Position::TopRight);
        assert_eq!(note.icon, Icon::Bell);
        assert_eq!(note.title, "Tx Notification");
    }
}
