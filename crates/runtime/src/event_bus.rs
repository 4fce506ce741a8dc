use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
}

/// A user-facing message. Delivery is fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

pub trait NotificationSink {
    fn notify(&mut self, notification: Notification);
}

/// Notification as recorded by [`NotificationBus`], tagged with its arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Posted {
    pub seq: u64,
    #[serde(flatten)]
    pub notification: Notification,
}

/// In-process notification channel. Keeps everything until drained.
#[derive(Debug, Default)]
pub struct NotificationBus {
    next_seq: u64,
    posted: Vec<Posted>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posted(&self) -> &[Posted] {
        &self.posted
    }

    pub fn drain(&mut self) -> Vec<Posted> {
        std::mem::take(&mut self.posted)
    }
}

impl NotificationSink for NotificationBus {
    fn notify(&mut self, notification: Notification) {
        tracing::debug!(
            seq = self.next_seq,
            kind = ?notification.kind,
            "{}",
            notification.message
        );
        self.posted.push(Posted {
            seq: self.next_seq,
            notification,
        });
        self.next_seq += 1;
    }
}
