use foundation::LayerId;
use runtime::{Notification, NotificationKind};

/// Problems found while reconciling. All of them are recovered locally; the
/// user sees a notification and the corrected state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileIssue {
    #[error("Invalid layer identifier: {id}")]
    InvalidLayerIdentifier { id: LayerId },
    #[error("Invalid date in address: {raw:?}. Showing {fallback} instead.")]
    InvalidDate { raw: String, fallback: String },
    #[error("No dates overlap between {kept} and {removed}. {removed} has been removed.")]
    NoDateOverlap { removed: String, kept: String },
    #[error("No data for {layer} on {requested}. The closest date, {substituted}, has been loaded instead.")]
    LayerDataUnavailable {
        layer: String,
        requested: String,
        substituted: String,
    },
}

impl ReconcileIssue {
    pub fn kind(&self) -> NotificationKind {
        match self {
            ReconcileIssue::InvalidLayerIdentifier { .. } => NotificationKind::Error,
            ReconcileIssue::InvalidDate { .. }
            | ReconcileIssue::NoDateOverlap { .. }
            | ReconcileIssue::LayerDataUnavailable { .. } => NotificationKind::Warning,
        }
    }

    pub fn to_notification(&self) -> Notification {
        Notification::new(self.kind(), self.to_string())
    }
}
