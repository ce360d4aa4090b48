use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{ListingId, UserId};

/// Owner facing lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ListingEvent {
    Approved {
        listing_id: ListingId,
        owner_id: UserId,
        title: String,
    },
    Rejected {
        listing_id: ListingId,
        owner_id: UserId,
        title: String,
        reason: String,
    },
    Expired {
        listing_id: ListingId,
        owner_id: UserId,
        title: String,
    },
}

impl ListingEvent {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Approved { .. } => "approved",
            Self::Rejected { .. } => "rejected",
            Self::Expired { .. } => "expired",
        }
    }

    pub const fn listing_id(&self) -> ListingId {
        match self {
            Self::Approved { listing_id, .. }
            | Self::Rejected { listing_id, .. }
            | Self::Expired { listing_id, .. } => *listing_id,
        }
    }
}

/// Outbound notification hook (e-mail, push). Delivery is best-effort.
pub trait ListingNotifier: Send + Sync {
    fn notify(&self, event: ListingEvent) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Notifier that only writes the event to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl ListingNotifier for LogNotifier {
    fn notify(&self, event: ListingEvent) -> Result<(), NotificationError> {
        info!(
            event = event.label(),
            listing_id = %event.listing_id(),
            "listing notification"
        );
        Ok(())
    }
}
