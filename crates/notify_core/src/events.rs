use std::fmt;

use serde::{Deserialize, Serialize};

use crate::request::NotificationRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Schedule,
    Trigger,
    Update,
    Click,
    Clear,
    ClearAll,
    Cancel,
    CancelAll,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Schedule => "schedule",
            EventKind::Trigger => "trigger",
            EventKind::Update => "update",
            EventKind::Click => "click",
            EventKind::Clear => "clear",
            EventKind::ClearAll => "clearall",
            EventKind::Cancel => "cancel",
            EventKind::CancelAll => "cancelall",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle notification sent to the host. `*all` events carry no request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub request: Option<NotificationRequest>,
}

impl LifecycleEvent {
    pub fn id(&self) -> Option<&str> {
        self.request.as_ref().map(|request| request.id.as_str())
    }
}

/// Host-side receiver of lifecycle events. Delivery is fire-and-forget.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent);
}

impl<F> EventListener for F
where
    F: Fn(&LifecycleEvent) + Send + Sync,
{
    fn on_event(&self, event: &LifecycleEvent) {
        self(event)
    }
}
