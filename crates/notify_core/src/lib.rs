//! In-process scheduler for local notifications.
//!
//! [`NotificationScheduler`] owns the registry and timer wheel and drives each
//! notification through its lifecycle; [`NotificationService`] exposes the
//! request-level operations a host calls.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod platform;
pub mod request;
pub mod scheduler;
pub mod service;
pub mod timer;

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::SchedulerConfig;
pub use crate::error::PlatformError;
pub use crate::events::{EventKind, EventListener, LifecycleEvent};
pub use crate::platform::{Permission, Platform, PlatformNotification};
pub use crate::request::{NotificationPatch, NotificationRequest, RepeatUnit, ShowOptions};
pub use crate::scheduler::{NotificationScheduler, NotificationSnapshot};
pub use crate::service::{NotificationService, NotificationServiceBuilder, Selection};
