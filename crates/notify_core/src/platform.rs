use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::PlatformError;
use crate::request::ShowOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    Undetermined,
}

pub type Callback = Box<dyn FnMut() + Send>;

/// A notification currently shown by the platform.
pub trait PlatformNotification: Send {
    fn close(&mut self) -> Result<(), PlatformError>;
    fn set_on_click(&mut self, callback: Option<Callback>);
    fn set_on_close(&mut self, callback: Option<Callback>);
}

/// Host adapter that owns permissions and the actual notification surface.
pub trait Platform: Send + Sync {
    fn is_supported(&self) -> bool {
        true
    }
    fn current_permission(&self) -> Permission;
    fn request_permission(&self) -> Permission;
    fn show(&self, options: &ShowOptions) -> Result<Box<dyn PlatformNotification>, PlatformError>;
}

/// Placeholder used when the host wires no platform at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedPlatform;

impl Platform for UnsupportedPlatform {
    fn is_supported(&self) -> bool {
        false
    }

    fn current_permission(&self) -> Permission {
        Permission::Denied
    }

    fn request_permission(&self) -> Permission {
        Permission::Denied
    }

    fn show(&self, _options: &ShowOptions) -> Result<Box<dyn PlatformNotification>, PlatformError> {
        Err(PlatformError::Unsupported)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Click,
    Close,
}

/// User interaction reported by a platform handle, tagged with the show generation it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSignal {
    pub id: String,
    pub generation: u64,
    pub kind: SignalKind,
}

/// Queue between platform callbacks and the scheduler. Callbacks only push;
/// the scheduler drains on its own turn, so no callback ever re-enters the registry.
#[derive(Debug, Clone, Default)]
pub struct SignalInbox {
    queue: Arc<Mutex<VecDeque<PlatformSignal>>>,
}

impl SignalInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, signal: PlatformSignal) {
        self.queue.lock().push_back(signal);
    }

    pub fn drain(&self) -> Vec<PlatformSignal> {
        self.queue.lock().drain(..).collect()
    }

    pub fn callback(&self, id: &str, generation: u64, kind: SignalKind) -> Callback {
        let inbox = self.clone();
        let id = id.to_string();
        Box::new(move || {
            inbox.push(PlatformSignal {
                id: id.clone(),
                generation,
                kind,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callbacks_enqueue_tagged_signals() {
        let inbox = SignalInbox::new();
        let mut on_click = inbox.callback("a", 3, SignalKind::Click);
        on_click();
        on_click();

        let drained = inbox.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].generation, 3);
        assert_eq!(drained[0].kind, SignalKind::Click);
        assert!(inbox.drain().is_empty());
    }
}
