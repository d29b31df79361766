use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::{
    clock::{Clock, SystemClock},
    config::SchedulerConfig,
    events::{EventKind, EventListener},
    platform::{Permission, Platform, UnsupportedPlatform},
    request::{NotificationPatch, NotificationRequest},
    scheduler::{NotificationScheduler, NotificationSnapshot},
};

/// Which records a query looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    Scheduled,
    Triggered,
}

impl Selection {
    fn matches(self, snapshot: &NotificationSnapshot, now: DateTime<Utc>) -> bool {
        match self {
            Selection::All => true,
            Selection::Scheduled => snapshot.is_scheduled(now),
            Selection::Triggered => snapshot.is_triggered(now),
        }
    }
}

/// Request-level operations over a [`NotificationScheduler`].
pub struct NotificationService {
    scheduler: NotificationScheduler,
}

pub struct NotificationServiceBuilder {
    clock: Option<Arc<dyn Clock>>,
    platform: Option<Arc<dyn Platform>>,
    config: Option<SchedulerConfig>,
    listeners: Vec<Box<dyn EventListener>>,
}

impl NotificationServiceBuilder {
    pub fn new() -> Self {
        Self {
            clock: None,
            platform: None,
            config: None,
            listeners: Vec::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_platform(mut self, platform: Arc<dyn Platform>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_listener(mut self, listener: Box<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Falls back to the system clock, an unsupported platform and environment config.
    pub fn build(self) -> Result<NotificationService> {
        let config = match self.config {
            Some(config) => config,
            None => SchedulerConfig::from_env()?,
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let platform = self
            .platform
            .unwrap_or_else(|| Arc::new(UnsupportedPlatform));
        let mut scheduler = NotificationScheduler::new(clock, platform, config);
        for listener in self.listeners {
            scheduler.subscribe(listener);
        }
        Ok(NotificationService { scheduler })
    }
}

impl Default for NotificationServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationService {
    pub fn builder() -> NotificationServiceBuilder {
        NotificationServiceBuilder::new()
    }

    pub fn scheduler(&self) -> &NotificationScheduler {
        &self.scheduler
    }

    pub fn subscribe(&mut self, listener: Box<dyn EventListener>) {
        self.scheduler.subscribe(listener);
    }

    /// Registers and arms each request. Returns the identities that were accepted,
    /// which is empty when the platform is unsupported or permission is withheld.
    #[instrument(skip(self, requests), fields(count = requests.len()))]
    pub fn schedule(&mut self, requests: Vec<NotificationRequest>) -> Vec<String> {
        self.scheduler.process_signals();
        if !self.permission_granted() {
            return Vec::new();
        }
        let mut accepted = Vec::with_capacity(requests.len());
        for mut request in requests {
            let id = request.ensure_id().to_string();
            self.scheduler.register(request);
            self.scheduler.arm(&id);
            accepted.push(id);
        }
        accepted
    }

    /// Merges each patch over its stored request and re-arms it. Unknown ids are skipped.
    #[instrument(skip(self, patches), fields(count = patches.len()))]
    pub fn update(&mut self, patches: Vec<NotificationPatch>) -> Vec<String> {
        self.scheduler.process_signals();
        let mut updated = Vec::new();
        for patch in patches {
            let Some(mut request) = self.scheduler.request(&patch.id).cloned() else {
                tracing::debug!(id = %patch.id, "ignoring update for unknown notification");
                continue;
            };
            let id = patch.id.clone();
            self.scheduler.disarm(&id);
            self.scheduler.clear(&id, false);
            patch.apply_to(&mut request);
            self.scheduler.register(request);
            self.scheduler.arm(&id);
            let current = self.scheduler.request(&id).cloned();
            self.scheduler.emit(EventKind::Update, current);
            updated.push(id);
        }
        updated
    }

    /// Closes shown notifications; repeat timers stay armed.
    #[instrument(skip(self))]
    pub fn clear(&mut self, ids: &[String]) {
        self.scheduler.process_signals();
        for id in ids {
            self.scheduler.clear(id, true);
        }
    }

    #[instrument(skip(self))]
    pub fn clear_all(&mut self) {
        self.scheduler.process_signals();
        for id in self.known_ids() {
            self.scheduler.clear(&id, false);
        }
        self.scheduler.emit(EventKind::ClearAll, None);
    }

    #[instrument(skip(self))]
    pub fn cancel(&mut self, ids: &[String]) {
        self.scheduler.process_signals();
        for id in ids {
            if !self.scheduler.cancel(id) {
                tracing::debug!(id = %id, "ignoring cancel for unknown notification");
            }
        }
    }

    #[instrument(skip(self))]
    pub fn cancel_all(&mut self) {
        self.scheduler.process_signals();
        for id in self.known_ids() {
            self.scheduler.disarm(&id);
            self.scheduler.clear(&id, false);
        }
        self.scheduler.emit(EventKind::CancelAll, None);
    }

    /// Fires due timers and applies pending platform signals.
    pub fn run_due(&mut self) -> usize {
        self.scheduler.run_due()
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.scheduler.next_deadline()
    }

    pub fn is_present(&self, id: &str) -> Option<bool> {
        self.scheduler.snapshot(id).map(|snapshot| snapshot.present)
    }

    pub fn is_scheduled(&self, id: &str) -> Option<bool> {
        let now = self.scheduler.now();
        self.scheduler
            .snapshot(id)
            .map(|snapshot| snapshot.is_scheduled(now))
    }

    pub fn is_triggered(&self, id: &str) -> Option<bool> {
        let now = self.scheduler.now();
        self.scheduler
            .snapshot(id)
            .map(|snapshot| snapshot.is_triggered(now))
    }

    pub fn get_all_ids(&self) -> Vec<String> {
        self.known_ids()
    }

    pub fn get_scheduled_ids(&self, ids: &[String]) -> Vec<String> {
        self.select_ids(Selection::Scheduled, ids)
    }

    pub fn get_triggered_ids(&self, ids: &[String]) -> Vec<String> {
        self.select_ids(Selection::Triggered, ids)
    }

    pub fn get_all(&self, ids: &[String]) -> Vec<NotificationRequest> {
        self.select_requests(Selection::All, ids)
    }

    pub fn get_scheduled(&self, ids: &[String]) -> Vec<NotificationRequest> {
        self.select_requests(Selection::Scheduled, ids)
    }

    pub fn get_triggered(&self, ids: &[String]) -> Vec<NotificationRequest> {
        self.select_requests(Selection::Triggered, ids)
    }

    /// First match of [`get_all`](Self::get_all); nothing when `ids` is empty.
    pub fn get_single(&self, ids: &[String]) -> Option<NotificationRequest> {
        self.select_single(Selection::All, ids)
    }

    pub fn get_single_scheduled(&self, ids: &[String]) -> Option<NotificationRequest> {
        self.select_single(Selection::Scheduled, ids)
    }

    pub fn get_single_triggered(&self, ids: &[String]) -> Option<NotificationRequest> {
        self.select_single(Selection::Triggered, ids)
    }

    /// Snapshots matching `selection`, limited to `ids` unless it is empty.
    pub fn select(&self, selection: Selection, ids: &[String]) -> Vec<NotificationSnapshot> {
        let now = self.scheduler.now();
        self.scheduler
            .snapshots()
            .into_iter()
            .filter(|snapshot| {
                selection.matches(snapshot, now)
                    && (ids.is_empty() || ids.iter().any(|id| id == snapshot.id()))
            })
            .collect()
    }

    fn select_ids(&self, selection: Selection, ids: &[String]) -> Vec<String> {
        self.select(selection, ids)
            .into_iter()
            .map(|snapshot| snapshot.request.id)
            .collect()
    }

    fn select_requests(&self, selection: Selection, ids: &[String]) -> Vec<NotificationRequest> {
        self.select(selection, ids)
            .into_iter()
            .map(|snapshot| snapshot.request)
            .collect()
    }

    fn select_single(&self, selection: Selection, ids: &[String]) -> Option<NotificationRequest> {
        if ids.is_empty() {
            return None;
        }
        self.select_requests(selection, ids).into_iter().next()
    }

    fn known_ids(&self) -> Vec<String> {
        self.scheduler.ids().map(str::to_string).collect()
    }

    fn permission_granted(&self) -> bool {
        let platform = self.scheduler.platform();
        if !platform.is_supported() {
            tracing::warn!("platform does not support notifications");
            return false;
        }
        match platform.current_permission() {
            Permission::Granted => true,
            Permission::Denied => {
                tracing::debug!("notification permission denied");
                false
            }
            Permission::Undetermined => {
                let granted = platform.request_permission() == Permission::Granted;
                tracing::info!(granted, "requested notification permission");
                granted
            }
        }
    }
}
