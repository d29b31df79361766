use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::events::{EventKind, EventListener, LifecycleEvent};
use crate::platform::{Platform, PlatformNotification, SignalInbox, SignalKind};
use crate::request::NotificationRequest;
use crate::timer::{TimerId, TimerWheel};

/// The scheduler's record for one identity.
struct TrackedNotification {
    request: NotificationRequest,
    present: bool,
    timer: Option<TimerId>,
    trigger_date: Option<DateTime<Utc>>,
    repeat_interval: Duration,
    /// Delay computed when the record was last armed; decides schedule vs trigger.
    initial_delay: Duration,
    generation: u64,
    platform: Option<Box<dyn PlatformNotification>>,
}

impl TrackedNotification {
    fn new(request: NotificationRequest, generation: u64) -> Self {
        let repeat_interval = request.repeat_interval();
        Self {
            request,
            present: false,
            timer: None,
            trigger_date: None,
            repeat_interval,
            initial_delay: Duration::zero(),
            generation,
            platform: None,
        }
    }

    fn snapshot(&self) -> NotificationSnapshot {
        NotificationSnapshot {
            request: self.request.clone(),
            present: self.present,
            armed: self.timer.is_some(),
            trigger_date: self.trigger_date,
            repeat_interval: self.repeat_interval,
        }
    }
}

/// Immutable copy of a record; status predicates are derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationSnapshot {
    pub request: NotificationRequest,
    pub present: bool,
    pub armed: bool,
    pub trigger_date: Option<DateTime<Utc>>,
    pub repeat_interval: Duration,
}

impl NotificationSnapshot {
    pub fn id(&self) -> &str {
        &self.request.id
    }

    pub fn was_in_the_past(&self, now: DateTime<Utc>) -> bool {
        self.trigger_date.is_some_and(|date| date < now)
    }

    pub fn is_scheduled(&self, now: DateTime<Utc>) -> bool {
        !self.was_in_the_past(now) && self.armed
    }

    pub fn is_triggered(&self, now: DateTime<Utc>) -> bool {
        self.was_in_the_past(now)
    }
}

/// Owns the registry of tracked notifications and the timers that drive them.
pub struct NotificationScheduler {
    clock: Arc<dyn Clock>,
    platform: Arc<dyn Platform>,
    config: SchedulerConfig,
    listeners: Vec<Box<dyn EventListener>>,
    records: HashMap<String, TrackedNotification>,
    order: Vec<String>,
    timers: TimerWheel,
    inbox: SignalInbox,
}

impl NotificationScheduler {
    pub fn new(
        clock: Arc<dyn Clock>,
        platform: Arc<dyn Platform>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            clock,
            platform,
            config,
            listeners: Vec::new(),
            records: HashMap::new(),
            order: Vec::new(),
            timers: TimerWheel::new(),
            inbox: SignalInbox::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn EventListener>) {
        self.listeners.push(listener);
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn request(&self, id: &str) -> Option<&NotificationRequest> {
        self.records.get(id).map(|record| &record.request)
    }

    pub fn snapshot(&self, id: &str) -> Option<NotificationSnapshot> {
        self.records.get(id).map(TrackedNotification::snapshot)
    }

    /// Snapshots of every record in registration order.
    pub fn snapshots(&self) -> Vec<NotificationSnapshot> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .map(TrackedNotification::snapshot)
            .collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn armed_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.next_deadline()
    }

    /// Creates or replaces the record for `request.id`, disarming any previous timer first.
    pub fn register(&mut self, request: NotificationRequest) {
        let id = request.id.clone();
        let mut generation = 0;
        if let Some(mut previous) = self.records.remove(&id) {
            if let Some(timer) = previous.timer.take() {
                self.timers.disarm(timer);
            }
            if let Some(handle) = previous.platform.take() {
                Self::close_quietly(&id, handle);
            }
            generation = previous.generation + 1;
        } else {
            self.order.push(id.clone());
        }
        tracing::debug!(id = %id, "registered notification");
        self.records.insert(id, TrackedNotification::new(request, generation));
    }

    /// Time until `request.at`. Zero when unset, below the immediate threshold,
    /// or too far out to be represented as a deadline.
    pub fn compute_delay(&self, request: &NotificationRequest) -> Duration {
        let Some(at) = request.at else {
            return Duration::zero();
        };
        let now = self.clock.now();
        let delay = at
            .checked_mul(1000)
            .and_then(|at_ms| at_ms.checked_sub(now.timestamp_millis()))
            .and_then(Duration::try_milliseconds)
            .filter(|delay| now.checked_add_signed(*delay).is_some());
        match delay {
            Some(delay) if delay >= self.config.immediate_threshold => delay,
            Some(_) => Duration::zero(),
            None => {
                tracing::debug!(id = %request.id, at, "trigger time out of range, firing now");
                Duration::zero()
            }
        }
    }

    /// Arms a single-shot timer for the record, or fires it right away when it is due.
    pub fn arm(&mut self, id: &str) {
        self.disarm(id);
        let Some(request) = self.request(id) else {
            return;
        };
        let delay = self.compute_delay(request);
        let deadline = self
            .clock
            .now()
            .checked_add_signed(delay)
            .filter(|_| !delay.is_zero());
        if let Some(record) = self.records.get_mut(id) {
            if let Some(deadline) = deadline {
                record.initial_delay = delay;
                record.timer = Some(self.timers.arm(deadline, id));
                tracing::debug!(id = %id, %deadline, "armed notification timer");
                return;
            }
            record.initial_delay = Duration::zero();
            tracing::debug!(id = %id, "firing notification immediately");
        }
        self.fire(id);
    }

    pub fn disarm(&mut self, id: &str) {
        if let Some(timer) = self.records.get_mut(id).and_then(|record| record.timer.take()) {
            self.timers.disarm(timer);
            tracing::debug!(id = %id, "disarmed notification timer");
        }
    }

    fn fire(&mut self, id: &str) {
        let now = self.clock.now();
        let Some(record) = self.records.get_mut(id) else {
            return;
        };
        record.timer = None;
        let timer_driven = !record.initial_delay.is_zero();
        let past_due = record.snapshot().is_triggered(now)
            || record
                .request
                .at
                .is_some_and(|at| at.saturating_mul(1000) <= now.timestamp_millis());

        if let Some(previous) = record.platform.take() {
            Self::close_quietly(id, previous);
        }
        record.present = false;

        match self.platform.show(&record.request.show_options()) {
            Ok(mut handle) => {
                record.generation += 1;
                handle.set_on_click(Some(self.inbox.callback(
                    id,
                    record.generation,
                    SignalKind::Click,
                )));
                handle.set_on_close(Some(self.inbox.callback(
                    id,
                    record.generation,
                    SignalKind::Close,
                )));
                record.present = true;
                record.platform = Some(handle);
                record.trigger_date = Some(now);
            }
            Err(err) => {
                tracing::warn!(id = %id, %err, "platform failed to show notification");
            }
        }

        if !record.repeat_interval.is_zero() {
            match now.checked_add_signed(record.repeat_interval) {
                Some(deadline) => {
                    record.timer = Some(self.timers.arm(deadline, id));
                    record.initial_delay = record.repeat_interval;
                    tracing::debug!(id = %id, %deadline, "re-armed repeating notification");
                }
                None => {
                    tracing::warn!(id = %id, "repeat deadline out of range, not re-arming");
                }
            }
        }

        if !record.present {
            return;
        }
        let kind = if timer_driven || past_due {
            EventKind::Trigger
        } else {
            EventKind::Schedule
        };
        let request = record.request.clone();
        self.emit(kind, Some(request));
    }

    /// Closes the shown notification, if any. Returns whether anything was closed.
    pub fn clear(&mut self, id: &str, emit_event: bool) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };
        if !record.present {
            return false;
        }
        record.present = false;
        if let Some(handle) = record.platform.take() {
            Self::close_quietly(id, handle);
        }
        let request = record.request.clone();
        if emit_event {
            self.emit(EventKind::Clear, Some(request));
        }
        true
    }

    /// Disarms and closes without a `clear` event, then emits a single `cancel`.
    pub fn cancel(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.disarm(id);
        self.clear(id, false);
        let request = self.request(id).cloned();
        self.emit(EventKind::Cancel, request);
        true
    }

    /// Applies pending click/close signals from platform handles.
    pub fn process_signals(&mut self) {
        for signal in self.inbox.drain() {
            let current = self
                .records
                .get(&signal.id)
                .is_some_and(|record| record.present && record.generation == signal.generation);
            if !current {
                tracing::debug!(id = %signal.id, kind = ?signal.kind, "dropping stale signal");
                continue;
            }
            match signal.kind {
                SignalKind::Click => {
                    let request = self.request(&signal.id).cloned();
                    self.emit(EventKind::Click, request);
                }
                SignalKind::Close => {
                    self.clear(&signal.id, true);
                }
            }
        }
    }

    /// Fires every timer that is due, then returns how many fired.
    pub fn run_due(&mut self) -> usize {
        self.process_signals();
        if self.timers.is_empty() {
            return 0;
        }
        let mut fired = 0;
        while let Some((timer, id)) = self.timers.pop_due(self.clock.now()) {
            let owned = self
                .records
                .get(&id)
                .is_some_and(|record| record.timer == Some(timer));
            if !owned {
                continue;
            }
            self.fire(&id);
            fired += 1;
            self.process_signals();
        }
        fired
    }

    pub(crate) fn emit(&self, kind: EventKind, request: Option<NotificationRequest>) {
        let event = LifecycleEvent { kind, request };
        tracing::debug!(event = %kind, id = ?event.id(), "emitting lifecycle event");
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }

    fn close_quietly(id: &str, mut handle: Box<dyn PlatformNotification>) {
        handle.set_on_click(None);
        handle.set_on_close(None);
        if let Err(err) = handle.close() {
            tracing::debug!(id = %id, %err, "ignoring platform close failure");
        }
    }
}
