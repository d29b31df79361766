use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use notify_core::platform::Callback;
use notify_core::{
    LifecycleEvent, NotificationRequest, NotificationService, Permission, Platform, PlatformError,
    PlatformNotification, SchedulerConfig, ShowOptions, SystemClock,
};
use serde_json::json;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) run_for: Duration,
    pub(crate) repeat_unit: String,
    pub(crate) scheduler: SchedulerConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(seconds) = std::env::var("LOCAL_NOTIFY_DEMO_SECONDS") {
            if let Ok(value) = seconds.trim().parse::<u64>() {
                if value > 0 {
                    config.run_for = Duration::from_secs(value);
                }
            }
        }
        if let Ok(unit) = std::env::var("LOCAL_NOTIFY_REPEAT") {
            if !unit.trim().is_empty() {
                config.repeat_unit = unit.trim().to_string();
            }
        }
        config.scheduler = SchedulerConfig::from_env()?;
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            run_for: Duration::from_secs(5),
            repeat_unit: "second".to_string(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// Prints notifications to the log instead of a desktop surface.
struct ConsolePlatform;

struct ConsoleNotification {
    tag: String,
    on_close: Option<Callback>,
}

impl PlatformNotification for ConsoleNotification {
    fn close(&mut self) -> Result<(), PlatformError> {
        info!(tag = %self.tag, "notification closed");
        if let Some(mut on_close) = self.on_close.take() {
            on_close();
        }
        Ok(())
    }

    fn set_on_click(&mut self, _callback: Option<Callback>) {}

    fn set_on_close(&mut self, callback: Option<Callback>) {
        self.on_close = callback;
    }
}

impl Platform for ConsolePlatform {
    fn current_permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    fn show(&self, options: &ShowOptions) -> Result<Box<dyn PlatformNotification>, PlatformError> {
        info!(
            title = %options.title,
            body = options.body.as_deref().unwrap_or(""),
            "notification shown"
        );
        Ok(Box::new(ConsoleNotification {
            tag: options.tag.clone().unwrap_or_default(),
            on_close: None,
        }))
    }
}

pub fn run(config: AppConfig) -> Result<()> {
    let mut service = NotificationService::builder()
        .with_clock(Arc::new(SystemClock))
        .with_platform(Arc::new(ConsolePlatform))
        .with_config(config.scheduler.clone())
        .with_listener(Box::new(|event: &LifecycleEvent| {
            info!(event = %event.kind, id = event.id().unwrap_or("-"), "lifecycle event");
        }))
        .build()
        .context("failed to build notification service")?;

    let now = Utc::now().timestamp();
    let accepted = service.schedule(vec![
        NotificationRequest::new("welcome", "Local notifications").with_body("Scheduler started"),
        NotificationRequest::new("reminder", "Reminder")
            .with_body("Two seconds have passed")
            .with_data(json!({ "source": "demo" }))
            .at(now + 2),
        NotificationRequest::new("heartbeat", "Heartbeat").every(config.repeat_unit.clone()),
    ]);
    info!(count = accepted.len(), "scheduled demo notifications");

    let started = Instant::now();
    while let Some(remaining) = config.run_for.checked_sub(started.elapsed()) {
        let wait = service
            .next_deadline()
            .map(|deadline| (deadline - Utc::now()).to_std().unwrap_or_default())
            .map_or(remaining, |until| until.min(remaining));
        debug!(?wait, "sleeping until next timer");
        std::thread::sleep(wait);
        service.run_due();
    }

    service.cancel_all();
    info!(ids = ?service.get_all_ids(), "cancelled demo notifications");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn console_close_reports_back_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&closes);
        let mut handle = ConsolePlatform
            .show(&ShowOptions {
                title: "t".into(),
                tag: Some("t".into()),
                ..ShowOptions::default()
            })
            .expect("console show never fails");
        handle.set_on_close(Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        handle.close().expect("close");
        handle.close().expect("close twice");
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_config_runs_briefly() {
        let config = AppConfig::default();
        assert_eq!(config.run_for, Duration::from_secs(5));
        assert_eq!(config.repeat_unit, "second");
    }
}
