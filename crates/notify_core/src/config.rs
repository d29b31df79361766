use anyhow::{Context, Result};
use chrono::Duration;

const IMMEDIATE_THRESHOLD_ENV: &str = "LOCAL_NOTIFY_IMMEDIATE_THRESHOLD_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Delays shorter than this fire immediately instead of arming a timer.
    pub immediate_threshold: Duration,
}

impl SchedulerConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(IMMEDIATE_THRESHOLD_ENV) {
            let millis = raw
                .trim()
                .parse::<i64>()
                .with_context(|| format!("invalid {IMMEDIATE_THRESHOLD_ENV} value `{raw}`"))?;
            config.immediate_threshold = Duration::milliseconds(millis.max(0));
        }
        Ok(config)
    }

    pub fn with_immediate_threshold(mut self, threshold: Duration) -> Self {
        self.immediate_threshold = threshold;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            immediate_threshold: Duration::milliseconds(1000),
        }
    }
}
