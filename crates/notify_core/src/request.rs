use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Caller-supplied description of a local notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "text", skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Absolute trigger time in epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub every: Option<String>,
}

impl NotificationRequest {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn at(mut self, epoch_seconds: i64) -> Self {
        self.at = Some(epoch_seconds);
        self
    }

    pub fn every(mut self, unit: impl Into<String>) -> Self {
        self.every = Some(unit.into());
        self
    }

    /// Fills in a random identity when none was supplied.
    pub fn ensure_id(&mut self) -> &str {
        if self.id.is_empty() {
            self.id = uuid::Uuid::new_v4().to_string();
        }
        &self.id
    }

    /// Period between repeats, zero when `every` is missing or unrecognised.
    pub fn repeat_interval(&self) -> Duration {
        let Some(every) = self.every.as_deref() else {
            return Duration::zero();
        };
        match every.parse::<RepeatUnit>() {
            Ok(unit) => unit.interval(),
            Err(err) => {
                tracing::debug!(id = %self.id, %err, "treating notification as non-repeating");
                Duration::zero()
            }
        }
    }

    /// Options handed to the platform when the notification is shown.
    pub fn show_options(&self) -> ShowOptions {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        let icon = non_empty(&self.icon);
        ShowOptions {
            title: self.title.clone(),
            body: non_empty(&self.body),
            kind: icon.as_ref().map(|_| "image".to_string()),
            icon,
            tag: Some(self.id.clone()).filter(|id| !id.is_empty()),
            data: self.data.clone().filter(|data| !data.is_null()),
        }
    }
}

/// Partial request used by `update`; present fields overwrite the stored ones.
/// `at` and `every` distinguish an absent key (`None`) from an explicit null
/// (`Some(None)`), which resets the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPatch {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "text")]
    pub body: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub at: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present_or_null", skip_serializing_if = "Option::is_none")]
    pub every: Option<Option<String>>,
}

/// Only called for keys that are present, so a null becomes `Some(None)`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl NotificationPatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn at(mut self, epoch_seconds: i64) -> Self {
        self.at = Some(Some(epoch_seconds));
        self
    }

    /// Resets the trigger time so the notification fires immediately.
    pub fn clear_at(mut self) -> Self {
        self.at = Some(None);
        self
    }

    pub fn every(mut self, unit: impl Into<String>) -> Self {
        self.every = Some(Some(unit.into()));
        self
    }

    /// Resets the repeat unit so the notification fires once.
    pub fn once(mut self) -> Self {
        self.every = Some(None);
        self
    }

    pub fn apply_to(self, request: &mut NotificationRequest) {
        if let Some(title) = self.title {
            request.title = title;
        }
        if self.body.is_some() {
            request.body = self.body;
        }
        if self.icon.is_some() {
            request.icon = self.icon;
        }
        if self.data.is_some() {
            request.data = self.data;
        }
        if let Some(at) = self.at {
            request.at = at;
        }
        if let Some(every) = self.every {
            request.every = every;
        }
    }
}

/// Normalized options for the platform `show` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowOptions {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl RepeatUnit {
    /// Fixed-length approximation; months, quarters and years are not calendar aware.
    pub fn interval(self) -> Duration {
        const DAY: i64 = 24 * 60 * 60;
        let seconds = match self {
            RepeatUnit::Second => 1,
            RepeatUnit::Minute => 60,
            RepeatUnit::Hour => 60 * 60,
            RepeatUnit::Day => DAY,
            RepeatUnit::Week => DAY * 7,
            RepeatUnit::Month => DAY * 30,
            RepeatUnit::Quarter => DAY * 30 * 4,
            RepeatUnit::Year => DAY * 356,
        };
        Duration::seconds(seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown repeat unit `{0}`")]
pub struct UnknownRepeatUnit(pub String);

impl FromStr for RepeatUnit {
    type Err = UnknownRepeatUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "second" => Ok(RepeatUnit::Second),
            "minute" => Ok(RepeatUnit::Minute),
            "hour" => Ok(RepeatUnit::Hour),
            "day" => Ok(RepeatUnit::Day),
            "week" => Ok(RepeatUnit::Week),
            "month" => Ok(RepeatUnit::Month),
            "quarter" => Ok(RepeatUnit::Quarter),
            "year" => Ok(RepeatUnit::Year),
            _ => Err(UnknownRepeatUnit(s.to_string())),
        }
    }
}
