//! Maps named bridge actions with JSON arguments onto [`NotificationService`].
//!
//! Every known action succeeds; malformed arguments degrade the same way the
//! service does (no repeat, immediate trigger, skipped entry). Only an unknown
//! action name is reported as an error.

use std::str::FromStr;

use notify_core::{NotificationPatch, NotificationRequest, NotificationService};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("unknown local notification action `{0}`")]
    UnknownAction(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Schedule,
    Update,
    Clear,
    ClearAll,
    Cancel,
    CancelAll,
    IsPresent,
    IsScheduled,
    IsTriggered,
    GetAllIds,
    GetScheduledIds,
    GetTriggeredIds,
    GetSingle,
    GetSingleScheduled,
    GetSingleTriggered,
    GetAll,
    GetScheduled,
    GetTriggered,
}

impl FromStr for Action {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s {
            "schedule" => Action::Schedule,
            "update" => Action::Update,
            "clear" => Action::Clear,
            "clearAll" => Action::ClearAll,
            "cancel" => Action::Cancel,
            "cancelAll" => Action::CancelAll,
            "isPresent" => Action::IsPresent,
            "isScheduled" => Action::IsScheduled,
            "isTriggered" => Action::IsTriggered,
            "getAllIds" => Action::GetAllIds,
            "getScheduledIds" => Action::GetScheduledIds,
            "getTriggeredIds" => Action::GetTriggeredIds,
            "getSingle" => Action::GetSingle,
            "getSingleScheduled" => Action::GetSingleScheduled,
            "getSingleTriggered" => Action::GetSingleTriggered,
            "getAll" => Action::GetAll,
            "getScheduled" => Action::GetScheduled,
            "getTriggered" => Action::GetTriggered,
            other => return Err(BridgeError::UnknownAction(other.to_string())),
        };
        Ok(action)
    }
}

pub struct LocalNotificationBridge {
    service: NotificationService,
}

impl LocalNotificationBridge {
    pub fn new(service: NotificationService) -> Self {
        Self { service }
    }

    pub fn service_mut(&mut self) -> &mut NotificationService {
        &mut self.service
    }

    /// Runs `action` with the caller's argument array. `Ok(None)` means the
    /// action completed without a success payload.
    #[instrument(skip(self, args))]
    pub fn exec(&mut self, action: &str, args: &Value) -> Result<Option<Value>, BridgeError> {
        let action: Action = action.parse()?;
        let items = argument_list(args);
        let ids: Vec<String> = items.iter().filter_map(identity).collect();
        let service = &mut self.service;

        let payload = match action {
            Action::Schedule => {
                service.schedule(items.iter().filter_map(parse_request).collect());
                None
            }
            Action::Update => {
                service.update(items.iter().filter_map(parse_patch).collect());
                None
            }
            Action::Clear => {
                service.clear(&ids);
                None
            }
            Action::ClearAll => {
                service.clear_all();
                Some(Value::Null)
            }
            Action::Cancel => {
                service.cancel(&ids);
                None
            }
            Action::CancelAll => {
                service.cancel_all();
                Some(Value::Null)
            }
            Action::IsPresent => first_id(&items)
                .and_then(|id| service.is_present(&id))
                .map(Value::Bool),
            Action::IsScheduled => first_id(&items)
                .and_then(|id| service.is_scheduled(&id))
                .map(Value::Bool),
            Action::IsTriggered => first_id(&items)
                .and_then(|id| service.is_triggered(&id))
                .map(Value::Bool),
            Action::GetAllIds => Some(json!(service.get_all_ids())),
            Action::GetScheduledIds => Some(json!(service.get_scheduled_ids(&ids))),
            Action::GetTriggeredIds => Some(json!(service.get_triggered_ids(&ids))),
            Action::GetSingle => service.get_single(&ids).map(to_value),
            Action::GetSingleScheduled => service.get_single_scheduled(&ids).map(to_value),
            Action::GetSingleTriggered => service.get_single_triggered(&ids).map(to_value),
            Action::GetAll => Some(to_values(service.get_all(&ids))),
            Action::GetScheduled => Some(to_values(service.get_scheduled(&ids))),
            Action::GetTriggered => Some(to_values(service.get_triggered(&ids))),
        };
        Ok(payload)
    }
}

fn argument_list(args: &Value) -> Vec<Value> {
    match args {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

fn identity(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn first_id(items: &[Value]) -> Option<String> {
    items.first().and_then(identity)
}

fn epoch_seconds(value: Option<&Value>) -> Option<i64> {
    let Value::Number(number) = value? else {
        return None;
    };
    number
        .as_i64()
        .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64))
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

fn data_field(object: &Map<String, Value>) -> Option<Value> {
    object.get("data").filter(|data| !data.is_null()).cloned()
}

fn body_field(object: &Map<String, Value>) -> Option<String> {
    string_field(object, "text").or_else(|| string_field(object, "body"))
}

fn parse_request(value: &Value) -> Option<NotificationRequest> {
    let Some(object) = value.as_object() else {
        tracing::debug!(?value, "skipping non-object notification options");
        return None;
    };
    Some(NotificationRequest {
        id: object.get("id").and_then(identity).unwrap_or_default(),
        title: string_field(object, "title").unwrap_or_default(),
        body: body_field(object),
        icon: string_field(object, "icon"),
        data: data_field(object),
        at: epoch_seconds(object.get("at")),
        every: string_field(object, "every"),
    })
}

/// A present `at`/`every` key always overwrites; null or malformed values reset it.
fn parse_patch(value: &Value) -> Option<NotificationPatch> {
    let object = value.as_object()?;
    let id = object.get("id").and_then(identity)?;
    Some(NotificationPatch {
        id,
        title: string_field(object, "title"),
        body: body_field(object),
        icon: string_field(object, "icon"),
        data: data_field(object),
        at: object.get("at").map(|at| epoch_seconds(Some(at))),
        every: object
            .get("every")
            .map(|every| every.as_str().map(str::to_string)),
    })
}

fn to_value(request: NotificationRequest) -> Value {
    serde_json::to_value(request).unwrap_or(Value::Null)
}

fn to_values(requests: Vec<NotificationRequest>) -> Value {
    Value::Array(requests.into_iter().map(to_value).collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use notify_core::platform::Callback;
    use notify_core::{
        ManualClock, Permission, Platform, PlatformError, PlatformNotification, SchedulerConfig,
        ShowOptions,
    };

    use super::*;

    const START: i64 = 1_700_000_000;

    struct QuietHandle;

    impl PlatformNotification for QuietHandle {
        fn close(&mut self) -> Result<(), PlatformError> {
            Ok(())
        }
        fn set_on_click(&mut self, _callback: Option<Callback>) {}
        fn set_on_close(&mut self, _callback: Option<Callback>) {}
    }

    struct QuietPlatform;

    impl Platform for QuietPlatform {
        fn current_permission(&self) -> Permission {
            Permission::Granted
        }
        fn request_permission(&self) -> Permission {
            Permission::Granted
        }
        fn show(
            &self,
            _options: &ShowOptions,
        ) -> Result<Box<dyn PlatformNotification>, PlatformError> {
            Ok(Box::new(QuietHandle))
        }
    }

    fn bridge() -> (LocalNotificationBridge, ManualClock) {
        let clock = ManualClock::at_epoch_seconds(START);
        let service = NotificationService::builder()
            .with_clock(Arc::new(clock.clone()))
            .with_platform(Arc::new(QuietPlatform))
            .with_config(SchedulerConfig::default())
            .build()
            .expect("build service");
        (LocalNotificationBridge::new(service), clock)
    }

    #[test]
    fn unknown_action_is_the_only_error() {
        let (mut bridge, _clock) = bridge();
        assert_eq!(
            bridge.exec("explode", &json!([])),
            Err(BridgeError::UnknownAction("explode".into()))
        );
        assert_eq!(bridge.exec("schedule", &json!(["not an object", 7])), Ok(None));
    }

    #[test]
    fn schedule_and_query_through_json() {
        let (mut bridge, clock) = bridge();
        let args = json!([
            {"id": 1, "title": "Numeric", "text": "body", "at": START + 60},
            {"id": "b", "title": "Now", "every": "never"},
        ]);
        assert_eq!(bridge.exec("schedule", &args), Ok(None));
        clock.advance(chrono::Duration::seconds(1));

        assert_eq!(bridge.exec("getAllIds", &json!([])), Ok(Some(json!(["1", "b"]))));
        assert_eq!(bridge.exec("getScheduledIds", &json!([])), Ok(Some(json!(["1"]))));
        assert_eq!(bridge.exec("isTriggered", &json!(["b"])), Ok(Some(Value::Bool(true))));
        assert_eq!(bridge.exec("isPresent", &json!(["missing"])), Ok(None));

        let single = bridge
            .exec("getSingleScheduled", &json!(["1"]))
            .expect("known action")
            .expect("scheduled notification");
        assert_eq!(single["text"], Value::Null);
        assert_eq!(single["body"], json!("body"));
        assert_eq!(single["at"], json!(START + 60));
    }

    #[test]
    fn malformed_trigger_time_fires_immediately() {
        let (mut bridge, clock) = bridge();
        let args = json!([{"id": "x", "title": "Soon", "at": "tomorrow"}]);
        bridge.exec("schedule", &args).expect("schedule");
        assert_eq!(bridge.exec("isPresent", &json!(["x"])), Ok(Some(Value::Bool(true))));
        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(bridge.exec("getTriggeredIds", &json!(["x"])), Ok(Some(json!(["x"]))));
    }

    #[test]
    fn huge_trigger_times_do_not_panic() {
        let (mut bridge, _clock) = bridge();
        let args = json!([
            {"id": "float", "title": "F", "at": 1e300},
            {"id": "int", "title": "I", "at": 10_000_000_000_000_i64},
            {"id": "neg", "title": "N", "at": -1e300},
        ]);
        assert_eq!(bridge.exec("schedule", &args), Ok(None));
        for id in ["float", "int", "neg"] {
            assert_eq!(bridge.exec("isPresent", &json!([id])), Ok(Some(Value::Bool(true))));
        }
        assert_eq!(bridge.exec("getScheduledIds", &json!([])), Ok(Some(json!([]))));
    }

    #[test]
    fn null_every_in_update_stops_repeating() {
        let (mut bridge, clock) = bridge();
        bridge
            .exec("schedule", &json!([{"id": "r", "title": "R", "every": "minute"}]))
            .expect("schedule");
        bridge.exec("update", &json!([{"id": "r", "title": "R2"}])).expect("update");
        assert!(bridge.service_mut().next_deadline().is_some());

        bridge.exec("update", &json!([{"id": "r", "every": null}])).expect("update");
        assert_eq!(bridge.service_mut().next_deadline(), None);

        clock.advance(chrono::Duration::minutes(2));
        assert_eq!(bridge.service_mut().run_due(), 0);
        let single = bridge
            .exec("getSingle", &json!(["r"]))
            .expect("known action")
            .expect("notification");
        assert_eq!(single["title"], json!("R2"));
        assert_eq!(single.get("every"), None);
    }

    #[test]
    fn update_and_cancel_all_through_json() {
        let (mut bridge, clock) = bridge();
        bridge
            .exec("schedule", &json!([{"id": "a", "title": "A", "at": START + 30}]))
            .expect("schedule");
        bridge
            .exec("update", &json!([{"id": "a", "title": "A2"}, {"title": "no id"}]))
            .expect("update");
        let all = bridge
            .exec("getAll", &json!([]))
            .expect("known action")
            .expect("payload");
        assert_eq!(all[0]["title"], json!("A2"));

        assert_eq!(bridge.exec("cancelAll", &Value::Null), Ok(Some(Value::Null)));
        clock.advance(chrono::Duration::seconds(60));
        bridge.service_mut().run_due();
        assert_eq!(bridge.exec("getScheduled", &json!([])), Ok(Some(json!([]))));
        assert_eq!(bridge.exec("getAllIds", &json!([])), Ok(Some(json!(["a"]))));
    }
}
