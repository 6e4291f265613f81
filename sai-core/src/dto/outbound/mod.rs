//! Client requests and operator commands

use serde::Serialize;

/// Every message the client sends, tagged by `schema`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "schema")]
pub enum ClientMessage {
    /// Subscribe to the overview, or to one task's detail and logs
    #[serde(rename = "com.warmcat.sai.taskinfo")]
    TaskInfo {
        js_api_version: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        logs: Option<u8>,
        /// Microseconds; only log chunks newer than this are replayed
        #[serde(skip_serializing_if = "Option::is_none")]
        last_log_ts: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        task_hash: Option<String>,
    },
    /// Subscribe to one event
    #[serde(rename = "com.warmcat.sai.eventinfo")]
    EventInfo { js_api_version: u32, event_hash: String },
    #[serde(rename = "com.warmcat.sai.taskreset")]
    TaskReset { uuid: String },
    #[serde(rename = "com.warmcat.sai.taskrebuildlaststep")]
    TaskRebuildLastStep { uuid: String },
    #[serde(rename = "com.warmcat.sai.eventreset")]
    EventReset { uuid: String },
    #[serde(rename = "com.warmcat.sai.eventdelete")]
    EventDelete { uuid: String },
    #[serde(rename = "com.warmcat.sai.taskcan")]
    TaskCancel { task_uuid: String },
    /// Reset every task of one platform within one event
    #[serde(rename = "com.warmcat.sai.platreset")]
    PlatformReset { event_uuid: String, platform: String },
    #[serde(rename = "com.warmcat.sai.rebuild")]
    BuilderRebuild { builder_name: String },
    /// Pin a power-managed builder on (1) or release it (0)
    #[serde(rename = "com.warmcat.sai.stay")]
    Stay { builder_name: String, stay_on: u8 },
}

impl ClientMessage {
    /// The initial request for the events overview
    pub fn overview(api_version: u32) -> Self {
        ClientMessage::TaskInfo {
            js_api_version: api_version,
            logs: None,
            last_log_ts: None,
            task_hash: None,
        }
    }

    /// Subscribe to one task, replaying logs newer than `last_log_ts`
    pub fn task_detail(api_version: u32, task_hash: &str, last_log_ts: u64) -> Self {
        ClientMessage::TaskInfo {
            js_api_version: api_version,
            logs: Some(1),
            last_log_ts: Some(last_log_ts),
            task_hash: Some(task_hash.to_string()),
        }
    }

    pub fn event_detail(api_version: u32, event_hash: &str) -> Self {
        ClientMessage::EventInfo {
            js_api_version: api_version,
            event_hash: event_hash.to_string(),
        }
    }

    pub fn schema(&self) -> &'static str {
        match self {
            ClientMessage::TaskInfo { .. } => "com.warmcat.sai.taskinfo",
            ClientMessage::EventInfo { .. } => "com.warmcat.sai.eventinfo",
            ClientMessage::TaskReset { .. } => "com.warmcat.sai.taskreset",
            ClientMessage::TaskRebuildLastStep { .. } => "com.warmcat.sai.taskrebuildlaststep",
            ClientMessage::EventReset { .. } => "com.warmcat.sai.eventreset",
            ClientMessage::EventDelete { .. } => "com.warmcat.sai.eventdelete",
            ClientMessage::TaskCancel { .. } => "com.warmcat.sai.taskcan",
            ClientMessage::PlatformReset { .. } => "com.warmcat.sai.platreset",
            ClientMessage::BuilderRebuild { .. } => "com.warmcat.sai.rebuild",
            ClientMessage::Stay { .. } => "com.warmcat.sai.stay",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn value(msg: &ClientMessage) -> Value {
        serde_json::from_str(&msg.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_overview_request_omits_task_fields() {
        assert_eq!(
            value(&ClientMessage::overview(3)),
            json!({"schema": "com.warmcat.sai.taskinfo", "js_api_version": 3})
        );
    }

    #[test]
    fn test_task_detail_request() {
        assert_eq!(
            value(&ClientMessage::task_detail(3, "abcd", 1234)),
            json!({
                "schema": "com.warmcat.sai.taskinfo",
                "js_api_version": 3,
                "logs": 1,
                "last_log_ts": 1234,
                "task_hash": "abcd"
            })
        );
    }

    #[test]
    fn test_stay_and_platform_reset_shapes() {
        let stay = ClientMessage::Stay {
            builder_name: "b1".into(),
            stay_on: 1,
        };
        assert_eq!(
            value(&stay),
            json!({"schema": "com.warmcat.sai.stay", "builder_name": "b1", "stay_on": 1})
        );
        let reset = ClientMessage::PlatformReset {
            event_uuid: "e1".into(),
            platform: "linux/x86_64".into(),
        };
        assert_eq!(
            value(&reset),
            json!({"schema": "com.warmcat.sai.platreset", "event_uuid": "e1", "platform": "linux/x86_64"})
        );
    }

    #[test]
    fn test_schema_matches_serialized_tag() {
        let msgs = [
            ClientMessage::event_detail(3, "e"),
            ClientMessage::TaskCancel { task_uuid: "t".into() },
            ClientMessage::EventDelete { uuid: "e".into() },
            ClientMessage::BuilderRebuild { builder_name: "b".into() },
        ];
        for msg in msgs {
            assert_eq!(value(&msg)["schema"], msg.schema());
        }
    }
}
