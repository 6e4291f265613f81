//! Server push messages
//!
//! [`ServerMessage`] is the canonical, already-normalised form of every
//! frame the server sends. Legacy field spellings are folded in here so the
//! rest of the client only ever sees one shape per message.

use serde::Deserialize;

use crate::domain::builder::Builder;
use crate::domain::event::Event;
use crate::domain::load::LoadReport;
use crate::domain::log::LogChunk;
use crate::domain::power::{ManagedBuilder, PowerController};
use crate::domain::task::Task;
use crate::serde_ext::{opt_flag, string_or_number};

/// Fields every frame may carry regardless of its schema
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    /// Protocol version of the sending server
    #[serde(default)]
    pub api_version: Option<u64>,
    /// The browser-style Accept-Language list the server saw
    #[serde(default)]
    pub alang: Option<String>,
}

/// Every message the server pushes, tagged by `schema`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "schema")]
pub enum ServerMessage {
    #[serde(rename = "sai.warmcat.com.overview")]
    Overview(Overview),
    #[serde(rename = "com.warmcat.sai.taskinfo")]
    TaskInfo(TaskInfo),
    #[serde(rename = "com.warmcat.sai.builders")]
    Builders(BuilderList),
    #[serde(rename = "com.warmcat.sai.power_managed_builders")]
    PowerTopology(PowerTopology),
    #[serde(rename = "com.warmcat.sai.loadreport")]
    LoadReport(LoadReport),
    #[serde(rename = "com-warmcat-sai-logs")]
    Log(LogChunk),
    #[serde(rename = "com-warmcat-sai-artifact")]
    Artifact(Artifact),
    #[serde(rename = "com.warmcat.sai.taskactivity")]
    TaskActivity(TaskActivity),
    #[serde(rename = "com.warmcat.sai.unauthorized")]
    Unauthorized,
    /// Any schema this client does not know about
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Overview(_) => "overview",
            ServerMessage::TaskInfo(_) => "taskinfo",
            ServerMessage::Builders(_) => "builders",
            ServerMessage::PowerTopology(_) => "power-topology",
            ServerMessage::LoadReport(_) => "loadreport",
            ServerMessage::Log(_) => "log",
            ServerMessage::Artifact(_) => "artifact",
            ServerMessage::TaskActivity(_) => "taskactivity",
            ServerMessage::Unauthorized => "unauthorized",
            ServerMessage::Unknown => "unknown",
        }
    }
}

/// Authorization state piggy-backed on overview and task frames
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthFields {
    pub authorized: Option<bool>,
    pub auth_user: Option<String>,
    /// Seconds until the session cookie expires
    pub auth_secs: Option<u64>,
}

/// One event with its tasks, in server order
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EventEntry {
    pub e: Event,
    #[serde(default)]
    pub t: Vec<Task>,
}

/// Recent events, or a single changed event
#[derive(Debug, Clone, Deserialize)]
pub struct Overview {
    #[serde(default)]
    pub overview: Vec<EventEntry>,
    #[serde(default, deserialize_with = "opt_flag")]
    pub authorized: Option<bool>,
    #[serde(default)]
    pub auth_user: Option<String>,
    #[serde(default)]
    pub auth_secs: Option<u64>,
}

impl Overview {
    pub fn auth(&self) -> AuthFields {
        AuthFields {
            authorized: self.authorized,
            auth_user: self.auth_user.clone(),
            auth_secs: self.auth_secs,
        }
    }
}

/// One task together with its parent event
#[derive(Debug, Clone, Deserialize)]
pub struct TaskInfo {
    #[serde(default)]
    pub e: Option<Event>,
    pub t: Task,
    #[serde(default, deserialize_with = "opt_flag")]
    pub authorized: Option<bool>,
    #[serde(default)]
    pub auth_user: Option<String>,
    #[serde(default)]
    pub auth_secs: Option<u64>,
}

impl TaskInfo {
    pub fn auth(&self) -> AuthFields {
        AuthFields {
            authorized: self.authorized,
            auth_user: self.auth_user.clone(),
            auth_secs: self.auth_secs,
        }
    }
}

/// The whole builder fleet
#[derive(Debug, Clone, Deserialize)]
pub struct BuilderList {
    /// Older servers call this list `platforms`
    #[serde(default, alias = "platforms")]
    pub builders: Vec<Builder>,
}

/// Power controllers known to the server
#[derive(Debug, Clone, Deserialize)]
pub struct PowerTopology {
    #[serde(default)]
    pub power_controllers: Vec<PowerController>,
    /// Stay-on flags of the builders the power controllers manage
    #[serde(default)]
    pub builders: Vec<ManagedBuilder>,
}

/// A build artifact became available for download
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Artifact {
    pub task_uuid: String,
    #[serde(default)]
    pub artifact_down_nonce: String,
    pub blob_filename: String,
    /// Bytes
    #[serde(default)]
    pub len: u64,
}

impl Artifact {
    /// Relative download path for this artifact
    pub fn download_path(&self) -> String {
        format!(
            "artifacts/{}/{}/{}",
            self.task_uuid, self.artifact_down_nonce, self.blob_filename
        )
    }
}

/// What a running task is currently doing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskActivity {
    pub task_uuid: String,
    #[serde(deserialize_with = "string_or_number")]
    pub activity: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::TaskState;

    fn decode(json: &str) -> ServerMessage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_overview_decodes_events_and_auth() {
        let msg = decode(
            r#"{"schema":"sai.warmcat.com.overview","authorized":1,"auth_user":"andy",
                "auth_secs":3600,"overview":[{"e":{"uuid":"e1","state":3},
                "t":[{"uuid":"t1","taskname":"build","state":3}]}]}"#,
        );
        let ServerMessage::Overview(ov) = msg else {
            panic!("expected overview");
        };
        assert_eq!(ov.overview.len(), 1);
        assert_eq!(ov.overview[0].e.state, TaskState::Success);
        assert_eq!(ov.overview[0].t[0].taskname, "build");
        assert_eq!(
            ov.auth(),
            AuthFields {
                authorized: Some(true),
                auth_user: Some("andy".to_string()),
                auth_secs: Some(3600),
            }
        );
    }

    #[test]
    fn test_unknown_task_state_keeps_the_snapshot() {
        let ServerMessage::Overview(ov) = decode(
            r#"{"schema":"sai.warmcat.com.overview","overview":[
                {"e":{"uuid":"e1","state":2},"t":[{"uuid":"t1","state":7}]},
                {"e":{"uuid":"e2","state":3},"t":[]}]}"#,
        ) else {
            panic!("expected overview");
        };
        assert_eq!(ov.overview.len(), 2);
        assert_eq!(ov.overview[0].t[0].state, TaskState::Unknown(7));
    }

    #[test]
    fn test_envelope_takes_wide_api_version() {
        let env: Envelope =
            serde_json::from_str(r#"{"schema":"x","api_version":5000000000}"#).unwrap();
        assert_eq!(env.api_version, Some(5_000_000_000));
    }

    #[test]
    fn test_builders_accepts_legacy_field_name() {
        let legacy = decode(r#"{"schema":"com.warmcat.sai.builders","platforms":[{"name":"a.b"}]}"#);
        let current = decode(r#"{"schema":"com.warmcat.sai.builders","builders":[{"name":"a.b"}]}"#);
        for msg in [legacy, current] {
            let ServerMessage::Builders(list) = msg else {
                panic!("expected builders");
            };
            assert_eq!(list.builders.len(), 1);
            assert_eq!(list.builders[0].name, "a.b");
        }
    }

    #[test]
    fn test_unknown_schema_is_not_an_error() {
        assert!(matches!(
            decode(r#"{"schema":"com.warmcat.sai.something-new","x":1}"#),
            ServerMessage::Unknown
        ));
    }

    #[test]
    fn test_unauthorized_ignores_extra_fields() {
        assert!(matches!(
            decode(r#"{"schema":"com.warmcat.sai.unauthorized","why":"expired"}"#),
            ServerMessage::Unauthorized
        ));
    }

    #[test]
    fn test_missing_required_field_fails() {
        assert!(serde_json::from_str::<ServerMessage>(r#"{"schema":"com.warmcat.sai.taskinfo"}"#).is_err());
    }

    #[test]
    fn test_activity_accepts_numeric_category() {
        let ServerMessage::TaskActivity(act) =
            decode(r#"{"schema":"com.warmcat.sai.taskactivity","task_uuid":"t","activity":2}"#)
        else {
            panic!("expected activity");
        };
        assert_eq!(act.activity, "2");
    }

    #[test]
    fn test_artifact_download_path() {
        let ServerMessage::Artifact(art) = decode(
            r#"{"schema":"com-warmcat-sai-artifact","task_uuid":"t1",
                "artifact_down_nonce":"n0","blob_filename":"out.tar.xz","len":2048}"#,
        ) else {
            panic!("expected artifact");
        };
        assert_eq!(art.download_path(), "artifacts/t1/n0/out.tar.xz");
    }
}
