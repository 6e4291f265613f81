//! Operator commands

use sai_core::dto::outbound::ClientMessage;

/// Something an authorized operator asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Rebuild one task from scratch
    ResetTask { task_uuid: String },
    /// Rerun only the last step of one task
    RebuildLastStep { task_uuid: String },
    /// Rebuild every task of one platform within an event
    ResetPlatform { event_uuid: String, platform: String },
    /// Rebuild every task of an event
    ResetEvent { event_uuid: String },
    CancelTask { task_uuid: String },
    /// Delete an event; the page reloads shortly after
    DeleteEvent { event_uuid: String },
    /// Rebuild the Sai software on one builder
    RebuildBuilder { builder_name: String },
    /// Keep a power-managed builder powered, or release it
    StayOn { builder_name: String, on: bool },
}

impl Command {
    pub fn to_message(&self) -> ClientMessage {
        match self {
            Command::ResetTask { task_uuid } => ClientMessage::TaskReset {
                uuid: task_uuid.clone(),
            },
            Command::RebuildLastStep { task_uuid } => ClientMessage::TaskRebuildLastStep {
                uuid: task_uuid.clone(),
            },
            Command::ResetPlatform {
                event_uuid,
                platform,
            } => ClientMessage::PlatformReset {
                event_uuid: event_uuid.clone(),
                platform: platform.clone(),
            },
            Command::ResetEvent { event_uuid } => ClientMessage::EventReset {
                uuid: event_uuid.clone(),
            },
            Command::CancelTask { task_uuid } => ClientMessage::TaskCancel {
                task_uuid: task_uuid.clone(),
            },
            Command::DeleteEvent { event_uuid } => ClientMessage::EventDelete {
                uuid: event_uuid.clone(),
            },
            Command::RebuildBuilder { builder_name } => ClientMessage::BuilderRebuild {
                builder_name: builder_name.clone(),
            },
            Command::StayOn { builder_name, on } => ClientMessage::Stay {
                builder_name: builder_name.clone(),
                stay_on: u8::from(*on),
            },
        }
    }

    /// The task this command restarts, if any
    pub fn resets_task(&self) -> Option<&str> {
        match self {
            Command::ResetTask { task_uuid } => Some(task_uuid),
            _ => None,
        }
    }
}
