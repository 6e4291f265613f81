//! Build state shared by events and tasks

use serde::{Deserialize, Serialize};

/// Lifecycle state of a task, also used to summarise an event
///
/// Serialized as the server's integer code. Codes this client does not
/// know decode to `Unknown` so one odd task cannot sink a whole frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum TaskState {
    /// Queued, no builder yet
    #[default]
    Waiting,
    /// Offered to a builder
    Dispatched,
    /// Running on a builder
    Building,
    Success,
    Failed,
    Cancelled,
    /// Still running, but some part has already failed
    BuildingWithFailures,
    Unknown(u8),
}

impl TaskState {
    /// Server integer code for this state
    pub fn code(self) -> u8 {
        match self {
            TaskState::Waiting => 0,
            TaskState::Dispatched => 1,
            TaskState::Building => 2,
            TaskState::Success => 3,
            TaskState::Failed => 4,
            TaskState::Cancelled => 5,
            TaskState::BuildingWithFailures => 6,
            TaskState::Unknown(code) => code,
        }
    }

    /// True for states that should be painted as a failure
    pub fn is_bad(self) -> bool {
        matches!(self, TaskState::Failed | TaskState::BuildingWithFailures)
    }

    /// True while a builder is (or is about to be) working on it
    pub fn is_running(self) -> bool {
        matches!(
            self,
            TaskState::Dispatched | TaskState::Building | TaskState::BuildingWithFailures
        )
    }
}

impl From<u8> for TaskState {
    fn from(code: u8) -> Self {
        match code {
            0 => TaskState::Waiting,
            1 => TaskState::Dispatched,
            2 => TaskState::Building,
            3 => TaskState::Success,
            4 => TaskState::Failed,
            5 => TaskState::Cancelled,
            6 => TaskState::BuildingWithFailures,
            other => TaskState::Unknown(other),
        }
    }
}

impl From<TaskState> for u8 {
    fn from(state: TaskState) -> Self {
        state.code()
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Waiting => write!(f, "waiting"),
            TaskState::Dispatched => write!(f, "dispatched"),
            TaskState::Building => write!(f, "building"),
            TaskState::Success => write!(f, "success"),
            TaskState::Failed => write!(f, "failed"),
            TaskState::Cancelled => write!(f, "cancelled"),
            TaskState::BuildingWithFailures => write!(f, "building (failures)"),
            TaskState::Unknown(code) => write!(f, "state {}", code),
        }
    }
}
