//! Builder load report types

use serde::{Deserialize, Serialize};

/// A task currently running on a reporting builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveTaskInfo {
    pub task_uuid: String,
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub build_step: i32,
    #[serde(default)]
    pub total_steps: i32,
    #[serde(default)]
    pub started: u64,
}

/// Periodic CPU load report from one builder instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub builder_name: String,
    #[serde(default)]
    pub core_count: i32,
    /// Tenths of a percent, summed over all cores
    #[serde(default)]
    pub cpu_percent: u32,
    /// Instance index on the builder
    #[serde(default)]
    pub instance: u32,
    #[serde(default)]
    pub active_steps: u32,
    #[serde(default)]
    pub active_tasks: Vec<ActiveTaskInfo>,
}

impl LoadReport {
    /// Load as a percentage of the whole machine, clamped to 0..=100
    pub fn normalized_percent(&self) -> u32 {
        let cores = u32::try_from(self.core_count).unwrap_or(0).max(1);
        (self.cpu_percent / 10 / cores).min(100)
    }
}
