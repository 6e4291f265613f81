//! Task domain types

use serde::{Deserialize, Serialize};

use crate::domain::state::TaskState;

/// One build attempt of one platform for one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub uuid: String,
    #[serde(default)]
    pub event_uuid: String,
    /// `os/arch/toolchain`, each segment optional
    #[serde(default)]
    pub platform: String,
    /// Grouping key for display
    #[serde(default)]
    pub taskname: String,
    #[serde(default)]
    pub state: TaskState,
    #[serde(default)]
    pub builder_name: String,
    /// Unix time, seconds
    #[serde(default)]
    pub started: u64,
    /// Microseconds, zero while still running
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub build_step: i32,
}

/// The three optional segments of a platform descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Platform<'a> {
    pub os: Option<&'a str>,
    pub arch: Option<&'a str>,
    pub toolchain: Option<&'a str>,
}

impl<'a> Platform<'a> {
    /// Parses `os/arch/toolchain`; empty segments are treated as absent
    pub fn parse(descriptor: &'a str) -> Self {
        let mut parts = descriptor.split('/').map(|s| Some(s).filter(|s| !s.is_empty()));
        Self {
            os: parts.next().flatten(),
            arch: parts.next().flatten(),
            toolchain: parts.next().flatten(),
        }
    }
}

impl Task {
    /// Wall-clock seconds the task ran, or has been running as of `now`
    pub fn elapsed_secs(&self, now: u64) -> f64 {
        if self.duration != 0 {
            self.duration as f64 / 1_000_000.0
        } else {
            now.saturating_sub(self.started) as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parse_full() {
        let p = Platform::parse("linux-fedora-32/x86_64-amd/gcc");
        assert_eq!(p.os, Some("linux-fedora-32"));
        assert_eq!(p.arch, Some("x86_64-amd"));
        assert_eq!(p.toolchain, Some("gcc"));
    }

    #[test]
    fn test_platform_parse_partial() {
        let p = Platform::parse("freertos//gcc");
        assert_eq!(p.os, Some("freertos"));
        assert_eq!(p.arch, None);
        assert_eq!(p.toolchain, Some("gcc"));
        assert_eq!(Platform::parse(""), Platform::default());
    }

    #[test]
    fn test_elapsed_prefers_duration() {
        let mut task: Task = serde_json::from_str(r#"{"uuid":"t","started":100}"#).unwrap();
        assert_eq!(task.elapsed_secs(160), 60.0);
        task.duration = 2_500_000;
        assert_eq!(task.elapsed_secs(160), 2.5);
    }
}
