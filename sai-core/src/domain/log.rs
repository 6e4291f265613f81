//! Log domain types

use serde::{Deserialize, Serialize};

/// Which stream a log fragment came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogChannel {
    Stdout,
    Stderr,
    /// Messages from Sai itself about the build
    BuildSystem,
    TtyPrimary,
    /// Any other channel number
    TtySecondary(u8),
}

impl LogChannel {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => LogChannel::Stdout,
            2 => LogChannel::Stderr,
            3 => LogChannel::BuildSystem,
            4 => LogChannel::TtyPrimary,
            other => LogChannel::TtySecondary(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            LogChannel::Stdout => 1,
            LogChannel::Stderr => 2,
            LogChannel::BuildSystem => 3,
            LogChannel::TtyPrimary => 4,
            LogChannel::TtySecondary(code) => code,
        }
    }
}

/// One base64-encoded log fragment for a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogChunk {
    #[serde(default)]
    pub task_uuid: String,
    pub channel: u8,
    /// Base64 body
    #[serde(default)]
    pub log: String,
    /// Decoded length in bytes
    #[serde(default)]
    pub len: usize,
    /// Microseconds
    #[serde(default)]
    pub timestamp: u64,
}

impl LogChunk {
    pub fn channel(&self) -> LogChannel {
        LogChannel::from_code(self.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_codes() {
        assert_eq!(LogChannel::from_code(3), LogChannel::BuildSystem);
        assert_eq!(LogChannel::from_code(9), LogChannel::TtySecondary(9));
        assert_eq!(LogChannel::TtySecondary(9).code(), 9);
    }
}
