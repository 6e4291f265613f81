//! Event domain types

use serde::{Deserialize, Serialize};

use crate::domain::state::TaskState;

/// A build-triggering occurrence, e.g. a push to a repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub uuid: String,
    #[serde(default)]
    pub repo_name: String,
    #[serde(rename = "ref", default)]
    pub git_ref: String,
    #[serde(default)]
    pub hash: String,
    /// Unix time, seconds
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub state: TaskState,
}

/// What kind of git ref an event was triggered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind<'a> {
    Branch(&'a str),
    Tag(&'a str),
    Other(&'a str),
}

impl Event {
    /// Splits `refs/heads/x` and `refs/tags/x` into their short names
    pub fn ref_kind(&self) -> RefKind<'_> {
        if let Some(branch) = self.git_ref.strip_prefix("refs/heads/") {
            RefKind::Branch(branch)
        } else if let Some(tag) = self.git_ref.strip_prefix("refs/tags/") {
            RefKind::Tag(tag)
        } else {
            RefKind::Other(&self.git_ref)
        }
    }

    /// First eight characters of the commit hash
    pub fn short_hash(&self) -> &str {
        match self.hash.char_indices().nth(8) {
            Some((idx, _)) => &self.hash[..idx],
            None => &self.hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(git_ref: &str) -> Event {
        Event {
            uuid: "e1".to_string(),
            repo_name: "libwebsockets".to_string(),
            git_ref: git_ref.to_string(),
            hash: "0123456789abcdef".to_string(),
            created: 1_600_000_000,
            state: TaskState::Waiting,
        }
    }

    #[test]
    fn test_ref_kind() {
        assert_eq!(event("refs/heads/main").ref_kind(), RefKind::Branch("main"));
        assert_eq!(event("refs/tags/v4.3").ref_kind(), RefKind::Tag("v4.3"));
        assert_eq!(event("HEAD").ref_kind(), RefKind::Other("HEAD"));
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(event("x").short_hash(), "01234567");
        let mut short = event("x");
        short.hash = "abc".to_string();
        assert_eq!(short.short_hash(), "abc");
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let e: Event = serde_json::from_str(r#"{"uuid":"abc","ref":"refs/heads/x"}"#).unwrap();
        assert_eq!(e.uuid, "abc");
        assert_eq!(e.git_ref, "refs/heads/x");
        assert_eq!(e.state, TaskState::Waiting);
        assert_eq!(e.created, 0);
    }
}
