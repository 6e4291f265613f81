//! Builder domain types

use serde::{Deserialize, Serialize};

use crate::serde_ext::flag;

/// Most load slots tracked for one builder, and the number tracked for a
/// builder that does not advertise its instance count
pub const MAX_INSTANCES: usize = 64;

/// A fleet worker instance as reported in the builder list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Builder {
    /// Dot/hyphen structured, e.g. `buildbox-rack1.linux-ubuntu-x86_64`
    pub name: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub peer_ip: String,
    #[serde(default, deserialize_with = "flag")]
    pub online: bool,
    #[serde(default, deserialize_with = "flag")]
    pub powering_up: bool,
    #[serde(default, deserialize_with = "flag")]
    pub powering_down: bool,
    #[serde(default)]
    pub instances: u32,
    #[serde(default)]
    pub sai_hash: String,
    #[serde(default)]
    pub lws_hash: String,
    /// Unix time, seconds
    #[serde(default)]
    pub last_seen: u64,
    #[serde(default, deserialize_with = "flag")]
    pub power_managed: bool,
    #[serde(default, deserialize_with = "flag")]
    pub stay_on: bool,
    /// Normalised CPU load per instance, percent; filled from load reports
    #[serde(skip)]
    pub loads: Vec<u32>,
}

impl Builder {
    /// The first dot-separated segment of the name
    pub fn hostname(&self) -> &str {
        hostname(&self.name)
    }

    /// Key used to place this builder under a power controller
    pub fn group_key(&self) -> &str {
        group_key(&self.name)
    }

    /// How many instances loads are tracked for
    pub fn instance_slots(&self) -> usize {
        match self.instances as usize {
            0 => MAX_INSTANCES,
            n => n.min(MAX_INSTANCES),
        }
    }

    /// Records a load sample for one instance, growing the sample list as needed
    ///
    /// Returns false and records nothing for an instance outside
    /// [`Builder::instance_slots`].
    pub fn record_load(&mut self, instance: usize, percent: u32) -> bool {
        if instance >= self.instance_slots() {
            return false;
        }
        if self.loads.len() <= instance {
            self.loads.resize(instance + 1, 0);
        }
        self.loads[instance] = percent.min(100);
        true
    }
}

/// The first dot-separated segment of a builder name
pub fn hostname(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// Group key derived from a builder name
///
/// The hostname's suffix after its last `-`, or the whole hostname when it
/// has no `-`.
pub fn group_key(name: &str) -> &str {
    let host = hostname(name);
    match host.rfind('-') {
        Some(idx) => &host[idx + 1..],
        None => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_key_with_hyphen() {
        assert_eq!(hostname("host-01.example"), "host-01");
        assert_eq!(group_key("host-01.example"), "01");
    }

    #[test]
    fn test_group_key_without_hyphen() {
        assert_eq!(group_key("buildbox.example"), "buildbox");
        assert_eq!(group_key("buildbox"), "buildbox");
    }

    #[test]
    fn test_group_key_uses_last_hyphen() {
        assert_eq!(group_key("a-b-rack2.linux-x86"), "rack2");
    }

    #[test]
    fn test_integer_flags() {
        let b: Builder = serde_json::from_str(
            r#"{"name":"x.y","online":1,"powering_up":0,"stay_on":true}"#,
        )
        .unwrap();
        assert!(b.online);
        assert!(!b.powering_up);
        assert!(b.stay_on);
        assert!(b.loads.is_empty());
    }

    #[test]
    fn test_record_load_grows_and_clamps() {
        let mut b: Builder = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert!(b.record_load(2, 250));
        assert_eq!(b.loads, vec![0, 0, 100]);
    }

    #[test]
    fn test_record_load_rejects_out_of_range_instance() {
        let mut b: Builder = serde_json::from_str(r#"{"name":"x","instances":2}"#).unwrap();
        assert!(!b.record_load(2, 10));
        assert!(b.loads.is_empty());

        let mut quiet: Builder = serde_json::from_str(r#"{"name":"y"}"#).unwrap();
        assert!(!quiet.record_load(4_000_000_000, 10));
        assert!(quiet.record_load(MAX_INSTANCES - 1, 10));
        assert_eq!(quiet.loads.len(), MAX_INSTANCES);

        let mut huge: Builder =
            serde_json::from_str(r#"{"name":"z","instances":4000000000}"#).unwrap();
        assert_eq!(huge.instance_slots(), MAX_INSTANCES);
        assert!(!huge.record_load(MAX_INSTANCES, 10));
    }
}
