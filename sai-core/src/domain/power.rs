//! Power controller domain types

use serde::{Deserialize, Serialize};

use crate::serde_ext::flag;

/// A power-control domain that may contain builders and other controllers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerController {
    pub name: String,
    #[serde(default, deserialize_with = "flag")]
    pub on: bool,
    /// Free-form controller type, e.g. `tasmota`
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Name of the controller this one is powered from
    #[serde(default)]
    pub depends_on: Option<String>,
}

impl PowerController {
    /// The parent name, treating an empty string as no parent
    pub fn parent(&self) -> Option<&str> {
        self.depends_on.as_deref().filter(|p| !p.is_empty())
    }
}

/// Stay-on state of one power-managed builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedBuilder {
    pub name: String,
    #[serde(default, deserialize_with = "flag")]
    pub stay_on: bool,
}
