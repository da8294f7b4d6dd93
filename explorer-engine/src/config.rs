//! FILENAME: explorer-engine/src/config.rs
//! Explorer configuration, deserialized from the host application's settings.

use serde::{Deserialize, Serialize};

use crate::error::ExplorerError;

/// What the store does when a pass completes after a newer load was queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupersedePolicy {
    /// Drop the finished pass and immediately start the queued load.
    Restart,
    /// Publish the finished pass, then start the queued load.
    PublishThenReload,
}

impl Default for SupersedePolicy {
    fn default() -> Self {
        SupersedePolicy::Restart
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExplorerConfig {
    /// Name of the leaf-identity level (e.g. individual subjects).
    /// Rows at this level are never shown as nodes.
    pub subject_level_name: String,

    /// Raw member name of the null member.
    pub null_member: String,

    /// Display label for the null member.
    pub null_member_label: String,

    /// Whether selection sub-count queries are issued at all.
    pub enable_selection: bool,

    /// Result sizes above this seed nodes under a group as collapsed.
    pub auto_collapse_threshold: usize,

    pub supersede: SupersedePolicy,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        ExplorerConfig {
            subject_level_name: String::new(),
            null_member: "#null".to_string(),
            null_member_label: "Unknown".to_string(),
            enable_selection: true,
            auto_collapse_threshold: 15,
            supersede: SupersedePolicy::Restart,
        }
    }
}

impl ExplorerConfig {
    pub fn from_json(json: &str) -> Result<Self, ExplorerError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_subject_level(mut self, name: impl Into<String>) -> Self {
        self.subject_level_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ExplorerConfig::from_json(r#"{ "subjectLevelName": "Participant" }"#).unwrap();
        assert_eq!(config.subject_level_name, "Participant");
        assert_eq!(config.null_member, "#null");
        assert_eq!(config.auto_collapse_threshold, 15);
        assert!(config.enable_selection);
        assert_eq!(config.supersede, SupersedePolicy::Restart);
    }

    #[test]
    fn test_supersede_policy_from_json() {
        let config = ExplorerConfig::from_json(r#"{ "supersede": "PublishThenReload" }"#).unwrap();
        assert_eq!(config.supersede, SupersedePolicy::PublishThenReload);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = ExplorerConfig::from_json("{ nope").unwrap_err();
        assert!(matches!(err, ExplorerError::Config(_)));
    }
}
