//! # DataSciencePipelinesApplication Status
//!
//! Status types for tracking per-component readiness and the overall condition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of the DataSciencePipelinesApplication resource
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataSciencePipelinesApplicationStatus {
    /// Component conditions followed by the overall `Ready` condition
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Endpoints of components that expose one, set once they are ready
    #[serde(default)]
    pub components: ComponentStatus,
}

impl DataSciencePipelinesApplicationStatus {
    /// Find a condition by type
    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == condition_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mlmd_proxy: Option<ComponentDetailStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_server: Option<ComponentDetailStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDetailStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time (RFC3339)
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
    /// Generation of the resource this condition was computed for
    #[serde(default)]
    pub observed_generation: Option<i64>,
}
