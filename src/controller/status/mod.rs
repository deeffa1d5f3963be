//! # Status Aggregation
//!
//! Per-pass component conditions and their aggregation into the persisted status.
//!
//! Every pass starts with all component conditions `Unknown`. Component reconcilers
//! replace their own entry. [`aggregate`] then:
//!
//! - computes `Ready` (True iff every applicable component is True)
//! - applies the fatal-error override, if any
//! - carries `lastTransitionTime` forward for conditions whose status did not change,
//!   matching previous conditions by type rather than by position
//! - stamps `observedGeneration` on every condition

use crate::constants::*;
use crate::crd::Condition;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

/// Component condition types in persisted order; `Ready` follows them
pub const COMPONENT_CONDITION_TYPES: [&str; 9] = [
    DATABASE_AVAILABLE,
    OBJECT_STORE_AVAILABLE,
    MLMD_PROXY_READY,
    API_SERVER_READY,
    PERSISTENCE_AGENT_READY,
    SCHEDULED_WORKFLOW_READY,
    WORKFLOW_CONTROLLER_READY,
    ML_PIPELINE_UI_READY,
    WEBHOOK_READY,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Readiness of one component, as reported during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentCondition {
    pub condition_type: &'static str,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
}

impl ComponentCondition {
    pub fn new(
        condition_type: &'static str,
        status: ConditionStatus,
        reason: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            condition_type,
            status,
            reason: reason.to_string(),
            message: message.into(),
        }
    }

    pub fn ready(condition_type: &'static str, reason: &str, message: impl Into<String>) -> Self {
        Self::new(condition_type, ConditionStatus::True, reason, message)
    }

    pub fn not_ready(
        condition_type: &'static str,
        reason: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::new(condition_type, ConditionStatus::False, reason, message)
    }

    /// The component is switched off; excluded from the overall result
    pub fn not_applicable(condition_type: &'static str) -> Self {
        Self::new(
            condition_type,
            ConditionStatus::False,
            REASON_NOT_APPLICABLE,
            "This component is not deployed.",
        )
    }

    pub fn unknown(condition_type: &'static str) -> Self {
        Self::new(
            condition_type,
            ConditionStatus::Unknown,
            REASON_UNKNOWN,
            "Component has not been evaluated yet.",
        )
    }

    pub fn is_not_applicable(&self) -> bool {
        self.status == ConditionStatus::False && self.reason == REASON_NOT_APPLICABLE
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// Component conditions collected during one pass, in persisted order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassConditions {
    conditions: Vec<ComponentCondition>,
}

impl Default for PassConditions {
    fn default() -> Self {
        Self {
            conditions: COMPONENT_CONDITION_TYPES
                .into_iter()
                .map(ComponentCondition::unknown)
                .collect(),
        }
    }
}

impl PassConditions {
    /// Replace the entry of the same type; unknown types are appended
    pub fn set(&mut self, condition: ComponentCondition) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition.condition_type)
        {
            Some(existing) => *existing = condition,
            None => self.conditions.push(condition),
        }
    }

    pub fn get(&self, condition_type: &str) -> Option<&ComponentCondition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentCondition> {
        self.conditions.iter()
    }

    pub fn is_ready(&self, condition_type: &str) -> bool {
        self.get(condition_type).is_some_and(ComponentCondition::is_true)
    }
}

/// Forces the overall condition to False for this pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyOverride {
    pub reason: String,
    pub message: String,
}

/// Overall readiness computed from the component conditions
pub fn overall(conditions: &PassConditions) -> ComponentCondition {
    let failing: Vec<&ComponentCondition> = conditions
        .iter()
        .filter(|c| !c.is_not_applicable() && !c.is_true())
        .collect();

    if failing.is_empty() {
        ComponentCondition::ready(
            CR_READY,
            REASON_MINIMUM_REPLICAS_AVAILABLE,
            "All components are ready.",
        )
    } else {
        let message = failing
            .iter()
            .map(|c| c.message.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        // Reason of the first failing component, in persisted order
        ComponentCondition::not_ready(CR_READY, &failing[0].reason, message)
    }
}

/// Build the persisted condition list
pub fn aggregate(
    conditions: &PassConditions,
    ready_override: Option<&ReadyOverride>,
    previous: &[Condition],
    generation: Option<i64>,
    now: DateTime<Utc>,
) -> Vec<Condition> {
    let ready = match ready_override {
        Some(o) => ComponentCondition::not_ready(CR_READY, &o.reason, o.message.clone()),
        None => overall(conditions),
    };
    let now = now.to_rfc3339_opts(SecondsFormat::Secs, true);

    conditions
        .iter()
        .chain(std::iter::once(&ready))
        .map(|c| {
            let status = c.status.as_str();
            let last_transition_time = previous
                .iter()
                .find(|p| p.r#type == c.condition_type && p.status == status)
                .and_then(|p| p.last_transition_time.clone())
                .unwrap_or_else(|| now.clone());
            Condition {
                r#type: c.condition_type.to_string(),
                status: status.to_string(),
                last_transition_time: Some(last_transition_time),
                reason: Some(c.reason.clone()),
                message: Some(c.message.clone()),
                observed_generation: generation,
            }
        })
        .collect()
}
