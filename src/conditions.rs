//! Status conditions shared by all Pulsar resources
//!
//! A status holds at most one condition per type. Setting a condition
//! replaces the existing entry in place, or appends it when the type is new,
//! so the list keeps first-seen order. `lastTransitionTime` only moves when
//! the boolean status flips.

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// Condition types common to every kind
pub const CONDITION_CLUSTER_TARGET_OK: &str = "ClusterTargetOK";

// Dependency readiness
pub const CONDITION_TENANT_READY: &str = "TenantReady";
pub const CONDITION_NAMESPACE_READY: &str = "NamespaceReady";
pub const CONDITION_TOPIC_READY: &str = "TopicReady";

// Own convergence
pub const CONDITION_TENANT_IN_SYNC: &str = "TenantInSync";
pub const CONDITION_NAMESPACE_IN_SYNC: &str = "NamespaceInSync";
pub const CONDITION_TOPIC_IN_SYNC: &str = "TopicInSync";
pub const CONDITION_SCHEMA_IN_SYNC: &str = "SchemaInSync";

/// Stable reason codes, each with a human readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    TenantNotFound,
    NamespaceNotFound,
    TopicNotFound,
    TopicLevelPoliciesDisabled,
    IncompatibleSchema,
    ResponseParsingError,
    DeleteFailed,
    UnknownError,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::TenantNotFound => "TenantNotFound",
            Reason::NamespaceNotFound => "NamespaceNotFound",
            Reason::TopicNotFound => "TopicNotFound",
            Reason::TopicLevelPoliciesDisabled => "TopicLevelPoliciesDisabled",
            Reason::IncompatibleSchema => "IncompatibleSchema",
            Reason::ResponseParsingError => "ResponseParsingError",
            Reason::DeleteFailed => "DeleteFailed",
            Reason::UnknownError => "UnknownError",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Reason::TenantNotFound => "Tenant not found in Pulsar cluster",
            Reason::NamespaceNotFound => "Namespace not found in Pulsar cluster",
            Reason::TopicNotFound => "Topic not found in Pulsar cluster",
            Reason::TopicLevelPoliciesDisabled => {
                "Topic level policies are disabled and policies are defined for topic"
            }
            Reason::IncompatibleSchema => "Incompatible schema",
            Reason::ResponseParsingError => "Error parsing response from Pulsar cluster",
            Reason::DeleteFailed => "Delete failed",
            Reason::UnknownError => "Unknown error",
        }
    }
}

/// Coarse lifecycle label
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum PulsarPhase {
    /// Not converged yet, or converging failed and will be retried
    #[default]
    Pending,
    /// Every tracked condition holds
    Ready,
    /// Blocked on a dependency or on an error a retry cannot fix
    Failed,
}

/// Named boolean readiness signal
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PulsarCondition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition, rendered as "True" or "False"
    #[serde(with = "condition_status")]
    #[schemars(with = "String")]
    pub status: bool,
    /// Last time the condition transitioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
    /// Machine readable reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Status subresource of every Pulsar custom resource
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PulsarStatus {
    /// Current phase
    #[serde(default)]
    pub phase: PulsarPhase,

    /// Conditions representing resource state
    #[serde(default)]
    pub conditions: Vec<PulsarCondition>,

    /// Generation last brought to Ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl PulsarStatus {
    /// Set or replace the condition of type `condition_type`.
    pub fn set_condition(
        &mut self,
        condition_type: &str,
        status: bool,
        reason: Option<&str>,
        message: Option<&str>,
    ) {
        let new = PulsarCondition {
            r#type: condition_type.to_string(),
            status,
            last_transition_time: Some(Utc::now().to_rfc3339()),
            reason: reason.map(str::to_string),
            message: message.map(str::to_string),
        };

        match self
            .conditions
            .iter_mut()
            .find(|c| c.r#type == condition_type)
        {
            Some(existing) if existing.status == status => {
                existing.reason = new.reason;
                existing.message = new.message;
            }
            Some(existing) => *existing = new,
            None => self.conditions.push(new),
        }
    }

    pub fn mark(&mut self, condition_type: &str) {
        self.set_condition(condition_type, true, None, None);
    }

    /// Set a condition false with a stable reason code and its message.
    pub fn fail(&mut self, condition_type: &str, reason: Reason) {
        self.set_condition(condition_type, false, Some(reason.as_str()), Some(reason.message()));
    }

    /// Status of `condition_type`; false when absent.
    pub fn condition(&self, condition_type: &str) -> bool {
        self.conditions
            .iter()
            .find(|c| c.r#type == condition_type)
            .is_some_and(|c| c.status)
    }

    pub fn conditions_ok(&self) -> bool {
        self.conditions.iter().all(|c| c.status)
    }

    pub fn set_phase(&mut self, phase: PulsarPhase) {
        self.phase = phase;
    }

    /// Close a pass: Ready plus `observedGeneration` when every condition holds.
    pub fn settle(&mut self, generation: Option<i64>) {
        if self.conditions_ok() {
            self.phase = PulsarPhase::Ready;
            self.observed_generation = generation;
        }
    }
}

mod condition_status {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(status: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *status { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.eq_ignore_ascii_case("true"))
    }
}
