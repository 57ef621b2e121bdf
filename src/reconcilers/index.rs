//! Topic lookup used by the Schema reconciler.
//!
//! A schema names its topic by (tenant, namespace, topic) only; persistence
//! and partition count, which the admin URLs need, come from the PulsarTopic
//! resource that declares that topic.

use crate::crd::{SchemaSpec, TopicSpec};
use parking_lot::RwLock;
use std::collections::HashMap;

/// (tenant, namespace, topic)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicSelector {
    pub tenant: String,
    pub namespace: String,
    pub topic: String,
}

impl From<&TopicSpec> for TopicSelector {
    fn from(spec: &TopicSpec) -> Self {
        Self {
            tenant: spec.tenant.clone(),
            namespace: spec.namespace.clone(),
            topic: spec.topic.clone(),
        }
    }
}

impl From<&SchemaSpec> for TopicSelector {
    fn from(spec: &SchemaSpec) -> Self {
        Self {
            tenant: spec.tenant.clone(),
            namespace: spec.namespace.clone(),
            topic: spec.topic.clone(),
        }
    }
}

/// Read side of the topic index
pub trait TopicLookup: Send + Sync {
    fn lookup(&self, selector: &TopicSelector) -> Option<TopicSpec>;
}

/// In-memory index of in-scope PulsarTopic specs.
///
/// When two resources declare the same selector the most recent upsert wins.
#[derive(Default)]
pub struct TopicIndex {
    entries: RwLock<HashMap<TopicSelector, (String, TopicSpec)>>,
}

impl TopicIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the spec of the resource identified by `owner`.
    pub fn upsert(&self, owner: &str, spec: &TopicSpec) {
        self.entries
            .write()
            .insert(TopicSelector::from(spec), (owner.to_string(), spec.clone()));
    }

    /// Drop the entry for `selector` if `owner` still holds it.
    pub fn remove(&self, owner: &str, selector: &TopicSelector) {
        let mut entries = self.entries.write();
        if entries.get(selector).is_some_and(|(held_by, _)| held_by == owner) {
            entries.remove(selector);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TopicLookup for TopicIndex {
    fn lookup(&self, selector: &TopicSelector) -> Option<TopicSpec> {
        self.entries.read().get(selector).map(|(_, spec)| spec.clone())
    }
}
