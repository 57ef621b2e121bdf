//! Generic controller for the Pulsar custom resources
//!
//! Watches one kind across all namespaces, filters it down to the resources
//! annotated for this cluster, and runs the kind's reconciler with the
//! stored status. The status produced by each pass is merge-patched back,
//! whether the pass succeeded or not.

use super::{
    error_policy_backoff, event_kind, finalizer_name, next_delay, object_key, retries_left,
    scope, PulsarResource, Scope,
};
use crate::crd::{ResourceSpec, CLUSTER_ANNOTATION};
use crate::error::{OperatorError, Result};
use crate::reconcilers::{dispatch, Context, EventKind, Reconcile, TopicIndex};
use futures::StreamExt;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher::Config;
use kube::{Client, ResourceExt};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Consecutive failures of one object at one generation
#[derive(Default)]
struct RetryCounters {
    counters: Mutex<HashMap<String, (Option<i64>, u32)>>,
}

impl RetryCounters {
    /// Count a failure; a new generation restarts the count.
    fn record_failure(&self, key: &str, generation: Option<i64>) -> u32 {
        let mut counters = self.counters.lock();
        let entry = counters.entry(key.to_string()).or_insert((generation, 0));
        if entry.0 != generation {
            *entry = (generation, 0);
        }
        entry.1 += 1;
        entry.1
    }

    fn reset(&self, key: &str) {
        self.counters.lock().remove(key);
    }
}

/// Next pass due for each object, keyed to the resource version we last
/// wrote. Watch events carrying that version are our own status writes.
#[derive(Default)]
struct PassSchedule {
    due: Mutex<HashMap<String, (String, Instant)>>,
}

impl PassSchedule {
    fn record(&self, key: &str, resource_version: Option<String>, delay: Duration) {
        let mut due = self.due.lock();
        match resource_version {
            Some(version) => {
                due.insert(key.to_string(), (version, Instant::now() + delay));
            }
            None => {
                due.remove(key);
            }
        }
    }

    /// Time left before the scheduled pass when `resource_version` is the
    /// one we wrote ourselves.
    fn pending(&self, key: &str, resource_version: Option<&str>) -> Option<Duration> {
        let due = self.due.lock();
        let (version, at) = due.get(key)?;
        if resource_version != Some(version.as_str()) {
            return None;
        }
        let now = Instant::now();
        (now < *at).then(|| *at - now)
    }

    fn forget(&self, key: &str) {
        self.due.lock().remove(key);
    }
}

/// Shared state of the four controllers
pub struct PulsarController {
    client: Client,
    cluster_name: String,
    context: Context,
    topic_index: Arc<TopicIndex>,
    seen: Mutex<HashSet<String>>,
    retries: RetryCounters,
    schedule: PassSchedule,
}

impl PulsarController {
    pub fn new(
        client: Client,
        cluster_name: impl Into<String>,
        admin: Arc<crate::admin::PulsarAdmin>,
    ) -> Self {
        let topic_index = Arc::new(TopicIndex::new());
        Self {
            client,
            cluster_name: cluster_name.into(),
            context: Context {
                admin,
                topics: topic_index.clone(),
            },
            topic_index,
            seen: Mutex::new(HashSet::new()),
            retries: RetryCounters::default(),
            schedule: PassSchedule::default(),
        }
    }

    /// Run the controller for kind `K` until shutdown.
    pub async fn run<K: PulsarResource>(self: Arc<Self>) -> Result<()> {
        let api: Api<K> = Api::all(self.client.clone());
        let kind = <K::Spec as Reconcile>::KIND.as_str();

        info!(kind = kind, cluster = %self.cluster_name, "Starting controller");

        Controller::new(api, Config::default())
            .shutdown_on_signal()
            .run(
                |obj, ctx| async move { ctx.reconcile(obj).await },
                |obj, error, ctx| {
                    error!(kind = kind, error = %error, "Reconciliation error");
                    error_policy_backoff(obj, error, ctx)
                },
                Arc::clone(&self),
            )
            .for_each(|result| async move {
                match result {
                    Ok((obj, _action)) => {
                        debug!(kind = kind, resource = %obj.name, "Reconciled");
                    }
                    Err(e) => {
                        warn!(kind = kind, error = %e, "Reconciliation failed");
                    }
                }
            })
            .await;

        Ok(())
    }

    async fn reconcile<K: PulsarResource>(&self, obj: Arc<K>) -> Result<Action> {
        let kind = <K::Spec as Reconcile>::KIND;
        let key = format!("{}:{}", kind.as_str(), object_key(&*obj));
        let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);

        let relation = scope(
            obj.annotations(),
            obj.spec().cluster_name(),
            &self.cluster_name,
        );
        obj.observe(&self.topic_index, relation);

        match relation {
            Scope::Managed => {}
            Scope::Adopt => {
                self.adopt(&api, &*obj).await?;
                return Ok(Action::await_change());
            }
            Scope::Ignore => return Ok(Action::await_change()),
        }

        if let Some(wait) = self.schedule.pending(&key, obj.resource_version().as_deref()) {
            debug!(resource = %key, "Skipping event caused by our own status write");
            return Ok(Action::requeue(wait));
        }

        let finalizer = finalizer_name(&self.cluster_name);
        let deleting = obj.meta().deletion_timestamp.is_some();
        if deleting && !obj.finalizers().contains(&finalizer) {
            return Ok(Action::await_change());
        }
        if !deleting {
            self.ensure_finalizer(&api, &*obj, &finalizer).await?;
        }

        let mut status = obj.status().cloned().unwrap_or_default();
        let generation = obj.meta().generation;
        let first_seen = self.seen.lock().insert(key.clone());
        let event = event_kind(deleting, first_seen, generation, status.observed_generation);

        let mut patch = serde_json::Map::new();
        let result = dispatch(
            event,
            obj.spec(),
            &self.context,
            &mut status,
            generation,
            &mut patch,
        )
        .await;

        let mut written_version = obj.resource_version();
        if !patch.is_empty() {
            let patched = api
                .patch_status(
                    &obj.name_any(),
                    &PatchParams::default(),
                    &Patch::Merge(&serde_json::Value::Object(patch)),
                )
                .await
                .map_err(|e| OperatorError::KubeApi(e.to_string()))?;
            written_version = patched.resource_version();
        }

        if event == EventKind::Delete && result.is_ok() {
            self.remove_finalizer(&api, &*obj, &finalizer).await?;
            self.seen.lock().remove(&key);
            self.retries.reset(&key);
            self.schedule.forget(&key);
            return Ok(Action::await_change());
        }

        let attempts = match &result {
            Ok(()) => {
                self.retries.reset(&key);
                0
            }
            Err(_) => self.retries.record_failure(&key, generation),
        };
        if result.is_err() && !retries_left(kind, event, attempts) {
            warn!(resource = %key, attempts = attempts, "Retries exhausted, waiting for the next timer pass");
        }

        let delay = next_delay(kind, event, &result, attempts);
        self.schedule.record(&key, written_version, delay);
        Ok(Action::requeue(delay))
    }

    /// Claim a resource whose spec names this cluster.
    async fn adopt<K: PulsarResource>(&self, api: &Api<K>, obj: &K) -> Result<()> {
        info!(resource = %object_key(obj), cluster = %self.cluster_name, "Adopting resource");
        let patch = serde_json::json!({
            "metadata": {
                "annotations": { CLUSTER_ANNOTATION: self.cluster_name }
            }
        });
        api.patch(&obj.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| OperatorError::KubeApi(e.to_string()))?;
        Ok(())
    }

    /// Ensure the finalizer is present on the resource
    async fn ensure_finalizer<K: PulsarResource>(
        &self,
        api: &Api<K>,
        obj: &K,
        finalizer: &str,
    ) -> Result<()> {
        let finalizers = obj.finalizers();
        if finalizers.iter().any(|f| f == finalizer) {
            return Ok(());
        }

        let mut finalizers = finalizers.to_vec();
        finalizers.push(finalizer.to_string());
        let patch = serde_json::json!({
            "metadata": {
                "finalizers": finalizers
            }
        });
        api.patch(&obj.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| OperatorError::KubeApi(e.to_string()))?;

        Ok(())
    }

    async fn remove_finalizer<K: PulsarResource>(
        &self,
        api: &Api<K>,
        obj: &K,
        finalizer: &str,
    ) -> Result<()> {
        let finalizers: Vec<String> = obj
            .finalizers()
            .iter()
            .filter(|f| f.as_str() != finalizer)
            .cloned()
            .collect();

        let patch = serde_json::json!({
            "metadata": {
                "finalizers": finalizers
            }
        });
        api.patch(&obj.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| OperatorError::KubeApi(e.to_string()))?;

        info!(resource = %object_key(obj), "Finalizer removed");
        Ok(())
    }
}
