//! Wire rendering of typed settings.
//!
//! A settings struct describes its fields once, through [`SettingsModel::fields`],
//! and gets two renderings from that description: a flat full-replace body and
//! a set of single-field patch operations.

use super::transport::HttpMethod;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One single-field write against a resource's base path.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchOperation {
    pub method: HttpMethod,
    pub sub_path: String,
    pub value: Value,
}

impl PatchOperation {
    /// Absolute URL of this operation under `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url, self.sub_path)
    }
}

/// Rendering metadata and current value of one settings field.
#[derive(Debug, Clone)]
pub struct SettingsField {
    name: &'static str,
    alias: Option<&'static str>,
    sub_path: Option<&'static str>,
    method: HttpMethod,
    immutable: bool,
    value: Option<Value>,
}

impl SettingsField {
    /// Describe field `name` (snake_case) holding `value`.
    pub fn new<T: Serialize>(name: &'static str, value: &Option<T>) -> Self {
        let value = value
            .as_ref()
            .and_then(|v| serde_json::to_value(v).ok())
            .map(prune_nulls)
            .filter(|v| !v.is_null());

        Self {
            name,
            alias: None,
            sub_path: None,
            method: HttpMethod::Post,
            immutable: false,
            value,
        }
    }

    /// Key used on the wire instead of the camelCase field name.
    pub fn alias(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }

    /// Sub-path used instead of `/` + camelCase field name.
    pub fn path(mut self, sub_path: &'static str) -> Self {
        self.sub_path = Some(sub_path);
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Read back from the broker but never written.
    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    pub fn wire_key(&self) -> String {
        self.alias
            .map(str::to_string)
            .unwrap_or_else(|| camelize(self.name))
    }

    fn sub_path(&self) -> String {
        self.sub_path
            .map(str::to_string)
            .unwrap_or_else(|| format!("/{}", camelize(self.name)))
    }

    fn writable_value(&self) -> Option<&Value> {
        if self.immutable {
            return None;
        }
        self.value.as_ref()
    }
}

/// A typed settings object with declarative field metadata.
pub trait SettingsModel {
    fn fields(&self) -> Vec<SettingsField>;

    /// Flat map of every set, writable field keyed by its wire name.
    fn full_replace_dict(&self) -> Map<String, Value> {
        self.fields()
            .into_iter()
            .filter_map(|field| {
                let value = field.writable_value()?.clone();
                Some((field.wire_key(), value))
            })
            .collect()
    }

    /// Single-field writes keyed by wire name.
    fn patch_operations(&self) -> BTreeMap<String, PatchOperation> {
        self.fields()
            .into_iter()
            .filter_map(|field| {
                let value = field.writable_value()?.clone();
                let op = PatchOperation {
                    method: field.method,
                    sub_path: field.sub_path(),
                    value,
                };
                Some((field.wire_key(), op))
            })
            .collect()
    }
}

/// `max_consumers_per_topic` -> `maxConsumersPerTopic`
pub fn camelize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = !out.is_empty();
            continue;
        }
        if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn prune_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, prune_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(prune_nulls).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Nested {
        enabled: Option<bool>,
        limit: Option<i32>,
    }

    struct Sample {
        max_consumers_per_topic: Option<i32>,
        retention: Option<Nested>,
        strategy: Option<String>,
        bundles: Option<i32>,
        unset: Option<bool>,
    }

    impl SettingsModel for Sample {
        fn fields(&self) -> Vec<SettingsField> {
            vec![
                SettingsField::new("max_consumers_per_topic", &self.max_consumers_per_topic)
                    .alias("max_consumers_per_topic"),
                SettingsField::new("retention", &self.retention).path("/retentionPolicy"),
                SettingsField::new("strategy", &self.strategy).method(HttpMethod::Put),
                SettingsField::new("bundles", &self.bundles).immutable(),
                SettingsField::new("unset", &self.unset),
            ]
        }
    }

    fn sample() -> Sample {
        Sample {
            max_consumers_per_topic: Some(10),
            retention: Some(Nested {
                enabled: Some(true),
                limit: None,
            }),
            strategy: Some("FULL".to_string()),
            bundles: Some(4),
            unset: None,
        }
    }

    #[test]
    fn test_camelize() {
        assert_eq!(camelize("max_consumers_per_topic"), "maxConsumersPerTopic");
        assert_eq!(camelize("deduplicationEnabled"), "deduplicationEnabled");
        assert_eq!(camelize("properties"), "properties");
    }

    #[test]
    fn test_full_replace_excludes_unset_and_immutable() {
        let dict = sample().full_replace_dict();
        assert_eq!(
            Value::Object(dict),
            json!({
                "max_consumers_per_topic": 10,
                "retention": {"enabled": true},
                "strategy": "FULL",
            })
        );
    }

    #[test]
    fn test_patch_operations_defaults_and_overrides() {
        let ops = sample().patch_operations();
        assert_eq!(ops.len(), 3);
        assert_eq!(
            ops["max_consumers_per_topic"],
            PatchOperation {
                method: HttpMethod::Post,
                sub_path: "/maxConsumersPerTopic".to_string(),
                value: json!(10),
            }
        );
        assert_eq!(ops["retention"].sub_path, "/retentionPolicy");
        assert_eq!(ops["retention"].value, json!({"enabled": true}));
        assert_eq!(ops["strategy"].method, HttpMethod::Put);
        assert!(!ops.contains_key("bundles"));
        assert!(!ops.contains_key("unset"));
    }

    #[test]
    fn test_patch_operation_url() {
        let ops = sample().patch_operations();
        assert_eq!(
            ops["strategy"].url("http://pulsar/admin/v2/namespaces/t/ns"),
            "http://pulsar/admin/v2/namespaces/t/ns/strategy"
        );
    }
}
