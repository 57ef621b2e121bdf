//! Schema registry client

use super::error::{api_error, api_error_or_not_found, PulsarResult};
use super::{HttpMethod, PulsarAdmin, PulsarError, ResourceClient};
use crate::crd::SchemaSpec;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// The schema registered for one topic
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub tenant: String,
    pub namespace: String,
    pub topic: String,
    pub schema_type: String,
    /// Schema definition as a structured document
    pub schema: Value,
    /// Version assigned by the registry
    pub version: Option<i64>,
    pub properties: BTreeMap<String, String>,
}

impl From<&SchemaSpec> for Schema {
    fn from(spec: &SchemaSpec) -> Self {
        Self {
            tenant: spec.tenant.clone(),
            namespace: spec.namespace.clone(),
            topic: spec.topic.clone(),
            schema_type: spec.schema_type.clone(),
            schema: spec.schema.clone(),
            version: None,
            properties: spec.properties.clone().unwrap_or_default(),
        }
    }
}

impl Schema {
    /// Registry payload; the definition travels as a JSON encoded string.
    fn payload(&self) -> Value {
        let mut body = json!({
            "type": self.schema_type,
            "schema": self.schema.to_string(),
        });
        if !self.properties.is_empty() {
            body["properties"] = json!(self.properties);
        }
        body
    }
}

/// GET answer of the registry
#[derive(Deserialize)]
struct SchemaInfo {
    #[serde(default)]
    version: Option<i64>,
    #[serde(rename = "type")]
    schema_type: String,
    data: String,
    #[serde(default)]
    properties: Option<BTreeMap<String, String>>,
}

/// POST answer of the registry, `{"version": {"version": N}}`
#[derive(Deserialize)]
struct PostSchemaResponse {
    #[serde(default)]
    version: Option<SchemaVersion>,
}

#[derive(Deserialize)]
struct SchemaVersion {
    #[serde(default)]
    version: Option<i64>,
}

pub struct SchemaClient<'a> {
    admin: &'a PulsarAdmin,
}

impl<'a> SchemaClient<'a> {
    pub(crate) fn new(admin: &'a PulsarAdmin) -> Self {
        Self { admin }
    }

    fn url(&self, schema: &Schema) -> String {
        self.admin.url(&format!(
            "/schemas/{}/{}/{}/schema",
            schema.tenant, schema.namespace, schema.topic
        ))
    }
}

#[async_trait]
impl ResourceClient for SchemaClient<'_> {
    type Model = Schema;

    async fn get(&self, desired: &Schema) -> PulsarResult<Schema> {
        let res = self
            .admin
            .send(HttpMethod::Get, &self.url(desired), None)
            .await?;
        if res.status != 200 {
            return Err(api_error_or_not_found(
                &res,
                &format!(
                    "Schema of {}/{}/{}",
                    desired.tenant, desired.namespace, desired.topic
                ),
            ));
        }

        let info: SchemaInfo = res.json()?;
        let schema = serde_json::from_str(&info.data)
            .map_err(|e| PulsarError::Parsing(format!("Schema definition: {}", e)))?;

        Ok(Schema {
            tenant: desired.tenant.clone(),
            namespace: desired.namespace.clone(),
            topic: desired.topic.clone(),
            schema_type: info.schema_type,
            schema,
            version: info.version,
            properties: info.properties.unwrap_or_default(),
        })
    }

    /// Registering is an upsert.
    async fn create(&self, desired: &Schema) -> PulsarResult<Schema> {
        self.update(desired).await
    }

    /// Register `desired` as the next version.
    ///
    /// 200 through 202 count as success. A 409 means the registry rejected
    /// the schema under the namespace compatibility strategy.
    async fn update(&self, desired: &Schema) -> PulsarResult<Schema> {
        let res = self
            .admin
            .send(HttpMethod::Post, &self.url(desired), Some(&desired.payload()))
            .await?;

        match res.status {
            200..=202 => {
                let mut registered = desired.clone();
                if !res.body.trim().is_empty() {
                    let answer: PostSchemaResponse = res.json()?;
                    if let Some(version) = answer.version.and_then(|v| v.version) {
                        registered.version = Some(version);
                    }
                }
                Ok(registered)
            }
            409 => Err(PulsarError::Incompatible),
            _ => Err(api_error(&res)),
        }
    }

    /// Delete every version. Only a 200 counts as success.
    async fn delete(&self, desired: &Schema) -> PulsarResult<()> {
        let res = self
            .admin
            .send(HttpMethod::Delete, &self.url(desired), None)
            .await?;
        if res.status != 200 {
            return Err(api_error(&res));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::mock::MockTransport;
    use std::sync::Arc;

    const BASE: &str = "http://pulsar/admin/v2";
    const URL: &str = "http://pulsar/admin/v2/schemas/acme/orders/created/schema";

    fn desired() -> Schema {
        Schema {
            tenant: "acme".to_string(),
            namespace: "orders".to_string(),
            topic: "created".to_string(),
            schema_type: "AVRO".to_string(),
            schema: json!({"type": "record", "name": "Order", "fields": []}),
            version: None,
            properties: [("owner".to_string(), "billing".to_string())]
                .into_iter()
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_update_posts_encoded_definition_and_reads_version() {
        let mock = Arc::new(MockTransport::new());
        mock.on_json(HttpMethod::Post, URL, 202, json!({"version": {"version": 3}}));
        let admin = PulsarAdmin::new(mock.clone(), BASE);

        let registered = admin.schemas().update(&desired()).await.unwrap();
        assert_eq!(registered.version, Some(3));

        let body = mock.requests()[0].body.clone().unwrap();
        assert_eq!(body["type"], "AVRO");
        assert!(body["schema"].is_string());
        let decoded: Value = serde_json::from_str(body["schema"].as_str().unwrap()).unwrap();
        assert_eq!(decoded, desired().schema);
        assert_eq!(body["properties"], json!({"owner": "billing"}));
    }

    #[tokio::test]
    async fn test_update_without_version_in_answer() {
        let mock = Arc::new(MockTransport::new());
        mock.on_json(HttpMethod::Post, URL, 200, json!({}));
        let admin = PulsarAdmin::new(mock, BASE);
        let registered = admin.schemas().update(&desired()).await.unwrap();
        assert_eq!(registered.version, None);
    }

    #[tokio::test]
    async fn test_update_conflict_is_incompatible() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Post, URL, 409, r#"{"reason":"Incompatible schema"}"#);
        let admin = PulsarAdmin::new(mock, BASE);
        let err = admin.schemas().update(&desired()).await.unwrap_err();
        assert_eq!(err, PulsarError::Incompatible);
    }

    #[tokio::test]
    async fn test_update_unparseable_answer() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Post, URL, 200, "<html>");
        let admin = PulsarAdmin::new(mock, BASE);
        let err = admin.schemas().update(&desired()).await.unwrap_err();
        assert!(matches!(err, PulsarError::Parsing(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_203() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Post, URL, 203, "");
        let admin = PulsarAdmin::new(mock, BASE);
        let err = admin.schemas().update(&desired()).await.unwrap_err();
        assert_eq!(err.status(), Some(203));
    }

    #[tokio::test]
    async fn test_get_decodes_definition() {
        let mock = Arc::new(MockTransport::new());
        mock.on_json(
            HttpMethod::Get,
            URL,
            200,
            json!({
                "version": 3,
                "type": "AVRO",
                "timestamp": 1700000000000u64,
                "data": desired().schema.to_string(),
                "properties": {"owner": "billing"},
            }),
        );
        let admin = PulsarAdmin::new(mock, BASE);

        let schema = admin.schemas().get(&desired()).await.unwrap();
        assert_eq!(
            schema,
            Schema {
                version: Some(3),
                ..desired()
            }
        );
    }

    #[tokio::test]
    async fn test_exists_on_404() {
        let mock = Arc::new(MockTransport::new());
        let admin = PulsarAdmin::new(mock, BASE);
        assert!(!admin.schemas().exists(&desired()).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_requires_200() {
        let mock = Arc::new(MockTransport::new());
        mock.on(HttpMethod::Delete, URL, 204, "");
        let admin = PulsarAdmin::new(mock, BASE);
        assert!(admin.schemas().delete(&desired()).await.is_err());

        let mock = Arc::new(MockTransport::new());
        mock.on_json(HttpMethod::Delete, URL, 200, json!({"version": 3}));
        let admin = PulsarAdmin::new(mock, BASE);
        admin.schemas().delete(&desired()).await.unwrap();
    }
}
