//! Process configuration
//!
//! Everything is read from flags with environment fallbacks, so the operator
//! runs unchanged from a Deployment manifest.

use crate::admin::{HttpTransportConfig, DEFAULT_TOKEN_PATH};
use crate::error::{OperatorError, Result};
use clap::Parser;
use k8s_openapi::api::core::v1::{Service, ServicePort};
use kube::{Api, Client};
use std::path::PathBuf;
use std::time::Duration;

/// Pulsar admin operator
#[derive(Parser, Debug, Clone)]
#[command(name = "pulsar-admin-operator")]
#[command(version, about = "Kubernetes operator for Pulsar tenants, namespaces, topics and schemas")]
pub struct Args {
    /// Pulsar cluster this instance manages
    #[arg(long, env = "CLUSTER_NAME")]
    pub cluster_name: String,

    /// Admin API root; discovered from the proxy Service when unset
    #[arg(long, env = "PULSAR_API_URL")]
    pub pulsar_api_url: Option<String>,

    /// Proxy Service name (default `{cluster}-pulsar-proxy`)
    #[arg(long, env = "PULSAR_SERVICE_NAME")]
    pub pulsar_service_name: Option<String>,

    /// Namespace of the proxy Service (default `{cluster}-pulsar`)
    #[arg(long, env = "PULSAR_NAMESPACE")]
    pub pulsar_namespace: Option<String>,

    /// Hostname expected in the broker certificate
    #[arg(long, env = "PULSAR_API_SSL_SNI")]
    pub pulsar_api_ssl_sni: Option<String>,

    /// File holding the bearer token
    #[arg(long, env = "PULSAR_TOKEN_PATH", default_value = DEFAULT_TOKEN_PATH)]
    pub pulsar_token_path: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, env = "PULSAR_API_TIMEOUT_SECS", default_value_t = 30)]
    pub pulsar_api_timeout_secs: u64,
}

impl Args {
    pub fn service_name(&self) -> String {
        self.pulsar_service_name
            .clone()
            .unwrap_or_else(|| format!("{}-pulsar-proxy", self.cluster_name))
    }

    pub fn service_namespace(&self) -> String {
        self.pulsar_namespace
            .clone()
            .unwrap_or_else(|| format!("{}-pulsar", self.cluster_name))
    }

    /// Resolve the admin API root, looking up the proxy Service if needed.
    pub async fn api_url(&self, client: &Client) -> Result<String> {
        if let Some(url) = &self.pulsar_api_url {
            return Ok(url.clone());
        }
        discover_api_url(client, &self.service_name(), &self.service_namespace()).await
    }

    pub fn transport_config(&self, base_url: String) -> HttpTransportConfig {
        HttpTransportConfig {
            base_url,
            sni: self.pulsar_api_ssl_sni.clone(),
            token_path: self.pulsar_token_path.clone(),
            timeout: Duration::from_secs(self.pulsar_api_timeout_secs),
        }
    }
}

/// Read the proxy Service and build the admin URL from its ports.
pub async fn discover_api_url(client: &Client, service: &str, namespace: &str) -> Result<String> {
    let api: Api<Service> = Api::namespaced(client.clone(), namespace);
    let svc = api
        .get_opt(service)
        .await?
        .ok_or_else(|| {
            OperatorError::Configuration(format!("Service {}/{} not found", namespace, service))
        })?;

    let ports = svc
        .spec
        .and_then(|spec| spec.ports)
        .unwrap_or_default();
    api_url_from_service(service, namespace, &ports)
}

/// `{proto}://{svc}.{ns}.svc:{port}/admin/v2`, preferring the `https` port.
pub fn api_url_from_service(service: &str, namespace: &str, ports: &[ServicePort]) -> Result<String> {
    let find = |name: &str| {
        ports
            .iter()
            .find(|p| p.name.as_deref() == Some(name))
            .map(|p| p.port)
    };

    let (proto, port) = find("https")
        .map(|port| ("https", port))
        .or_else(|| find("http").map(|port| ("http", port)))
        .ok_or_else(|| {
            OperatorError::Configuration(format!(
                "Service {}/{} exposes neither an https nor an http port",
                namespace, service
            ))
        })?;

    Ok(format!(
        "{}://{}.{}.svc:{}/admin/v2",
        proto, service, namespace, port
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(name: &str, port: i32) -> ServicePort {
        ServicePort {
            name: Some(name.to_string()),
            port,
            ..Default::default()
        }
    }

    #[test]
    fn test_prefers_https_port() {
        let ports = vec![port("http", 8080), port("https", 443)];
        assert_eq!(
            api_url_from_service("dev01-pulsar-proxy", "dev01-pulsar", &ports).unwrap(),
            "https://dev01-pulsar-proxy.dev01-pulsar.svc:443/admin/v2"
        );
    }

    #[test]
    fn test_falls_back_to_http_port() {
        let ports = vec![port("pulsar", 6650), port("http", 8080)];
        assert_eq!(
            api_url_from_service("proxy", "pulsar", &ports).unwrap(),
            "http://proxy.pulsar.svc:8080/admin/v2"
        );
    }

    #[test]
    fn test_no_usable_port() {
        let err = api_url_from_service("proxy", "pulsar", &[port("pulsar", 6650)]).unwrap_err();
        assert!(matches!(err, OperatorError::Configuration(_)));
    }

    #[test]
    fn test_defaults_follow_cluster_name() {
        let args = Args::parse_from(["pulsar-admin-operator", "--cluster-name", "dev01"]);
        assert_eq!(args.service_name(), "dev01-pulsar-proxy");
        assert_eq!(args.service_namespace(), "dev01-pulsar");
        assert_eq!(args.pulsar_api_timeout_secs, 30);

        let config = args.transport_config("http://proxy/admin/v2".to_string());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.token_path, PathBuf::from(DEFAULT_TOKEN_PATH));
    }
}
