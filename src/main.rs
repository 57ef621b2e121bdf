//! Pulsar Admin Operator
//!
//! Reconciles Pulsar tenants, namespaces, topics and schemas for one Pulsar
//! cluster.
//!
//! ## Usage
//!
//! ```bash
//! # Run the operator (requires kubeconfig)
//! CLUSTER_NAME=dev01 pulsar-admin-operator
//!
//! # Run with custom log level
//! RUST_LOG=debug pulsar-admin-operator --cluster-name dev01
//! ```

use clap::Parser;
use kube::Client;
use pulsar_admin_operator::admin::{HttpTransport, PulsarAdmin};
use pulsar_admin_operator::config::Args;
use pulsar_admin_operator::{
    PulsarController, PulsarNamespace, PulsarSchema, PulsarTenant, PulsarTopic,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let args = Args::parse();

    info!(cluster = %args.cluster_name, "Starting Pulsar Admin Operator");

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");

    let api_url = args.api_url(&client).await?;
    info!(url = %api_url, sni = ?args.pulsar_api_ssl_sni, "Using Pulsar admin API");

    let transport = HttpTransport::new(args.transport_config(api_url.clone())).await?;
    let admin = Arc::new(PulsarAdmin::new(Arc::new(transport), api_url));

    let controller = Arc::new(PulsarController::new(
        client,
        args.cluster_name.clone(),
        admin,
    ));

    // Run controllers concurrently
    let tenant_handle = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            if let Err(e) = controller.run::<PulsarTenant>().await {
                error!("Tenant controller error: {}", e);
            }
        })
    };

    let namespace_handle = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            if let Err(e) = controller.run::<PulsarNamespace>().await {
                error!("Namespace controller error: {}", e);
            }
        })
    };

    let topic_handle = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            if let Err(e) = controller.run::<PulsarTopic>().await {
                error!("Topic controller error: {}", e);
            }
        })
    };

    let schema_handle = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            if let Err(e) = controller.run::<PulsarSchema>().await {
                error!("Schema controller error: {}", e);
            }
        })
    };

    info!("Pulsar Admin Operator started");

    // Wait for shutdown signal or the first controller to exit
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = tenant_handle => {
            if let Err(e) = result {
                error!("Tenant controller task failed: {}", e);
            }
        }
        result = namespace_handle => {
            if let Err(e) = result {
                error!("Namespace controller task failed: {}", e);
            }
        }
        result = topic_handle => {
            if let Err(e) = result {
                error!("Topic controller task failed: {}", e);
            }
        }
        result = schema_handle => {
            if let Err(e) = result {
                error!("Schema controller task failed: {}", e);
            }
        }
    }

    info!("Pulsar Admin Operator shutting down");
    Ok(())
}
