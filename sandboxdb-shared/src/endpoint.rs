/// Sandbox database endpoint resolution
///
/// A sandbox database is reached in one of two ways, decided once when the
/// resolver is built:
///
/// - **Direct**: inside the cluster the database pod is addressable by name,
///   so the endpoint is `{sandbox}-db` on the standard PostgreSQL port.
/// - **Tunneled**: outside the cluster (development) a port-forward to the
///   standard port of the `{sandbox}-db` pod is opened and the endpoint is
///   `127.0.0.1` on the tunnel's ephemeral port.
///
/// The configured database port only applies to liveness probes; sandbox
/// workloads always serve on [`STANDARD_PORT`].
///
/// # Example
///
/// ```no_run
/// use sandboxdb_shared::endpoint::{resolver_for, Environment};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let resolver = resolver_for(Environment::Production, None).await?;
/// let resolved = resolver.resolve("acme").await?;
/// assert_eq!(resolved.endpoint().host, "acme-db");
/// resolved.release().await;
/// # Ok(())
/// # }
/// ```

use crate::db::connection::STANDARD_PORT;
use crate::k8s::{K8sResult, KubePortForwarder, PortForwarder, Tunnel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::debug;

/// Deployment environment the tool runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Running outside the cluster; sandbox databases need a tunnel
    Development,

    /// Running inside the cluster
    Production,
}

impl Environment {
    /// Parses an `ENVIRONMENT` value; only "development" selects the tunnel
    pub fn from_name(name: &str) -> Self {
        if name == "development" {
            Environment::Development
        } else {
            Environment::Production
        }
    }
}

/// How a resolved endpoint is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    Direct,
    Tunneled,
}

/// Host and port of a sandbox database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Name of the database workload for a sandbox
pub fn pod_name(sandbox: &str) -> String {
    format!("{}-db", sandbox)
}

/// An endpoint plus whatever keeps it reachable
///
/// For tunneled endpoints this owns the [`Tunnel`]; call
/// [`ResolvedEndpoint::release`] when done. Dropping it also tears the tunnel
/// down.
#[derive(Debug)]
pub struct ResolvedEndpoint {
    endpoint: Endpoint,
    tunnel: Option<Tunnel>,
}

impl ResolvedEndpoint {
    /// An endpoint that needs no tunnel
    pub fn direct(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            tunnel: None,
        }
    }

    /// A loopback endpoint served by `tunnel`
    pub fn tunneled(tunnel: Tunnel) -> Self {
        Self {
            endpoint: Endpoint {
                host: Ipv4Addr::LOCALHOST.to_string(),
                port: tunnel.local_port(),
            },
            tunnel: Some(tunnel),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn mode(&self) -> ConnectionMode {
        if self.tunnel.is_some() {
            ConnectionMode::Tunneled
        } else {
            ConnectionMode::Direct
        }
    }

    /// Releases the tunnel, if any
    pub async fn release(self) {
        if let Some(tunnel) = self.tunnel {
            tunnel.close().await;
        }
    }
}

/// Strategy for reaching a sandbox database
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    /// The mode every endpoint from this resolver uses
    fn mode(&self) -> ConnectionMode;

    /// Resolves the database endpoint of `sandbox`
    async fn resolve(&self, sandbox: &str) -> K8sResult<ResolvedEndpoint>;
}

/// Addresses the database pod by its in-cluster name
#[derive(Debug, Clone)]
pub struct DirectResolver {
    port: u16,
}

impl DirectResolver {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

impl Default for DirectResolver {
    fn default() -> Self {
        Self::new(STANDARD_PORT)
    }
}

#[async_trait]
impl EndpointResolver for DirectResolver {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::Direct
    }

    async fn resolve(&self, sandbox: &str) -> K8sResult<ResolvedEndpoint> {
        let endpoint = Endpoint {
            host: pod_name(sandbox),
            port: self.port,
        };
        debug!(endpoint = %endpoint, "Resolved direct endpoint");
        Ok(ResolvedEndpoint::direct(endpoint))
    }
}

/// Reaches the database pod through a port-forward tunnel
pub struct TunnelResolver {
    forwarder: Arc<dyn PortForwarder>,
    remote_port: u16,
}

impl TunnelResolver {
    pub fn new(forwarder: Arc<dyn PortForwarder>, remote_port: u16) -> Self {
        Self {
            forwarder,
            remote_port,
        }
    }
}

#[async_trait]
impl EndpointResolver for TunnelResolver {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::Tunneled
    }

    async fn resolve(&self, sandbox: &str) -> K8sResult<ResolvedEndpoint> {
        let tunnel = Tunnel::open(
            Arc::clone(&self.forwarder),
            &pod_name(sandbox),
            self.remote_port,
        )
        .await?;
        let resolved = ResolvedEndpoint::tunneled(tunnel);
        debug!(endpoint = %resolved.endpoint(), "Resolved tunneled endpoint");
        Ok(resolved)
    }
}

/// Picks the resolver for an environment
///
/// Development builds a Kubernetes port-forwarder (which loads cluster
/// credentials); every other environment resolves directly. Both target
/// [`STANDARD_PORT`] on the workload.
pub async fn resolver_for(
    environment: Environment,
    namespace: Option<&str>,
) -> K8sResult<Box<dyn EndpointResolver>> {
    match environment {
        Environment::Development => {
            let forwarder = KubePortForwarder::new(namespace).await?;
            Ok(Box::new(TunnelResolver::new(Arc::new(forwarder), STANDARD_PORT)))
        }
        Environment::Production => Ok(Box::new(DirectResolver::default())),
    }
}
