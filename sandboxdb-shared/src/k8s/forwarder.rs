use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{api::Api, Client};
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use crate::k8s::error::{K8sError, K8sResult};

/// Carries local connections to a port on a cluster workload.
///
/// Kept behind a trait so tunnels can be exercised in tests without a
/// cluster.
#[async_trait]
pub trait PortForwarder: Send + Sync {
    /// Fails with `PodNotFound` when the workload does not exist.
    async fn check_pod(&self, pod: &str) -> K8sResult<()>;

    /// Pipes one accepted local connection to `port` on `pod` until either
    /// side closes.
    async fn forward(&self, pod: &str, port: u16, local: TcpStream) -> K8sResult<()>;
}

/// Port-forwarder backed by the Kubernetes API (websocket port-forward).
pub struct KubePortForwarder {
    pods: Api<Pod>,
}

impl KubePortForwarder {
    /// Create a forwarder that auto-discovers cluster configuration.
    ///
    /// Pods are looked up in `namespace`, or in the client's default
    /// namespace when none is given.
    pub async fn new(namespace: Option<&str>) -> K8sResult<Self> {
        let client = Client::try_default().await?;
        let pods = match namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::default_namespaced(client),
        };
        debug!(namespace = ?namespace, "K8s client initialized");
        Ok(Self { pods })
    }
}

#[async_trait]
impl PortForwarder for KubePortForwarder {
    async fn check_pod(&self, pod: &str) -> K8sResult<()> {
        match self.pods.get(pod).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(err)) if err.code == 404 => {
                Err(K8sError::PodNotFound { name: pod.into() })
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, local))]
    async fn forward(&self, pod: &str, port: u16, mut local: TcpStream) -> K8sResult<()> {
        let forward_err = |message: String| K8sError::PortForward {
            pod: pod.to_string(),
            port,
            message,
        };

        let mut forwarder = self.pods.portforward(pod, &[port]).await.map_err(|e| match e {
            kube::Error::Api(ref err) if err.code == 404 => K8sError::PodNotFound { name: pod.into() },
            _ => forward_err(e.to_string()),
        })?;

        let mut upstream = forwarder
            .take_stream(port)
            .ok_or_else(|| forward_err("stream not available".into()))?;

        let (sent, received) = tokio::io::copy_bidirectional(&mut local, &mut upstream).await?;
        debug!(sent, received, "Forwarded connection closed");

        drop(upstream);
        forwarder
            .join()
            .await
            .map_err(|e| forward_err(e.to_string()))?;

        Ok(())
    }
}
