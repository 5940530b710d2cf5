use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::k8s::error::K8sResult;
use crate::k8s::forwarder::PortForwarder;

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// A loopback listener that forwards every accepted connection to a port on
/// a cluster workload.
///
/// The tunnel lives until [`Tunnel::close`] is awaited or the value is
/// dropped. Either way the accept loop and every in-flight forwarded
/// connection are aborted and the local port is released.
#[derive(Debug)]
pub struct Tunnel {
    local_addr: SocketAddr,
    pod: String,
    remote_port: u16,
    task: Option<JoinHandle<()>>,
}

impl Tunnel {
    /// Opens a tunnel to `remote_port` on `pod` via an ephemeral local port.
    ///
    /// The pod is looked up first so a missing workload surfaces here rather
    /// than on the first connection.
    pub async fn open(
        forwarder: Arc<dyn PortForwarder>,
        pod: &str,
        remote_port: u16,
    ) -> K8sResult<Self> {
        forwarder.check_pod(pod).await?;

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let local_addr = listener.local_addr()?;

        let task = tokio::spawn(accept_loop(
            listener,
            forwarder,
            pod.to_string(),
            remote_port,
        ));

        info!(
            pod = %pod,
            remote_port,
            local_port = local_addr.port(),
            "Port-forward tunnel opened"
        );

        Ok(Self {
            local_addr,
            pod: pod.to_string(),
            remote_port,
            task: Some(task),
        })
    }

    /// Loopback address the tunnel listens on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Ephemeral local port assigned to the tunnel.
    pub fn local_port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn pod(&self) -> &str {
        &self.pod
    }

    pub fn remote_port(&self) -> u16 {
        self.remote_port
    }

    /// Tears the tunnel down and waits until the listener is released.
    pub async fn close(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // Cancellation is the expected outcome here.
            let _ = task.await;
            info!(pod = %self.pod, local_port = self.local_port(), "Port-forward tunnel closed");
        }
    }
}

impl Drop for Tunnel {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!(pod = %self.pod, "Port-forward tunnel dropped");
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    forwarder: Arc<dyn PortForwarder>,
    pod: String,
    remote_port: u16,
) {
    // Dropping the set (when this task is aborted) aborts every connection.
    let mut connections = JoinSet::new();
    let mut accept_failures: u32 = 0;

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => {
                        accept_failures = 0;
                        pair
                    }
                    Err(e) => {
                        accept_failures = accept_failures.saturating_add(1);
                        let delay = accept_backoff(accept_failures);
                        warn!(error = %e, retry_in = ?delay, "Tunnel listener failed to accept");
                        // Errors like EMFILE persist until connections finish
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                };
                debug!(peer = %peer, pod = %pod, "Tunnel accepted connection");

                let forwarder = Arc::clone(&forwarder);
                let pod = pod.clone();
                connections.spawn(async move {
                    if let Err(e) = forwarder.forward(&pod, remote_port, stream).await {
                        warn!(error = %e, pod = %pod, "Forwarded connection failed");
                    }
                });
            }
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        warn!(pod = %pod, "Forwarded connection panicked");
                    }
                }
            }
        }
    }
}

/// Delay before retrying after `failures` consecutive accept errors
fn accept_backoff(failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_MIN
        .saturating_mul(1 << exponent)
        .min(ACCEPT_BACKOFF_MAX)
}
