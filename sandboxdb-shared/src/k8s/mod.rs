//! Cluster access for sandbox workloads.
//!
//! This module provides:
//! - A trait-based port-forward abstraction for testability
//! - Production implementation using the kube crate
//! - A scoped loopback [`Tunnel`] layered over a port-forward

mod error;
mod forwarder;
mod tunnel;

pub use error::{K8sError, K8sResult};
pub use forwarder::{KubePortForwarder, PortForwarder};
pub use tunnel::Tunnel;
