use thiserror::Error;

/// Result type alias for K8s operations.
pub type K8sResult<T> = Result<T, K8sError>;

/// Errors that can occur while reaching sandbox workloads.
#[derive(Error, Debug)]
pub enum K8sError {
    #[error("K8s API error: {message}")]
    ApiError { message: String },

    #[error("Pod not found: {name}")]
    PodNotFound { name: String },

    #[error("Port-forward to {pod}:{port} failed: {message}")]
    PortForward {
        pod: String,
        port: u16,
        message: String,
    },

    #[error("Local tunnel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<kube::Error> for K8sError {
    fn from(err: kube::Error) -> Self {
        K8sError::ApiError {
            message: err.to_string(),
        }
    }
}
