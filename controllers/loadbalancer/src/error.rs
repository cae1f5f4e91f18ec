//! Controller-specific error types.
//!
//! `ReconcileError` is what the load balancer engine reports for one
//! reconciliation; `ControllerError` wraps it together with the Kubernetes and
//! configuration failures of the binary.

use ah_client::AhError;
use kube::Error as KubeError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while converging one load balancer.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Load balancer exists but is still transitioning
    #[error("Load balancer is not active yet: {state}")]
    NotActive { state: String },

    /// Declarative input is malformed; nothing was sent to the API
    #[error("Invalid load balancer configuration: {0}")]
    Validation(String),

    /// Delete requested while a delete is already running
    #[error("Load balancer is already in deletion state")]
    AlreadyDeleting,

    /// Load balancer referenced by the stored id does not exist
    #[error("Load balancer not found: {0}")]
    NotFound(String),

    /// More than one load balancer carries the name used for recovery
    #[error("{count} load balancers are named '{name}', refusing to guess")]
    AmbiguousName { name: String, count: usize },

    /// Load balancer was created but its id could not be stored on the object
    #[error("Failed to record load balancer id {id}: {reason}")]
    Binding { id: String, reason: String },

    /// Convergence poll gave up
    #[error("Timed out after {timeout:?} waiting for {what} to become {target} (last state: {last_state})")]
    PollTimeout {
        what: String,
        target: String,
        last_state: String,
        timeout: Duration,
    },

    /// Caller cancelled the reconciliation
    #[error("Reconciliation cancelled")]
    Cancelled,

    /// Advanced Hosting API error, passed through unchanged
    #[error(transparent)]
    Remote(#[from] AhError),
}

impl ReconcileError {
    /// Conditions that clear up on their own; reconcile again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReconcileError::NotActive { .. }
                | ReconcileError::PollTimeout { .. }
                | ReconcileError::AlreadyDeleting
        )
    }

    /// Remote object is gone.
    pub fn is_not_found(&self) -> bool {
        match self {
            ReconcileError::NotFound(_) => true,
            ReconcileError::Remote(e) => e.is_not_found(),
            _ => false,
        }
    }
}

/// Errors returned by an identity binder.
#[derive(Debug, Error)]
pub enum BindError {
    /// Kubernetes API error (including resourceVersion conflicts)
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Binder refused to record the id
    #[error("{0}")]
    Rejected(String),
}

/// Errors that can occur in the load balancer controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Advanced Hosting API error outside a reconciliation (startup lookups)
    #[error("Advanced Hosting error: {0}")]
    Ah(#[from] AhError),

    /// Load balancer reconciliation failed
    #[error("Reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
