//! Kubernetes controllers for the KNI Operator
//!
//! This module wires watch streams to the reconciler: which events become
//! reconcile requests, and what happens when a pass fails.

mod kni_cluster_controller;
pub mod mapping;

pub use kni_cluster_controller::run as run_kni_cluster_controller;

use std::sync::Arc;

use crate::store::{ClusterStore, ObjectKey};

/// Shared context for all controllers
pub struct Context {
    /// Store the reconciler reads and writes through
    pub store: Arc<dyn ClusterStore>,

    /// The singleton KNICluster this operator manages
    pub cluster: ObjectKey,
}

impl Context {
    /// Create a new context
    pub fn new(store: Arc<dyn ClusterStore>, cluster: ObjectKey) -> Self {
        Self { store, cluster }
    }
}
