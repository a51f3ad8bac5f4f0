//! Access to the cluster's object store
//!
//! The reconciler only talks to the cluster through [`ClusterStore`], so the
//! same engine runs against the Kubernetes API ([`KubeStore`]) or an
//! in-process store ([`MemoryStore`]).
//!
//! Every write is conditional on the `resourceVersion` of the object it was
//! derived from. A concurrent change makes the write fail with
//! [`Error::Conflict`](crate::Error::Conflict) instead of being lost.

mod kube_store;
mod memory;

pub use kube_store::KubeStore;
pub use memory::{MemoryStore, StoreOp, Write};

use std::fmt;

use async_trait::async_trait;

use crate::crd::{CatalogSource, ClusterVersion, KniCluster, OperatorGroup, Subscription};
use crate::error::Result;

/// Namespace and name of a namespaced object
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Store operations used by the KNICluster reconciler
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Get a KNICluster, `None` if it does not exist
    async fn get_cluster(&self, key: &ObjectKey) -> Result<Option<KniCluster>>;

    /// Create a KNICluster
    async fn create_cluster(&self, cluster: &KniCluster) -> Result<KniCluster>;

    /// Replace the finalizer list of a KNICluster.
    ///
    /// Guarded by the resourceVersion of `cluster`. Once an object marked
    /// for deletion has no finalizers left the store removes it.
    async fn update_cluster_finalizers(
        &self,
        cluster: &KniCluster,
        finalizers: Vec<String>,
    ) -> Result<()>;

    /// Get an OperatorGroup, `None` if it does not exist
    async fn get_operator_group(&self, key: &ObjectKey) -> Result<Option<OperatorGroup>>;

    /// Create an OperatorGroup
    async fn create_operator_group(&self, group: &OperatorGroup) -> Result<OperatorGroup>;

    /// Get a CatalogSource, `None` if it does not exist
    async fn get_catalog_source(&self, key: &ObjectKey) -> Result<Option<CatalogSource>>;

    /// Create a CatalogSource
    async fn create_catalog_source(&self, source: &CatalogSource) -> Result<CatalogSource>;

    /// Set the image of an existing CatalogSource, leaving every other field alone.
    ///
    /// Guarded by the resourceVersion of `current`.
    async fn update_catalog_source_image(&self, current: &CatalogSource, image: &str)
        -> Result<()>;

    /// Delete a CatalogSource. Returns `false` if it was already gone.
    async fn delete_catalog_source(&self, key: &ObjectKey) -> Result<bool>;

    /// Get a Subscription, `None` if it does not exist
    async fn get_subscription(&self, key: &ObjectKey) -> Result<Option<Subscription>>;

    /// Create a Subscription
    async fn create_subscription(&self, subscription: &Subscription) -> Result<Subscription>;

    /// List all ClusterVersions
    async fn list_cluster_versions(&self) -> Result<Vec<ClusterVersion>>;
}
