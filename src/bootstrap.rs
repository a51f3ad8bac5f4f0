//! Startup helpers

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::info;

use crate::crd::{KniCluster, KniClusterSpec};
use crate::error::{Error, Result};
use crate::store::{ClusterStore, ObjectKey};

/// Create an empty KNICluster at `key` unless one exists.
///
/// Returns whether a new object was created. Losing a creation race to
/// another actor counts as success.
pub async fn ensure_cluster(store: &dyn ClusterStore, key: &ObjectKey) -> Result<bool> {
    if store.get_cluster(key).await?.is_some() {
        return Ok(false);
    }

    info!(key = %key, "Creating KNICluster resource");
    let cluster = KniCluster {
        metadata: ObjectMeta {
            name: Some(key.name.clone()),
            namespace: Some(key.namespace.clone()),
            ..Default::default()
        },
        spec: KniClusterSpec::default(),
        status: None,
    };

    match store.create_cluster(&cluster).await {
        Ok(_) => Ok(true),
        Err(Error::AlreadyExists(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
