//! KNICluster reconciler
//!
//! Each pass re-reads everything it needs from the store and keeps no state
//! between calls, so any pass can be abandoned on error and the next one
//! picks up where the cluster actually is. A pass performs at most the
//! writes needed to move one step closer; the watch events those writes
//! produce trigger the next pass.
//!
//! Lifecycle of the KNICluster:
//!
//! ```text
//! Live, no finalizer --add finalizer--> Live, finalized --converge--> (same)
//!        |                                    |
//!        | delete                             | delete
//!        v                                    v
//!     Removed <--remove finalizer-- Terminating (delete CatalogSource)
//! ```

use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::crd::{CatalogSource, KniCluster};
use crate::error::{Error, Result};
use crate::metrics;
use crate::resources::{self, CATALOG_SOURCE_NAME, CATALOG_SOURCE_NAMESPACE};
use crate::store::{ClusterStore, ObjectKey};

/// Finalizer guarding cleanup of the CatalogSource, which lives outside the
/// KNICluster's namespace and so cannot be owner-collected
pub const FINALIZER_NAME: &str = "knicluster.kni.openshift.com";

/// What a reconcile pass did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The KNICluster does not exist
    Absent,
    /// The finalizer was attached; dependents are handled on the next pass
    FinalizerAdded,
    /// Dependents were checked and created or corrected as needed
    Converged,
    /// Teardown ran and the finalizer was released
    CleanedUp,
    /// Deletion is pending on someone else's finalizer
    AwaitingRemoval,
}

impl Outcome {
    /// Whether the caller should schedule another pass itself.
    ///
    /// Always false: follow-up passes come from watch events, including
    /// the ones caused by this pass's own writes.
    pub fn requeue(&self) -> bool {
        false
    }
}

/// Identity of the managed CatalogSource
pub fn catalog_source_key() -> ObjectKey {
    ObjectKey::new(CATALOG_SOURCE_NAMESPACE, CATALOG_SOURCE_NAME)
}

/// Run one reconcile pass for the KNICluster identified by `key`
pub async fn reconcile(store: &dyn ClusterStore, key: &ObjectKey) -> Result<Outcome> {
    let Some(cluster) = store.get_cluster(key).await? else {
        info!(key = %key, "KNICluster not found, nothing to do");
        return Ok(Outcome::Absent);
    };

    if cluster.metadata.deletion_timestamp.is_none() {
        if !has_finalizer(&cluster) {
            add_finalizer(store, &cluster).await?;
            return Ok(Outcome::FinalizerAdded);
        }
    } else {
        if has_finalizer(&cluster) {
            cleanup(store).await?;
            remove_finalizer(store, &cluster).await?;
            return Ok(Outcome::CleanedUp);
        }
        debug!(key = %key, "KNICluster terminating without our finalizer");
        return Ok(Outcome::AwaitingRemoval);
    }

    ensure_operator_group(store, &cluster).await?;
    ensure_catalog_source(store).await?;
    ensure_subscription(store, &cluster).await?;

    Ok(Outcome::Converged)
}

/// Check if the cluster carries our finalizer
pub fn has_finalizer(cluster: &KniCluster) -> bool {
    cluster.finalizers().iter().any(|f| f == FINALIZER_NAME)
}

async fn add_finalizer(store: &dyn ClusterStore, cluster: &KniCluster) -> Result<()> {
    info!(name = %cluster.name_any(), "Adding finalizer");
    let mut finalizers = cluster.finalizers().to_vec();
    finalizers.push(FINALIZER_NAME.to_string());
    store.update_cluster_finalizers(cluster, finalizers).await?;
    metrics::record_write("KNICluster", "update");
    Ok(())
}

async fn remove_finalizer(store: &dyn ClusterStore, cluster: &KniCluster) -> Result<()> {
    info!(name = %cluster.name_any(), "Removing finalizer");
    let finalizers = cluster
        .finalizers()
        .iter()
        .filter(|f| *f != FINALIZER_NAME)
        .cloned()
        .collect();
    store.update_cluster_finalizers(cluster, finalizers).await?;
    metrics::record_write("KNICluster", "update");
    Ok(())
}

/// Delete what owner references will not.
///
/// OperatorGroup and Subscription are owned and left to the garbage
/// collector. The CatalogSource is deleted by its fixed identity.
async fn cleanup(store: &dyn ClusterStore) -> Result<()> {
    let key = catalog_source_key();
    if store.delete_catalog_source(&key).await? {
        info!(key = %key, "Deleted CatalogSource");
        metrics::record_write("CatalogSource", "delete");
    } else {
        debug!(key = %key, "CatalogSource already gone");
    }
    metrics::CLEANUPS.with_label_values(&["KNICluster"]).inc();
    Ok(())
}

async fn ensure_operator_group(store: &dyn ClusterStore, cluster: &KniCluster) -> Result<()> {
    let namespace = cluster.namespace().unwrap_or_default();
    let mut desired = resources::operator_group(&namespace);
    resources::set_owner(cluster, &mut desired)?;

    let key = ObjectKey::new(&namespace, desired.name_any());
    match store.get_operator_group(&key).await? {
        None => {
            info!(key = %key, "Creating OperatorGroup");
            store.create_operator_group(&desired).await?;
            metrics::record_write("OperatorGroup", "create");
        }
        Some(_) => debug!(key = %key, "OperatorGroup already exists"),
    }
    Ok(())
}

async fn ensure_catalog_source(store: &dyn ClusterStore) -> Result<()> {
    let version = observed_version(store).await?;
    let desired = resources::catalog_source(&version);
    let key = catalog_source_key();

    let Some(found) = store.get_catalog_source(&key).await? else {
        info!(key = %key, version = %version, "Creating CatalogSource");
        store.create_catalog_source(&desired).await?;
        metrics::record_write("CatalogSource", "create");
        return Ok(());
    };

    match image_drift(&found, &desired) {
        Some(image) => {
            info!(
                key = %key,
                from = found.spec.image.as_deref().unwrap_or_default(),
                to = %image,
                "Updating CatalogSource image"
            );
            store.update_catalog_source_image(&found, image).await?;
            metrics::record_write("CatalogSource", "update");
        }
        None => debug!(key = %key, "CatalogSource is up to date"),
    }
    Ok(())
}

/// The desired image if it differs from what is stored
fn image_drift<'a>(found: &CatalogSource, desired: &'a CatalogSource) -> Option<&'a str> {
    let want = desired.spec.image.as_deref()?;
    (found.spec.image.as_deref() != Some(want)).then_some(want)
}

/// Release version published by the cluster's single ClusterVersion
async fn observed_version(store: &dyn ClusterStore) -> Result<String> {
    let versions = store.list_cluster_versions().await?;
    let [cv] = versions.as_slice() else {
        warn!(found = versions.len(), "Unexpected number of ClusterVersions");
        return Err(Error::cluster_version(format!(
            "Expected 1 ClusterVersion, found {}",
            versions.len()
        )));
    };
    cv.desired_version().map(str::to_string).ok_or_else(|| {
        Error::cluster_version(format!(
            "ClusterVersion {} does not publish a desired version",
            cv.name_any()
        ))
    })
}

async fn ensure_subscription(store: &dyn ClusterStore, cluster: &KniCluster) -> Result<()> {
    let namespace = cluster.namespace().unwrap_or_default();
    let mut desired = resources::subscription(&namespace);
    resources::set_owner(cluster, &mut desired)?;

    let key = ObjectKey::new(&namespace, desired.name_any());
    match store.get_subscription(&key).await? {
        None => {
            info!(key = %key, "Creating Subscription");
            store.create_subscription(&desired).await?;
            metrics::record_write("Subscription", "create");
        }
        Some(_) => debug!(key = %key, "Subscription already exists"),
    }
    Ok(())
}
