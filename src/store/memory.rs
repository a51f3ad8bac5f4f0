//! In-process ClusterStore
//!
//! Mirrors the API server behaviour the reconciler depends on: resource
//! versions checked on every write, deletion held back by finalizers, and
//! garbage collection of objects whose controlling owner disappears. Every
//! successful write is recorded so callers can tell a no-op pass from one
//! that changed something, and single operations can be made to fail once.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::{Resource, ResourceExt};
use parking_lot::Mutex;
use tracing::debug;

use super::{ClusterStore, ObjectKey};
use crate::crd::{CatalogSource, ClusterVersion, KniCluster, OperatorGroup, Subscription};
use crate::error::{Error, Result};

/// Store operations that can be observed or made to fail
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOp {
    GetCluster,
    CreateCluster,
    UpdateClusterFinalizers,
    GetOperatorGroup,
    CreateOperatorGroup,
    GetCatalogSource,
    CreateCatalogSource,
    UpdateCatalogSourceImage,
    DeleteCatalogSource,
    GetSubscription,
    CreateSubscription,
    ListClusterVersions,
}

/// A write that reached the store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Write {
    pub op: StoreOp,
    pub key: ObjectKey,
}

#[derive(Default)]
struct State {
    clusters: BTreeMap<ObjectKey, KniCluster>,
    operator_groups: BTreeMap<ObjectKey, OperatorGroup>,
    catalog_sources: BTreeMap<ObjectKey, CatalogSource>,
    subscriptions: BTreeMap<ObjectKey, Subscription>,
    cluster_versions: BTreeMap<String, ClusterVersion>,
    last_version: u64,
    writes: Vec<Write>,
    failures: Vec<StoreOp>,
}

impl State {
    fn next_version(&mut self) -> String {
        self.last_version += 1;
        self.last_version.to_string()
    }

    /// Fail `op` if a failure was scheduled for it
    fn check(&mut self, op: StoreOp) -> Result<()> {
        match self.failures.iter().position(|f| *f == op) {
            Some(idx) => {
                self.failures.remove(idx);
                Err(Error::store(format!("injected failure for {:?}", op)))
            }
            None => Ok(()),
        }
    }

    fn record(&mut self, op: StoreOp, key: ObjectKey) {
        debug!(?op, key = %key, "Store write");
        self.writes.push(Write { op, key });
    }

    /// Assign server-side metadata to a new object
    fn admit<K: Resource>(&mut self, obj: &mut K) {
        let version = self.next_version();
        let meta = obj.meta_mut();
        meta.uid = Some(format!("uid-{}", version));
        meta.resource_version = Some(version);
        meta.creation_timestamp = Some(Time(Utc::now()));
        meta.deletion_timestamp = None;
    }

    fn remove_cluster(&mut self, key: &ObjectKey) {
        let Some(cluster) = self.clusters.remove(key) else {
            return;
        };
        let Some(uid) = cluster.uid() else {
            return;
        };
        debug!(key = %key, "Collecting objects owned by removed KNICluster");
        self.operator_groups.retain(|_, o| !is_owned_by(o, &uid));
        self.catalog_sources.retain(|_, o| !is_owned_by(o, &uid));
        self.subscriptions.retain(|_, o| !is_owned_by(o, &uid));
    }
}

fn is_owned_by<K: Resource>(obj: &K, uid: &str) -> bool {
    obj.owner_references().iter().any(|r| r.uid == uid)
}

fn key_of<K: Resource>(obj: &K) -> Result<ObjectKey> {
    let meta = obj.meta();
    match (&meta.namespace, &meta.name) {
        (Some(ns), Some(name)) => Ok(ObjectKey::new(ns, name)),
        _ => Err(Error::metadata("object needs both namespace and name")),
    }
}

/// Insert `obj` into `table`, failing if the key is taken
fn insert_new<K: Resource + Clone>(
    state: &mut State,
    table: fn(&mut State) -> &mut BTreeMap<ObjectKey, K>,
    op: StoreOp,
    obj: &K,
) -> Result<K> {
    state.check(op)?;
    let key = key_of(obj)?;
    if table(state).contains_key(&key) {
        return Err(Error::AlreadyExists(key.to_string()));
    }
    let mut stored = obj.clone();
    state.admit(&mut stored);
    table(state).insert(key.clone(), stored.clone());
    state.record(op, key);
    Ok(stored)
}

/// Check that `current` is still the latest version of the stored object
fn check_version<K: Resource>(stored: Option<&K>, current: &K, key: &ObjectKey) -> Result<()> {
    let stored = stored.ok_or_else(|| Error::NotFound(key.to_string()))?;
    if stored.meta().resource_version != current.meta().resource_version {
        return Err(Error::conflict(format!(
            "{} is at version {:?}, write was based on {:?}",
            key,
            stored.meta().resource_version,
            current.meta().resource_version
        )));
    }
    Ok(())
}

/// ClusterStore held entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a ClusterVersion whose desired update is `version`
    pub fn put_cluster_version(&self, name: &str, version: &str) {
        let mut cv = ClusterVersion::new(name, Default::default());
        cv.spec.desired_update = Some(crate::crd::Release {
            version: Some(version.to_string()),
            image: None,
        });
        self.insert_cluster_version(cv);
    }

    /// Store a ClusterVersion as given
    pub fn insert_cluster_version(&self, mut cv: ClusterVersion) {
        let mut state = self.state.lock();
        state.admit(&mut cv);
        state.cluster_versions.insert(cv.name_any(), cv);
    }

    pub fn remove_cluster_version(&self, name: &str) {
        self.state.lock().cluster_versions.remove(name);
    }

    /// Store an object as if an external actor had created it
    pub fn insert_catalog_source(&self, source: CatalogSource) -> Result<CatalogSource> {
        let mut state = self.state.lock();
        let key = key_of(&source)?;
        let mut stored = source;
        state.admit(&mut stored);
        state.catalog_sources.insert(key, stored.clone());
        Ok(stored)
    }

    /// Mark a KNICluster for deletion, as `kubectl delete` would.
    ///
    /// Returns whether the object is still present, i.e. held by finalizers.
    pub fn request_cluster_deletion(&self, key: &ObjectKey) -> bool {
        let mut state = self.state.lock();
        let version = state.next_version();
        let Some(cluster) = state.clusters.get_mut(key) else {
            return false;
        };
        if cluster.finalizers().is_empty() {
            state.remove_cluster(key);
            return false;
        }
        if cluster.metadata.deletion_timestamp.is_none() {
            cluster.metadata.deletion_timestamp = Some(Time(Utc::now()));
            cluster.metadata.resource_version = Some(version);
        }
        true
    }

    /// Make the next `op` fail with a store error
    pub fn fail_next(&self, op: StoreOp) {
        self.state.lock().failures.push(op);
    }

    /// Writes performed through the ClusterStore interface, oldest first
    pub fn writes(&self) -> Vec<Write> {
        self.state.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }

    pub fn cluster(&self, key: &ObjectKey) -> Option<KniCluster> {
        self.state.lock().clusters.get(key).cloned()
    }

    pub fn operator_group(&self, key: &ObjectKey) -> Option<OperatorGroup> {
        self.state.lock().operator_groups.get(key).cloned()
    }

    pub fn catalog_source(&self, key: &ObjectKey) -> Option<CatalogSource> {
        self.state.lock().catalog_sources.get(key).cloned()
    }

    pub fn subscription(&self, key: &ObjectKey) -> Option<Subscription> {
        self.state.lock().subscriptions.get(key).cloned()
    }

    pub fn operator_group_count(&self) -> usize {
        self.state.lock().operator_groups.len()
    }

    pub fn catalog_source_count(&self) -> usize {
        self.state.lock().catalog_sources.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.state.lock().subscriptions.len()
    }
}

#[async_trait]
impl ClusterStore for MemoryStore {
    async fn get_cluster(&self, key: &ObjectKey) -> Result<Option<KniCluster>> {
        let mut state = self.state.lock();
        state.check(StoreOp::GetCluster)?;
        Ok(state.clusters.get(key).cloned())
    }

    async fn create_cluster(&self, cluster: &KniCluster) -> Result<KniCluster> {
        let mut state = self.state.lock();
        insert_new(&mut state, |s| &mut s.clusters, StoreOp::CreateCluster, cluster)
    }

    async fn update_cluster_finalizers(
        &self,
        cluster: &KniCluster,
        finalizers: Vec<String>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.check(StoreOp::UpdateClusterFinalizers)?;
        let key = key_of(cluster)?;
        check_version(state.clusters.get(&key), cluster, &key)?;

        let version = state.next_version();
        let mut release = false;
        if let Some(stored) = state.clusters.get_mut(&key) {
            release = stored.metadata.deletion_timestamp.is_some() && finalizers.is_empty();
            stored.metadata.finalizers = (!finalizers.is_empty()).then_some(finalizers);
            stored.metadata.resource_version = Some(version);
        }
        state.record(StoreOp::UpdateClusterFinalizers, key.clone());
        if release {
            state.remove_cluster(&key);
        }
        Ok(())
    }

    async fn get_operator_group(&self, key: &ObjectKey) -> Result<Option<OperatorGroup>> {
        let mut state = self.state.lock();
        state.check(StoreOp::GetOperatorGroup)?;
        Ok(state.operator_groups.get(key).cloned())
    }

    async fn create_operator_group(&self, group: &OperatorGroup) -> Result<OperatorGroup> {
        let mut state = self.state.lock();
        insert_new(
            &mut state,
            |s| &mut s.operator_groups,
            StoreOp::CreateOperatorGroup,
            group,
        )
    }

    async fn get_catalog_source(&self, key: &ObjectKey) -> Result<Option<CatalogSource>> {
        let mut state = self.state.lock();
        state.check(StoreOp::GetCatalogSource)?;
        Ok(state.catalog_sources.get(key).cloned())
    }

    async fn create_catalog_source(&self, source: &CatalogSource) -> Result<CatalogSource> {
        let mut state = self.state.lock();
        insert_new(
            &mut state,
            |s| &mut s.catalog_sources,
            StoreOp::CreateCatalogSource,
            source,
        )
    }

    async fn update_catalog_source_image(
        &self,
        current: &CatalogSource,
        image: &str,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.check(StoreOp::UpdateCatalogSourceImage)?;
        let key = key_of(current)?;
        check_version(state.catalog_sources.get(&key), current, &key)?;

        let version = state.next_version();
        if let Some(stored) = state.catalog_sources.get_mut(&key) {
            stored.spec.image = Some(image.to_string());
            stored.metadata.resource_version = Some(version);
        }
        state.record(StoreOp::UpdateCatalogSourceImage, key);
        Ok(())
    }

    async fn delete_catalog_source(&self, key: &ObjectKey) -> Result<bool> {
        let mut state = self.state.lock();
        state.check(StoreOp::DeleteCatalogSource)?;
        if state.catalog_sources.remove(key).is_none() {
            return Ok(false);
        }
        state.record(StoreOp::DeleteCatalogSource, key.clone());
        Ok(true)
    }

    async fn get_subscription(&self, key: &ObjectKey) -> Result<Option<Subscription>> {
        let mut state = self.state.lock();
        state.check(StoreOp::GetSubscription)?;
        Ok(state.subscriptions.get(key).cloned())
    }

    async fn create_subscription(&self, subscription: &Subscription) -> Result<Subscription> {
        let mut state = self.state.lock();
        insert_new(
            &mut state,
            |s| &mut s.subscriptions,
            StoreOp::CreateSubscription,
            subscription,
        )
    }

    async fn list_cluster_versions(&self) -> Result<Vec<ClusterVersion>> {
        let mut state = self.state.lock();
        state.check(StoreOp::ListClusterVersions)?;
        Ok(state.cluster_versions.values().cloned().collect())
    }
}
