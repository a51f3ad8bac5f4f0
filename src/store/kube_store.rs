//! ClusterStore backed by the Kubernetes API server

use std::fmt::Debug;

use async_trait::async_trait;
use kube::{
    api::{DeleteParams, ListParams, Patch, PatchParams, PostParams},
    Api, Client, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::debug;

use super::{ClusterStore, ObjectKey};
use crate::crd::{CatalogSource, ClusterVersion, KniCluster, OperatorGroup, Subscription};
use crate::error::{Error, Result};

/// Field manager recorded on every write
const FIELD_MANAGER: &str = "kni-operator";

/// ClusterStore talking to a live cluster
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Create a new store using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn namespaced<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Translate API status codes into the operator's error classes
fn map_api_error(err: kube::Error, what: impl FnOnce() -> String) -> Error {
    match err {
        kube::Error::Api(resp) if resp.code == 409 && resp.reason == "AlreadyExists" => {
            Error::AlreadyExists(what())
        }
        kube::Error::Api(resp) if resp.code == 409 => {
            Error::Conflict(format!("{}: {}", what(), resp.message))
        }
        kube::Error::Api(resp) if resp.code == 404 => Error::NotFound(what()),
        other => Error::Kube(other),
    }
}

async fn get<K>(api: &Api<K>, key: &ObjectKey) -> Result<Option<K>>
where
    K: Clone + DeserializeOwned + Debug,
{
    Ok(api.get_opt(&key.name).await?)
}

async fn create<K>(api: &Api<K>, obj: &K) -> Result<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Debug,
{
    let pp = PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    };
    api.create(&pp, obj)
        .await
        .map_err(|e| map_api_error(e, || obj.name_any()))
}

/// Apply a merge patch that only succeeds if the object is still at `current`'s version
async fn patch_guarded<K>(api: &Api<K>, current: &K, mut patch: serde_json::Value) -> Result<()>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    let name = current.name_any();
    let version = current
        .resource_version()
        .ok_or_else(|| Error::metadata(format!("{} has no resourceVersion", name)))?;
    patch["metadata"]["resourceVersion"] = json!(version);

    let pp = PatchParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    };
    api.patch(&name, &pp, &Patch::Merge(&patch))
        .await
        .map_err(|e| map_api_error(e, || name.clone()))?;
    Ok(())
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn get_cluster(&self, key: &ObjectKey) -> Result<Option<KniCluster>> {
        get(&self.namespaced(&key.namespace), key).await
    }

    async fn create_cluster(&self, cluster: &KniCluster) -> Result<KniCluster> {
        let namespace = cluster.namespace().unwrap_or_default();
        create(&self.namespaced(&namespace), cluster).await
    }

    async fn update_cluster_finalizers(
        &self,
        cluster: &KniCluster,
        finalizers: Vec<String>,
    ) -> Result<()> {
        let namespace = cluster.namespace().unwrap_or_default();
        debug!(name = %cluster.name_any(), namespace = %namespace, ?finalizers, "Patching finalizers");
        let api: Api<KniCluster> = self.namespaced(&namespace);
        patch_guarded(&api, cluster, json!({ "metadata": { "finalizers": finalizers } })).await
    }

    async fn get_operator_group(&self, key: &ObjectKey) -> Result<Option<OperatorGroup>> {
        get(&self.namespaced(&key.namespace), key).await
    }

    async fn create_operator_group(&self, group: &OperatorGroup) -> Result<OperatorGroup> {
        let namespace = group.namespace().unwrap_or_default();
        create(&self.namespaced(&namespace), group).await
    }

    async fn get_catalog_source(&self, key: &ObjectKey) -> Result<Option<CatalogSource>> {
        get(&self.namespaced(&key.namespace), key).await
    }

    async fn create_catalog_source(&self, source: &CatalogSource) -> Result<CatalogSource> {
        let namespace = source.namespace().unwrap_or_default();
        create(&self.namespaced(&namespace), source).await
    }

    async fn update_catalog_source_image(
        &self,
        current: &CatalogSource,
        image: &str,
    ) -> Result<()> {
        let namespace = current.namespace().unwrap_or_default();
        let api: Api<CatalogSource> = self.namespaced(&namespace);
        patch_guarded(&api, current, json!({ "spec": { "image": image } })).await
    }

    async fn delete_catalog_source(&self, key: &ObjectKey) -> Result<bool> {
        let api: Api<CatalogSource> = self.namespaced(&key.namespace);
        match api
            .delete(&key.name, &DeleteParams::default())
            .await
            .map_err(|e| map_api_error(e, || key.to_string()))
        {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_subscription(&self, key: &ObjectKey) -> Result<Option<Subscription>> {
        get(&self.namespaced(&key.namespace), key).await
    }

    async fn create_subscription(&self, subscription: &Subscription) -> Result<Subscription> {
        let namespace = subscription.namespace().unwrap_or_default();
        create(&self.namespaced(&namespace), subscription).await
    }

    async fn list_cluster_versions(&self) -> Result<Vec<ClusterVersion>> {
        let api: Api<ClusterVersion> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }
}
