//! Mapping from watched objects to KNICluster reconcile requests
//!
//! Kept free of any watch machinery so the routing rules can be checked
//! directly.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;

use crate::crd::{KniCluster, KNI_GROUP};
use crate::resources::{CATALOG_SOURCE_NAME, CATALOG_SOURCE_NAMESPACE};
use crate::store::ObjectKey;

/// Kinds the controller watches
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchedKind {
    KniCluster,
    OperatorGroup,
    CatalogSource,
    Subscription,
    ClusterVersion,
}

/// The parts of a watched object that routing looks at
#[derive(Clone, Copy, Debug)]
pub struct WatchedObject<'a> {
    pub kind: WatchedKind,
    pub namespace: Option<&'a str>,
    pub name: &'a str,
    pub owner_references: &'a [OwnerReference],
}

impl<'a> WatchedObject<'a> {
    pub fn from_resource<K: Resource>(kind: WatchedKind, obj: &'a K) -> Self {
        let meta = obj.meta();
        Self {
            kind,
            namespace: meta.namespace.as_deref(),
            name: meta.name.as_deref().unwrap_or_default(),
            owner_references: meta.owner_references.as_deref().unwrap_or_default(),
        }
    }
}

/// Decide which KNICluster, if any, an event on `obj` should reconcile.
///
/// - a KNICluster maps to itself
/// - a dependent maps to the KNICluster controlling it
/// - the managed CatalogSource, which has no owner, maps to `cluster`
/// - a ClusterVersion always maps to `cluster`
pub fn map_event(obj: &WatchedObject<'_>, cluster: &ObjectKey) -> Option<ObjectKey> {
    match obj.kind {
        WatchedKind::KniCluster => Some(ObjectKey::new(obj.namespace?, obj.name)),
        WatchedKind::OperatorGroup | WatchedKind::Subscription => controlling_cluster(obj),
        WatchedKind::CatalogSource => controlling_cluster(obj).or_else(|| {
            is_managed_catalog_source(obj).then(|| cluster.clone())
        }),
        WatchedKind::ClusterVersion => Some(cluster.clone()),
    }
}

fn controlling_cluster(obj: &WatchedObject<'_>) -> Option<ObjectKey> {
    let namespace = obj.namespace?;
    obj.owner_references
        .iter()
        .find(|r| r.controller == Some(true) && is_kni_cluster_ref(r))
        .map(|r| ObjectKey::new(namespace, &r.name))
}

fn is_kni_cluster_ref(owner: &OwnerReference) -> bool {
    let group = owner.api_version.split('/').next().unwrap_or_default();
    group == KNI_GROUP && owner.kind == KniCluster::kind(&())
}

fn is_managed_catalog_source(obj: &WatchedObject<'_>) -> bool {
    obj.namespace == Some(CATALOG_SOURCE_NAMESPACE) && obj.name == CATALOG_SOURCE_NAME
}

#[cfg(test)]
mod tests {
    use super::*;

    fn singleton() -> ObjectKey {
        ObjectKey::new("team-a", "kni-cluster")
    }

    fn owner(name: &str, controller: bool) -> OwnerReference {
        OwnerReference {
            api_version: "kni.openshift.com/v1alpha1".to_string(),
            kind: "KNICluster".to_string(),
            name: name.to_string(),
            uid: "uid-1".to_string(),
            controller: Some(controller),
            block_owner_deletion: Some(true),
        }
    }

    fn object<'a>(
        kind: WatchedKind,
        namespace: Option<&'a str>,
        name: &'a str,
        owners: &'a [OwnerReference],
    ) -> WatchedObject<'a> {
        WatchedObject {
            kind,
            namespace,
            name,
            owner_references: owners,
        }
    }

    #[test]
    fn test_kni_cluster_maps_to_itself() {
        let obj = object(WatchedKind::KniCluster, Some("team-b"), "other", &[]);
        assert_eq!(
            map_event(&obj, &singleton()),
            Some(ObjectKey::new("team-b", "other"))
        );
    }

    #[test]
    fn test_owned_dependent_maps_to_owner() {
        let owners = [owner("kni-cluster", true)];
        for kind in [WatchedKind::OperatorGroup, WatchedKind::Subscription] {
            let obj = object(kind, Some("team-a"), "kni", &owners);
            assert_eq!(map_event(&obj, &singleton()), Some(singleton()));
        }
    }

    #[test]
    fn test_dependent_without_controller_owner_is_dropped() {
        let owners = [owner("kni-cluster", false)];
        let obj = object(WatchedKind::Subscription, Some("team-a"), "kni", &owners);
        assert_eq!(map_event(&obj, &singleton()), None);

        let obj = object(WatchedKind::OperatorGroup, Some("team-a"), "kni", &[]);
        assert_eq!(map_event(&obj, &singleton()), None);
    }

    #[test]
    fn test_foreign_owner_is_ignored() {
        let mut foreign = owner("web", true);
        foreign.api_version = "apps/v1".to_string();
        foreign.kind = "Deployment".to_string();
        let owners = [foreign];
        let obj = object(WatchedKind::Subscription, Some("team-a"), "kni", &owners);
        assert_eq!(map_event(&obj, &singleton()), None);
    }

    #[test]
    fn test_cluster_version_always_maps_to_singleton() {
        let obj = object(WatchedKind::ClusterVersion, None, "version", &[]);
        assert_eq!(map_event(&obj, &singleton()), Some(singleton()));
    }

    #[test]
    fn test_managed_catalog_source_maps_to_singleton() {
        let obj = object(WatchedKind::CatalogSource, Some("olm"), "demo-catalog", &[]);
        assert_eq!(map_event(&obj, &singleton()), Some(singleton()));

        let obj = object(WatchedKind::CatalogSource, Some("olm"), "community", &[]);
        assert_eq!(map_event(&obj, &singleton()), None);
    }
}
