//! Desired state of the resources a KNICluster depends on
//!
//! Everything here is pure: the builders only need a namespace or a release
//! version and always return the same object for the same input. Which
//! catalog, channel and package are used is fixed policy, not configuration.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};

use crate::crd::{
    CatalogSource, CatalogSourceSpec, KniCluster, OperatorGroup, OperatorGroupSpec, Subscription,
    SubscriptionSpec,
};
use crate::error::{Error, Result};

/// Name shared by the OperatorGroup and Subscription
pub const KNI_RESOURCE_NAME: &str = "kni";

/// Name of the managed CatalogSource
pub const CATALOG_SOURCE_NAME: &str = "demo-catalog";

/// Namespace the managed CatalogSource lives in
pub const CATALOG_SOURCE_NAMESPACE: &str = "olm";

/// Registry image repository; the tag is the cluster release version
pub const CATALOG_IMAGE_REPOSITORY: &str = "quay.io/mhrivnak/demo-operator-registry";

const CATALOG_SOURCE_TYPE: &str = "grpc";
const CATALOG_PUBLISHER: &str = "kni.openshift.com";
const CATALOG_DISPLAY_NAME: &str = "KNI Operators";
const SUBSCRIPTION_CHANNEL: &str = "singlenamespace-alpha";
const SUBSCRIPTION_PACKAGE: &str = "etcd";

/// Catalog registry image for a release version
pub fn catalog_image(version: &str) -> String {
    format!("{}:{}", CATALOG_IMAGE_REPOSITORY, version)
}

/// OperatorGroup targeting the KNICluster's own namespace
pub fn operator_group(namespace: &str) -> OperatorGroup {
    OperatorGroup {
        metadata: ObjectMeta {
            name: Some(KNI_RESOURCE_NAME.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: OperatorGroupSpec {
            target_namespaces: vec![namespace.to_string()],
        },
    }
}

/// CatalogSource serving the KNI operator registry for a release version
pub fn catalog_source(version: &str) -> CatalogSource {
    CatalogSource {
        metadata: ObjectMeta {
            name: Some(CATALOG_SOURCE_NAME.to_string()),
            namespace: Some(CATALOG_SOURCE_NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: CatalogSourceSpec {
            source_type: CATALOG_SOURCE_TYPE.to_string(),
            image: Some(catalog_image(version)),
            publisher: Some(CATALOG_PUBLISHER.to_string()),
            display_name: Some(CATALOG_DISPLAY_NAME.to_string()),
        },
    }
}

/// Subscription installing the KNI package from the managed catalog
pub fn subscription(namespace: &str) -> Subscription {
    Subscription {
        metadata: ObjectMeta {
            name: Some(KNI_RESOURCE_NAME.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: SubscriptionSpec {
            channel: Some(SUBSCRIPTION_CHANNEL.to_string()),
            package: SUBSCRIPTION_PACKAGE.to_string(),
            catalog_source: CATALOG_SOURCE_NAME.to_string(),
            catalog_source_namespace: CATALOG_SOURCE_NAMESPACE.to_string(),
        },
    }
}

/// Make `owner` the controlling owner of `child`.
///
/// Replaces any existing controller reference, keeps the others. Fails if
/// the owner has not been persisted yet (no uid).
pub fn set_owner<K: Resource>(owner: &KniCluster, child: &mut K) -> Result<()> {
    let owner_ref = owner.controller_owner_ref(&()).ok_or_else(|| {
        Error::metadata(format!(
            "KNICluster {} has no uid, cannot own {}",
            owner.name_any(),
            child.meta().name.as_deref().unwrap_or_default()
        ))
    })?;

    let refs = child.meta_mut().owner_references.get_or_insert_with(Vec::new);
    refs.retain(|r| r.controller != Some(true));
    refs.push(owner_ref);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::KniClusterSpec;

    fn persisted_cluster() -> KniCluster {
        let mut cluster = KniCluster::new("kni-cluster", KniClusterSpec::default());
        cluster.metadata.namespace = Some("team-a".to_string());
        cluster.metadata.uid = Some("0b7c1c3e".to_string());
        cluster
    }

    #[test]
    fn test_catalog_source_image_tracks_version() {
        let cs = catalog_source("4.3.0");
        assert_eq!(cs.metadata.name.as_deref(), Some("demo-catalog"));
        assert_eq!(cs.metadata.namespace.as_deref(), Some("olm"));
        assert!(cs.spec.image.as_deref().unwrap().ends_with(":4.3.0"));
        assert_eq!(cs.spec.source_type, "grpc");
    }

    #[test]
    fn test_catalog_source_identity_is_version_independent() {
        let a = catalog_source("4.3.0");
        let b = catalog_source("latest");
        assert_eq!(a.metadata.name, b.metadata.name);
        assert_eq!(a.metadata.namespace, b.metadata.namespace);
        assert_ne!(a.spec.image, b.spec.image);
    }

    #[test]
    fn test_subscription_references_catalog_source() {
        let sub = subscription("team-a");
        let cs = catalog_source("4.3.0");
        assert_eq!(sub.metadata.namespace.as_deref(), Some("team-a"));
        assert_eq!(Some(&sub.spec.catalog_source), cs.metadata.name.as_ref());
        assert_eq!(
            Some(&sub.spec.catalog_source_namespace),
            cs.metadata.namespace.as_ref()
        );
        assert_eq!(sub.spec.package, "etcd");
    }

    #[test]
    fn test_operator_group_targets_own_namespace() {
        let og = operator_group("team-a");
        assert_eq!(og.metadata.name.as_deref(), Some("kni"));
        assert_eq!(og.spec.target_namespaces, vec!["team-a".to_string()]);
    }

    #[test]
    fn test_builders_are_deterministic() {
        assert_eq!(subscription("ns").spec, subscription("ns").spec);
        assert_eq!(operator_group("ns").spec, operator_group("ns").spec);
        assert_eq!(catalog_source("1").spec, catalog_source("1").spec);
    }

    #[test]
    fn test_set_owner_adds_controller_reference() {
        let cluster = persisted_cluster();
        let mut og = operator_group("team-a");
        set_owner(&cluster, &mut og).unwrap();
        set_owner(&cluster, &mut og).unwrap();

        let refs = og.metadata.owner_references.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, "KNICluster");
        assert_eq!(refs[0].name, "kni-cluster");
        assert_eq!(refs[0].uid, "0b7c1c3e");
        assert_eq!(refs[0].controller, Some(true));
    }

    #[test]
    fn test_set_owner_requires_persisted_owner() {
        let mut cluster = persisted_cluster();
        cluster.metadata.uid = None;
        let mut sub = subscription("team-a");
        assert!(matches!(
            set_owner(&cluster, &mut sub),
            Err(Error::Metadata(_))
        ));
    }
}
