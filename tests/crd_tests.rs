//! Tests for resource serialization and the generated CRD manifest

use kni_operator::crd::{generate_crds, ClusterVersion, KniCluster, KniClusterSpec};
use kni_operator::resources;
use kube::Resource;
use serde_json::json;

#[test]
fn crd_manifest_describes_knicluster() {
    let crds = generate_crds().unwrap();
    assert_eq!(crds.len(), 1);

    let manifest = &crds[0];
    assert!(manifest.contains("name: kniclusters.kni.openshift.com"));
    assert!(manifest.contains("kind: KNICluster"));
    assert!(manifest.contains("v1alpha1"));
    assert!(manifest.contains("Namespaced"));
}

#[test]
fn knicluster_type_carries_kind_and_group() {
    assert_eq!(KniCluster::kind(&()), "KNICluster");
    assert_eq!(KniCluster::api_version(&()), "kni.openshift.com/v1alpha1");
    assert_eq!(KniCluster::plural(&()), "kniclusters");

    let value = serde_json::to_value(KniCluster::new("kni-cluster", KniClusterSpec::default())).unwrap();
    assert_eq!(value["kind"], "KNICluster");
    assert_eq!(value["apiVersion"], "kni.openshift.com/v1alpha1");
    assert_eq!(value["spec"], json!({}));
}

#[test]
fn subscription_uses_olm_field_names() {
    let value = serde_json::to_value(resources::subscription("team-a")).unwrap();

    assert_eq!(value["apiVersion"], "operators.coreos.com/v1alpha1");
    assert_eq!(value["kind"], "Subscription");
    assert_eq!(
        value["spec"],
        json!({
            "channel": "singlenamespace-alpha",
            "name": "etcd",
            "source": "demo-catalog",
            "sourceNamespace": "olm",
        })
    );
}

#[test]
fn catalog_source_uses_olm_field_names() {
    let value = serde_json::to_value(resources::catalog_source("4.3.0")).unwrap();

    assert_eq!(value["metadata"]["namespace"], "olm");
    assert_eq!(value["spec"]["sourceType"], "grpc");
    assert_eq!(value["spec"]["displayName"], "KNI Operators");
    assert_eq!(
        value["spec"]["image"],
        "quay.io/mhrivnak/demo-operator-registry:4.3.0"
    );
}

#[test]
fn operator_group_targets_namespace() {
    let value = serde_json::to_value(resources::operator_group("team-a")).unwrap();

    assert_eq!(value["apiVersion"], "operators.coreos.com/v1");
    assert_eq!(value["spec"]["targetNamespaces"], json!(["team-a"]));
}

#[test]
fn cluster_version_prefers_desired_update() {
    let cv: ClusterVersion = serde_json::from_value(json!({
        "apiVersion": "config.openshift.io/v1",
        "kind": "ClusterVersion",
        "metadata": { "name": "version" },
        "spec": {
            "clusterID": "c0ffee",
            "desiredUpdate": { "version": "4.3.1" }
        },
        "status": { "desired": { "version": "4.3.0", "image": "quay.io/ocp:4.3.0" } }
    }))
    .unwrap();

    assert_eq!(cv.desired_version(), Some("4.3.1"));
}

#[test]
fn cluster_version_falls_back_to_status() {
    let cv: ClusterVersion = serde_json::from_value(json!({
        "apiVersion": "config.openshift.io/v1",
        "kind": "ClusterVersion",
        "metadata": { "name": "version" },
        "spec": { "clusterID": "c0ffee" },
        "status": { "desired": { "version": "4.3.0" } }
    }))
    .unwrap();

    assert_eq!(cv.desired_version(), Some("4.3.0"));
}

#[test]
fn cluster_version_without_version_yields_none() {
    let cv: ClusterVersion = serde_json::from_value(json!({
        "apiVersion": "config.openshift.io/v1",
        "kind": "ClusterVersion",
        "metadata": { "name": "version" },
        "spec": { "desiredUpdate": { "version": "" } }
    }))
    .unwrap();

    assert_eq!(cv.desired_version(), None);
}

#[test]
fn knicluster_status_round_trips_related_objects() {
    let cluster: KniCluster = serde_json::from_value(json!({
        "apiVersion": "kni.openshift.com/v1alpha1",
        "kind": "KNICluster",
        "metadata": { "name": "kni-cluster", "namespace": "team-a" },
        "spec": {},
        "status": {
            "relatedObjects": [
                { "kind": "Subscription", "namespace": "team-a", "name": "kni" }
            ]
        }
    }))
    .unwrap();

    let status = cluster.status.unwrap();
    assert_eq!(status.related_objects.len(), 1);
    assert_eq!(status.related_objects[0].kind, "Subscription");
    assert!(status.conditions.is_empty());
}
