//! Operator Lifecycle Manager resources managed on behalf of a KNICluster

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// OperatorGroup specification (operators.coreos.com/v1)
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "operators.coreos.com",
    version = "v1",
    kind = "OperatorGroup",
    plural = "operatorgroups",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct OperatorGroupSpec {
    /// Namespaces the member operators watch
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_namespaces: Vec<String>,
}

/// CatalogSource specification (operators.coreos.com/v1alpha1)
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "operators.coreos.com",
    version = "v1alpha1",
    kind = "CatalogSource",
    plural = "catalogsources",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSourceSpec {
    /// How the catalog is served (grpc, configmap, internal)
    pub source_type: String,

    /// Registry image serving the catalog over grpc
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Publisher shown in the console
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    /// Display name shown in the console
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Subscription specification (operators.coreos.com/v1alpha1)
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "operators.coreos.com",
    version = "v1alpha1",
    kind = "Subscription",
    plural = "subscriptions",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    /// Update channel to follow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// Package to install
    #[serde(rename = "name")]
    pub package: String,

    /// Name of the CatalogSource providing the package
    #[serde(rename = "source")]
    pub catalog_source: String,

    /// Namespace of the CatalogSource providing the package
    #[serde(rename = "sourceNamespace")]
    pub catalog_source_namespace: String,
}
