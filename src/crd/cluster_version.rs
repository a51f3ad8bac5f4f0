//! OpenShift ClusterVersion, the cluster-wide record of the installed release

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ClusterVersion specification (config.openshift.io/v1)
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "config.openshift.io",
    version = "v1",
    kind = "ClusterVersion",
    plural = "clusterversions",
    status = "ClusterVersionStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterVersionSpec {
    /// Unique identifier of the cluster
    #[serde(rename = "clusterID", skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,

    /// Update channel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// Release the cluster should be running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_update: Option<Release>,
}

/// ClusterVersion status
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterVersionStatus {
    /// Release the cluster is reconciling towards
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired: Option<Release>,
}

/// A release payload
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// Semantic version of the release
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Release payload image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ClusterVersion {
    /// The version the cluster wants to run.
    ///
    /// Prefers the requested update and falls back to what the cluster
    /// version operator reports as desired.
    pub fn desired_version(&self) -> Option<&str> {
        self.spec
            .desired_update
            .as_ref()
            .and_then(|u| u.version.as_deref())
            .or_else(|| {
                self.status
                    .as_ref()
                    .and_then(|s| s.desired.as_ref())
                    .and_then(|d| d.version.as_deref())
            })
            .filter(|v| !v.is_empty())
    }
}
