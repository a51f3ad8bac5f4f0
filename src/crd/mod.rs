//! Custom Resource Definitions used by the KNI Operator
//!
//! `KniCluster` is owned by this operator. The OLM and OpenShift kinds are
//! defined elsewhere; only the fields the operator reads or writes are
//! modelled here.

mod cluster_version;
mod kni_cluster;
mod olm;

pub use cluster_version::*;
pub use kni_cluster::*;
pub use olm::*;

use kube::CustomResourceExt;

use crate::error::Result;

/// Generate the CRD YAML manifests owned by this operator
pub fn generate_crds() -> Result<Vec<String>> {
    Ok(vec![serde_yaml::to_string(&KniCluster::crd())?])
}
