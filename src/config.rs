//! Operator configuration
//!
//! Everything is read from flags or the environment once at startup and
//! then passed around explicitly.

use clap::Parser;

use crate::error::{Error, Result};
use crate::store::ObjectKey;

/// Default name of the singleton KNICluster
pub const DEFAULT_CLUSTER_NAME: &str = "kni-cluster";

/// KNI Operator - installs KNI components through OLM
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct OperatorConfig {
    /// Namespace of the KNICluster resource
    #[arg(long, env = "KNI_CLUSTER_NAMESPACE")]
    pub namespace: String,

    /// Name of the KNICluster resource
    #[arg(long, env = "KNI_CLUSTER_NAME", default_value = DEFAULT_CLUSTER_NAME)]
    pub name: String,

    /// Port serving /metrics and health probes
    #[arg(long, env = "METRICS_PORT", default_value_t = 8383)]
    pub metrics_port: u16,
}

impl OperatorConfig {
    /// Reject values clap accepts but the operator cannot use
    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(Error::config("KNI_CLUSTER_NAMESPACE unset or empty"));
        }
        if self.name.trim().is_empty() {
            return Err(Error::config("KNI_CLUSTER_NAME is empty"));
        }
        Ok(())
    }

    /// Identity of the KNICluster this operator manages
    pub fn cluster_key(&self) -> ObjectKey {
        ObjectKey::new(&self.namespace, &self.name)
    }
}
