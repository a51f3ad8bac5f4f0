//! Reconcilers for KNI Operator resources
//!
//! This module contains the business logic for driving a KNICluster's
//! dependents towards their desired state. Reconcilers are responsible for:
//! - Managing the cleanup finalizer
//! - Creating and correcting dependent resources
//! - Tearing down resources that owner references cannot collect

pub mod kni_cluster;
