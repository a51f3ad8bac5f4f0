//! KNI Kubernetes Operator
//!
//! This operator keeps the OLM resources that install KNI components in
//! line with a singleton KNICluster resource.

pub mod bootstrap;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod metrics;
pub mod reconcilers;
pub mod resources;
pub mod store;

pub use error::{Error, Result};
pub use store::{ClusterStore, ObjectKey};
