//! KNICluster controller
//!
//! Watches the KNICluster and everything it depends on, and triggers
//! reconciliation of the singleton.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::{
    api::ListParams,
    runtime::{
        controller::{Action, Controller},
        reflector::ObjectRef,
        watcher::Config as WatcherConfig,
    },
    Api, Client, Resource, ResourceExt,
};
use tracing::{error, info, instrument, warn};

use super::mapping::{map_event, WatchedKind, WatchedObject};
use crate::controllers::Context;
use crate::crd::{CatalogSource, ClusterVersion, KniCluster, OperatorGroup, Subscription};
use crate::error::{Error, Result};
use crate::metrics;
use crate::reconcilers::kni_cluster as kni_cluster_reconciler;
use crate::resources::CATALOG_SOURCE_NAMESPACE;
use crate::store::ObjectKey;

/// Fallback requeue for outcomes that ask for one
const REQUEUE_INTERVAL: Duration = Duration::from_secs(60);

/// Run the KNICluster controller
pub async fn run(client: Client, context: Arc<Context>) {
    let cluster = context.cluster.clone();
    let api: Api<KniCluster> = Api::namespaced(client.clone(), &cluster.namespace);

    // Verify CRD is installed
    if let Err(e) = api.list(&ListParams::default().limit(1)).await {
        error!("KNICluster CRD not installed: {}", e);
        return;
    }

    info!(cluster = %cluster, "Starting KNICluster controller");

    let primary = WatcherConfig::default().fields(&format!("metadata.name={}", cluster.name));

    Controller::new(api, primary)
        .watches(
            Api::<OperatorGroup>::namespaced(client.clone(), &cluster.namespace),
            WatcherConfig::default(),
            route(WatchedKind::OperatorGroup, cluster.clone()),
        )
        .watches(
            Api::<CatalogSource>::namespaced(client.clone(), CATALOG_SOURCE_NAMESPACE),
            WatcherConfig::default(),
            route(WatchedKind::CatalogSource, cluster.clone()),
        )
        .watches(
            Api::<Subscription>::namespaced(client.clone(), &cluster.namespace),
            WatcherConfig::default(),
            route(WatchedKind::Subscription, cluster.clone()),
        )
        .watches(
            Api::<ClusterVersion>::all(client),
            WatcherConfig::default(),
            route(WatchedKind::ClusterVersion, cluster),
        )
        .shutdown_on_signal()
        .run(reconcile, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    info!(
                        name = %obj.name,
                        namespace = obj.namespace.as_deref().unwrap_or_default(),
                        "Reconciled KNICluster"
                    );
                }
                Err(e) => {
                    error!(error = %e, "Reconciliation error");
                    metrics::RECONCILIATION_ERRORS.with_label_values(&["KNICluster"]).inc();
                }
            }
        })
        .await;
}

/// Turn events on `kind` into reconcile requests for the KNICluster
fn route<K: Resource + 'static>(
    kind: WatchedKind,
    cluster: ObjectKey,
) -> impl Fn(K) -> Option<ObjectRef<KniCluster>> + Send + Sync + 'static {
    move |obj| {
        map_event(&WatchedObject::from_resource(kind, &obj), &cluster)
            .map(|key| ObjectRef::new(&key.name).within(&key.namespace))
    }
}

/// Main reconciliation function
#[instrument(skip(ctx, obj), fields(name = %obj.name_any(), namespace = obj.namespace()))]
async fn reconcile(obj: Arc<KniCluster>, ctx: Arc<Context>) -> Result<Action> {
    let _timer = metrics::RECONCILE_DURATION
        .with_label_values(&["KNICluster"])
        .start_timer();
    metrics::RECONCILIATIONS.with_label_values(&["KNICluster"]).inc();

    let key = ObjectKey::new(obj.namespace().unwrap_or_default(), obj.name_any());
    let outcome = kni_cluster_reconciler::reconcile(ctx.store.as_ref(), &key).await?;
    info!(?outcome, "Reconcile pass finished");

    if outcome.requeue() {
        Ok(Action::requeue(REQUEUE_INTERVAL))
    } else {
        Ok(Action::await_change())
    }
}

/// Error policy for the controller
fn error_policy(obj: Arc<KniCluster>, error: &Error, _ctx: Arc<Context>) -> Action {
    let name = obj.name_any();
    let requeue_duration = error.requeue_after();

    if error.is_retryable() {
        warn!(
            name = %name,
            error = %error,
            retry_in = ?requeue_duration,
            "Reconciliation failed, scheduling retry"
        );
    } else {
        error!(
            name = %name,
            error = %error,
            retry_in = ?requeue_duration,
            "Reconciliation failed and needs attention"
        );
    }

    Action::requeue(requeue_duration)
}
