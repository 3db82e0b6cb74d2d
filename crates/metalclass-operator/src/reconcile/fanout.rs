//! Machine-change fan-out
//!
//! There is no index from machine facts to the classes they affect, so every
//! machine change requests a reconcile of every class. Work per change is
//! O(classes).

use crate::observability::metrics;
use crate::store::{ClassKey, InventoryStore};
use futures::{stream, Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// List every class and return one reconcile request per class.
///
/// If the classes cannot be listed the change is dropped: no requests are
/// returned, a warning is logged and `metalclass_fanout_failures_total` is
/// incremented. Classes catch up on the next change or on their periodic
/// resync.
pub async fn fan_out(store: &dyn InventoryStore) -> Vec<ClassKey> {
    match store.list_classes().await {
        Ok(classes) => {
            let keys: Vec<ClassKey> = classes.iter().map(ClassKey::for_class).collect();
            metrics::record_fanout(keys.len());
            keys
        }
        Err(e) => {
            warn!(error = %e, "Failed to list machine classes, dropping machine change");
            metrics::record_fanout_failure();
            Vec::new()
        }
    }
}

/// Stream of class reconcile requests driven by machine changes.
///
/// Subscribes immediately; changes made before this call are not seen.
pub fn trigger_stream(store: Arc<dyn InventoryStore>) -> impl Stream<Item = ClassKey> + Send {
    store
        .machine_changes()
        .then(move |change| {
            let store = store.clone();
            async move {
                let keys = fan_out(store.as_ref()).await;
                debug!(machine = %change.machine, classes = keys.len(), "Machine changed");
                keys
            }
        })
        .flat_map(stream::iter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crds::{MachineClass, MachineClassSpec};
    use crate::observability::metrics::testing;
    use crate::store::MemoryStore;

    fn class(ns: &str, name: &str) -> MachineClass {
        let mut class = MachineClass::new(name, MachineClassSpec::default());
        class.metadata.namespace = Some(ns.to_string());
        class
    }

    #[tokio::test]
    async fn test_one_request_per_class() {
        let store = MemoryStore::new();
        store.put_class(class("lab", "gpu")).await;
        store.put_class(class("lab", "storage")).await;
        store.put_class(class("edge", "gpu")).await;

        let mut keys = fan_out(&store).await;
        keys.sort();
        assert_eq!(
            keys,
            [
                ClassKey::new("edge", "gpu"),
                ClassKey::new("lab", "gpu"),
                ClassKey::new("lab", "storage"),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_failure_requests_nothing() {
        let store = MemoryStore::new();
        store.put_class(class("lab", "gpu")).await;
        store.fail_list_classes(true).await;

        assert!(fan_out(&store).await.is_empty());
    }

    #[tokio::test]
    async fn test_no_classes() {
        assert!(fan_out(&MemoryStore::new()).await.is_empty());
    }

    #[test]
    fn test_fan_out_counts_requests_and_failures() {
        let store = MemoryStore::new();

        let (requested, captured) = testing::capture(async {
            store.put_class(class("lab", "gpu")).await;
            store.put_class(class("lab", "storage")).await;
            let requested = fan_out(&store).await.len();

            store.fail_list_classes(true).await;
            assert!(fan_out(&store).await.is_empty());
            requested
        });

        assert_eq!(requested, 2);
        assert_eq!(captured.counter("metalclass_fanout_requests_total"), Some(2));
        assert_eq!(captured.counter("metalclass_fanout_failures_total"), Some(1));
    }
}
