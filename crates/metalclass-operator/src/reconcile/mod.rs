//! Class reconciliation
//!
//! One reconcile recomputes a single class's status from scratch:
//!
//! 1. `Fetching`    - read the class and the accepted machines
//! 2. `Filtering`   - apply the class qualifiers ([`filter`])
//! 3. `Aggregating` - split matches into available / in use ([`status`])
//! 4. `Committing`  - write the status if it changed ([`commit`])
//!
//! The status is a pure function of the current machines, so running the same
//! reconcile twice is harmless. Failures are returned to the caller, which
//! owns retry and backoff.

pub mod commit;
pub mod fanout;
pub mod filter;
pub mod inventory;
pub mod status;

pub use commit::CommitOutcome;
pub use fanout::{fan_out, trigger_stream};

use crate::crds::MachineClassStatus;
use crate::error::{Error, Result};
use crate::observability::metrics;
use crate::store::{ClassKey, InventoryStore};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use strum::Display;
use tracing::{debug, info, instrument, warn};

/// Steps of a single reconcile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ReconcilePhase {
    Fetching,
    Filtering,
    Aggregating,
    Committing,
    Done,
}

/// Result of a successful reconcile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The class no longer exists.
    Missing,
    /// Status already matched the machines.
    Unchanged(MachineClassStatus),
    /// Status was rewritten.
    Updated(MachineClassStatus),
}

impl ReconcileOutcome {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcileOutcome::Missing => "missing",
            ReconcileOutcome::Unchanged(_) => "unchanged",
            ReconcileOutcome::Updated(_) => "updated",
        }
    }
}

/// Drives reconciles of individual classes against a store.
#[derive(Clone)]
pub struct ClassReconciler {
    store: Arc<dyn InventoryStore>,
    store_timeout: Duration,
}

impl ClassReconciler {
    pub fn new(store: Arc<dyn InventoryStore>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
        }
    }

    pub fn store(&self) -> Arc<dyn InventoryStore> {
        self.store.clone()
    }

    /// Recompute and commit the status of the class at `key`.
    #[instrument(skip(self, key), fields(class = %key))]
    pub async fn reconcile(&self, key: &ClassKey) -> Result<ReconcileOutcome> {
        let started = Instant::now();
        let mut phase = ReconcilePhase::Fetching;

        let result = self.run(key, &mut phase).await;

        match &result {
            Ok(outcome) => {
                metrics::record_reconcile(outcome.kind(), started.elapsed());
            }
            Err(e) => {
                warn!(%phase, error = %e, "Reconcile failed");
                metrics::record_reconcile(e.kind(), started.elapsed());
            }
        }
        result
    }

    async fn run(&self, key: &ClassKey, phase: &mut ReconcilePhase) -> Result<ReconcileOutcome> {
        advance(phase, ReconcilePhase::Fetching);
        let Some(class) = self.bounded(self.store.get_class(key)).await? else {
            return Ok(missing(key));
        };
        let inventory = self.bounded(inventory::load(self.store.as_ref())).await?;
        debug!(accepted = inventory.len(), "Loaded inventory");

        advance(phase, ReconcilePhase::Filtering);
        let matched = filter::apply(inventory, &class.spec.qualifiers);

        advance(phase, ReconcilePhase::Aggregating);
        let new_status = status::aggregate(matched.values());

        advance(phase, ReconcilePhase::Committing);
        let committed = self
            .bounded(commit::commit(self.store.as_ref(), &class, &new_status))
            .await;
        let committed = match committed {
            Ok(committed) => committed,
            // Deleted between fetch and write
            Err(Error::NotFound(_)) => return Ok(missing(key)),
            Err(e) => return Err(e),
        };
        metrics::set_class_machines(
            &key.to_string(),
            new_status.machines_available.len(),
            new_status.machines_in_use.len(),
        );

        advance(phase, ReconcilePhase::Done);
        Ok(match committed {
            CommitOutcome::Unchanged => ReconcileOutcome::Unchanged(new_status),
            CommitOutcome::Patched => {
                info!(
                    available = new_status.machines_available.len(),
                    in_use = new_status.machines_in_use.len(),
                    "Class status updated"
                );
                ReconcileOutcome::Updated(new_status)
            }
        })
    }

    /// Abort a store call that outlives its deadline.
    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| Error::Timeout(self.store_timeout))?
    }
}

fn advance(phase: &mut ReconcilePhase, next: ReconcilePhase) {
    debug!(phase = %next, "Reconcile phase");
    *phase = next;
}

fn missing(key: &ClassKey) -> ReconcileOutcome {
    debug!("Class no longer exists, nothing to do");
    metrics::clear_class_machines(&key.to_string());
    ReconcileOutcome::Missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crds::{Machine, MachineClass, MachineClassSpec, MachineSpec};
    use crate::observability::metrics::testing;
    use crate::store::MemoryStore;
    use std::io;
    use std::sync::Mutex;

    /// Shared buffer the fmt layer writes into.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    async fn seeded_store() -> (MemoryStore, ClassKey) {
        let store = MemoryStore::new();
        store
            .put_machine(Machine::new(
                "m1",
                MachineSpec {
                    accepted: true,
                    ..Default::default()
                },
            ))
            .await;
        let mut class = MachineClass::new("gpu", MachineClassSpec::default());
        class.metadata.namespace = Some("lab".to_string());
        let key = store.put_class(class).await;
        (store, key)
    }

    fn reconciler(store: &MemoryStore) -> ClassReconciler {
        ClassReconciler::new(Arc::new(store.clone()), Duration::from_secs(5))
    }

    #[test]
    fn test_deleted_class_gauges_are_cleared() {
        let available = [("class", "lab/gpu"), ("state", "available")];

        let (store, key) = testing::capture(seeded_store()).0;
        let (outcome, captured) = testing::capture(reconciler(&store).reconcile(&key));
        assert!(matches!(outcome, Ok(ReconcileOutcome::Updated(_))));
        assert_eq!(captured.gauge("metalclass_class_machines", &available), Some(1.0));

        let (outcome, captured) = testing::capture(async {
            store.delete_class(&key).await;
            reconciler(&store).reconcile(&key).await
        });
        assert_eq!(outcome.unwrap(), ReconcileOutcome::Missing);
        assert_eq!(captured.gauge("metalclass_class_machines", &available), Some(0.0));
    }

    #[test]
    fn test_phase_transitions_are_logged() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer({
                let logs = logs.clone();
                move || logs.clone()
            })
            .finish();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let outcome = tracing::subscriber::with_default(subscriber, || {
            runtime.block_on(async {
                let (store, key) = seeded_store().await;
                reconciler(&store).reconcile(&key).await
            })
        });
        assert!(outcome.is_ok());

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let mut last = 0;
        for phase in ["fetching", "filtering", "aggregating", "committing", "done"] {
            let at = output[last..]
                .find(&format!("phase={phase}"))
                .unwrap_or_else(|| panic!("missing phase {phase} in:\n{output}"));
            last += at;
        }
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(ReconcilePhase::Fetching.to_string(), "fetching");
        assert_eq!(ReconcilePhase::Committing.to_string(), "committing");
    }

    #[test]
    fn test_outcome_kind() {
        assert_eq!(ReconcileOutcome::Missing.kind(), "missing");
        assert_eq!(
            ReconcileOutcome::Updated(MachineClassStatus::default()).kind(),
            "updated"
        );
    }
}
