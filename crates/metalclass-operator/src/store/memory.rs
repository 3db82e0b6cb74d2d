//! In-memory inventory store
//!
//! Behaves like the API server for the operations the reconciler uses:
//! per-object resource versions, status writes guarded by version, and a
//! machine change feed. Failures can be injected for the list calls.

use super::{ClassKey, InventoryStore, MachineChange};
use crate::crds::{Machine, MachineClass, MachineClassStatus};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
struct State {
    machines: BTreeMap<String, Machine>,
    classes: BTreeMap<ClassKey, MachineClass>,
    /// Cluster-wide counter, like etcd's revision.
    revision: u64,
    patch_attempts: usize,
    fail_list_machines: bool,
    fail_list_classes: bool,
}

impl State {
    fn next_version(&mut self) -> String {
        self.revision += 1;
        self.revision.to_string()
    }
}

/// Shared, cloneable in-memory store.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    changes: broadcast::Sender<MachineChange>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(State::default())),
            changes,
        }
    }

    /// Creates or replaces a machine and notifies subscribers.
    pub async fn put_machine(&self, mut machine: Machine) {
        let name = machine.name_any();
        {
            let mut state = self.state.lock().await;
            machine.metadata.resource_version = Some(state.next_version());
            state.machines.insert(name.clone(), machine);
        }
        // No subscribers is fine
        let _ = self.changes.send(MachineChange { machine: name });
    }

    /// Removes a machine and notifies subscribers.
    pub async fn delete_machine(&self, name: &str) {
        let removed = self.state.lock().await.machines.remove(name).is_some();
        if removed {
            let _ = self.changes.send(MachineChange {
                machine: name.to_string(),
            });
        }
    }

    /// Updates a stored machine in place, then notifies subscribers.
    pub async fn update_machine(
        &self,
        name: &str,
        update: impl FnOnce(&mut Machine) + Send,
    ) -> bool {
        let updated = {
            let mut state = self.state.lock().await;
            let version = state.next_version();
            match state.machines.get_mut(name) {
                Some(machine) => {
                    update(machine);
                    machine.metadata.resource_version = Some(version);
                    true
                }
                None => false,
            }
        };
        if updated {
            let _ = self.changes.send(MachineChange {
                machine: name.to_string(),
            });
        }
        updated
    }

    /// Creates or replaces a class, assigning it a fresh resource version.
    pub async fn put_class(&self, mut class: MachineClass) -> ClassKey {
        let key = ClassKey::for_class(&class);
        let mut state = self.state.lock().await;
        class.metadata.resource_version = Some(state.next_version());
        state.classes.insert(key.clone(), class);
        key
    }

    pub async fn delete_class(&self, key: &ClassKey) {
        self.state.lock().await.classes.remove(key);
    }

    /// Current stored copy of a class.
    pub async fn class(&self, key: &ClassKey) -> Option<MachineClass> {
        self.state.lock().await.classes.get(key).cloned()
    }

    /// Simulates a concurrent writer by bumping the class's resource version.
    pub async fn touch_class(&self, key: &ClassKey) {
        let mut state = self.state.lock().await;
        let version = state.next_version();
        if let Some(class) = state.classes.get_mut(key) {
            class.metadata.resource_version = Some(version);
        }
    }

    /// Number of status writes attempted, successful or not.
    pub async fn patch_attempts(&self) -> usize {
        self.state.lock().await.patch_attempts
    }

    pub async fn fail_list_machines(&self, fail: bool) {
        self.state.lock().await.fail_list_machines = fail;
    }

    pub async fn fail_list_classes(&self, fail: bool) {
        self.state.lock().await.fail_list_classes = fail;
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn list_machines(&self) -> Result<Vec<Machine>> {
        let state = self.state.lock().await;
        if state.fail_list_machines {
            return Err(Error::Unavailable("machine list failed".to_string()));
        }
        Ok(state.machines.values().cloned().collect())
    }

    async fn list_classes(&self) -> Result<Vec<MachineClass>> {
        let state = self.state.lock().await;
        if state.fail_list_classes {
            return Err(Error::Unavailable("class list failed".to_string()));
        }
        Ok(state.classes.values().cloned().collect())
    }

    async fn get_class(&self, key: &ClassKey) -> Result<Option<MachineClass>> {
        Ok(self.state.lock().await.classes.get(key).cloned())
    }

    async fn patch_class_status(
        &self,
        key: &ClassKey,
        version: &str,
        status: &MachineClassStatus,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.patch_attempts += 1;
        let next_version = state.next_version();

        let class = state
            .classes
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(key.clone()))?;

        if class.metadata.resource_version.as_deref() != Some(version) {
            return Err(Error::VersionConflict(key.clone()));
        }

        class.status = Some(status.clone());
        class.metadata.resource_version = Some(next_version);
        Ok(())
    }

    fn machine_changes(&self) -> BoxStream<'static, MachineChange> {
        let rx = self.changes.subscribe();

        stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(change) => return Some((change, rx)),
                    // Older changes were dropped but newer ones are still queued
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crds::{MachineClassSpec, MachineSpec};

    fn class(ns: &str, name: &str) -> MachineClass {
        let mut class = MachineClass::new(name, MachineClassSpec::default());
        class.metadata.namespace = Some(ns.to_string());
        class
    }

    #[tokio::test]
    async fn test_patch_requires_current_version() {
        let store = MemoryStore::new();
        let key = store.put_class(class("lab", "any")).await;
        let version = store.class(&key).await.unwrap().resource_version().unwrap();

        let status = MachineClassStatus {
            machines_available: vec!["m1".to_string()],
            machines_in_use: vec![],
        };

        store.touch_class(&key).await;
        let err = store
            .patch_class_status(&key, &version, &status)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(store.class(&key).await.unwrap().status.is_none());

        let version = store.class(&key).await.unwrap().resource_version().unwrap();
        store.patch_class_status(&key, &version, &status).await.unwrap();

        let stored = store.class(&key).await.unwrap();
        assert_eq!(stored.status, Some(status));
        assert_ne!(stored.resource_version(), Some(version));
        assert_eq!(store.patch_attempts().await, 2);
    }

    #[tokio::test]
    async fn test_patch_missing_class() {
        let store = MemoryStore::new();
        let key = ClassKey::new("lab", "gone");
        let err = store
            .patch_class_status(&key, "1", &MachineClassStatus::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(k) if k == key));
    }

    #[tokio::test]
    async fn test_machine_changes_are_broadcast() {
        let store = MemoryStore::new();
        let mut changes = store.machine_changes();

        store
            .put_machine(Machine::new("m1", MachineSpec::default()))
            .await;
        store.update_machine("m1", |m| m.spec.accepted = true).await;
        store.delete_machine("m1").await;

        for _ in 0..3 {
            let change = changes.next().await.unwrap();
            assert_eq!(change.machine, "m1");
        }
    }

    #[tokio::test]
    async fn test_injected_list_failures() {
        let store = MemoryStore::new();
        store.fail_list_classes(true).await;
        store.fail_list_machines(true).await;

        assert!(matches!(
            store.list_classes().await,
            Err(Error::Unavailable(_))
        ));
        assert!(matches!(
            store.list_machines().await,
            Err(Error::Unavailable(_))
        ));
    }
}
