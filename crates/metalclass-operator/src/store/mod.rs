//! Inventory store
//!
//! The operator's only boundary: a versioned object store holding machines and
//! classes, with a change feed for machines and optimistic-concurrency writes
//! for class status.

mod kubernetes;
mod memory;

pub use kubernetes::KubeStore;
pub use memory::MemoryStore;

use crate::crds::{Machine, MachineClass, MachineClassStatus};
use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;
use std::fmt;

/// Namespace and name of a MachineClass.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ClassKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn for_class(class: &MachineClass) -> Self {
        Self {
            namespace: class.namespace(),
            name: class.name_any(),
        }
    }

    pub fn object_ref(&self) -> ObjectRef<MachineClass> {
        let obj_ref = ObjectRef::new(&self.name);
        match &self.namespace {
            Some(ns) => obj_ref.within(ns),
            None => obj_ref,
        }
    }
}

impl From<&ObjectRef<MachineClass>> for ClassKey {
    fn from(obj_ref: &ObjectRef<MachineClass>) -> Self {
        Self {
            namespace: obj_ref.namespace.clone(),
            name: obj_ref.name.clone(),
        }
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Notification that some machine changed.
///
/// Carries no payload beyond the name; receivers re-evaluate everything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineChange {
    pub machine: String,
}

/// Store operations used by the reconciler.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Lists every machine, accepted or not.
    async fn list_machines(&self) -> Result<Vec<Machine>>;

    /// Lists every class in every namespace.
    async fn list_classes(&self) -> Result<Vec<MachineClass>>;

    /// Fetches a class, `None` if it does not exist.
    async fn get_class(&self, key: &ClassKey) -> Result<Option<MachineClass>>;

    /// Replaces a class's status, provided the class is still at `version`.
    ///
    /// Fails with `VersionConflict` if another writer got there first and with
    /// `NotFound` if the class is gone.
    async fn patch_class_status(
        &self,
        key: &ClassKey,
        version: &str,
        status: &MachineClassStatus,
    ) -> Result<()>;

    /// Subscribes to machine changes. The stream starts at subscription time.
    fn machine_changes(&self) -> BoxStream<'static, MachineChange>;
}
