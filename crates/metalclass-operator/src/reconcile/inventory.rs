//! Inventory snapshot
//!
//! The set of machines a reconcile works from: every accepted machine, keyed
//! by name. Unaccepted machines never enter the snapshot, so no class can
//! ever list them.

use crate::crds::Machine;
use crate::error::Result;
use crate::store::InventoryStore;
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Accepted machines keyed by name.
pub type Inventory = BTreeMap<String, Machine>;

/// Read every machine from the store and keep the accepted ones.
pub async fn load(store: &dyn InventoryStore) -> Result<Inventory> {
    let machines = store.list_machines().await?;
    Ok(from_machines(machines))
}

/// Build a snapshot from a machine list.
pub fn from_machines(machines: impl IntoIterator<Item = Machine>) -> Inventory {
    machines
        .into_iter()
        .filter(|machine| machine.spec.accepted)
        .map(|machine| (machine.name_any(), machine))
        .collect()
}
