//! Status commit
//!
//! Writes a recomputed status back only when it differs from what the class
//! already carries. The write is guarded by the resource version the class
//! was read at, so a reconcile working from stale state fails instead of
//! overwriting a newer status.

use crate::crds::{MachineClass, MachineClassStatus};
use crate::error::{Error, Result};
use crate::observability::metrics;
use crate::store::{ClassKey, InventoryStore};
use kube::ResourceExt;
use tracing::debug;

/// What the commit did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Status already up to date; nothing was written.
    Unchanged,
    /// Status was written.
    Patched,
}

/// Write `status` to `class` if it changed.
pub async fn commit(
    store: &dyn InventoryStore,
    class: &MachineClass,
    status: &MachineClassStatus,
) -> Result<CommitOutcome> {
    let key = ClassKey::for_class(class);

    if class.status.as_ref() == Some(status) {
        debug!(class = %key, "Status unchanged, skipping write");
        return Ok(CommitOutcome::Unchanged);
    }

    let version = class
        .resource_version()
        .ok_or_else(|| Error::MissingVersion(key.clone()))?;

    metrics::record_status_patch();
    store.patch_class_status(&key, &version, status).await?;

    debug!(
        class = %key,
        available = status.machines_available.len(),
        in_use = status.machines_in_use.len(),
        "Status written"
    );
    Ok(CommitOutcome::Patched)
}
