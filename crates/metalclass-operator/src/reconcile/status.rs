//! Status aggregation
//!
//! Splits a class's matching machines into free and claimed.

use crate::crds::{Machine, MachineClassStatus};
use kube::ResourceExt;

/// Build a class status from its matching machines.
///
/// Both lists come out sorted by name. The store compares statuses by value,
/// so any other order would look like a change and cause a write on every
/// reconcile.
pub fn aggregate<'a>(matched: impl IntoIterator<Item = &'a Machine>) -> MachineClassStatus {
    let (mut in_use, mut available): (Vec<String>, Vec<String>) = (Vec::new(), Vec::new());

    for machine in matched {
        if machine.in_use() {
            in_use.push(machine.name_any());
        } else {
            available.push(machine.name_any());
        }
    }

    available.sort_unstable();
    in_use.sort_unstable();

    MachineClassStatus {
        machines_available: available,
        machines_in_use: in_use,
    }
}
