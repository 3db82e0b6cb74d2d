//! Qualifier filter chain
//!
//! Each stage takes an inventory and returns the machines that satisfy one
//! qualifier category. Stages only ever remove machines, so the chain's
//! result does not depend on stage order. An empty qualifier list leaves the
//! inventory untouched.

use super::inventory::Inventory;
use crate::crds::{CpuInformation, Machine, Qualifiers, SystemInformation};
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Narrow `inventory` to the machines matching every non-empty qualifier category.
pub fn apply(inventory: Inventory, qualifiers: &Qualifiers) -> Inventory {
    let inventory = by_cpu(inventory, &qualifiers.cpu);
    let inventory = by_system_information(inventory, &qualifiers.system_information);
    by_labels(inventory, &qualifiers.label_selectors)
}

/// Keep machines whose CPU partially matches at least one qualifier.
///
/// Machines that report no CPU are dropped unless the qualifier list is empty.
pub fn by_cpu(inventory: Inventory, qualifiers: &[CpuInformation]) -> Inventory {
    retain(inventory, qualifiers, |machine| {
        machine
            .spec
            .cpu
            .as_ref()
            .is_some_and(|cpu| qualifiers.iter().any(|q| q.partial_matches(cpu)))
    })
}

/// Keep machines whose system information partially matches at least one qualifier.
pub fn by_system_information(inventory: Inventory, qualifiers: &[SystemInformation]) -> Inventory {
    retain(inventory, qualifiers, |machine| {
        machine
            .spec
            .system_information
            .as_ref()
            .is_some_and(|info| qualifiers.iter().any(|q| q.partial_matches(info)))
    })
}

/// Keep machines carrying at least one key/value pair of any selector.
///
/// A selector with several keys is satisfied by any one of them; it does not
/// require all of them.
pub fn by_labels(inventory: Inventory, selectors: &[BTreeMap<String, String>]) -> Inventory {
    retain(inventory, selectors, |machine| {
        let labels = machine.labels();
        selectors.iter().any(|selector| {
            selector
                .iter()
                .any(|(key, value)| labels.get(key) == Some(value))
        })
    })
}

fn retain<Q>(
    inventory: Inventory,
    qualifiers: &[Q],
    matches: impl Fn(&Machine) -> bool,
) -> Inventory {
    if qualifiers.is_empty() {
        return inventory;
    }

    inventory
        .into_iter()
        .filter(|(_, machine)| matches(machine))
        .collect()
}
