//! MachineClass CRD
//!
//! Defines the MachineClass custom resource: a set of hardware qualifiers
//! whose status lists the accepted machines that satisfy them.

use super::machine::{CpuInformation, SystemInformation};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// MachineClass lets an operator ask for "any machine like this" instead of
/// naming machines.
///
/// The status is a derived view owned by the operator. It can be recomputed
/// from the current set of machines at any time.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "metalclass.dev",
    version = "v1alpha1",
    kind = "MachineClass",
    namespaced,
    shortname = "mclass",
    status = "MachineClassStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Available", "type":"string", "jsonPath":".status.machinesAvailable"}"#,
    printcolumn = r#"{"name":"In Use", "type":"string", "jsonPath":".status.machinesInUse"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MachineClassSpec {
    /// Hardware and label qualifiers. Empty qualifiers match every accepted machine.
    #[serde(default)]
    pub qualifiers: Qualifiers,
}

/// The three independent qualifier categories.
///
/// A machine belongs to the class when it satisfies every non-empty category.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Qualifiers {
    /// Accepted CPU descriptors; a machine must partially match at least one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cpu: Vec<CpuInformation>,

    /// Accepted system information descriptors; a machine must partially match at least one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system_information: Vec<SystemInformation>,

    /// Label selectors; a machine must carry at least one key/value pair from any selector.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_selectors: Vec<BTreeMap<String, String>>,
}

impl Qualifiers {
    pub fn is_empty(&self) -> bool {
        self.cpu.is_empty() && self.system_information.is_empty() && self.label_selectors.is_empty()
    }
}

/// Machines currently matching the class, split by claim status.
///
/// Both lists are sorted ascending and never share a name. Empty lists are
/// serialized so that a status patch clears stale entries.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineClassStatus {
    #[serde(default)]
    pub machines_available: Vec<String>,

    #[serde(default)]
    pub machines_in_use: Vec<String>,
}
