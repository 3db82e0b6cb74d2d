//! Machine CRD
//!
//! Defines the Machine custom resource for discovered bare-metal hosts.
//! Machines are written by the inventory process and by claimants; the
//! operator only reads them.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Machine represents a discovered physical host.
///
/// A machine is invisible to every class until it has been accepted. The
/// hardware facts it carries are what class qualifiers match against:
/// - CPU descriptor
/// - System (SMBIOS) information
/// - Labels on the object metadata
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "metalclass.dev",
    version = "v1alpha1",
    kind = "Machine",
    status = "MachineStatus",
    printcolumn = r#"{"name":"Accepted", "type":"boolean", "jsonPath":".spec.accepted"}"#,
    printcolumn = r#"{"name":"In Use", "type":"boolean", "jsonPath":".status.inUse"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    /// Only accepted machines are eligible for any class.
    #[serde(default)]
    pub accepted: bool,

    /// CPU descriptor reported by the machine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuInformation>,

    /// System information reported by the machine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_information: Option<SystemInformation>,
}

/// Runtime state of a machine, set by whoever claims it.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatus {
    #[serde(default)]
    pub in_use: bool,
}

/// CPU descriptor.
///
/// Used both as a machine fact and as a class qualifier. As a qualifier,
/// unset fields match anything.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CpuInformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl CpuInformation {
    /// Returns true if every field set on `self` equals the same field on `other`.
    pub fn partial_matches(&self, other: &CpuInformation) -> bool {
        field_matches(&self.manufacturer, &other.manufacturer)
            && field_matches(&self.version, &other.version)
    }
}

/// System information descriptor.
///
/// Same wildcard rules as [`CpuInformation`].
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SystemInformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
}

impl SystemInformation {
    /// Returns true if every field set on `self` equals the same field on `other`.
    pub fn partial_matches(&self, other: &SystemInformation) -> bool {
        field_matches(&self.manufacturer, &other.manufacturer)
            && field_matches(&self.product_name, &other.product_name)
            && field_matches(&self.version, &other.version)
            && field_matches(&self.serial_number, &other.serial_number)
            && field_matches(&self.sku_number, &other.sku_number)
            && field_matches(&self.family, &other.family)
    }
}

/// An unset or empty wanted value is a wildcard.
fn field_matches(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match wanted.as_deref() {
        None | Some("") => true,
        Some(wanted) => actual.as_deref() == Some(wanted),
    }
}

impl Machine {
    /// Whether a claimant has marked this machine as in use.
    pub fn in_use(&self) -> bool {
        self.status.as_ref().is_some_and(|status| status.in_use)
    }
}
