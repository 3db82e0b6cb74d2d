//! Custom Resource Definitions
//!
//! Kubernetes CRDs for the machine inventory and the classes matched against it.

pub mod class;
pub mod machine;

pub use class::{MachineClass, MachineClassSpec, MachineClassStatus, Qualifiers};
pub use machine::{CpuInformation, Machine, MachineSpec, MachineStatus, SystemInformation};
