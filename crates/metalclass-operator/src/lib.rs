//! Metalclass Operator Library
//!
//! Kubernetes operator that matches discovered bare-metal machines against
//! declarative hardware classes. Each MachineClass status lists the accepted
//! machines that satisfy its qualifiers, split into available and in use.
//!
//! The operator only computes eligibility. Claiming a machine is left to
//! whoever sets its `inUse` flag.

pub mod config;
pub mod controllers;
pub mod crds;
pub mod error;
pub mod observability;
pub mod reconcile;
pub mod store;

pub use crds::{Machine, MachineClass, MachineClassSpec, MachineClassStatus, MachineSpec};
pub use error::{Error, Result};
