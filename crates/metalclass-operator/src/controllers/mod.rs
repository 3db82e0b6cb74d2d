//! Kubernetes controllers
//!
//! Reconciler that keeps MachineClass status in step with the machine inventory.

mod class;
mod context;

pub use class::MachineClassController;
pub use context::Context;
