//! Shared controller context

use crate::config::OperatorConfig;
use crate::reconcile::ClassReconciler;

/// Shared context for the class controller.
pub struct Context {
    pub reconciler: ClassReconciler,
    pub config: OperatorConfig,
}

impl Context {
    pub fn new(reconciler: ClassReconciler, config: OperatorConfig) -> Self {
        Self { reconciler, config }
    }
}
