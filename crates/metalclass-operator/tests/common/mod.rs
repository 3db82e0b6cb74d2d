//! Shared fixtures for integration tests.

#![allow(dead_code)]

use metalclass_operator::crds::{
    CpuInformation, Machine, MachineClass, MachineClassSpec, MachineSpec, MachineStatus,
    Qualifiers, SystemInformation,
};
use metalclass_operator::reconcile::ClassReconciler;
use metalclass_operator::store::MemoryStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const NAMESPACE: &str = "lab";

/// Reconciler over an in-memory store, with the store kept for inspection.
pub struct TestOperator {
    pub store: MemoryStore,
    pub reconciler: ClassReconciler,
}

impl TestOperator {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let reconciler = ClassReconciler::new(Arc::new(store.clone()), Duration::from_secs(5));
        Self { store, reconciler }
    }
}

pub fn cpu(manufacturer: &str) -> CpuInformation {
    CpuInformation {
        manufacturer: Some(manufacturer.to_string()),
        version: None,
    }
}

/// Builder for test machines. Machines start accepted and free.
pub struct MachineBuilder {
    name: String,
    spec: MachineSpec,
    labels: BTreeMap<String, String>,
    in_use: bool,
}

impl MachineBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            spec: MachineSpec {
                accepted: true,
                ..Default::default()
            },
            labels: BTreeMap::new(),
            in_use: false,
        }
    }

    pub fn unaccepted(mut self) -> Self {
        self.spec.accepted = false;
        self
    }

    pub fn in_use(mut self) -> Self {
        self.in_use = true;
        self
    }

    pub fn with_cpu(mut self, manufacturer: &str) -> Self {
        self.spec.cpu = Some(cpu(manufacturer));
        self
    }

    pub fn with_product(mut self, product: &str) -> Self {
        self.spec.system_information = Some(SystemInformation {
            product_name: Some(product.to_string()),
            ..Default::default()
        });
        self
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> Machine {
        let mut machine = Machine::new(&self.name, self.spec);
        machine.metadata.labels = Some(self.labels);
        machine.status = Some(MachineStatus {
            in_use: self.in_use,
        });
        machine
    }
}

/// Builder for test classes in [`NAMESPACE`].
pub struct ClassBuilder {
    name: String,
    qualifiers: Qualifiers,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            qualifiers: Qualifiers::default(),
        }
    }

    pub fn with_cpu(mut self, manufacturer: &str) -> Self {
        self.qualifiers.cpu.push(cpu(manufacturer));
        self
    }

    pub fn with_product(mut self, product: &str) -> Self {
        self.qualifiers.system_information.push(SystemInformation {
            product_name: Some(product.to_string()),
            ..Default::default()
        });
        self
    }

    pub fn with_selector(mut self, pairs: &[(&str, &str)]) -> Self {
        self.qualifiers.label_selectors.push(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn build(self) -> MachineClass {
        let mut class = MachineClass::new(
            &self.name,
            MachineClassSpec {
                qualifiers: self.qualifiers,
            },
        );
        class.metadata.namespace = Some(NAMESPACE.to_string());
        class
    }
}
