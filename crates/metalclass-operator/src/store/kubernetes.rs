//! Kubernetes-backed inventory store

use super::{ClassKey, InventoryStore, MachineChange};
use crate::crds::{Machine, MachineClass, MachineClassStatus};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use kube::{
    api::{Api, ListParams, Patch, PatchParams},
    runtime::{watcher, WatchStreamExt},
    Client, ResourceExt,
};
use serde_json::json;
use tracing::warn;

/// Translates API status codes of a status write into store errors.
fn map_patch_error(key: &ClassKey, error: kube::Error) -> Error {
    match error {
        kube::Error::Api(ref response) if response.code == 409 => Error::VersionConflict(key.clone()),
        kube::Error::Api(ref response) if response.code == 404 => Error::NotFound(key.clone()),
        e => Error::Kube(e),
    }
}

/// Reads machines and classes through the Kubernetes API.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn classes(&self, key: &ClassKey) -> Api<MachineClass> {
        match &key.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::default_namespaced(self.client.clone()),
        }
    }
}

#[async_trait]
impl InventoryStore for KubeStore {
    async fn list_machines(&self) -> Result<Vec<Machine>> {
        let api: Api<Machine> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await.map_err(Error::Kube)?;
        Ok(list.items)
    }

    async fn list_classes(&self) -> Result<Vec<MachineClass>> {
        let api: Api<MachineClass> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await.map_err(Error::Kube)?;
        Ok(list.items)
    }

    async fn get_class(&self, key: &ClassKey) -> Result<Option<MachineClass>> {
        self.classes(key).get_opt(&key.name).await.map_err(Error::Kube)
    }

    async fn patch_class_status(
        &self,
        key: &ClassKey,
        version: &str,
        status: &MachineClassStatus,
    ) -> Result<()> {
        // resourceVersion in the body makes the API server reject stale writes with 409
        let patch = json!({
            "metadata": { "resourceVersion": version },
            "status": serde_json::to_value(status)?,
        });

        self.classes(key)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map(|_| ())
            .map_err(|e| map_patch_error(key, e))
    }

    fn machine_changes(&self) -> BoxStream<'static, MachineChange> {
        let api: Api<Machine> = Api::all(self.client.clone());

        watcher(api, watcher::Config::default())
            .default_backoff()
            .touched_objects()
            .filter_map(|res| async move {
                match res {
                    Ok(machine) => Some(MachineChange {
                        machine: machine.name_any(),
                    }),
                    Err(e) => {
                        warn!(error = %e, "Machine watch error");
                        None
                    }
                }
            })
            .boxed()
    }
}
