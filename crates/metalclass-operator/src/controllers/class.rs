//! MachineClass controller

use super::Context;
use crate::crds::MachineClass;
use crate::error::Error;
use crate::reconcile::{trigger_stream, ReconcileOutcome};
use crate::store::ClassKey;
use futures::StreamExt;
use kube::{
    api::Api,
    runtime::{
        controller::{self, Action, Controller},
        watcher::Config,
    },
    Client, ResourceExt,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

pub struct MachineClassController;

impl MachineClassController {
    /// Run until SIGINT/SIGTERM.
    ///
    /// Classes are reconciled when they change themselves, when any machine
    /// changes (every class is requeued), and periodically after each
    /// successful reconcile. The controller runtime never runs two reconciles
    /// of the same class at once.
    pub async fn run(client: Client, ctx: Arc<Context>) {
        let api: Api<MachineClass> = Api::all(client);
        let triggers = trigger_stream(ctx.reconciler.store()).map(|key| key.object_ref());
        let config = controller::Config::default().concurrency(ctx.config.concurrency);

        Controller::new(api, Config::default())
            .with_config(config)
            .reconcile_on(triggers)
            .shutdown_on_signal()
            .run(
                |class, ctx| async move { reconcile(class, ctx).await },
                error_policy,
                ctx,
            )
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!(name = %obj.name, "Reconciled MachineClass"),
                    Err(e) => error!(error = %e, "Reconcile error"),
                }
            })
            .await;

        info!("MachineClass controller stopped");
    }
}

#[instrument(skip(class, ctx), fields(name = %class.name_any()))]
async fn reconcile(class: Arc<MachineClass>, ctx: Arc<Context>) -> Result<Action, Error> {
    let key = ClassKey::for_class(&class);

    match ctx.reconciler.reconcile(&key).await? {
        ReconcileOutcome::Missing => Ok(Action::await_change()),
        ReconcileOutcome::Unchanged(_) | ReconcileOutcome::Updated(_) => {
            Ok(Action::requeue(ctx.config.resync_interval))
        }
    }
}

fn error_policy(_class: Arc<MachineClass>, error: &Error, ctx: Arc<Context>) -> Action {
    if error.is_conflict() {
        debug!(error = %error, "Status write lost a race, retrying");
        Action::requeue(ctx.config.conflict_requeue)
    } else {
        error!(error = %error, "Reconcile failed");
        Action::requeue(ctx.config.error_requeue)
    }
}
