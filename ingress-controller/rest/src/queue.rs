use crate::{AdcError, RestReconciler};
use ahash::AHashSet as HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

const REQUEUE_DELAY: Duration = Duration::from_millis(500);

/// Producer side of the model queue. Builders push every changed model name;
/// pushes are cheap and never block.
#[derive(Clone)]
pub struct ModelQueue {
    tx: UnboundedSender<String>,
}

impl ModelQueue {
    pub fn new() -> (Self, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn push(&self, model: &str) {
        if let Err(error) = self.tx.send(model.to_string()) {
            error!(%model, %error, "failed to enqueue model");
        }
    }

    pub fn push_all(&self, models: &[String]) {
        for model in models {
            self.push(model);
        }
    }
}

/// Drains the model queue and drives the reconciler. Events on one model are
/// serialized (a model is never reconciled by two tasks at once); different
/// models reconcile concurrently. Transient ADC errors requeue the model
/// after a short pause.
pub struct Controller {
    reconciler: Arc<RestReconciler>,
    queue: ModelQueue,
    updates: UnboundedReceiver<String>,
}

impl Controller {
    pub fn new(
        reconciler: Arc<RestReconciler>,
        queue: ModelQueue,
        updates: UnboundedReceiver<String>,
    ) -> Self {
        Self {
            reconciler,
            queue,
            updates,
        }
    }

    pub async fn process_updates(mut self) {
        let mut in_flight: HashSet<String> = HashSet::default();
        let mut deferred: HashSet<String> = HashSet::default();
        let mut tasks: JoinSet<(String, Result<(), AdcError>)> = JoinSet::new();

        loop {
            tokio::select! {
                update = self.updates.recv() => {
                    let Some(model) = update else { break };
                    if in_flight.contains(&model) {
                        // Re-run once the in-flight pass finishes so its
                        // snapshot cannot miss this event.
                        deferred.insert(model);
                        continue;
                    }
                    debug!(%model, "reconciling");
                    in_flight.insert(model.clone());
                    let reconciler = self.reconciler.clone();
                    tasks.spawn(async move {
                        let result = reconciler.sync_model(&model).await;
                        (model, result)
                    });
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    let Ok((model, result)) = joined else { continue };
                    in_flight.remove(&model);
                    match result {
                        Ok(()) => {}
                        Err(error) if error.is_transient() => {
                            warn!(%model, %error, "transient ADC error, requeuing");
                            let queue = self.queue.clone();
                            let requeue = model.clone();
                            tokio::spawn(async move {
                                tokio::time::sleep(REQUEUE_DELAY).await;
                                queue.push(&requeue);
                            });
                        }
                        Err(error) => {
                            warn!(%model, %error, "skipping model");
                        }
                    }
                    if deferred.remove(&model) {
                        self.queue.push(&model);
                    }
                }
            }
        }
    }
}
