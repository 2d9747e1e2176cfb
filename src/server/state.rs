//! Startup readiness shared with every handler.

use std::sync::Arc;
use tokio::sync::watch;

use crate::pipeline::TarotPipeline;

/// Lifecycle of the service: `Starting` moves once to `Ready` or `Failed`.
#[derive(Clone)]
pub enum Readiness {
    Starting,
    Ready(Arc<TarotPipeline>),
    Failed(String),
}

impl Readiness {
    pub fn phase(&self) -> &'static str {
        match self {
            Readiness::Starting => "starting",
            Readiness::Ready(_) => "ready",
            Readiness::Failed(_) => "failed",
        }
    }
}

pub struct AppState {
    readiness: watch::Sender<Readiness>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        let (readiness, _) = watch::channel(Readiness::Starting);
        Self { readiness }
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness.borrow().clone()
    }

    /// The pipeline, if startup has completed.
    pub fn pipeline(&self) -> Option<Arc<TarotPipeline>> {
        match &*self.readiness.borrow() {
            Readiness::Ready(pipeline) => Some(Arc::clone(pipeline)),
            _ => None,
        }
    }

    pub fn mark_ready(&self, pipeline: Arc<TarotPipeline>) {
        self.transition(Readiness::Ready(pipeline));
    }

    pub fn mark_failed(&self, reason: String) {
        self.transition(Readiness::Failed(reason));
    }

    /// Only the first transition out of `Starting` sticks.
    fn transition(&self, next: Readiness) {
        self.readiness.send_if_modified(|current| {
            if matches!(current, Readiness::Starting) {
                *current = next;
                true
            } else {
                false
            }
        });
    }

    /// Resolves with the failure reason once startup fails. Never resolves
    /// if startup succeeds.
    pub async fn startup_failed(&self) -> String {
        let mut rx = self.readiness.subscribe();
        loop {
            if let Readiness::Failed(reason) = &*rx.borrow_and_update() {
                return reason.clone();
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
