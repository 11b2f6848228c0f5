//! Dispatching engine.
//!
//! Routes each event of an ordered batch to the sub-processor owning its
//! `(contract kind, event name)` key and applies best-effort batch
//! semantics: failing events are logged and skipped, and the last failure
//! is returned once the whole batch has been attempted.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::EngineError;
use crate::event::Event;
use crate::processors::EventHandler;
use crate::publisher::{PubMessage, Publisher};
use tcr_core::ContractKind;

/// Event-name-to-handler lookup table, built once at engine construction.
///
/// Replaces sequential trial-and-miss dispatch: every known
/// `(kind, name)` key maps to exactly one handler, enforced when the
/// table is built.
pub struct Router {
    handlers: Vec<Arc<dyn EventHandler>>,
    routes: HashMap<(ContractKind, &'static str), usize>,
}

impl Router {
    /// Build the routing table, rejecting duplicate claims.
    pub fn new(handlers: Vec<Arc<dyn EventHandler>>) -> Result<Self, EngineError> {
        let mut routes = HashMap::new();
        for (index, handler) in handlers.iter().enumerate() {
            for &kind in handler.contract_kinds() {
                for &name in handler.event_names() {
                    if routes.insert((kind, name), index).is_some() {
                        return Err(EngineError::DuplicateRoute {
                            kind,
                            name: name.to_string(),
                        });
                    }
                }
            }
        }
        Ok(Self { handlers, routes })
    }

    /// Look up the handler owning an event, if any.
    pub fn route(&self, event: &Event) -> Option<&dyn EventHandler> {
        self.routes
            .get(&(event.contract_kind, event.base_name()))
            .map(|&index| self.handlers[index].as_ref())
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True when no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Counters reported after a fully successful batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Events claimed and applied.
    pub processed: usize,

    /// Events no processor claimed (irrelevant event types).
    pub unclaimed: usize,
}

/// The event dispatch and aggregation engine.
pub struct Engine {
    router: Router,
    publisher: Arc<dyn Publisher>,
    /// Injected batch lock; engines sharing one lock serialize their
    /// batches against each other.
    lock: Arc<Mutex<()>>,
}

impl Engine {
    /// Build an engine over the given handlers, publisher and batch lock.
    pub fn new(
        handlers: Vec<Arc<dyn EventHandler>>,
        publisher: Arc<dyn Publisher>,
        lock: Arc<Mutex<()>>,
    ) -> Result<Self, EngineError> {
        let router = Router::new(handlers)?;
        Ok(Self {
            router,
            publisher,
            lock,
        })
    }

    /// Process an ordered batch of events.
    ///
    /// Events are handled strictly in input order; later events may
    /// depend on aggregate state written by earlier ones. Per-event
    /// failures do not halt iteration: they are logged and the error of
    /// the last failing event is returned after the batch completes.
    pub async fn process(&self, events: &[Event]) -> Result<BatchSummary, EngineError> {
        let _guard = self.lock.lock().await;

        let mut summary = BatchSummary::default();
        let mut last_error: Option<EngineError> = None;

        for (index, event) in events.iter().enumerate() {
            let Some(handler) = self.router.route(event) else {
                // Irrelevant event types in the shared stream are expected.
                debug!(
                    kind = %event.contract_kind,
                    name = %event.name,
                    "no route for event, ignoring"
                );
                summary.unclaimed += 1;
                continue;
            };

            match handler.process(event).await {
                Ok(true) => {
                    summary.processed += 1;
                    if event.contract_kind == ContractKind::Registry {
                        self.forward_governance(event).await;
                    }
                }
                Ok(false) => {
                    // Routed but refused: the handler's own membership
                    // check disagrees with the routing table.
                    warn!(
                        kind = %event.contract_kind,
                        name = %event.name,
                        "routed event refused by handler"
                    );
                    summary.unclaimed += 1;
                }
                Err(err) => {
                    error!(
                        index,
                        kind = %event.contract_kind,
                        name = %event.name,
                        tx_hash = %event.provenance.tx_hash,
                        %err,
                        "event processing failed, continuing batch"
                    );
                    last_error = Some(EngineError::Event {
                        index,
                        name: event.name.clone(),
                        source: err,
                    });
                }
            }
        }

        info!(
            total = events.len(),
            processed = summary.processed,
            unclaimed = summary.unclaimed,
            failed = last_error.is_some(),
            "batch complete"
        );

        match last_error {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }

    /// Forward a processed registry-governance event to the publisher.
    /// Publish failures are logged and never fail the batch.
    async fn forward_governance(&self, event: &Event) {
        let message = PubMessage::GovernanceTx {
            tx_hash: event.provenance.tx_hash,
        };
        if let Err(err) = self.publisher.publish(&message).await {
            warn!(tx_hash = %event.provenance.tx_hash, %err, "governance publish failed");
        }
    }
}
