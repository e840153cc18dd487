pub mod dispatcher;
pub mod guard;
pub mod pending;
pub mod selection;

pub use dispatcher::{
    BinaryPart, DispatchCallback, DispatchReply, DispatchResult, MultipartBody, NetworkDispatcher,
    OutboundRequest, PartValue, RequestBody, SealedBody,
};
pub use guard::GuardedDispatcher;
pub use pending::{PENDING_TTL, PendingRegistry, SharedDecision};
pub use selection::SelectionGesture;

use crate::config::SettingsStore;
use crate::protocol::{DecisionBus, DecisionRequester};
use std::sync::{Arc, OnceLock};

/// Page-scoped coordinator constructed once at bootstrap.
///
/// Owns the mutable interception state (pending registry, requester) and the
/// idempotent installation of the network guard, so nothing lives as
/// free-floating module state.
pub struct PageCoordinator {
    requester: Arc<DecisionRequester>,
    registry: Arc<PendingRegistry>,
    installed: OnceLock<Arc<GuardedDispatcher>>,
}

impl PageCoordinator {
    pub fn new(bus: DecisionBus, store: Arc<dyn SettingsStore>, host: impl Into<String>) -> Self {
        Self::with_requester(Arc::new(DecisionRequester::new(bus, store, host)))
    }

    pub fn with_requester(requester: Arc<DecisionRequester>) -> Self {
        Self {
            requester,
            registry: Arc::new(PendingRegistry::new()),
            installed: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn requester(&self) -> Arc<DecisionRequester> {
        Arc::clone(&self.requester)
    }

    #[must_use]
    pub fn registry(&self) -> Arc<PendingRegistry> {
        Arc::clone(&self.registry)
    }

    /// Wrap the page's dispatcher. Installing twice is a no-op returning the
    /// first wrapper; a second `inner` is ignored.
    pub fn install(&self, inner: Arc<dyn NetworkDispatcher>) -> Arc<GuardedDispatcher> {
        if let Some(existing) = self.installed.get() {
            tracing::debug!("network guard already installed, skipping");
            return Arc::clone(existing);
        }
        let guard = self.installed.get_or_init(|| {
            Arc::new(GuardedDispatcher::new(
                inner,
                Arc::clone(&self.requester),
                Arc::clone(&self.registry),
            ))
        });
        tracing::debug!("network guard installed");
        Arc::clone(guard)
    }

    /// Feed a file-selection gesture into the pending registry, launching a
    /// speculative decision per artifact.
    pub fn observe_selection(&self, gesture: &SelectionGesture) {
        selection::observe_selection(&self.registry, &self.requester, gesture);
    }
}
