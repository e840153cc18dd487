use crate::config::SettingsStore;
use crate::format;
use crate::identity::ensure_identity;
use crate::protocol::DecisionBus;
use crate::protocol::frames::{Frame, RequestFrame, ResponseFrame, SubmissionDescriptor};
use crate::relay::{PolicyRequest, Relay};
use crate::verdict::PolicyDecision;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Brokers decision requests between the page context and the relay.
///
/// Runs in its own context with access to the relay and the settings store
/// but none of the page's state; the broadcast bus is the only link.
pub struct Mediator {
    bus: DecisionBus,
    store: Arc<dyn SettingsStore>,
    relay: Arc<Relay>,
}

impl Mediator {
    pub fn new(
        bus: DecisionBus,
        store: Arc<dyn SettingsStore>,
        relay: Arc<Relay>,
    ) -> Self {
        Self { bus, store, relay }
    }

    /// Subscribe and answer request frames until the bus closes.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    pub async fn run(&self) {
        let mut rx = self.bus.subscribe();
        loop {
            match rx.recv().await {
                Ok(Frame::Request(request)) => {
                    let verdict = self.decide(&request).await;
                    self.bus.publish(Frame::Response(ResponseFrame {
                        id: request.id,
                        verdict,
                    }));
                }
                Ok(Frame::Response(_)) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "mediator lagged behind the decision bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    async fn decide(&self, request: &RequestFrame) -> PolicyDecision {
        // Fast local reject: formats outside the allowlist are allowed
        // through without analysis and never reach the relay.
        if let SubmissionDescriptor::Attachment { payload, .. } = &request.descriptor {
            let tag = format::normalize_tag(&payload.format);
            if !format::is_supported(&tag) {
                tracing::debug!(
                    correlation_id = %request.id,
                    format = %tag,
                    "format outside allowlist, allowing without analysis"
                );
                return PolicyDecision::allow_unmodified();
            }
        }

        let identity = ensure_identity(self.store.as_ref());
        let policy_request = match &request.descriptor {
            SubmissionDescriptor::Prompt { text } => {
                PolicyRequest::new(&identity, &request.host, text, None)
            }
            SubmissionDescriptor::Attachment { payload, .. } => {
                PolicyRequest::new(&identity, &request.host, "", Some(payload))
            }
        };

        self.relay.decide(&policy_request).await
    }
}
