use crate::config::SettingsStore;
use crate::error::ChannelError;
use crate::protocol::frames::{Frame, RequestFrame, SubmissionDescriptor};
use crate::verdict::PolicyDecision;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

/// How long a requester waits for a response frame before failing open.
pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(15);

const BUS_CAPACITY: usize = 64;

/// Broadcast surface connecting the page context and the mediator context.
/// Every frame reaches every subscriber; correlation ids pair requests with
/// responses.
#[derive(Clone)]
pub struct DecisionBus {
    tx: broadcast::Sender<Frame>,
}

impl DecisionBus {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.tx.subscribe()
    }

    /// Publish a frame. A bus with no listeners swallows the frame; that is
    /// indistinguishable from a mediator that never answers, and the
    /// requester's timeout covers it.
    pub fn publish(&self, frame: Frame) {
        if self.tx.send(frame).is_err() {
            tracing::debug!("decision bus has no subscribers, frame dropped");
        }
    }
}

impl Default for DecisionBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Page-context half of the decision protocol: publishes a request frame and
/// resolves on the first matching response, racing a timeout.
pub struct DecisionRequester {
    bus: DecisionBus,
    store: Arc<dyn SettingsStore>,
    host: String,
    seq: AtomicU64,
    timeout: Duration,
}

impl DecisionRequester {
    pub fn new(bus: DecisionBus, store: Arc<dyn SettingsStore>, host: impl Into<String>) -> Self {
        Self::with_timeout(bus, store, host, DEFAULT_DECISION_TIMEOUT)
    }

    pub fn with_timeout(
        bus: DecisionBus,
        store: Arc<dyn SettingsStore>,
        host: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            bus,
            store,
            host: host.into(),
            seq: AtomicU64::new(0),
            timeout,
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Correlation ids only need to be unique within the pending TTL window;
    /// a millisecond timestamp plus a process-wide counter is enough.
    fn next_correlation_id(&self, now_ms: i64) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{now_ms}-{seq}")
    }

    /// Request a decision for one submission.
    ///
    /// With mediation disabled no frame is emitted at all and a synthetic
    /// allow comes back. Otherwise the first response frame carrying our
    /// correlation id wins against the timeout; the loser is discarded.
    /// This never returns an error — every failure becomes fail-open.
    pub async fn request(&self, descriptor: SubmissionDescriptor) -> PolicyDecision {
        if !self.store.settings().enabled {
            tracing::debug!(kind = descriptor.kind().as_str(), "mediation disabled, allowing");
            return PolicyDecision::allow_unmodified();
        }

        let created_at_ms = chrono::Utc::now().timestamp_millis();
        let id = self.next_correlation_id(created_at_ms);
        // Subscribe before publishing so the response cannot slip past us.
        let mut rx = self.bus.subscribe();
        self.bus.publish(Frame::Request(RequestFrame {
            id: id.clone(),
            host: self.host.clone(),
            created_at_ms,
            descriptor,
        }));

        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                frame = rx.recv() => match frame {
                    Ok(Frame::Response(response)) if response.id == id => {
                        return response.verdict;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(correlation_id = %id, skipped, "decision bus lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        let err = ChannelError::Closed;
                        tracing::warn!(correlation_id = %id, error = %err, "failing open");
                        return PolicyDecision::fail_open("channel_closed");
                    }
                },
                () = &mut deadline => {
                    let err = ChannelError::Timeout {
                        timeout_secs: self.timeout.as_secs(),
                    };
                    tracing::warn!(correlation_id = %id, error = %err, "failing open");
                    return PolicyDecision::fail_open("timeout");
                }
            }
        }
    }
}
