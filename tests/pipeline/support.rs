use sendguard::collector::ComposerSurface;
use sendguard::config::{MemorySettingsStore, Settings, SettingsStore};
use sendguard::intercept::{
    DispatchCallback, DispatchReply, DispatchResult, NetworkDispatcher, OutboundRequest,
    PageCoordinator, RequestBody,
};
use sendguard::mediator::Mediator;
use sendguard::protocol::{DecisionBus, DecisionRequester};
use sendguard::relay::Relay;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const HOST: &str = "chat.example.com";

/// Fully wired pipeline: requester and coordinator on the page side, a
/// mediator task and relay on the privileged side, joined by the bus.
pub struct Pipeline {
    pub bus: DecisionBus,
    pub store: Arc<MemorySettingsStore>,
    pub coordinator: PageCoordinator,
}

pub fn pipeline(endpoint: String) -> Pipeline {
    let bus = DecisionBus::new();
    let store = Arc::new(MemorySettingsStore::new(Settings::with_endpoint(endpoint)));

    let relay = Arc::new(Relay::with_timeout(
        Arc::clone(&store) as Arc<dyn SettingsStore>,
        Duration::from_millis(500),
    ));
    Mediator::new(
        bus.clone(),
        Arc::clone(&store) as Arc<dyn SettingsStore>,
        relay,
    )
    .spawn();

    let requester = Arc::new(DecisionRequester::with_timeout(
        bus.clone(),
        Arc::clone(&store) as Arc<dyn SettingsStore>,
        HOST,
        Duration::from_secs(5),
    ));

    Pipeline {
        bus,
        store,
        coordinator: PageCoordinator::with_requester(requester),
    }
}

// ── Page-side stubs ──────────────────────────────────────────────

/// Records every request that would have gone out on the wire.
pub struct RecordingDispatcher {
    pub calls: AtomicUsize,
    pub bodies: Mutex<Vec<RequestBody>>,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            bodies: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sent_bodies(&self) -> Vec<RequestBody> {
        self.bodies.lock().expect("bodies lock").clone()
    }
}

impl NetworkDispatcher for RecordingDispatcher {
    fn dispatch<'a>(
        &'a self,
        request: OutboundRequest,
    ) -> Pin<Box<dyn Future<Output = DispatchResult> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .lock()
            .expect("bodies lock")
            .push(request.body.clone());
        Box::pin(async { Ok(DispatchReply::ok()) })
    }

    fn dispatch_deferred(&self, request: OutboundRequest, done: DispatchCallback) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .lock()
            .expect("bodies lock")
            .push(request.body.clone());
        done(Ok(DispatchReply::ok()));
    }
}

/// In-memory composer surface.
pub struct RecordingSurface {
    pub input: Mutex<String>,
    pub submits: AtomicUsize,
    pub notices: Mutex<Vec<String>>,
}

impl RecordingSurface {
    pub fn with_input(text: &str) -> Arc<Self> {
        Arc::new(Self {
            input: Mutex::new(text.to_string()),
            submits: AtomicUsize::new(0),
            notices: Mutex::new(Vec::new()),
        })
    }

    pub fn input(&self) -> String {
        self.input.lock().expect("input lock").clone()
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn notice_count(&self) -> usize {
        self.notices.lock().expect("notices lock").len()
    }
}

impl ComposerSurface for RecordingSurface {
    fn read_input(&self) -> String {
        self.input()
    }

    fn write_input(&self, text: &str) {
        *self.input.lock().expect("input lock") = text.to_string();
    }

    fn submit(&self) {
        self.submits.fetch_add(1, Ordering::SeqCst);
    }

    fn show_notice(&self, message: &str) {
        self.notices
            .lock()
            .expect("notices lock")
            .push(message.to_string());
    }
}
