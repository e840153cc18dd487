use crate::identity::Identity;
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Endpoint used when the embedder has not configured one.
pub const DEFAULT_ENDPOINT_URL: &str = "https://bobsentinel.com/api/logs";

// ── Settings schema ──────────────────────────────────────────────

/// Mediation settings, re-read before every decision request so that an
/// out-of-band toggle takes effect on the next submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
}

fn default_enabled() -> bool {
    true
}

fn default_endpoint_url() -> String {
    DEFAULT_ENDPOINT_URL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint_url: default_endpoint_url(),
        }
    }
}

impl Settings {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_endpoint(endpoint_url: impl Into<String>) -> Self {
        Self {
            enabled: true,
            endpoint_url: endpoint_url.into(),
        }
    }
}

// ── Store seam ───────────────────────────────────────────────────

/// Persistence seam for settings and the device identity.
///
/// Actual durable storage lives outside this crate; embedders supply their
/// own implementation. [`MemorySettingsStore`] covers in-process use.
pub trait SettingsStore: Send + Sync {
    fn settings(&self) -> Settings;

    fn update_settings(&self, settings: Settings);

    fn identity(&self) -> Option<Identity>;

    fn store_identity(&self, identity: Identity);
}

/// Lock-free in-memory store. Reads take a snapshot; writers swap whole
/// values, so a reader never observes a half-updated settings pair.
pub struct MemorySettingsStore {
    settings: ArcSwap<Settings>,
    identity: ArcSwap<Option<Identity>>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: ArcSwap::from_pointee(settings),
            identity: ArcSwap::from_pointee(None),
        }
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl SettingsStore for MemorySettingsStore {
    fn settings(&self) -> Settings {
        self.settings.load().as_ref().clone()
    }

    fn update_settings(&self, settings: Settings) {
        self.settings.store(Arc::new(settings));
    }

    fn identity(&self) -> Option<Identity> {
        self.identity.load().as_ref().clone()
    }

    fn store_identity(&self, identity: Identity) {
        self.identity.store(Arc::new(Some(identity)));
    }
}
