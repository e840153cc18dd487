use crate::config::SettingsStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of leading hex characters of the stable id carried into the
/// display name.
const DISPLAY_NAME_HEX_LEN: usize = 8;

const DISPLAY_NAME_PREFIX: &str = "CE-";

/// Stable device identity. Minted once, persisted, thereafter immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub stable_id: String,
    pub display_name: String,
}

/// Derive the display name from a stable id: `"CE-"` plus the first eight
/// hex characters with separators stripped. Idempotent for a fixed id.
#[must_use]
pub fn display_name_for(stable_id: &str) -> String {
    let head: String = stable_id
        .chars()
        .filter(|c| *c != '-')
        .take(DISPLAY_NAME_HEX_LEN)
        .collect();
    format!("{DISPLAY_NAME_PREFIX}{head}")
}

/// Return the persisted identity, minting and storing a fresh one on first
/// use. Repeated calls never create a second id.
pub fn ensure_identity(store: &dyn SettingsStore) -> Identity {
    if let Some(existing) = store.identity() {
        return existing;
    }

    let stable_id = Uuid::new_v4().to_string();
    let identity = Identity {
        display_name: display_name_for(&stable_id),
        stable_id,
    };
    store.store_identity(identity.clone());
    tracing::debug!(display_name = %identity.display_name, "minted device identity");
    identity
}
