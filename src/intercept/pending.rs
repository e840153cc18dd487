use crate::intercept::dispatcher::BinaryPart;
use crate::verdict::PolicyDecision;
use futures_util::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// An upload arriving within this window of its selection is treated as the
/// same artifact.
pub const PENDING_TTL: Duration = Duration::from_secs(60);

/// A decision already in flight, shareable between the selection-time
/// speculative request and the dispatch-time waiter.
pub type SharedDecision = Shared<BoxFuture<'static, PolicyDecision>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ExactKey {
    name: String,
    size: u64,
    mime: String,
    modified_at: i64,
}

impl ExactKey {
    fn for_part(part: &BinaryPart) -> Option<Self> {
        Some(Self {
            name: part.filename.clone()?,
            size: part.size(),
            mime: part.mime_type.clone(),
            modified_at: part.modified_at?,
        })
    }
}

struct PendingEntry {
    created_at: Instant,
    size: u64,
    mime: String,
    decision: SharedDecision,
}

/// In-memory table of file-selection events awaiting their upload.
///
/// Entries are keyed exactly when the artifact still carries its selection
/// metadata; artifacts stripped to raw bytes by the host page are matched
/// heuristically by size and (weak) MIME agreement. Expired entries are
/// purged lazily on each access — there is no background sweeper.
pub struct PendingRegistry {
    ttl: Duration,
    entries: Mutex<HashMap<ExactKey, PendingEntry>>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::with_ttl(PENDING_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn purge_expired(&self, entries: &mut HashMap<ExactKey, PendingEntry>) {
        let now = Instant::now();
        entries.retain(|_, entry| now.duration_since(entry.created_at) <= self.ttl);
    }

    /// Record a selection-time decision. Returns `false` when the artifact
    /// lacks the metadata needed for an exact key, or when the same artifact
    /// is already pending (the existing decision stays authoritative).
    pub fn insert(&self, part: &BinaryPart, decision: SharedDecision) -> bool {
        let Some(key) = ExactKey::for_part(part) else {
            tracing::debug!("artifact without selection metadata, not registered");
            return false;
        };

        let mut entries = self.entries.lock().expect("pending registry lock poisoned");
        self.purge_expired(&mut entries);

        if entries.contains_key(&key) {
            return false;
        }

        entries.insert(
            key,
            PendingEntry {
                created_at: Instant::now(),
                size: part.size(),
                mime: part.mime_type.clone(),
                decision,
            },
        );
        true
    }

    #[must_use]
    pub fn is_pending(&self, part: &BinaryPart) -> bool {
        let Some(key) = ExactKey::for_part(part) else {
            return false;
        };
        let mut entries = self.entries.lock().expect("pending registry lock poisoned");
        self.purge_expired(&mut entries);
        entries.contains_key(&key)
    }

    /// Find and consume the pending decision matching an artifact seen at
    /// dispatch time. Exact match when full metadata survived; otherwise a
    /// size-based heuristic. An ambiguous heuristic (several same-size
    /// candidates) is refused so a fresh decision gets issued instead.
    pub fn take_matching(&self, part: &BinaryPart) -> Option<SharedDecision> {
        let mut entries = self.entries.lock().expect("pending registry lock poisoned");
        self.purge_expired(&mut entries);

        if let Some(key) = ExactKey::for_part(part) {
            return entries.remove(&key).map(|entry| entry.decision);
        }

        let size = part.size();
        let mime = &part.mime_type;
        let candidates: Vec<ExactKey> = entries
            .iter()
            .filter(|(_, entry)| {
                entry.size == size
                    && (mime.is_empty() || entry.mime.is_empty() || entry.mime == *mime)
            })
            .map(|(key, _)| key.clone())
            .collect();

        match candidates.as_slice() {
            [] => None,
            [key] => {
                let key = key.clone();
                entries.remove(&key).map(|entry| entry.decision)
            }
            _ => {
                tracing::warn!(
                    size,
                    candidates = candidates.len(),
                    "ambiguous pending match refused, fresh decision required"
                );
                None
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let mut entries = self.entries.lock().expect("pending registry lock poisoned");
        self.purge_expired(&mut entries);
        entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PendingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
