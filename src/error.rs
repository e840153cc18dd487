use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `sendguard`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains. Note that almost every failure
/// here is converted into a fail-open verdict at the boundary — the only
/// variant that ever stops an outbound action is [`DispatchError::Blocked`].
#[derive(Debug, Error)]
pub enum GuardError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Decision channel ─────────────────────────────────────────────────
    #[error("channel: {0}")]
    Channel(#[from] ChannelError),

    // ── Relay / policy server ────────────────────────────────────────────
    #[error("relay: {0}")]
    Relay(#[from] RelayError),

    // ── Network dispatch ─────────────────────────────────────────────────
    #[error("dispatch: {0}")]
    Dispatch(#[from] DispatchError),

    // ── Payload codec ────────────────────────────────────────────────────
    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid endpoint url: {0}")]
    InvalidEndpoint(String),
}

// ─── Decision channel errors ────────────────────────────────────────────────

#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("no decision response within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("decision bus closed")]
    Closed,
}

// ─── Relay errors ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error)]
pub enum RelayError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("request aborted after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("policy server returned status {0}")]
    Status(u16),

    #[error("malformed verdict payload: {0}")]
    MalformedResponse(String),
}

// ─── Dispatch errors ────────────────────────────────────────────────────────

/// Errors surfaced from the wrapped network-dispatch entry points.
///
/// `Blocked` is the distinguishable error raised instead of performing the
/// network call when the verdict denies the submission.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("blocked by policy: {}", reason.as_deref().unwrap_or("denied"))]
    Blocked { reason: Option<String> },

    #[error("network dispatch failed: {0}")]
    Network(String),
}

impl DispatchError {
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

// ─── Codec errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("payload of {size} bytes exceeds ceiling of {max}")]
    PayloadTooLarge { size: u64, max: u64 },

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("body already consumed")]
    BodyConsumed,

    #[error("replacement attachment is incomplete")]
    IncompleteAttachment,
}
