use crate::codec::AttachmentPayload;
use crate::identity::Identity;
use crate::verdict::PolicyDecision;
use serde::{Deserialize, Serialize};

/// Local-timezone timestamp, microsecond-padded:
/// `YYYY-MM-DDTHH:MM:SS.ffffff`.
#[must_use]
pub fn now_local_iso_micro() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

// ── Request body ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAttachment {
    pub format: Option<String>,
    pub data: Option<String>,
    pub size: Option<u64>,
}

impl WireAttachment {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            format: None,
            data: None,
            size: None,
        }
    }

    #[must_use]
    pub fn from_payload(payload: &AttachmentPayload) -> Self {
        Self {
            format: Some(payload.format.clone()),
            data: Some(payload.data.clone()),
            size: Some(payload.size),
        }
    }
}

/// Decision-request body sent to the policy server.
///
/// The `public_ip`/`private_ip` fields cannot be filled from inside a page;
/// the server contract expects the display name as a placeholder in both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRequest {
    pub time: String,
    pub public_ip: String,
    pub private_ip: String,
    pub host: String,
    #[serde(rename = "PCName")]
    pub pc_name: String,
    pub prompt: String,
    pub attachment: WireAttachment,
    pub interface: String,
}

impl PolicyRequest {
    #[must_use]
    pub fn new(
        identity: &Identity,
        host: &str,
        prompt: &str,
        attachment: Option<&AttachmentPayload>,
    ) -> Self {
        Self {
            time: now_local_iso_micro(),
            public_ip: identity.display_name.clone(),
            private_ip: identity.display_name.clone(),
            host: host.to_string(),
            pc_name: identity.display_name.clone(),
            prompt: prompt.to_string(),
            attachment: attachment.map_or_else(WireAttachment::empty, WireAttachment::from_payload),
            interface: "llm".to_string(),
        }
    }
}

// ── Response body ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireReplacement {
    pub format: String,
    pub data: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub file_change: bool,
}

/// Verdict as the policy server sends it. Servers in the field signal a
/// block three ways: `allow: false`, `file_blocked: true`, or an `action`
/// string containing "block".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyResponse {
    #[serde(default = "default_allow")]
    pub allow: bool,

    #[serde(default)]
    pub modified_prompt: Option<String>,

    #[serde(default)]
    pub alert: Option<String>,

    #[serde(default)]
    pub attachment: Option<WireReplacement>,

    #[serde(default)]
    pub file_blocked: Option<bool>,

    #[serde(default)]
    pub action: Option<String>,
}

fn default_allow() -> bool {
    true
}

impl PolicyResponse {
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        if !self.allow {
            return true;
        }
        if self.file_blocked == Some(true) {
            return true;
        }
        self.action
            .as_deref()
            .is_some_and(|a| a.to_ascii_lowercase().contains("block"))
    }

    /// Collapse the wire shape into the internal decision type.
    #[must_use]
    pub fn into_decision(self) -> PolicyDecision {
        if self.is_blocked() {
            return PolicyDecision::blocked(self.alert);
        }

        let replacement = self
            .attachment
            .filter(|a| a.file_change && !a.data.is_empty() && !a.format.is_empty())
            .map(|a| AttachmentPayload {
                format: a.format,
                data: a.data,
                size: a.size,
            });

        PolicyDecision {
            allow: true,
            modified_content: self.modified_prompt,
            replacement_attachment: replacement,
            fail_open: false,
            reason: self.alert,
        }
    }
}
