use crate::codec::AttachmentPayload;
use serde::{Deserialize, Serialize};

/// The allow/block/replace outcome for one submission.
///
/// Invariant: `fail_open == true` implies `allow == true` — a failure on our
/// side never blocks the user's own action. Construct through the helpers to
/// keep that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub allow: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement_attachment: Option<AttachmentPayload>,

    #[serde(default)]
    pub fail_open: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PolicyDecision {
    /// Allow the submission exactly as the user produced it.
    #[must_use]
    pub fn allow_unmodified() -> Self {
        Self {
            allow: true,
            modified_content: None,
            replacement_attachment: None,
            fail_open: false,
            reason: None,
        }
    }

    /// Synthetic allow produced when the decision machinery failed or timed
    /// out. Always allows; never carries modifications.
    #[must_use]
    pub fn fail_open(reason: impl Into<String>) -> Self {
        Self {
            allow: true,
            modified_content: None,
            replacement_attachment: None,
            fail_open: true,
            reason: Some(reason.into()),
        }
    }

    #[must_use]
    pub fn blocked(reason: Option<String>) -> Self {
        Self {
            allow: false,
            modified_content: None,
            replacement_attachment: None,
            fail_open: false,
            reason,
        }
    }

    #[must_use]
    pub fn rewrite(modified_content: impl Into<String>) -> Self {
        Self {
            modified_content: Some(modified_content.into()),
            ..Self::allow_unmodified()
        }
    }

    #[must_use]
    pub fn replace(attachment: AttachmentPayload) -> Self {
        Self {
            replacement_attachment: Some(attachment),
            ..Self::allow_unmodified()
        }
    }

    #[must_use]
    pub fn is_blocked(&self) -> bool {
        !self.allow
    }
}
