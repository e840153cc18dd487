use crate::codec::AttachmentPayload;
use crate::verdict::PolicyDecision;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Prompt,
    Attachment,
}

impl SubmissionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Attachment => "attachment",
        }
    }
}

/// What is being submitted. Prompts carry normalized text; attachments are
/// already encoded for transport by the time they cross the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionDescriptor {
    Prompt {
        text: String,
    },
    Attachment {
        payload: AttachmentPayload,
        name_hint: Option<String>,
    },
}

impl SubmissionDescriptor {
    #[must_use]
    pub fn kind(&self) -> SubmissionKind {
        match self {
            Self::Prompt { .. } => SubmissionKind::Prompt,
            Self::Attachment { .. } => SubmissionKind::Attachment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub id: String,
    pub host: String,
    pub created_at_ms: i64,
    pub descriptor: SubmissionDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub id: String,
    pub verdict: PolicyDecision,
}

/// One message on the broadcast surface shared by the page context and the
/// mediator context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum Frame {
    Request(RequestFrame),
    Response(ResponseFrame),
}
