use crate::codec;
use crate::error::CodecError;
use crate::intercept::dispatcher::BinaryPart;
use crate::intercept::pending::PendingRegistry;
use crate::protocol::{DecisionRequester, SubmissionDescriptor};
use futures_util::FutureExt;
use std::sync::Arc;

/// A user gesture that brought files into the page before any upload.
#[derive(Debug, Clone)]
pub enum SelectionGesture {
    InputChange(Vec<BinaryPart>),
    DragDrop(Vec<BinaryPart>),
    Paste(Vec<BinaryPart>),
}

impl SelectionGesture {
    #[must_use]
    pub fn artifacts(&self) -> &[BinaryPart] {
        match self {
            Self::InputChange(parts) | Self::DragDrop(parts) | Self::Paste(parts) => parts,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputChange(_) => "input_change",
            Self::DragDrop(_) => "drag_drop",
            Self::Paste(_) => "paste",
        }
    }
}

/// Launch a speculative decision per selected artifact so the verdict is
/// (usually) already resolved when the upload reaches the network layer.
pub fn observe_selection(
    registry: &Arc<PendingRegistry>,
    requester: &Arc<DecisionRequester>,
    gesture: &SelectionGesture,
) {
    for part in gesture.artifacts() {
        if !part.has_full_metadata() {
            tracing::debug!(gesture = gesture.as_str(), "artifact without metadata, skipped");
            continue;
        }
        if registry.is_pending(part) {
            continue;
        }

        let payload = match codec::encode_attachment(part) {
            Ok(payload) => payload,
            Err(CodecError::UnsupportedFormat(tag)) => {
                tracing::debug!(
                    gesture = gesture.as_str(),
                    format = %tag,
                    "unsupported artifact, not mediated"
                );
                continue;
            }
            Err(err) => {
                tracing::warn!(
                    gesture = gesture.as_str(),
                    error = %err,
                    "artifact encoding failed, not mediated"
                );
                continue;
            }
        };

        let descriptor = SubmissionDescriptor::Attachment {
            payload,
            name_hint: part.filename.clone(),
        };
        let requester = Arc::clone(requester);
        let decision = async move { requester.request(descriptor).await }
            .boxed()
            .shared();

        if registry.insert(part, decision.clone()) {
            tracing::debug!(
                gesture = gesture.as_str(),
                filename = part.filename.as_deref().unwrap_or_default(),
                size = part.size(),
                "selection captured, speculative decision launched"
            );
            tokio::spawn(decision);
        }
    }
}
