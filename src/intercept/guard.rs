use crate::codec;
use crate::error::{CodecError, DispatchError};
use crate::intercept::dispatcher::{
    BinaryPart, DispatchCallback, DispatchResult, NetworkDispatcher, OutboundRequest, RequestBody,
};
use crate::intercept::pending::PendingRegistry;
use crate::protocol::{DecisionRequester, SubmissionDescriptor};
use crate::verdict::PolicyDecision;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

// ─── Body inspection ─────────────────────────────────────────────────────────

/// Where the mediated binary part sits inside the request body.
#[derive(Debug, Clone)]
enum Probe {
    /// Nothing to mediate.
    Clean,
    /// More than one binary part: passed through untouched.
    Skipped { binaries: usize },
    Single(BinaryPart),
    InMultipart { index: usize, part: BinaryPart },
}

fn probe_body(body: &RequestBody) -> Result<Probe, CodecError> {
    match body {
        RequestBody::Empty | RequestBody::Text(_) => Ok(Probe::Clean),
        RequestBody::Binary(part) => Ok(Probe::Single(part.clone())),
        RequestBody::Multipart(multipart) => match multipart.binary_count() {
            0 => Ok(Probe::Clean),
            1 => match multipart.first_binary() {
                Some((index, part)) => Ok(Probe::InMultipart {
                    index,
                    part: part.clone(),
                }),
                None => Ok(Probe::Clean),
            },
            binaries => Ok(Probe::Skipped { binaries }),
        },
        // Read-once bodies are inspected through a duplicate; the original
        // stays intact for the real dispatch.
        RequestBody::Sealed(sealed) => probe_body(&sealed.snapshot()?),
    }
}

/// Rebuild the request body with the probed part substituted. Sealed bodies
/// come back as plain bodies rebuilt from their snapshot.
fn replace_in_body(
    body: &RequestBody,
    probe: &Probe,
    replacement: BinaryPart,
) -> Result<RequestBody, CodecError> {
    match (body, probe) {
        (RequestBody::Binary(_), Probe::Single(_)) => Ok(RequestBody::Binary(replacement)),
        (RequestBody::Multipart(multipart), Probe::InMultipart { index, .. }) => Ok(
            RequestBody::Multipart(multipart.with_replaced_binary(*index, replacement)),
        ),
        (RequestBody::Sealed(sealed), probe) => {
            let snapshot = sealed.snapshot()?;
            replace_in_body(&snapshot, probe, replacement)
        }
        _ => Err(CodecError::IncompleteAttachment),
    }
}

// ─── Guarded decorator ───────────────────────────────────────────────────────

struct GuardContext {
    inner: Arc<dyn NetworkDispatcher>,
    requester: Arc<DecisionRequester>,
    registry: Arc<PendingRegistry>,
}

/// Decorator over the page's network-dispatch entry points.
///
/// Delegates to the wrapped dispatcher except when a verdict requires abort
/// or body substitution. The verdict is resolved before the inner dispatch
/// runs, so a blocked request never reaches the wire.
pub struct GuardedDispatcher {
    ctx: Arc<GuardContext>,
}

impl GuardedDispatcher {
    pub fn new(
        inner: Arc<dyn NetworkDispatcher>,
        requester: Arc<DecisionRequester>,
        registry: Arc<PendingRegistry>,
    ) -> Self {
        Self {
            ctx: Arc::new(GuardContext {
                inner,
                requester,
                registry,
            }),
        }
    }
}

/// Decide for one probed part: a pending selection-time decision is reused;
/// otherwise a fresh request is issued at dispatch time. `None` means the
/// artifact is outside mediation entirely (no request frame at all).
async fn decide_for_part(ctx: &GuardContext, part: &BinaryPart) -> Option<PolicyDecision> {
    if let Some(pending) = ctx.registry.take_matching(part) {
        tracing::debug!(
            filename = part.filename.as_deref().unwrap_or("(blob)"),
            size = part.size(),
            "reusing selection-time decision"
        );
        return Some(pending.await);
    }

    match codec::encode_attachment(part) {
        Ok(payload) => {
            let descriptor = SubmissionDescriptor::Attachment {
                payload,
                name_hint: part.filename.clone(),
            };
            Some(ctx.requester.request(descriptor).await)
        }
        Err(CodecError::UnsupportedFormat(tag)) => {
            tracing::debug!(format = %tag, "unsupported artifact, not mediated");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "artifact encoding failed, failing open");
            Some(PolicyDecision::fail_open("codec_failure"))
        }
    }
}

/// Inspect one outbound request and apply the verdict. Returns the request
/// to forward (possibly with a substituted body), or `Blocked`.
async fn vet(ctx: &GuardContext, mut request: OutboundRequest) -> Result<OutboundRequest, DispatchError> {
    let probe = match probe_body(&request.body) {
        Ok(probe) => probe,
        Err(err) => {
            tracing::warn!(error = %err, url = %request.url, "body inspection failed, forwarding unchanged");
            return Ok(request);
        }
    };

    let part = match &probe {
        Probe::Clean => return Ok(request),
        Probe::Skipped { binaries } => {
            tracing::warn!(
                binaries,
                url = %request.url,
                "multiple binary parts, upload passed through unmediated"
            );
            return Ok(request);
        }
        Probe::Single(part) | Probe::InMultipart { part, .. } => part.clone(),
    };

    let Some(decision) = decide_for_part(ctx, &part).await else {
        return Ok(request);
    };

    if decision.is_blocked() {
        tracing::info!(
            url = %request.url,
            filename = part.filename.as_deref().unwrap_or("(blob)"),
            "upload blocked by policy"
        );
        return Err(DispatchError::Blocked {
            reason: decision.reason,
        });
    }

    if let Some(replacement) = &decision.replacement_attachment {
        match codec::decode_attachment(replacement, part.filename.as_deref()) {
            Ok(new_part) => match replace_in_body(&request.body, &probe, new_part) {
                Ok(body) => {
                    tracing::info!(
                        url = %request.url,
                        format = %replacement.format,
                        size = replacement.size,
                        "upload body substituted by policy"
                    );
                    request.body = body;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "body rebuild failed, forwarding original");
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, "replacement decode failed, forwarding original");
            }
        }
    }

    Ok(request)
}

impl NetworkDispatcher for GuardedDispatcher {
    fn dispatch<'a>(
        &'a self,
        request: OutboundRequest,
    ) -> Pin<Box<dyn Future<Output = DispatchResult> + Send + 'a>> {
        Box::pin(async move {
            let request = vet(&self.ctx, request).await?;
            self.ctx.inner.dispatch(request).await
        })
    }

    fn dispatch_deferred(&self, request: OutboundRequest, done: DispatchCallback) {
        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(async move {
            match vet(&ctx, request).await {
                Ok(request) => ctx.inner.dispatch_deferred(request, done),
                Err(err) => done(Err(err)),
            }
        });
    }
}
