use crate::error::{CodecError, DispatchError};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

// ─── Binary artifacts ────────────────────────────────────────────────────────

/// One binary artifact as seen at a network boundary.
///
/// Artifacts that still carry their selection metadata (`filename` and
/// `modified_at`) can be matched exactly against pending entries; artifacts
/// the host page has stripped down to raw bytes fall back to heuristic
/// matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryPart {
    pub filename: Option<String>,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    /// Last-modified timestamp in epoch milliseconds, when known.
    pub modified_at: Option<i64>,
}

impl BinaryPart {
    pub fn from_file(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
        modified_at: i64,
    ) -> Self {
        Self {
            filename: Some(filename.into()),
            mime_type: mime_type.into(),
            bytes,
            modified_at: Some(modified_at),
        }
    }

    pub fn from_blob(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: None,
            mime_type: mime_type.into(),
            bytes,
            modified_at: None,
        }
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    #[must_use]
    pub fn has_full_metadata(&self) -> bool {
        self.filename.is_some() && self.modified_at.is_some()
    }
}

// ─── Request bodies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartValue {
    Text(String),
    Binary(BinaryPart),
}

/// Structured multi-part container. Part order and names are significant and
/// must survive a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartBody {
    pub parts: Vec<(String, PartValue)>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), PartValue::Text(value.into())));
        self
    }

    pub fn append_binary(mut self, name: impl Into<String>, part: BinaryPart) -> Self {
        self.parts.push((name.into(), PartValue::Binary(part)));
        self
    }

    #[must_use]
    pub fn binary_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|(_, v)| matches!(v, PartValue::Binary(_)))
            .count()
    }

    #[must_use]
    pub fn first_binary(&self) -> Option<(usize, &BinaryPart)> {
        self.parts.iter().enumerate().find_map(|(i, (_, v))| match v {
            PartValue::Binary(part) => Some((i, part)),
            PartValue::Text(_) => None,
        })
    }

    /// Rebuild the container with the part at `index` substituted, preserving
    /// every other part's name and value.
    #[must_use]
    pub fn with_replaced_binary(&self, index: usize, replacement: BinaryPart) -> Self {
        let parts = self
            .parts
            .iter()
            .enumerate()
            .map(|(i, (name, value))| {
                if i == index && matches!(value, PartValue::Binary(_)) {
                    (name.clone(), PartValue::Binary(replacement.clone()))
                } else {
                    (name.clone(), value.clone())
                }
            })
            .collect();
        Self { parts }
    }
}

/// A body that can be read only once. Inspection must go through
/// [`SealedBody::snapshot`] so the real dispatch still has an intact body to
/// send.
#[derive(Debug, Clone)]
pub struct SealedBody {
    state: Arc<Mutex<SealedState>>,
}

#[derive(Debug)]
struct SealedState {
    content: Option<Box<RequestBody>>,
}

impl SealedBody {
    pub fn new(content: RequestBody) -> Self {
        Self {
            state: Arc::new(Mutex::new(SealedState {
                content: Some(Box::new(content)),
            })),
        }
    }

    /// Duplicate the underlying content without consuming it.
    pub fn snapshot(&self) -> Result<RequestBody, CodecError> {
        let state = self.state.lock().expect("sealed body lock poisoned");
        state
            .content
            .as_deref()
            .cloned()
            .ok_or(CodecError::BodyConsumed)
    }

    /// Take the content out. Any later read or snapshot fails.
    pub fn consume(&self) -> Result<RequestBody, CodecError> {
        let mut state = self.state.lock().expect("sealed body lock poisoned");
        state
            .content
            .take()
            .map(|content| *content)
            .ok_or(CodecError::BodyConsumed)
    }

    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.state
            .lock()
            .expect("sealed body lock poisoned")
            .content
            .is_none()
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Text(String),
    Binary(BinaryPart),
    Multipart(MultipartBody),
    Sealed(SealedBody),
}

impl RequestBody {
    pub fn sealed(content: RequestBody) -> Self {
        Self::Sealed(SealedBody::new(content))
    }
}

// ─── Dispatch seam ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub method: String,
    pub body: RequestBody,
}

impl OutboundRequest {
    pub fn post(url: impl Into<String>, body: RequestBody) -> Self {
        Self {
            url: url.into(),
            method: "POST".to_string(),
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl DispatchReply {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: 200,
            body: Vec::new(),
        }
    }
}

pub type DispatchResult = Result<DispatchReply, DispatchError>;

pub type DispatchCallback = Box<dyn FnOnce(DispatchResult) + Send + 'static>;

/// The page's network-dispatch entry points.
///
/// `dispatch` is the promise-style entry; `dispatch_deferred` is the
/// callback/event-style entry. A decorator wrapping this trait sees every
/// outbound request before transmission.
pub trait NetworkDispatcher: Send + Sync {
    fn dispatch<'a>(
        &'a self,
        request: OutboundRequest,
    ) -> Pin<Box<dyn Future<Output = DispatchResult> + Send + 'a>>;

    fn dispatch_deferred(&self, request: OutboundRequest, done: DispatchCallback);
}
