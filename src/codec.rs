use crate::error::CodecError;
use crate::format;
use crate::intercept::BinaryPart;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

/// Ceiling applied before base64 encoding. Oversized artifacts fail the
/// codec and therefore fail open.
pub const MAX_ATTACHMENT_BYTES: u64 = 25 * 1024 * 1024;

/// Wire-ready attachment: normalized format tag plus base64 payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentPayload {
    pub format: String,
    pub data: String,
    pub size: u64,
}

/// Encode a binary artifact for transport to the policy server.
pub fn encode_attachment(part: &BinaryPart) -> Result<AttachmentPayload, CodecError> {
    let tag = format::resolve_tag(part.filename.as_deref(), &part.mime_type, &part.bytes)
        .ok_or_else(|| CodecError::UnsupportedFormat("unknown".to_string()))?;
    if !format::is_supported(&tag) {
        return Err(CodecError::UnsupportedFormat(tag));
    }

    let size = part.size();
    if size > MAX_ATTACHMENT_BYTES {
        return Err(CodecError::PayloadTooLarge {
            size,
            max: MAX_ATTACHMENT_BYTES,
        });
    }

    Ok(AttachmentPayload {
        format: tag,
        data: BASE64.encode(&part.bytes),
        size,
    })
}

/// Decode a server-provided replacement back into a binary artifact.
///
/// The replacement keeps the original base name but always carries the
/// extension matching the verdict's format, so the substituted part is
/// self-describing even when the format changed.
pub fn decode_attachment(
    payload: &AttachmentPayload,
    original_name: Option<&str>,
) -> Result<BinaryPart, CodecError> {
    if payload.data.is_empty() || payload.format.is_empty() {
        return Err(CodecError::IncompleteAttachment);
    }

    let tag = format::normalize_tag(&payload.format);
    let bytes = BASE64.decode(payload.data.as_bytes())?;
    let filename = filename_with_extension(original_name.unwrap_or("file"), &tag);

    Ok(BinaryPart {
        filename: Some(filename),
        mime_type: format::mime_for_tag(&tag).to_string(),
        bytes,
        modified_at: None,
    })
}

fn filename_with_extension(name: &str, tag: &str) -> String {
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    format!("{stem}.{tag}")
}
