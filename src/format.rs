use mime::Mime;

/// Formats the policy server can analyze. Everything else is passed through
/// without mediation.
pub const SUPPORTED_FORMATS: [&str; 9] = [
    "png", "jpg", "webp", "pdf", "docx", "pptx", "xlsx", "csv", "txt",
];

#[must_use]
pub fn is_supported(tag: &str) -> bool {
    let tag = tag.to_ascii_lowercase();
    SUPPORTED_FORMATS.contains(&tag.as_str())
}

/// Normalize an extension into the internal format tag ("jpeg" → "jpg").
#[must_use]
pub fn normalize_tag(ext: &str) -> String {
    let tag = ext.trim().to_ascii_lowercase();
    if tag == "jpeg" { "jpg".to_string() } else { tag }
}

#[must_use]
pub fn tag_from_filename(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    let tag = normalize_tag(ext);
    if tag.is_empty() { None } else { Some(tag) }
}

/// Normalize a MIME string: lowercase, parameters stripped, common aliases
/// absorbed (`image/jpg` → `image/jpeg`).
#[must_use]
pub fn normalize_mime(raw: &str) -> String {
    let trimmed = raw.trim().to_ascii_lowercase();
    if trimmed.is_empty() {
        return String::new();
    }
    let essence = trimmed
        .parse::<Mime>()
        .map_or(trimmed, |m| m.essence_str().to_string());
    if essence == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        essence
    }
}

#[must_use]
pub fn tag_from_mime(raw: &str) -> Option<String> {
    match normalize_mime(raw).as_str() {
        "image/png" => Some("png".into()),
        "image/jpeg" => Some("jpg".into()),
        "image/webp" => Some("webp".into()),
        "application/pdf" => Some("pdf".into()),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            Some("docx".into())
        }
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
            Some("pptx".into())
        }
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => Some("xlsx".into()),
        "text/plain" => Some("txt".into()),
        "text/csv" | "application/csv" => Some("csv".into()),
        _ => None,
    }
}

#[must_use]
pub fn tag_from_magic(data: &[u8]) -> Option<String> {
    let tag = normalize_tag(infer::get(data)?.extension());
    if is_supported(&tag) { Some(tag) } else { None }
}

/// Resolve the format tag for a binary artifact: filename extension first,
/// MIME type second, magic bytes as a last resort.
#[must_use]
pub fn resolve_tag(filename: Option<&str>, mime_type: &str, data: &[u8]) -> Option<String> {
    filename
        .and_then(tag_from_filename)
        .or_else(|| tag_from_mime(mime_type))
        .or_else(|| tag_from_magic(data))
}

#[must_use]
pub fn mime_for_tag(tag: &str) -> &'static str {
    match normalize_tag(tag).as_str() {
        "png" => "image/png",
        "jpg" => "image/jpeg",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "csv" => "text/csv",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
