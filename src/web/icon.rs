// src/web/icon.rs
//! Icon references come straight from third-party index documents, so they
//! are filtered before being placed in an `src` attribute.

const ALLOWED_DATA_TYPES: [&str; 6] = ["svg+xml", "png", "jpeg", "jpg", "gif", "webp"];

/// Returns the icon reference if it is safe to embed, `None` otherwise.
///
/// Accepted: absolute `http`/`https` URLs and base64 `data:image/...` URIs of
/// a raster or SVG type. Anything containing quotes, angle brackets or
/// whitespace is rejected outright.
pub fn sanitize_icon_url(raw: &str) -> Option<&str> {
    if raw.is_empty()
        || raw
            .chars()
            .any(|c| matches!(c, '"' | '\'' | '<' | '>' | '`') || c.is_whitespace())
    {
        return None;
    }

    if let Some(rest) = raw.strip_prefix("data:image/") {
        let (header, payload) = rest.split_once(',')?;
        let kind = header.strip_suffix(";base64")?;
        if payload.is_empty() || !ALLOWED_DATA_TYPES.contains(&kind) {
            return None;
        }
        return Some(raw);
    }

    let parsed = url::Url::parse(raw).ok()?;
    match parsed.scheme() {
        "http" | "https" => Some(raw),
        _ => None,
    }
}
