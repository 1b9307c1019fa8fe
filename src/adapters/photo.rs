use crate::utils::error::{NutriError, Result};
use crate::utils::validation::{validate_path, validate_url};
use base64::{engine::general_purpose, Engine as _};
use std::path::Path;

fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        general_purpose::STANDARD.encode(bytes)
    )
}

/// Accepts a remote URL, a `data:` URL or a local file, and returns something
/// the label interpreter can fetch.
pub async fn photo_source_to_url(source: &str) -> Result<String> {
    let source = source.trim();

    if source.starts_with("data:") {
        return Ok(source.to_string());
    }

    if source.starts_with("http://") || source.starts_with("https://") {
        validate_url("photo", source)?;
        return Ok(source.to_string());
    }

    validate_path("photo", source)?;
    let path = Path::new(source);
    let bytes = tokio::fs::read(path).await?;

    if bytes.is_empty() {
        return Err(NutriError::ValidationError {
            message: format!("Photo file '{}' is empty", source),
        });
    }

    tracing::debug!("📷 Encoded {} ({} bytes) as data URL", source, bytes.len());
    Ok(encode_data_url(mime_for_path(path), &bytes))
}
