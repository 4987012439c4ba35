use anyhow::{Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

pub fn to_data_url(path: &Path, bytes: &[u8]) -> Result<String> {
    if bytes.len() > MAX_IMAGE_BYTES {
        bail!(
            "{} is {} bytes, the limit is {} bytes",
            path.display(),
            bytes.len(),
            MAX_IMAGE_BYTES
        );
    }
    Ok(format!(
        "data:{};base64,{}",
        mime_for(path),
        STANDARD.encode(bytes)
    ))
}

pub async fn load(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    to_data_url(path, &bytes)
}
