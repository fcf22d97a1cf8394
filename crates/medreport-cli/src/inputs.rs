use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use medreport::models::payload::ImagePayload;

/// Read a prepared report image from disk. The file is sent as-is; any
/// downscaling or format normalization happened before it got here.
pub fn load_payload(path: &Path) -> Result<ImagePayload> {
    let data =
        fs::read(path).with_context(|| format!("failed to read image {}", path.display()))?;
    anyhow::ensure!(!data.is_empty(), "image file {} is empty", path.display());

    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());

    Ok(ImagePayload::new(data, file_name, mime_type))
}
