//! Boundary decoding of base64 / data-URL file payloads sent by the browser.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use crate::workflow::error::WorkflowError;

const BASE64_MARKER: &str = "base64,";

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFile {
    pub data: Bytes,
    /// MIME type announced by a `data:<mime>;base64,` prefix, if any.
    pub mime_type: Option<String>,
}

/// Decodes either a bare base64 string or a data URL.
pub fn decode_base64_file(field: &str, input: &str) -> Result<DecodedFile, WorkflowError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(WorkflowError::InvalidInput(format!("{field} is required")));
    }

    let mime_type = detect_data_url_mime(input);
    let encoded = match input.find(BASE64_MARKER) {
        Some(idx) => &input[idx + BASE64_MARKER.len()..],
        None => input,
    };
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let data = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| WorkflowError::InvalidInput(format!("{field} is not valid base64: {e}")))?;
    if data.is_empty() {
        return Err(WorkflowError::InvalidInput(format!("{field} decoded to an empty file")));
    }

    Ok(DecodedFile {
        data: Bytes::from(data),
        mime_type,
    })
}

fn detect_data_url_mime(input: &str) -> Option<String> {
    let rest = input.strip_prefix("data:")?;
    let (mime, _) = rest.split_once(";base64,")?;
    Some(mime.to_string()).filter(|m| !m.is_empty())
}
