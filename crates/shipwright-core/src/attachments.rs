//! Attachment materialization: inbound data-URI payloads become staged bytes.
//!
//! Names are validated before any byte is decoded so a hostile attachment can
//! never address a path outside the working area.

use base64::Engine;

use crate::domain::error::{DeployError, Result};
use crate::domain::Attachment;

/// A decoded attachment ready to join the staged file set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedAttachment {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Decode every attachment, preserving request order.
pub fn materialize(attachments: &[Attachment]) -> Result<Vec<MaterializedAttachment>> {
    attachments.iter().map(materialize_one).collect()
}

fn materialize_one(attachment: &Attachment) -> Result<MaterializedAttachment> {
    validate_name(&attachment.name)?;
    let bytes = decode_data_uri(&attachment.data).map_err(|reason| {
        DeployError::InvalidRequest(format!("attachment {:?}: {reason}", attachment.name))
    })?;
    Ok(MaterializedAttachment {
        name: attachment.name.clone(),
        bytes,
    })
}

/// Reject names that could escape the working area. Forward-slash
/// subdirectories are allowed; traversal segments and absolute paths are not.
fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(DeployError::InvalidRequest(format!(
            "attachment name {name:?}: {reason}"
        )))
    };
    if name.is_empty() {
        return invalid("must not be empty");
    }
    if name.starts_with('/') {
        return invalid("must be a relative path");
    }
    if name.contains('\\') || name.contains('\0') {
        return invalid("contains a forbidden character");
    }
    if name.split('/').any(|segment| segment == ".." || segment.is_empty()) {
        return invalid("contains a path-traversal segment");
    }
    Ok(())
}

fn decode_data_uri(data: &str) -> std::result::Result<Vec<u8>, String> {
    let rest = data
        .strip_prefix("data:")
        .ok_or_else(|| "payload is not a data URI".to_string())?;
    let (metadata, payload) = rest
        .split_once(',')
        .ok_or_else(|| "data URI has no payload separator".to_string())?;
    if !metadata.ends_with(";base64") {
        return Err("only base64-encoded data URIs are supported".to_string());
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("invalid base64 payload: {e}"))
}
