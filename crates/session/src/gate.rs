//! File acceptance gate.
//!
//! Validates a candidate by extension only; whether the bytes are
//! actually a readable spreadsheet is the backend's call.

use shared::types::{SpreadsheetKind, UploadCandidate};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("unsupported extension")]
    UnsupportedExtension,
}

/// Validate a candidate file. The extension is the text after the
/// final '.', compared case-insensitively against xlsx/xls/csv; a name
/// with no '.' at all is rejected.
pub fn accept(name: &str, data: Vec<u8>) -> Result<UploadCandidate, GateError> {
    let kind = name
        .rsplit_once('.')
        .and_then(|(_, ext)| SpreadsheetKind::from_extension(ext))
        .ok_or(GateError::UnsupportedExtension)?;

    Ok(UploadCandidate {
        name: name.to_string(),
        kind,
        data,
    })
}
