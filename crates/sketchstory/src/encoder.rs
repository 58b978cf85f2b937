use std::io::ErrorKind;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::EncodeError;

/// Base64 text of a PNG snapshot, ready to embed in a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage(String);

impl EncodedImage {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", self.0)
    }
}

/// Base64-encode raw snapshot bytes.
pub fn encode(bytes: &[u8]) -> Result<EncodedImage, EncodeError> {
    if bytes.is_empty() {
        return Err(EncodeError::Empty);
    }
    Ok(EncodedImage(STANDARD.encode(bytes)))
}

/// Read a PNG from disk and encode it.
pub fn encode_file(path: &Path) -> Result<EncodedImage, EncodeError> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => EncodeError::NotFound(path.to_path_buf()),
        _ => EncodeError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    match image::guess_format(&bytes) {
        Ok(image::ImageFormat::Png) => encode(&bytes),
        Ok(other) => Err(EncodeError::Unreadable {
            path: path.to_path_buf(),
            reason: format!("expected a PNG image, found {other:?}"),
        }),
        Err(_) if bytes.is_empty() => Err(EncodeError::Empty),
        Err(e) => Err(EncodeError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

pub fn decode(image: &EncodedImage) -> Result<Vec<u8>, EncodeError> {
    Ok(STANDARD.decode(image.as_str())?)
}
