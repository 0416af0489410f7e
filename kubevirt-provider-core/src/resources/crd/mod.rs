use data_encoding::{DecodeError, BASE64};

pub mod extensions;
pub mod kubevirt;

/// Byte fields of the extension resources are transported base64 encoded.
pub fn decode_bytes(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    BASE64.decode(encoded.as_bytes())
}
