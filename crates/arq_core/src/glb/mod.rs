//! Binary glTF (GLB) reading.
//!
//! Two readers produce the same [`GlbAsset`]:
//!
//! - [`parse`]: the built-in container reader. Splits the chunks itself,
//!   decodes the JSON chunk with serde and reads accessors directly from the
//!   BIN chunk. Lenient: anything it cannot decode is skipped per primitive.
//! - [`gltf_reader::parse`]: backed by the `gltf` crate, which validates the
//!   whole document up front and rejects files that break the glTF schema.
//!
//! Both share the primitive assembly rules in [`primitive`], so the skip
//! policy (non-triangle topology, out-of-range indices, bad attributes) is
//! identical whichever reader runs.
//!
//! # Container layout
//!
//! ```text
//! 0..4   magic 0x46546C67 ("glTF", little-endian)
//! 4..8   version
//! 8..12  total length
//! 12..   chunks: u32 length, u32 type, payload (JSON, BIN)
//! ```

mod accessor;
mod container;
mod document;
pub mod gltf_reader;
mod primitive;
mod reader;

#[cfg(test)]
pub(crate) mod fixtures;

use thiserror::Error;

pub use container::{GlbContainer, GlbHeader};
pub use reader::parse;

/// "glTF" read as a little-endian u32.
pub const GLB_MAGIC: u32 = 0x46546C67;
/// "JSON" chunk type.
pub const GLB_CHUNK_JSON: u32 = 0x4E4F534A;
/// "BIN\0" chunk type.
pub const GLB_CHUNK_BIN: u32 = 0x004E4942;
/// Magic + version + length.
pub const GLB_HEADER_LEN: usize = 12;

/// Errors that can occur while reading a GLB file.
#[derive(Error, Debug)]
pub enum GlbError {
    #[error("Invalid GLB: {0}")]
    InvalidFormat(String),

    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Face index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("{attribute} has {actual} values, expected {expected}")]
    AttributeLength {
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Result type for GLB reading.
pub type GlbResult<T> = Result<T, GlbError>;

/// Check the fixed 12-byte header and return it.
///
/// This is the only validation done before any conversion strategy runs.
pub fn validate_header(bytes: &[u8]) -> GlbResult<GlbHeader> {
    if bytes.len() < GLB_HEADER_LEN {
        return Err(GlbError::InvalidFormat(format!(
            "file too small: {} bytes, a GLB header needs {}",
            bytes.len(),
            GLB_HEADER_LEN
        )));
    }

    let magic = read_u32_le(&bytes[0..4]);
    if magic != GLB_MAGIC {
        return Err(GlbError::InvalidFormat(format!(
            "wrong magic number 0x{magic:08X}, expected 0x{GLB_MAGIC:08X}"
        )));
    }

    Ok(GlbHeader {
        version: read_u32_le(&bytes[4..8]),
        length: read_u32_le(&bytes[8..12]),
    })
}

fn read_u32_le(data: &[u8]) -> u32 {
    u32::from_le_bytes([data[0], data[1], data[2], data[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input_is_invalid() {
        for len in 0..GLB_HEADER_LEN {
            let bytes = vec![0x67; len];
            let err = validate_header(&bytes).unwrap_err();
            assert!(matches!(err, GlbError::InvalidFormat(_)), "len {len}: {err}");
        }
    }

    #[test]
    fn test_wrong_magic_is_invalid() {
        let mut bytes = b"glTX".to_vec();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&12u32.to_le_bytes());

        let err = validate_header(&bytes).unwrap_err();
        assert!(matches!(err, GlbError::InvalidFormat(_)));
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn test_big_endian_magic_is_invalid() {
        let mut bytes = GLB_MAGIC.to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 8]);
        assert!(validate_header(&bytes).is_err());
    }

    #[test]
    fn test_header_fields() {
        let mut bytes = b"glTF".to_vec();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&64u32.to_le_bytes());

        let header = validate_header(&bytes).unwrap();
        assert_eq!(header.version, 2);
        assert_eq!(header.length, 64);
    }

    #[test]
    fn test_short_input_fails_both_readers() {
        assert!(matches!(parse(b"glTF"), Err(GlbError::InvalidFormat(_))));
        assert!(matches!(gltf_reader::parse(b"glTF"), Err(GlbError::InvalidFormat(_))));
    }
}
