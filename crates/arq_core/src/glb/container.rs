use super::{read_u32_le, validate_header, GlbError, GlbResult, GLB_CHUNK_BIN, GLB_CHUNK_JSON, GLB_HEADER_LEN};

/// The fixed GLB header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlbHeader {
    /// Container version (read, not enforced)
    pub version: u32,

    /// Declared total length in bytes
    pub length: u32,
}

/// A GLB file split into its chunks, borrowing from the input.
#[derive(Debug)]
pub struct GlbContainer<'a> {
    pub header: GlbHeader,

    /// Payload of the JSON chunk
    pub json: &'a [u8],

    /// Payload of the first BIN chunk, if any
    pub bin: Option<&'a [u8]>,
}

impl<'a> GlbContainer<'a> {
    /// Validate the header and walk the chunk list.
    ///
    /// Chunks are read up to the declared length, or the end of the input if
    /// that is shorter. Unknown chunk types are ignored.
    pub fn split(bytes: &'a [u8]) -> GlbResult<Self> {
        let header = validate_header(bytes)?;

        let declared = header.length as usize;
        if declared < bytes.len() {
            log::debug!(
                "GLB declares {} bytes but input has {}, ignoring the tail",
                declared,
                bytes.len()
            );
        }
        let end = declared.min(bytes.len());

        let mut offset = GLB_HEADER_LEN;
        let mut json = None;
        let mut bin = None;

        while offset + 8 <= end {
            let chunk_length = read_u32_le(&bytes[offset..offset + 4]) as usize;
            let chunk_type = read_u32_le(&bytes[offset + 4..offset + 8]);
            offset += 8;

            let chunk_end = offset
                .checked_add(chunk_length)
                .filter(|&e| e <= end)
                .ok_or_else(|| {
                    GlbError::InvalidFormat(format!(
                        "chunk 0x{chunk_type:08X} of {chunk_length} bytes at offset {} runs past the end of the file",
                        offset - 8
                    ))
                })?;

            let payload = &bytes[offset..chunk_end];
            match chunk_type {
                GLB_CHUNK_JSON if json.is_none() => json = Some(payload),
                GLB_CHUNK_BIN if bin.is_none() => bin = Some(payload),
                other => log::debug!("Ignoring GLB chunk 0x{:08X} ({} bytes)", other, chunk_length),
            }

            offset = chunk_end;
        }

        let json = json.ok_or_else(|| GlbError::InvalidFormat("no JSON chunk".to_string()))?;

        Ok(Self { header, json, bin })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glb::fixtures::encode_glb;

    #[test]
    fn test_split_json_and_bin() {
        let bytes = encode_glb(br#"{"asset":{"version":"2.0"}}"#, &[1, 2, 3, 4]);
        let container = GlbContainer::split(&bytes).unwrap();

        assert_eq!(container.header.version, 2);
        assert_eq!(container.header.length as usize, bytes.len());
        assert!(container.json.starts_with(b"{\"asset\""));
        assert_eq!(container.bin, Some(&[1u8, 2, 3, 4][..]));
    }

    #[test]
    fn test_missing_json_chunk() {
        let mut bytes = b"glTF".to_vec();
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&12u32.to_le_bytes());

        let err = GlbContainer::split(&bytes).unwrap_err();
        assert!(err.to_string().contains("no JSON chunk"));
    }

    #[test]
    fn test_truncated_chunk() {
        let mut bytes = encode_glb(br#"{"asset":{"version":"2.0"}}"#, &[]);
        // Claim a longer JSON chunk than the file holds
        bytes[12..16].copy_from_slice(&1000u32.to_le_bytes());

        let err = GlbContainer::split(&bytes).unwrap_err();
        assert!(matches!(err, GlbError::InvalidFormat(_)));
    }
}
