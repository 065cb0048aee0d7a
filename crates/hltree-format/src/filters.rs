//! Deflate (zlib) filter for dataset payloads.

use std::io::{Read, Write};

use crate::error::FormatError;

/// Compress data with zlib at `level` (0-9).
pub fn deflate_compress(data: &[u8], level: u32) -> Result<Vec<u8>, FormatError> {
    let mut encoder =
        flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::new(level.min(9)));
    encoder
        .write_all(data)
        .map_err(|e| FormatError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| FormatError::Compression(e.to_string()))
}

/// Decompress zlib data that must expand to exactly `expected_size` bytes.
///
/// Output is never buffered past one byte more than `expected_size`.
pub fn deflate_decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>, FormatError> {
    let limit = u64::try_from(expected_size).unwrap_or(u64::MAX).saturating_add(1);
    let mut decoder = flate2::read::ZlibDecoder::new(data).take(limit);
    let mut result = Vec::new();
    decoder
        .read_to_end(&mut result)
        .map_err(|e| FormatError::Compression(e.to_string()))?;
    if result.len() != expected_size {
        return Err(FormatError::DataSizeMismatch {
            expected: expected_size,
            actual: result.len(),
        });
    }
    Ok(result)
}
