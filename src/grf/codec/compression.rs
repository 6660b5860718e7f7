//! Deflate decompression for GRF payloads and the central directory.

use std::io::Read;

use flate2::read::ZlibDecoder;
use log::trace;

/// Inflates a zlib payload, requiring the output to be exactly
/// `expected_size` bytes.
///
/// GRF stores the uncompressed size next to every deflate stream; any
/// mismatch means the stream is corrupt. The error reason is returned as a
/// plain string so callers can attach their own context (entry name or
/// table position).
pub fn inflate_exact(payload: &[u8], expected_size: u64) -> Result<Vec<u8>, String> {
    trace!(
        "inflating {} bytes -> {} bytes (expected)",
        payload.len(),
        expected_size
    );

    let mut output = Vec::with_capacity(expected_size as usize);
    let mut decoder = ZlibDecoder::new(payload);
    decoder
        .read_to_end(&mut output)
        .map_err(|e| format!("zlib inflate failed: {e}"))?;

    if output.len() as u64 != expected_size {
        return Err(format!(
            "inflated size mismatch: expected {} bytes, got {}",
            expected_size,
            output.len()
        ));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn round_trips_a_payload() {
        let payload = b"the quick brown fox jumps over the lazy dog";
        let compressed = deflate(payload);
        let inflated = inflate_exact(&compressed, payload.len() as u64).unwrap();
        assert_eq!(inflated, payload);
    }

    #[test]
    fn rejects_wrong_expected_size() {
        let compressed = deflate(b"payload");
        let err = inflate_exact(&compressed, 99).unwrap_err();
        assert!(err.contains("size mismatch"), "unexpected reason: {err}");
    }

    #[test]
    fn rejects_garbage_input() {
        let err = inflate_exact(&[0xde, 0xad, 0xbe, 0xef], 4).unwrap_err();
        assert!(err.contains("inflate failed"), "unexpected reason: {err}");
    }
}
