//! Streaming gzip backend: inflate in fixed-size blocks, appending as we go.

use std::io::Read;

use flate2::read::GzDecoder;

use super::{gzip_compress, ContentCodec};
use crate::error::CodecError;

const BLOCK_SIZE: usize = 1 << 14;

/// Gzip codec backed by `flate2`'s streaming decoder.
///
/// The decompressed size is not known in advance; output is accumulated block
/// by block, optionally capped by `max_output`.
#[derive(Debug, Clone)]
pub struct StreamingGzip {
    max_output: Option<usize>,
}

impl StreamingGzip {
    /// Codec that refuses to inflate more than `max_output` bytes.
    pub fn with_limit(max_output: usize) -> Self {
        StreamingGzip {
            max_output: Some(max_output),
        }
    }
}

impl Default for StreamingGzip {
    fn default() -> Self {
        StreamingGzip { max_output: None }
    }
}

impl ContentCodec for StreamingGzip {
    fn name(&self) -> &'static str {
        "gzip-streaming"
    }

    fn compress(&self, data: &[u8]) -> Vec<u8> {
        gzip_compress(data)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if data.is_empty() {
            return Err(CodecError::Truncated);
        }

        let mut decoder = GzDecoder::new(data);
        let mut out = Vec::with_capacity(data.len().saturating_mul(2).min(BLOCK_SIZE * 4));
        let mut block = [0u8; BLOCK_SIZE];

        loop {
            let n = match decoder.read(&mut block) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Err(CodecError::Truncated)
                }
                Err(e) if e.kind() == std::io::ErrorKind::InvalidInput
                    || e.kind() == std::io::ErrorKind::InvalidData =>
                {
                    return Err(CodecError::Corrupt(e.to_string()))
                }
                Err(e) => return Err(CodecError::Io(e)),
            };

            if let Some(limit) = self.max_output {
                if out.len() + n > limit {
                    return Err(CodecError::Corrupt(format!(
                        "decompressed size exceeds limit of {} bytes",
                        limit
                    )));
                }
            }
            out.extend_from_slice(&block[..n]);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let codec = StreamingGzip::default();
        let inputs: [&[u8]; 4] = [b"", b"x", b"hello world", &[0u8; 100_000]];
        for input in inputs {
            let packed = codec.compress(input);
            assert!(!packed.is_empty());
            assert_eq!(codec.decompress(&packed).unwrap(), input);
        }
    }

    #[test]
    fn test_round_trip_binary() {
        let codec = StreamingGzip::default();
        let input: Vec<u8> = (0..70_000u32).map(|i| (i * 31 % 251) as u8).collect();
        assert_eq!(codec.decompress(&codec.compress(&input)).unwrap(), input);
    }

    #[test]
    fn test_truncated_input_fails() {
        let codec = StreamingGzip::default();
        let packed = codec.compress(b"some text that will be cut short");
        let cut = &packed[..packed.len() / 2];
        assert!(codec.decompress(cut).is_err());
        assert!(codec.decompress(&[]).is_err());
    }

    #[test]
    fn test_corrupt_input_fails() {
        let codec = StreamingGzip::default();
        assert!(codec.decompress(b"definitely not gzip").is_err());
    }

    #[test]
    fn test_output_limit() {
        let codec = StreamingGzip::with_limit(10);
        let packed = codec.compress(&[b'a'; 100]);
        assert!(matches!(codec.decompress(&packed), Err(CodecError::Corrupt(_))));
    }
}
