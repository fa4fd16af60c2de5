//! Trailer-sized gzip backend.
//!
//! Reads the uncompressed size (ISIZE) from the last four bytes of the member,
//! allocates that much, and inflates the raw deflate stream into it. The
//! output buffer never grows; a stream that wants to produce more than ISIZE
//! bytes is rejected as corrupt. CRC32 and ISIZE are verified afterwards.

use flate2::{Crc, Decompress, FlushDecompress, Status};

use super::{gzip_compress, ContentCodec};
use crate::error::CodecError;

const MAGIC: [u8; 2] = [0x1f, 0x8b];
const METHOD_DEFLATE: u8 = 8;
const HEADER_LEN: usize = 10;
const TRAILER_LEN: usize = 8;

const FHCRC: u8 = 0x02;
const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;

/// Upper bound of the deflate expansion ratio.
const MAX_DEFLATE_RATIO: usize = 1032;

/// Gzip codec that sizes its output from the gzip trailer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SizedGzip;

impl ContentCodec for SizedGzip {
    fn name(&self) -> &'static str {
        "gzip-sized"
    }

    fn compress(&self, data: &[u8]) -> Vec<u8> {
        gzip_compress(data)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let body_start = header_len(data)?;
        if data.len() < body_start + TRAILER_LEN {
            return Err(CodecError::Truncated);
        }

        let trailer = &data[data.len() - TRAILER_LEN..];
        let expected_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let expected_len =
            u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]) as usize;

        let deflate = &data[body_start..data.len() - TRAILER_LEN];
        if expected_len > deflate.len().saturating_mul(MAX_DEFLATE_RATIO) {
            return Err(CodecError::Corrupt(format!(
                "size field {} is impossible for {} compressed bytes",
                expected_len,
                deflate.len()
            )));
        }

        // Never hand the inflater a zero-length buffer.
        let mut out = Vec::with_capacity(expected_len.max(1));
        let mut inflater = Decompress::new(false);

        loop {
            let consumed = inflater.total_in() as usize;
            let produced = inflater.total_out();
            let status = inflater
                .decompress_vec(&deflate[consumed..], &mut out, FlushDecompress::Finish)
                .map_err(|e| CodecError::Corrupt(e.to_string()))?;

            if status == Status::StreamEnd {
                break;
            }
            if inflater.total_in() as usize == consumed && inflater.total_out() == produced {
                if out.len() >= out.capacity() {
                    return Err(CodecError::Corrupt(
                        "decompressed data exceeds size field".to_string(),
                    ));
                }
                return Err(CodecError::Truncated);
            }
        }

        if out.len() != expected_len {
            return Err(CodecError::Corrupt(format!(
                "size mismatch: trailer says {}, got {}",
                expected_len,
                out.len()
            )));
        }

        let mut crc = Crc::new();
        crc.update(&out);
        if crc.sum() != expected_crc {
            return Err(CodecError::Corrupt("crc32 mismatch".to_string()));
        }

        Ok(out)
    }
}

/// Length of the gzip member header, including optional fields.
fn header_len(data: &[u8]) -> Result<usize, CodecError> {
    if data.len() < HEADER_LEN {
        return Err(CodecError::Truncated);
    }
    if data[..2] != MAGIC {
        return Err(CodecError::Corrupt("bad gzip magic".to_string()));
    }
    if data[2] != METHOD_DEFLATE {
        return Err(CodecError::Corrupt(format!("unknown compression method {}", data[2])));
    }

    let flags = data[3];
    let mut pos = HEADER_LEN;

    if flags & FEXTRA != 0 {
        let xlen = data
            .get(pos..pos + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]) as usize)
            .ok_or(CodecError::Truncated)?;
        pos += 2 + xlen;
    }
    if flags & FNAME != 0 {
        pos = skip_zero_terminated(data, pos)?;
    }
    if flags & FCOMMENT != 0 {
        pos = skip_zero_terminated(data, pos)?;
    }
    if flags & FHCRC != 0 {
        pos += 2;
    }

    if pos > data.len() {
        return Err(CodecError::Truncated);
    }
    Ok(pos)
}

fn skip_zero_terminated(data: &[u8], pos: usize) -> Result<usize, CodecError> {
    data.get(pos..)
        .and_then(|rest| rest.iter().position(|&b| b == 0))
        .map(|nul| pos + nul + 1)
        .ok_or(CodecError::Truncated)
}
