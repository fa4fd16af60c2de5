//! Gzip content coding.
//!
//! The connection engine talks to a [`ContentCodec`]; the default implementation
//! is chosen at build time through cargo features:
//!
//! | Feature | Default codec | Decompression strategy |
//! |---------|---------------|------------------------|
//! | `gzip` (default) | [`StreamingGzip`] | streaming inflate, output grows incrementally |
//! | `gzip-sized` only | [`SizedGzip`] | output sized from the gzip trailer, never grows past it |
//! | neither | [`UnsupportedGzip`] | always fails |
//!
//! Either feature builds both real backends, so both are always available for
//! injection; the features only decide which one [`default_codec`] returns.
//! They implement the same contract and are interchangeable. A client can be
//! given a specific codec with
//! [`HttpClient::with_collaborators`](crate::HttpClient::with_collaborators).
//!
//! # Examples
//!
//! ```
//! use strand_http::codec::default_codec;
//!
//! let codec = default_codec();
//! if codec.is_supported() {
//!     let packed = codec.compress(b"hello hello hello");
//!     assert_eq!(codec.decompress(&packed).unwrap(), b"hello hello hello");
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::CodecError;

#[cfg(any(feature = "gzip", feature = "gzip-sized"))]
mod sized;
#[cfg(any(feature = "gzip", feature = "gzip-sized"))]
mod streaming;

#[cfg(any(feature = "gzip", feature = "gzip-sized"))]
pub use sized::SizedGzip;
#[cfg(any(feature = "gzip", feature = "gzip-sized"))]
pub use streaming::StreamingGzip;

/// Gzip compress/decompress contract.
pub trait ContentCodec: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this codec can actually encode and decode.
    fn is_supported(&self) -> bool {
        true
    }

    /// Compress `data` into a gzip member. An empty result signals failure or an
    /// unsupported build.
    fn compress(&self, data: &[u8]) -> Vec<u8>;

    /// Decompress one gzip member. Truncated or corrupt input is an error, never
    /// an out-of-bounds read.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// Codec used when the crate is built without any gzip backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedGzip;

impl ContentCodec for UnsupportedGzip {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn is_supported(&self) -> bool {
        false
    }

    fn compress(&self, _data: &[u8]) -> Vec<u8> {
        Vec::new()
    }

    fn decompress(&self, _data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Err(CodecError::Unsupported)
    }
}

/// The codec selected by the enabled cargo features.
#[cfg(feature = "gzip")]
pub fn default_codec() -> Arc<dyn ContentCodec> {
    Arc::new(StreamingGzip::default())
}

/// The codec selected by the enabled cargo features.
#[cfg(all(feature = "gzip-sized", not(feature = "gzip")))]
pub fn default_codec() -> Arc<dyn ContentCodec> {
    Arc::new(SizedGzip)
}

/// The codec selected by the enabled cargo features.
#[cfg(not(any(feature = "gzip", feature = "gzip-sized")))]
pub fn default_codec() -> Arc<dyn ContentCodec> {
    Arc::new(UnsupportedGzip)
}

/// Gzip-compress with the default level. Shared by both backends.
#[cfg(any(feature = "gzip", feature = "gzip-sized"))]
fn gzip_compress(data: &[u8]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let buffer = Vec::with_capacity(data.len() / 2 + 32);
    let mut encoder = GzEncoder::new(buffer, Compression::default());
    match encoder.write_all(data).and_then(|_| encoder.finish()) {
        Ok(out) => out,
        Err(e) => {
            tracing::warn!("gzip compression failed: {}", e);
            Vec::new()
        }
    }
}
