/// Boxed error returned by an external decoder.
pub type ExternalError = Box<dyn std::error::Error + Send + Sync>;

/// Decoder for an algorithm this crate does not implement itself.
///
/// Implementations receive the block payload after the algorithm prefix
/// and the uncompressed size the block header declares.
pub trait ExternalDecoder: Send + Sync {
    /// Decode one block.
    ///
    /// # Errors
    ///
    /// Any decoder failure, reported back as
    /// [`InflateError::External`](crate::InflateError::External).
    fn decode(&self, payload: &[u8], uncompressed_len: usize) -> Result<Vec<u8>, ExternalError>;
}

/// ZSTD blocks decoded with the `zstd` crate.
#[cfg(feature = "zstd")]
#[derive(Clone, Copy, Debug, Default)]
pub struct ZstdDecoder;

#[cfg(feature = "zstd")]
impl ExternalDecoder for ZstdDecoder {
    fn decode(&self, payload: &[u8], uncompressed_len: usize) -> Result<Vec<u8>, ExternalError> {
        Ok(zstd::bulk::decompress(payload, uncompressed_len)?)
    }
}
