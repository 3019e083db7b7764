use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// A span of bytes within a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub offset: u64,
    pub len: u64,
}

impl ByteRange {
    #[must_use]
    pub fn new(offset: u64, len: u64) -> Self {
        Self { offset, len }
    }

    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.len)
    }
}

/// Errors from a [`ByteRangeProvider`] or the retry layer above it.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The backend cannot serve several ranges in one call.
    #[error("provider does not support multi-range requests")]
    RangesUnsupported,

    #[error("range {offset}+{len} lies outside a resource of {size} bytes")]
    OutOfRange { offset: u64, len: u64, size: u64 },

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Source of container bytes.
///
/// Implementations return one blob per requested range, in request order.
/// Remote backends that cannot batch ranges answer
/// [`FetchError::RangesUnsupported`] and the catalog falls back to
/// smaller batches or a whole-resource read.
#[async_trait]
pub trait ByteRangeProvider: Send + Sync {
    /// Fetch the given ranges.
    ///
    /// # Errors
    ///
    /// Backend failures, or [`FetchError::RangesUnsupported`].
    async fn fetch(&self, ranges: &[ByteRange]) -> Result<Vec<Bytes>, FetchError>;

    /// Fetch the whole resource.
    ///
    /// # Errors
    ///
    /// Backend failures.
    async fn fetch_all(&self) -> Result<Bytes, FetchError>;
}

/// Container bytes already in memory.
#[derive(Clone, Debug)]
pub struct MemoryProvider {
    data: Bytes,
}

impl MemoryProvider {
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

#[async_trait]
impl ByteRangeProvider for MemoryProvider {
    async fn fetch(&self, ranges: &[ByteRange]) -> Result<Vec<Bytes>, FetchError> {
        let size = self.data.len() as u64;
        ranges
            .iter()
            .map(|r| {
                if r.end() > size {
                    return Err(FetchError::OutOfRange {
                        offset: r.offset,
                        len: r.len,
                        size,
                    });
                }
                #[allow(clippy::cast_possible_truncation)]
                let (start, end) = (r.offset as usize, r.end() as usize);
                Ok(self.data.slice(start..end))
            })
            .collect()
    }

    async fn fetch_all(&self) -> Result<Bytes, FetchError> {
        Ok(self.data.clone())
    }
}

/// Container on the local filesystem, read with `tokio::fs`.
///
/// Every call opens the file afresh, so one provider can serve
/// concurrent reads.
#[derive(Clone, Debug)]
pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ByteRangeProvider for FileProvider {
    async fn fetch(&self, ranges: &[ByteRange]) -> Result<Vec<Bytes>, FetchError> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        let size = file.metadata().await?.len();
        let mut out = Vec::with_capacity(ranges.len());
        for r in ranges {
            if r.end() > size {
                return Err(FetchError::OutOfRange {
                    offset: r.offset,
                    len: r.len,
                    size,
                });
            }
            file.seek(std::io::SeekFrom::Start(r.offset)).await?;
            #[allow(clippy::cast_possible_truncation)]
            let mut buf = vec![0u8; r.len as usize];
            file.read_exact(&mut buf).await?;
            out.push(Bytes::from(buf));
        }
        Ok(out)
    }

    async fn fetch_all(&self) -> Result<Bytes, FetchError> {
        Ok(Bytes::from(tokio::fs::read(&self.path).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_ranges_in_request_order() {
        let p = MemoryProvider::new(b"0123456789".to_vec());
        let blobs = p
            .fetch(&[ByteRange::new(6, 2), ByteRange::new(1, 3)])
            .await
            .unwrap();
        assert_eq!(&blobs[0][..], b"67");
        assert_eq!(&blobs[1][..], b"123");
    }

    #[tokio::test]
    async fn memory_range_past_end() {
        let p = MemoryProvider::new(vec![0u8; 4]);
        let err = p.fetch(&[ByteRange::new(2, 3)]).await.unwrap_err();
        assert!(matches!(err, FetchError::OutOfRange { size: 4, .. }));
    }

    #[tokio::test]
    async fn file_ranges() {
        let path = std::env::temp_dir().join(format!("oxroot-provider-{}.bin", std::process::id()));
        tokio::fs::write(&path, b"abcdefgh").await.unwrap();
        let p = FileProvider::new(&path);
        let blobs = p.fetch(&[ByteRange::new(2, 3)]).await.unwrap();
        assert_eq!(&blobs[0][..], b"cde");
        assert_eq!(p.fetch_all().await.unwrap().len(), 8);
        tokio::fs::remove_file(&path).await.unwrap();
    }
}
