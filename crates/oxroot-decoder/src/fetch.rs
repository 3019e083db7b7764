use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::provider::{ByteRange, ByteRangeProvider, FetchError};

/// Retry and fallback layer over a [`ByteRangeProvider`].
///
/// ```text
///   fetch(ranges)
///     ├─ chunk into batches of `batch`
///     ├─ batch rejected or blob sizes wrong → batch /= 2, retry
///     ├─ batch == 1 and still failing       → fetch_all(), cache, slice
///     └─ attempts > max_attempts            → FetchError::Exhausted
/// ```
///
/// Once the whole resource has been fetched every later call is served
/// from that copy without touching the provider.
#[derive(Debug)]
pub struct RangeFetcher<P> {
    provider: P,
    policy: RetryPolicy,
    whole: Mutex<Option<Bytes>>,
}

impl<P: ByteRangeProvider> RangeFetcher<P> {
    #[must_use]
    pub fn new(provider: P, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy,
            whole: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Fetch one range.
    ///
    /// # Errors
    ///
    /// As for [`fetch`](Self::fetch).
    pub async fn fetch_one(&self, range: ByteRange) -> Result<Bytes, FetchError> {
        let mut blobs = self.fetch(&[range]).await?;
        blobs.pop().ok_or(FetchError::Exhausted { attempts: 0 })
    }

    /// Fetch `ranges`, one blob per range in request order.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Exhausted`] when the attempt budget runs out.
    /// - [`FetchError::OutOfRange`] and I/O errors from the provider,
    ///   which are not retried.
    pub async fn fetch(&self, ranges: &[ByteRange]) -> Result<Vec<Bytes>, FetchError> {
        if let Some(whole) = self.whole.lock().clone() {
            return slice_all(&whole, ranges);
        }

        let mut out = Vec::with_capacity(ranges.len());
        let mut batch = self.policy.batch_size.clamp(1, ranges.len().max(1));
        let mut attempts = 0u32;
        let mut i = 0;
        while i < ranges.len() {
            if attempts >= self.policy.max_attempts {
                return Err(FetchError::Exhausted { attempts });
            }
            let chunk = &ranges[i..(i + batch).min(ranges.len())];
            match self.call(self.provider.fetch(chunk)).await {
                Ok(blobs) if sizes_match(chunk, &blobs) => {
                    out.extend(blobs);
                    i += chunk.len();
                }
                Ok(_) | Err(FetchError::RangesUnsupported) => {
                    attempts += 1;
                    if batch > 1 {
                        batch /= 2;
                        debug!(batch, "shrinking range batch");
                        continue;
                    }
                    warn!("range requests failing, fetching whole resource");
                    let whole = self.fetch_whole(&mut attempts).await?;
                    out.extend(slice_all(&whole, &ranges[i..])?);
                    return Ok(out);
                }
                Err(FetchError::Timeout(after)) => {
                    attempts += 1;
                    debug!(?after, attempts, "range fetch timed out");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    async fn fetch_whole(&self, attempts: &mut u32) -> Result<Bytes, FetchError> {
        while *attempts < self.policy.max_attempts {
            match self.call(self.provider.fetch_all()).await {
                Ok(whole) => {
                    *self.whole.lock() = Some(whole.clone());
                    return Ok(whole);
                }
                Err(FetchError::Timeout(_)) => *attempts += 1,
                Err(e) => return Err(e),
            }
        }
        Err(FetchError::Exhausted {
            attempts: *attempts,
        })
    }

    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, FetchError>>,
    ) -> Result<T, FetchError> {
        tokio::time::timeout(self.policy.timeout, fut)
            .await
            .map_err(|_| FetchError::Timeout(self.policy.timeout))?
    }
}

fn sizes_match(ranges: &[ByteRange], blobs: &[Bytes]) -> bool {
    ranges.len() == blobs.len() && ranges.iter().zip(blobs).all(|(r, b)| b.len() as u64 == r.len)
}

fn slice_all(whole: &Bytes, ranges: &[ByteRange]) -> Result<Vec<Bytes>, FetchError> {
    let size = whole.len() as u64;
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
            Ok(whole.slice(start..end))
        })
        .collect()
}
