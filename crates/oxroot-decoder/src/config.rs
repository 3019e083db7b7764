use std::time::Duration;

use oxroot_inflate::DEFAULT_MAX_OUTPUT;

/// Limits applied while decoding one object.
///
/// ```text
/// ┌────────────────────┬─────────┬───────────────────────────────────────┐
/// │ Field              │ Default │ Purpose                               │
/// ├────────────────────┼─────────┼───────────────────────────────────────┤
/// │ max_class_version  │ 1000    │ versions above are treated as corrupt │
/// │ objectwise_ceiling │ 200000  │ largest element-by-element container  │
/// │ memberwise_ceiling │ 1000000 │ largest member-wise container         │
/// └────────────────────┴─────────┴───────────────────────────────────────┘
/// ```
///
/// A container whose declared count is above its ceiling is nulled and
/// reported; it never allocates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    pub max_class_version: i16,
    pub objectwise_ceiling: u64,
    pub memberwise_ceiling: u64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_class_version: 1000,
            objectwise_ceiling: 200_000,
            memberwise_ceiling: 1_000_000,
        }
    }
}

/// How byte ranges are fetched from a provider.
///
/// Ranges go out in batches of `batch_size`. A batch the provider rejects
/// (no multi-range support, or blobs of the wrong size) is halved and
/// retried; at a batch of one the whole resource is fetched once and
/// sliced locally. Every failed call counts against `max_attempts`.
///
/// ```text
///   batch(16) ─fail→ batch(8) ─fail→ … batch(1) ─fail→ whole resource
///                                                         │
///                                        cached for every later call
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub batch_size: usize,
    pub max_attempts: u32,
    /// Applied to every single provider call.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            batch_size: 16,
            max_attempts: 6,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Configuration for [`ContainerCatalog`](crate::ContainerCatalog).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogConfig {
    pub decoder: DecoderConfig,
    pub retry: RetryPolicy,
    /// Largest decompressed entry the catalog will produce.
    pub max_decompressed: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            retry: RetryPolicy::default(),
            max_decompressed: DEFAULT_MAX_OUTPUT,
        }
    }
}
