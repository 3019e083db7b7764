//! Range providers with limited capabilities.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use common::{Track, track_schema, write_track};
use oxroot_decoder::{
    ByteRange, ByteRangeProvider, CatalogConfig, CatalogError, ContainerCatalog, FetchError, FileProvider,
    MemoryProvider, RetryPolicy,
};
use oxroot_tests::{Compression, ContainerBuilder, Directory};

fn container() -> Vec<u8> {
    let top = Directory::new("remote.root")
        .object("a", 1, "Track", |w| write_track(w, &Track::sample(1)))
        .object("b", 1, "Track", |w| write_track(w, &Track::sample(5)))
        .directory(Directory::new("sub").object("c", 1, "Track", |w| write_track(w, &Track::sample(3))));
    ContainerBuilder::new(top)
        .schema(track_schema())
        .compression(Compression::Zlib)
        .build()
}

#[derive(Debug, Default)]
struct Calls {
    fetch: AtomicUsize,
    rejected: AtomicUsize,
    fetch_all: AtomicUsize,
}

/// Serves memory through a backend that caps ranges per request.
#[derive(Debug)]
struct Limited {
    inner: MemoryProvider,
    max_ranges: usize,
    calls: Arc<Calls>,
}

impl Limited {
    fn new(max_ranges: usize) -> (Self, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let provider = Self {
            inner: MemoryProvider::new(container()),
            max_ranges,
            calls: Arc::clone(&calls),
        };
        (provider, calls)
    }
}

#[async_trait]
impl ByteRangeProvider for Limited {
    async fn fetch(&self, ranges: &[ByteRange]) -> Result<Vec<Bytes>, FetchError> {
        self.calls.fetch.fetch_add(1, Ordering::SeqCst);
        if ranges.len() > self.max_ranges {
            self.calls.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(FetchError::RangesUnsupported);
        }
        self.inner.fetch(ranges).await
    }

    async fn fetch_all(&self) -> Result<Bytes, FetchError> {
        self.calls.fetch_all.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_all().await
    }
}

#[tokio::test]
async fn single_range_backend() {
    let (provider, calls) = Limited::new(1);
    let catalog = ContainerCatalog::open(provider, CatalogConfig::default()).await.unwrap();

    let obj = catalog.read_object("sub/c").await.unwrap();
    assert_eq!(obj.root_record().unwrap().get_str("fLabel"), Some("trk3"));

    assert!(calls.rejected.load(Ordering::SeqCst) >= 1);
    assert_eq!(calls.fetch_all.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn no_range_support_reads_whole_resource_once() {
    let (provider, calls) = Limited::new(0);
    let catalog = ContainerCatalog::open(provider, CatalogConfig::default()).await.unwrap();
    let after_open = calls.fetch.load(Ordering::SeqCst);

    for path in ["a", "b", "sub/c"] {
        let obj = catalog.read_object(path).await.unwrap();
        assert!(obj.is_clean(), "{path}: {:?}", obj.diagnostics);
    }

    assert_eq!(calls.fetch_all.load(Ordering::SeqCst), 1);
    assert_eq!(calls.fetch.load(Ordering::SeqCst), after_open);
}

/// Never answers within the deadline.
#[derive(Debug)]
struct Stalled;

#[async_trait]
impl ByteRangeProvider for Stalled {
    async fn fetch(&self, _: &[ByteRange]) -> Result<Vec<Bytes>, FetchError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Err(FetchError::RangesUnsupported)
    }

    async fn fetch_all(&self) -> Result<Bytes, FetchError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Bytes::new())
    }
}

#[tokio::test]
async fn stalled_backend_exhausts_attempts() {
    let config = CatalogConfig {
        retry: RetryPolicy {
            batch_size: 4,
            max_attempts: 2,
            timeout: Duration::from_millis(20),
        },
        ..CatalogConfig::default()
    };
    let err = ContainerCatalog::open(Stalled, config).await.unwrap_err();
    assert!(
        matches!(err, CatalogError::RangeFetch(FetchError::Exhausted { attempts: 2 })),
        "{err}"
    );
}

#[tokio::test]
async fn file_backend() {
    let path = std::env::temp_dir().join(format!("oxroot-provider-{}.root", std::process::id()));
    tokio::fs::write(&path, container()).await.unwrap();

    let catalog = ContainerCatalog::open(FileProvider::new(&path), CatalogConfig::default())
        .await
        .unwrap();
    let obj = catalog.read_object("b").await.unwrap();
    assert_eq!(obj.root_record().unwrap().get_str("fLabel"), Some("trk5"));

    let err = catalog
        .read_entry_bytes(&oxroot_wire::KeyHeader {
            seek_key: 1 << 40,
            ..catalog.resolve_entry("a").unwrap().clone()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::RangeFetch(_)), "{err}");

    tokio::fs::remove_file(&path).await.unwrap();
}
