#![warn(clippy::pedantic)]

pub mod builtin;
pub mod catalog;
pub mod config;
pub mod context;
pub mod decoder;
pub mod error;
pub mod fetch;
pub mod provider;
pub mod registry;
pub mod streamer;

pub use catalog::ContainerCatalog;
pub use config::{CatalogConfig, DecoderConfig, RetryPolicy};
pub use context::DecodeContext;
pub use decoder::ObjectDecoder;
pub use error::{CatalogError, DecodeError};
pub use fetch::RangeFetcher;
pub use provider::{ByteRange, ByteRangeProvider, FetchError, FileProvider, MemoryProvider};
pub use registry::{SchemaRegistry, canonical_name};
pub use streamer::{CompiledStreamer, Streamer};
