use oxroot_inflate::InflateError;
use oxroot_types::SchemaError;
use oxroot_wire::WireError;

use crate::provider::FetchError;

/// Errors that abort decoding of one object.
///
/// Most problems inside an object never reach this type: a field that
/// fails inside a byte-count window is nulled, recorded as a
/// [`DecodeWarning`](oxroot_types::DecodeWarning), and decoding resumes at
/// the window end. What remains are failures with nowhere to resync to.
///
/// Error hierarchy:
///
/// ```text
///   DecodeError
///   ├── Wire(WireError)        ← read past the buffer end, bad string length
///   ├── Inflate(InflateError)  ← payload could not be decompressed
///   ├── Schema(SchemaError)    ← a schema record could not be converted
///   ├── SchemaNotFound         ← no streamer and no byte count to skip by
///   ├── Corrupt                ← impossible count, ceiling exceeded
///   └── Unsupported            ← layout the decoder cannot express
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Inflate(#[from] InflateError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A class with no known layout appeared where its length is unknown,
    /// so its bytes cannot be skipped.
    #[error("no schema for class {class} version {version}")]
    SchemaNotFound { class: String, version: i32 },

    /// The data contradicts itself: a negative length, a counter that was
    /// never read, a container larger than the configured ceiling.
    #[error("corrupt {context}: {reason}")]
    Corrupt { context: String, reason: String },

    #[error("unsupported: {what}")]
    Unsupported { what: String },
}

impl DecodeError {
    pub(crate) fn corrupt(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// True for errors an enclosing byte-count window can absorb.
    ///
    /// Running off the end of a window, a bad count, or an unknown class
    /// all leave the cursor somewhere inside the object; seeking to the
    /// declared end puts it back in step.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Wire(e) => e.is_out_of_bounds() || matches!(e, WireError::InvalidLength { .. }),
            Self::Corrupt { .. } | Self::SchemaNotFound { .. } | Self::Unsupported { .. } => true,
            Self::Inflate(_) | Self::Schema(_) => false,
        }
    }
}

/// Errors raised while opening a container or reading one of its entries.
///
/// ```text
///   CatalogError
///   ├── CorruptContainer       ← header, directory or key list unreadable
///   ├── EntryNotFound          ← no key with that name (and cycle)
///   ├── NotADirectory          ← a path component is not a directory key
///   ├── RangeFetch(FetchError) ← the provider failed after retries
///   ├── Inflate(InflateError)  ← entry payload failed to decompress
///   └── Decode(DecodeError)    ← entry payload failed to decode
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("corrupt container ({context}): {source}")]
    CorruptContainer {
        context: &'static str,
        #[source]
        source: WireError,
    },

    #[error("no entry named {name}")]
    EntryNotFound { name: String },

    #[error("{name} is a {class}, not a directory")]
    NotADirectory { name: String, class: String },

    #[error("range fetch failed: {0}")]
    RangeFetch(#[from] FetchError),

    #[error(transparent)]
    Inflate(#[from] InflateError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl CatalogError {
    pub(crate) fn corrupt(context: &'static str) -> impl FnOnce(WireError) -> Self {
        move |source| Self::CorruptContainer { context, source }
    }
}
