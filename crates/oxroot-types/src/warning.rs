use std::fmt;

/// A recoverable problem absorbed during a decode.
///
/// None of these abort the decode: the affected field (or object) is
/// nulled or skipped and decoding continues with its siblings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeWarning {
    /// The cursor ended a versioned object away from its declared end.
    ByteCountMismatch {
        class: String,
        expected: usize,
        actual: usize,
    },
    /// No schema for the class; its bytes were skipped.
    SchemaNotFound { class: String, version: i32 },
    /// A field read failed inside a byte-count window and was nulled.
    FieldNulled {
        class: String,
        field: String,
        reason: String,
    },
    /// A field could not be compiled to a read operation.
    UnsupportedField {
        class: String,
        field: String,
        type_code: i32,
    },
    /// A class version outside the accepted range.
    VersionOutOfRange { class: String, version: i32 },
    /// A container declared more elements than the configured ceiling.
    CollectionTooLarge {
        field: String,
        count: u64,
        ceiling: u64,
    },
    /// A pointer referred to an object tag never seen in this buffer.
    UnknownObjectTag { tag: u32 },
    /// A class back-reference to a tag never registered.
    UnknownClassTag { tag: u32 },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByteCountMismatch {
                class,
                expected,
                actual,
            } => write!(
                f,
                "{class}: byte count mismatch, expected end {expected}, cursor at {actual}"
            ),
            Self::SchemaNotFound { class, version } => {
                write!(f, "{class} v{version}: no schema, object skipped")
            }
            Self::FieldNulled {
                class,
                field,
                reason,
            } => write!(f, "{class}::{field} nulled: {reason}"),
            Self::UnsupportedField {
                class,
                field,
                type_code,
            } => write!(f, "{class}::{field}: unsupported type code {type_code}"),
            Self::VersionOutOfRange { class, version } => {
                write!(f, "{class}: version {version} out of range")
            }
            Self::CollectionTooLarge {
                field,
                count,
                ceiling,
            } => write!(f, "{field}: {count} elements exceeds ceiling {ceiling}"),
            Self::UnknownObjectTag { tag } => write!(f, "unknown object tag {tag}"),
            Self::UnknownClassTag { tag } => write!(f, "unknown class tag {tag}"),
        }
    }
}
