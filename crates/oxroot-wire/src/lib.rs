#![warn(clippy::pedantic)]
//! Low-level reading of the container's wire format.
//!
//! Everything here is big-endian and synchronous. The [`ByteCursor`] owns
//! position, byte-count windows, and the object/class reference maps for
//! one decompressed buffer; the header types parse the fixed records that
//! index a container.

pub mod array;
pub mod codes;
pub mod cursor;
pub mod datime;
pub mod error;
pub mod header;
pub mod key;

pub use array::{ArrayKind, TypedArray};
pub use cursor::{ByteCursor, ClassHeader, ClassRef, ObjectRef, VersionToken};
pub use datime::Datime;
pub use error::WireError;
pub use header::{ContainerHeader, HEADER_PREFIX_SIZE, ROOT_MAGIC};
pub use key::{DirectoryHeader, KeyHeader, read_key_list};
