#![warn(clippy::pedantic)]

pub mod error;
pub mod graph;
pub mod schema;
pub mod typename;
pub mod value;
pub mod warning;

pub use error::SchemaError;
pub use graph::{DecodedObject, ObjectGraph};
pub use schema::{ClassSchema, FieldKind, FieldSchema, FloatRange};
pub use value::{Record, Value};
pub use warning::DecodeWarning;

pub use oxroot_wire::{ObjectRef, TypedArray};
