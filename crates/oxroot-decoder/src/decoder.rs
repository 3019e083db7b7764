use std::sync::Arc;

use oxroot_types::DecodedObject;
use oxroot_wire::ByteCursor;

use crate::config::DecoderConfig;
use crate::context::DecodeContext;
use crate::error::DecodeError;
use crate::registry::SchemaRegistry;

/// Decodes objects out of decompressed buffers using a shared schema
/// registry.
///
/// The decoder itself holds no per-buffer state: tag maps live in the
/// [`ByteCursor`] and the arena lives in the [`DecodedObject`] each call
/// returns, so one decoder serves any number of buffers.
///
/// Decoding one object proceeds in three steps:
///
///   1. **Header**: read the class preamble (for [`decode_next`]) or the
///      version record (for [`decode_named`]).
///   2. **Body**: look up the streamer for the class version, compiling
///      it from the registered schema on first use, and run it. Nested
///      pointers recurse through the same context, so shared and cyclic
///      objects resolve to one arena slot.
///   3. **Recovery**: problems inside a body with a byte count are
///      recorded as warnings in [`DecodedObject::diagnostics`] and the
///      cursor resynchronizes at the declared end.
///
/// [`decode_next`]: Self::decode_next
/// [`decode_named`]: Self::decode_named
#[derive(Clone, Debug)]
pub struct ObjectDecoder {
    registry: Arc<SchemaRegistry>,
    config: DecoderConfig,
}

impl ObjectDecoder {
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            config: DecoderConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: DecoderConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode the polymorphic object at the cursor (class header first).
    ///
    /// A null pointer decodes to a `Null` root; otherwise the root is a
    /// reference into the returned arena.
    ///
    /// # Errors
    ///
    /// Errors that could not be absorbed: truncated headers, an unknown
    /// class with no byte count, and body failures outside any byte-count
    /// window.
    pub fn decode_next(&self, cursor: &mut ByteCursor<'_>) -> Result<DecodedObject, DecodeError> {
        let mut ctx = DecodeContext::new(cursor, &self.registry, &self.config);
        let root = ctx.read_object_any()?;
        Ok(ctx.finish(root))
    }

    /// Decode an object of known class stored inline (version record
    /// first). The root is the record itself.
    ///
    /// This is how keyed entries are stored: the key names the class and
    /// the payload starts straight at the version.
    ///
    /// # Errors
    ///
    /// As for [`decode_next`](Self::decode_next), plus
    /// [`DecodeError::SchemaNotFound`] when the class is unknown and its
    /// body has no byte count.
    pub fn decode_named(&self, cursor: &mut ByteCursor<'_>, class: &str) -> Result<DecodedObject, DecodeError> {
        let mut ctx = DecodeContext::new(cursor, &self.registry, &self.config);
        let root = ctx.read_class(class)?;
        Ok(ctx.finish(root))
    }
}

#[cfg(test)]
mod tests {
    use oxroot_types::{ClassSchema, DecodeWarning, FieldKind, FieldSchema, TypedArray, Value};
    use oxroot_wire::codes::type_code;

    use super::*;

    fn versioned(version: i16, body: &[u8]) -> Vec<u8> {
        let count = u32::try_from(body.len() + 2).unwrap() | 0x4000_0000;
        let mut out = count.to_be_bytes().to_vec();
        out.extend_from_slice(&version.to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    fn decoder() -> ObjectDecoder {
        let registry = SchemaRegistry::new();
        registry.register(
            ClassSchema::new("Hits", 1)
                .with_field(FieldSchema::new("n", type_code::INT, "Int_t"))
                .with_field(
                    FieldSchema::new("e", type_code::OFFSET_P + type_code::DOUBLE, "Double_t*").with_kind(
                        FieldKind::BasicPointer {
                            count_name: "n".into(),
                            count_class: "Hits".into(),
                            count_version: 1,
                        },
                    ),
                )
                .with_field(FieldSchema::new("tag", type_code::INT, "Int_t")),
        );
        ObjectDecoder::new(Arc::new(registry))
    }

    #[test]
    fn counted_array_follows_counter() {
        let mut body = 2i32.to_be_bytes().to_vec();
        body.push(1);
        body.extend_from_slice(&1.5f64.to_be_bytes());
        body.extend_from_slice(&2.5f64.to_be_bytes());
        body.extend_from_slice(&9i32.to_be_bytes());
        let bytes = versioned(1, &body);

        let decoded = decoder().decode_named(&mut ByteCursor::new(&bytes), "Hits").unwrap();
        assert!(decoded.is_clean());
        let rec = decoded.root_record().unwrap();
        assert_eq!(rec.get("e"), Some(&Value::Array(TypedArray::F64(vec![1.5, 2.5]))));
        assert_eq!(rec.get_i64("tag"), Some(9));
    }

    #[test]
    fn failing_member_is_nulled_and_siblings_survive() {
        // n claims 100 doubles but the body holds one; the byte count
        // lets the decode skip to the end.
        let mut body = 100i32.to_be_bytes().to_vec();
        body.push(1);
        body.extend_from_slice(&1.5f64.to_be_bytes());
        let mut bytes = versioned(1, &body);
        bytes.extend_from_slice(&[0xEE; 4]);

        let mut cursor = ByteCursor::new(&bytes);
        let decoded = decoder().decode_named(&mut cursor, "Hits").unwrap();
        let rec = decoded.root_record().unwrap();
        assert_eq!(rec.get_i64("n"), Some(100));
        assert_eq!(rec.get("e"), Some(&Value::Null));
        assert_eq!(rec.get("tag"), Some(&Value::Null));
        assert_eq!(cursor.remaining(), 4);
        assert!(matches!(
            decoded.diagnostics.as_slice(),
            [DecodeWarning::FieldNulled { field, .. }] if field == "e"
        ));
    }

    #[test]
    fn null_pointer_root() {
        let bytes = 0u32.to_be_bytes();
        let decoded = decoder().decode_next(&mut ByteCursor::new(&bytes)).unwrap();
        assert!(decoded.root.is_null());
        assert!(decoded.graph.is_empty());
    }
}
