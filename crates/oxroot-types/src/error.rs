/// Errors raised while turning a decoded schema record into a
/// [`ClassSchema`](crate::ClassSchema).
///
/// ```text
/// ┌────────────────────────────────────────────────────────┐
/// │ SchemaError                                            │
/// │   ├── NotASchema     the record is not a TStreamerInfo │
/// │   ├── MissingField   a required member is absent       │
/// │   └── InvalidRange   a [min,max,nbits] title is broken │
/// └────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("record of class {found} is not a schema")]
    NotASchema { found: String },

    #[error("{class}: missing field {field}")]
    MissingField { class: String, field: &'static str },

    #[error("cannot parse range from element title {title:?}")]
    InvalidRange { title: String },
}
