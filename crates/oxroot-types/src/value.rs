use oxroot_wire::{ObjectRef, TypedArray};

/// One decoded value.
///
/// Records embedded by value live inline; everything reached through a
/// pointer is stored once in the [`ObjectGraph`](crate::ObjectGraph) and
/// referenced with [`Value::Ref`], which is how shared and cyclic
/// structures stay finite.
///
/// ```text
/// ┌──────────┬─────────────────────────────────────────────┐
/// │ Variant  │ Produced by                                 │
/// ├──────────┼─────────────────────────────────────────────┤
/// │ Null     │ null pointer, nulled field, skipped member  │
/// │ Bool     │ Bool                                        │
/// │ Int      │ Char/Short/Int/Long/Long64/Counter          │
/// │ UInt     │ UChar/UShort/UInt/ULong/ULong64/Bits        │
/// │ Float    │ Float/Double/Double32/Float16               │
/// │ Str      │ TString, std::string, char*                 │
/// │ Array    │ fixed or counted scalar arrays, TArray*     │
/// │ List     │ sequential containers, arrays of records    │
/// │ Map      │ map/multimap                                │
/// │ Record   │ embedded object                             │
/// │ Ref      │ polymorphic pointer into the object arena   │
/// └──────────┴─────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Array(TypedArray),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Record(Box<Record>),
    Ref(ObjectRef),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view of `Int`, `UInt` (when it fits) and `Bool`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) => u64::try_from(*v).ok(),
            Self::Bool(b) => Some(u64::from(*b)),
            _ => None,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object_ref(&self) -> Option<ObjectRef> {
        match self {
            Self::Ref(r) => Some(*r),
            _ => None,
        }
    }

    /// Short variant name, for diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Array(_) => "array",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
            Self::Ref(_) => "ref",
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Record(Box::new(record))
    }
}

/// A decoded object: its class name plus fields in stream order.
///
/// Base-class members are streamed into the same record, so a `TNamed`
/// record carries `fUniqueID`, `fBits`, `fName` and `fTitle` side by side.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    pub type_tag: String,
    pub fields: Vec<(String, Value)>,
}

impl Record {
    #[must_use]
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.iter_mut().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Insert or overwrite `name`. Overwriting keeps the original position.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.get_mut(&name) {
            Some(slot) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    #[must_use]
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }
}
