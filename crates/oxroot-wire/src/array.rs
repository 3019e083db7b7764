use crate::codes::type_code;
use crate::error::WireError;

/// Element type of a flat array read.
///
/// Each kind maps to one fixed-width big-endian element reader. Strings
/// are the one variable-width kind: each element is a length-prefixed
/// string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Bool,
    Str,
}

impl ArrayKind {
    /// Map a scalar type code to its flat-array element kind.
    ///
    /// # Errors
    ///
    /// [`WireError::UnsupportedArrayType`] for the two reduced-precision
    /// float codes and for anything that is not a scalar or string code.
    pub fn from_type_code(code: i32) -> Result<Self, WireError> {
        let kind = match code {
            type_code::CHAR | type_code::LEGACY_CHAR => Self::I8,
            type_code::UCHAR => Self::U8,
            type_code::SHORT => Self::I16,
            type_code::USHORT => Self::U16,
            type_code::INT | type_code::COUNTER => Self::I32,
            type_code::UINT | type_code::BITS => Self::U32,
            type_code::LONG | type_code::LONG64 => Self::I64,
            type_code::ULONG | type_code::ULONG64 => Self::U64,
            type_code::FLOAT => Self::F32,
            type_code::DOUBLE => Self::F64,
            type_code::BOOL => Self::Bool,
            type_code::TSTRING => Self::Str,
            _ => return Err(WireError::UnsupportedArrayType { code }),
        };
        Ok(kind)
    }

    /// Element width in bytes, or `None` for strings.
    #[must_use]
    pub fn width(self) -> Option<usize> {
        match self {
            Self::I8 | Self::U8 | Self::Bool => Some(1),
            Self::I16 | Self::U16 => Some(2),
            Self::I32 | Self::U32 | Self::F32 => Some(4),
            Self::I64 | Self::U64 | Self::F64 => Some(8),
            Self::Str => None,
        }
    }
}

/// A homogeneous array decoded from the wire.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedArray {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl TypedArray {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::I8(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::Bool(v) => v.len(),
            Self::Str(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element kind this array was read with.
    #[must_use]
    pub fn kind(&self) -> ArrayKind {
        match self {
            Self::I8(_) => ArrayKind::I8,
            Self::U8(_) => ArrayKind::U8,
            Self::I16(_) => ArrayKind::I16,
            Self::U16(_) => ArrayKind::U16,
            Self::I32(_) => ArrayKind::I32,
            Self::U32(_) => ArrayKind::U32,
            Self::I64(_) => ArrayKind::I64,
            Self::U64(_) => ArrayKind::U64,
            Self::F32(_) => ArrayKind::F32,
            Self::F64(_) => ArrayKind::F64,
            Self::Bool(_) => ArrayKind::Bool,
            Self::Str(_) => ArrayKind::Str,
        }
    }

    /// Element `index` widened to `f64`, for numeric arrays.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        match self {
            Self::I8(v) => v.get(index).map(|&x| f64::from(x)),
            Self::U8(v) => v.get(index).map(|&x| f64::from(x)),
            Self::I16(v) => v.get(index).map(|&x| f64::from(x)),
            Self::U16(v) => v.get(index).map(|&x| f64::from(x)),
            Self::I32(v) => v.get(index).map(|&x| f64::from(x)),
            Self::U32(v) => v.get(index).map(|&x| f64::from(x)),
            Self::I64(v) => v.get(index).map(|&x| x as f64),
            Self::U64(v) => v.get(index).map(|&x| x as f64),
            Self::F32(v) => v.get(index).map(|&x| f64::from(x)),
            Self::F64(v) => v.get(index).copied(),
            Self::Bool(v) => v.get(index).map(|&x| if x { 1.0 } else { 0.0 }),
            Self::Str(_) => None,
        }
    }

    /// Split into consecutive chunks of `size` elements.
    ///
    /// Used to reshape a flat fixed-size array into its declared
    /// dimensions. A trailing partial chunk is kept.
    #[must_use]
    pub fn chunks(&self, size: usize) -> Vec<TypedArray> {
        fn split<T: Clone>(v: &[T], size: usize, wrap: fn(Vec<T>) -> TypedArray) -> Vec<TypedArray> {
            v.chunks(size.max(1)).map(|c| wrap(c.to_vec())).collect()
        }
        match self {
            Self::I8(v) => split(v, size, Self::I8),
            Self::U8(v) => split(v, size, Self::U8),
            Self::I16(v) => split(v, size, Self::I16),
            Self::U16(v) => split(v, size, Self::U16),
            Self::I32(v) => split(v, size, Self::I32),
            Self::U32(v) => split(v, size, Self::U32),
            Self::I64(v) => split(v, size, Self::I64),
            Self::U64(v) => split(v, size, Self::U64),
            Self::F32(v) => split(v, size, Self::F32),
            Self::F64(v) => split(v, size, Self::F64),
            Self::Bool(v) => split(v, size, Self::Bool),
            Self::Str(v) => split(v, size, Self::Str),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduced_float_codes_are_rejected() {
        assert!(matches!(
            ArrayKind::from_type_code(type_code::DOUBLE32),
            Err(WireError::UnsupportedArrayType { code: 9 })
        ));
        assert!(matches!(
            ArrayKind::from_type_code(type_code::FLOAT16),
            Err(WireError::UnsupportedArrayType { code: 19 })
        ));
    }

    #[test]
    fn counter_reads_as_int() {
        assert_eq!(ArrayKind::from_type_code(type_code::COUNTER).unwrap(), ArrayKind::I32);
        assert_eq!(ArrayKind::from_type_code(type_code::BITS).unwrap(), ArrayKind::U32);
    }

    #[test]
    fn chunks_keep_partial_tail() {
        let arr = TypedArray::I32(vec![1, 2, 3, 4, 5]);
        let parts = arr.chunks(2);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2], TypedArray::I32(vec![5]));
    }
}
