use std::f64::consts::PI;

use oxroot_wire::TypedArray;
use oxroot_wire::codes::{stl, tag, type_code};

use crate::error::SchemaError;
use crate::graph::ObjectGraph;
use crate::value::{Record, Value};

/// Range of a reduced-precision float member.
///
/// When `factor` is non-zero values are stored as `u32` and decoded as
/// `raw / factor + xmin`. With a zero factor, `xmin` holds the mantissa
/// width used by the truncated-float encoding instead.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FloatRange {
    pub xmin: f64,
    pub xmax: f64,
    pub factor: f64,
}

impl FloatRange {
    /// Range for `nbits` bits spread over `[xmin, xmax]`.
    #[must_use]
    pub fn scaled(xmin: f64, xmax: f64, nbits: u32) -> Self {
        let bigint = if nbits < 32 {
            f64::from(1u32 << nbits)
        } else {
            f64::from(u32::MAX)
        };
        let mut range = Self {
            xmin,
            xmax,
            factor: 0.0,
        };
        if xmin < xmax {
            range.factor = bigint / (xmax - xmin);
        } else if nbits < 15 {
            range.xmin = f64::from(nbits);
        }
        range
    }

    /// Range selecting the truncated-float encoding with `nbits` mantissa bits.
    #[must_use]
    pub fn truncated(nbits: u32) -> Self {
        Self {
            xmin: f64::from(nbits),
            xmax: 0.0,
            factor: 0.0,
        }
    }

    /// Mantissa width for the truncated-float encoding (12 when unset).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn mantissa_bits(&self) -> u32 {
        match self.xmin.round() {
            n if n >= 1.0 && n <= 23.0 => n as u32,
            _ => 12,
        }
    }
}

/// Extra information carried by specialised schema elements.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FieldKind {
    #[default]
    Plain,
    /// Ancestor class streamed into the same record.
    Base { base_version: i32 },
    /// Array whose length is the sibling counter `count_name`.
    BasicPointer {
        count_name: String,
        count_class: String,
        count_version: i32,
    },
    /// Loop over `count_name` objects.
    Loop {
        count_name: String,
        count_class: String,
        count_version: i32,
    },
    /// STL-style container.
    Stl { stl_type: i32, ctype: i32 },
    StlString,
}

/// One member of a class schema.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub title: String,
    pub type_code: i32,
    pub size: i32,
    pub array_length: i32,
    pub array_dim: i32,
    pub max_index: [i32; 5],
    pub type_name: String,
    pub kind: FieldKind,
    pub range: Option<FloatRange>,
}

impl FieldSchema {
    #[must_use]
    pub fn new(name: impl Into<String>, type_code: i32, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: String::new(),
            type_code,
            size: 0,
            array_length: 0,
            array_dim: 0,
            max_index: [0; 5],
            type_name: type_name.into(),
            kind: FieldKind::Plain,
            range: None,
        }
    }

    /// Ancestor class `class_name` at `version`.
    #[must_use]
    pub fn base(class_name: impl Into<String>, version: i32) -> Self {
        let class_name = class_name.into();
        let mut field = Self::new(class_name.clone(), type_code::BASE, "BASE");
        field.title = class_name;
        field.kind = FieldKind::Base {
            base_version: version,
        };
        field
    }

    /// Fixed inline array with the given dimensions.
    #[must_use]
    pub fn with_dims(mut self, dims: &[i32]) -> Self {
        self.array_dim = i32::try_from(dims.len().min(5)).unwrap_or(5);
        self.array_length = dims.iter().product();
        for (slot, d) in self.max_index.iter_mut().zip(dims) {
            *slot = *d;
        }
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_range(mut self, range: FloatRange) -> Self {
        self.range = Some(range);
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// True for `BASE` elements.
    #[must_use]
    pub fn is_base(&self) -> bool {
        matches!(self.kind, FieldKind::Base { .. }) || self.type_name == "BASE"
    }

    /// Counter sibling name for counted arrays and loops.
    #[must_use]
    pub fn count_name(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::BasicPointer { count_name, .. } | FieldKind::Loop { count_name, .. } => {
                Some(count_name)
            }
            _ => None,
        }
    }

    /// Build a field from a decoded schema element record.
    ///
    /// Applies the fix-ups older writers need: a `UChar` declared as
    /// `Bool_t` is a bool, a range hidden in the title is parsed when the
    /// element's range bit is set, and set/multimap kinds recorded under
    /// the wrong code are corrected from the type name.
    ///
    /// # Errors
    ///
    /// [`SchemaError::MissingField`] when `fName` or `fType` is absent and
    /// [`SchemaError::InvalidRange`] for a malformed range title.
    pub fn from_record(rec: &Record) -> Result<Self, SchemaError> {
        let missing = |field| SchemaError::MissingField {
            class: rec.type_tag.clone(),
            field,
        };
        let name = rec.get_str("fName").ok_or_else(|| missing("fName"))?;
        let code = rec.get_i64("fType").ok_or_else(|| missing("fType"))?;
        let mut field = Self::new(name, int(code), rec.get_str("fTypeName").unwrap_or_default());
        field.title = rec.get_str("fTitle").unwrap_or_default().to_string();
        field.size = int(rec.get_i64("fSize").unwrap_or(0));
        field.array_length = int(rec.get_i64("fArrayLength").unwrap_or(0));
        field.array_dim = int(rec.get_i64("fArrayDim").unwrap_or(0));
        if let Some(Value::Array(TypedArray::I32(dims))) = rec.get("fMaxIndex") {
            for (slot, d) in field.max_index.iter_mut().zip(dims) {
                *slot = *d;
            }
        }

        if field.type_code == type_code::UCHAR && matches!(field.type_name.as_str(), "Bool_t" | "bool") {
            field.type_code = type_code::BOOL;
        }

        if let Some(factor) = rec.get_f64("fFactor") {
            field.range = Some(FloatRange {
                xmin: rec.get_f64("fXmin").unwrap_or(0.0),
                xmax: rec.get_f64("fXmax").unwrap_or(0.0),
                factor,
            });
        } else if rec
            .get("fBits")
            .and_then(Value::as_u64)
            .is_some_and(|bits| bits & u64::from(tag::HAS_RANGE) != 0)
        {
            field.range = parse_title_range(&field.title, field.type_code)?;
        }

        field.kind = match rec.type_tag.as_str() {
            "TStreamerBase" => FieldKind::Base {
                base_version: int(rec.get_i64("fBaseVersion").unwrap_or(-1)),
            },
            "TStreamerBasicPointer" | "TStreamerLoop" => {
                let count_name = rec.get_str("fCountName").unwrap_or_default().to_string();
                let count_class = rec.get_str("fCountClass").unwrap_or_default().to_string();
                let count_version = int(rec.get_i64("fCountVersion").unwrap_or(0));
                if rec.type_tag == "TStreamerLoop" {
                    FieldKind::Loop {
                        count_name,
                        count_class,
                        count_version,
                    }
                } else {
                    FieldKind::BasicPointer {
                        count_name,
                        count_class,
                        count_version,
                    }
                }
            }
            "TStreamerSTL" => {
                let mut stl_type = int(rec.get_i64("fSTLtype").unwrap_or(0));
                let tn = field.type_name.trim_start_matches("std::");
                if stl_type == stl::MULTIMAP && tn.starts_with("set") {
                    stl_type = stl::SET;
                }
                if stl_type == stl::SET && tn.starts_with("multimap") {
                    stl_type = stl::MULTIMAP;
                }
                FieldKind::Stl {
                    stl_type,
                    ctype: int(rec.get_i64("fCtype").unwrap_or(0)),
                }
            }
            "TStreamerSTLstring" => FieldKind::StlString,
            _ => FieldKind::Plain,
        };
        Ok(field)
    }
}

/// Schema of one class version as recorded in a file.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassSchema {
    pub class_name: String,
    pub version: i32,
    pub checksum: u32,
    pub fields: Vec<FieldSchema>,
}

impl ClassSchema {
    #[must_use]
    pub fn new(class_name: impl Into<String>, version: i32) -> Self {
        Self {
            class_name: class_name.into(),
            version,
            checksum: 0,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_checksum(mut self, checksum: u32) -> Self {
        self.checksum = checksum;
        self
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Convert a decoded `TStreamerInfo` record.
    ///
    /// Elements are looked up through `graph` since the element list and
    /// each element are stored as references.
    ///
    /// # Errors
    ///
    /// [`SchemaError::NotASchema`] for other record classes; element
    /// errors from [`FieldSchema::from_record`].
    pub fn from_record(rec: &Record, graph: &ObjectGraph) -> Result<Self, SchemaError> {
        if rec.type_tag != "TStreamerInfo" {
            return Err(SchemaError::NotASchema {
                found: rec.type_tag.clone(),
            });
        }
        let class_name = rec.get_str("fName").ok_or_else(|| SchemaError::MissingField {
            class: rec.type_tag.clone(),
            field: "fName",
        })?;
        let mut schema = Self::new(class_name, int(rec.get_i64("fClassVersion").unwrap_or(0)));
        schema.checksum = rec
            .get("fCheckSum")
            .and_then(Value::as_u64)
            .and_then(|c| u32::try_from(c).ok())
            .unwrap_or(0);

        let items = rec
            .get("fElements")
            .and_then(|v| graph.record(v))
            .and_then(|list| list.get("arr"))
            .and_then(Value::as_list)
            .unwrap_or_default();
        for item in items {
            if let Some(elem) = graph.record(item) {
                schema.fields.push(FieldSchema::from_record(elem)?);
            }
        }
        Ok(schema)
    }
}

/// Parse the `[xmin,xmax(,nbits)]` range hidden in an element title.
///
/// For counted arrays (type codes past the pointer offset) the first
/// bracket holds the dimension and the range is the second one. Titles
/// without a range give `Ok(None)`.
///
/// # Errors
///
/// [`SchemaError::InvalidRange`] when the bracket holds fewer than two
/// values or a value is not a number or `pi` expression.
pub fn parse_title_range(title: &str, type_code: i32) -> Result<Option<FloatRange>, SchemaError> {
    let Some(mut open) = title.find('[') else {
        return Ok(None);
    };
    if type_code > type_code::OFFSET_P {
        match title[open + 1..].find('[') {
            Some(next) => open += next + 1,
            None => return Ok(None),
        }
    }
    let Some(close) = title[open + 1..].find(']').map(|c| c + open + 1) else {
        return Ok(None);
    };
    if close < open + 2 {
        return Ok(None);
    }

    let invalid = || SchemaError::InvalidRange {
        title: title.to_string(),
    };
    let parts: Vec<&str> = title[open + 1..close].split(',').collect();
    if parts.len() < 2 {
        return Err(invalid());
    }
    let mut nbits = 32;
    if let Some(n) = parts.get(2) {
        nbits = n.trim().parse::<u32>().unwrap_or(32);
    }
    if !(2..=32).contains(&nbits) {
        nbits = 32;
    }
    let xmin = parse_bound(parts[0]).ok_or_else(invalid)?;
    let xmax = parse_bound(parts[1]).ok_or_else(invalid)?;
    Ok(Some(FloatRange::scaled(xmin, xmax, nbits)))
}

fn parse_bound(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(0.0);
    }
    if !text.contains("pi") {
        return text.parse().ok();
    }
    let (sign, body) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest.trim()),
        None => (1.0, text),
    };
    let value = match body {
        "2pi" | "2*pi" | "twopi" => 2.0 * PI,
        "pi/2" => PI / 2.0,
        "pi/4" => PI / 4.0,
        _ => PI,
    };
    Some(sign * value)
}

#[allow(clippy::cast_possible_truncation)]
fn int(v: i64) -> i32 {
    v as i32
}
