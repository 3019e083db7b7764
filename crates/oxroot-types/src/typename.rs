//! Parsing of C++-style type names as they appear in schemas.
//!
//! Class schemas name member types as text (`Double_t`, `vector<int>`,
//! `map<string,TH1F*>`). The helpers here map those names onto wire type
//! codes and container kinds, and split template arguments.

use oxroot_wire::ArrayKind;
use oxroot_wire::codes::{stl, type_code};

/// Map a basic type name to its wire type code.
///
/// Returns `None` for class names and anything that is not a scalar.
#[must_use]
pub fn type_code_from_name(name: &str) -> Option<i32> {
    let code = match name.trim() {
        "bool" | "Bool_t" => type_code::BOOL,
        "char" | "Char_t" | "signed char" | "int8_t" => type_code::CHAR,
        "Color_t" | "Style_t" | "Width_t" | "short" | "Short_t" | "int16_t" => type_code::SHORT,
        "int" | "Int_t" | "EErrorType" | "int32_t" => type_code::INT,
        "long" | "Long_t" => type_code::LONG,
        "float" | "Float_t" => type_code::FLOAT,
        "double" | "Double_t" => type_code::DOUBLE,
        "unsigned char" | "UChar_t" | "uint8_t" => type_code::UCHAR,
        "unsigned short" | "UShort_t" | "uint16_t" => type_code::USHORT,
        "unsigned" | "unsigned int" | "UInt_t" | "uint32_t" => type_code::UINT,
        "unsigned long" | "ULong_t" => type_code::ULONG,
        "long long" | "Long64_t" | "int64_t" => type_code::LONG64,
        "unsigned long long" | "ULong64_t" | "uint64_t" => type_code::ULONG64,
        "Double32_t" => type_code::DOUBLE32,
        "Float16_t" => type_code::FLOAT16,
        "char*" | "const char*" | "const Char_t*" => type_code::CHAR_STAR,
        _ => return None,
    };
    Some(code)
}

/// Strip `std::` qualifiers and normalise spacing around template brackets.
///
/// `std::vector<std::string >` becomes `vector<string>`.
#[must_use]
pub fn normalize(name: &str) -> String {
    let stripped = name.trim().replace("std::", "");
    let mut out = String::with_capacity(stripped.len());
    for ch in stripped.chars() {
        if ch == '>' || ch == ',' {
            while out.ends_with(' ') {
                out.pop();
            }
        }
        if ch == ' ' && (out.ends_with('<') || out.ends_with(',')) {
            continue;
        }
        out.push(ch);
    }
    out
}

/// Split `base<arg1,arg2>` into its base name and top-level arguments.
///
/// Nested brackets are respected, so `map<int,vector<double> >` gives
/// `("map", ["int", "vector<double>"])`. Returns `None` for names with no
/// template arguments.
#[must_use]
pub fn template_arguments(name: &str) -> Option<(String, Vec<String>)> {
    let name = normalize(name);
    let open = name.find('<')?;
    let close = name.rfind('>')?;
    if close <= open {
        return None;
    }
    let base = name[..open].trim().to_string();
    let inner = &name[open + 1..close];

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in inner.chars() {
        match ch {
            '<' => {
                depth += 1;
                current.push(ch);
            }
            '>' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        args.push(current.trim().to_string());
    }
    Some((base, args))
}

/// Container kind for a template base name. Unordered containers map onto
/// their ordered counterparts since the wire layout is the same.
#[must_use]
pub fn stl_kind(base: &str) -> Option<i32> {
    let kind = match normalize(base).as_str() {
        "vector" | "ROOT::VecOps::RVec" => stl::VECTOR,
        "list" => stl::LIST,
        "deque" => stl::DEQUE,
        "map" | "unordered_map" => stl::MAP,
        "multimap" | "unordered_multimap" => stl::MULTIMAP,
        "set" | "unordered_set" => stl::SET,
        "multiset" | "unordered_multiset" => stl::MULTISET,
        "bitset" => stl::BITSET,
        _ => return None,
    };
    Some(kind)
}

/// Collapse the unordered container codes onto the ordered ones.
#[must_use]
pub fn ordered_stl_kind(kind: i32) -> i32 {
    match kind {
        stl::UNORDERED_SET => stl::SET,
        stl::UNORDERED_MULTISET => stl::MULTISET,
        stl::UNORDERED_MAP => stl::MAP,
        stl::UNORDERED_MULTIMAP => stl::MULTIMAP,
        other => other,
    }
}

/// True for the class names read as a bare length-prefixed string.
#[must_use]
pub fn is_string_class(name: &str) -> bool {
    matches!(name, "TString" | "string" | "std::string")
}

/// Element kind for the `TArray*` family, which stream as count + data.
#[must_use]
pub fn tarray_kind(name: &str) -> Option<ArrayKind> {
    let kind = match name {
        "TArrayC" => ArrayKind::I8,
        "TArrayS" => ArrayKind::I16,
        "TArrayI" => ArrayKind::I32,
        "TArrayL" | "TArrayL64" => ArrayKind::I64,
        "TArrayF" => ArrayKind::F32,
        "TArrayD" => ArrayKind::F64,
        _ => return None,
    };
    Some(kind)
}

/// A pointer type name (`TH1*`) with the star removed.
#[must_use]
pub fn strip_pointer(name: &str) -> Option<&str> {
    name.trim().strip_suffix('*').map(str::trim_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_names() {
        assert_eq!(type_code_from_name("Double_t"), Some(type_code::DOUBLE));
        assert_eq!(type_code_from_name("unsigned int"), Some(type_code::UINT));
        assert_eq!(type_code_from_name("Long64_t"), Some(type_code::LONG64));
        assert_eq!(type_code_from_name("TH1F"), None);
    }

    #[test]
    fn nested_template_arguments() {
        let (base, args) = template_arguments("std::map<int,std::vector<double> >").unwrap();
        assert_eq!(base, "map");
        assert_eq!(args, vec!["int".to_string(), "vector<double>".to_string()]);
        assert!(template_arguments("TNamed").is_none());
    }

    #[test]
    fn normalize_spacing() {
        assert_eq!(normalize("std::vector<std::string >"), "vector<string>");
        assert_eq!(normalize("pair<int, float>"), "pair<int,float>");
    }

    #[test]
    fn unordered_maps_onto_ordered() {
        assert_eq!(stl_kind("std::unordered_map"), Some(stl::MAP));
        assert_eq!(ordered_stl_kind(stl::UNORDERED_SET), stl::SET);
        assert_eq!(stl_kind("TList"), None);
    }

    #[test]
    fn pointer_and_array_names() {
        assert_eq!(strip_pointer("TH1 *"), Some("TH1"));
        assert_eq!(tarray_kind("TArrayL64"), Some(ArrayKind::I64));
        assert!(is_string_class("std::string"));
    }
}
