/// Implementation of `oxroot dump`.
///
/// Decodes one entry and prints it as JSON. Decode warnings go to stderr,
/// one per line, after the JSON.
///
/// # Output format
///
/// ```text
/// {
///   "$class": "TH1F",
///   "fName": "hpx",
///   "fFunctions": { "$id": 0, "$class": "TList", "arr": [] },
///   "fArray": [0.0, 12.0, 40.0]
/// }
/// ```
use std::collections::HashSet;

use anyhow::{Context, Result};
use oxroot_types::{ObjectGraph, Record, TypedArray, Value};
use serde_json::{Map, Value as Json, json};

use crate::{DumpArgs, open_catalog};

/// Run the `oxroot dump` command.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, the path does not name
/// an entry, or the entry cannot be decoded at all.
pub async fn run(args: &DumpArgs) -> Result<()> {
    let catalog = open_catalog(&args.file).await?;
    let decoded = catalog
        .read_object(&args.path)
        .await
        .with_context(|| format!("cannot decode {:?}", args.path))?;

    let json = JsonWriter::new(&decoded.graph, args.depth).value(&decoded.root, 0);
    let text = if args.compact {
        serde_json::to_string(&json)?
    } else {
        serde_json::to_string_pretty(&json)?
    };
    println!("{text}");

    for warning in &decoded.diagnostics {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

/// Converts decoded values to JSON, printing each arena object once.
///
/// The first reference to an arena slot inlines the object tagged with
/// `"$id"`; later references (and references past `max_depth`) print as
/// `{"$ref": id}`. Cycles therefore terminate.
pub struct JsonWriter<'g> {
    graph: &'g ObjectGraph,
    max_depth: usize,
    emitted: HashSet<u32>,
}

impl<'g> JsonWriter<'g> {
    pub fn new(graph: &'g ObjectGraph, max_depth: usize) -> Self {
        Self {
            graph,
            max_depth,
            emitted: HashSet::new(),
        }
    }

    pub fn value(&mut self, value: &Value, depth: usize) -> Json {
        match value {
            Value::Null => Json::Null,
            Value::Bool(b) => json!(b),
            Value::Int(v) => json!(v),
            Value::UInt(v) => json!(v),
            Value::Float(v) => json!(v),
            Value::Str(s) => json!(s),
            Value::Array(array) => typed_array(array),
            Value::List(items) => Json::Array(items.iter().map(|v| self.value(v, depth)).collect()),
            Value::Map(pairs) => Json::Array(
                pairs
                    .iter()
                    .map(|(k, v)| Json::Array(vec![self.value(k, depth), self.value(v, depth)]))
                    .collect(),
            ),
            Value::Record(rec) => Json::Object(self.record(rec, depth)),
            Value::Ref(slot) => {
                let id = slot.0;
                if depth >= self.max_depth || !self.emitted.insert(id) {
                    return json!({ "$ref": id });
                }
                let mut object = Map::new();
                object.insert("$id".into(), json!(id));
                match self.graph.get(*slot) {
                    Some(Value::Record(rec)) => object.extend(self.record(rec, depth + 1)),
                    Some(other) => {
                        let inner = self.value(other, depth + 1);
                        object.insert("$value".into(), inner);
                    }
                    None => {
                        object.insert("$value".into(), Json::Null);
                    }
                }
                Json::Object(object)
            }
        }
    }

    fn record(&mut self, rec: &Record, depth: usize) -> Map<String, Json> {
        let mut object = Map::new();
        object.insert("$class".into(), json!(rec.type_tag));
        for (name, value) in &rec.fields {
            let v = self.value(value, depth);
            object.insert(name.clone(), v);
        }
        object
    }
}

fn typed_array(array: &TypedArray) -> Json {
    match array {
        TypedArray::I8(v) => json!(v),
        TypedArray::U8(v) => json!(v),
        TypedArray::I16(v) => json!(v),
        TypedArray::U16(v) => json!(v),
        TypedArray::I32(v) => json!(v),
        TypedArray::U32(v) => json!(v),
        TypedArray::I64(v) => json!(v),
        TypedArray::U64(v) => json!(v),
        TypedArray::F32(v) => json!(v),
        TypedArray::F64(v) => json!(v),
        TypedArray::Bool(v) => json!(v),
        TypedArray::Str(v) => json!(v),
    }
}
