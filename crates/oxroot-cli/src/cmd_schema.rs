/// Implementation of `oxroot schema`.
///
/// # Output format
///
/// ```text
/// class Track v3 (checksum 0x1a2b3c4d)
///   base   TObject v1
///   [ 5]   Float_t          fPx
///   [ 9]   Double32_t       fE  range [0, 100] factor 655.36
///   [48]   Double_t*        fHits       counter fN
/// ```
use anyhow::{Result, bail};
use oxroot_decoder::canonical_name;
use oxroot_types::{ClassSchema, FieldKind, FieldSchema};

use crate::{SchemaArgs, open_catalog};

/// Run the `oxroot schema` command.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, or if `--class` names a
/// class the file has no schema for.
pub async fn run(args: &SchemaArgs) -> Result<()> {
    let catalog = open_catalog(&args.file).await?;
    let wanted = args.class.as_deref().map(canonical_name);

    let mut shown = 0usize;
    for schema in catalog.list_schema_catalog() {
        if let Some(class) = &wanted
            && canonical_name(&schema.class_name) != *class
        {
            continue;
        }
        print_schema(schema);
        shown += 1;
    }

    if shown == 0
        && let Some(class) = &args.class
    {
        bail!("no schema for class {class:?}");
    }
    Ok(())
}

fn print_schema(schema: &ClassSchema) {
    println!(
        "class {} v{} (checksum 0x{:08x})",
        schema.class_name, schema.version, schema.checksum
    );
    for field in &schema.fields {
        println!("  {}", describe(field));
    }
}

fn describe(field: &FieldSchema) -> String {
    if let FieldKind::Base { base_version } = field.kind {
        return format!("base   {} v{base_version}", field.name);
    }
    let dims: String = field
        .max_index
        .iter()
        .take(usize::try_from(field.array_dim).unwrap_or(0))
        .map(|d| format!("[{d}]"))
        .collect();
    let mut line = format!("[{:>2}]   {:<16} {}{dims}", field.type_code, field.type_name, field.name);
    match &field.kind {
        FieldKind::BasicPointer { count_name, .. } | FieldKind::Loop { count_name, .. } => {
            line.push_str(&format!("  counter {count_name}"));
        }
        FieldKind::Stl { stl_type, ctype } => line.push_str(&format!("  stl {stl_type}/{ctype}")),
        _ => {}
    }
    if let Some(range) = &field.range {
        if range.factor > 0.0 {
            line.push_str(&format!("  range [{}, {}] factor {}", range.xmin, range.xmax, range.factor));
        } else {
            line.push_str(&format!("  mantissa {} bits", range.mantissa_bits()));
        }
    }
    line
}
