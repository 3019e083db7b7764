/// Implementation of `oxroot ls`.
///
/// # Output format
///
/// ```text
/// File: format 62206, 3 keys, 12 schemas
/// TH1F        hpx;1        4721 → 1398   2021-07-14 09:05:59  "This is the px distribution"
/// TDirectory  run1;1         94 →   94   2021-07-14 09:05:59  ""
/// ```
///
/// With `-r`, sub-directory contents follow their parent, indented by
/// directory path.
use anyhow::{Context, Result};
use oxroot_wire::KeyHeader;

use crate::{LsArgs, open_catalog};

/// Run the `oxroot ls` command.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a directory on the
/// path is missing or unreadable.
pub async fn run(args: &LsArgs) -> Result<()> {
    let catalog = open_catalog(&args.file).await?;
    let header = catalog.header();

    let keys = catalog
        .list(&args.dir)
        .await
        .with_context(|| format!("cannot list directory {:?}", args.dir))?;
    println!(
        "File: format {}, {} key{}, {} schemas",
        header.format_version(),
        keys.len(),
        if keys.len() == 1 { "" } else { "s" },
        catalog.list_schema_catalog().len()
    );

    // Depth-first without async recursion: (directory path, keys).
    let mut pending = vec![(args.dir.trim_matches('/').to_string(), keys)];
    while let Some((dir, keys)) = pending.pop() {
        if !dir.is_empty() && dir != args.dir.trim_matches('/') {
            println!("{dir}/");
        }
        let mut children = Vec::new();
        for key in &keys {
            print_key(key);
            if args.recursive && key.is_directory() {
                let path = if dir.is_empty() { key.name.clone() } else { format!("{dir}/{}", key.name) };
                let sub = catalog
                    .list(&path)
                    .await
                    .with_context(|| format!("cannot list directory {path:?}"))?;
                children.push((path, sub));
            }
        }
        pending.extend(children.into_iter().rev());
    }
    Ok(())
}

fn print_key(key: &KeyHeader) {
    let name = format!("{};{}", key.name, key.cycle);
    println!(
        "{:<12}{:<16}{:>8} → {:<8}{}  {:?}",
        key.class_name,
        name,
        key.objlen,
        key.stored_size(),
        key.datime,
        key.title
    );
}
