/// Implementation of `oxroot inflate`.
///
/// Fetches one entry's payload, decompresses it, and writes the raw bytes
/// to `-o` or prints a hex dump:
///
/// ```text
/// hpx;1: 1398 stored → 4721 bytes
/// 00000000  40 00 12 6d 00 08 40 00  00 2a 00 01 00 01 00 00
/// ```
use std::fs;

use anyhow::{Context, Result};

use crate::{InflateArgs, open_catalog};

/// Run the `oxroot inflate` command.
///
/// # Errors
///
/// Returns an error if the entry cannot be found, fetched or inflated, or
/// the output file cannot be written.
pub async fn run(args: &InflateArgs) -> Result<()> {
    let catalog = open_catalog(&args.file).await?;
    let key = catalog
        .locate(&args.path)
        .await
        .with_context(|| format!("cannot find {:?}", args.path))?;
    let payload = catalog
        .read_entry_bytes(&key)
        .await
        .with_context(|| format!("cannot read payload of {:?}", args.path))?;

    eprintln!(
        "{};{}: {} stored → {} bytes",
        key.name,
        key.cycle,
        key.stored_size(),
        payload.len()
    );

    match &args.output {
        Some(out) => fs::write(out, &payload).with_context(|| format!("cannot write {}", out.display()))?,
        None => {
            for (i, chunk) in payload.chunks(16).enumerate() {
                println!("{:08x}  {}", i * 16, spaced_hex(chunk));
            }
        }
    }
    Ok(())
}

fn spaced_hex(chunk: &[u8]) -> String {
    let encoded = hex::encode(chunk);
    let mut out = String::with_capacity(encoded.len() * 3 / 2 + 1);
    for (i, pair) in encoded.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        if i == 8 {
            out.push(' ');
        }
        out.push(char::from(pair[0]));
        out.push(char::from(pair[1]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_line_splits_after_eight_bytes() {
        let line = spaced_hex(&[0u8, 1, 2, 3, 4, 5, 6, 7, 0xab, 0xcd]);
        assert_eq!(line, "00 01 02 03 04 05 06 07  ab cd");
    }
}
