use crate::error::Lz4Error;

const MIN_MATCH: usize = 4;

/// Decode one LZ4 block, appending to `out`.
///
/// ```text
/// token: [literal len : 4][match len - 4 : 4]
///   literal len 15  → add following bytes until one is < 255
///   literals
///   offset: u16 little-endian (absent after the last literals)
///   match len 15+4  → add following bytes until one is < 255
/// ```
///
/// Matches may only reach bytes written by this call. `limit` is the
/// largest `out.len()` the block may reach.
///
/// # Errors
///
/// Any [`Lz4Error`]; `out` may hold partial output afterwards.
pub fn decompress(input: &[u8], out: &mut Vec<u8>, limit: usize) -> Result<(), Lz4Error> {
    let start = out.len();
    let mut i = 0;
    while i < input.len() {
        let token = input[i];
        i += 1;

        let mut literals = usize::from(token >> 4);
        if literals == 15 {
            literals += read_extended(input, &mut i)?;
        }
        let end = i
            .checked_add(literals)
            .filter(|&e| e <= input.len())
            .ok_or(Lz4Error::TruncatedInput { offset: i })?;
        if out.len() + literals > limit {
            return Err(Lz4Error::OutputOverflow { limit });
        }
        out.extend_from_slice(&input[i..end]);
        i = end;

        // the last sequence carries literals only
        if i >= input.len() {
            break;
        }

        let Some(bytes) = input.get(i..i + 2) else {
            return Err(Lz4Error::TruncatedInput { offset: i });
        };
        let distance = usize::from(u16::from_le_bytes([bytes[0], bytes[1]]));
        if distance == 0 {
            return Err(Lz4Error::ZeroOffset { offset: i });
        }
        i += 2;
        let available = out.len() - start;
        if distance > available {
            return Err(Lz4Error::OffsetBeyondOutput {
                distance,
                available,
            });
        }

        let mut len = usize::from(token & 0x0F);
        if len == 15 {
            len += read_extended(input, &mut i)?;
        }
        len += MIN_MATCH;
        if out.len() + len > limit {
            return Err(Lz4Error::OutputOverflow { limit });
        }
        let from = out.len() - distance;
        for k in 0..len {
            let b = out[from + k];
            out.push(b);
        }
    }
    Ok(())
}

fn read_extended(input: &[u8], i: &mut usize) -> Result<usize, Lz4Error> {
    let mut total = 0usize;
    loop {
        let byte = *input.get(*i).ok_or(Lz4Error::TruncatedInput { offset: *i })?;
        *i += 1;
        total += usize::from(byte);
        if byte != 255 {
            return Ok(total);
        }
    }
}
