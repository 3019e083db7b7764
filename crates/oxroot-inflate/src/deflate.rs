use once_cell::sync::Lazy;

use crate::bits::BitReader;
use crate::error::DeflateError;
use crate::huffman::Huffman;

/// Largest back-reference distance DEFLATE allows.
pub const WINDOW_SIZE: usize = 32 * 1024;

const LITERAL_PRIMARY_BITS: u32 = 9;
const DISTANCE_PRIMARY_BITS: u32 = 6;
const CODE_LENGTH_PRIMARY_BITS: u32 = 7;

const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];
const LENGTH_EXTRA: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];
const DIST_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];
const DIST_EXTRA: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];
const CODE_LENGTH_ORDER: [usize; 19] = [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];

/// Fixed literal/length and distance tables, built on first use.
static FIXED: Lazy<Result<(Huffman, Huffman), DeflateError>> = Lazy::new(|| {
    let mut lit = [0u8; 288];
    lit[..144].fill(8);
    lit[144..256].fill(9);
    lit[256..280].fill(7);
    lit[280..].fill(8);
    let dist = [5u8; 30];
    Ok((
        Huffman::build(&lit, LITERAL_PRIMARY_BITS)?,
        Huffman::build(&dist, DISTANCE_PRIMARY_BITS)?,
    ))
});

/// Decode one raw DEFLATE stream, appending to `out`.
///
/// Back-references may only reach bytes written by this call, so several
/// independent streams can share one output buffer. `limit` is the
/// largest `out.len()` the stream may reach.
///
/// Returns the number of input bytes consumed.
///
/// # Errors
///
/// Any [`DeflateError`]; `out` may hold partial output afterwards.
pub fn inflate(input: &[u8], out: &mut Vec<u8>, limit: usize) -> Result<usize, DeflateError> {
    let start = out.len();
    let mut br = BitReader::new(input);
    loop {
        let last = br.bits(1)? == 1;
        match br.bits(2)? {
            0 => stored(&mut br, out, limit)?,
            1 => {
                let (lit, dist) = FIXED.as_ref().map_err(Clone::clone)?;
                codes(&mut br, out, start, limit, lit, dist)?;
            }
            2 => {
                let (lit, dist) = dynamic_tables(&mut br)?;
                codes(&mut br, out, start, limit, &lit, &dist)?;
            }
            other => return Err(DeflateError::InvalidBlockType(other)),
        }
        if last {
            break;
        }
    }
    Ok(br.bytes_consumed())
}

fn stored(br: &mut BitReader<'_>, out: &mut Vec<u8>, limit: usize) -> Result<(), DeflateError> {
    let header = br.take_bytes(4)?;
    let len = u16::from_le_bytes([header[0], header[1]]);
    let nlen = u16::from_le_bytes([header[2], header[3]]);
    if len != !nlen {
        return Err(DeflateError::StoredLengthMismatch { len, nlen });
    }
    if out.len() + usize::from(len) > limit {
        return Err(DeflateError::OutputOverflow { limit });
    }
    out.extend_from_slice(br.take_bytes(usize::from(len))?);
    Ok(())
}

fn dynamic_tables(br: &mut BitReader<'_>) -> Result<(Huffman, Huffman), DeflateError> {
    let hlit = br.bits(5)? as usize + 257;
    let hdist = br.bits(5)? as usize + 1;
    let hclen = br.bits(4)? as usize + 4;

    let mut cl_lengths = [0u8; 19];
    for &idx in &CODE_LENGTH_ORDER[..hclen] {
        cl_lengths[idx] = bits_u8(br, 3)?;
    }
    let cl = Huffman::build(&cl_lengths, CODE_LENGTH_PRIMARY_BITS)?;

    let total = hlit + hdist;
    let mut lengths: Vec<u8> = Vec::with_capacity(total);
    while lengths.len() < total {
        let (value, repeat) = match cl.decode(br)? {
            sym @ 0..=15 => (u8::try_from(sym).map_err(|_| DeflateError::InvalidSymbol)?, 1),
            16 => {
                let prev = *lengths.last().ok_or(DeflateError::InvalidCodeLengths)?;
                (prev, 3 + br.bits(2)? as usize)
            }
            17 => (0, 3 + br.bits(3)? as usize),
            18 => (0, 11 + br.bits(7)? as usize),
            _ => return Err(DeflateError::InvalidSymbol),
        };
        if lengths.len() + repeat > total {
            return Err(DeflateError::InvalidCodeLengths);
        }
        lengths.extend(std::iter::repeat_n(value, repeat));
    }
    if lengths[256] == 0 {
        return Err(DeflateError::InvalidCodeLengths);
    }

    let lit = Huffman::build(&lengths[..hlit], LITERAL_PRIMARY_BITS)?;
    let dist = Huffman::build(&lengths[hlit..], DISTANCE_PRIMARY_BITS)?;
    Ok((lit, dist))
}

fn codes(
    br: &mut BitReader<'_>,
    out: &mut Vec<u8>,
    start: usize,
    limit: usize,
    lit: &Huffman,
    dist: &Huffman,
) -> Result<(), DeflateError> {
    loop {
        let symbol = lit.decode(br)?;
        match symbol {
            0..=255 => {
                if out.len() >= limit {
                    return Err(DeflateError::OutputOverflow { limit });
                }
                let byte = u8::try_from(symbol).map_err(|_| DeflateError::InvalidSymbol)?;
                out.push(byte);
            }
            256 => return Ok(()),
            257..=285 => {
                let i = usize::from(symbol - 257);
                let len = usize::from(LENGTH_BASE[i]) + br.bits(u32::from(LENGTH_EXTRA[i]))? as usize;
                let d = usize::from(dist.decode(br)?);
                if d >= DIST_BASE.len() {
                    return Err(DeflateError::InvalidSymbol);
                }
                let distance = usize::from(DIST_BASE[d]) + br.bits(u32::from(DIST_EXTRA[d]))? as usize;
                let available = (out.len() - start).min(WINDOW_SIZE);
                if distance > available {
                    return Err(DeflateError::DistanceTooFar {
                        distance,
                        available,
                    });
                }
                if out.len() + len > limit {
                    return Err(DeflateError::OutputOverflow { limit });
                }
                // byte-by-byte: source and destination may overlap
                let from = out.len() - distance;
                for k in 0..len {
                    let b = out[from + k];
                    out.push(b);
                }
            }
            _ => return Err(DeflateError::InvalidSymbol),
        }
    }
}

fn bits_u8(br: &mut BitReader<'_>, n: u32) -> Result<u8, DeflateError> {
    u8::try_from(br.bits(n)?).map_err(|_| DeflateError::InvalidCodeLengths)
}
