use crate::bits::BitReader;
use crate::error::DeflateError;

const MAX_BITS: usize = 15;

#[derive(Clone, Copy, Debug, Default)]
struct Entry {
    /// Symbol, or the subtable start index for a link entry.
    symbol: u16,
    /// Total code length; 0 marks an unused slot.
    len: u8,
    /// Non-zero for link entries: index width of the subtable.
    sub_bits: u8,
}

/// Canonical Huffman decoding table.
///
/// A primary table indexed by the next `primary_bits` input bits resolves
/// every short code in one lookup. Codes longer than that go through a
/// link entry into a second-level subtable sized for the longest code
/// sharing the same prefix.
///
/// ```text
///   input bits ──► primary[low P bits] ──► symbol, len
///                        │
///                        └─ link ──► sub[start + next S bits] ──► symbol, len
/// ```
#[derive(Clone, Debug)]
pub struct Huffman {
    entries: Vec<Entry>,
    primary_bits: u32,
}

impl Huffman {
    /// Build a table from per-symbol code lengths (0 = unused).
    ///
    /// Incomplete codes are accepted (a single distance code is legal);
    /// unused slots decode as [`DeflateError::InvalidSymbol`].
    ///
    /// # Errors
    ///
    /// [`DeflateError::InvalidCodeLengths`] for lengths above 15 or an
    /// over-subscribed code.
    pub fn build(lengths: &[u8], primary_bits: u32) -> Result<Self, DeflateError> {
        let mut bl_count = [0u32; MAX_BITS + 1];
        for &len in lengths {
            let len = usize::from(len);
            if len > MAX_BITS {
                return Err(DeflateError::InvalidCodeLengths);
            }
            bl_count[len] += 1;
        }
        bl_count[0] = 0;

        let mut left: i64 = 1;
        for &count in &bl_count[1..] {
            left = (left << 1) - i64::from(count);
            if left < 0 {
                return Err(DeflateError::InvalidCodeLengths);
            }
        }

        let mut next_code = [0u32; MAX_BITS + 1];
        let mut code = 0u32;
        for bits in 1..=MAX_BITS {
            code = (code + bl_count[bits - 1]) << 1;
            next_code[bits] = code;
        }

        let mut codes = Vec::with_capacity(lengths.len());
        for (symbol, &len) in lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let c = next_code[usize::from(len)];
            next_code[usize::from(len)] += 1;
            let reversed = c.reverse_bits() >> (32 - u32::from(len));
            let symbol = u16::try_from(symbol).map_err(|_| DeflateError::InvalidCodeLengths)?;
            codes.push((symbol, len, reversed));
        }

        let primary_size = 1usize << primary_bits;
        let mask = primary_size - 1;
        let mut entries = vec![Entry::default(); primary_size];

        // size each subtable for the longest code under its prefix
        let mut sub_bits = vec![0u8; primary_size];
        for &(_, len, rev) in &codes {
            if u32::from(len) > primary_bits {
                let prefix = rev as usize & mask;
                #[allow(clippy::cast_possible_truncation)]
                let extra = (u32::from(len) - primary_bits) as u8;
                sub_bits[prefix] = sub_bits[prefix].max(extra);
            }
        }
        for (prefix, &bits) in sub_bits.iter().enumerate() {
            if bits > 0 {
                let start = entries.len();
                entries.resize(start + (1 << bits), Entry::default());
                #[allow(clippy::cast_possible_truncation)]
                let link = Entry {
                    symbol: start as u16,
                    len: 0,
                    sub_bits: bits,
                };
                entries[prefix] = link;
            }
        }

        for &(symbol, len, rev) in &codes {
            let entry = Entry {
                symbol,
                len,
                sub_bits: 0,
            };
            if u32::from(len) <= primary_bits {
                let mut idx = rev as usize;
                while idx < primary_size {
                    entries[idx] = entry;
                    idx += 1 << len;
                }
            } else {
                let link = entries[rev as usize & mask];
                let start = usize::from(link.symbol);
                let extra = u32::from(len) - primary_bits;
                let mut idx = (rev >> primary_bits) as usize;
                while idx < 1 << link.sub_bits {
                    entries[start + idx] = entry;
                    idx += 1 << extra;
                }
            }
        }

        Ok(Self {
            entries,
            primary_bits,
        })
    }

    /// Decode one symbol.
    ///
    /// # Errors
    ///
    /// - [`DeflateError::InvalidSymbol`] for bits that match no code.
    /// - [`DeflateError::UnexpectedEof`] when the code runs past the input.
    #[allow(clippy::cast_possible_truncation)]
    pub fn decode(&self, br: &mut BitReader<'_>) -> Result<u16, DeflateError> {
        br.refill();
        let bits = br.peek();
        let mask = (1u64 << self.primary_bits) - 1;
        let mut entry = self.entries[(bits & mask) as usize];
        if entry.sub_bits > 0 {
            let sub_mask = (1u64 << entry.sub_bits) - 1;
            let idx = usize::from(entry.symbol) + ((bits >> self.primary_bits) & sub_mask) as usize;
            entry = self.entries[idx];
        }
        if entry.len == 0 {
            return Err(DeflateError::InvalidSymbol);
        }
        br.consume(u32::from(entry.len))?;
        Ok(entry.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversubscribed_is_rejected() {
        assert_eq!(
            Huffman::build(&[1, 1, 1], 9).unwrap_err(),
            DeflateError::InvalidCodeLengths
        );
    }

    #[test]
    fn long_codes_use_subtables() {
        // 16 symbols: one of length 1, then 2..=15, and a second 15 to complete the code
        let mut lengths: Vec<u8> = (1..=15).collect();
        lengths.push(15);
        let table = Huffman::build(&lengths, 4).unwrap();

        // symbol 15 has canonical code 0b111111111111111 (15 ones)
        let data = [0xFF, 0x7F];
        let mut br = BitReader::new(&data);
        assert_eq!(table.decode(&mut br).unwrap(), 15);

        // symbol 0 has code 0
        let mut br = BitReader::new(&[0x00]);
        assert_eq!(table.decode(&mut br).unwrap(), 0);
    }
}
