use crate::error::DeflateError;

/// LSB-first bit reader with a 64-bit refill buffer.
///
/// DEFLATE packs fields starting at the least significant bit of each
/// byte. Up to 56 bits are kept buffered so a Huffman lookup can peek a
/// full code (plus subtable bits) without touching the input again.
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    buf: u64,
    count: u32,
}

impl<'a> BitReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            buf: 0,
            count: 0,
        }
    }

    /// Top up the buffer from the input.
    pub fn refill(&mut self) {
        while self.count <= 56 {
            let Some(&byte) = self.data.get(self.pos) else {
                break;
            };
            self.buf |= u64::from(byte) << self.count;
            self.pos += 1;
            self.count += 8;
        }
    }

    /// Buffered bits, zero-padded past the end of input.
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.buf
    }

    /// Drop `n` buffered bits.
    ///
    /// # Errors
    ///
    /// [`DeflateError::UnexpectedEof`] when fewer than `n` bits remain.
    pub fn consume(&mut self, n: u32) -> Result<(), DeflateError> {
        if n > self.count {
            return Err(DeflateError::UnexpectedEof);
        }
        self.buf >>= n;
        self.count -= n;
        Ok(())
    }

    /// Read an `n`-bit field (n <= 32).
    ///
    /// # Errors
    ///
    /// [`DeflateError::UnexpectedEof`] at end of input.
    #[allow(clippy::cast_possible_truncation)]
    pub fn bits(&mut self, n: u32) -> Result<u32, DeflateError> {
        if n == 0 {
            return Ok(0);
        }
        self.refill();
        let value = (self.buf & ((1u64 << n) - 1)) as u32;
        self.consume(n)?;
        Ok(value)
    }

    /// Skip to the next byte boundary.
    pub fn align(&mut self) {
        let r = self.count % 8;
        self.buf >>= r;
        self.count -= r;
    }

    /// Read `n` whole bytes starting at the next byte boundary.
    ///
    /// # Errors
    ///
    /// [`DeflateError::UnexpectedEof`] when the input is too short.
    pub fn take_bytes(&mut self, n: usize) -> Result<&'a [u8], DeflateError> {
        self.align();
        // hand buffered whole bytes back to the input
        self.pos -= (self.count / 8) as usize;
        self.buf = 0;
        self.count = 0;
        let end = self.pos.checked_add(n).filter(|&e| e <= self.data.len());
        let end = end.ok_or(DeflateError::UnexpectedEof)?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Input bytes consumed so far, rounding partial bytes up.
    #[must_use]
    pub fn bytes_consumed(&self) -> usize {
        self.pos - (self.count / 8) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_lsb_first() {
        let mut br = BitReader::new(&[0b1010_1101, 0xFF]);
        assert_eq!(br.bits(1).unwrap(), 1);
        assert_eq!(br.bits(2).unwrap(), 0b10);
        assert_eq!(br.bits(5).unwrap(), 0b10101);
        assert_eq!(br.bits(8).unwrap(), 0xFF);
        assert_eq!(br.bits(1), Err(DeflateError::UnexpectedEof));
    }

    #[test]
    fn take_bytes_after_partial_byte() {
        let mut br = BitReader::new(&[0x01, 0xAA, 0xBB, 0xCC]);
        br.bits(3).unwrap();
        assert_eq!(br.take_bytes(2).unwrap(), &[0xAA, 0xBB]);
        assert_eq!(br.bytes_consumed(), 3);
        assert_eq!(br.bits(8).unwrap(), 0xCC);
    }
}
