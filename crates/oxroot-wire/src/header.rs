use crate::codes::LARGE_FILE_VERSION;
use crate::cursor::ByteCursor;
use crate::error::WireError;

/// Container signature: ASCII "root".
pub const ROOT_MAGIC: [u8; 4] = *b"root";

/// Bytes fetched up front to parse the header in either offset width.
pub const HEADER_PREFIX_SIZE: usize = 64;

/// Fixed header at offset 0 of every container.
///
/// ```text
/// ┌────────┬─────────────┬──────────────────────────────────────────┐
/// │ Offset │ Size        │ Field                                    │
/// ├────────┼─────────────┼──────────────────────────────────────────┤
/// │ 0x00   │ 4           │ magic "root"                             │
/// │ 0x04   │ 4           │ version                                  │
/// │ 0x08   │ 4           │ begin (first key)                        │
/// │ 0x0C   │ 4 or 8      │ end                                      │
/// │        │ 4 or 8      │ seek_free                                │
/// │        │ 4           │ nbytes_free                              │
/// │        │ 4           │ nfree                                    │
/// │        │ 4           │ nbytes_name                              │
/// │        │ 1           │ units (4 or 8)                           │
/// │        │ 4           │ compress                                 │
/// │        │ 4 or 8      │ seek_info (schema catalog key)           │
/// │        │ 4           │ nbytes_info                              │
/// └────────┴─────────────┴──────────────────────────────────────────┘
/// ```
///
/// Offsets are 8 bytes wide when `version >= 1_000_000`; the real format
/// version is then `version - 1_000_000`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerHeader {
    pub version: i32,
    pub begin: u64,
    pub end: u64,
    pub seek_free: u64,
    pub nbytes_free: u32,
    pub nfree: u32,
    pub nbytes_name: u32,
    pub units: u8,
    pub compress: u32,
    pub seek_info: u64,
    pub nbytes_info: u32,
}

impl ContainerHeader {
    /// True when the file stores 8-byte offsets.
    #[must_use]
    pub fn is_large(&self) -> bool {
        self.version >= LARGE_FILE_VERSION
    }

    /// Format version with the large-file bias removed.
    #[must_use]
    pub fn format_version(&self) -> i32 {
        if self.is_large() {
            self.version - LARGE_FILE_VERSION
        } else {
            self.version
        }
    }

    /// Parse the header from the start of `buf`.
    ///
    /// # Errors
    ///
    /// - [`WireError::InvalidMagic`] if the buffer does not start with "root".
    /// - [`WireError::OutOfBounds`] if the buffer is shorter than the header.
    /// - [`WireError::InvalidLength`] if `begin` or `end` is negative.
    pub fn read_from(buf: &[u8]) -> Result<Self, WireError> {
        let mut c = ByteCursor::new(buf);
        let magic = c.read_bytes(4)?;
        if magic != ROOT_MAGIC {
            let mut found = [0u8; 4];
            found.copy_from_slice(magic);
            return Err(WireError::InvalidMagic { found });
        }

        let version = c.read_i32()?;
        let begin = read_offset(&mut c, false)?;
        let large = version >= LARGE_FILE_VERSION;
        let end = read_offset(&mut c, large)?;
        let seek_free = read_offset(&mut c, large)?;
        let nbytes_free = c.read_u32()?;
        let nfree = c.read_u32()?;
        let nbytes_name = c.read_u32()?;
        let units = c.read_u8()?;
        let compress = c.read_u32()?;
        let seek_info = read_offset(&mut c, large)?;
        let nbytes_info = c.read_u32()?;

        Ok(Self {
            version,
            begin,
            end,
            seek_free,
            nbytes_free,
            nfree,
            nbytes_name,
            units,
            compress,
            seek_info,
            nbytes_info,
        })
    }
}

/// Read a 4- or 8-byte signed offset and reject negative values.
///
/// # Errors
///
/// [`WireError::InvalidLength`] for negative offsets; bounds errors from the
/// cursor otherwise.
pub fn read_offset(c: &mut ByteCursor<'_>, large: bool) -> Result<u64, WireError> {
    let offset = c.position();
    let value = if large {
        c.read_i64()?
    } else {
        i64::from(c.read_i32()?)
    };
    u64::try_from(value).map_err(|_| WireError::InvalidLength { offset, len: value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_header() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(b"root");
        b.extend_from_slice(&62_206i32.to_be_bytes());
        b.extend_from_slice(&100i32.to_be_bytes());
        b.extend_from_slice(&5000i32.to_be_bytes());
        b.extend_from_slice(&4900i32.to_be_bytes());
        b.extend_from_slice(&60i32.to_be_bytes());
        b.extend_from_slice(&1i32.to_be_bytes());
        b.extend_from_slice(&58i32.to_be_bytes());
        b.push(4);
        b.extend_from_slice(&101i32.to_be_bytes());
        b.extend_from_slice(&3000i32.to_be_bytes());
        b.extend_from_slice(&800i32.to_be_bytes());
        b.resize(HEADER_PREFIX_SIZE, 0);
        b
    }

    #[test]
    fn parses_small_offsets() {
        let h = ContainerHeader::read_from(&small_header()).unwrap();
        assert!(!h.is_large());
        assert_eq!(h.begin, 100);
        assert_eq!(h.end, 5000);
        assert_eq!(h.units, 4);
        assert_eq!(h.compress, 101);
        assert_eq!(h.seek_info, 3000);
        assert_eq!(h.nbytes_info, 800);
    }

    #[test]
    fn parses_large_offsets() {
        let mut b = Vec::new();
        b.extend_from_slice(b"root");
        b.extend_from_slice(&1_062_206i32.to_be_bytes());
        b.extend_from_slice(&100i32.to_be_bytes());
        b.extend_from_slice(&5_000_000_000i64.to_be_bytes());
        b.extend_from_slice(&4_999_000_000i64.to_be_bytes());
        b.extend_from_slice(&60i32.to_be_bytes());
        b.extend_from_slice(&1i32.to_be_bytes());
        b.extend_from_slice(&58i32.to_be_bytes());
        b.push(8);
        b.extend_from_slice(&0i32.to_be_bytes());
        b.extend_from_slice(&4_900_000_000i64.to_be_bytes());
        b.extend_from_slice(&800i32.to_be_bytes());
        let h = ContainerHeader::read_from(&b).unwrap();
        assert!(h.is_large());
        assert_eq!(h.format_version(), 62_206);
        assert_eq!(h.end, 5_000_000_000);
        assert_eq!(h.seek_info, 4_900_000_000);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut b = small_header();
        b[0] = b'R';
        assert!(matches!(
            ContainerHeader::read_from(&b),
            Err(WireError::InvalidMagic { found }) if &found == b"Root"
        ));
    }

    #[test]
    fn short_buffer_is_out_of_bounds() {
        let b = small_header();
        assert!(ContainerHeader::read_from(&b[..20]).unwrap_err().is_out_of_bounds());
    }
}
