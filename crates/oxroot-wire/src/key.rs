use crate::codes::LARGE_KEY_VERSION;
use crate::cursor::ByteCursor;
use crate::datime::Datime;
use crate::error::WireError;
use crate::header::read_offset;

/// Header that precedes every stored entry.
///
/// ```text
/// nbytes i32 │ version i16 │ objlen i32 │ datime u32 │ keylen i16 │ cycle i16
/// seek_key, seek_pdir   (i64 when version > 1000, else i32)
/// class_name, name, title   (length-prefixed strings)
/// ```
///
/// `nbytes` counts the key header plus the stored payload; `keylen` is the
/// header alone. The payload is compressed whenever its stored size is
/// smaller than `objlen`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyHeader {
    pub nbytes: u32,
    pub version: i16,
    pub objlen: u32,
    pub datime: Datime,
    pub keylen: u16,
    pub cycle: i16,
    pub seek_key: u64,
    pub seek_pdir: u64,
    pub class_name: String,
    pub name: String,
    pub title: String,
}

impl KeyHeader {
    /// Parse a key header at the cursor's position.
    ///
    /// # Errors
    ///
    /// - [`WireError::InvalidLength`] for negative sizes or offsets.
    /// - [`WireError::OutOfBounds`] when the header is truncated.
    pub fn read(c: &mut ByteCursor<'_>) -> Result<Self, WireError> {
        let nbytes = read_len(c)?;
        let version = c.read_i16()?;
        let objlen = read_len(c)?;
        let datime = Datime(c.read_u32()?);
        let offset = c.position();
        let keylen = c.read_i16()?;
        let keylen = u16::try_from(keylen).map_err(|_| WireError::InvalidLength {
            offset,
            len: i64::from(keylen),
        })?;
        let cycle = c.read_i16()?;
        let large = version > LARGE_KEY_VERSION;
        let seek_key = read_offset(c, large)?;
        let seek_pdir = read_offset(c, large)?;
        let class_name = c.read_tstring()?;
        let name = c.read_tstring()?;
        let title = c.read_tstring()?;
        Ok(Self {
            nbytes,
            version,
            objlen,
            datime,
            keylen,
            cycle,
            seek_key,
            seek_pdir,
            class_name,
            name,
            title,
        })
    }

    /// Bytes of payload stored on disk after the header.
    #[must_use]
    pub fn stored_size(&self) -> u32 {
        self.nbytes.saturating_sub(u32::from(self.keylen))
    }

    /// True when the stored payload must be inflated to `objlen` bytes.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.stored_size() < self.objlen
    }

    /// Absolute position of the payload in the container.
    #[must_use]
    pub fn payload_offset(&self) -> u64 {
        self.seek_key + u64::from(self.keylen)
    }

    /// True for entries that hold a sub-directory.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(self.class_name.as_str(), "TDirectory" | "TDirectoryFile")
    }
}

/// Directory record stored right after a directory's own key header.
///
/// ```text
/// version i16 │ ctime u32 │ mtime u32 │ nbytes_keys i32 │ nbytes_name i32
/// seek_dir, seek_parent, seek_keys   (i64 when version > 1000, else i32)
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryHeader {
    pub version: i16,
    pub ctime: Datime,
    pub mtime: Datime,
    pub nbytes_keys: u32,
    pub nbytes_name: u32,
    pub seek_dir: u64,
    pub seek_parent: u64,
    pub seek_keys: u64,
}

impl DirectoryHeader {
    /// Smallest record: version + 2 dates + 2 sizes + 3 small offsets.
    pub const MIN_SIZE: usize = 2 + 4 + 4 + 4 + 4 + 3 * 4;

    /// Largest record, with 8-byte offsets.
    pub const MAX_SIZE: usize = 2 + 4 + 4 + 4 + 4 + 3 * 8;

    /// # Errors
    ///
    /// - [`WireError::InvalidLength`] for negative sizes or offsets.
    /// - [`WireError::OutOfBounds`] when the record is truncated.
    pub fn read(c: &mut ByteCursor<'_>) -> Result<Self, WireError> {
        let version = c.read_i16()?;
        let ctime = Datime(c.read_u32()?);
        let mtime = Datime(c.read_u32()?);
        let nbytes_keys = read_len(c)?;
        let nbytes_name = read_len(c)?;
        let large = version > LARGE_KEY_VERSION;
        let seek_dir = read_offset(c, large)?;
        let seek_parent = read_offset(c, large)?;
        let seek_keys = read_offset(c, large)?;
        Ok(Self {
            version,
            ctime,
            mtime,
            nbytes_keys,
            nbytes_name,
            seek_dir,
            seek_parent,
            seek_keys,
        })
    }
}

/// Read the list of key headers that follows a directory's keys-list key.
///
/// # Errors
///
/// Propagates header and bounds errors; a negative count is
/// [`WireError::InvalidLength`].
pub fn read_key_list(c: &mut ByteCursor<'_>) -> Result<Vec<KeyHeader>, WireError> {
    let _list_key = KeyHeader::read(c)?;
    let nkeys = read_len(c)?;
    // Each key header takes at least 26 bytes; cap the allocation by what is left.
    let mut keys = Vec::with_capacity((nkeys as usize).min(c.remaining() / 26));
    for _ in 0..nkeys {
        keys.push(KeyHeader::read(c)?);
    }
    Ok(keys)
}

fn read_len(c: &mut ByteCursor<'_>) -> Result<u32, WireError> {
    let offset = c.position();
    let value = c.read_i32()?;
    u32::try_from(value).map_err(|_| WireError::InvalidLength {
        offset,
        len: i64::from(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tstr(b: &mut Vec<u8>, s: &str) {
        b.push(u8::try_from(s.len()).unwrap());
        b.extend_from_slice(s.as_bytes());
    }

    fn key_bytes(version: i16, name: &str, cycle: i16) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&500i32.to_be_bytes());
        b.extend_from_slice(&version.to_be_bytes());
        b.extend_from_slice(&900i32.to_be_bytes());
        b.extend_from_slice(&Datime::from_parts(2020, 1, 2, 3, 4, 5).0.to_be_bytes());
        b.extend_from_slice(&60i16.to_be_bytes());
        b.extend_from_slice(&cycle.to_be_bytes());
        if version > 1000 {
            b.extend_from_slice(&7_000_000_000i64.to_be_bytes());
            b.extend_from_slice(&100i64.to_be_bytes());
        } else {
            b.extend_from_slice(&4000i32.to_be_bytes());
            b.extend_from_slice(&100i32.to_be_bytes());
        }
        tstr(&mut b, "TH1F");
        tstr(&mut b, name);
        tstr(&mut b, "a title");
        b
    }

    #[test]
    fn small_key() {
        let b = key_bytes(4, "h1", 2);
        let k = KeyHeader::read(&mut ByteCursor::new(&b)).unwrap();
        assert_eq!(k.name, "h1");
        assert_eq!(k.cycle, 2);
        assert_eq!(k.seek_key, 4000);
        assert_eq!(k.stored_size(), 440);
        assert!(k.is_compressed());
        assert_eq!(k.payload_offset(), 4060);
        assert_eq!(k.datime.to_string(), "2020-01-02 03:04:05");
    }

    #[test]
    fn large_key_uses_wide_offsets() {
        let b = key_bytes(1004, "big", 1);
        let mut c = ByteCursor::new(&b);
        let k = KeyHeader::read(&mut c).unwrap();
        assert_eq!(k.seek_key, 7_000_000_000);
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn key_list_reads_all_entries() {
        let mut b = key_bytes(4, "", 1);
        b.extend_from_slice(&2i32.to_be_bytes());
        b.extend(key_bytes(4, "a", 1));
        b.extend(key_bytes(1004, "b", 3));
        let keys = read_key_list(&mut ByteCursor::new(&b)).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[1].name, "b");
        assert_eq!(keys[1].cycle, 3);
    }

    #[test]
    fn directory_record_widths() {
        let mut b = Vec::new();
        b.extend_from_slice(&1005i16.to_be_bytes());
        b.extend_from_slice(&0u32.to_be_bytes());
        b.extend_from_slice(&0u32.to_be_bytes());
        b.extend_from_slice(&120i32.to_be_bytes());
        b.extend_from_slice(&58i32.to_be_bytes());
        b.extend_from_slice(&100i64.to_be_bytes());
        b.extend_from_slice(&0i64.to_be_bytes());
        b.extend_from_slice(&6_000_000_000i64.to_be_bytes());
        let d = DirectoryHeader::read(&mut ByteCursor::new(&b)).unwrap();
        assert_eq!(b.len(), DirectoryHeader::MAX_SIZE);
        assert_eq!(d.seek_keys, 6_000_000_000);
        assert_eq!(d.nbytes_keys, 120);
    }
}
