//! Whole-container fixtures.
//!
//! ```text
//!   0     header ("root", version, begin, end, …, seek_info, nbytes_info)
//!   100   top directory key + name/title + directory record
//!         entries: key header + stored payload, sub-directories inline
//!         schema catalog key (TList of TStreamerInfo)
//!         keys lists, innermost directories first
//! ```
//!
//! Offsets are 4 bytes wide in keys and directory records; the header
//! can be written in either width.

use std::fmt;
use std::sync::Arc;

use oxroot_types::ClassSchema;
use oxroot_wire::Datime;
use oxroot_wire::codes::LARGE_FILE_VERSION;

use crate::compress::{Compression, MAX_BLOCK, pack};
use crate::schema::write_schema_catalog;
use crate::writer::BufferWriter;

const BEGIN: usize = 100;
const FORMAT_VERSION: i32 = 62_206;
const KEY_VERSION: i16 = 4;
const DIR_VERSION: i16 = 5;
/// Directory record size with 4-byte offsets.
const DIR_RECORD: usize = 2 + 4 + 4 + 4 + 4 + 3 * 4;

/// Writes an entry payload, starting at its version record.
pub type BodyFn = Arc<dyn Fn(&mut BufferWriter) + Send + Sync>;

/// One entry of a fixture directory.
#[derive(Clone)]
pub enum Entry {
    Object {
        name: String,
        cycle: i16,
        class: String,
        /// Run with the tag offset of the entry's final key header.
        body: BodyFn,
    },
    Raw {
        name: String,
        cycle: i16,
        class: String,
        payload: Vec<u8>,
    },
    Directory(Directory),
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object { name, cycle, class, .. } | Self::Raw { name, cycle, class, .. } => {
                write!(f, "{class} {name};{cycle}")
            }
            Self::Directory(dir) => write!(f, "{dir:?}"),
        }
    }
}

/// A fixture directory: a name and its entries.
#[derive(Clone, Debug, Default)]
pub struct Directory {
    pub name: String,
    pub entries: Vec<Entry>,
}

impl Directory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Add an object whose payload `body` writes starting at the version record.
    #[must_use]
    pub fn object(
        mut self,
        name: &str,
        cycle: i16,
        class: &str,
        body: impl Fn(&mut BufferWriter) + Send + Sync + 'static,
    ) -> Self {
        self.entries.push(Entry::Object {
            name: name.into(),
            cycle,
            class: class.into(),
            body: Arc::new(body),
        });
        self
    }

    /// Add an entry whose uncompressed payload is given verbatim.
    #[must_use]
    pub fn raw(mut self, name: &str, cycle: i16, class: &str, payload: Vec<u8>) -> Self {
        self.entries.push(Entry::Raw {
            name: name.into(),
            cycle,
            class: class.into(),
            payload,
        });
        self
    }

    #[must_use]
    pub fn directory(mut self, dir: Directory) -> Self {
        self.entries.push(Entry::Directory(dir));
        self
    }
}

/// Builds a complete container in memory.
#[derive(Clone, Debug)]
pub struct ContainerBuilder {
    top: Directory,
    schemas: Vec<ClassSchema>,
    compression: Compression,
    block_size: usize,
    large_header: bool,
    schema_catalog: bool,
    keys_list: bool,
}

impl ContainerBuilder {
    pub fn new(top: Directory) -> Self {
        Self {
            top,
            schemas: Vec::new(),
            compression: Compression::None,
            block_size: MAX_BLOCK,
            large_header: false,
            schema_catalog: true,
            keys_list: true,
        }
    }

    #[must_use]
    pub fn schema(mut self, schema: ClassSchema) -> Self {
        self.schemas.push(schema);
        self
    }

    #[must_use]
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Split compressed payloads into blocks of this many input bytes.
    #[must_use]
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Write the header with 8-byte offsets.
    #[must_use]
    pub fn large_header(mut self) -> Self {
        self.large_header = true;
        self
    }

    /// Leave the header's schema catalog offset and length at zero.
    #[must_use]
    pub fn without_schema_catalog(mut self) -> Self {
        self.schema_catalog = false;
        self
    }

    /// Leave the top directory's keys list offset and length at zero.
    #[must_use]
    pub fn without_keys_list(mut self) -> Self {
        self.keys_list = false;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut file = FileWriter {
            buf: vec![0u8; BEGIN],
            compression: self.compression,
            block_size: self.block_size,
        };

        // Top directory key: header, then name and title, then the record.
        let top_name = self.top.name.clone();
        let mut named = BufferWriter::new();
        named.tstring(&top_name).tstring("");
        let top_key = KeyMeta::new("TFile", &top_name, 1);
        let keylen = top_key.keylen();
        let nbytes_name = keylen + named.len();
        let top_record = BEGIN + nbytes_name;
        let nbytes = nbytes_name + DIR_RECORD;
        file.key_header(&top_key, nbytes, nbytes, BEGIN, 0);
        file.buf.extend_from_slice(named.as_slice());
        file.directory_record(BEGIN, 0);

        let (seek_keys, nbytes_keys) = file.write_directory(&self.top, BEGIN);
        if self.keys_list {
            patch_directory(&mut file.buf, top_record, seek_keys, nbytes_keys);
        }

        // An empty schema list is still written: readers require the record.
        let (seek_info, nbytes_info) = if self.schema_catalog {
            let key = KeyMeta::new("TList", "StreamerInfo", 1);
            let mut w = BufferWriter::with_tag_offset(len_u32(key.keylen()));
            write_schema_catalog(&mut w, &self.schemas);
            file.entry(&key, &w.into_inner(), BEGIN)
        } else {
            (0, 0)
        };

        let end = file.buf.len();
        let header = self.header(end, nbytes_name, seek_info, nbytes_info);
        file.buf[..header.len()].copy_from_slice(&header);
        file.buf
    }

    fn header(&self, end: usize, nbytes_name: usize, seek_info: usize, nbytes_info: usize) -> Vec<u8> {
        let mut w = BufferWriter::new();
        w.bytes(b"root");
        if self.large_header {
            w.i32(FORMAT_VERSION + LARGE_FILE_VERSION);
            w.i32(offset_i32(BEGIN));
            w.i64(offset_i64(end)).i64(offset_i64(end));
        } else {
            w.i32(FORMAT_VERSION);
            w.i32(offset_i32(BEGIN));
            w.i32(offset_i32(end)).i32(offset_i32(end));
        }
        w.u32(0).u32(0).u32(len_u32(nbytes_name));
        w.u8(if self.large_header { 8 } else { 4 });
        w.u32(compression_setting(self.compression));
        if self.large_header {
            w.i64(offset_i64(seek_info));
        } else {
            w.i32(offset_i32(seek_info));
        }
        w.u32(len_u32(nbytes_info));
        w.into_inner()
    }
}

/// Algorithm times 100 plus a level, as headers record it.
fn compression_setting(compression: Compression) -> u32 {
    match compression {
        Compression::None => 0,
        Compression::Zlib | Compression::LegacyDeflate => 101,
        Compression::Lz4 => 404,
        Compression::Zstd => 505,
    }
}

struct KeyMeta {
    class: String,
    name: String,
    cycle: i16,
}

impl KeyMeta {
    fn new(class: &str, name: &str, cycle: i16) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            cycle,
        }
    }

    /// Fixed fields plus the three strings (empty title).
    fn keylen(&self) -> usize {
        4 + 2 + 4 + 4 + 2 + 2 + 4 + 4 + (1 + self.class.len()) + (1 + self.name.len()) + 1
    }
}

struct FileWriter {
    buf: Vec<u8>,
    compression: Compression,
    block_size: usize,
}

fn key_header_bytes(key: &KeyMeta, nbytes: usize, objlen: usize, seek_key: usize, seek_pdir: usize) -> Vec<u8> {
    let mut w = BufferWriter::new();
    w.i32(offset_i32(nbytes))
        .i16(KEY_VERSION)
        .i32(offset_i32(objlen))
        .u32(Datime::from_parts(2024, 3, 1, 12, 0, 0).0)
        .i16(i16::try_from(key.keylen()).unwrap_or(i16::MAX))
        .i16(key.cycle)
        .i32(offset_i32(seek_key))
        .i32(offset_i32(seek_pdir))
        .tstring(&key.class)
        .tstring(&key.name)
        .tstring("");
    debug_assert_eq!(w.len(), key.keylen());
    w.into_inner()
}

impl FileWriter {
    fn key_header(&mut self, key: &KeyMeta, nbytes: usize, objlen: usize, seek_key: usize, seek_pdir: usize) {
        self.buf.extend(key_header_bytes(key, nbytes, objlen, seek_key, seek_pdir));
    }

    /// Write a key and its (possibly compressed) payload at the end.
    /// Returns the key position and its total size.
    fn entry(&mut self, key: &KeyMeta, payload: &[u8], seek_pdir: usize) -> (usize, usize) {
        let stored = pack(self.compression, payload, self.block_size);
        let seek_key = self.buf.len();
        let nbytes = key.keylen() + stored.len();
        self.key_header(key, nbytes, payload.len(), seek_key, seek_pdir);
        self.buf.extend(stored);
        (seek_key, nbytes)
    }

    /// Directory record with the keys list still to be patched.
    fn directory_record(&mut self, seek_dir: usize, seek_parent: usize) {
        let mut w = BufferWriter::new();
        let date = Datime::from_parts(2024, 3, 1, 12, 0, 0).0;
        w.i16(DIR_VERSION)
            .u32(date)
            .u32(date)
            .i32(0)
            .i32(0)
            .i32(offset_i32(seek_dir))
            .i32(offset_i32(seek_parent))
            .i32(0);
        self.buf.extend(w.into_inner());
    }

    /// Write every entry of `dir`, then its keys list. Returns the keys
    /// list position and size.
    fn write_directory(&mut self, dir: &Directory, seek_dir: usize) -> (usize, usize) {
        let mut keys: Vec<(KeyMeta, usize, usize, usize)> = Vec::new();
        for entry in &dir.entries {
            match entry {
                Entry::Object {
                    name,
                    cycle,
                    class,
                    body,
                } => {
                    let key = KeyMeta::new(class, name, *cycle);
                    let mut w = BufferWriter::with_tag_offset(len_u32(key.keylen()));
                    body(&mut w);
                    let payload = w.into_inner();
                    let (seek, nbytes) = self.entry(&key, &payload, seek_dir);
                    keys.push((key, seek, nbytes, payload.len()));
                }
                Entry::Raw {
                    name,
                    cycle,
                    class,
                    payload,
                } => {
                    let key = KeyMeta::new(class, name, *cycle);
                    let (seek, nbytes) = self.entry(&key, payload, seek_dir);
                    keys.push((key, seek, nbytes, payload.len()));
                }
                Entry::Directory(sub) => {
                    let key = KeyMeta::new("TDirectory", &sub.name, 1);
                    let seek = self.buf.len();
                    let nbytes = key.keylen() + DIR_RECORD;
                    self.key_header(&key, nbytes, DIR_RECORD, seek, seek_dir);
                    let record = self.buf.len();
                    self.directory_record(seek, seek_dir);
                    let (sub_keys, sub_nbytes) = self.write_directory(sub, seek);
                    patch_directory(&mut self.buf, record, sub_keys, sub_nbytes);
                    keys.push((key, seek, nbytes, DIR_RECORD));
                }
            }
        }

        let list_key = KeyMeta::new("TDirectory", &dir.name, 1);
        let mut headers = Vec::new();
        for (key, seek, nbytes, objlen) in &keys {
            headers.extend(key_header_bytes(key, *nbytes, *objlen, *seek, seek_dir));
        }
        let seek_keys = self.buf.len();
        let nbytes_keys = list_key.keylen() + 4 + headers.len();
        self.key_header(&list_key, nbytes_keys, nbytes_keys - list_key.keylen(), seek_keys, seek_dir);
        self.buf.extend_from_slice(&i32::try_from(keys.len()).unwrap_or(i32::MAX).to_be_bytes());
        self.buf.extend(headers);
        (seek_keys, nbytes_keys)
    }
}

/// Fill in `nbytes_keys` and `seek_keys` of the directory record at `record`.
fn patch_directory(buf: &mut [u8], record: usize, seek_keys: usize, nbytes_keys: usize) {
    let nbytes_at = record + 2 + 4 + 4;
    buf[nbytes_at..nbytes_at + 4].copy_from_slice(&len_u32(nbytes_keys).to_be_bytes());
    let seek_keys_at = record + DIR_RECORD - 4;
    buf[seek_keys_at..seek_keys_at + 4].copy_from_slice(&len_u32(seek_keys).to_be_bytes());
}

fn len_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn offset_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn offset_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
