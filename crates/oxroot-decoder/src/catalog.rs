//! Random access to the keyed entries of one container.
//!
//! ```text
//!   open ─▶ header prefix ─▶ { top directory, StreamerInfo key } ─▶ keys list
//!                                                │
//!                                  schemas ─▶ SchemaRegistry
//!
//!   read_object("dir/h1;2") ─▶ locate ─▶ read_entry_bytes ─▶ decode_named
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use oxroot_inflate::BlockInflator;
use oxroot_types::{ClassSchema, DecodedObject, SchemaError, Value};
use oxroot_wire::{
    ByteCursor, ContainerHeader, DirectoryHeader, HEADER_PREFIX_SIZE, KeyHeader, WireError, read_key_list,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;
use crate::decoder::ObjectDecoder;
use crate::error::CatalogError;
use crate::fetch::RangeFetcher;
use crate::provider::{ByteRange, ByteRangeProvider};
use crate::registry::SchemaRegistry;

/// An opened container: its header, top-level keys and class schemas.
///
/// Entry reads take `&self` and may run concurrently; each read owns its
/// buffers and cursor, and only the registry's streamer cache and the
/// sub-directory cache are shared.
#[derive(Debug)]
pub struct ContainerCatalog<P: ByteRangeProvider> {
    fetcher: RangeFetcher<P>,
    header: ContainerHeader,
    directory: DirectoryHeader,
    keys: Vec<KeyHeader>,
    registry: Arc<SchemaRegistry>,
    decoder: ObjectDecoder,
    inflator: BlockInflator,
    subdirs: Mutex<HashMap<u64, Arc<Vec<KeyHeader>>>>,
    schemas: Vec<ClassSchema>,
}

impl<P: ByteRangeProvider> ContainerCatalog<P> {
    /// Open a container.
    ///
    /// Three round trips: the 64-byte header prefix, then the top
    /// directory record together with the schema catalog key, then the
    /// top-level keys list. Schemas found in the catalog are registered
    /// before this returns.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::CorruptContainer`] for a bad magic, negative
    ///   offsets, truncated header records, or a container with no schema
    ///   catalog or no keys list.
    /// - [`CatalogError::RangeFetch`] when the provider gives up.
    /// - [`CatalogError::Inflate`] / [`CatalogError::Decode`] when the
    ///   schema catalog cannot be read.
    pub async fn open(provider: P, config: CatalogConfig) -> Result<Self, CatalogError> {
        let fetcher = RangeFetcher::new(provider, config.retry.clone());
        let prefix = fetcher.fetch_one(ByteRange::new(0, HEADER_PREFIX_SIZE as u64)).await?;
        let header = ContainerHeader::read_from(&prefix).map_err(CatalogError::corrupt("container header"))?;
        debug!(
            version = header.format_version(),
            begin = header.begin,
            end = header.end,
            seek_info = header.seek_info,
            "container header"
        );

        let dir_len = u64::from(header.nbytes_name) + DirectoryHeader::MAX_SIZE as u64;
        let dir_end = (header.begin + dir_len).min(header.end.max(header.begin));
        let info = record_range("schema catalog", header.seek_info, header.nbytes_info)?;
        let blobs = fetcher
            .fetch(&[ByteRange::new(header.begin, dir_end - header.begin), info])
            .await?;

        let mut c = ByteCursor::new(&blobs[0]);
        c.seek(header.nbytes_name as usize).map_err(CatalogError::corrupt("top directory"))?;
        let directory = DirectoryHeader::read(&mut c).map_err(CatalogError::corrupt("top directory"))?;

        let keys = read_keys(&fetcher, &directory).await?;

        let inflator = BlockInflator::new().with_max_output(config.max_decompressed);
        let registry = Arc::new(SchemaRegistry::new());
        let decoder = ObjectDecoder::new(Arc::clone(&registry)).with_config(config.decoder.clone());
        let schemas = read_schema_catalog(blobs[1].clone(), &inflator, &decoder)?;
        for schema in &schemas {
            registry.register(schema.clone());
        }
        info!(keys = keys.len(), schemas = schemas.len(), "container opened");

        Ok(Self {
            fetcher,
            header,
            directory,
            keys,
            registry,
            decoder,
            inflator,
            subdirs: Mutex::new(HashMap::new()),
            schemas,
        })
    }

    #[must_use]
    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    #[must_use]
    pub fn directory(&self) -> &DirectoryHeader {
        &self.directory
    }

    /// Top-level keys in stored order.
    #[must_use]
    pub fn entries(&self) -> &[KeyHeader] {
        &self.keys
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn decoder(&self) -> &ObjectDecoder {
        &self.decoder
    }

    /// Schemas decoded from the container's schema catalog, in stored order.
    #[must_use]
    pub fn list_schema_catalog(&self) -> &[ClassSchema] {
        &self.schemas
    }

    /// Find a top-level key by `name` or `name;cycle`.
    ///
    /// An exact cycle wins; without one the highest cycle is returned.
    ///
    /// # Errors
    ///
    /// [`CatalogError::EntryNotFound`] when nothing matches.
    pub fn resolve_entry(&self, name: &str) -> Result<&KeyHeader, CatalogError> {
        resolve(&self.keys, name).ok_or_else(|| CatalogError::EntryNotFound { name: name.to_string() })
    }

    /// Find a key by slash-separated path, descending through
    /// sub-directories.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::EntryNotFound`] for a missing path component.
    /// - [`CatalogError::NotADirectory`] when an inner component is not
    ///   a directory.
    /// - Fetch and header errors while loading a sub-directory.
    pub async fn locate(&self, path: &str) -> Result<KeyHeader, CatalogError> {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let Some((last, dirs)) = parts.split_last() else {
            return Err(CatalogError::EntryNotFound { name: path.to_string() });
        };
        let keys = self.walk(dirs).await?;
        resolve(keys.as_deref().unwrap_or(&self.keys), last)
            .cloned()
            .ok_or_else(|| CatalogError::EntryNotFound { name: path.to_string() })
    }

    /// Keys of the directory at `path` (`""` for the top level).
    ///
    /// # Errors
    ///
    /// As for [`locate`](Self::locate).
    pub async fn list(&self, path: &str) -> Result<Vec<KeyHeader>, CatalogError> {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        Ok(match self.walk(&parts).await? {
            Some(keys) => keys.as_ref().clone(),
            None => self.keys.clone(),
        })
    }

    /// Descend through `dirs`; `None` means the top level.
    async fn walk(&self, dirs: &[&str]) -> Result<Option<Arc<Vec<KeyHeader>>>, CatalogError> {
        let mut current: Option<Arc<Vec<KeyHeader>>> = None;
        for dir in dirs {
            let key = resolve(current.as_deref().unwrap_or(&self.keys), dir)
                .cloned()
                .ok_or_else(|| CatalogError::EntryNotFound { name: (*dir).to_string() })?;
            if !key.is_directory() {
                return Err(CatalogError::NotADirectory {
                    name: (*dir).to_string(),
                    class: key.class_name,
                });
            }
            current = Some(self.subdirectory(&key).await?);
        }
        Ok(current)
    }

    async fn subdirectory(&self, key: &KeyHeader) -> Result<Arc<Vec<KeyHeader>>, CatalogError> {
        let cached = self.subdirs.lock().get(&key.seek_key).cloned();
        if let Some(keys) = cached {
            return Ok(keys);
        }
        let payload = self.read_entry_bytes(key).await?;
        let directory =
            DirectoryHeader::read(&mut ByteCursor::new(&payload)).map_err(CatalogError::corrupt("sub-directory"))?;
        let keys = Arc::new(read_keys(&self.fetcher, &directory).await?);
        debug!(name = %key.name, keys = keys.len(), "sub-directory loaded");
        let mut cache = self.subdirs.lock();
        Ok(Arc::clone(cache.entry(key.seek_key).or_insert(keys)))
    }

    /// Fetch an entry's payload, inflating it when stored compressed.
    ///
    /// # Errors
    ///
    /// [`CatalogError::RangeFetch`] or [`CatalogError::Inflate`].
    pub async fn read_entry_bytes(&self, key: &KeyHeader) -> Result<Bytes, CatalogError> {
        let stored = self
            .fetcher
            .fetch_one(ByteRange::new(key.payload_offset(), u64::from(key.stored_size())))
            .await?;
        unpack(&self.inflator, key, stored)
    }

    /// Locate, fetch and decode one entry.
    ///
    /// # Errors
    ///
    /// Lookup and fetch errors as for [`locate`](Self::locate) and
    /// [`read_entry_bytes`](Self::read_entry_bytes); decode errors that
    /// could not be absorbed as [`CatalogError::Decode`].
    pub async fn read_object(&self, path: &str) -> Result<DecodedObject, CatalogError> {
        let key = self.locate(path).await?;
        let payload = self.read_entry_bytes(&key).await?;
        let mut cursor = ByteCursor::with_tag_offset(&payload, u32::from(key.keylen));
        let decoded = self.decoder.decode_named(&mut cursor, &key.class_name)?;
        if !decoded.is_clean() {
            warn!(path, warnings = decoded.diagnostics.len(), "entry decoded with warnings");
        }
        Ok(decoded)
    }
}

/// `name` or `name;cycle` against a key list.
fn resolve<'k>(keys: &'k [KeyHeader], name: &str) -> Option<&'k KeyHeader> {
    let (name, cycle) = match name.rsplit_once(';') {
        Some((n, c)) => match c.parse::<i16>() {
            Ok(c) => (n, Some(c)),
            Err(_) => (name, None),
        },
        None => (name, None),
    };
    let mut matching = keys.iter().filter(|k| k.name == name);
    match cycle {
        Some(c) => matching.find(|k| k.cycle == c),
        None => matching.max_by_key(|k| k.cycle),
    }
}

async fn read_keys<P: ByteRangeProvider>(
    fetcher: &RangeFetcher<P>,
    directory: &DirectoryHeader,
) -> Result<Vec<KeyHeader>, CatalogError> {
    let range = record_range("keys list", directory.seek_keys, directory.nbytes_keys)?;
    let blob = fetcher.fetch_one(range).await?;
    read_key_list(&mut ByteCursor::new(&blob)).map_err(CatalogError::corrupt("keys list"))
}

/// The byte range of a record every usable container must carry.
fn record_range(context: &'static str, seek: u64, nbytes: u32) -> Result<ByteRange, CatalogError> {
    if seek == 0 || nbytes == 0 {
        return Err(CatalogError::CorruptContainer {
            context,
            source: WireError::MissingRecord { seek, nbytes },
        });
    }
    Ok(ByteRange::new(seek, u64::from(nbytes)))
}

fn unpack(inflator: &BlockInflator, key: &KeyHeader, stored: Bytes) -> Result<Bytes, CatalogError> {
    if !key.is_compressed() {
        return Ok(stored);
    }
    let inflated = inflator.inflate(&stored, key.objlen as usize)?;
    Ok(Bytes::from(inflated))
}

/// Decode the schema catalog: a key whose payload is a `TList` of
/// `TStreamerInfo` records. Other list items are skipped.
fn read_schema_catalog(
    blob: Bytes,
    inflator: &BlockInflator,
    decoder: &ObjectDecoder,
) -> Result<Vec<ClassSchema>, CatalogError> {
    let key = KeyHeader::read(&mut ByteCursor::new(&blob)).map_err(CatalogError::corrupt("schema catalog key"))?;
    let keylen = usize::from(key.keylen);
    if keylen > blob.len() {
        return Err(CatalogError::CorruptContainer {
            context: "schema catalog key",
            source: WireError::OutOfBounds {
                offset: 0,
                needed: keylen,
                limit: blob.len(),
            },
        });
    }
    let payload = unpack(inflator, &key, blob.slice(keylen..))?;
    let mut cursor = ByteCursor::with_tag_offset(&payload, u32::from(key.keylen));
    let decoded = decoder.decode_named(&mut cursor, "TList")?;

    let items = decoded
        .root_record()
        .and_then(|list| list.get("arr"))
        .and_then(Value::as_list)
        .unwrap_or_default();
    let mut schemas = Vec::with_capacity(items.len());
    for item in items {
        let Some(rec) = decoded.graph.record(item) else {
            continue;
        };
        match ClassSchema::from_record(rec, &decoded.graph) {
            Ok(schema) => schemas.push(schema),
            Err(SchemaError::NotASchema { .. }) => {}
            Err(e) => warn!(error = %e, "schema skipped"),
        }
    }
    Ok(schemas)
}
