//! Class schemas known to a container, and the streamers compiled from
//! them.
//!
//! The registry is shared (`Arc<SchemaRegistry>`) between every decode
//! of a catalog and may be read from several tasks at once. Compiled
//! streamers are cached per `(class, version, checksum)`; two tasks that
//! miss at the same time both compile and the first insert wins, which
//! is harmless since compilation is deterministic.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use oxroot_types::ClassSchema;
use oxroot_types::typename::normalize;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::builtin::Builtin;
use crate::streamer::{Streamer, compile};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct StreamerKey {
    class: String,
    version: i32,
    checksum: Option<u32>,
}

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<String, Vec<Arc<ClassSchema>>>>,
    streamers: RwLock<HashMap<StreamerKey, Arc<Streamer>>>,
    unknown_checksums: RwLock<HashSet<(String, u32)>>,
}

/// Name a class is registered and looked up under.
///
/// `std::` qualifiers are dropped, `THashList` reads as `TList`, and an
/// outermost `unordered_` container collapses onto its ordered form
/// since both share one layout.
#[must_use]
pub fn canonical_name(class: &str) -> String {
    let name = normalize(class);
    if name == "THashList" {
        return "TList".to_string();
    }
    match name.strip_prefix("unordered_") {
        Some(rest) if rest.contains('<') => rest.to_string(),
        _ => name,
    }
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a schema, replacing any with the same class and version.
    pub fn register(&self, schema: ClassSchema) {
        let class = canonical_name(&schema.class_name);
        trace!(class = %class, version = schema.version, fields = schema.fields.len(), "register schema");
        {
            let mut schemas = self.schemas.write();
            let versions = schemas.entry(class.clone()).or_default();
            versions.retain(|s| s.version != schema.version);
            versions.push(Arc::new(schema));
            versions.sort_by_key(|s| s.version);
        }
        self.streamers.write().retain(|key, _| key.class != class);
        self.unknown_checksums.write().retain(|(c, _)| *c != class);
    }

    /// Every registered schema, ordered by class then version.
    #[must_use]
    pub fn schemas(&self) -> Vec<Arc<ClassSchema>> {
        let schemas = self.schemas.read();
        let mut all: Vec<_> = schemas.values().flatten().cloned().collect();
        all.sort_by(|a, b| a.class_name.cmp(&b.class_name).then(a.version.cmp(&b.version)));
        all
    }

    /// The schema for exactly this class version.
    #[must_use]
    pub fn schema(&self, class: &str, version: i32) -> Option<Arc<ClassSchema>> {
        let schemas = self.schemas.read();
        schemas
            .get(&canonical_name(class))?
            .iter()
            .find(|s| s.version == version)
            .cloned()
    }

    /// Highest registered version of `class`.
    #[must_use]
    pub fn latest(&self, class: &str) -> Option<Arc<ClassSchema>> {
        let schemas = self.schemas.read();
        schemas.get(&canonical_name(class))?.last().cloned()
    }

    /// Schema chosen for an object written with `version` and `checksum`.
    ///
    /// ```text
    /// 1. a schema whose checksum matches
    /// 2. a schema with exactly `version`
    /// 3. the highest version, only when `version <= 0`
    /// ```
    ///
    /// Any other version mismatch is a miss: reading a body with another
    /// version's layout would produce wrong values.
    #[must_use]
    pub fn lookup(&self, class: &str, version: i32, checksum: Option<u32>) -> Option<Arc<ClassSchema>> {
        let schemas = self.schemas.read();
        let versions = schemas.get(&canonical_name(class))?;
        if let Some(sum) = checksum.filter(|&s| s != 0) {
            if let Some(s) = versions.iter().find(|s| s.checksum == sum) {
                return Some(Arc::clone(s));
            }
        }
        if let Some(s) = versions.iter().find(|s| s.version == version) {
            return Some(Arc::clone(s));
        }
        if version <= 0 {
            return versions.last().cloned();
        }
        None
    }

    /// True when `checksum` identifies a registered version of `class`.
    ///
    /// Misses are remembered until the class gets a new schema.
    #[must_use]
    pub fn knows_checksum(&self, class: &str, checksum: u32) -> bool {
        let class = canonical_name(class);
        if self.unknown_checksums.read().contains(&(class.clone(), checksum)) {
            return false;
        }
        let known = self
            .schemas
            .read()
            .get(&class)
            .is_some_and(|versions| versions.iter().any(|s| s.checksum == checksum));
        if !known {
            self.unknown_checksums.write().insert((class, checksum));
        }
        known
    }

    /// The streamer for one object body, compiling on first use.
    ///
    /// Fixed-layout classes never consult the stored schemas.
    #[must_use]
    pub fn streamer(&self, class: &str, version: i32, checksum: Option<u32>) -> Option<Arc<Streamer>> {
        let class = canonical_name(class);
        let key = StreamerKey {
            class,
            version,
            checksum,
        };
        if let Some(found) = self.streamers.read().get(&key) {
            return Some(Arc::clone(found));
        }

        let streamer = match Builtin::from_name(&key.class) {
            Some(builtin) => Streamer::Builtin(builtin),
            None => {
                let schema = self.lookup(&key.class, version, checksum)?;
                debug!(class = %key.class, version = schema.version, "compile streamer");
                Streamer::Compiled(compile(&schema, self))
            }
        };
        let mut streamers = self.streamers.write();
        Some(Arc::clone(streamers.entry(key).or_insert_with(|| Arc::new(streamer))))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.read().values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use oxroot_types::FieldSchema;
    use oxroot_wire::codes::type_code;

    use super::*;

    fn track(version: i32, checksum: u32) -> ClassSchema {
        ClassSchema::new("Track", version)
            .with_checksum(checksum)
            .with_field(FieldSchema::new("px", type_code::FLOAT, "Float_t"))
    }

    #[test]
    fn canonical_names() {
        assert_eq!(canonical_name("std::vector<std::string>"), "vector<string>");
        assert_eq!(canonical_name("THashList"), "TList");
        assert_eq!(canonical_name("unordered_map<int,float>"), "map<int,float>");
        assert_eq!(canonical_name("unordered_thing"), "unordered_thing");
    }

    #[test]
    fn lookup_order() {
        let registry = SchemaRegistry::new();
        registry.register(track(2, 0xAA));
        registry.register(track(3, 0xBB));

        assert_eq!(registry.lookup("Track", 2, Some(0xBB)).unwrap().version, 3);
        assert_eq!(registry.lookup("Track", 2, None).unwrap().version, 2);
        assert_eq!(registry.lookup("Track", 0, None).unwrap().version, 3);
        assert!(registry.lookup("Track", 9, None).is_none());
        assert_eq!(registry.latest("Track").unwrap().version, 3);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn other_versions_are_not_substituted() {
        let registry = SchemaRegistry::new();
        registry.register(track(5, 0));
        assert!(registry.lookup("Track", 9, None).is_none());
        assert!(registry.lookup("Track", 2, None).is_none());
        assert!(registry.streamer("Track", 2, None).is_none());
        assert_eq!(registry.lookup("Track", -1, None).unwrap().version, 5);
    }

    #[test]
    fn checksum_misses_are_forgotten_on_register() {
        let registry = SchemaRegistry::new();
        registry.register(track(2, 0xAA));
        assert!(!registry.knows_checksum("Track", 0xCC));
        registry.register(track(4, 0xCC));
        assert!(registry.knows_checksum("Track", 0xCC));
    }

    #[test]
    fn streamers_are_cached_until_register() {
        let registry = SchemaRegistry::new();
        registry.register(track(2, 0));
        let a = registry.streamer("Track", 2, None).unwrap();
        let b = registry.streamer("Track", 2, None).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        registry.register(track(2, 0).with_field(FieldSchema::new("py", type_code::FLOAT, "Float_t")));
        let c = registry.streamer("Track", 2, None).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        let Streamer::Compiled(c) = &*c else {
            panic!("expected a compiled streamer");
        };
        assert_eq!(c.ops().len(), 2);
    }

    #[test]
    fn builtins_need_no_schema() {
        let registry = SchemaRegistry::new();
        assert!(matches!(
            registry.streamer("THashList", 5, None).as_deref(),
            Some(Streamer::Builtin(Builtin::TList))
        ));
        assert!(registry.streamer("Unknown", 1, None).is_none());
    }

    #[test]
    fn shared_across_threads() {
        let registry = Arc::new(SchemaRegistry::new());
        registry.register(track(2, 0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.streamer("Track", 2, None).is_some())
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
    }
}
