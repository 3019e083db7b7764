//! Open containers built in memory and navigate their directories.

mod common;

use std::sync::Arc;

use common::{Event, Track, event_schema, track_schema, write_event, write_track};
use oxroot_decoder::{CatalogConfig, CatalogError, ContainerCatalog, MemoryProvider};
use oxroot_tests::{Compression, ContainerBuilder, Directory};
use oxroot_types::{TypedArray, Value};

fn layout() -> Directory {
    Directory::new("events.root")
        .object("track", 1, "Track", |w| write_track(w, &Track::sample(2)))
        .object("track", 2, "Track", |w| write_track(w, &Track::sample(4)))
        .directory(
            Directory::new("run1")
                .object("event", 1, "Event", |w| write_event(w, &Event::sample(), false))
                .directory(
                    Directory::new("calib")
                        .object("note", 1, "TNamed", |w| {
                            w.tnamed(0, "note", "calibration constants");
                        })
                        .object("table", 1, "TNamed", |w| {
                            w.tnamed(0, "table", &"gain 1.0025 pedestal 12; ".repeat(240));
                        }),
                ),
        )
}

fn build(compression: Compression, block_size: usize) -> Vec<u8> {
    ContainerBuilder::new(layout())
        .schema(track_schema())
        .schema(event_schema())
        .compression(compression)
        .block_size(block_size)
        .build()
}

async fn open(bytes: Vec<u8>) -> ContainerCatalog<MemoryProvider> {
    ContainerCatalog::open(MemoryProvider::new(bytes), CatalogConfig::default())
        .await
        .unwrap()
}

fn names(keys: &[oxroot_wire::KeyHeader]) -> Vec<String> {
    keys.iter().map(|k| format!("{};{}", k.name, k.cycle)).collect()
}

// ── Opening ────────────────────────────────────────────────────────────

#[tokio::test]
async fn top_directory_and_schema_catalog() {
    let catalog = open(build(Compression::None, 4096)).await;

    assert!(!catalog.header().is_large());
    assert_eq!(names(catalog.entries()), ["track;1", "track;2", "run1;1"]);

    let classes: Vec<_> = catalog
        .list_schema_catalog()
        .iter()
        .map(|s| (s.class_name.as_str(), s.version))
        .collect();
    assert_eq!(classes, [("Track", 3), ("Event", 2)]);

    let track = catalog.registry().latest("Track").unwrap();
    assert_eq!(track.checksum, common::TRACK_CHECKSUM);
    assert!(track.field("fEnergy").unwrap().range.is_some());
}

#[tokio::test]
async fn large_header_offsets() {
    let bytes = ContainerBuilder::new(layout())
        .schema(track_schema())
        .schema(event_schema())
        .large_header()
        .build();
    let catalog = open(bytes).await;

    assert!(catalog.header().is_large());
    let obj = catalog.read_object("run1/calib/note").await.unwrap();
    assert_eq!(obj.root_record().unwrap().get_str("fTitle"), Some("calibration constants"));
}

#[tokio::test]
async fn not_a_container() {
    let err = ContainerCatalog::open(MemoryProvider::new(vec![b'x'; 512]), CatalogConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::CorruptContainer { .. }), "{err}");
}

#[tokio::test]
async fn missing_schema_catalog_is_corrupt() {
    let top = Directory::new("f.root").object("track", 1, "Track", |w| write_track(w, &Track::sample(1)));
    let bytes = ContainerBuilder::new(top).without_schema_catalog().build();
    let err = ContainerCatalog::open(MemoryProvider::new(bytes), CatalogConfig::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, CatalogError::CorruptContainer { context: "schema catalog", .. }),
        "{err}"
    );
}

#[tokio::test]
async fn missing_keys_list_is_corrupt() {
    let bytes = ContainerBuilder::new(layout())
        .schema(track_schema())
        .without_keys_list()
        .build();
    let err = ContainerCatalog::open(MemoryProvider::new(bytes), CatalogConfig::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, CatalogError::CorruptContainer { context: "keys list", .. }),
        "{err}"
    );
}

#[tokio::test]
async fn container_without_classes_still_opens() {
    let top = Directory::new("f.root").object("note", 1, "TNamed", |w| {
        w.tnamed(0, "note", "plain");
    });
    let catalog = open(ContainerBuilder::new(top).build()).await;
    assert!(catalog.list_schema_catalog().is_empty());
    let obj = catalog.read_object("note").await.unwrap();
    assert_eq!(obj.root_record().unwrap().get_str("fTitle"), Some("plain"));
}

// ── Names and paths ────────────────────────────────────────────────────

#[tokio::test]
async fn highest_cycle_wins_unless_named() {
    let catalog = open(build(Compression::None, 4096)).await;

    assert_eq!(catalog.resolve_entry("track").unwrap().cycle, 2);
    assert_eq!(catalog.resolve_entry("track;1").unwrap().cycle, 1);

    let latest = catalog.read_object("track").await.unwrap();
    assert_eq!(latest.root_record().unwrap().get_f64("fPx"), Some(4.5));
    let first = catalog.read_object("track;1").await.unwrap();
    assert_eq!(first.root_record().unwrap().get_f64("fPx"), Some(2.5));
}

#[tokio::test]
async fn nested_directories() {
    let catalog = open(build(Compression::None, 4096)).await;

    assert_eq!(names(&catalog.list("run1").await.unwrap()), ["event;1", "calib;1"]);
    assert_eq!(names(&catalog.list("run1/calib").await.unwrap()), ["note;1", "table;1"]);
    assert_eq!(names(&catalog.list("").await.unwrap()), names(catalog.entries()));

    let key = catalog.locate("run1/calib/note").await.unwrap();
    assert_eq!(key.class_name, "TNamed");
}

#[tokio::test]
async fn lookup_failures() {
    let catalog = open(build(Compression::None, 4096)).await;

    let err = catalog.locate("missing").await.unwrap_err();
    assert!(matches!(err, CatalogError::EntryNotFound { ref name } if name == "missing"), "{err}");

    let err = catalog.locate("run1/nope").await.unwrap_err();
    assert!(matches!(err, CatalogError::EntryNotFound { .. }), "{err}");

    let err = catalog.locate("track/inner").await.unwrap_err();
    assert!(
        matches!(err, CatalogError::NotADirectory { ref class, .. } if class == "Track"),
        "{err}"
    );

    let err = catalog.locate("track;9").await.unwrap_err();
    assert!(matches!(err, CatalogError::EntryNotFound { .. }), "{err}");
}

// ── Objects ────────────────────────────────────────────────────────────

#[tokio::test]
async fn track_fields() {
    let catalog = open(build(Compression::None, 4096)).await;
    let obj = catalog.read_object("track").await.unwrap();
    assert!(obj.is_clean(), "{:?}", obj.diagnostics);

    let rec = obj.root_record().unwrap();
    let expected = Track::sample(4);
    assert_eq!(rec.type_tag, "Track");
    assert_eq!(rec.get("fUniqueID"), Some(&Value::UInt(0)));
    assert_eq!(rec.get_i64("fNhits"), Some(4));
    assert_eq!(rec.get("fHits"), Some(&Value::Array(TypedArray::F64(expected.hits.clone()))));
    assert_eq!(rec.get_str("fLabel"), Some("trk4"));
    let energy = rec.get_f64("fEnergy").unwrap();
    assert!((energy - expected.energy()).abs() < 1e-9, "{energy}");
}

#[tokio::test]
async fn every_algorithm_decodes_alike() {
    let plain = open(build(Compression::None, 4096)).await;
    let event = plain.read_object("run1/event").await.unwrap();
    let table = plain.read_object("run1/calib/table").await.unwrap();
    assert!(event.is_clean(), "{:?}", event.diagnostics);

    for compression in Compression::ALL {
        // 1 KiB blocks split the table payload across several blocks.
        let catalog = open(build(compression, 1024)).await;
        let key = catalog.locate("run1/calib/table").await.unwrap();
        assert!(key.is_compressed(), "{compression:?} left the payload raw");
        let raw = catalog.read_entry_bytes(&key).await.unwrap();
        assert_eq!(raw.len(), key.objlen as usize);

        assert_eq!(catalog.read_object("run1/calib/table").await.unwrap(), table, "{compression:?}");
        assert_eq!(catalog.read_object("run1/event").await.unwrap(), event, "{compression:?}");
    }
}

#[tokio::test]
async fn concurrent_reads_share_one_catalog() {
    let catalog = Arc::new(open(build(Compression::Zlib, 64)).await);

    let mut handles = Vec::new();
    for path in ["track;1", "track;2", "run1/event", "run1/calib/note"] {
        let catalog = Arc::clone(&catalog);
        handles.push(tokio::spawn(async move { catalog.read_object(path).await }));
    }
    for handle in handles {
        let obj = handle.await.unwrap().unwrap();
        assert!(obj.is_clean(), "{:?}", obj.diagnostics);
    }
}

#[tokio::test]
async fn raw_payload_with_unknown_class_is_skipped() {
    let mut payload = Vec::new();
    // Version record with a byte count over four opaque bytes.
    payload.extend_from_slice(&(0x4000_0000u32 | 6).to_be_bytes());
    payload.extend_from_slice(&1i16.to_be_bytes());
    payload.extend_from_slice(&[1, 2, 3, 4]);

    let top = Directory::new("odd.root").raw("blob", 1, "Mystery", payload);
    let catalog = open(ContainerBuilder::new(top).build()).await;

    let obj = catalog.read_object("blob").await.unwrap();
    assert!(obj.root.is_null() || obj.root_record().is_some());
    assert!(
        obj.diagnostics
            .iter()
            .any(|w| matches!(w, oxroot_types::DecodeWarning::SchemaNotFound { class, .. } if class == "Mystery")),
        "{:?}",
        obj.diagnostics
    );
}
