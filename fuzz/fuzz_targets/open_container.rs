#![no_main]

use libfuzzer_sys::fuzz_target;
use oxroot_decoder::{CatalogConfig, ContainerCatalog, MemoryProvider};

// Fuzz target: opening a container and reading every top-level entry.
//
// Catches bugs in:
// - Header, directory and key list offsets pointing anywhere
// - Schema catalog records that do not describe real classes
// - Compressed payloads whose declared sizes lie
fuzz_target!(|data: &[u8]| {
    let Ok(runtime) = tokio::runtime::Builder::new_current_thread().enable_time().build() else {
        return;
    };
    runtime.block_on(async {
        let mut config = CatalogConfig::default();
        config.max_decompressed = 1 << 20;
        let Ok(catalog) = ContainerCatalog::open(MemoryProvider::new(data.to_vec()), config).await else {
            return;
        };
        let names: Vec<String> = catalog
            .entries()
            .iter()
            .map(|k| format!("{};{}", k.name, k.cycle))
            .collect();
        for name in names {
            let _ = catalog.read_object(&name).await;
        }
    });
});
