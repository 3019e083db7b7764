use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use oxroot_decoder::{ObjectDecoder, SchemaRegistry};
use oxroot_tests::BufferWriter;
use oxroot_types::{ClassSchema, FieldKind, FieldSchema, FloatRange};
use oxroot_wire::ByteCursor;
use oxroot_wire::codes::{stl, type_code};

fn registry() -> Arc<SchemaRegistry> {
    let registry = SchemaRegistry::new();
    registry.register(
        ClassSchema::new("Hit", 2)
            .with_field(FieldSchema::new("fChannel", type_code::INT, "Int_t"))
            .with_field(FieldSchema::new("fTime", type_code::DOUBLE, "Double_t"))
            .with_field(
                FieldSchema::new("fCharge", type_code::DOUBLE32, "Double32_t")
                    .with_range(FloatRange::scaled(0.0, 500.0, 16)),
            ),
    );
    registry.register(
        ClassSchema::new("Frame", 1).with_field(
            FieldSchema::new("fHits", type_code::STL, "vector<Hit>").with_kind(FieldKind::Stl {
                stl_type: stl::VECTOR,
                ctype: type_code::OBJECT,
            }),
        ),
    );
    Arc::new(registry)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn frame(hits: usize, memberwise: bool) -> Vec<u8> {
    let n = hits as u32;
    let mut w = BufferWriter::new();
    w.versioned(1, |w| {
        if memberwise {
            w.versioned(6 | 0x4000, |w| {
                w.i16(2).u32(n);
                for i in 0..n {
                    w.i32(i as i32);
                }
                for i in 0..n {
                    w.f64(f64::from(i) * 0.5);
                }
                for i in 0..n {
                    w.u32(i * 7);
                }
            });
        } else {
            w.versioned(6, |w| {
                w.u32(n);
                for i in 0..n {
                    w.versioned(2, |w| {
                        w.i32(i as i32).f64(f64::from(i) * 0.5).u32(i * 7);
                    });
                }
            });
        }
    });
    w.into_inner()
}

fn bench_decode_frame(c: &mut Criterion) {
    let decoder = ObjectDecoder::new(registry());
    let mut group = c.benchmark_group("decode_frame");

    for hits in [10, 1000, 100_000] {
        for (layout, memberwise) in [("objectwise", false), ("memberwise", true)] {
            let payload = frame(hits, memberwise);
            group.throughput(Throughput::Bytes(payload.len() as u64));
            group.bench_with_input(BenchmarkId::new(layout, hits), &payload, |b, p| {
                b.iter(|| {
                    decoder
                        .decode_named(&mut ByteCursor::new(p), "Frame")
                        .unwrap()
                });
            });
        }
    }

    group.finish();
}

fn bench_streamer_compile(c: &mut Criterion) {
    let payload = frame(1, false);

    // A fresh registry each time: the first decode compiles both streamers.
    c.bench_function("decode_cold_registry", |b| {
        b.iter(|| {
            ObjectDecoder::new(registry())
                .decode_named(&mut ByteCursor::new(&payload), "Frame")
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_decode_frame, bench_streamer_compile);
criterion_main!(benches);
