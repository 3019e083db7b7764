//! Shared schemas and payload writers for the integration tests.
#![allow(dead_code)]

use oxroot_tests::BufferWriter;
use oxroot_types::{ClassSchema, FieldKind, FieldSchema, FloatRange};
use oxroot_wire::codes::{stl, type_code};

pub const TRACK_VERSION: i16 = 3;
pub const TRACK_CHECKSUM: u32 = 0x1234_5678;

/// `Track` v3: TObject base, a float, a counter and the array it sizes, a
/// string and a range-packed `Double32_t`.
pub fn track_schema() -> ClassSchema {
    ClassSchema::new("Track", i32::from(TRACK_VERSION))
        .with_checksum(TRACK_CHECKSUM)
        .with_field(FieldSchema::base("TObject", 1))
        .with_field(FieldSchema::new("fPx", type_code::FLOAT, "Float_t"))
        .with_field(FieldSchema::new("fNhits", type_code::INT, "Int_t"))
        .with_field(
            FieldSchema::new("fHits", type_code::OFFSET_P + type_code::DOUBLE, "Double_t*")
                .with_title("[fNhits]")
                .with_kind(FieldKind::BasicPointer {
                    count_name: "fNhits".into(),
                    count_class: "Track".into(),
                    count_version: i32::from(TRACK_VERSION),
                }),
        )
        .with_field(FieldSchema::new("fLabel", type_code::TSTRING, "TString"))
        .with_field(
            FieldSchema::new("fEnergy", type_code::DOUBLE32, "Double32_t")
                .with_title("[0,100,16]")
                .with_range(FloatRange::scaled(0.0, 100.0, 16)),
        )
}

/// Values carried by one fixture track.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub px: f32,
    pub hits: Vec<f64>,
    pub label: String,
    /// Raw 16-bit value of the packed energy; decodes to `raw / 655.36`.
    pub energy_raw: u32,
}

impl Track {
    pub fn sample(i: u8) -> Self {
        Self {
            px: f32::from(i) + 0.5,
            hits: (0..i).map(|h| f64::from(h) * 1.25).collect(),
            label: format!("trk{i}"),
            energy_raw: u32::from(i) * 6554,
        }
    }

    pub fn energy(&self) -> f64 {
        f64::from(self.energy_raw) / 655.36
    }
}

/// A `Track` body, version record first.
pub fn write_track(w: &mut BufferWriter, t: &Track) {
    w.versioned(TRACK_VERSION, |w| {
        w.tobject(0);
        w.f32(t.px);
        w.i32(i32::try_from(t.hits.len()).unwrap());
        w.u8(1);
        for h in &t.hits {
            w.f64(*h);
        }
        w.tstring(&t.label);
        w.u32(t.energy_raw);
    });
}

/// Several tracks written member-wise: each member for every track in turn.
pub fn write_tracks_memberwise(w: &mut BufferWriter, tracks: &[Track]) {
    for _ in tracks {
        w.u32(0).u32(0);
    }
    for t in tracks {
        w.f32(t.px);
    }
    for t in tracks {
        w.i32(i32::try_from(t.hits.len()).unwrap());
    }
    for t in tracks {
        w.u8(1);
        for h in &t.hits {
            w.f64(*h);
        }
    }
    for t in tracks {
        w.tstring(&t.label);
    }
    for t in tracks {
        w.u32(t.energy_raw);
    }
}

pub const EVENT_VERSION: i16 = 2;

/// `Event` v2: a run number, a vector of tracks, a vector of doubles and a
/// map from int to string.
pub fn event_schema() -> ClassSchema {
    ClassSchema::new("Event", i32::from(EVENT_VERSION))
        .with_field(FieldSchema::new("fRun", type_code::INT, "Int_t"))
        .with_field(
            FieldSchema::new("fTracks", type_code::STL, "vector<Track>").with_kind(FieldKind::Stl {
                stl_type: stl::VECTOR,
                ctype: type_code::OBJECT,
            }),
        )
        .with_field(
            FieldSchema::new("fWeights", type_code::STL, "vector<double>").with_kind(FieldKind::Stl {
                stl_type: stl::VECTOR,
                ctype: type_code::DOUBLE,
            }),
        )
        .with_field(
            FieldSchema::new("fTags", type_code::STL, "map<int,string>").with_kind(FieldKind::Stl {
                stl_type: stl::MAP,
                ctype: type_code::OBJECT,
            }),
        )
}

/// Contents of one fixture event.
#[derive(Clone, Debug)]
pub struct Event {
    pub run: i32,
    pub tracks: Vec<Track>,
    pub weights: Vec<f64>,
    pub tags: Vec<(i32, String)>,
}

impl Event {
    pub fn sample() -> Self {
        Self {
            run: 42,
            tracks: (1..=3).map(Track::sample).collect(),
            weights: vec![0.5, 1.0, 2.0],
            tags: vec![(1, "calib".into()), (7, "physics".into())],
        }
    }
}

const MEMBERWISE: i16 = 0x4000;

/// An `Event` body. With `memberwise` the track vector and the tag map are
/// written member-wise.
pub fn write_event(w: &mut BufferWriter, e: &Event, memberwise: bool) {
    w.versioned(EVENT_VERSION, |w| {
        w.i32(e.run);

        let n = |len: usize| u32::try_from(len).unwrap();
        if memberwise {
            w.versioned(6 | MEMBERWISE, |w| {
                w.i16(TRACK_VERSION);
                w.u32(n(e.tracks.len()));
                write_tracks_memberwise(w, &e.tracks);
            });
        } else {
            w.versioned(6, |w| {
                w.u32(n(e.tracks.len()));
                for t in &e.tracks {
                    write_track(w, t);
                }
            });
        }

        w.versioned(6, |w| {
            w.u32(n(e.weights.len()));
            for x in &e.weights {
                w.f64(*x);
            }
        });

        if memberwise {
            w.versioned(6 | MEMBERWISE, |w| {
                w.i16(1);
                w.u32(n(e.tags.len()));
                for (k, _) in &e.tags {
                    w.i32(*k);
                }
                for (_, v) in &e.tags {
                    w.tstring(v);
                }
            });
        } else {
            w.versioned(6, |w| {
                w.u32(n(e.tags.len()));
                for (k, v) in &e.tags {
                    w.i32(*k).tstring(v);
                }
            });
        }
    });
}

/// `Node` v1: a value and a pointer to the next node.
pub fn node_schema() -> ClassSchema {
    ClassSchema::new("Node", 1)
        .with_field(FieldSchema::new("fValue", type_code::INT, "Int_t"))
        .with_field(FieldSchema::new("fNext", type_code::OBJECT_P, "Node*"))
}
