#![warn(clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

pub mod compress;
pub mod container;
pub mod schema;
pub mod writer;

pub use compress::{Compression, compress_blocks, pack};
pub use container::{ContainerBuilder, Directory, Entry};
pub use schema::{write_schema_catalog, write_streamer_info};
pub use writer::{BufferWriter, Mark};
