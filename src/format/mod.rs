//! Snapshot I/O.

pub mod snapshot;

pub use snapshot::{
    decode_worker, encode_item, encode_worker, from_json, to_json, ItemSnapshot, WorkerSnapshot,
};
