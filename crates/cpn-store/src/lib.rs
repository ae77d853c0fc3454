//! # cpn-store: Policy File Sink
//!
//! Persists canonical policy records as one YAML file each, named
//! `<KEY>-<NNN>.yaml` by the record's first jurisdiction.
//!
//! - [`shard`]: shard keys and per-key sequence counters.
//! - [`emit`]: width-limited block YAML rendering.
//! - [`store`]: the directory-backed [`PolicyStore`].

pub mod emit;
pub mod error;
pub mod shard;
pub mod store;

pub use emit::{Emitter, DEFAULT_WIDTH, MIN_WIDTH};
pub use error::StoreError;
pub use shard::{parse_file_name, ShardCounters, ShardKey};
pub use store::{PolicyStore, StoreOptions, StoredPolicy};
