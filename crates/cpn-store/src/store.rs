//! # Policy Store
//!
//! Writes canonical records to `<dir>/<KEY>-<NNN>.yaml`, one file per
//! record. Sequence numbers continue from the highest record file already
//! in the directory, so repeated runs append instead of overwriting.
//!
//! ## Write Path
//!
//! Each record is rendered completely, written to a temporary file in the
//! output directory, then persisted under its final name with a no-clobber
//! rename. A partially written record is never visible under a record name,
//! and an existing file is never replaced.

use std::io::Write;
use std::path::{Path, PathBuf};

use cpn_core::CanonicalPolicy;

use crate::emit::{Emitter, DEFAULT_WIDTH};
use crate::error::StoreError;
use crate::shard::{ShardCounters, ShardKey};

/// Options controlling how a [`PolicyStore`] is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Start every key at 1 regardless of files on disk. Collisions with
    /// existing files then fail the write instead of overwriting.
    pub fresh_counters: bool,
    /// Maximum line width of emitted YAML.
    pub wrap_width: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            fresh_counters: false,
            wrap_width: DEFAULT_WIDTH,
        }
    }
}

/// Where a record was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPolicy {
    /// Full path of the record file.
    pub path: PathBuf,
    /// Shard key used for the file name.
    pub shard: ShardKey,
    /// Per-key sequence number.
    pub sequence: u32,
}

impl StoredPolicy {
    /// The record's file name without the directory.
    pub fn file_name(&self) -> String {
        self.shard.file_name(self.sequence)
    }
}

/// File sink for canonical policy records.
#[derive(Debug)]
pub struct PolicyStore {
    dir: PathBuf,
    counters: ShardCounters,
    emitter: Emitter,
}

impl PolicyStore {
    /// Open (creating if needed) the output directory.
    ///
    /// Unless `fresh_counters` is set, counters are seeded from the record
    /// files already in `dir`.
    pub fn open(dir: impl Into<PathBuf>, options: StoreOptions) -> Result<Self, StoreError> {
        let dir = dir.into();
        let emitter = Emitter::new(options.wrap_width)?;
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        let counters = if options.fresh_counters {
            ShardCounters::new()
        } else {
            ShardCounters::scan_dir(&dir)?
        };
        tracing::info!(
            dir = %dir.display(),
            fresh = options.fresh_counters,
            width = emitter.width(),
            "opened policy store"
        );
        Ok(Self {
            dir,
            counters,
            emitter,
        })
    }

    /// The output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The current counter state.
    pub fn counters(&self) -> &ShardCounters {
        &self.counters
    }

    /// Write one record under the next file name for its shard.
    pub fn write(&mut self, policy: &CanonicalPolicy) -> Result<StoredPolicy, StoreError> {
        let text = self.emitter.emit(policy.payload())?;
        let shard = ShardKey::for_shard(policy.shard());
        let sequence = self
            .counters
            .next(&shard)
            .ok_or_else(|| StoreError::CounterExhausted {
                key: shard.to_string(),
            })?;
        let path = self.dir.join(shard.file_name(sequence));

        let write_err = |source| StoreError::Write {
            path: path.clone(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        tmp.write_all(text.as_bytes()).map_err(write_err)?;
        tmp.flush().map_err(write_err)?;
        tmp.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                StoreError::Collision { path: path.clone() }
            } else {
                write_err(e.error)
            }
        })?;

        tracing::debug!(path = %path.display(), shard = %shard, sequence, "wrote policy");
        Ok(StoredPolicy {
            path,
            shard,
            sequence,
        })
    }
}
