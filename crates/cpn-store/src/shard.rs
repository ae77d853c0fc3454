//! Shard keys and per-shard sequence counters.
//!
//! A record is written to `<KEY>-<NNN>.yaml` where `KEY` is the alpha-3 code
//! of its first resolved jurisdiction, or [`ShardKey::FALLBACK`] when there
//! is none, and `NNN` is a zero-padded per-key sequence starting at 1.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use cpn_core::AlphaCode;

use crate::error::StoreError;

const EXTENSION: &str = ".yaml";

/// File-name prefix grouping records by jurisdiction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShardKey(String);

impl ShardKey {
    /// Key for records without a resolved jurisdiction.
    pub const FALLBACK: &'static str = "ZZZ";

    /// The fallback key.
    pub fn fallback() -> Self {
        Self(Self::FALLBACK.to_string())
    }

    /// Key for a record's shard tag.
    pub fn for_shard(shard: Option<&AlphaCode>) -> Self {
        match shard {
            Some(code) => Self(code.as_str().to_string()),
            None => Self::fallback(),
        }
    }

    /// Parse a key from a file-name prefix. Keys are three ASCII uppercase letters.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == 3 && raw.bytes().all(|b| b.is_ascii_uppercase());
        valid.then(|| Self(raw.to_string()))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the fallback key.
    pub fn is_fallback(&self) -> bool {
        self.0 == Self::FALLBACK
    }

    /// File name of the `sequence`-th record under this key.
    pub fn file_name(&self, sequence: u32) -> String {
        format!("{}-{sequence:03}{EXTENSION}", self.0)
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split a record file name into its key and sequence number.
///
/// Returns `None` for anything that is not `<KEY>-<digits>.yaml` with at least
/// three digits.
pub fn parse_file_name(name: &str) -> Option<(ShardKey, u32)> {
    let stem = name.strip_suffix(EXTENSION)?;
    let (key, digits) = stem.split_once('-')?;
    let key = ShardKey::parse(key)?;
    if digits.len() < 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let sequence = digits.parse().ok()?;
    Some((key, sequence))
}

/// Per-key sequence counters. Each key counts 1, 2, 3, ... without gaps
/// from its highest observed value.
#[derive(Debug, Clone, Default)]
pub struct ShardCounters {
    last: BTreeMap<ShardKey, u32>,
}

impl ShardCounters {
    /// Empty counters. Every key starts at 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed counters from the record files already present in `dir`.
    ///
    /// Files that do not match the record naming scheme are ignored.
    pub fn scan_dir(dir: &Path) -> Result<Self, StoreError> {
        let scan_err = |source| StoreError::Scan {
            path: dir.to_path_buf(),
            source,
        };
        let mut counters = Self::new();
        for entry in std::fs::read_dir(dir).map_err(scan_err)? {
            let entry = entry.map_err(scan_err)?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some((key, sequence)) = parse_file_name(name) {
                counters.observe(key, sequence);
            }
        }
        tracing::debug!(
            dir = %dir.display(),
            keys = counters.last.len(),
            "seeded shard counters"
        );
        Ok(counters)
    }

    /// Record that `sequence` is taken under `key`.
    pub fn observe(&mut self, key: ShardKey, sequence: u32) {
        let last = self.last.entry(key).or_insert(0);
        *last = (*last).max(sequence);
    }

    /// Claim the next sequence number for `key`.
    ///
    /// Returns `None` once `u32::MAX` has been claimed or observed; the
    /// counter is left unchanged.
    pub fn next(&mut self, key: &ShardKey) -> Option<u32> {
        let last = self.last.entry(key.clone()).or_insert(0);
        *last = last.checked_add(1)?;
        Some(*last)
    }

    /// Highest sequence claimed or observed for `key`, 0 if none.
    pub fn current(&self, key: &ShardKey) -> u32 {
        self.last.get(key).copied().unwrap_or(0)
    }
}
