//! # Store Error Types
//!
//! Every filesystem failure carries the path it concerns. All of these are
//! fatal for the run; there is no retry.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the policy file sink.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The output directory could not be created.
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        /// Output directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The output directory could not be listed.
    #[error("failed to scan output directory {}: {source}", path.display())]
    Scan {
        /// Output directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A record file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The target file name is already taken.
    #[error("refusing to overwrite existing file {}", path.display())]
    Collision {
        /// Target file.
        path: PathBuf,
    },

    /// Every sequence number for a shard key has been used.
    #[error("sequence numbers for shard {key} are exhausted")]
    CounterExhausted {
        /// The exhausted shard key.
        key: String,
    },

    /// A scalar could not be rendered as YAML.
    #[error("failed to render YAML: {0}")]
    Render(#[from] serde_yaml::Error),

    /// The document holds a value the emitter does not render.
    #[error("cannot emit {0} values")]
    Unsupported(&'static str),

    /// The configured wrap width is too small to be useful.
    #[error("wrap width {0} is below the minimum of {min}", min = crate::emit::MIN_WIDTH)]
    InvalidWidth(usize),
}
