//! # cpn-ingest: Feeds and the Normalization Pipeline
//!
//! Reads source feed files, maps their records onto the common policy model,
//! and drives canonicalization and storage.
//!
//! - [`feeds`]: the [`PolicyFeed`] mappers for New Climate, CD-LINKS, and
//!   COMMIT, plus [`load_feed`].
//! - [`fields`]: typed access to raw record keys.
//! - [`pipeline`]: the [`Pipeline`] run loop and its [`RunSummary`].
//! - [`config`]: the `cpn.yaml` [`RunConfig`].

pub mod config;
pub mod error;
pub mod feeds;
pub mod fields;
pub mod pipeline;

pub use config::{RunConfig, DEFAULT_OUTPUT_DIR};
pub use error::IngestError;
pub use feeds::{
    load_feed, CdLinks, Commit, FeedContext, FeedKind, NewClimate, PolicyFeed, CD_LINKS_SOURCE,
    COMMIT_SHEET,
};
pub use fields::{Fields, RawRecord};
pub use pipeline::{FeedSource, Pipeline, RunSummary};
