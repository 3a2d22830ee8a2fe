//! # Wellnest Core Library
//!
//! Business logic for the Wellnest wellness tracker. Everything is available
//! through the `wellnest` CLI binary, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Adherence engine**: pure streak, completion-rate and trend
//!   calculations over calendar days; the caller always passes `as_of`
//! - **Trackers**: habits toggled per day plus a tagged journal of sleep,
//!   meditation and health-metric entries, owned by [`WellnessState`]
//! - **Motivation**: points, levels, streak celebrations, daily quote
//! - **Storage**: SQLite state snapshots and TOML configuration
//! - **Object storage**: list/presign against an S3-compatible bucket, used
//!   for JSON backups
//!
//! ## Key Components
//!
//! - [`AdherenceEngine`]: streak/rate/trend calculator
//! - [`WellnessState`]: single source of truth for tracked data
//! - [`Database`]: snapshot persistence
//! - [`Config`]: application configuration
//! - [`ObjectStore`]: backup bucket client

pub mod adherence;
pub mod backup;
pub mod error;
pub mod motivation;
pub mod objectstore;
pub mod storage;
pub mod tracker;

pub use adherence::{AdherenceEngine, AdherenceSummary, CompletionSet, Trend, TrendDirection};
pub use backup::BackupSnapshot;
pub use error::{ConfigError, CoreError, DatabaseError, ObjectStoreError, ValidationError};
pub use objectstore::{ObjectStore, ObjectSummary, PresignOperation, PresignedUrl, StorageSettings};
pub use storage::{Config, Database};
pub use tracker::{
    Category, CompletionRecord, MetricKind, Record, SummaryOptions, TrackedItem, WellnessState,
};
