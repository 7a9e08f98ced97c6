//! Tag sessions: the pipelines that sit between a tapped tag and the
//! application.
//!
//! - [`TagPipeline::read`] retries the full tag file read a few times and
//!   decodes the result.
//! - [`TagPipeline::write`] checks that the tag belongs to the same person
//!   before overwriting it.
//! - [`sync`] compares tag policies with a remote policy set and builds
//!   the data to write back.
//! - [`SessionContext`] turns tag-present/removed events into reports,
//!   with at most one write in flight.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod read;
pub mod retry;
pub mod session;
pub mod sync;
pub mod write;

pub use config::{SessionConfig, WriteConfig};
pub use error::{Result, SessionError};
pub use pipeline::TagPipeline;
pub use retry::{retry, Delay, RecordingDelay, RetryOutcome, RetryPolicy, ThreadDelay};
pub use session::{Mode, SessionContext, TapReport, TapStatus};
pub use sync::{compare, compare_with_source, FieldDifference, PolicySource, SyncOutcome, SyncReport};
pub use write::{Identity, OwnershipCheck, WriteOutcome, WriteStatus};
