//! Multi-project merge: stage the working project into the shared cache and
//! recombine every staged project into a single tree.

pub mod classify;
pub mod engine;
pub mod error;
pub mod queue;

pub use classify::{classify, FileRecord, Role};
pub use engine::{
    merged_destination, CacheLayout, Collision, CollisionPolicy, MergeEngine, MergeReport,
    StageOutcome, DEFAULT_MERGE_CONCURRENCY,
};
pub use error::MergeError;
pub use queue::{MergeQueue, MergeQueueEntry};
