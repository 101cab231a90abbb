pub mod catalog;
pub mod correlation;
pub mod distribution;
pub mod error;
pub mod io;
pub mod json;
pub mod merge;
pub mod record;
pub mod resolver;
pub mod snapshot;
pub mod stats;
pub mod summary;
pub mod tree;

pub use catalog::ReferenceCatalog;
pub use correlation::{Correlation, spearman};
pub use distribution::{DomainError, LengthDistribution, PercentDistribution};
pub use error::MapulaError;
pub use merge::MergeError;
pub use record::{AlignmentRecord, AlignmentRole};
pub use resolver::{ClassificationError, GroupKey, GroupKeyResolver, UnknownReferencePolicy};
pub use snapshot::Snapshot;
pub use stats::{CoreStats, ReferenceTally};
pub use summary::{Summary, SummaryRow};
pub use tree::{AlignmentTree, Ingested, TreeError};
