//! Storage layer: CSV corpus I/O (Arrow) and dataset curation.

mod error;
pub use error::StoreError;

pub mod corpus;
pub mod curate;
pub mod plan;

pub use corpus::{RawRow, SourceColumns, read_corpus, read_source, write_corpus};
pub use curate::{CurationStats, Curated, Curator, CuratorConfig, RebalanceConfig};
pub use plan::{CurationPlan, SourceSpec};
