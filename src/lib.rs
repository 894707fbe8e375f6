//! Bidirectional index between routing graph node ids and map feature segments
//!
//! - [`ForwardMapping`]: node id -> segments, plus bulk segment -> node resolution
//! - [`MappingBuilder`]: offline writer of the forward mapping
//! - [`BackwardIndex`]: feature id -> node ids over a rank bit vector
//!
//! All persisted data lives in named sections of a container
//! ([`MemoryContainer`], or [`DirContainer`] with memory-mapped reads).

pub mod backward;
pub mod builder;
pub mod config;
pub mod error;
pub mod features;
pub mod formats;
pub mod mapping;
pub mod offsets;
pub mod segment;
pub mod storage;
pub mod succinct;

pub use backward::BackwardIndex;
pub use builder::MappingBuilder;
pub use config::{SectionNames, SegmapConfig};
pub use error::{Error, Result};
pub use features::{FeatureIdTranslator, FeaturesOffsetsTable, IdentityTranslator};
pub use mapping::{ForwardMapping, ResolvedNodes};
pub use offsets::{OffsetIndex, SegOffset};
pub use segment::{FtSeg, NodeId, INVALID_FID, INVALID_NODE_ID};
pub use storage::{DirContainer, MemoryContainer, SectionBytes, SectionSink, SectionSource};
