///! Persisted section formats
///!
///! Every section shares the framing in [`framing`]: a 16-byte header with a
///! per-section magic, a section-specific body and a CRC-64 footer.

pub mod framing;

// Forward mapping
pub mod segments;
pub mod offsets;

// Backward index
pub mod bits;
pub mod nodes;

// Feature id translation
pub mod features_offsets;

pub use bits::BitsSection;
pub use features_offsets::FeaturesOffsetsSection;
pub use nodes::{NodeLists, NodesSection};
pub use offsets::OffsetsSection;
pub use segments::SegmentsSection;
