pub mod dataset;
pub mod record;

pub use dataset::{DatasetAssembler, HarmonicDataset, Tag, TagValue};
pub use record::{PositionRecord, RECORD_LEN};
