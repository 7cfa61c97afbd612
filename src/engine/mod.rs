pub mod bucket;
pub mod partitioned;

pub use bucket::Bucket;
pub use partitioned::{hash32, PartitionedStore, DEFAULT_SHARDS};
