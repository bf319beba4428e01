pub mod partitioned;

pub use partitioned::{PartitionedWriter, ShardSummary, estimate_record_bytes, shard_file_name};
