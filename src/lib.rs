pub mod catalog;
pub mod codec;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod lock;
pub mod retry;
pub mod storage;

pub use catalog::{DatabaseMetadata, DatasetId, JobId, SharedCatalog};
pub use codec::{read_record, write_record, Record};
pub use config::{FailurePolicy, PipelineConfig, RetryConfig};
pub use descriptor::{
    DatasetDescriptor, DatasetItemMetadata, DatasetItemWebTimestamps, JobDescriptor, Keyframe,
    VideoChromaFormat, VideoCodecType,
};
pub use error::{Error, Result};
pub use lock::CatalogLock;
