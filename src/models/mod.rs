pub mod identity;
pub mod job;
pub mod payload;
pub mod usage;

pub use identity::Identity;
pub use job::{ConversionJob, ConversionType, JobStatus};
pub use payload::{ConversionInput, ConversionOutput, SubmitRequest};
pub use usage::{UsageReport, UsageStat, UsageSummary};
