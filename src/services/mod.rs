pub mod conversion;
pub mod job_repository;
pub mod query;
pub mod usage;
pub mod usage_repository;
pub mod validation;

pub use conversion::{ConversionReceipt, ConversionService};
pub use job_repository::{JobFilter, JobRepository};
pub use query::JobQueryService;
pub use usage::UsageService;
pub use usage_repository::UsageRepository;
pub use validation::RequestValidator;
