//! Domain model of the pipeline

pub mod project;
pub mod suite;
pub mod ticket;
pub mod upload;

pub use project::{Project, TestSystemCredentials, TrackerCredentials};
pub use suite::{Bucket, ClassifiedTestSuite, GeneratedSuite, GeneratedTestsRecord, GenerationSummary};
pub use ticket::{
    ContentState, Language, RefinedContent, Ticket, TicketSnapshot, TicketStatus, TrackerSync,
    REFINEMENT_ERROR_PREFIX, REFINING_PLACEHOLDER,
};
pub use upload::{BucketUpload, UploadResult, UploadSummary};
