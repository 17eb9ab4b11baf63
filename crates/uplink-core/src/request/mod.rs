//! One logical upload request: descriptor, caller handlers and the attempt loop.

mod descriptor;
mod single;

pub use descriptor::{RequestDescriptor, ServerSource, UploadContext};
pub use single::{
    Completion, CompleteHandler, ProgressHandler, RequestHandlers, RetryPredicate, SingleRequest,
};
