//! Transfer requests, their lifecycle and the events they emit.
//!
//! A transfer is created by the caller in state `NEW`, driven to `ACTIVE`
//! and then `DONE` by exactly one connector task, and read back by the
//! caller once the batch has returned.

mod error;
mod event;
mod request;
mod state;

pub use error::{TransferError, TransferFailure};
pub use event::{
    RequestType, TransferCancelled, TransferEvent, TransferEventType, TransferListener,
    TransferResource,
};
pub use request::{ArtifactDownload, ArtifactUpload, MetadataDownload, MetadataUpload, Transfer};
pub use state::{TransferState, TransferStateError, TransferStatus};
