//! Transfer events and listeners.
//!
//! Each transfer produces one ordered stream: `INITIATED`, `STARTED`, zero or
//! more `PROGRESSED`, then `SUCCEEDED` or `FAILED`. `CORRUPTED` may appear
//! before the terminal event when a checksum could not be verified.

use std::path::PathBuf;

use super::TransferError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferEventType {
    Initiated,
    Started,
    Progressed,
    Corrupted,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    /// Download of a payload
    Get,
    /// Existence check without a payload
    GetExistence,
    /// Upload
    Put,
}

/// What is being transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResource {
    pub repository_url: String,
    /// Path relative to the repository root.
    pub resource_name: String,
    /// Local file, if any.
    pub file: Option<PathBuf>,
    /// Total size once known.
    pub content_length: Option<u64>,
    pub request_context: String,
}

impl TransferResource {
    pub fn new(
        repository_url: impl Into<String>,
        resource_name: impl Into<String>,
        file: Option<PathBuf>,
    ) -> Self {
        Self {
            repository_url: repository_url.into(),
            resource_name: resource_name.into(),
            file,
            content_length: None,
            request_context: String::new(),
        }
    }

    pub fn with_request_context(mut self, context: impl Into<String>) -> Self {
        self.request_context = context.into();
        self
    }
}

/// One notification about a transfer.
#[derive(Debug, Clone)]
pub struct TransferEvent<'a> {
    pub event_type: TransferEventType,
    pub request_type: RequestType,
    pub resource: &'a TransferResource,
    /// Bytes transferred so far.
    pub transferred_bytes: u64,
    /// The chunk just transferred (`PROGRESSED` only).
    pub data: &'a [u8],
    /// Set for `CORRUPTED` and `FAILED`.
    pub error: Option<&'a TransferError>,
}

/// Veto raised by a listener.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Transfer cancelled: {0}")]
pub struct TransferCancelled(pub String);

/// Receives transfer events, possibly from several threads at once.
///
/// Returning an error from the initiated, started, progressed or corrupted
/// callbacks cancels the transfer; it then fails with
/// [`TransferFailure::Cancelled`](super::TransferFailure::Cancelled).
pub trait TransferListener: Send + Sync {
    fn transfer_initiated(&self, _event: &TransferEvent<'_>) -> Result<(), TransferCancelled> {
        Ok(())
    }

    fn transfer_started(&self, _event: &TransferEvent<'_>) -> Result<(), TransferCancelled> {
        Ok(())
    }

    fn transfer_progressed(&self, _event: &TransferEvent<'_>) -> Result<(), TransferCancelled> {
        Ok(())
    }

    fn transfer_corrupted(&self, _event: &TransferEvent<'_>) -> Result<(), TransferCancelled> {
        Ok(())
    }

    fn transfer_succeeded(&self, _event: &TransferEvent<'_>) {}

    fn transfer_failed(&self, _event: &TransferEvent<'_>) {}
}
