//! Transport layer for repository access
//!
//! Abstracts the wire protocol so the connector can be tested in-process:
//! - Transport trait: one connection handle to a repository
//! - TransportFactory: opens handles for repositories it supports
//! - FileTransport: `file:` repositories
//! - MockTransport: in-memory repository for tests

mod file;
mod mock;

pub use file::{FileTransport, FileTransportFactory};
pub use mock::{MockFailure, MockRepository, MockTransport, MockTransportFactory};

use std::io::{self, Read, Write};

use repo_model::RemoteRepository;

use crate::config::ConnectorConfig;
use crate::transfer::TransferCancelled;

/// Chunk size used when streaming payloads.
pub const BUFFER_SIZE: usize = 16 * 1024;

/// Progress callbacks from a transport; an error aborts the transfer.
pub trait TransferMonitor {
    fn started(&mut self, content_length: Option<u64>) -> Result<(), TransferCancelled>;

    fn progressed(&mut self, data: &[u8]) -> Result<(), TransferCancelled>;
}

/// Monitor that accepts everything.
#[derive(Debug, Default)]
pub struct NoopMonitor;

impl TransferMonitor for NoopMonitor {
    fn started(&mut self, _content_length: Option<u64>) -> Result<(), TransferCancelled> {
        Ok(())
    }

    fn progressed(&mut self, _data: &[u8]) -> Result<(), TransferCancelled> {
        Ok(())
    }
}

/// A connection to one repository. Not shared between threads while in use.
pub trait Transport: Send {
    fn connect(&mut self) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    fn disconnect(&mut self);

    /// Whether the resource exists remotely.
    fn exists(&mut self, resource: &str) -> Result<bool, TransportError>;

    /// Stream a resource into `out`, returning the number of bytes written.
    fn get(
        &mut self,
        resource: &str,
        out: &mut dyn Write,
        monitor: &mut dyn TransferMonitor,
    ) -> Result<u64, TransportError>;

    /// Fetch a small text resource such as a checksum file.
    fn get_text(&mut self, resource: &str) -> Result<String, TransportError> {
        let mut buffer = Vec::new();
        self.get(resource, &mut buffer, &mut NoopMonitor)?;
        String::from_utf8(buffer)
            .map_err(|e| TransportError::Protocol(format!("{} is not UTF-8: {}", resource, e)))
    }

    /// Store `length` bytes read from `input`.
    fn put(
        &mut self,
        resource: &str,
        input: &mut dyn Read,
        length: u64,
        monitor: &mut dyn TransferMonitor,
    ) -> Result<(), TransportError>;

    fn put_text(&mut self, resource: &str, text: &str) -> Result<(), TransportError> {
        let bytes = text.as_bytes();
        self.put(resource, &mut &bytes[..], bytes.len() as u64, &mut NoopMonitor)
    }
}

/// Opens transports for the repositories it supports.
pub trait TransportFactory: Send + Sync {
    fn supports(&self, repository: &RemoteRepository) -> bool;

    fn new_transport(
        &self,
        repository: &RemoteRepository,
        config: &ConnectorConfig,
    ) -> Result<Box<dyn Transport>, TransportError>;
}

/// Transport errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Transfer cancelled: {0}")]
    Cancelled(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unsupported repository: {0}")]
    Unsupported(String),
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        TransportError::Io(e.to_string())
    }
}

impl From<TransferCancelled> for TransportError {
    fn from(e: TransferCancelled) -> Self {
        TransportError::Cancelled(e.0)
    }
}

/// Copy `input` to `out` in chunks, reporting each chunk to the monitor.
pub(crate) fn pump(
    input: &mut dyn Read,
    out: &mut dyn Write,
    monitor: &mut dyn TransferMonitor,
) -> Result<u64, TransportError> {
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let read = match input.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        out.write_all(&buffer[..read])?;
        total += read as u64;
        monitor.progressed(&buffer[..read])?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingMonitor {
        chunks: usize,
        limit: usize,
    }

    impl TransferMonitor for CountingMonitor {
        fn started(&mut self, _content_length: Option<u64>) -> Result<(), TransferCancelled> {
            Ok(())
        }

        fn progressed(&mut self, _data: &[u8]) -> Result<(), TransferCancelled> {
            self.chunks += 1;
            if self.chunks > self.limit {
                return Err(TransferCancelled("enough".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_pump_reports_chunks() {
        let data = vec![1u8; BUFFER_SIZE * 2 + 10];
        let mut out = Vec::new();
        let mut monitor = CountingMonitor { chunks: 0, limit: 10 };

        let copied = pump(&mut &data[..], &mut out, &mut monitor).unwrap();
        assert_eq!(copied, data.len() as u64);
        assert_eq!(out, data);
        assert_eq!(monitor.chunks, 3);
    }

    #[test]
    fn test_pump_stops_on_veto() {
        let data = vec![1u8; BUFFER_SIZE * 4];
        let mut out = Vec::new();
        let mut monitor = CountingMonitor { chunks: 0, limit: 1 };

        let err = pump(&mut &data[..], &mut out, &mut monitor).unwrap_err();
        assert_eq!(err, TransportError::Cancelled("enough".to_string()));
        assert_eq!(out.len(), BUFFER_SIZE * 2);
    }
}
