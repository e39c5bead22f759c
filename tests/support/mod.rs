//! Shared helpers for the connector and resolution tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use repo_client::checksum::{ChecksumAlgorithm, ChecksumCalculator};
use repo_client::transfer::{TransferCancelled, TransferEvent, TransferEventType};
use repo_client::{MockRepository, RepositorySystemSession, TransferListener};

/// One observed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub event_type: TransferEventType,
    pub resource: String,
    pub error: Option<String>,
}

/// Listener that records every event and can veto one resource.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Recorded>>,
    veto_on_start: Option<String>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Cancel transfers of `resource` when they start.
    pub fn vetoing(resource: &str) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            veto_on_start: Some(resource.to_string()),
        })
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_for(&self, resource: &str) -> Vec<TransferEventType> {
        self.events()
            .into_iter()
            .filter(|e| e.resource == resource)
            .map(|e| e.event_type)
            .collect()
    }

    pub fn count(&self, event_type: TransferEventType) -> usize {
        self.events()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    fn record(&self, event: &TransferEvent<'_>) {
        self.events.lock().unwrap().push(Recorded {
            event_type: event.event_type,
            resource: event.resource.resource_name.clone(),
            error: event.error.map(|e| e.to_string()),
        });
    }
}

impl TransferListener for RecordingListener {
    fn transfer_initiated(&self, event: &TransferEvent<'_>) -> Result<(), TransferCancelled> {
        self.record(event);
        Ok(())
    }

    fn transfer_started(&self, event: &TransferEvent<'_>) -> Result<(), TransferCancelled> {
        self.record(event);
        if self.veto_on_start.as_deref() == Some(event.resource.resource_name.as_str()) {
            return Err(TransferCancelled("vetoed by listener".to_string()));
        }
        Ok(())
    }

    fn transfer_progressed(&self, event: &TransferEvent<'_>) -> Result<(), TransferCancelled> {
        self.record(event);
        Ok(())
    }

    fn transfer_corrupted(&self, event: &TransferEvent<'_>) -> Result<(), TransferCancelled> {
        self.record(event);
        Ok(())
    }

    fn transfer_succeeded(&self, event: &TransferEvent<'_>) {
        self.record(event);
    }

    fn transfer_failed(&self, event: &TransferEvent<'_>) {
        self.record(event);
    }
}

/// Hex digest of `data`.
pub fn digest(data: &[u8], algorithm: ChecksumAlgorithm) -> String {
    ChecksumCalculator::calculate_bytes(data, &[algorithm])
        .remove(&algorithm)
        .unwrap()
}

/// Store `content` at `resource` with correct `.sha1` and `.md5` side-files.
pub fn publish(repository: &MockRepository, resource: &str, content: &[u8]) {
    repository.insert(resource, content.to_vec());
    repository.insert(
        format!("{}.sha1", resource),
        digest(content, ChecksumAlgorithm::Sha1),
    );
    repository.insert(
        format!("{}.md5", resource),
        digest(content, ChecksumAlgorithm::Md5),
    );
}

/// Session over a temporary local repository with the given worker count.
pub fn session(local: &std::path::Path, threads: u64) -> RepositorySystemSession {
    RepositorySystemSession::new(local).with_config_property("connector.threads.max", threads)
}
