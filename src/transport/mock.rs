//! In-memory repository for testing
//!
//! A [`MockRepository`] is shared by every [`MockTransport`] opened from its
//! factory, so tests can seed resources, inject failures per resource and
//! inspect connection and concurrency counters afterwards.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use repo_model::RemoteRepository;

use super::{pump, TransferMonitor, Transport, TransportError, TransportFactory};
use crate::config::ConnectorConfig;

/// Failure configuration for a resource
#[derive(Debug, Clone)]
pub struct MockFailure {
    /// Error to return
    pub error: TransportError,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
    calls: u32,
}

impl MockFailure {
    pub fn new(error: TransportError) -> Self {
        Self {
            error,
            fail_count: None,
            calls: 0,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    resources: HashMap<String, Vec<u8>>,
    failures: HashMap<String, MockFailure>,
    connect_failure: Option<TransportError>,
    connect_latency: Option<Duration>,
    latency: Option<Duration>,
    user_agents: Vec<String>,
}

#[derive(Debug, Default)]
struct MockStats {
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    gets: AtomicUsize,
    puts: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

/// Shared state behind all transports of one mock repository.
#[derive(Debug, Clone, Default)]
pub struct MockRepository {
    state: Arc<Mutex<MockState>>,
    stats: Arc<MockStats>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, resource: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.state().resources.insert(resource.into(), content.into());
    }

    pub fn remove(&self, resource: &str) -> Option<Vec<u8>> {
        self.state().resources.remove(resource)
    }

    pub fn content(&self, resource: &str) -> Option<Vec<u8>> {
        self.state().resources.get(resource).cloned()
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.state().resources.contains_key(resource)
    }

    /// Fail every access to `resource` with the given config.
    pub fn inject_failure(&self, resource: impl Into<String>, failure: MockFailure) {
        self.state().failures.insert(resource.into(), failure);
    }

    pub fn inject_error(&self, resource: impl Into<String>, error: TransportError) {
        self.inject_failure(resource, MockFailure::new(error));
    }

    /// Make every `connect` fail.
    pub fn fail_connect(&self, error: TransportError) {
        self.state().connect_failure = Some(error);
    }

    /// Delay every payload transfer. A delay beyond the transport's request
    /// timeout fails the transfer with [`TransportError::ConnectionTimeout`].
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = Some(latency);
    }

    /// Delay every `connect`, bounded by the connect timeout.
    pub fn set_connect_latency(&self, latency: Duration) {
        self.state().connect_latency = Some(latency);
    }

    /// User agents announced by successful connects, in order.
    pub fn user_agents(&self) -> Vec<String> {
        self.state().user_agents.clone()
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.failures.clear();
        state.connect_failure = None;
    }

    pub fn connects(&self) -> usize {
        self.stats.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.stats.disconnects.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.stats.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.stats.puts.load(Ordering::SeqCst)
    }

    /// Highest number of payload transfers observed in flight at once.
    pub fn max_concurrent(&self) -> usize {
        self.stats.max_active.load(Ordering::SeqCst)
    }

    pub fn factory(&self) -> MockTransportFactory {
        MockTransportFactory {
            repository: self.clone(),
        }
    }

    fn check_failure(&self, resource: &str) -> Result<(), TransportError> {
        let mut state = self.state();
        let Some(failure) = state.failures.get_mut(resource) else {
            return Ok(());
        };
        failure.calls += 1;
        match failure.fail_count {
            Some(limit) if failure.calls > limit => Ok(()),
            _ => Err(failure.error.clone()),
        }
    }

    /// Track one in-flight payload transfer for the duration of `f`.
    fn in_flight<T>(
        &self,
        timeout: Duration,
        f: impl FnOnce() -> Result<T, TransportError>,
    ) -> Result<T, TransportError> {
        let active = self.stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_active.fetch_max(active, Ordering::SeqCst);
        let latency = self.state().latency;
        let result = wait(latency, timeout).and_then(|()| f());
        self.stats.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Sleep for `latency`, giving up with a timeout once it exceeds `timeout`.
fn wait(latency: Option<Duration>, timeout: Duration) -> Result<(), TransportError> {
    match latency {
        Some(latency) if latency > timeout => {
            thread::sleep(timeout);
            Err(TransportError::ConnectionTimeout)
        }
        Some(latency) => {
            thread::sleep(latency);
            Ok(())
        }
        None => Ok(()),
    }
}

/// One connection to a [`MockRepository`].
#[derive(Debug)]
pub struct MockTransport {
    repository: MockRepository,
    connected: bool,
    connect_timeout: Duration,
    request_timeout: Duration,
    user_agent: String,
}

impl MockTransport {
    pub fn new(repository: MockRepository) -> Self {
        Self::with_config(repository, &ConnectorConfig::default())
    }

    /// Transport honouring the timeouts and user agent of `config`.
    pub fn with_config(repository: MockRepository, config: &ConnectorConfig) -> Self {
        Self {
            repository,
            connected: false,
            connect_timeout: config.connect_timeout,
            request_timeout: config.request_timeout,
            user_agent: config.user_agent.clone(),
        }
    }

    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.connected {
            Ok(())
        } else {
            Err(TransportError::ConnectionFailed("not connected".to_string()))
        }
    }
}

impl Transport for MockTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        let (failure, latency) = {
            let state = self.repository.state();
            (state.connect_failure.clone(), state.connect_latency)
        };
        if let Some(error) = failure {
            return Err(error);
        }
        wait(latency, self.connect_timeout)?;
        self.repository
            .state()
            .user_agents
            .push(self.user_agent.clone());
        self.repository.stats.connects.fetch_add(1, Ordering::SeqCst);
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.repository.stats.disconnects.fetch_add(1, Ordering::SeqCst);
        }
        self.connected = false;
    }

    fn exists(&mut self, resource: &str) -> Result<bool, TransportError> {
        self.ensure_connected()?;
        self.repository.check_failure(resource)?;
        Ok(self.repository.contains(resource))
    }

    fn get(
        &mut self,
        resource: &str,
        out: &mut dyn Write,
        monitor: &mut dyn TransferMonitor,
    ) -> Result<u64, TransportError> {
        self.ensure_connected()?;
        self.repository.stats.gets.fetch_add(1, Ordering::SeqCst);
        self.repository.in_flight(self.request_timeout, || {
            self.repository.check_failure(resource)?;
            let content = self
                .repository
                .content(resource)
                .ok_or_else(|| TransportError::NotFound(resource.to_string()))?;
            monitor.started(Some(content.len() as u64))?;
            pump(&mut content.as_slice(), out, monitor)
        })
    }

    fn put(
        &mut self,
        resource: &str,
        input: &mut dyn Read,
        length: u64,
        monitor: &mut dyn TransferMonitor,
    ) -> Result<(), TransportError> {
        self.ensure_connected()?;
        self.repository.stats.puts.fetch_add(1, Ordering::SeqCst);
        self.repository.in_flight(self.request_timeout, || {
            self.repository.check_failure(resource)?;
            monitor.started(Some(length))?;
            let mut content = Vec::new();
            pump(input, &mut content, monitor)?;
            self.repository.insert(resource, content);
            Ok(())
        })
    }
}

/// Opens [`MockTransport`]s on a shared [`MockRepository`], for any URL.
#[derive(Debug, Clone, Default)]
pub struct MockTransportFactory {
    repository: MockRepository,
}

impl MockTransportFactory {
    pub fn repository(&self) -> &MockRepository {
        &self.repository
    }
}

impl TransportFactory for MockTransportFactory {
    fn supports(&self, _repository: &RemoteRepository) -> bool {
        true
    }

    fn new_transport(
        &self,
        _repository: &RemoteRepository,
        config: &ConnectorConfig,
    ) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(MockTransport::with_config(
            self.repository.clone(),
            config,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected(repository: &MockRepository) -> MockTransport {
        let mut transport = MockTransport::new(repository.clone());
        transport.connect().unwrap();
        transport
    }

    #[test]
    fn test_shared_store() {
        let repository = MockRepository::new();
        let mut writer = connected(&repository);
        let mut reader = connected(&repository);

        writer.put_text("x.txt", "payload").unwrap();
        assert_eq!(reader.get_text("x.txt").unwrap(), "payload");
        assert_eq!(repository.connects(), 2);
        assert_eq!(repository.puts(), 1);
        assert_eq!(repository.gets(), 1);
    }

    #[test]
    fn test_fail_count_then_succeed() {
        let repository = MockRepository::new();
        repository.insert("x.txt", "ok");
        repository.inject_failure(
            "x.txt",
            MockFailure::new(TransportError::ConnectionTimeout).with_fail_count(2),
        );
        let mut transport = connected(&repository);

        assert_eq!(
            transport.get_text("x.txt"),
            Err(TransportError::ConnectionTimeout)
        );
        assert_eq!(
            transport.get_text("x.txt"),
            Err(TransportError::ConnectionTimeout)
        );
        assert_eq!(transport.get_text("x.txt").unwrap(), "ok");
    }

    #[test]
    fn test_connect_failure() {
        let repository = MockRepository::new();
        repository.fail_connect(TransportError::ConnectionFailed("refused".into()));

        let mut transport = MockTransport::new(repository.clone());
        assert!(transport.connect().is_err());
        assert!(!transport.is_connected());

        repository.clear_failures();
        transport.connect().unwrap();
        transport.disconnect();
        assert_eq!(repository.disconnects(), 1);
    }

    #[test]
    fn test_request_timeout() {
        let repository = MockRepository::new();
        repository.insert("x.txt", "slow");
        repository.set_latency(Duration::from_millis(200));
        let config = ConnectorConfig {
            request_timeout: Duration::from_millis(20),
            user_agent: "test-agent/1.0".to_string(),
            ..ConnectorConfig::default()
        };
        let mut transport = MockTransport::with_config(repository.clone(), &config);
        transport.connect().unwrap();

        assert_eq!(
            transport.get_text("x.txt"),
            Err(TransportError::ConnectionTimeout)
        );
        assert_eq!(repository.user_agents(), ["test-agent/1.0"]);
    }

    #[test]
    fn test_connect_timeout() {
        let repository = MockRepository::new();
        repository.set_connect_latency(Duration::from_millis(200));
        let config = ConnectorConfig {
            connect_timeout: Duration::from_millis(20),
            ..ConnectorConfig::default()
        };
        let mut transport = MockTransport::with_config(repository.clone(), &config);

        assert_eq!(transport.connect(), Err(TransportError::ConnectionTimeout));
        assert!(!transport.is_connected());
        assert_eq!(repository.connects(), 0);
    }

    #[test]
    fn test_missing_resource() {
        let repository = MockRepository::new();
        let mut transport = connected(&repository);
        assert!(!transport.exists("nope").unwrap());
        assert_eq!(
            transport.get_text("nope"),
            Err(TransportError::NotFound("nope".to_string()))
        );
    }
}
