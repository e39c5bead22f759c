//! Lock-free pool of transport connections.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::queue::SegQueue;
use repo_model::RemoteRepository;
use tracing::debug;

use crate::config::ConnectorConfig;
use crate::transport::{Transport, TransportError, TransportFactory};

/// Idle connections to one repository.
///
/// A connection is taken out of the queue for the duration of one use, so
/// no two tasks ever share one. An empty pool opens a new connection rather
/// than waiting.
pub struct ConnectionPool {
    idle: SegQueue<Box<dyn Transport>>,
    factory: Arc<dyn TransportFactory>,
    repository: RemoteRepository,
    config: ConnectorConfig,
    closed: AtomicBool,
}

impl ConnectionPool {
    pub fn new(
        factory: Arc<dyn TransportFactory>,
        repository: RemoteRepository,
        config: ConnectorConfig,
    ) -> Self {
        Self {
            idle: SegQueue::new(),
            factory,
            repository,
            config,
            closed: AtomicBool::new(false),
        }
    }

    /// Run `f` with a connected transport and hand it back afterwards.
    pub fn with_connection<R>(
        &self,
        f: impl FnOnce(&mut dyn Transport) -> R,
    ) -> Result<R, TransportError> {
        let mut transport = self.acquire()?;
        let result = f(transport.as_mut());
        self.release(transport);
        Ok(result)
    }

    fn acquire(&self) -> Result<Box<dyn Transport>, TransportError> {
        let mut transport = match self.idle.pop() {
            Some(transport) => transport,
            None => {
                debug!(repository = %self.repository.id, "opening connection");
                self.factory.new_transport(&self.repository, &self.config)?
            }
        };
        if !transport.is_connected() {
            transport.disconnect();
            transport.connect()?;
        }
        Ok(transport)
    }

    fn release(&self, mut transport: Box<dyn Transport>) {
        if self.closed.load(Ordering::SeqCst) {
            transport.disconnect();
        } else {
            self.idle.push(transport);
        }
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Disconnect every idle connection; later releases disconnect immediately.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let mut drained = 0;
        while let Some(mut transport) = self.idle.pop() {
            transport.disconnect();
            drained += 1;
        }
        debug!(repository = %self.repository.id, drained, "closed connection pool");
    }
}
