//! Transport for `file:` repositories.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use repo_model::RemoteRepository;
use tracing::debug;

use super::{pump, TransferMonitor, Transport, TransportError, TransportFactory};
use crate::config::ConnectorConfig;

/// Reads and writes resources below a base directory.
#[derive(Debug)]
pub struct FileTransport {
    basedir: PathBuf,
    connected: bool,
}

impl FileTransport {
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        Self {
            basedir: basedir.into(),
            connected: false,
        }
    }

    /// Transport for a `file:` URL (`file:/repo`, `file:///repo`, `file://host/repo`).
    pub fn from_url(url: &str) -> Result<Self, TransportError> {
        file_url_to_path(url)
            .map(Self::new)
            .ok_or_else(|| TransportError::Unsupported(url.to_string()))
    }

    pub fn basedir(&self) -> &Path {
        &self.basedir
    }

    fn resolve(&self, resource: &str) -> Result<PathBuf, TransportError> {
        if !self.connected {
            return Err(TransportError::ConnectionFailed(format!(
                "{} is not connected",
                self.basedir.display()
            )));
        }
        Ok(self.basedir.join(resource))
    }
}

fn file_url_to_path(url: &str) -> Option<PathBuf> {
    let (scheme, rest) = url.split_once(':')?;
    if !scheme.eq_ignore_ascii_case("file") {
        return None;
    }
    let path = match rest.strip_prefix("//") {
        Some(authority_and_path) => &authority_and_path[authority_and_path.find('/')?..],
        None => rest,
    };
    Some(PathBuf::from(path))
}

fn not_found_or(e: io::Error, resource: &str) -> TransportError {
    if e.kind() == io::ErrorKind::NotFound {
        TransportError::NotFound(resource.to_string())
    } else {
        e.into()
    }
}

impl Transport for FileTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        debug!(basedir = %self.basedir.display(), "opening file transport");
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn exists(&mut self, resource: &str) -> Result<bool, TransportError> {
        Ok(self.resolve(resource)?.is_file())
    }

    fn get(
        &mut self,
        resource: &str,
        out: &mut dyn Write,
        monitor: &mut dyn TransferMonitor,
    ) -> Result<u64, TransportError> {
        let path = self.resolve(resource)?;
        let mut file = File::open(&path).map_err(|e| not_found_or(e, resource))?;
        let length = file.metadata().ok().map(|m| m.len());
        monitor.started(length)?;
        pump(&mut file, out, monitor)
    }

    fn put(
        &mut self,
        resource: &str,
        input: &mut dyn Read,
        length: u64,
        monitor: &mut dyn TransferMonitor,
    ) -> Result<(), TransportError> {
        let path = self.resolve(resource)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        monitor.started(Some(length))?;
        let mut file = File::create(&path)?;
        pump(input, &mut file, monitor)?;
        file.flush()?;
        Ok(())
    }
}

/// Opens [`FileTransport`]s for `file:` repositories.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransportFactory;

impl TransportFactory for FileTransportFactory {
    fn supports(&self, repository: &RemoteRepository) -> bool {
        repository.protocol() == "file"
    }

    fn new_transport(
        &self,
        repository: &RemoteRepository,
        _config: &ConnectorConfig,
    ) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(FileTransport::from_url(&repository.url)?))
    }
}
