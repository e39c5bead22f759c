//! The concurrent transfer connector.
//!
//! Every transfer of a batch becomes one task. With more than one configured
//! thread the tasks run on a private rayon pool inside a scope, which returns
//! only once every task has finished; otherwise they run on the caller's
//! thread. Downloads land in a temporary sibling file and are moved into
//! place only after checksum verification.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use rayon::{ThreadPool, ThreadPoolBuilder};
use repo_model::{Artifact, Maven2Layout, Metadata, RemoteRepository};
use tracing::{debug, warn};
use uuid::Uuid;

use super::events::EventSink;
use super::pool::ConnectionPool;
use super::{ConnectorError, RepositoryConnector};
use crate::checksum::{
    parse_checksum, write_checksum_file, ChecksumAlgorithm, ChecksumCalculator, ChecksumFailure,
    ChecksumPolicy, Checksums,
};
use crate::session::RepositorySystemSession;
use crate::transfer::{
    ArtifactDownload, ArtifactUpload, MetadataDownload, MetadataUpload, RequestType, Transfer,
    TransferError, TransferFailure, TransferListener, TransferResource, TransferStatus,
};
use crate::transport::{Transport, TransportError, TransportFactory};

/// Downloads are attempted at most this often when the checksum mismatches.
const MAX_TRIALS: u32 = 2;

/// Sets the interrupt flag of a [`TransferConnector`] from another thread.
#[derive(Debug, Clone)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    /// Transfers not yet started fail with [`TransferFailure::Interrupted`]
    /// and the running batch returns [`ConnectorError::Interrupted`].
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

enum Subject {
    Artifact(Artifact),
    Metadata(Metadata),
}

impl Subject {
    fn resource_name(&self) -> String {
        match self {
            Subject::Artifact(artifact) => Maven2Layout.artifact_path(artifact),
            Subject::Metadata(metadata) => Maven2Layout.metadata_path(metadata),
        }
    }

    fn error(&self, repository: &str, cause: TransferFailure) -> TransferError {
        match self {
            Subject::Artifact(artifact) => TransferError::for_artifact(artifact, repository, cause),
            Subject::Metadata(metadata) => TransferError::for_metadata(metadata, repository, cause),
        }
    }
}

/// One unit of work; owns a copy of the request and borrows its status.
struct Task<'a> {
    subject: Subject,
    file: Option<PathBuf>,
    checksum_policy: ChecksumPolicy,
    request_context: String,
    request_type: RequestType,
    status: &'a mut TransferStatus,
}

impl<'a> Task<'a> {
    fn get(
        subject: Subject,
        file: Option<PathBuf>,
        checksum_policy: ChecksumPolicy,
        request_context: String,
        status: &'a mut TransferStatus,
    ) -> Self {
        let request_type = if file.is_some() {
            RequestType::Get
        } else {
            RequestType::GetExistence
        };
        Self {
            subject,
            file,
            checksum_policy,
            request_context,
            request_type,
            status,
        }
    }

    fn put(subject: Subject, file: PathBuf, status: &'a mut TransferStatus) -> Self {
        Self {
            subject,
            file: Some(file),
            checksum_policy: ChecksumPolicy::Ignore,
            request_context: String::new(),
            request_type: RequestType::Put,
            status,
        }
    }
}

/// Feeds every written chunk into the checksum calculator.
struct DigestWriter<W> {
    inner: W,
    calculator: ChecksumCalculator,
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.calculator.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// [`RepositoryConnector`] over any [`TransportFactory`].
pub struct TransferConnector {
    repository: RemoteRepository,
    repository_label: String,
    pool: ConnectionPool,
    executor: RwLock<Option<ThreadPool>>,
    listener: Option<Arc<dyn TransferListener>>,
    checksum_algorithms: Vec<ChecksumAlgorithm>,
    closed: AtomicBool,
    interrupted: Arc<AtomicBool>,
}

impl TransferConnector {
    /// Connector for `repository`, configured from the session.
    pub fn new(
        session: &RepositorySystemSession,
        repository: RemoteRepository,
        factory: Arc<dyn TransportFactory>,
    ) -> Result<Self, ConnectorError> {
        let config = session.connector_config()?;
        if !factory.supports(&repository) {
            return Err(ConnectorError::NoConnector {
                repository: repository.to_string(),
            });
        }

        let executor = if config.threads > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .thread_name(|i| format!("repo-connector-{}", i))
                .build()
                .map_err(|e| ConnectorError::Executor(e.to_string()))?;
            Some(pool)
        } else {
            None
        };

        debug!(
            repository = %repository.id,
            threads = config.threads,
            "created transfer connector"
        );

        Ok(Self {
            repository_label: repository.to_string(),
            checksum_algorithms: config.checksum_algorithms.clone(),
            pool: ConnectionPool::new(factory, repository.clone(), config),
            repository,
            executor: RwLock::new(executor),
            listener: session.transfer_listener.clone(),
            closed: AtomicBool::new(false),
            interrupted: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn repository(&self) -> &RemoteRepository {
        &self.repository
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle(Arc::clone(&self.interrupted))
    }

    fn ensure_open(&self) -> Result<(), ConnectorError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConnectorError::Closed(self.repository.id.clone()));
        }
        Ok(())
    }

    fn run_batch(&self, tasks: Vec<Task<'_>>) -> Result<(), ConnectorError> {
        if !tasks.is_empty() {
            let executor = self.executor.read().unwrap_or_else(PoisonError::into_inner);
            match executor.as_ref() {
                Some(pool) if tasks.len() > 1 => pool.scope(|scope| {
                    for task in tasks {
                        scope.spawn(move |_| self.execute(task));
                    }
                }),
                _ => tasks.into_iter().for_each(|task| self.execute(task)),
            }
        }

        if self.interrupted.swap(false, Ordering::SeqCst) {
            return Err(ConnectorError::Interrupted);
        }
        Ok(())
    }

    fn execute(&self, task: Task<'_>) {
        let Task {
            subject,
            file,
            checksum_policy,
            request_context,
            request_type,
            status,
        } = task;

        if let Err(e) = status.start() {
            warn!(resource = %subject.resource_name(), error = %e, "skipping transfer");
            return;
        }

        let resource = TransferResource::new(&self.repository.url, subject.resource_name(), file)
            .with_request_context(request_context);
        let mut sink = EventSink::new(self.listener.as_deref(), request_type, resource);

        let outcome = match request_type {
            RequestType::Put => self.upload(&mut sink),
            _ => self.download(&subject, checksum_policy, &mut sink),
        };

        let error = match outcome {
            Ok(()) => {
                sink.succeeded();
                None
            }
            Err(cause) => {
                let error = subject.error(&self.repository_label, cause);
                debug!(error = %error, "transfer failed");
                sink.failed(&error);
                Some(error)
            }
        };

        if let Err(e) = status.finish(error) {
            warn!(error = %e, "could not record transfer outcome");
        }
    }

    fn begin(&self, sink: &mut EventSink<'_>) -> Result<(), TransferFailure> {
        sink.initiated()?;
        if self.interrupted.load(Ordering::SeqCst) {
            return Err(TransferFailure::Interrupted);
        }
        Ok(())
    }

    fn download(
        &self,
        subject: &Subject,
        policy: ChecksumPolicy,
        sink: &mut EventSink<'_>,
    ) -> Result<(), TransferFailure> {
        self.begin(sink)?;
        self.pool
            .with_connection(|transport| -> Result<(), TransferFailure> {
                match sink.resource().file.clone() {
                    None => {
                        let name = sink.resource().resource_name.clone();
                        if transport.exists(&name)? {
                            Ok(())
                        } else {
                            Err(TransportError::NotFound(name).into())
                        }
                    }
                    Some(file) => self.fetch(transport, subject, &file, policy, sink),
                }
            })?
    }

    fn fetch(
        &self,
        transport: &mut dyn Transport,
        subject: &Subject,
        file: &Path,
        policy: ChecksumPolicy,
        sink: &mut EventSink<'_>,
    ) -> Result<(), TransferFailure> {
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = sibling(file, &format!("{}.tmp", Uuid::new_v4().simple()));
        let result = self.fetch_into(transport, subject, file, &temp, policy, sink);
        if result.is_err() {
            let _ = fs::remove_file(&temp);
        }
        result
    }

    fn fetch_into(
        &self,
        transport: &mut dyn Transport,
        subject: &Subject,
        file: &Path,
        temp: &Path,
        policy: ChecksumPolicy,
        sink: &mut EventSink<'_>,
    ) -> Result<(), TransferFailure> {
        let name = sink.resource().resource_name.clone();
        let mut trial = 0;
        let verified = loop {
            trial += 1;
            let actual = self.fetch_payload(transport, &name, temp, sink)?;
            if policy == ChecksumPolicy::Ignore {
                break None;
            }
            match self.verify(transport, &name, &actual) {
                Ok(verified) => break Some(verified),
                Err(failure) if failure.is_retry_worthy() && trial < MAX_TRIALS => {
                    debug!(resource = %name, trial, error = %failure, "retrying download");
                }
                Err(failure) if policy == ChecksumPolicy::Fail => return Err(failure.into()),
                Err(failure) => {
                    warn!(resource = %name, error = %failure, "accepting unverified download");
                    let error = subject.error(&self.repository_label, failure.into());
                    sink.corrupted(&error)?;
                    break None;
                }
            }
        };

        promote(temp, file)?;

        if let Some((algorithm, checksum)) = verified {
            let path = sibling(file, algorithm.extension());
            if let Err(e) = write_checksum_file(&path, &checksum) {
                warn!(path = %path.display(), error = %e, "could not store checksum");
            }
        }
        Ok(())
    }

    fn fetch_payload(
        &self,
        transport: &mut dyn Transport,
        name: &str,
        temp: &Path,
        sink: &mut EventSink<'_>,
    ) -> Result<Checksums, TransferFailure> {
        let mut writer = DigestWriter {
            inner: BufWriter::new(File::create(temp)?),
            calculator: ChecksumCalculator::new(&self.checksum_algorithms),
        };
        transport.get(name, &mut writer, sink)?;
        writer.flush()?;
        Ok(writer.calculator.finish())
    }

    /// Compare against the first readable remote checksum, in configured
    /// algorithm order. An unreadable checksum only counts once every other
    /// algorithm has been tried.
    fn verify(
        &self,
        transport: &mut dyn Transport,
        name: &str,
        actual: &Checksums,
    ) -> Result<(ChecksumAlgorithm, String), ChecksumFailure> {
        let mut unreadable = None;
        for &algorithm in &self.checksum_algorithms {
            let path = Maven2Layout.checksum_path(name, algorithm.extension());
            let expected = match transport.get_text(&path) {
                Ok(text) => parse_checksum(&text),
                Err(TransportError::NotFound(_)) => continue,
                Err(e) => {
                    debug!(resource = %path, error = %e, "could not read checksum");
                    unreadable = Some(ChecksumFailure::Unreadable(e.to_string()));
                    continue;
                }
            };
            let expected = match expected {
                Some(expected) if expected.len() == algorithm.hex_len() => expected,
                Some(_) => {
                    unreadable = Some(ChecksumFailure::Unreadable(format!(
                        "{} does not hold a {} checksum",
                        path, algorithm
                    )));
                    continue;
                }
                None => {
                    unreadable = Some(ChecksumFailure::Unreadable(format!("{} is empty", path)));
                    continue;
                }
            };
            let actual = actual.get(&algorithm).cloned().unwrap_or_default();
            if !expected.eq_ignore_ascii_case(&actual) {
                return Err(ChecksumFailure::Mismatch {
                    algorithm,
                    expected,
                    actual,
                });
            }
            return Ok((algorithm, actual));
        }
        Err(unreadable.unwrap_or(ChecksumFailure::NotAvailable))
    }

    fn upload(&self, sink: &mut EventSink<'_>) -> Result<(), TransferFailure> {
        self.begin(sink)?;
        let file = sink
            .resource()
            .file
            .clone()
            .ok_or_else(|| TransferFailure::Io("upload without a local file".to_string()))?;
        let name = sink.resource().resource_name.clone();
        let length = fs::metadata(&file)?.len();
        let checksums = ChecksumCalculator::calculate_file(&file, &self.checksum_algorithms)?;

        self.pool.with_connection(|transport| -> Result<(), TransferFailure> {
            let mut input = File::open(&file)?;
            transport.put(&name, &mut input, length, sink)?;
            for (algorithm, checksum) in &checksums {
                let path = Maven2Layout.checksum_path(&name, algorithm.extension());
                if let Err(e) = transport.put_text(&path, checksum) {
                    warn!(resource = %path, error = %e, "could not upload checksum");
                }
            }
            Ok(())
        })?
    }
}

impl RepositoryConnector for TransferConnector {
    fn get(
        &self,
        artifact_downloads: &mut [ArtifactDownload],
        metadata_downloads: &mut [MetadataDownload],
    ) -> Result<(), ConnectorError> {
        self.ensure_open()?;
        debug!(
            repository = %self.repository.id,
            artifacts = artifact_downloads.len(),
            metadata = metadata_downloads.len(),
            "downloading"
        );

        let mut tasks = Vec::with_capacity(artifact_downloads.len() + metadata_downloads.len());
        for download in artifact_downloads.iter_mut() {
            let subject = Subject::Artifact(download.artifact.clone());
            let file = download.file.clone();
            let policy = download.checksum_policy;
            let context = download.request_context.clone();
            tasks.push(Task::get(subject, file, policy, context, download.status_mut()));
        }
        for download in metadata_downloads.iter_mut() {
            let subject = Subject::Metadata(download.metadata.clone());
            let file = download.file.clone();
            let policy = download.checksum_policy;
            let context = download.request_context.clone();
            tasks.push(Task::get(subject, file, policy, context, download.status_mut()));
        }
        self.run_batch(tasks)
    }

    fn put(
        &self,
        artifact_uploads: &mut [ArtifactUpload],
        metadata_uploads: &mut [MetadataUpload],
    ) -> Result<(), ConnectorError> {
        self.ensure_open()?;
        debug!(
            repository = %self.repository.id,
            artifacts = artifact_uploads.len(),
            metadata = metadata_uploads.len(),
            "uploading"
        );

        let mut tasks = Vec::with_capacity(artifact_uploads.len() + metadata_uploads.len());
        for upload in artifact_uploads.iter_mut() {
            let subject = Subject::Artifact(upload.artifact.clone());
            let file = upload.file.clone();
            tasks.push(Task::put(subject, file, upload.status_mut()));
        }
        for upload in metadata_uploads.iter_mut() {
            let subject = Subject::Metadata(upload.metadata.clone());
            let file = upload.file.clone();
            tasks.push(Task::put(subject, file, upload.status_mut()));
        }
        self.run_batch(tasks)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.pool.close();
        let executor = self
            .executor
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(executor);
        debug!(repository = %self.repository.id, "closed transfer connector");
    }
}

impl Drop for TransferConnector {
    fn drop(&mut self) {
        self.close();
    }
}

/// `<file>.<suffix>`
fn sibling(file: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(file.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Move the verified temp file over the destination.
fn promote(temp: &Path, file: &Path) -> io::Result<()> {
    if fs::rename(temp, file).is_ok() {
        return Ok(());
    }
    fs::copy(temp, file)?;
    fs::remove_file(temp)
}
