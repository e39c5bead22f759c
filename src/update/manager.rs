//! Decides whether remote resources need to be fetched again.

use std::fmt;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use repo_model::{Artifact, Metadata};
use tracing::{debug, warn};

use super::tracking::{artifact_tracking_path, metadata_tracking_path, TrackingEntry, TrackingFile};
use super::{UpdateCheck, UpdateCheckError, UpdatePolicy};
use crate::session::RepositorySystemSession;
use crate::transfer::TransferError;

/// Policy collaborator of the resolution flow.
pub trait UpdateCheckManager: Send + Sync {
    /// Set `required` and possibly a cached `error` on the check.
    fn check_artifact(&self, session: &RepositorySystemSession, check: &mut UpdateCheck<Artifact>);

    fn check_metadata(&self, session: &RepositorySystemSession, check: &mut UpdateCheck<Metadata>);

    /// Record that the remote was just consulted, with its outcome.
    fn touch_artifact(
        &self,
        session: &RepositorySystemSession,
        check: &UpdateCheck<Artifact>,
        error: Option<&TransferError>,
    );

    fn touch_metadata(
        &self,
        session: &RepositorySystemSession,
        check: &UpdateCheck<Metadata>,
        error: Option<&TransferError>,
    );

    /// Whichever of the two policies refreshes more often.
    fn effective_update_policy(
        &self,
        session: &RepositorySystemSession,
        policy1: &str,
        policy2: &str,
    ) -> String;
}

/// Tracking-file backed [`UpdateCheckManager`].
#[derive(Debug, Default)]
pub struct DefaultUpdateCheckManager {
    /// Serializes read-modify-write of tracking files.
    lock: Mutex<()>,
}

impl DefaultUpdateCheckManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, path: &Path) -> TrackingFile {
        TrackingFile::read(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "ignoring unreadable tracking file");
            TrackingFile::default()
        })
    }

    fn evaluate<T: fmt::Display>(
        &self,
        session: &RepositorySystemSession,
        check: &mut UpdateCheck<T>,
        tracking_path: &Path,
        key: &str,
    ) {
        check.required = false;
        check.error = None;

        let policy = UpdatePolicy::parse(&check.policy);
        let now = Utc::now();

        if let Some(local) = check.local_last_updated {
            if !policy.is_update_required(local, now) {
                debug!(item = %check.item, %policy, "local copy is up to date");
                return;
            }
        }

        let Some(entry) = self.read(tracking_path).get(key).cloned() else {
            check.required = true;
            return;
        };

        if session.data().is_checked(&update_key(check)) {
            check.error = entry.error.as_deref().map(|error| cached_error(check, error));
            return;
        }

        if policy.is_update_required(entry.last_updated, now) {
            check.required = true;
            return;
        }

        if check.file.exists() {
            return;
        }

        let error = entry.error.unwrap_or_default();
        let errors = &session.resolution_error_policy;
        let cached = if error.is_empty() {
            errors.cache_not_found
        } else {
            errors.cache_transfer_errors
        };
        if cached {
            debug!(item = %check.item, "using cached failure");
            check.error = Some(cached_error(check, &error));
        } else {
            check.required = true;
        }
    }

    fn touch<T>(
        &self,
        session: &RepositorySystemSession,
        check: &UpdateCheck<T>,
        tracking_path: &Path,
        key: &str,
        error: Option<&TransferError>,
    ) {
        let error = error.map(|e| {
            if e.is_not_found() {
                String::new()
            } else {
                e.to_string()
            }
        });

        {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut tracking = self.read(tracking_path);
            tracking.record(
                key,
                TrackingEntry {
                    last_updated: Utc::now(),
                    error,
                },
            );
            if let Err(e) = tracking.write(tracking_path) {
                warn!(path = %tracking_path.display(), error = %e, "could not write tracking file");
            }
        }

        session.data().mark_checked(update_key(check));
    }
}

impl UpdateCheckManager for DefaultUpdateCheckManager {
    fn check_artifact(&self, session: &RepositorySystemSession, check: &mut UpdateCheck<Artifact>) {
        let path = artifact_tracking_path(&check.file);
        let key = check.repository.url.clone();
        self.evaluate(session, check, &path, &key);
    }

    fn check_metadata(&self, session: &RepositorySystemSession, check: &mut UpdateCheck<Metadata>) {
        let path = metadata_tracking_path(&check.file);
        let key = metadata_key(check);
        self.evaluate(session, check, &path, &key);
    }

    fn touch_artifact(
        &self,
        session: &RepositorySystemSession,
        check: &UpdateCheck<Artifact>,
        error: Option<&TransferError>,
    ) {
        let path = artifact_tracking_path(&check.file);
        self.touch(session, check, &path, &check.repository.url, error);
    }

    fn touch_metadata(
        &self,
        session: &RepositorySystemSession,
        check: &UpdateCheck<Metadata>,
        error: Option<&TransferError>,
    ) {
        let path = metadata_tracking_path(&check.file);
        self.touch(session, check, &path, &metadata_key(check), error);
    }

    fn effective_update_policy(
        &self,
        _session: &RepositorySystemSession,
        policy1: &str,
        policy2: &str,
    ) -> String {
        UpdatePolicy::parse(policy1)
            .effective(UpdatePolicy::parse(policy2))
            .to_string()
    }
}

/// Identifies one (file, repository) pair within a session.
fn update_key<T>(check: &UpdateCheck<T>) -> String {
    format!("{}|{}", check.file.display(), check.repository.url)
}

fn metadata_key(check: &UpdateCheck<Metadata>) -> String {
    let name = check
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}/{}", name, check.repository.url)
}

fn cached_error<T: fmt::Display>(check: &UpdateCheck<T>, error: &str) -> UpdateCheckError {
    if error.is_empty() {
        UpdateCheckError::CachedNotFound {
            item: check.item.to_string(),
            repository: check.repository.url.clone(),
            repository_id: check.repository.id.clone(),
        }
    } else {
        UpdateCheckError::CachedTransferError {
            item: check.item.to_string(),
            repository: check.repository.url.clone(),
            repository_id: check.repository.id.clone(),
            error: error.to_string(),
        }
    }
}
