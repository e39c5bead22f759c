//! A single update check and its outcome.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use repo_model::RemoteRepository;

/// A failure remembered from an earlier remote check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateCheckError {
    #[error(
        "{item} was not found in {repository} during a previous attempt. This failure was \
         cached in the local repository and resolution is not reattempted until the update \
         interval of {repository_id} has elapsed or updates are forced"
    )]
    CachedNotFound {
        item: String,
        repository: String,
        repository_id: String,
    },

    #[error(
        "Failure to transfer {item} from {repository} was cached in the local repository, \
         resolution will not be reattempted until the update interval of {repository_id} \
         has elapsed or updates are forced. Original error: {error}"
    )]
    CachedTransferError {
        item: String,
        repository: String,
        repository_id: String,
        error: String,
    },
}

/// Whether an artifact or metadata needs to be fetched from a repository.
///
/// Filled in by the caller, then `required` and `error` are set by the
/// update check manager.
#[derive(Debug, Clone)]
pub struct UpdateCheck<T> {
    pub item: T,
    /// Local destination of the item.
    pub file: PathBuf,
    pub repository: RemoteRepository,
    /// Update policy string such as `daily` or `interval:30`.
    pub policy: String,
    /// Modification time of the local copy, if there is one.
    pub local_last_updated: Option<DateTime<Utc>>,
    pub required: bool,
    pub error: Option<UpdateCheckError>,
}

impl<T> UpdateCheck<T> {
    /// A check whose local timestamp is taken from `file`, if it exists.
    pub fn new(
        item: T,
        file: impl Into<PathBuf>,
        repository: RemoteRepository,
        policy: impl Into<String>,
    ) -> Self {
        let file = file.into();
        let local_last_updated = fs::metadata(&file)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        Self {
            item,
            file,
            repository,
            policy: policy.into(),
            local_last_updated,
            required: false,
            error: None,
        }
    }

    pub fn with_local_last_updated(mut self, last_updated: Option<DateTime<Utc>>) -> Self {
        self.local_last_updated = last_updated;
        self
    }
}
