//! Update check tests
//!
//! Exercises the tracking-file backed update check manager across sessions:
//! policies, cached not-found and transfer failures, and per-session checks.

use std::path::Path;

use chrono::{Duration, Utc};
use repo_client::repo_model::{Artifact, Metadata, MetadataNature, RemoteRepository};
use repo_client::transfer::TransferFailure;
use repo_client::update::{
    artifact_tracking_path, metadata_tracking_path, TrackingEntry, TrackingFile, UpdateCheckError,
};
use repo_client::{
    DefaultUpdateCheckManager, RepositorySystemSession, ResolutionErrorPolicy, TransferError,
    TransportError, UpdateCheck, UpdateCheckManager,
};
use tempfile::TempDir;

fn lib() -> Artifact {
    Artifact::new("org.example", "lib", "jar", "1.0")
}

fn central() -> RemoteRepository {
    RemoteRepository::new("central", "file:///remote/central")
}

fn check(dir: &Path, policy: &str) -> UpdateCheck<Artifact> {
    UpdateCheck::new(lib(), dir.join("lib-1.0.jar"), central(), policy)
}

fn not_found() -> TransferError {
    TransferError::ArtifactNotFound {
        artifact: lib(),
        repository: central().to_string(),
    }
}

fn timeout() -> TransferError {
    TransferError::for_artifact(
        &lib(),
        &central().to_string(),
        TransferFailure::Transport(TransportError::ConnectionTimeout),
    )
}

// =============================================================================
// Artifacts
// =============================================================================

#[test]
fn test_first_check_is_required() {
    let dir = TempDir::new().unwrap();
    let session = RepositorySystemSession::new(dir.path());
    let manager = DefaultUpdateCheckManager::new();

    let mut check = check(dir.path(), "daily");
    manager.check_artifact(&session, &mut check);

    assert!(check.required);
    assert!(check.error.is_none());
}

#[test]
fn test_fresh_local_copy_is_not_rechecked() {
    let dir = TempDir::new().unwrap();
    let session = RepositorySystemSession::new(dir.path());
    let manager = DefaultUpdateCheckManager::new();

    let mut check = check(dir.path(), "daily").with_local_last_updated(Some(Utc::now()));
    manager.check_artifact(&session, &mut check);

    assert!(!check.required);
}

#[test]
fn test_not_found_is_cached_across_sessions() {
    let dir = TempDir::new().unwrap();
    let manager = DefaultUpdateCheckManager::new();

    let first = RepositorySystemSession::new(dir.path());
    manager.touch_artifact(&first, &check(dir.path(), "daily"), Some(&not_found()));
    assert!(artifact_tracking_path(&dir.path().join("lib-1.0.jar")).exists());

    let second = RepositorySystemSession::new(dir.path());
    let mut check = check(dir.path(), "daily");
    manager.check_artifact(&second, &mut check);

    assert!(!check.required);
    match check.error {
        Some(UpdateCheckError::CachedNotFound {
            ref item,
            ref repository_id,
            ..
        }) => {
            assert_eq!(item, "org.example:lib:jar:1.0");
            assert_eq!(repository_id, "central");
        }
        ref other => panic!("expected cached not-found, got {:?}", other),
    }
}

#[test]
fn test_not_found_caching_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let manager = DefaultUpdateCheckManager::new();
    manager.touch_artifact(
        &RepositorySystemSession::new(dir.path()),
        &check(dir.path(), "daily"),
        Some(&not_found()),
    );

    let session = RepositorySystemSession::new(dir.path()).with_resolution_error_policy(
        ResolutionErrorPolicy {
            cache_not_found: false,
            cache_transfer_errors: false,
        },
    );
    let mut check = check(dir.path(), "daily");
    manager.check_artifact(&session, &mut check);

    assert!(check.required);
    assert!(check.error.is_none());
}

#[test]
fn test_transfer_errors_are_retried_by_default() {
    let dir = TempDir::new().unwrap();
    let manager = DefaultUpdateCheckManager::new();
    manager.touch_artifact(
        &RepositorySystemSession::new(dir.path()),
        &check(dir.path(), "daily"),
        Some(&timeout()),
    );

    let mut retry = check(dir.path(), "daily");
    manager.check_artifact(&RepositorySystemSession::new(dir.path()), &mut retry);
    assert!(retry.required);

    let caching = RepositorySystemSession::new(dir.path()).with_resolution_error_policy(
        ResolutionErrorPolicy {
            cache_not_found: true,
            cache_transfer_errors: true,
        },
    );
    let mut cached = check(dir.path(), "daily");
    manager.check_artifact(&caching, &mut cached);
    assert!(!cached.required);
    let error = cached.error.unwrap();
    assert!(matches!(error, UpdateCheckError::CachedTransferError { .. }));
    assert!(error.to_string().contains("Connection timeout"));
}

#[test]
fn test_always_policy_ignores_cache() {
    let dir = TempDir::new().unwrap();
    let manager = DefaultUpdateCheckManager::new();
    manager.touch_artifact(
        &RepositorySystemSession::new(dir.path()),
        &check(dir.path(), "always"),
        Some(&not_found()),
    );

    let mut check = check(dir.path(), "always");
    manager.check_artifact(&RepositorySystemSession::new(dir.path()), &mut check);
    assert!(check.required);
}

#[test]
fn test_same_session_does_not_check_twice() {
    let dir = TempDir::new().unwrap();
    let manager = DefaultUpdateCheckManager::new();
    let session = RepositorySystemSession::new(dir.path());

    manager.touch_artifact(&session, &check(dir.path(), "always"), Some(&not_found()));

    let mut check = check(dir.path(), "always");
    manager.check_artifact(&session, &mut check);
    assert!(!check.required);
    assert!(matches!(
        check.error,
        Some(UpdateCheckError::CachedNotFound { .. })
    ));
}

#[test]
fn test_stale_tracking_requires_update() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("lib-1.0.jar");
    let mut tracking = TrackingFile::default();
    tracking.record(
        central().url,
        TrackingEntry {
            last_updated: Utc::now() - Duration::days(2),
            error: Some(String::new()),
        },
    );
    tracking.write(&artifact_tracking_path(&file)).unwrap();

    let manager = DefaultUpdateCheckManager::new();
    let mut daily = check(dir.path(), "daily");
    manager.check_artifact(&RepositorySystemSession::new(dir.path()), &mut daily);
    assert!(daily.required);

    let mut never = check(dir.path(), "never");
    manager.check_artifact(&RepositorySystemSession::new(dir.path()), &mut never);
    assert!(!never.required);
    assert!(never.error.is_some());
}

#[test]
fn test_successful_touch_with_local_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("lib-1.0.jar");
    std::fs::write(&file, b"jar").unwrap();
    let manager = DefaultUpdateCheckManager::new();
    manager.touch_artifact(
        &RepositorySystemSession::new(dir.path()),
        &check(dir.path(), "daily"),
        None,
    );

    let mut check = check(dir.path(), "daily").with_local_last_updated(None);
    manager.check_artifact(&RepositorySystemSession::new(dir.path()), &mut check);
    assert!(!check.required);
    assert!(check.error.is_none());
}

// =============================================================================
// Metadata and policies
// =============================================================================

#[test]
fn test_metadata_tracking_is_per_repository() {
    let dir = TempDir::new().unwrap();
    let manager = DefaultUpdateCheckManager::new();
    let metadata = Metadata::new("org.example", "lib", "", MetadataNature::Release);
    let other = RemoteRepository::new("mirror", "file:///remote/mirror");

    let central_file = dir.path().join("maven-metadata-central.xml");
    let mirror_file = dir.path().join("maven-metadata-mirror.xml");

    let touched = UpdateCheck::new(metadata.clone(), &central_file, central(), "daily");
    manager.touch_metadata(
        &RepositorySystemSession::new(dir.path()),
        &touched,
        Some(&TransferError::MetadataNotFound {
            metadata: metadata.clone(),
            repository: central().to_string(),
        }),
    );
    assert!(metadata_tracking_path(&central_file).exists());

    let session = RepositorySystemSession::new(dir.path());
    let mut cached = UpdateCheck::new(metadata.clone(), &central_file, central(), "daily");
    manager.check_metadata(&session, &mut cached);
    assert!(!cached.required);
    assert!(cached.error.is_some());

    let mut fresh = UpdateCheck::new(metadata, &mirror_file, other, "daily");
    manager.check_metadata(&session, &mut fresh);
    assert!(fresh.required);
}

#[test]
fn test_effective_update_policy() {
    let dir = TempDir::new().unwrap();
    let session = RepositorySystemSession::new(dir.path());
    let manager = DefaultUpdateCheckManager::new();

    assert_eq!(
        manager.effective_update_policy(&session, "daily", "interval:60"),
        "interval:60"
    );
    assert_eq!(manager.effective_update_policy(&session, "never", "daily"), "daily");
    assert_eq!(manager.effective_update_policy(&session, "always", "never"), "always");
}
