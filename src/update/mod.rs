//! Update checks: whether a remote resource must be fetched again, based on
//! the update policy, tracking files and cached failures.

mod check;
mod manager;
mod policy;
mod tracking;

pub use check::{UpdateCheck, UpdateCheckError};
pub use manager::{DefaultUpdateCheckManager, UpdateCheckManager};
pub use policy::UpdatePolicy;
pub use tracking::{
    artifact_tracking_path, metadata_tracking_path, TrackingEntry, TrackingError, TrackingFile,
};
