//! Maven2 repository layout.
//!
//! Maps coordinates to relative, `/`-separated resource paths:
//! `org/example/lib/1.0/lib-1.0-sources.jar`.

use crate::artifact::Artifact;
use crate::metadata::Metadata;

/// The default (`content_type = "default"`) repository layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct Maven2Layout;

impl Maven2Layout {
    /// Relative path of an artifact.
    pub fn artifact_path(&self, artifact: &Artifact) -> String {
        let mut path = group_path(&artifact.group_id);
        path.push('/');
        path.push_str(&artifact.artifact_id);
        path.push('/');
        path.push_str(&artifact.base_version());
        path.push('/');
        path.push_str(&artifact.artifact_id);
        path.push('-');
        path.push_str(&artifact.version);
        if !artifact.classifier.is_empty() {
            path.push('-');
            path.push_str(&artifact.classifier);
        }
        if !artifact.extension.is_empty() {
            path.push('.');
            path.push_str(&artifact.extension);
        }
        path
    }

    /// Relative path of a metadata file.
    pub fn metadata_path(&self, metadata: &Metadata) -> String {
        let mut path = String::new();
        if !metadata.group_id.is_empty() {
            path.push_str(&group_path(&metadata.group_id));
            path.push('/');
            if !metadata.artifact_id.is_empty() {
                path.push_str(&metadata.artifact_id);
                path.push('/');
                if !metadata.version.is_empty() {
                    path.push_str(&metadata.version);
                    path.push('/');
                }
            }
        }
        path.push_str(&metadata.metadata_type);
        path
    }

    /// Path of a checksum side-file for a resource.
    pub fn checksum_path(&self, resource: &str, extension: &str) -> String {
        format!("{}.{}", resource, extension.trim_start_matches('.'))
    }
}

fn group_path(group_id: &str) -> String {
    group_id.replace('.', "/")
}
