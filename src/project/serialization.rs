// Serialization utilities for project persistence

use crate::project::ProjectError;
use crate::project::types::{Project, ProjectMetadata};

/// Serialize a whole project to pretty RON
pub fn serialize_to_ron(project: &Project) -> Result<String, ProjectError> {
    Ok(ron::ser::to_string_pretty(
        project,
        ron::ser::PrettyConfig::default(),
    )?)
}

/// Deserialize a project from RON
pub fn deserialize_from_ron(ron_data: &str) -> Result<Project, ProjectError> {
    Ok(ron::from_str(ron_data)?)
}

/// Serialize project metadata to pretty JSON
pub fn serialize_metadata_to_json(metadata: &ProjectMetadata) -> Result<String, ProjectError> {
    Ok(serde_json::to_string_pretty(metadata)?)
}

/// Deserialize project metadata from JSON
pub fn deserialize_metadata_from_json(json_data: &str) -> Result<ProjectMetadata, ProjectError> {
    Ok(serde_json::from_str(json_data)?)
}
