// Project manager for loading and saving projects

use crate::config::EngineConfig;
use crate::project::serialization::*;
use crate::project::types::*;
use crate::sequencer::pattern::{Bar, Pattern};
use crate::sequencer::timeline::{PatternName, TimelineError};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::{ZipArchive, ZipWriter};

/// Name of the metadata entry inside the container
pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Name of the full project entry inside the container
pub const SONG_ENTRY: &str = "song.ron";

/// Project error types
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("File system error: {0}")]
    FileSystemError(String),

    #[error("Invalid project structure: {0}")]
    InvalidStructure(String),

    #[error("Unsupported project format version {0}")]
    InvalidVersion(ProjectVersion),

    #[error("Missing {0} in project")]
    MissingFiles(&'static str),

    #[error("Project validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    #[error(transparent)]
    Timeline(#[from] TimelineError),
}

/// Options for loading a project
#[derive(Debug, Clone)]
pub struct ProjectLoadOptions {
    /// Whether to validate the project structure
    pub validate: bool,
    /// Tempo to use instead of the saved one
    pub tempo_override: Option<f64>,
}

impl Default for ProjectLoadOptions {
    fn default() -> Self {
        Self {
            validate: true,
            tempo_override: None,
        }
    }
}

/// Project manager - handles saving/loading projects
pub struct ProjectManager {
    /// Engine settings new projects start from
    default_config: EngineConfig,
}

impl ProjectManager {
    /// Create a new project manager
    pub fn new(default_config: EngineConfig) -> Self {
        Self { default_config }
    }

    /// Create a new empty project
    pub fn create_new_project(&self, name: String) -> Project {
        let mut project = Project::default();
        project.metadata.name = name;
        project.metadata.tempo = self.default_config.bpm.bpm();
        project.max_loop_bars = self.default_config.max_loop_bars;
        project.config = self.default_config.clone();
        project
    }

    /// Create a project whose slot A1 holds `progression`
    pub fn create_with_progression(
        &self,
        name: String,
        progression: Vec<Bar>,
    ) -> Result<Project, ProjectError> {
        let mut project = self.create_new_project(name);
        let bar_count = progression.len().max(1);
        project
            .patterns
            .insert(PatternName::A1, Pattern::with_progression(progression)?);
        project.loop_range.end = bar_count.min(project.max_loop_bars);
        Ok(project)
    }

    /// Save project to a ZIP container
    pub fn save_project<P: AsRef<Path>>(
        &self,
        project: &Project,
        project_path: P,
    ) -> Result<(), ProjectError> {
        let project_path = project_path.as_ref();
        if let Some(project_dir) = project_path.parent()
            && !project_dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(project_dir).map_err(|e| {
                ProjectError::FileSystemError(format!(
                    "Failed to create project directory {}: {}",
                    project_dir.display(),
                    e
                ))
            })?;
        }

        let manifest_json = serialize_metadata_to_json(&project.metadata)?;
        let song_ron = serialize_to_ron(project)?;

        let zip_file = File::create(project_path).map_err(|e| {
            ProjectError::FileSystemError(format!(
                "Failed to create {}: {}",
                project_path.display(),
                e
            ))
        })?;

        let mut zip_writer = ZipWriter::new(zip_file);

        zip_writer.start_file(MANIFEST_ENTRY, entry_options())?;
        zip_writer.write_all(manifest_json.as_bytes())?;

        zip_writer.start_file(SONG_ENTRY, entry_options())?;
        zip_writer.write_all(song_ron.as_bytes())?;

        zip_writer.finish()?;

        log::info!(
            "Saved project '{}' ({} patterns) to {}",
            project.metadata.name,
            project.patterns.len(),
            project_path.display()
        );
        Ok(())
    }

    /// Load project from a ZIP container
    pub fn load_project<P: AsRef<Path>>(
        &self,
        project_path: P,
        options: &ProjectLoadOptions,
    ) -> Result<Project, ProjectError> {
        let project_path = project_path.as_ref();

        let zip_file = File::open(project_path).map_err(|e| {
            ProjectError::FileSystemError(format!(
                "Failed to open project file {}: {}",
                project_path.display(),
                e
            ))
        })?;
        let mut zip_archive = ZipArchive::new(zip_file)?;

        let manifest_json = read_entry(&mut zip_archive, MANIFEST_ENTRY)?;
        let metadata = deserialize_metadata_from_json(&manifest_json)?;

        let song_ron = read_entry(&mut zip_archive, SONG_ENTRY)?;
        let mut project = deserialize_from_ron(&song_ron)?;

        if !project.metadata.version.is_supported() {
            return Err(ProjectError::InvalidVersion(project.metadata.version));
        }

        // The manifest is authoritative for metadata
        project.metadata = metadata;

        if let Some(tempo) = options.tempo_override {
            project.metadata.tempo = tempo;
        }

        project.normalize()?;

        if options.validate {
            crate::project::validate_project_structure(&project)
                .map_err(|e| ProjectError::ValidationFailed(e.to_string()))?;
        }

        log::info!(
            "Loaded project '{}' (format {}) from {}",
            project.metadata.name,
            project.metadata.version,
            project_path.display()
        );
        Ok(project)
    }

    /// Engine settings new projects start from
    pub fn default_config(&self) -> &EngineConfig {
        &self.default_config
    }
}

impl Default for ProjectManager {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn entry_options() -> zip::write::FileOptions<()> {
    zip::write::FileOptions::default()
}

/// Read a whole text entry from the container
fn read_entry(
    archive: &mut ZipArchive<File>,
    name: &'static str,
) -> Result<String, ProjectError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Err(ProjectError::MissingFiles(name)),
        Err(e) => return Err(e.into()),
    };
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(text)
}
