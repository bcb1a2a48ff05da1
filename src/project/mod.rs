// Project persistence for Chord Studio
// ZIP container holding manifest.json (metadata) and song.ron (full project)

pub mod manager;
pub mod serialization;
pub mod types;

pub use manager::{ProjectError, ProjectLoadOptions, ProjectManager};
pub use types::{Project, ProjectMetadata, ProjectVersion};

/// Tempo range accepted in saved projects
pub const PROJECT_TEMPO_RANGE: std::ops::RangeInclusive<f64> = 40.0..=300.0;

/// Helper function to validate project structure
pub fn validate_project_structure(project: &Project) -> Result<(), ProjectError> {
    // Check project metadata
    if project.metadata.name.trim().is_empty() {
        return Err(ProjectError::InvalidStructure(
            "Project name cannot be empty".to_string(),
        ));
    }

    if project.metadata.name.len() > 255 {
        return Err(ProjectError::InvalidStructure(
            "Project name cannot exceed 255 characters".to_string(),
        ));
    }

    if !project.metadata.version.is_supported() {
        return Err(ProjectError::InvalidStructure(format!(
            "Invalid project version {}",
            project.metadata.version
        )));
    }

    if !PROJECT_TEMPO_RANGE.contains(&project.metadata.tempo) {
        return Err(ProjectError::InvalidStructure(
            "Tempo must be between 40 and 300 BPM".to_string(),
        ));
    }

    // Validate patterns (length, chords, melody notes, drum bars)
    for (name, pattern) in &project.patterns {
        pattern
            .validate()
            .map_err(|e| ProjectError::InvalidStructure(format!("Pattern {}: {}", name, e)))?;

        for bar in &pattern.progression {
            if bar.chords.iter().any(|chord| {
                chord.note_names().len() != chord.midi_notes().len()
                    || chord.midi_notes().windows(2).any(|pair| pair[0] >= pair[1])
            }) {
                return Err(ProjectError::InvalidStructure(format!(
                    "Pattern {} bar {} has a chord with unsorted or duplicate notes",
                    name, bar.bar_num
                )));
            }
        }
    }

    // Validate loop range
    let loop_range = project.loop_range;
    if loop_range.start < 1 || loop_range.start > loop_range.end {
        return Err(ProjectError::InvalidStructure(format!(
            "Loop {}-{} must satisfy 1 <= start <= end",
            loop_range.start, loop_range.end
        )));
    }

    if project.max_loop_bars < 1 || loop_range.len() > project.max_loop_bars {
        return Err(ProjectError::InvalidStructure(format!(
            "Loop {}-{} is longer than {} bars",
            loop_range.start, loop_range.end, project.max_loop_bars
        )));
    }

    project
        .config
        .validate()
        .map_err(|e| ProjectError::InvalidStructure(e.to_string()))?;

    Ok(())
}
