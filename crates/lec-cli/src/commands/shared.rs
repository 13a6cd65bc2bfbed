use std::path::{Path, PathBuf};

/// Evidence directory for a bibliography: the explicit one, else a `json/`
/// directory next to the file when it exists.
pub fn evidence_dir_for(file: &Path, explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(dir) = explicit {
        return Some(PathBuf::from(dir));
    }
    file.parent()
        .map(|parent| parent.join("json"))
        .filter(|dir| dir.is_dir())
}
