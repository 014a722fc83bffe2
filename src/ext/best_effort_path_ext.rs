use std::path::{Path, PathBuf};

/// Renders a host path for messages, canonicalized when it exists and joined
/// onto the working directory otherwise.
pub fn best_effort_path_display(path: &Path) -> String {
    if let Ok(canonical_path) = path.canonicalize() {
        return canonical_path.display().to_string();
    }

    if path.is_absolute() {
        return path.display().to_string();
    }
    match std::env::current_dir() {
        Ok(current_dir) => current_dir.join(path).display().to_string(),
        Err(_) => path.display().to_string(),
    }
}

pub trait BestEffortPathExt {
    fn best_effort_path_display(&self) -> String;
}

impl BestEffortPathExt for Path {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }
}

impl BestEffortPathExt for PathBuf {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }
}
