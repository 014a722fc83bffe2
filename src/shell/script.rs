use std::path::{Path, PathBuf};

use compio::fs;
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::ext::{AsyncTryFrom, BestEffortPathExt};

/// Commands read from a file, replayed line by line
#[derive(Debug, Clone)]
pub struct Script {
    pub path: PathBuf,
    pub text: String,
}

impl AsyncTryFrom<&Path> for Script {
    type Error = ScriptError;

    async fn async_try_from(path: &Path) -> Result<Self, Self::Error> {
        let bytes = fs::read(path).await.context(ReadSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        debug!(
            "Read script {}: {} bytes",
            path.best_effort_path_display(),
            bytes.len()
        );

        Ok(Script {
            path: path.to_path_buf(),
            text: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

#[derive(Debug, Snafu)]
pub enum ScriptError {
    #[snafu(display("Failed to read the script file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[compio::test]
    async fn reads_script_text() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "pwd\nls").expect("Failed to write to temp file");

        let script = Script::async_try_from(temp_file.path())
            .await
            .expect("Failed to read script");
        assert_eq!(script.text.lines().collect::<Vec<_>>(), vec!["pwd", "ls"]);
    }

    #[compio::test]
    async fn missing_script() {
        let result = Script::async_try_from(Path::new("/this/path/does/not/exist.txt")).await;
        assert!(matches!(result, Err(ScriptError::ReadError { .. })));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("/this/path/does/not/exist.txt")
        );
    }
}
