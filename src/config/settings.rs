use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::{debug, info};

use crate::ext::BestEffortPathExt;

pub const SETTINGS_FILE_NAME: &str = "vfsemu.yaml";

const VFS_KEY: &str = "vfs";
const SCRIPT_KEY: &str = "script";
const HOME_KEY: &str = "home";
const PROMPT_KEY: &str = "prompt";

/// Values read from `vfsemu.yaml`. Every key is optional; command line flags
/// take precedence over anything set here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    pub vfs: Option<PathBuf>,
    pub script: Option<PathBuf>,
    pub home: Option<String>,
    pub prompt: Option<String>,
}

impl Settings {
    /// Reads `explicit` when given, otherwise `vfsemu.yaml` in the working
    /// directory. Only the default file is allowed to be missing.
    pub async fn read(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        match explicit {
            Some(path) => Self::from_path(path).await,
            None => {
                let path = Path::new(SETTINGS_FILE_NAME);
                if !path.exists() {
                    info!("No {} found, using default settings", SETTINGS_FILE_NAME);
                    return Ok(Self::default());
                }
                Self::from_path(path).await
            }
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, SettingsError> {
        debug!("Reading settings file: {}", path.best_effort_path_display());
        let bytes = fs::read(path).await.context(ReadSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        debug!("Successfully read settings file: {} bytes", bytes.len());

        let contents = String::from_utf8_lossy(&bytes);
        Settings::try_from(&*contents)
    }

    fn string_value(
        top_level: &LinkedHashMap<Yaml, Yaml>,
        key: &'static str,
    ) -> Result<Option<String>, SettingsError> {
        match top_level.get(&Yaml::Value(Scalar::String(Cow::Borrowed(key)))) {
            None | Some(Yaml::Value(Scalar::Null)) => Ok(None),
            Some(value) => value
                .as_str()
                .map(|s| Some(s.to_string()))
                .context(NotAStringSnafu { key }),
        }
    }
}

impl TryFrom<&str> for Settings {
    type Error = SettingsError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let Some(document) = documents.first() else {
            debug!("Settings file is empty");
            return Ok(Self::default());
        };

        let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;
        for key in top_level.keys() {
            match key.as_str() {
                Some(VFS_KEY | SCRIPT_KEY | HOME_KEY | PROMPT_KEY) => {}
                _ => debug!("Ignoring unknown settings key: {:?}", key),
            }
        }

        Ok(Settings {
            vfs: Self::string_value(top_level, VFS_KEY)?.map(PathBuf::from),
            script: Self::string_value(top_level, SCRIPT_KEY)?.map(PathBuf::from),
            home: Self::string_value(top_level, HOME_KEY)?,
            prompt: Self::string_value(top_level, PROMPT_KEY)?,
        })
    }
}

#[derive(Debug, Snafu)]
pub enum SettingsError {
    #[snafu(display("Failed to read the settings file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the settings file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of settings should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Setting '{}' should be a string", key))]
    NotAString { key: String },
}
