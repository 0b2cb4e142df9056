/// `load_config` module: reads the optional uploader settings file.
///
/// The file only describes how to launch the external uploader and what to do
/// when it fails. Credentials are never read from it; they arrive on the
/// command line.
///
/// ```yaml
/// uploader:
///   program: poetry
///   args: [run, python, data_uploader/upload_dcms.py]
///   keep_uids: false
///   group_by: StudyInstanceUID
/// on_failure: continue
/// ```
use anyhow::Result;
use dicom_reseed_core::config::{FailurePolicy, UploaderCommand};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Default, Deserialize)]
pub struct UploaderSettings {
    #[serde(default)]
    pub uploader: Option<UploaderCommand>,
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<UploaderSettings> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading uploader settings from file");

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read uploader settings file");
            return Err(anyhow::anyhow!(
                "Failed to read uploader settings file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty file is a valid "use the defaults" file.
    if content.trim().is_empty() {
        info!(config_path = ?path_ref, "Uploader settings file is empty, using defaults");
        return Ok(UploaderSettings::default());
    }

    let settings: UploaderSettings = match serde_yaml::from_str(&content) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse uploader settings YAML");
            return Err(anyhow::anyhow!("Failed to parse uploader settings YAML: {e}"));
        }
    };

    info!(
        program = settings.uploader.as_ref().map(|u| u.program.as_str()).unwrap_or("<default>"),
        on_failure = ?settings.on_failure,
        "Uploader settings loaded"
    );
    Ok(settings)
}
