use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Program used when neither the command line nor a settings file names one.
pub const DEFAULT_UPLOADER_PROGRAM: &str = "poetry";

/// Leading arguments for [`DEFAULT_UPLOADER_PROGRAM`].
pub const DEFAULT_UPLOADER_ARGS: &[&str] = &["run", "python", "data_uploader/upload_dcms.py"];

/// The five values read from the command line for one run.
///
/// None of the strings are validated here; they are forwarded to the uploader
/// as given. A missing string is forwarded as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub client_id: String,
    pub client_secret: String,
    pub api_host: String,
    pub dicom_directory: PathBuf,
    /// `None` means the bound is unset and the loop runs zero times.
    pub loops: Option<u64>,
}

impl RunConfig {
    /// Number of iterations the loop will perform.
    pub fn iterations(&self) -> u64 {
        self.loops.unwrap_or(0)
    }

    pub fn trace_loaded(&self) {
        info!(
            client_id = %self.client_id,
            client_secret_set = !self.client_secret.is_empty(),
            api_host = %self.api_host,
            dicom_directory = %self.dicom_directory.display(),
            loops = ?self.loops,
            "Loaded RunConfig"
        );
        if self.loops.is_none() {
            warn!("Loop count unset or invalid, no uploads will run");
        }
    }
}

/// Lenient loop-count parsing: anything that is not a non-negative integer
/// yields `None` rather than an error.
pub fn parse_loops(raw: Option<&str>) -> Option<u64> {
    let raw = raw?;
    match raw.trim().parse::<u64>() {
        Ok(n) => Some(n),
        Err(e) => {
            debug!(raw = %raw, error = %e, "Ignoring loop count that is not a non-negative integer");
            None
        }
    }
}

/// How the external uploader is launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploaderCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Forward `-k` so the uploader keeps the dataset's UIDs.
    #[serde(default)]
    pub keep_uids: bool,
    /// Forward `-g <field>` to group studies by another DICOM attribute.
    #[serde(default)]
    pub group_by: Option<String>,
}

impl Default for UploaderCommand {
    fn default() -> Self {
        UploaderCommand {
            program: DEFAULT_UPLOADER_PROGRAM.to_string(),
            args: DEFAULT_UPLOADER_ARGS.iter().map(|a| a.to_string()).collect(),
            keep_uids: false,
            group_by: None,
        }
    }
}

/// What the loop does when an iteration fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure and carry on with the next iteration.
    #[default]
    Continue,
    /// Stop after the first failed iteration.
    Abort,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_loops_accepts_non_negative_integers() {
        assert_eq!(parse_loops(Some("0")), Some(0));
        assert_eq!(parse_loops(Some("3")), Some(3));
        assert_eq!(parse_loops(Some(" 12 ")), Some(12));
    }

    #[test]
    fn parse_loops_treats_garbage_as_unset() {
        assert_eq!(parse_loops(None), None);
        assert_eq!(parse_loops(Some("")), None);
        assert_eq!(parse_loops(Some("-1")), None);
        assert_eq!(parse_loops(Some("three")), None);
        assert_eq!(parse_loops(Some("2.5")), None);
    }

    #[test]
    fn unset_loops_means_zero_iterations() {
        let config = RunConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
            api_host: "https://host".into(),
            dicom_directory: PathBuf::from("/data"),
            loops: None,
        };
        assert_eq!(config.iterations(), 0);
    }

    #[test]
    fn default_command_runs_upload_script_through_poetry() {
        let cmd = UploaderCommand::default();
        assert_eq!(cmd.program, "poetry");
        assert_eq!(cmd.args, vec!["run", "python", "data_uploader/upload_dcms.py"]);
        assert!(!cmd.keep_uids);
        assert!(cmd.group_by.is_none());
    }

    #[test]
    fn failure_policy_deserialises_from_snake_case() {
        let policy: FailurePolicy = serde_json::from_str("\"abort\"").unwrap();
        assert_eq!(policy, FailurePolicy::Abort);
        assert_eq!(FailurePolicy::default(), FailurePolicy::Continue);
    }
}
