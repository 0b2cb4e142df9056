//! Command-line surface for dicom-reseed.
//!
//! Parses the run flags into an immutable [`RunConfig`], resolves how the
//! external uploader is launched, and drives the loop from
//! [`dicom_reseed_core::loop_runner`]. `-h` and flag errors are handled by clap
//! before [`run`] is reached, so neither ever starts an upload.
use crate::load_config::{load_config, UploaderSettings};
use anyhow::Result;
use clap::Parser;
use dicom_reseed_core::config::{parse_loops, FailurePolicy, RunConfig, UploaderCommand};
use dicom_reseed_core::loop_runner::run_loops;
use dicom_reseed_core::uploader::ProcessUploader;
use std::path::PathBuf;

/// Re-upload the same DICOM dataset by running the external uploader in a loop.
#[derive(Parser, Debug, Default)]
#[clap(
    name = "dicom-reseed",
    version,
    about = "Run the external DICOM uploader N times in sequence against a backend API",
    args_override_self = true
)]
pub struct Cli {
    /// Backend client ID
    #[clap(short = 'c', long = "client-id", value_name = "CLIENT_ID", allow_hyphen_values = true)]
    pub client_id: Option<String>,

    /// Backend client secret
    #[clap(short = 's', long = "client-secret", value_name = "CLIENT_SECRET", allow_hyphen_values = true)]
    pub client_secret: Option<String>,

    /// Backend API base URL
    #[clap(short = 'a', long = "api-host", value_name = "URL", allow_hyphen_values = true)]
    pub api_host: Option<String>,

    /// Folder to search for DICOM files
    #[clap(short = 'd', long = "dicom-dir", value_name = "DIR", allow_hyphen_values = true)]
    pub dicom_directory: Option<PathBuf>,

    /// Number of times to run the uploader
    #[clap(short = 'n', long = "loops", value_name = "N", allow_negative_numbers = true)]
    pub loops: Option<String>,

    /// Uploader program to run instead of `poetry run python data_uploader/upload_dcms.py`
    #[clap(long, env = "DICOM_UPLOADER", value_name = "PROGRAM")]
    pub uploader: Option<String>,

    /// Leading argument for the uploader program (repeatable)
    #[clap(long = "uploader-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub uploader_args: Vec<String>,

    /// Ask the uploader to keep the dataset's UIDs instead of regenerating them
    #[clap(long)]
    pub keep_uids: bool,

    /// DICOM field the uploader groups studies by
    #[clap(long, value_name = "FIELD")]
    pub group_by: Option<String>,

    /// Stop at the first failed upload and exit non-zero
    #[clap(long)]
    pub fail_fast: bool,

    /// YAML file describing the uploader command and failure policy
    #[clap(long, value_name = "PATH")]
    pub uploader_config: Option<PathBuf>,
}

impl Cli {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            client_id: self.client_id.clone().unwrap_or_default(),
            client_secret: self.client_secret.clone().unwrap_or_default(),
            api_host: self.api_host.clone().unwrap_or_default(),
            dicom_directory: self.dicom_directory.clone().unwrap_or_default(),
            loops: parse_loops(self.loops.as_deref()),
        }
    }

    /// Command-line flags win over the settings file, which wins over the
    /// built-in default. Naming a program on the command line drops the
    /// default leading args.
    pub fn uploader_command(&self, settings: &UploaderSettings) -> UploaderCommand {
        let mut command = match (&self.uploader, &settings.uploader) {
            (Some(program), _) => UploaderCommand {
                program: program.clone(),
                args: Vec::new(),
                keep_uids: false,
                group_by: None,
            },
            (None, Some(from_file)) => from_file.clone(),
            (None, None) => UploaderCommand::default(),
        };
        if !self.uploader_args.is_empty() {
            command.args = self.uploader_args.clone();
        }
        if let Some(from_file) = &settings.uploader {
            command.keep_uids |= from_file.keep_uids;
            if command.group_by.is_none() {
                command.group_by = from_file.group_by.clone();
            }
        }
        command.keep_uids |= self.keep_uids;
        if self.group_by.is_some() {
            command.group_by = self.group_by.clone();
        }
        command
    }

    pub fn failure_policy(&self, settings: &UploaderSettings) -> FailurePolicy {
        if self.fail_fast {
            FailurePolicy::Abort
        } else {
            settings.on_failure
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let settings = match &cli.uploader_config {
        Some(path) => load_config(path)?,
        None => UploaderSettings::default(),
    };

    let config = cli.run_config();
    config.trace_loaded();

    let command = cli.uploader_command(&settings);
    let policy = cli.failure_policy(&settings);
    tracing::info!(
        program = %command.program,
        args = ?command.args,
        keep_uids = command.keep_uids,
        group_by = ?command.group_by,
        ?policy,
        "Resolved uploader command"
    );

    let uploader = ProcessUploader::new(command);
    let report = run_loops(&config, &uploader, policy).await;

    match serde_json::to_string_pretty(&report) {
        Ok(json) => tracing::debug!(json = %json, "Loop report"),
        Err(e) => tracing::error!(error = ?e, "Failed to serialize loop report as JSON"),
    }

    println!(
        "Upload loop complete: {} of {} iterations run, {} failed.",
        report.completed(),
        config.iterations(),
        report.failure_count()
    );

    if report.aborted {
        let failed_at = report.failures().next().map(|f| f.index);
        tracing::error!(run_id = %report.run_id, ?failed_at, "Upload loop aborted");
        anyhow::bail!(
            "Upload loop aborted after failed iteration {}",
            failed_at.map(|i| i.to_string()).unwrap_or_else(|| "?".into())
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_short_flags() {
        let cli = Cli::try_parse_from([
            "dicom-reseed", "-c", "id1", "-s", "secret1", "-a", "https://host", "-d", "/data",
            "-n", "3",
        ])
        .unwrap();
        assert_eq!(
            cli.run_config(),
            RunConfig {
                client_id: "id1".into(),
                client_secret: "secret1".into(),
                api_host: "https://host".into(),
                dicom_directory: PathBuf::from("/data"),
                loops: Some(3),
            }
        );
    }

    #[test]
    fn negative_or_non_numeric_loops_are_unset_not_errors() {
        for raw in ["-4", "lots"] {
            let cli = Cli::try_parse_from(["dicom-reseed", "-n", raw]).unwrap();
            assert_eq!(cli.run_config().loops, None, "input {raw}");
        }
    }

    #[test]
    fn values_may_start_with_a_hyphen() {
        let cli = Cli::try_parse_from([
            "dicom-reseed", "-c", "-id", "-s", "-xYz9", "-a", "-host", "-d", "-dir", "-n", "1",
        ])
        .unwrap();
        let config = cli.run_config();
        assert_eq!(config.client_id, "-id");
        assert_eq!(config.client_secret, "-xYz9");
        assert_eq!(config.api_host, "-host");
        assert_eq!(config.dicom_directory, PathBuf::from("-dir"));
        assert_eq!(config.loops, Some(1));
    }

    #[test]
    fn repeated_flag_keeps_the_last_value() {
        let cli = Cli::try_parse_from(["dicom-reseed", "-n", "2", "-n", "3", "-c", "a", "-c", "b"])
            .unwrap();
        let config = cli.run_config();
        assert_eq!(config.loops, Some(3));
        assert_eq!(config.client_id, "b");
    }

    #[test]
    fn repeated_uploader_args_accumulate() {
        let cli = Cli::try_parse_from([
            "dicom-reseed", "--uploader-arg", "run", "--uploader-arg", "upload.py",
        ])
        .unwrap();
        assert_eq!(cli.uploader_args, vec!["run", "upload.py"]);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        let err = Cli::try_parse_from(["dicom-reseed", "-x", "-n", "2"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn help_flag_short_circuits_parsing() {
        let err = Cli::try_parse_from(["dicom-reseed", "-n", "5", "-h"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn default_uploader_without_overrides() {
        let cli = Cli::default();
        let command = cli.uploader_command(&UploaderSettings::default());
        assert_eq!(command, UploaderCommand::default());
        assert_eq!(cli.failure_policy(&UploaderSettings::default()), FailurePolicy::Continue);
    }

    #[test]
    fn flags_override_settings_file() {
        let settings = UploaderSettings {
            uploader: Some(UploaderCommand {
                program: "python3".into(),
                args: vec!["upload_dcms.py".into()],
                keep_uids: true,
                group_by: Some("PatientID".into()),
            }),
            on_failure: FailurePolicy::Continue,
        };
        let cli = Cli {
            group_by: Some("AccessionNumber".into()),
            fail_fast: true,
            ..Cli::default()
        };
        let command = cli.uploader_command(&settings);
        assert_eq!(command.program, "python3");
        assert_eq!(command.args, vec!["upload_dcms.py"]);
        assert!(command.keep_uids);
        assert_eq!(command.group_by.as_deref(), Some("AccessionNumber"));
        assert_eq!(cli.failure_policy(&settings), FailurePolicy::Abort);
    }

    #[test]
    fn program_flag_drops_default_leading_args() {
        let cli = Cli {
            uploader: Some("./upload.sh".into()),
            ..Cli::default()
        };
        let command = cli.uploader_command(&UploaderSettings::default());
        assert_eq!(command.program, "./upload.sh");
        assert!(command.args.is_empty());
    }
}
