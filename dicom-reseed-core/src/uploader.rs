//! # uploader: process-backed [`Uploader`]
//!
//! Spawns the external DICOM uploader once per call and waits for it to exit.
//! Standard streams are inherited so the uploader's own output reaches the
//! terminal. The exit status is mapped to an [`UploadOutcome`]; only failing to
//! start or reap the child is an [`UploadError`].

use async_trait::async_trait;
use std::ffi::OsString;
use std::process::Stdio;
use tokio::process::Command;

use crate::config::{RunConfig, UploaderCommand};
use crate::contract::{UploadError, UploadOutcome, Uploader};

pub struct ProcessUploader {
    command: UploaderCommand,
}

impl ProcessUploader {
    pub fn new(command: UploaderCommand) -> Self {
        ProcessUploader { command }
    }

    /// Full argument list passed to the program, leading args first.
    ///
    /// The directory is forwarded as an `OsString` so non-UTF-8 paths reach
    /// the uploader byte for byte.
    pub fn argv(&self, config: &RunConfig) -> Vec<OsString> {
        let mut argv: Vec<OsString> = self.command.args.iter().map(OsString::from).collect();
        argv.extend([
            OsString::from("-c"),
            OsString::from(&config.client_id),
            OsString::from("-s"),
            OsString::from(&config.client_secret),
            OsString::from("-a"),
            OsString::from(&config.api_host),
            OsString::from("-d"),
            config.dicom_directory.clone().into_os_string(),
        ]);
        if self.command.keep_uids {
            argv.push(OsString::from("-k"));
        }
        if let Some(field) = &self.command.group_by {
            argv.push(OsString::from("-g"));
            argv.push(OsString::from(field));
        }
        argv
    }
}

impl Default for ProcessUploader {
    fn default() -> Self {
        ProcessUploader::new(UploaderCommand::default())
    }
}

#[async_trait]
impl Uploader for ProcessUploader {
    async fn upload(
        &self,
        iteration: u64,
        config: &RunConfig,
    ) -> Result<UploadOutcome, UploadError> {
        let program = &self.command.program;
        tracing::debug!(iteration, program = %program, "Spawning uploader");

        let mut child = Command::new(program)
            .args(self.argv(config))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                tracing::error!(error = ?e, iteration, program = %program, "Failed to spawn uploader");
                UploadError::Spawn {
                    program: program.clone(),
                    source: e,
                }
            })?;

        let status = child.wait().await.map_err(|e| {
            tracing::error!(error = ?e, iteration, program = %program, "Failed waiting for uploader");
            UploadError::Wait {
                program: program.clone(),
                source: e,
            }
        })?;

        if status.success() {
            tracing::debug!(iteration, status = ?status, "Uploader exited successfully");
            Ok(UploadOutcome::Succeeded)
        } else {
            tracing::debug!(iteration, status = ?status, "Uploader exited with failure");
            Ok(UploadOutcome::Failed {
                code: status.code(),
            })
        }
    }
}
