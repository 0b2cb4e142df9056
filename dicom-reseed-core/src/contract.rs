#![allow(unused)]

//! # contract: the seam between the loop and the external uploader
//!
//! The loop runner never spawns processes itself; it talks to an
//! [`Uploader`]. Production code uses [`crate::uploader::ProcessUploader`],
//! tests use the `mockall`-generated `MockUploader`.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`; the mock is exported to other crates
//!   through the default `test-export-mocks` feature.

use async_trait::async_trait;
use mockall::{automock, predicate::*};
use serde::Serialize;

use crate::config::RunConfig;

/// How one uploader invocation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// The uploader exited with status zero.
    Succeeded,
    /// Non-zero exit. `code` is `None` when the process was killed by a signal.
    Failed { code: Option<i32> },
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Succeeded)
    }
}

/// The uploader could not be run at all.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to spawn uploader `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for uploader `{program}` to exit: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// Runs one upload of the configured dataset.
///
/// `iteration` is the zero-based loop counter. It is informational only: the
/// values forwarded to the uploader come from `config` and are the same on
/// every call.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Perform one upload and wait for it to finish.
    async fn upload(&self, iteration: u64, config: &RunConfig)
        -> Result<UploadOutcome, UploadError>;
}
