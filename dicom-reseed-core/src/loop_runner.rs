//! Sequential loop: re-runs the uploader `loops` times against the same dataset.
//!
//! Each iteration awaits the previous upload before starting the next one, so
//! invocations never overlap. The forwarded values come from one immutable
//! [`RunConfig`] and are identical on every call.
//!
//! # Failure handling
//! Under [`FailurePolicy::Continue`] a failed upload (non-zero exit or a spawn
//! error) is logged and recorded, and the loop moves on. Under
//! [`FailurePolicy::Abort`] the loop stops after the first failure. Either way
//! the caller gets a [`LoopReport`] describing every iteration that ran.

use serde::Serialize;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::config::{FailurePolicy, RunConfig};
use crate::contract::{UploadOutcome, Uploader};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum IterationResult {
    Completed(UploadOutcome),
    SpawnFailed { message: String },
}

impl IterationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, IterationResult::Completed(UploadOutcome::Succeeded))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IterationReport {
    pub index: u64,
    pub result: IterationResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoopReport {
    pub run_id: Uuid,
    pub requested: Option<u64>,
    pub iterations: Vec<IterationReport>,
    /// Set when [`FailurePolicy::Abort`] cut the loop short.
    pub aborted: bool,
}

impl LoopReport {
    pub fn completed(&self) -> usize {
        self.iterations.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &IterationReport> {
        self.iterations.iter().filter(|it| !it.result.is_success())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

pub async fn run_loops<U>(config: &RunConfig, uploader: &U, policy: FailurePolicy) -> LoopReport
where
    U: Uploader + ?Sized,
{
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("run_loops", %run_id, loops = config.iterations());
    drive(run_id, config, uploader, policy).instrument(span).await
}

async fn drive<U>(run_id: Uuid, config: &RunConfig, uploader: &U, policy: FailurePolicy) -> LoopReport
where
    U: Uploader + ?Sized,
{
    let total = config.iterations();
    info!(?policy, "[LOOP] Starting upload loop");

    let mut report = LoopReport {
        run_id,
        requested: config.loops,
        iterations: Vec::new(),
        aborted: false,
    };

    for index in 0..total {
        info!(iteration = index, "[LOOP] Invoking uploader");
        let result = match uploader.upload(index, config).await {
            Ok(outcome) => {
                match &outcome {
                    UploadOutcome::Succeeded => {
                        info!(iteration = index, "[LOOP] Upload finished")
                    }
                    UploadOutcome::Failed { code } => {
                        warn!(iteration = index, ?code, "[LOOP] Uploader exited with failure")
                    }
                }
                IterationResult::Completed(outcome)
            }
            Err(e) => {
                warn!(iteration = index, error = %e, "[LOOP] Uploader could not be run");
                IterationResult::SpawnFailed {
                    message: e.to_string(),
                }
            }
        };

        let failed = !result.is_success();
        report.iterations.push(IterationReport { index, result });

        if failed && policy == FailurePolicy::Abort {
            warn!(iteration = index, "[LOOP] Aborting loop after failed iteration");
            report.aborted = true;
            break;
        }
    }

    info!(
        completed = report.completed(),
        failures = report.failure_count(),
        aborted = report.aborted,
        "[LOOP] Upload loop finished"
    );
    report
}
