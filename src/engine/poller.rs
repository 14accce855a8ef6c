//! Remote job lifecycle driver
//!
//! Submitted -> Polling -> {Completed, Failed, TimedOut, Cancelled}. Status
//! polls are capped at `PollPolicy::max_polls` and the whole job at
//! `PollPolicy::budget` of wall-clock time, whatever the service reports or
//! however slowly it answers.

use std::future::Future;
use std::sync::Arc;

use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::model::*;
use crate::error::{SubmitError, TransportError};
use crate::ports::RemoteJobPort;

/// Stand-in deadline when the budget overflows the clock
const FAR_FUTURE: std::time::Duration = std::time::Duration::from_secs(86_400 * 365 * 30);

/// Result of a submission that reached the service
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Accepted(RemoteJob),
    Rejected(String),
}

/// Terminal state of a remote job that is not a success
#[derive(Debug, Clone, PartialEq)]
pub enum JobFailure {
    Rejected(String),
    Failed { reason: String, polls: u32 },
    TimedOut { polls: u32 },
    Cancelled { polls: u32 },
}

/// Outcome of driving a job to a terminal state
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed {
        job: RemoteJob,
        media: MediaBytes,
        polls: u32,
    },
    Failed(JobFailure),
}

impl JobOutcome {
    pub fn polls(&self) -> u32 {
        match self {
            JobOutcome::Completed { polls, .. } => *polls,
            JobOutcome::Failed(JobFailure::Rejected(_)) => 0,
            JobOutcome::Failed(JobFailure::Failed { polls, .. })
            | JobOutcome::Failed(JobFailure::TimedOut { polls })
            | JobOutcome::Failed(JobFailure::Cancelled { polls }) => *polls,
        }
    }
}

/// Generic poller shared by the remote image and video adapters
#[derive(Clone)]
pub struct RemoteJobPoller {
    port: Arc<dyn RemoteJobPort>,
    policy: PollPolicy,
}

impl RemoteJobPoller {
    pub fn new(port: Arc<dyn RemoteJobPort>, policy: PollPolicy) -> Self {
        Self { port, policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Submit a prompt; refusals are values, transport problems are errors
    pub async fn submit(
        &self,
        prompt: &str,
        job_type: JobType,
    ) -> Result<Submission, TransportError> {
        match self.port.submit(prompt, job_type).await {
            Ok(job) => {
                info!(job_id = %job.id, %job_type, "Remote job submitted");
                Ok(Submission::Accepted(job))
            }
            Err(SubmitError::Rejected(reason)) => {
                warn!(%job_type, %reason, "Remote job rejected");
                Ok(Submission::Rejected(reason))
            }
            Err(SubmitError::Transport(e)) => Err(e),
        }
    }

    /// Poll `job` until it terminates, the budget runs out, or `cancel` fires.
    ///
    /// Every wait, status call and result download races the cancel token and
    /// the `PollPolicy::budget` deadline, so a stalled service cannot hold the
    /// job past its budget. `polls` counts status calls issued.
    pub async fn await_result(
        &self,
        job: RemoteJob,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome, TransportError> {
        let max_polls = policy.max_polls();
        let now = Instant::now();
        let deadline = now.checked_add(policy.budget()).unwrap_or(now + FAR_FUTURE);
        let mut current = job;
        let mut polls = 0u32;

        while polls < max_polls {
            if let Err(cut) = race(sleep(policy.poll_interval), cancel, deadline).await {
                return Ok(cut.outcome(&current, polls));
            }

            polls += 1;
            current = match race(self.port.get_status(&current.id), cancel, deadline).await {
                Ok(status) => status?,
                Err(cut) => return Ok(cut.outcome(&current, polls)),
            };
            debug!(job_id = %current.id, polls, max_polls, status = ?current.status, "Polled remote job");

            match current.status {
                JobStatus::Completed => return self.collect(current, polls, cancel, deadline).await,
                JobStatus::Failed => {
                    let reason = current
                        .error
                        .clone()
                        .unwrap_or_else(|| "remote job failed".to_string());
                    return Ok(JobOutcome::Failed(JobFailure::Failed { reason, polls }));
                }
                JobStatus::Queued | JobStatus::Running => {}
            }
        }

        warn!(job_id = %current.id, polls, "Remote job timed out");
        Ok(timed_out(polls))
    }

    /// Submit and drive a job with this poller's policy
    pub async fn run(
        &self,
        prompt: &str,
        job_type: JobType,
        cancel: &CancellationToken,
    ) -> Result<JobOutcome, TransportError> {
        if cancel.is_cancelled() {
            return Ok(JobOutcome::Failed(JobFailure::Cancelled { polls: 0 }));
        }
        let submission = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(JobOutcome::Failed(JobFailure::Cancelled { polls: 0 }));
            }
            submission = self.submit(prompt, job_type) => submission?,
        };
        match submission {
            Submission::Accepted(job) => self.await_result(job, &self.policy, cancel).await,
            Submission::Rejected(reason) => Ok(JobOutcome::Failed(JobFailure::Rejected(reason))),
        }
    }

    async fn collect(
        &self,
        job: RemoteJob,
        polls: u32,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> Result<JobOutcome, TransportError> {
        let Some(result_ref) = job.result_ref.clone() else {
            return Ok(JobOutcome::Failed(JobFailure::Failed {
                reason: "completed job has no result reference".to_string(),
                polls,
            }));
        };
        let media = match race(self.port.fetch_result(&result_ref), cancel, deadline).await {
            Ok(media) => media?,
            Err(cut) => return Ok(cut.outcome(&job, polls)),
        };
        info!(job_id = %job.id, polls, bytes = media.bytes.len(), "Remote job completed");
        Ok(JobOutcome::Completed { job, media, polls })
    }
}

/// Why a raced step was cut short
enum Cut {
    Cancelled,
    Expired,
}

impl Cut {
    fn outcome(self, job: &RemoteJob, polls: u32) -> JobOutcome {
        match self {
            Cut::Cancelled => {
                info!(job_id = %job.id, polls, "Remote job polling cancelled");
                JobOutcome::Failed(JobFailure::Cancelled { polls })
            }
            Cut::Expired => {
                warn!(job_id = %job.id, polls, "Remote job timed out");
                timed_out(polls)
            }
        }
    }
}

fn timed_out(polls: u32) -> JobOutcome {
    JobOutcome::Failed(JobFailure::TimedOut { polls })
}

/// Run `step` unless cancellation or the deadline gets there first. A step that
/// is ready at the same instant as the deadline still wins.
async fn race<F: Future>(
    step: F,
    cancel: &CancellationToken,
    deadline: Instant,
) -> Result<F::Output, Cut> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cut::Cancelled),
        value = step => Ok(value),
        _ = sleep_until(deadline) => Err(Cut::Expired),
    }
}
