//! Job-submission descriptor.

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Describes a batch job before it is submitted, including the resources it
/// will request from the scheduler.
///
/// Only `content` is required. Every other field is optional, and `None`
/// means "not specified", which is distinct from an explicit `false` or
/// zero: several schedulers translate the explicit value into a flag of its
/// own (`rerunnable: Some(false)` becomes `-rn` for LSF while `None` emits
/// nothing).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Script body executed on the remote host.
    pub content: String,

    /// Arguments passed to the script.
    #[serde(default)]
    pub args: Vec<String>,

    /// Submit the job in a held state.
    #[serde(default)]
    pub submit_as_hold: Option<bool>,

    /// Whether the scheduler may restart the job, e.g. on node failure.
    #[serde(default)]
    pub rerunnable: Option<bool>,

    /// Environment variables to set on the remote host.
    #[serde(default)]
    pub job_environment: Option<BTreeMap<String, String>>,

    /// Directory the job runs from.
    #[serde(default)]
    pub workdir: Option<Utf8PathBuf>,

    /// Addresses for scheduler status notifications.
    #[serde(default)]
    pub email: Vec<String>,

    #[serde(default)]
    pub email_on_started: Option<bool>,

    #[serde(default)]
    pub email_on_terminated: Option<bool>,

    #[serde(default)]
    pub job_name: Option<String>,

    /// Login shell used for the job.
    #[serde(default)]
    pub shell_path: Option<Utf8PathBuf>,

    #[serde(default)]
    pub input_path: Option<Utf8PathBuf>,

    #[serde(default)]
    pub output_path: Option<Utf8PathBuf>,

    #[serde(default)]
    pub error_path: Option<Utf8PathBuf>,

    /// Existing reservation to associate the job with.
    #[serde(default)]
    pub reservation_id: Option<String>,

    #[serde(default)]
    pub queue_name: Option<String>,

    #[serde(default)]
    pub priority: Option<i64>,

    /// Earliest time the job may become eligible to run.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,

    /// Maximum real time in seconds.
    #[serde(default)]
    pub wall_time: Option<u64>,

    /// Account the job is charged against.
    #[serde(default)]
    pub accounting_id: Option<String>,

    /// Job-array request, commonly `"$START-$STOP"`.
    #[serde(default)]
    pub job_array_request: Option<String>,

    #[serde(default)]
    pub qos: Option<String>,

    #[serde(default)]
    pub gpus_per_node: Option<u32>,

    /// Whether the job inherits a copy of the submitting environment.
    /// `None` leaves the scheduler's own default in place.
    #[serde(default)]
    pub copy_environment: Option<bool>,

    /// Scheduler-specific extra submission arguments, passed through
    /// untouched after everything this model knows how to express.
    #[serde(default)]
    pub native: Vec<String>,
}

impl Script {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}
