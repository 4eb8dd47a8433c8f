//! Streaming translation of `qstat -xml` status feeds.
//!
//! The feeds can be large and consumers only need flat scalar fields, so
//! the documents are never built into a tree: a pull loop over the XML
//! events feeds a per-record accumulator, the most recent character data is
//! buffered, and a record-boundary end tag snapshots the accumulator into
//! the output.

use chrono::{DateTime, Utc};
use drover_core::array_ids;
use drover_core::{Status, Task};
use drover_parsers::time::{parse_epoch_timestamp, parse_iso_timestamp};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QstatError {
    #[error("malformed qstat xml: {0}")]
    Xml(String),
}

/// One job record from the per-queue listing (`qstat -r -xml`).
///
/// Fields are limited to what the queue listing exposes; the raw state code
/// still needs translation into a canonical status.
#[derive(Debug, Clone, Default)]
pub struct JobListing {
    pub id: String,
    pub job_name: String,
    pub job_owner: String,
    pub accounting_id: String,
    pub raw_state: String,
    pub slots: u32,
    pub queue_name: String,
    pub submission_time: Option<DateTime<Utc>>,
    pub dispatch_time: Option<DateTime<Utc>>,
    pub wallclock_limit: Option<u64>,
    /// Pending array tasks, expanded from the compact range string.
    pub tasks: Vec<Task>,
    pub native: BTreeMap<String, String>,
}

/// The per-job detail record (`qstat -j <id> -xml`).
#[derive(Debug, Clone)]
pub struct JobDetail {
    pub id: String,
    pub job_name: String,
    pub job_owner: String,
    pub accounting_id: String,
    pub status: Status,
    pub queue_name: String,
    pub submission_time: Option<DateTime<Utc>>,
    pub dispatch_time: Option<DateTime<Utc>>,
    pub wallclock_limit: Option<u64>,
    /// Procs are unknowable from the detail output.
    pub procs: u32,
    pub tasks: Vec<Task>,
    pub native: BTreeMap<String, String>,
}

impl Default for JobDetail {
    fn default() -> Self {
        Self {
            id: String::new(),
            job_name: String::new(),
            job_owner: String::new(),
            accounting_id: String::new(),
            status: Status::Queued,
            queue_name: String::new(),
            submission_time: None,
            dispatch_time: None,
            wallclock_limit: None,
            procs: 1,
            tasks: Vec::new(),
            native: BTreeMap::new(),
        }
    }
}

fn native_tag(name: &str) -> bool {
    name.starts_with("JB_") || name.starts_with("JAT_")
}

/// Parse the per-queue listing: one record per `job_list` element.
pub fn parse_queue_listing(xml: &str) -> Result<Vec<JobListing>, QstatError> {
    let mut reader = Reader::from_str(xml);

    let mut jobs = Vec::new();
    let mut current = JobListing::default();
    let mut text = String::new();
    // name attribute of the hard_request element being read, if any
    let mut current_request: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"hard_request" {
                    current_request = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() == b"name")
                        .and_then(|a| a.unescape_value().ok())
                        .map(|v| v.into_owned());
                }
            }
            Ok(Event::Text(t)) => {
                let value = t.unescape().map_err(|e| QstatError::Xml(e.to_string()))?;
                // indentation between elements must not clobber the buffer
                if !value.trim().is_empty() {
                    text = value.trim().to_string();
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if native_tag(&name) {
                    current.native.insert(name.clone(), text.clone());
                }
                match name.as_str() {
                    "JB_job_number" => current.id = text.clone(),
                    "JB_name" => current.job_name = text.clone(),
                    "JB_owner" => current.job_owner = text.clone(),
                    "JB_project" => current.accounting_id = text.clone(),
                    "state" => current.raw_state = text.clone(),
                    "slots" => current.slots = text.trim().parse().unwrap_or(0),
                    "hard_req_queue" => current.queue_name = text.clone(),
                    "JB_submission_time" => {
                        current.submission_time = parse_iso_timestamp(&text)
                    }
                    "JAT_start_time" => current.dispatch_time = parse_iso_timestamp(&text),
                    "hard_request" => {
                        if current_request.as_deref() == Some("h_rt") {
                            current.wallclock_limit = text.trim().parse().ok();
                        }
                        current_request = None;
                    }
                    "tasks" => {
                        // compact range of tasks still waiting to run
                        current.tasks = array_ids::ids(&text)
                            .into_iter()
                            .map(|id| Task::new(id.to_string(), Status::Queued))
                            .collect();
                    }
                    "job_list" => {
                        jobs.push(std::mem::take(&mut current));
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(QstatError::Xml(e.to_string())),
        }
    }

    Ok(jobs)
}

/// Parse the per-job detail document into a single record.
///
/// Array reconciliation: the declared range is expanded, explicitly
/// reported tasks are `running`, and every declared id beyond the highest
/// running id is still `queued`. Ids at or below the frontier that were not
/// reported are treated as already finished and dropped. A range that
/// collapses to a single task means the job is not an array job and no task
/// list is synthesized.
pub fn parse_job_detail(xml: &str) -> Result<JobDetail, QstatError> {
    let mut reader = Reader::from_str(xml);

    let mut job = JobDetail::default();
    let mut text = String::new();
    let mut current_request: Option<String> = None;
    let mut running_tasks: Vec<u32> = Vec::new();
    // declared array range, as RN_min / RN_max / RN_step sub-values
    let (mut range_min, mut range_max, mut range_step) = (None, None, None);

    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) => {
                let value = t.unescape().map_err(|e| QstatError::Xml(e.to_string()))?;
                if !value.trim().is_empty() {
                    text = value.trim().to_string();
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if native_tag(&name) {
                    job.native.insert(name.clone(), text.clone());
                }
                match name.as_str() {
                    "JB_job_number" => job.id = text.clone(),
                    "JB_job_name" => job.job_name = text.clone(),
                    "JB_owner" => job.job_owner = text.clone(),
                    "JB_project" => job.accounting_id = text.clone(),
                    "JB_submission_time" => {
                        job.submission_time = parse_epoch_timestamp(&text)
                    }
                    "JAT_start_time" => {
                        job.status = Status::Running;
                        job.dispatch_time = parse_epoch_timestamp(&text);
                    }
                    "JAT_task_number" => {
                        if let Ok(id) = text.trim().parse() {
                            running_tasks.push(id);
                        }
                    }
                    "RN_min" => range_min = text.trim().parse::<u32>().ok(),
                    "RN_max" => range_max = text.trim().parse::<u32>().ok(),
                    "RN_step" => range_step = text.trim().parse::<u32>().ok(),
                    "CE_name" => current_request = Some(text.clone()),
                    "CE_stringval" => {
                        if current_request.as_deref() == Some("h_rt") {
                            job.wallclock_limit = text.trim().parse().ok();
                        }
                        current_request = None;
                    }
                    "QR_name" => job.queue_name = text.clone(),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(QstatError::Xml(e.to_string())),
        }
    }

    if !running_tasks.is_empty() {
        job.status = Status::Running;
    }
    job.tasks = reconcile_tasks(range_min, range_max, range_step, &running_tasks);
    Ok(job)
}

/// Synthesize the task list for an array job from its declared range and
/// the ids the scheduler reports as in flight.
fn reconcile_tasks(
    min: Option<u32>,
    max: Option<u32>,
    step: Option<u32>,
    running: &[u32],
) -> Vec<Task> {
    let (Some(min), Some(max)) = (min, max) else {
        return Vec::new();
    };
    let spec = format!("{min}-{max}:{}", step.unwrap_or(1));
    let declared = array_ids::ids(&spec);
    if declared.len() <= 1 {
        // the degenerate single-task form; not an array job
        return Vec::new();
    }

    let frontier = running.iter().copied().max().unwrap_or(0);
    let mut by_id: BTreeMap<u32, Status> = running
        .iter()
        .map(|&id| (id, Status::Running))
        .collect();
    for id in declared {
        if id > frontier {
            by_id.entry(id).or_insert(Status::Queued);
        }
    }

    by_id
        .into_iter()
        .map(|(id, status)| Task::new(id.to_string(), status))
        .collect()
}
