//! Point-in-time job snapshots.

use crate::status::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resources used on one execution host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Host name.
    pub name: String,

    /// Procs reserved on this host, when the backend reports them.
    #[serde(default)]
    pub procs: Option<u32>,

    /// Node features, in the order the backend lists them.
    #[serde(default)]
    pub features: Vec<String>,
}

impl NodeInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            procs: None,
            features: Vec::new(),
        }
    }
}

/// One element of a job array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub status: Status,
    /// Accumulated wall clock seconds, when the backend reports per-task
    /// times.
    #[serde(default)]
    pub wallclock_time: Option<u64>,
}

impl Task {
    pub fn new(id: impl Into<String>, status: Status) -> Self {
        Self {
            id: id.into(),
            status,
            wallclock_time: None,
        }
    }
}

/// A snapshot of one job, created fresh on every query and never mutated
/// afterwards.
///
/// Only `id` and `status` are required; every other field defaults to its
/// zero value (empty string, 0, epoch, empty list) so that backends which
/// report different subsets of fields can all build a valid snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Info {
    /// Job id as the backend reports it.
    pub id: String,

    /// Canonical state. When `tasks` is non-empty this is the
    /// precedence-maximum of the task statuses (see [`Info::with_tasks`]).
    pub status: Status,

    /// Hosts allocated to the job.
    pub allocated_nodes: Vec<NodeInfo>,

    /// Host the job was submitted from.
    pub submit_host: String,

    pub job_name: String,
    pub job_owner: String,

    /// The account the job is charged against.
    pub accounting_id: String,

    /// Total procs allocated.
    pub procs: u32,

    /// Queue the job was queued or started in.
    pub queue_name: String,

    /// Accumulated wall clock seconds.
    pub wallclock_time: u64,

    /// Wall clock limit in seconds, when one is set.
    pub wallclock_limit: Option<u64>,

    /// Accumulated CPU seconds.
    pub cpu_time: u64,

    /// When the job was submitted.
    pub submission_time: DateTime<Utc>,

    /// When the job first started running.
    pub dispatch_time: DateTime<Utc>,

    /// Job-array task statuses; empty for plain jobs.
    pub tasks: Vec<Task>,

    /// The backend's raw fields for this job, keyed by the backend's own
    /// field names. Opaque to generic callers.
    pub native: BTreeMap<String, String>,
}

impl Info {
    pub fn new(id: impl Into<String>, status: Status) -> Self {
        Self {
            id: id.into(),
            status,
            allocated_nodes: Vec::new(),
            submit_host: String::new(),
            job_name: String::new(),
            job_owner: String::new(),
            accounting_id: String::new(),
            procs: 0,
            queue_name: String::new(),
            wallclock_time: 0,
            wallclock_limit: None,
            cpu_time: 0,
            submission_time: DateTime::UNIX_EPOCH,
            dispatch_time: DateTime::UNIX_EPOCH,
            tasks: Vec::new(),
            native: BTreeMap::new(),
        }
    }

    /// Snapshot for a job that is absent from the backend's active table.
    pub fn completed(id: impl Into<String>) -> Self {
        Self::new(id, Status::Completed)
    }

    /// Attach a task list, recomputing the parent status as the
    /// precedence-maximum of the task statuses. An empty list leaves the
    /// status untouched.
    pub fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        if let Some(aggregate) = Status::aggregate(tasks.iter().map(|t| t.status)) {
            self.status = aggregate;
        }
        self.tasks = tasks;
        self
    }

    /// Project the snapshot of a single array task out of this parent
    /// snapshot.
    ///
    /// The task's id, status, and wall clock time overlay the parent's;
    /// parent-only fields (allocated nodes, procs, cpu time, dispatch time,
    /// native payload, the task list itself) are cleared rather than
    /// misattributed to the child.
    pub fn child_info(&self, task: &Task) -> Info {
        Info {
            id: task.id.clone(),
            status: task.status,
            wallclock_time: task.wallclock_time.unwrap_or(self.wallclock_time),
            submit_host: self.submit_host.clone(),
            job_name: self.job_name.clone(),
            job_owner: self.job_owner.clone(),
            accounting_id: self.accounting_id.clone(),
            queue_name: self.queue_name.clone(),
            wallclock_limit: self.wallclock_limit,
            submission_time: self.submission_time,
            ..Info::new(String::new(), task.status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_value_defaults() {
        let info = Info::new("1234", Status::Queued);
        assert_eq!(info.id, "1234");
        assert_eq!(info.status, Status::Queued);
        assert!(info.allocated_nodes.is_empty());
        assert_eq!(info.submit_host, "");
        assert_eq!(info.job_name, "");
        assert_eq!(info.job_owner, "");
        assert_eq!(info.accounting_id, "");
        assert_eq!(info.procs, 0);
        assert_eq!(info.queue_name, "");
        assert_eq!(info.wallclock_time, 0);
        assert_eq!(info.wallclock_limit, None);
        assert_eq!(info.cpu_time, 0);
        assert_eq!(info.submission_time, DateTime::UNIX_EPOCH);
        assert_eq!(info.dispatch_time, DateTime::UNIX_EPOCH);
        assert!(info.tasks.is_empty());
        assert!(info.native.is_empty());
    }

    #[test]
    fn test_structural_equality() {
        let a = Info {
            job_name: "solver".into(),
            ..Info::new("1", Status::Running)
        };
        let b = Info {
            job_name: "solver".into(),
            ..Info::new("1", Status::Running)
        };
        assert_eq!(a, b);

        let c = Info {
            job_name: "post".into(),
            ..Info::new("1", Status::Running)
        };
        assert_ne!(a, c);
    }

    #[test]
    fn test_node_info_equality_includes_features() {
        let mut a = NodeInfo::new("c012");
        a.features = vec!["gpu".into(), "nvme".into()];
        let mut b = NodeInfo::new("c012");
        b.features = vec!["gpu".into(), "nvme".into()];
        assert_eq!(a, b);

        b.features.reverse();
        assert_ne!(a, b);
    }

    #[test]
    fn test_task_list_aggregates_parent_status() {
        let info = Info::new("77", Status::Queued).with_tasks(vec![
            Task::new("77.1", Status::Completed),
            Task::new("77.2", Status::Running),
            Task::new("77.3", Status::Queued),
        ]);
        assert_eq!(info.status, Status::Running);
    }

    #[test]
    fn test_child_info_overlays_task_and_clears_parent_only_fields() {
        let parent = Info {
            job_owner: "efranz".into(),
            queue_name: "short".into(),
            procs: 16,
            cpu_time: 900,
            wallclock_time: 120,
            ..Info::new("88", Status::Queued)
        }
        .with_tasks(vec![Task::new("88.4", Status::Running)]);

        let child = parent.child_info(&parent.tasks[0]);
        assert_eq!(child.id, "88.4");
        assert_eq!(child.status, Status::Running);
        assert_eq!(child.job_owner, "efranz");
        assert_eq!(child.queue_name, "short");
        // inherited because the task reported no time of its own
        assert_eq!(child.wallclock_time, 120);
        assert_eq!(child.procs, 0);
        assert_eq!(child.cpu_time, 0);
        assert!(child.tasks.is_empty());
        assert!(child.native.is_empty());
    }
}
