//! PBS Professional adapter.
//!
//! Job control goes through `qsub`, `qstat`, `qhold`, `qrls`, and `qdel`.
//! Status comes from the full-format listing `qstat -f -t`, translated by
//! [`qstat`].

pub mod qstat;
pub mod qsub;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use drover_core::{Adapter, Error, Info, InfoAttr, JobDependencies, Result, Script, Status};
use drover_parsers::command::{invoke_in, CommandError};
use drover_parsers::time::parse_duration_secs;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use qstat::QstatRecord;

/// Adapter for a PBS Professional batch server.
#[derive(Debug, Clone, Default)]
pub struct PbsAdapter {
    /// Batch server host, exported as PBS_DEFAULT.
    pub host: Option<String>,

    /// PBS installation root; commands run from its `bin/` and the root is
    /// exported as PBS_EXEC.
    pub exec: Option<Utf8PathBuf>,
}

/// Translate a qstat `job_state` code. Unknown codes degrade to
/// `undetermined`.
fn translate_state(code: &str) -> Status {
    match code {
        // W is waiting for its submitter-assigned start time
        "Q" | "W" => Status::Queued,
        // T is in transit to a new location
        "H" | "T" => Status::QueuedHeld,
        "R" => Status::Running,
        // E is exiting after having run
        "E" => Status::Running,
        // U is suspended because of workstation keyboard activity
        "S" | "U" => Status::Suspended,
        // M moved to another server, F finished, X subjob finished
        "M" | "F" | "X" => Status::Completed,
        other => {
            tracing::debug!(code = other, "unrecognized pbs state code");
            Status::Undetermined
        }
    }
}

static JOB_OWNER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<owner>[\w-]+)@(?P<host>.+)$").unwrap());

fn record_to_info(record: QstatRecord) -> Info {
    let (job_owner, submit_host) = record
        .attr("Job_Owner")
        .and_then(|v| JOB_OWNER.captures(v))
        .map(|caps| (caps["owner"].to_string(), caps["host"].to_string()))
        .unwrap_or_default();

    let allocated_nodes = qstat::parse_nodes(record.attr("exec_host").unwrap_or(""));
    let procs = allocated_nodes.iter().map(|n| n.procs.unwrap_or(0)).sum();
    let status = translate_state(record.attr("job_state").unwrap_or(""));

    Info {
        allocated_nodes,
        submit_host,
        job_name: record.attr("Job_Name").unwrap_or("").to_string(),
        job_owner,
        accounting_id: record.attr("Account_Name").unwrap_or("").to_string(),
        procs,
        queue_name: record.attr("queue").unwrap_or("").to_string(),
        wallclock_time: record
            .attr("resources_used.walltime")
            .and_then(parse_duration_secs)
            .unwrap_or(0),
        wallclock_limit: record
            .attr("Resource_List.walltime")
            .and_then(parse_duration_secs),
        cpu_time: record
            .attr("resources_used.cput")
            .and_then(parse_duration_secs)
            .unwrap_or(0),
        submission_time: record
            .attr("ctime")
            .and_then(qstat::parse_timestamp)
            .unwrap_or(chrono::DateTime::UNIX_EPOCH),
        dispatch_time: record
            .attr("stime")
            .and_then(qstat::parse_timestamp)
            .unwrap_or(chrono::DateTime::UNIX_EPOCH),
        native: record.attrs,
        ..Info::new(record.id, status)
    }
}

fn backend_error(err: CommandError) -> Error {
    match err {
        CommandError::Failed { stderr, .. } => Error::Backend(stderr),
        spawn => Error::Backend(spawn.to_string()),
    }
}

/// qstat and the deletion commands report an id that has already left the
/// server as an error; for this adapter's purposes the job simply
/// completed.
fn vanished(msg: &str) -> bool {
    msg.contains("Unknown Job Id") || msg.contains("Job has finished")
}

impl PbsAdapter {
    async fn call(
        &self,
        cmd: &str,
        args: &[&str],
        stdin: &str,
        chdir: Option<&camino::Utf8Path>,
    ) -> Result<String> {
        let command = match &self.exec {
            Some(exec) => exec.join("bin").join(cmd).into_string(),
            None => cmd.to_string(),
        };
        let mut env = BTreeMap::new();
        if let Some(host) = &self.host {
            env.insert("PBS_DEFAULT".to_string(), host.clone());
        }
        if let Some(exec) = &self.exec {
            env.insert("PBS_EXEC".to_string(), exec.to_string());
        }
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        invoke_in(chdir, &command, &args, &env, stdin)
            .await
            .map_err(backend_error)
    }

    async fn get_jobs(&self, id: Option<&str>) -> Result<Vec<QstatRecord>> {
        let mut args = vec!["-f", "-t"];
        if let Some(id) = id {
            args.push(id);
        }
        let raw = self.call("qstat", &args, "", None).await?;
        Ok(qstat::parse_qstat(&raw))
    }
}

#[async_trait]
impl Adapter for PbsAdapter {
    async fn submit(&self, script: &Script, dependencies: JobDependencies) -> Result<String> {
        let args = qsub::submit_args(script, &dependencies)?;
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let response = self
            .call("qsub", &arg_refs, &script.content, script.workdir.as_deref())
            .await?;
        Ok(response.trim().to_string())
    }

    async fn info_all(&self, _attrs: Option<&[InfoAttr]>) -> Result<Vec<Info>> {
        Ok(self
            .get_jobs(None)
            .await?
            .into_iter()
            .map(record_to_info)
            .collect())
    }

    async fn info(&self, id: &str) -> Result<Info> {
        match self.get_jobs(Some(id)).await {
            Ok(records) => Ok(records
                .into_iter()
                .next()
                .map(record_to_info)
                .unwrap_or_else(|| Info::completed(id))),
            Err(Error::Backend(msg)) if vanished(&msg) => Ok(Info::completed(id)),
            Err(e) => Err(e),
        }
    }

    async fn status(&self, id: &str) -> Result<Status> {
        Ok(self.info(id).await?.status)
    }

    async fn hold(&self, id: &str) -> Result<()> {
        match self.call("qhold", &[id], "", None).await {
            Ok(_) => Ok(()),
            Err(Error::Backend(msg)) if vanished(&msg) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn release(&self, id: &str) -> Result<()> {
        match self.call("qrls", &[id], "", None).await {
            Ok(_) => Ok(()),
            Err(Error::Backend(msg)) if vanished(&msg) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.call("qdel", &[id], "", None).await {
            Ok(_) => Ok(()),
            Err(Error::Backend(msg)) if vanished(&msg) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn directive_prefix(&self) -> Result<Option<&'static str>> {
        Ok(Some("#PBS"))
    }
}
