//! Slurm adapter.
//!
//! Job control goes through `sbatch`, `squeue`, `scontrol`, and `scancel`.
//! Status comes from a formatted, delimiter-separated `squeue` listing
//! translated by [`squeue`]; account and partition projections come from
//! `sacctmgr` and `scontrol show partition` via [`partitions`].

pub mod partitions;
pub mod sbatch;
pub mod squeue;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use chrono::DateTime;
use drover_core::{
    AccountInfo, Adapter, Error, Info, InfoAttr, JobDependencies, QueueInfo, Result, Script,
    Status,
};
use drover_parsers::command::{bin_path, invoke, ssh_wrap, CommandError};
use drover_parsers::time::{parse_duration_secs, parse_iso_timestamp};
use std::collections::BTreeMap;

/// Adapter for a Slurm batch server.
#[derive(Debug, Clone)]
pub struct SlurmAdapter {
    /// Cluster to address in a federated installation (`-M`).
    pub cluster: Option<String>,

    /// Directory holding the Slurm client binaries.
    pub bin: Option<Utf8PathBuf>,

    /// Full replacement paths for individual commands.
    pub bin_overrides: BTreeMap<String, String>,

    /// slurm.conf to address, exported as SLURM_CONF.
    pub conf: Option<Utf8PathBuf>,

    /// Host to run the client commands on over ssh.
    pub submit_host: Option<String>,

    pub strict_host_checking: bool,
}

impl Default for SlurmAdapter {
    fn default() -> Self {
        Self {
            cluster: None,
            bin: None,
            bin_overrides: BTreeMap::new(),
            conf: None,
            submit_host: None,
            strict_host_checking: true,
        }
    }
}

/// Translate a compact squeue state code. Unknown codes degrade to
/// `undetermined`.
fn translate_state(code: &str) -> Status {
    match code {
        // BOOT_FAIL, CANCELLED, COMPLETED, FAILED, NODE_FAIL, REVOKED,
        // SPECIAL_EXIT, TIMEOUT: all gone from the active table
        "BF" | "CA" | "CD" | "F" | "NF" | "RV" | "SE" | "TO" => Status::Completed,
        // CONFIGURING, PENDING
        "CF" | "PD" => Status::Queued,
        // COMPLETING, RUNNING, STOPPED
        "CG" | "R" | "ST" => Status::Running,
        // PREEMPTED, SUSPENDED
        "PR" | "S" => Status::Suspended,
        _ => Status::Undetermined,
    }
}

fn record_to_info(record: BTreeMap<String, String>) -> Info {
    let get = |key: &str| record.get(key).map(String::as_str).unwrap_or("");

    let status = translate_state(get("state_compact"));
    let id = get("job_id").to_string();
    let allocated_nodes = squeue::parse_nodes(get("node_list"));
    let job_name = get("job_name").to_string();
    let job_owner = get("user").to_string();
    let accounting_id = get("account").to_string();
    let procs = get("cpus").parse().unwrap_or(0);
    let queue_name = get("partition").to_string();
    let wallclock_time = parse_duration_secs(get("time_used")).unwrap_or(0);
    let wallclock_limit = parse_duration_secs(get("time_limit"));
    let submission_time = parse_iso_timestamp(get("submit_time"));
    let dispatch_time = parse_iso_timestamp(get("start_time"));

    Info {
        allocated_nodes,
        job_name,
        job_owner,
        accounting_id,
        procs,
        queue_name,
        wallclock_time,
        wallclock_limit,
        submission_time: submission_time.unwrap_or(DateTime::UNIX_EPOCH),
        dispatch_time: dispatch_time.unwrap_or(DateTime::UNIX_EPOCH),
        native: record,
        ..Info::new(id, status)
    }
}

/// Whether a squeue record answers a query for `id`, either directly or as
/// the `job_task` form (`"1234_0"`) of an array sibling.
fn record_matches(record: &BTreeMap<String, String>, id: &str) -> bool {
    record.get("job_id").is_some_and(|v| v == id)
        || record.get("array_job_task_id").is_some_and(|v| v == id)
}

fn backend_error(err: CommandError) -> Error {
    match err {
        CommandError::Failed { stderr, .. } => Error::Backend(stderr),
        spawn => Error::Backend(spawn.to_string()),
    }
}

fn vanished(msg: &str) -> bool {
    msg.contains("Invalid job id specified")
}

impl SlurmAdapter {
    async fn call(
        &self,
        cmd: &str,
        args: &[&str],
        extra_env: BTreeMap<String, String>,
        stdin: &str,
    ) -> Result<String> {
        let command = bin_path(cmd, self.bin.as_deref(), &self.bin_overrides);
        let mut full_args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        if let Some(cluster) = self.cluster.as_deref().filter(|c| !c.is_empty()) {
            full_args.push("-M".to_string());
            full_args.push(cluster.to_string());
        }

        let mut env = extra_env;
        if let Some(conf) = &self.conf {
            env.insert("SLURM_CONF".to_string(), conf.to_string());
        }

        let (command, full_args) = ssh_wrap(
            self.submit_host.as_deref().unwrap_or(""),
            self.strict_host_checking,
            command,
            full_args,
        );
        invoke(&command, &full_args, &env, stdin)
            .await
            .map_err(backend_error)
    }

    async fn query(
        &self,
        id: Option<&str>,
        fields: &[squeue::Field],
    ) -> Result<Vec<BTreeMap<String, String>>> {
        let format = squeue::format_arg(fields);
        let mut args: Vec<&str> = vec!["--all", "--states=all", "--noconvert", "-o", &format];
        if let Some(id) = id {
            args.push("-j");
            args.push(id);
        }
        let raw = self.call("squeue", &args, BTreeMap::new(), "").await?;
        Ok(squeue::parse_squeue(
            &raw,
            fields,
            self.cluster.as_deref().is_some_and(|c| !c.is_empty()),
        ))
    }

    /// Accounts the calling user may charge jobs against.
    pub async fn accounts(&self) -> Result<Vec<AccountInfo>> {
        let user = std::env::var("USER").unwrap_or_default();
        let filter = format!("user={user}");
        let args = [
            "-nP",
            "show",
            "users",
            "withassoc",
            "format=account,cluster,qos",
            "where",
            filter.as_str(),
        ];
        let raw = self.call("sacctmgr", &args, BTreeMap::new(), "").await?;
        Ok(partitions::parse_accounts(&raw))
    }

    /// Partitions this cluster schedules into.
    pub async fn queues(&self) -> Result<Vec<QueueInfo>> {
        let raw = self
            .call("scontrol", &["show", "partition", "--oneliner"], BTreeMap::new(), "")
            .await?;
        Ok(partitions::parse_partitions(&raw))
    }
}

#[async_trait]
impl Adapter for SlurmAdapter {
    async fn submit(&self, script: &Script, dependencies: JobDependencies) -> Result<String> {
        let (mut args, env) = sbatch::submit_args(script, &dependencies)?;
        args.push("--parsable".to_string());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let response = self.call("sbatch", &arg_refs, env, &script.content).await?;
        sbatch::parse_sbatch_output(&response)
    }

    async fn info_all(&self, attrs: Option<&[InfoAttr]>) -> Result<Vec<Info>> {
        let fields = squeue::fields_for(attrs);
        let records = self.query(None, &fields).await?;
        Ok(records.into_iter().map(record_to_info).collect())
    }

    async fn info(&self, id: &str) -> Result<Info> {
        let records = match self.query(Some(id), &squeue::fields_for(None)).await {
            Ok(records) => records,
            Err(Error::Backend(msg)) if vanished(&msg) => return Ok(Info::completed(id)),
            Err(e) => return Err(e),
        };
        // an array job id expands to several sibling rows; take the row for
        // the queried id, and treat a missing row as a finished job
        Ok(records
            .into_iter()
            .find(|r| record_matches(r, id))
            .map(record_to_info)
            .unwrap_or_else(|| Info::completed(id)))
    }

    async fn status(&self, id: &str) -> Result<Status> {
        let fields = [
            squeue::Field::JobId,
            squeue::Field::ArrayJobTaskId,
            squeue::Field::StateCompact,
        ];
        let records = match self.query(Some(id), &fields).await {
            Ok(records) => records,
            Err(Error::Backend(msg)) if vanished(&msg) => return Ok(Status::Completed),
            Err(e) => return Err(e),
        };
        Ok(records
            .iter()
            .find(|r| record_matches(r, id))
            .map(|r| translate_state(r.get("state_compact").map(String::as_str).unwrap_or("")))
            .unwrap_or(Status::Completed))
    }

    async fn hold(&self, id: &str) -> Result<()> {
        self.call("scontrol", &["hold", id], BTreeMap::new(), "")
            .await
            .map(|_| ())
    }

    async fn release(&self, id: &str) -> Result<()> {
        self.call("scontrol", &["release", id], BTreeMap::new(), "")
            .await
            .map(|_| ())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.call("scancel", &[id], BTreeMap::new(), "").await.map(|_| ())
    }

    fn directive_prefix(&self) -> Result<Option<&'static str>> {
        Ok(Some("#SBATCH"))
    }
}
