//! LSF adapter.
//!
//! Job control goes through `bsub`, `bjobs`, `bstop`, `bresume`, and
//! `bkill`. Status comes from the wide columnar listing `bjobs -u all -a
//! -w -W`, translated by [`bjobs`].

pub mod bjobs;
pub mod bsub;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use drover_core::{Adapter, Error, Info, InfoAttr, JobDependencies, Result, Script, Status};
use drover_parsers::command::{bin_path, invoke, ssh_wrap, CommandError};
use drover_parsers::time::parse_past_time;
use std::collections::BTreeMap;

use bjobs::BjobsRow;

/// Adapter for an LSF batch server.
#[derive(Debug, Clone)]
pub struct LsfAdapter {
    /// Directory holding the LSF client binaries.
    pub bindir: Option<Utf8PathBuf>,

    /// LSF library directory, exported as LSF_LIBDIR.
    pub libdir: Option<Utf8PathBuf>,

    /// LSF configuration directory, exported as LSF_ENVDIR.
    pub envdir: Option<Utf8PathBuf>,

    /// LSF server directory, exported as LSF_SERVERDIR.
    pub serverdir: Option<Utf8PathBuf>,

    /// Cluster to address in a multi-cluster installation.
    pub cluster: Option<String>,

    /// Full replacement paths for individual commands.
    pub bin_overrides: BTreeMap<String, String>,

    /// Host to run the client commands on over ssh, when the current host
    /// has no LSF installation.
    pub submit_host: Option<String>,

    pub strict_host_checking: bool,
}

impl Default for LsfAdapter {
    fn default() -> Self {
        Self {
            bindir: None,
            libdir: None,
            envdir: None,
            serverdir: None,
            cluster: None,
            bin_overrides: BTreeMap::new(),
            submit_host: None,
            strict_host_checking: true,
        }
    }
}

/// Translate a bjobs STAT cell. Unknown codes degrade to `undetermined`.
fn translate_state(code: &str) -> Status {
    match code {
        "RUN" => Status::Running,
        "PEND" | "WAIT" => Status::Queued,
        "DONE" | "EXIT" => Status::Completed,
        // suspended while pending: still blocked from being scheduled
        "PSUSP" => Status::QueuedHeld,
        "USUSP" | "SSUSP" => Status::Suspended,
        other => {
            // ZOMBI and UNKWN land here on purpose
            tracing::debug!(code = other, "unrecognized bjobs state code");
            Status::Undetermined
        }
    }
}

fn row_to_info(row: BjobsRow, now: DateTime<Utc>) -> Info {
    let status = translate_state(row.status.as_deref().unwrap_or(""));
    let allocated_nodes = row
        .exec_host
        .as_deref()
        .map(bjobs::parse_exec_host)
        .unwrap_or_default();
    let procs = allocated_nodes
        .iter()
        .map(|n| n.procs.unwrap_or(0))
        .sum();
    let submission_time = row.submit_time.as_deref().and_then(|t| parse_past_time(t, now));
    let dispatch_time = row.start_time.as_deref().and_then(|t| parse_past_time(t, now));
    let finish_time = row.finish_time.as_deref().and_then(|t| parse_past_time(t, now));

    Info {
        allocated_nodes,
        submit_host: row.from_host.unwrap_or_default(),
        job_name: row.name.unwrap_or_default(),
        job_owner: row.user.unwrap_or_default(),
        accounting_id: row.project.unwrap_or_default(),
        procs,
        queue_name: row.queue.unwrap_or_default(),
        wallclock_time: bjobs::estimate_runtime(now, dispatch_time, finish_time).unwrap_or(0),
        cpu_time: row
            .cpu_used
            .as_deref()
            .and_then(bjobs::parse_cpu_used)
            .unwrap_or(0),
        submission_time: submission_time.unwrap_or(DateTime::UNIX_EPOCH),
        dispatch_time: dispatch_time.unwrap_or(DateTime::UNIX_EPOCH),
        native: row.native,
        ..Info::new(row.id, status)
    }
}

fn backend_error(err: CommandError) -> Error {
    match err {
        CommandError::Failed { stderr, .. } => Error::Backend(stderr),
        spawn => Error::Backend(spawn.to_string()),
    }
}

impl LsfAdapter {
    fn default_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        if let Some(dir) = &self.bindir {
            env.insert("LSF_BINDIR".to_string(), dir.to_string());
        }
        if let Some(dir) = &self.libdir {
            env.insert("LSF_LIBDIR".to_string(), dir.to_string());
        }
        if let Some(dir) = &self.envdir {
            env.insert("LSF_ENVDIR".to_string(), dir.to_string());
        }
        if let Some(dir) = &self.serverdir {
            env.insert("LSF_SERVERDIR".to_string(), dir.to_string());
        }
        env
    }

    async fn call(
        &self,
        cmd: &str,
        args: &[&str],
        extra_env: BTreeMap<String, String>,
        stdin: &str,
    ) -> Result<String> {
        let command = bin_path(cmd, self.bindir.as_deref(), &self.bin_overrides);
        let mut full_args: Vec<String> = Vec::new();
        if let Some(cluster) = self.cluster.as_deref().filter(|c| !c.is_empty()) {
            full_args.push("-m".to_string());
            full_args.push(cluster.to_string());
        }
        full_args.extend(args.iter().map(|s| s.to_string()));

        let mut env = self.default_env();
        env.extend(extra_env);

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
}

#[async_trait]
impl Adapter for LsfAdapter {
    async fn submit(&self, script: &Script, dependencies: JobDependencies) -> Result<String> {
        let (args, env) = bsub::submit_args(script, &dependencies)?;
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let response = self.call("bsub", &arg_refs, env, &script.content).await?;
        bsub::parse_bsub_output(&response)
    }

    async fn info_all(&self, _attrs: Option<&[InfoAttr]>) -> Result<Vec<Info>> {
        let raw = self
            .call("bjobs", &["-u", "all", "-a", "-w", "-W"], BTreeMap::new(), "")
            .await?;
        let now = Utc::now();
        let rows = bjobs::parse_bjobs(&raw)
            .map_err(|e| Error::UnexpectedFormat(e.to_string()))?;
        Ok(rows.into_iter().map(|row| row_to_info(row, now)).collect())
    }

    async fn info(&self, id: &str) -> Result<Info> {
        let result = self
            .call("bjobs", &["-a", "-w", "-W", id], BTreeMap::new(), "")
            .await;
        let raw = match result {
            Ok(raw) => raw,
            // bjobs reports an unknown id on stderr with a non-zero exit;
            // the job has left the scheduler's tables
            Err(Error::Backend(msg)) if msg.contains("not found") => {
                return Ok(Info::completed(id));
            }
            Err(e) => return Err(e),
        };
        let rows = bjobs::parse_bjobs(&raw)
            .map_err(|e| Error::UnexpectedFormat(e.to_string()))?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row_to_info(row, Utc::now()))
            .unwrap_or_else(|| Info::completed(id)))
    }

    async fn status(&self, id: &str) -> Result<Status> {
        Ok(self.info(id).await?.status)
    }

    async fn hold(&self, id: &str) -> Result<()> {
        self.call("bstop", &[id], BTreeMap::new(), "").await.map(|_| ())
    }

    async fn release(&self, id: &str) -> Result<()> {
        self.call("bresume", &[id], BTreeMap::new(), "").await.map(|_| ())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.call("bkill", &[id], BTreeMap::new(), "").await.map(|_| ())
    }

    fn directive_prefix(&self) -> Result<Option<&'static str>> {
        Ok(Some("#BSUB"))
    }

    /// bjobs -W output has no per-task detail to translate.
    fn supports_job_arrays(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_translate_state() {
        assert_eq!(translate_state("RUN"), Status::Running);
        assert_eq!(translate_state("PEND"), Status::Queued);
        assert_eq!(translate_state("DONE"), Status::Completed);
        assert_eq!(translate_state("EXIT"), Status::Completed);
        assert_eq!(translate_state("PSUSP"), Status::QueuedHeld);
        assert_eq!(translate_state("USUSP"), Status::Suspended);
        assert_eq!(translate_state("SSUSP"), Status::Suspended);
        assert_eq!(translate_state("ZOMBI"), Status::Undetermined);
        assert_eq!(translate_state("UNKWN"), Status::Undetermined);
    }

    #[test]
    fn test_row_to_info_running_job() {
        let now = Utc.with_ymd_and_hms(2017, 4, 1, 0, 0, 0).unwrap();
        let row = BjobsRow {
            id: "542935".into(),
            user: Some("efranz".into()),
            status: Some("RUN".into()),
            queue: Some("short".into()),
            from_host: Some("foobar02.osc.edu".into()),
            exec_host: Some("compute013".into()),
            name: Some("foo".into()),
            submit_time: Some("03/31-14:46:42".into()),
            project: Some("default".into()),
            cpu_used: Some("000:00:00.00".into()),
            start_time: Some("03/31-14:46:44".into()),
            finish_time: None,
            ..BjobsRow::default()
        };
        let info = row_to_info(row, now);

        assert_eq!(info.id, "542935");
        assert_eq!(info.status, Status::Running);
        assert_eq!(info.job_owner, "efranz");
        assert_eq!(info.submit_host, "foobar02.osc.edu");
        assert_eq!(info.accounting_id, "default");
        assert_eq!(info.queue_name, "short");
        assert_eq!(info.procs, 1);
        assert_eq!(
            info.allocated_nodes,
            vec![drover_core::NodeInfo {
                procs: Some(1),
                ..drover_core::NodeInfo::new("compute013")
            }]
        );
        assert_eq!(
            info.dispatch_time,
            Utc.with_ymd_and_hms(2017, 3, 31, 14, 46, 44).unwrap()
        );
        // still running: estimated against "now"
        assert_eq!(
            info.wallclock_time,
            (now - info.dispatch_time).num_seconds() as u64
        );
        assert_eq!(info.cpu_time, 0);
    }

    #[test]
    fn test_row_to_info_pending_job_has_zero_values() {
        let now = Utc::now();
        let row = BjobsRow {
            id: "542936".into(),
            status: Some("PEND".into()),
            ..BjobsRow::default()
        };
        let info = row_to_info(row, now);
        assert_eq!(info.status, Status::Queued);
        assert_eq!(info.procs, 0);
        assert_eq!(info.wallclock_time, 0);
        assert_eq!(info.dispatch_time, DateTime::UNIX_EPOCH);
        assert!(info.allocated_nodes.is_empty());
    }

    #[test]
    fn test_job_arrays_unsupported() {
        assert!(!LsfAdapter::default().supports_job_arrays());
    }

    #[test]
    fn test_directive_prefix() {
        assert_eq!(
            LsfAdapter::default().directive_prefix().unwrap(),
            Some("#BSUB")
        );
    }
}
