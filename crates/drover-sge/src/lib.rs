//! Grid Engine adapter.
//!
//! Job control goes through the usual client tools (`qsub`, `qstat`,
//! `qhold`, `qrls`, `qdel`); status feeds are the XML documents `qstat
//! -xml` emits, translated by [`qstat`].

pub mod qstat;
pub mod qsub;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use drover_core::{Adapter, Error, Info, InfoAttr, JobDependencies, Result, Script, Status};
use drover_parsers::command::{bin_path, invoke, CommandError};
use qstat::{JobDetail, JobListing, QstatError};
use std::collections::BTreeMap;

/// Adapter for a Grid Engine scheduler (SGE and its descendants).
#[derive(Debug, Clone, Default)]
pub struct SgeAdapter {
    /// Cluster label used in log lines.
    pub cluster: Option<String>,

    /// Directory holding the Grid Engine client binaries.
    pub bin: Option<Utf8PathBuf>,

    /// Full replacement paths for individual commands.
    pub bin_overrides: BTreeMap<String, String>,

    /// Value exported as SGE_ROOT for every spawned command.
    pub sge_root: Option<Utf8PathBuf>,
}

/// Translate a Grid Engine state code from the queue listing.
///
/// Unknown codes degrade to `undetermined`: the code vocabulary differs
/// across Grid Engine forks and grows independently of this table.
fn translate_state(code: &str) -> Status {
    match code {
        // pending states with error
        "Eqw" | "Ehqw" | "EhRqw" => Status::Undetermined,
        // pending, with or without re-queue
        "qw" | "Rq" => Status::Queued,
        // pending but held back
        "hqw" | "hRwq" => Status::QueuedHeld,
        // running or transferring
        "r" | "t" | "Rr" | "Rt" => Status::Running,
        // suspended, whether by user, queue, or alarm
        "s" | "ts" | "S" | "tS" | "T" | "tT" | "Rs" | "Rts" | "RS" | "RtS" | "RT" | "RtT" => {
            Status::Suspended
        }
        // any state combined with deletion
        "dr" | "dt" | "dRr" | "dRt" | "ds" | "dS" | "dT" | "dRs" | "dRS" | "dRT" => {
            Status::Completed
        }
        other => {
            tracing::debug!(code = other, "unrecognized grid engine state code");
            Status::Undetermined
        }
    }
}

fn wallclock_since(dispatch: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u64 {
    dispatch
        .map(|d| (now - d).num_seconds().max(0) as u64)
        .unwrap_or(0)
}

fn listing_to_info(listing: JobListing, now: DateTime<Utc>) -> Info {
    let tasks = listing.tasks;
    Info {
        job_name: listing.job_name,
        job_owner: listing.job_owner,
        accounting_id: listing.accounting_id,
        procs: listing.slots,
        queue_name: listing.queue_name,
        wallclock_time: wallclock_since(listing.dispatch_time, now),
        wallclock_limit: listing.wallclock_limit,
        submission_time: listing.submission_time.unwrap_or(DateTime::UNIX_EPOCH),
        dispatch_time: listing.dispatch_time.unwrap_or(DateTime::UNIX_EPOCH),
        native: listing.native,
        ..Info::new(listing.id, translate_state(&listing.raw_state))
    }
    .with_tasks(tasks)
}

fn detail_to_info(detail: JobDetail, now: DateTime<Utc>) -> Info {
    let tasks = detail.tasks;
    Info {
        job_name: detail.job_name,
        job_owner: detail.job_owner,
        accounting_id: detail.accounting_id,
        procs: detail.procs,
        queue_name: detail.queue_name,
        wallclock_time: wallclock_since(detail.dispatch_time, now),
        wallclock_limit: detail.wallclock_limit,
        submission_time: detail.submission_time.unwrap_or(DateTime::UNIX_EPOCH),
        dispatch_time: detail.dispatch_time.unwrap_or(DateTime::UNIX_EPOCH),
        native: detail.native,
        ..Info::new(detail.id, detail.status)
    }
    .with_tasks(tasks)
}

fn backend_error(err: CommandError) -> Error {
    match err {
        CommandError::Failed { stderr, .. } => Error::Backend(stderr),
        spawn => Error::Backend(spawn.to_string()),
    }
}

fn format_error(err: QstatError) -> Error {
    Error::UnexpectedFormat(err.to_string())
}

impl SgeAdapter {
    async fn call(&self, cmd: &str, args: &[String], stdin: &str) -> Result<String> {
        let command = bin_path(cmd, self.bin.as_deref(), &self.bin_overrides);
        let mut env = BTreeMap::new();
        if let Some(root) = &self.sge_root {
            env.insert("SGE_ROOT".to_string(), root.to_string());
        }
        invoke(&command, args, &env, stdin)
            .await
            .map_err(backend_error)
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }
}

#[async_trait]
impl Adapter for SgeAdapter {
    async fn submit(&self, script: &Script, dependencies: JobDependencies) -> Result<String> {
        let args = qsub::submit_args(script, &dependencies)?;
        let response = self.call("qsub", &args, &script.content).await?;
        qsub::parse_job_id(&response)
    }

    async fn info_all(&self, _attrs: Option<&[InfoAttr]>) -> Result<Vec<Info>> {
        let xml = self.call("qstat", &Self::args(&["-r", "-xml"]), "").await?;
        let now = Utc::now();
        let listings = qstat::parse_queue_listing(&xml).map_err(format_error)?;
        Ok(listings
            .into_iter()
            .map(|listing| listing_to_info(listing, now))
            .collect())
    }

    async fn info(&self, id: &str) -> Result<Info> {
        let result = self
            .call("qstat", &Self::args(&["-r", "-xml", "-j", id]), "")
            .await;
        let xml = match result {
            Ok(xml) => xml,
            // a job no longer in the queue tables has completed
            Err(Error::Backend(msg)) if msg.contains("do not exist") => {
                return Ok(Info::completed(id));
            }
            Err(e) => return Err(e),
        };
        let detail = qstat::parse_job_detail(&xml).map_err(format_error)?;
        Ok(detail_to_info(detail, Utc::now()))
    }

    async fn status(&self, id: &str) -> Result<Status> {
        Ok(self.info(id).await?.status)
    }

    async fn hold(&self, id: &str) -> Result<()> {
        self.call("qhold", &Self::args(&[id]), "").await.map(|_| ())
    }

    async fn release(&self, id: &str) -> Result<()> {
        self.call("qrls", &Self::args(&[id]), "").await.map(|_| ())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.call("qdel", &Self::args(&[id]), "").await.map(|_| ())
    }

    fn directive_prefix(&self) -> Result<Option<&'static str>> {
        Ok(Some("#$"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_translate_state() {
        assert_eq!(translate_state("qw"), Status::Queued);
        assert_eq!(translate_state("hqw"), Status::QueuedHeld);
        assert_eq!(translate_state("r"), Status::Running);
        assert_eq!(translate_state("s"), Status::Suspended);
        assert_eq!(translate_state("dr"), Status::Completed);
        assert_eq!(translate_state("Eqw"), Status::Undetermined);
    }

    #[test]
    fn test_unknown_vendor_code_degrades_to_undetermined() {
        assert_eq!(translate_state("zz9"), Status::Undetermined);
        assert_eq!(translate_state(""), Status::Undetermined);
    }

    #[test]
    fn test_listing_wallclock_is_relative_to_dispatch() {
        let now = Utc.with_ymd_and_hms(2018, 10, 9, 19, 0, 0).unwrap();
        let listing = JobListing {
            id: "1088".into(),
            raw_state: "r".into(),
            dispatch_time: Some(Utc.with_ymd_and_hms(2018, 10, 9, 18, 50, 0).unwrap()),
            ..JobListing::default()
        };
        let info = listing_to_info(listing, now);
        assert_eq!(info.wallclock_time, 600);
    }

    #[test]
    fn test_undispatched_listing_has_zero_wallclock() {
        let now = Utc::now();
        let listing = JobListing {
            id: "1089".into(),
            raw_state: "qw".into(),
            ..JobListing::default()
        };
        let info = listing_to_info(listing, now);
        assert_eq!(info.wallclock_time, 0);
        assert_eq!(info.status, Status::Queued);
        assert_eq!(info.dispatch_time, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn test_directive_prefix() {
        assert_eq!(SgeAdapter::default().directive_prefix().unwrap(), Some("#$"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_command_surfaces_stderr_as_backend_error() {
        use std::os::unix::fs::PermissionsExt;

        let path = std::env::temp_dir().join("drover_sge_qdel_denied.sh");
        std::fs::write(&path, "#!/bin/sh\necho 'permission denied' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let adapter = SgeAdapter {
            bin_overrides: BTreeMap::from([(
                "qdel".to_string(),
                path.to_str().unwrap().to_string(),
            )]),
            ..SgeAdapter::default()
        };
        let err = adapter.delete("1234").await.unwrap_err();
        match err {
            Error::Backend(stderr) => assert_eq!(stderr.trim(), "permission denied"),
            other => panic!("expected Backend, got {other:?}"),
        }
    }
}
