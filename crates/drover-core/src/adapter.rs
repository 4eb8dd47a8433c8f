//! The backend contract.
//!
//! An [`Adapter`] defines the minimal primitives a scheduler backend must
//! provide; everything else (owner filtering, iteration, job-name
//! sanitization) is derived here once and behaves identically for every
//! backend.

use crate::error::{Error, Result};
use crate::info::Info;
use crate::script::Script;
use crate::status::Status;
use async_trait::async_trait;

/// Advisory hint naming the [`Info`] fields a caller needs.
///
/// Backends may use the hint to skip populating expensive fields, but `id`
/// and `status` are always populated regardless of the hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoAttr {
    Id,
    Status,
    AllocatedNodes,
    SubmitHost,
    JobName,
    JobOwner,
    AccountingId,
    Procs,
    QueueName,
    WallclockTime,
    WallclockLimit,
    CpuTime,
    SubmissionTime,
    DispatchTime,
    Tasks,
    Native,
}

/// Jobs a submission depends on, grouped by the event that satisfies the
/// dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDependencies {
    /// May start once these jobs have started.
    pub after: Vec<String>,
    /// May start once these jobs have ended without error.
    pub afterok: Vec<String>,
    /// May start once these jobs have ended with an error.
    pub afternotok: Vec<String>,
    /// May start once these jobs have ended either way.
    pub afterany: Vec<String>,
}

impl JobDependencies {
    pub fn is_empty(&self) -> bool {
        self.after.is_empty()
            && self.afterok.is_empty()
            && self.afternotok.is_empty()
            && self.afterany.is_empty()
    }
}

/// Communication with one resource manager for submitting, querying,
/// holding, releasing, and deleting jobs.
///
/// Backends implement the primitives; the provided methods are defined
/// purely in terms of those primitives and should not be overridden. A
/// primitive left unimplemented fails with [`Error::NotImplemented`],
/// distinct from an implemented primitive failing at runtime, which
/// surfaces as [`Error::Backend`].
///
/// Adapter calls are synchronous in effect: each one performs at least one
/// blocking external invocation and resolves only once it completes. Value
/// objects are immutable and instances hold no shared mutable state, so
/// independent adapter instances may be used concurrently; a single
/// instance is used sequentially unless its backend state is itself safe
/// to share.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Submit `script`, returning the id the scheduler assigned.
    ///
    /// A backend that cannot express one of the requested dependency kinds
    /// must fail with a descriptive error rather than silently ignore it.
    async fn submit(&self, _script: &Script, _dependencies: JobDependencies) -> Result<String> {
        Err(Error::NotImplemented("submit"))
    }

    /// Info for every job the resource manager currently knows about.
    async fn info_all(&self, _attrs: Option<&[InfoAttr]>) -> Result<Vec<Info>> {
        Err(Error::NotImplemented("info_all"))
    }

    /// Info for one job. Jobs absent from the scheduler's active table are
    /// reported as completed, not as errors.
    async fn info(&self, _id: &str) -> Result<Info> {
        Err(Error::NotImplemented("info"))
    }

    /// Status for one job; may be cheaper than [`Adapter::info`].
    async fn status(&self, _id: &str) -> Result<Status> {
        Err(Error::NotImplemented("status"))
    }

    /// Put a submitted job on hold.
    async fn hold(&self, _id: &str) -> Result<()> {
        Err(Error::NotImplemented("hold"))
    }

    /// Release a held job.
    async fn release(&self, _id: &str) -> Result<()> {
        Err(Error::NotImplemented("release"))
    }

    /// Delete a submitted job.
    async fn delete(&self, _id: &str) -> Result<()> {
        Err(Error::NotImplemented("delete"))
    }

    /// The scheduler's in-script directive marker (`#SBATCH`, `#BSUB`, ...),
    /// or `None` when the scheduler has no directive syntax.
    fn directive_prefix(&self) -> Result<Option<&'static str>> {
        Err(Error::NotImplemented("directive_prefix"))
    }

    /// Info for every job belonging to one of `owners`.
    ///
    /// When an attribute hint is given, `JobOwner` is added to it so the
    /// filter always has something to match against.
    async fn info_where_owner(
        &self,
        owners: &[&str],
        attrs: Option<&[InfoAttr]>,
    ) -> Result<Vec<Info>> {
        let attrs = attrs.map(|hint| {
            let mut hint = hint.to_vec();
            if !hint.contains(&InfoAttr::JobOwner) {
                hint.push(InfoAttr::JobOwner);
            }
            hint
        });
        let infos = self.info_all(attrs.as_deref()).await?;
        Ok(infos
            .into_iter()
            .filter(|info| owners.contains(&info.job_owner.as_str()))
            .collect())
    }

    /// Iterator over every job's info.
    ///
    /// Each call performs a fresh query, so the sequence is finite and
    /// restartable: iterating twice over the same backend state yields the
    /// same jobs in the same order.
    async fn info_all_each(
        &self,
        attrs: Option<&[InfoAttr]>,
    ) -> Result<std::vec::IntoIter<Info>> {
        Ok(self.info_all(attrs).await?.into_iter())
    }

    /// Iterator over the info of every job belonging to one of `owners`.
    async fn info_where_owner_each(
        &self,
        owners: &[&str],
        attrs: Option<&[InfoAttr]>,
    ) -> Result<std::vec::IntoIter<Info>> {
        Ok(self.info_where_owner(owners, attrs).await?.into_iter())
    }

    /// Invoke `handler` once per job, in query order.
    async fn info_all_for_each(
        &self,
        attrs: Option<&[InfoAttr]>,
        handler: &mut (dyn FnMut(Info) + Send),
    ) -> Result<()> {
        for info in self.info_all(attrs).await? {
            handler(info);
        }
        Ok(())
    }

    /// Invoke `handler` once per job belonging to one of `owners`.
    async fn info_where_owner_for_each(
        &self,
        owners: &[&str],
        attrs: Option<&[InfoAttr]>,
        handler: &mut (dyn FnMut(Info) + Send),
    ) -> Result<()> {
        for info in self.info_where_owner(owners, attrs).await? {
            handler(info);
        }
        Ok(())
    }

    /// Whether the backend reports job-array task detail. Backends that
    /// cannot report it override this to `false`.
    fn supports_job_arrays(&self) -> bool {
        true
    }

    /// Characters this scheduler rejects in job names. A dash is legal in
    /// every scheduler's job names and is never part of this set.
    fn job_name_illegal_chars(&self) -> &str {
        ""
    }

    /// Replace every illegal character in `job_name` with a dash.
    fn sanitize_job_name(&self, job_name: &str) -> String {
        job_name
            .chars()
            .map(|c| {
                if c != '-' && self.job_name_illegal_chars().contains(c) {
                    '-'
                } else {
                    c
                }
            })
            .collect()
    }
}
