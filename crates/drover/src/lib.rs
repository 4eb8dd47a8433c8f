//! One canonical job model over Grid Engine, LSF, Slurm, and PBS.
//!
//! Submit, query, hold, release, and delete compute jobs against any
//! supported batch scheduler through the [`Adapter`] trait. Backends
//! translate their native status feeds into the canonical [`Info`] /
//! [`Status`] model, so callers never parse scheduler output themselves.
//!
//! ```no_run
//! use drover::{factory, Adapter, JobDependencies, Script};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = factory::AdapterConfig {
//!     adapter: "slurm".to_string(),
//!     options: [("cluster".to_string(), "owens".to_string())].into(),
//! };
//! let adapter = factory::build(&config)?;
//!
//! let script = Script {
//!     job_name: Some("solver".to_string()),
//!     ..Script::new("#!/bin/bash\nsleep 60\n")
//! };
//! let id = adapter.submit(&script, JobDependencies::default()).await?;
//! let info = adapter.info(&id).await?;
//! println!("{} is {}", info.id, info.status);
//! # Ok(())
//! # }
//! ```

pub mod factory;

pub use drover_core::array_ids;
pub use drover_core::{
    AccountInfo, Adapter, Error, Info, InfoAttr, JobDependencies, NodeInfo, QueueInfo, Result,
    Script, Status, Task,
};
pub use drover_lsf::LsfAdapter;
pub use drover_pbs::PbsAdapter;
pub use drover_sge::SgeAdapter;
pub use drover_slurm::SlurmAdapter;
