//! Canonical job model and adapter contract for batch schedulers.
//!
//! Every scheduler backend (Grid Engine, LSF, Slurm, PBS Pro) translates its
//! native output into the types in this crate and exposes its operations
//! through the [`Adapter`] trait. Callers only ever see canonical values or
//! a typed [`Error`].

pub mod accounting;
pub mod adapter;
pub mod array_ids;
pub mod error;
pub mod info;
pub mod script;
pub mod status;

pub use accounting::{AccountInfo, QueueInfo};
pub use adapter::{Adapter, InfoAttr, JobDependencies};
pub use error::{Error, Result};
pub use info::{Info, NodeInfo, Task};
pub use script::Script;
pub use status::Status;
