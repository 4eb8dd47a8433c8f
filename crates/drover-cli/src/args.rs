//! CLI argument parsing for drover.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "drover")]
#[command(about = "Submit and query batch jobs across schedulers")]
pub struct Args {
    /// Scheduler to talk to
    #[arg(long, value_enum)]
    pub scheduler: Scheduler,

    /// Directory holding the scheduler's client binaries
    #[arg(long)]
    pub bin: Option<Utf8PathBuf>,

    /// Cluster to address, for multi-cluster installations
    #[arg(long)]
    pub cluster: Option<String>,

    /// Batch server host (PBS)
    #[arg(long)]
    pub host: Option<String>,

    /// Host to run scheduler commands on over ssh
    #[arg(long)]
    pub submit_host: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Scheduler {
    Sge,
    Lsf,
    Slurm,
    Pbs,
}

impl Scheduler {
    pub fn token(self) -> &'static str {
        match self {
            Scheduler::Sge => "sge",
            Scheduler::Lsf => "lsf",
            Scheduler::Slurm => "slurm",
            Scheduler::Pbs => "pbs",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit a job script (use "-" to read it from stdin)
    Submit {
        script: Utf8PathBuf,

        /// Job name
        #[arg(long)]
        name: Option<String>,

        /// Queue to submit into
        #[arg(long)]
        queue: Option<String>,

        /// Wall time limit in seconds
        #[arg(long)]
        wall_time: Option<u64>,

        /// Account to charge
        #[arg(long)]
        account: Option<String>,

        /// Job-array request, e.g. 1-10
        #[arg(long)]
        array: Option<String>,

        /// Submit held
        #[arg(long)]
        hold: bool,

        /// Only start after these jobs finished successfully
        #[arg(long)]
        afterok: Vec<String>,
    },

    /// Show one job
    Info { id: String },

    /// Show every job the scheduler knows about
    InfoAll {
        /// Only jobs belonging to this owner
        #[arg(long)]
        owner: Option<String>,
    },

    /// Show one job's state
    Status { id: String },

    /// Hold a job
    Hold { id: String },

    /// Release a held job
    Release { id: String },

    /// Delete a job
    Delete { id: String },
}
