//! drover - submit and query batch jobs across schedulers.

mod args;

use args::{Args, Command};
use clap::Parser;
use drover::{factory, Adapter, Info, JobDependencies, Script};
use miette::{miette, IntoDiagnostic, Result};
use std::collections::BTreeMap;
use std::io::Read;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut options = BTreeMap::new();
    let mut set = |key: &str, value: &Option<String>| {
        if let Some(value) = value {
            options.insert(key.to_string(), value.clone());
        }
    };
    set("cluster", &args.cluster);
    set("host", &args.host);
    set("submit_host", &args.submit_host);
    set("bin", &args.bin.as_ref().map(|b| b.to_string()));
    // PBS takes its install root rather than a bin directory
    set("exec", &args.bin.as_ref().map(|b| b.to_string()));

    let config = factory::AdapterConfig {
        adapter: args.scheduler.token().to_string(),
        options,
    };
    let adapter = factory::build(&config).map_err(|e| miette!("{e}"))?;

    match args.command {
        Command::Submit {
            script,
            name,
            queue,
            wall_time,
            account,
            array,
            hold,
            afterok,
        } => {
            let content = if script == "-" {
                let mut body = String::new();
                std::io::stdin()
                    .read_to_string(&mut body)
                    .into_diagnostic()?;
                body
            } else {
                std::fs::read_to_string(&script).into_diagnostic()?
            };

            let script = Script {
                job_name: name,
                queue_name: queue,
                wall_time,
                accounting_id: account,
                job_array_request: array,
                submit_as_hold: hold.then_some(true),
                ..Script::new(content)
            };
            let dependencies = JobDependencies {
                afterok,
                ..JobDependencies::default()
            };

            let id = adapter
                .submit(&script, dependencies)
                .await
                .map_err(|e| miette!("{e}"))?;
            println!("{id}");
        }

        Command::Info { id } => {
            let info = adapter.info(&id).await.map_err(|e| miette!("{e}"))?;
            print_infos(&[info])?;
        }

        Command::InfoAll { owner } => {
            let infos = match owner {
                Some(owner) => adapter
                    .info_where_owner(&[owner.as_str()], None)
                    .await
                    .map_err(|e| miette!("{e}"))?,
                None => adapter.info_all(None).await.map_err(|e| miette!("{e}"))?,
            };
            print_infos(&infos)?;
        }

        Command::Status { id } => {
            let status = adapter.status(&id).await.map_err(|e| miette!("{e}"))?;
            println!("{status}");
        }

        Command::Hold { id } => adapter.hold(&id).await.map_err(|e| miette!("{e}"))?,
        Command::Release { id } => adapter.release(&id).await.map_err(|e| miette!("{e}"))?,
        Command::Delete { id } => adapter.delete(&id).await.map_err(|e| miette!("{e}"))?,
    }

    Ok(())
}

fn print_infos(infos: &[Info]) -> Result<()> {
    let rendered = serde_json::to_string_pretty(infos).into_diagnostic()?;
    println!("{rendered}");
    Ok(())
}
