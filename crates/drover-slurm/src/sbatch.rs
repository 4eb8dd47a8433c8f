//! Submission arguments and response parsing for `sbatch`.

use drover_core::{Error, JobDependencies, Result, Script};
use drover_parsers::time::seconds_to_duration;
use std::collections::BTreeMap;

/// Build the `sbatch` argument vector and environment for a script.
pub fn submit_args(
    script: &Script,
    dependencies: &JobDependencies,
) -> Result<(Vec<String>, BTreeMap<String, String>)> {
    let mut args: Vec<String> = Vec::new();
    let mut push = |parts: &[&str]| args.extend(parts.iter().map(|s| s.to_string()));

    if script.submit_as_hold == Some(true) {
        push(&["-H"]);
    }
    match script.rerunnable {
        Some(true) => push(&["--requeue"]),
        Some(false) => push(&["--no-requeue"]),
        None => {}
    }
    if let Some(dir) = &script.workdir {
        push(&["-D", dir.as_str()]);
    }
    if !script.email.is_empty() {
        push(&["--mail-user", &script.email.join(",")]);
    }
    match (script.email_on_started, script.email_on_terminated) {
        (Some(true), Some(true)) => push(&["--mail-type", "ALL"]),
        (Some(true), _) => push(&["--mail-type", "BEGIN"]),
        (_, Some(true)) => push(&["--mail-type", "END"]),
        (Some(false), Some(false)) => push(&["--mail-type", "NONE"]),
        _ => {}
    }
    if let Some(name) = &script.job_name {
        push(&["-J", name]);
    }
    if let Some(path) = &script.input_path {
        push(&["-i", path.as_str()]);
    }
    if let Some(path) = &script.output_path {
        push(&["-o", path.as_str()]);
    }
    if let Some(path) = &script.error_path {
        push(&["-e", path.as_str()]);
    }
    if let Some(id) = &script.reservation_id {
        push(&["--reservation", id]);
    }
    if let Some(queue) = &script.queue_name {
        push(&["-p", queue]);
    }
    if let Some(qos) = &script.qos {
        push(&["--qos", qos]);
    }
    if let Some(gpus) = script.gpus_per_node {
        push(&["--gpus-per-node", &gpus.to_string()]);
    }
    if let Some(priority) = script.priority {
        push(&["--priority", &priority.to_string()]);
    }
    if let Some(start) = script.start_time {
        push(&["--begin", &start.format("%Y-%m-%dT%H:%M:%S").to_string()]);
    }
    if let Some(account) = &script.accounting_id {
        push(&["-A", account]);
    }
    if let Some(limit) = script.wall_time {
        push(&["-t", &seconds_to_duration(limit)]);
    }
    if let Some(request) = &script.job_array_request {
        push(&["-a", request]);
    }

    let mut depend = Vec::new();
    for (ids, kind) in [
        (&dependencies.after, "after"),
        (&dependencies.afterok, "afterok"),
        (&dependencies.afternotok, "afternotok"),
        (&dependencies.afterany, "afterany"),
    ] {
        if !ids.is_empty() {
            depend.push(format!("{kind}:{}", ids.join(":")));
        }
    }
    if !depend.is_empty() {
        push(&["-d", &depend.join(",")]);
    }

    let env = script.job_environment.clone().unwrap_or_default();
    push(&["--export", &export_arg(&env, script.copy_environment == Some(true))]);

    args.extend(script.native.iter().cloned());
    Ok((args, env))
}

/// The value for `--export`.
///
/// Slurm defaults to exporting the caller's whole environment; the other
/// schedulers here start jobs from a fresh login environment. Defaulting to
/// NONE keeps submissions portable across adapters, and `copy_environment`
/// opts back into Slurm's native behavior.
fn export_arg(env: &BTreeMap<String, String>, copy: bool) -> String {
    let keys: Vec<&str> = env.keys().map(String::as_str).collect();
    match (keys.is_empty(), copy) {
        (false, false) => keys.join(","),
        (false, true) => format!("ALL,{}", keys.join(",")),
        (true, true) => "ALL".to_string(),
        (true, false) => "NONE".to_string(),
    }
}

/// Extract the job id from `sbatch --parsable` output, which is the id
/// optionally followed by `;cluster`.
pub fn parse_sbatch_output(response: &str) -> Result<String> {
    response
        .trim()
        .split(';')
        .next()
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .ok_or_else(|| {
            Error::UnexpectedFormat(format!("unrecognized sbatch response: {}", response.trim()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_script_defaults_to_export_none() {
        let (args, env) = submit_args(&Script::new("true"), &JobDependencies::default()).unwrap();
        assert_eq!(args, vec!["--export", "NONE"]);
        assert!(env.is_empty());
    }

    #[test]
    fn test_dependencies_join_into_one_flag() {
        let deps = JobDependencies {
            after: vec!["100".into()],
            afterok: vec!["101".into(), "102".into()],
            afterany: vec!["103".into()],
            ..JobDependencies::default()
        };
        let (args, _) = submit_args(&Script::new("true"), &deps).unwrap();
        let d = args.iter().position(|a| a == "-d").unwrap();
        assert_eq!(args[d + 1], "after:100,afterok:101:102,afterany:103");
    }

    #[test]
    fn test_export_arg_combinations() {
        let env = BTreeMap::from([
            ("A".to_string(), "1".to_string()),
            ("B".to_string(), "2".to_string()),
        ]);
        assert_eq!(export_arg(&env, false), "A,B");
        assert_eq!(export_arg(&env, true), "ALL,A,B");
        assert_eq!(export_arg(&BTreeMap::new(), true), "ALL");
        assert_eq!(export_arg(&BTreeMap::new(), false), "NONE");
    }

    #[test]
    fn test_mail_type_combinations() {
        let both = Script {
            email_on_started: Some(true),
            email_on_terminated: Some(true),
            ..Script::new("true")
        };
        let (args, _) = submit_args(&both, &JobDependencies::default()).unwrap();
        let m = args.iter().position(|a| a == "--mail-type").unwrap();
        assert_eq!(args[m + 1], "ALL");

        let none = Script {
            email_on_started: Some(false),
            email_on_terminated: Some(false),
            ..Script::new("true")
        };
        let (args, _) = submit_args(&none, &JobDependencies::default()).unwrap();
        let m = args.iter().position(|a| a == "--mail-type").unwrap();
        assert_eq!(args[m + 1], "NONE");
    }

    #[test]
    fn test_array_and_qos_flags() {
        let script = Script {
            job_array_request: Some("1-100%10".into()),
            qos: Some("debug".into()),
            gpus_per_node: Some(2),
            wall_time: Some(7200),
            ..Script::new("true")
        };
        let (args, _) = submit_args(&script, &JobDependencies::default()).unwrap();
        assert!(args.windows(2).any(|w| w == ["-a", "1-100%10"]));
        assert!(args.windows(2).any(|w| w == ["--qos", "debug"]));
        assert!(args.windows(2).any(|w| w == ["--gpus-per-node", "2"]));
        assert!(args.windows(2).any(|w| w == ["-t", "02:00:00"]));
    }

    #[test]
    fn test_parse_sbatch_output() {
        assert_eq!(parse_sbatch_output("123456\n").unwrap(), "123456");
        assert_eq!(parse_sbatch_output("123456;owens\n").unwrap(), "123456");
        assert!(parse_sbatch_output("sbatch: error\n").is_err());
    }
}
