//! Submission arguments for PBS Professional's `qsub`.

use drover_core::{JobDependencies, Result, Script};
use drover_parsers::time::seconds_to_duration;

/// Build the `qsub` argument vector for a script. The script body goes to
/// qsub on stdin, so positional script arguments cannot be expressed.
///
/// PBS can express all four dependency kinds through `-W depend=`.
pub fn submit_args(script: &Script, dependencies: &JobDependencies) -> Result<Vec<String>> {
    let mut args: Vec<String> = Vec::new();
    let mut push = |parts: &[&str]| args.extend(parts.iter().map(|s| s.to_string()));

    if script.submit_as_hold == Some(true) {
        push(&["-h"]);
    }
    match script.rerunnable {
        Some(true) => push(&["-r", "y"]),
        Some(false) => push(&["-r", "n"]),
        None => {}
    }
    if !script.email.is_empty() {
        push(&["-M", &script.email.join(",")]);
    }
    match (script.email_on_started, script.email_on_terminated) {
        (Some(true), Some(true)) => push(&["-m", "be"]),
        (Some(true), _) => push(&["-m", "b"]),
        (_, Some(true)) => push(&["-m", "e"]),
        _ => {}
    }
    if let Some(name) = &script.job_name {
        push(&["-N", name]);
    }
    if let Some(path) = &script.shell_path {
        push(&["-S", path.as_str()]);
    }
    // there is no input-path equivalent in PBS Pro
    if let Some(path) = &script.output_path {
        push(&["-o", path.as_str()]);
    }
    if let Some(path) = &script.error_path {
        push(&["-e", path.as_str()]);
    }
    // reservations are addressed as queues
    if let (Some(id), None) = (&script.reservation_id, &script.queue_name) {
        push(&["-q", id]);
    }
    if let Some(queue) = &script.queue_name {
        push(&["-q", queue]);
    }
    if let Some(priority) = script.priority {
        push(&["-p", &priority.to_string()]);
    }
    if let Some(start) = script.start_time {
        push(&["-a", &start.format("%Y%m%d%H%M.%S").to_string()]);
    }
    if let Some(account) = &script.accounting_id {
        push(&["-A", account]);
    }
    if let Some(limit) = script.wall_time {
        push(&["-l", &format!("walltime={}", seconds_to_duration(limit))]);
    }
    if let Some(request) = &script.job_array_request {
        push(&["-J", request]);
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
        push(&["-W", &format!("depend={}", depend.join(","))]);
    }

    if let Some(env) = &script.job_environment {
        if !env.is_empty() {
            let pairs: Vec<String> = env.iter().map(|(k, v)| format!("{k}={v}")).collect();
            push(&["-v", &pairs.join(",")]);
        }
    }
    if script.copy_environment == Some(true) {
        push(&["-V"]);
    }

    // with no error path, join stdout and stderr, which is what the other
    // schedulers do by default
    if script.error_path.is_none() {
        push(&["-j", "oe"]);
    }

    args.extend(script.native.iter().cloned());
    Ok(args)
}
