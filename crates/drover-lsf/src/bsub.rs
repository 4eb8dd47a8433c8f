//! Submission arguments and response parsing for `bsub`.

use drover_core::{Error, JobDependencies, Result, Script};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Build the `bsub` argument vector and environment for a script. The
/// script body itself goes to bsub on stdin.
///
/// This adapter has no translation for job dependencies, so any requested
/// dependency is rejected up front instead of being silently dropped.
pub fn submit_args(
    script: &Script,
    dependencies: &JobDependencies,
) -> Result<(Vec<String>, BTreeMap<String, String>)> {
    if !dependencies.is_empty() {
        return Err(Error::Backend(
            "the LSF adapter does not support job dependencies".to_string(),
        ));
    }

    let mut args: Vec<String> = Vec::new();
    let mut push = |parts: &[&str]| args.extend(parts.iter().map(|s| s.to_string()));

    if let Some(account) = &script.accounting_id {
        push(&["-P", account]);
    }
    if let Some(dir) = &script.workdir {
        push(&["-cwd", dir.as_str()]);
    }
    if let Some(name) = &script.job_name {
        push(&["-J", name]);
    }
    if let Some(queue) = &script.queue_name {
        push(&["-q", queue]);
    }
    if let Some(id) = &script.reservation_id {
        push(&["-U", id]);
    }
    if let Some(priority) = script.priority {
        push(&["-sp", &priority.to_string()]);
    }
    if script.submit_as_hold == Some(true) {
        push(&["-H"]);
    }
    match script.rerunnable {
        Some(true) => push(&["-r"]),
        Some(false) => push(&["-rn"]),
        None => {}
    }
    if let Some(start) = script.start_time {
        push(&["-b", &start.format("%Y:%m:%d:%H:%M").to_string()]);
    }
    if let Some(limit) = script.wall_time {
        // bsub takes its run limit in minutes
        push(&["-W", &(limit / 60).to_string()]);
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
    if let Some(path) = &script.shell_path {
        push(&["-L", path.as_str()]);
    }
    if script.email_on_started == Some(true) {
        push(&["-B"]);
    }
    if script.email_on_terminated == Some(true) {
        push(&["-N"]);
    }
    if !script.email.is_empty() {
        push(&["-u", &script.email.join(",")]);
    }

    args.extend(script.native.iter().cloned());

    let env = script.job_environment.clone().unwrap_or_default();
    Ok((args, env))
}

/// Extract the job id from bsub's response,
/// e.g. `Job <542935> is submitted to queue <short>.`
pub fn parse_bsub_output(response: &str) -> Result<String> {
    static SUBMITTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"Job <([^>]+)> ").unwrap());

    SUBMITTED
        .captures(response)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| {
            Error::UnexpectedFormat(format!("unrecognized bsub response: {}", response.trim()))
        })
}
