//! Submission arguments and response parsing for `qsub`.

use drover_core::{Error, JobDependencies, Result, Script};
use drover_parsers::time::seconds_to_duration;
use once_cell::sync::Lazy;
use regex::Regex;

/// Build the `qsub` argument vector for a script.
///
/// Grid Engine can only express dependencies on job completion, so every
/// other requested dependency kind is rejected up front instead of being
/// silently dropped.
pub fn submit_args(script: &Script, dependencies: &JobDependencies) -> Result<Vec<String>> {
    reject_unsupported_dependencies(dependencies)?;

    let mut args: Vec<String> = Vec::new();
    let mut push = |parts: &[&str]| args.extend(parts.iter().map(|s| s.to_string()));

    if script.submit_as_hold == Some(true) {
        push(&["-h"]);
    }
    if script.rerunnable == Some(true) {
        push(&["-r", "yes"]);
    }
    if let Some(env) = &script.job_environment {
        for (key, value) in env {
            push(&["-v", &format!("{key}={value}")]);
        }
    }
    if let Some(dir) = &script.workdir {
        push(&["-wd", dir.as_str()]);
    }

    let mut mail_events = String::new();
    if script.email_on_started == Some(true) {
        mail_events.push('b');
    }
    if script.email_on_terminated == Some(true) {
        mail_events.push_str("ea");
    }
    if let (Some(address), false) = (script.email.first(), mail_events.is_empty()) {
        push(&["-M", address, "-m", &mail_events]);
    }

    if !dependencies.afterok.is_empty() {
        push(&["-hold_jid_ad", &dependencies.afterok.join(",")]);
    }

    if let Some(name) = &script.job_name {
        push(&["-N", name]);
    }
    if let Some(path) = &script.error_path {
        push(&["-e", path.as_str()]);
    }
    if let Some(path) = &script.output_path {
        push(&["-o", path.as_str()]);
    }
    if let Some(path) = &script.shell_path {
        push(&["-S", path.as_str()]);
    }
    if let Some(id) = &script.reservation_id {
        push(&["-ar", id]);
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
    if let Some(limit) = script.wall_time {
        push(&["-l", &format!("h_rt={}", seconds_to_duration(limit))]);
    }
    if let Some(account) = &script.accounting_id {
        push(&["-P", account]);
    }
    if let Some(request) = &script.job_array_request {
        push(&["-t", request]);
    }
    if script.copy_environment == Some(true) {
        push(&["-V"]);
    }

    args.extend(script.native.iter().cloned());
    Ok(args)
}

fn reject_unsupported_dependencies(dependencies: &JobDependencies) -> Result<()> {
    let unsupported = [
        (&dependencies.after, "after"),
        (&dependencies.afternotok, "afternotok"),
        (&dependencies.afterany, "afterany"),
    ];
    for (ids, kind) in unsupported {
        if !ids.is_empty() {
            return Err(Error::Backend(format!(
                "grid engine only supports dependencies on successful completion; \
                 cannot express `{kind}`"
            )));
        }
    }
    Ok(())
}

/// Extract the job id from qsub's response,
/// e.g. `Your job 1043 ("job_16") has been submitted`.
pub fn parse_job_id(response: &str) -> Result<String> {
    static SUBMITTED: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"[Yy]our job(?:-array)? (\d+)").unwrap());

    SUBMITTED
        .captures(response)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| {
            Error::UnexpectedFormat(format!("unrecognized qsub response: {}", response.trim()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;
    use std::collections::BTreeMap;

    #[test]
    fn test_minimal_script_yields_no_args() {
        let args = submit_args(&Script::new("true"), &JobDependencies::default()).unwrap();
        assert!(args.is_empty());
    }

    #[test]
    fn test_full_script_arg_order() {
        let script = Script {
            submit_as_hold: Some(true),
            rerunnable: Some(true),
            job_environment: Some(BTreeMap::from([(
                "TMPDIR".to_string(),
                "/scratch".to_string(),
            )])),
            workdir: Some("/home/vagrant".into()),
            email: vec!["efranz@osc.edu".into()],
            email_on_started: Some(true),
            email_on_terminated: Some(true),
            job_name: Some("solver".into()),
            error_path: Some("/tmp/err".into()),
            output_path: Some("/tmp/out".into()),
            queue_name: Some("general.q".into()),
            priority: Some(-100),
            start_time: Some(Utc.with_ymd_and_hms(2018, 10, 9, 18, 47, 0).unwrap()),
            wall_time: Some(3600),
            accounting_id: Some("project_a".into()),
            job_array_request: Some("1-4:2".into()),
            copy_environment: Some(true),
            native: vec!["-pe".into(), "smp 8".into()],
            ..Script::new("true")
        };

        let args = submit_args(&script, &JobDependencies::default()).unwrap();
        assert_eq!(
            args,
            vec![
                "-h",
                "-r",
                "yes",
                "-v",
                "TMPDIR=/scratch",
                "-wd",
                "/home/vagrant",
                "-M",
                "efranz@osc.edu",
                "-m",
                "bea",
                "-N",
                "solver",
                "-e",
                "/tmp/err",
                "-o",
                "/tmp/out",
                "-q",
                "general.q",
                "-p",
                "-100",
                "-a",
                "201810091847.00",
                "-l",
                "h_rt=01:00:00",
                "-P",
                "project_a",
                "-t",
                "1-4:2",
                "-V",
                "-pe",
                "smp 8",
            ]
        );
    }

    #[test]
    fn test_afterok_becomes_hold_jid() {
        let deps = JobDependencies {
            afterok: vec!["1043".into(), "1044".into()],
            ..JobDependencies::default()
        };
        let args = submit_args(&Script::new("true"), &deps).unwrap();
        assert_eq!(args, vec!["-hold_jid_ad", "1043,1044"]);
    }

    #[test]
    fn test_unsupported_dependency_kinds_are_rejected() {
        for deps in [
            JobDependencies {
                after: vec!["1".into()],
                ..JobDependencies::default()
            },
            JobDependencies {
                afternotok: vec!["1".into()],
                ..JobDependencies::default()
            },
            JobDependencies {
                afterany: vec!["1".into()],
                ..JobDependencies::default()
            },
        ] {
            let err = submit_args(&Script::new("true"), &deps).unwrap_err();
            assert!(matches!(err, Error::Backend(_)));
        }
    }

    #[test]
    fn test_parse_job_id() {
        assert_eq!(
            parse_job_id("Your job 1043 (\"job_16\") has been submitted\n").unwrap(),
            "1043"
        );
        assert_eq!(
            parse_job_id("Your job-array 1044.1-4:1 (\"array\") has been submitted\n").unwrap(),
            "1044"
        );
        assert!(parse_job_id("qsub: would have submitted\n").is_err());
    }
}
