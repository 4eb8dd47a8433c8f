//! Translation of `bjobs -u all -a -w -W` columnar output.

use chrono::{DateTime, Utc};
use drover_core::NodeInfo;
use drover_parsers::table::{self, Table, TableError, TableSchema};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// The column vocabulary `bjobs -w -W` has printed for every supported LSF
/// release. JOB_NAME is the one free-text column; a job submitted from a
/// piped script gets its whole command line as its name.
pub const BJOBS_SCHEMA: TableSchema = TableSchema {
    columns: &[
        "JOBID",
        "USER",
        "STAT",
        "QUEUE",
        "FROM_HOST",
        "EXEC_HOST",
        "JOB_NAME",
        "SUBMIT_TIME",
        "PROJ_NAME",
        "CPU_USED",
        "MEM",
        "SWAP",
        "PIDS",
        "START_TIME",
        "FINISH_TIME",
    ],
    free_text: "JOB_NAME",
    empty_sentinels: &["No job found", "No unfinished job found"],
};

/// One parsed bjobs row. Cells the scheduler printed as `-` are absent.
#[derive(Debug, Clone, Default)]
pub struct BjobsRow {
    pub id: String,
    pub user: Option<String>,
    pub status: Option<String>,
    pub queue: Option<String>,
    pub from_host: Option<String>,
    pub exec_host: Option<String>,
    pub name: Option<String>,
    pub submit_time: Option<String>,
    pub project: Option<String>,
    pub cpu_used: Option<String>,
    pub start_time: Option<String>,
    pub finish_time: Option<String>,
    /// Every raw cell keyed by its column name.
    pub native: BTreeMap<String, String>,
}

/// Parse bjobs output into rows. The "no jobs" sentinel yields an empty,
/// non-error result.
pub fn parse_bjobs(raw: &str) -> Result<Vec<BjobsRow>, TableError> {
    let parsed = table::parse(&BJOBS_SCHEMA, raw)?;
    Ok(parsed.rows.iter().map(|row| to_row(&parsed, row)).collect())
}

fn to_row(table: &Table, row: &[Option<String>]) -> BjobsRow {
    let cell = |col: &str| table.cell(row, col).map(str::to_string);
    let native = table
        .header
        .iter()
        .zip(row)
        .filter_map(|(col, value)| value.clone().map(|v| (col.clone(), v)))
        .collect();

    BjobsRow {
        id: cell("JOBID").unwrap_or_default(),
        user: cell("USER"),
        status: cell("STAT"),
        queue: cell("QUEUE"),
        from_host: cell("FROM_HOST"),
        exec_host: cell("EXEC_HOST"),
        name: cell("JOB_NAME"),
        submit_time: cell("SUBMIT_TIME"),
        project: cell("PROJ_NAME"),
        cpu_used: cell("CPU_USED"),
        start_time: cell("START_TIME"),
        finish_time: cell("FINISH_TIME"),
        native,
    }
}

static EXEC_HOST: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:(\d+)\*)?([^:]+)").unwrap());

/// Expand an exec-host string into nodes with aggregated slot counts:
/// `"c012"` is one slot on c012, `"4*c012:8*c013"` is four and eight, and a
/// host repeated without a multiplier (`"c012:c012"`) accumulates.
pub fn parse_exec_host(exec_host: &str) -> Vec<NodeInfo> {
    let mut nodes: Vec<NodeInfo> = Vec::new();

    for caps in EXEC_HOST.captures_iter(exec_host) {
        let slots: u32 = caps
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(1);
        let host = &caps[2];

        match nodes.iter_mut().find(|n| n.name == host) {
            Some(node) => node.procs = Some(node.procs.unwrap_or(0) + slots),
            None => nodes.push(NodeInfo {
                procs: Some(slots),
                ..NodeInfo::new(host)
            }),
        }
    }

    nodes
}

/// Convert a CPU_USED cell (`HHH:MM:SS.ss`) to whole seconds.
pub fn parse_cpu_used(cpu_used: &str) -> Option<u64> {
    static CPU_USED: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^(\d+):(\d+):(\d+)\..*$").unwrap());

    let caps = CPU_USED.captures(cpu_used)?;
    let hours: u64 = caps[1].parse().ok()?;
    let minutes: u64 = caps[2].parse().ok()?;
    let seconds: u64 = caps[3].parse().ok()?;
    Some(hours * 3600 + minutes * 60 + seconds)
}

/// Estimate a job's runtime from its start and (possibly absent) finish
/// times. Accurate unless the job was suspended along the way.
pub fn estimate_runtime(
    now: DateTime<Utc>,
    start_time: Option<DateTime<Utc>>,
    finish_time: Option<DateTime<Utc>>,
) -> Option<u64> {
    let start = start_time?;
    let end = finish_time.unwrap_or(now);
    Some((end - start).num_seconds().max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const OUTPUT: &str = "\
JOBID   USER    STAT  QUEUE      FROM_HOST   EXEC_HOST   JOB_NAME   SUBMIT_TIME  PROJ_NAME CPU_USED MEM SWAP PIDS START_TIME FINISH_TIME
542935  efranz  RUN   short      foobar02.osc.edu compute013  foo        03/31-14:46:42 default    000:00:00.00 2      32     25156 03/31-14:46:44 -
";

    #[test]
    fn test_parse_single_job() {
        let rows = parse_bjobs(OUTPUT).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, "542935");
        assert_eq!(row.user.as_deref(), Some("efranz"));
        assert_eq!(row.status.as_deref(), Some("RUN"));
        assert_eq!(row.queue.as_deref(), Some("short"));
        assert_eq!(row.from_host.as_deref(), Some("foobar02.osc.edu"));
        assert_eq!(row.exec_host.as_deref(), Some("compute013"));
        assert_eq!(row.name.as_deref(), Some("foo"));
        assert_eq!(row.submit_time.as_deref(), Some("03/31-14:46:42"));
        assert_eq!(row.project.as_deref(), Some("default"));
        assert_eq!(row.start_time.as_deref(), Some("03/31-14:46:44"));
        assert_eq!(row.finish_time, None);
        assert_eq!(row.native.get("MEM").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_no_jobs_sentinel() {
        assert!(parse_bjobs("No job found\n").unwrap().is_empty());
        assert!(parse_bjobs("No unfinished job found\n").unwrap().is_empty());
    }

    #[test]
    fn test_changed_columns_fail_loudly() {
        let raw = "JOBID   USER    STAT  QUEUE\n542935  efranz  RUN   short\n";
        assert!(parse_bjobs(raw).is_err());
    }

    #[test]
    fn test_piped_script_name_with_spaces() {
        let raw = "\
JOBID   USER    STAT  QUEUE      FROM_HOST   EXEC_HOST   JOB_NAME   SUBMIT_TIME  PROJ_NAME CPU_USED MEM SWAP PIDS START_TIME FINISH_TIME
542945  efranz  DONE  short      foobar02.osc.edu compute013  echo \"Hello world\"; sleep 30 03/31-19:24:57 default    000:00:00.03 2      32     9389 03/31-19:24:59 03/31-19:25:29
";
        let rows = parse_bjobs(raw).unwrap();
        assert_eq!(
            rows[0].name.as_deref(),
            Some("echo \"Hello world\"; sleep 30")
        );
        assert_eq!(rows[0].submit_time.as_deref(), Some("03/31-19:24:57"));
        assert_eq!(rows[0].finish_time.as_deref(), Some("03/31-19:25:29"));
    }

    #[test]
    fn test_parse_exec_host() {
        assert_eq!(
            parse_exec_host("c012"),
            vec![NodeInfo {
                procs: Some(1),
                ..NodeInfo::new("c012")
            }]
        );
        assert_eq!(
            parse_exec_host("4*c012:8*c013"),
            vec![
                NodeInfo {
                    procs: Some(4),
                    ..NodeInfo::new("c012")
                },
                NodeInfo {
                    procs: Some(8),
                    ..NodeInfo::new("c013")
                },
            ]
        );
        assert_eq!(
            parse_exec_host("c012:c012"),
            vec![NodeInfo {
                procs: Some(2),
                ..NodeInfo::new("c012")
            }]
        );
        assert!(parse_exec_host("").is_empty());
    }

    #[test]
    fn test_parse_cpu_used() {
        assert_eq!(parse_cpu_used("000:00:00.00"), Some(0));
        assert_eq!(parse_cpu_used("000:48:18.39"), Some(2898));
        assert_eq!(parse_cpu_used("1118:59:09.00"), Some(4028349));
        assert_eq!(parse_cpu_used("50769:48:00.-48"), Some(182771280));
        assert_eq!(parse_cpu_used("-"), None);
    }

    #[test]
    fn test_estimate_runtime() {
        let now = Utc.with_ymd_and_hms(2017, 4, 1, 0, 0, 0).unwrap();
        let start = Utc.with_ymd_and_hms(2017, 3, 31, 23, 0, 0).unwrap();
        let finish = Utc.with_ymd_and_hms(2017, 3, 31, 23, 30, 0).unwrap();
        assert_eq!(estimate_runtime(now, Some(start), None), Some(3600));
        assert_eq!(estimate_runtime(now, Some(start), Some(finish)), Some(1800));
        assert_eq!(estimate_runtime(now, None, None), None);
    }
}
