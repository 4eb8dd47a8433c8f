//! Translation of delimiter-separated `squeue` output.

use drover_core::{InfoAttr, NodeInfo};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Delimiter for the formatted squeue call. A semicolon rather than a pipe,
/// because the FEATURES field uses pipes.
pub const DELIMITER: char = ';';

/// One squeue output field: its record key and the `-o` format code that
/// requests it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Account,
    JobId,
    Cpus,
    Features,
    ArrayJobTaskId,
    JobName,
    TimeLimit,
    TimeUsed,
    NodeList,
    Partition,
    StartTime,
    StateCompact,
    User,
    SubmitTime,
    WorkDir,
}

impl Field {
    pub fn key(self) -> &'static str {
        match self {
            Field::Account => "account",
            Field::JobId => "job_id",
            Field::Cpus => "cpus",
            Field::Features => "features",
            Field::ArrayJobTaskId => "array_job_task_id",
            Field::JobName => "job_name",
            Field::TimeLimit => "time_limit",
            Field::TimeUsed => "time_used",
            Field::NodeList => "node_list",
            Field::Partition => "partition",
            Field::StartTime => "start_time",
            Field::StateCompact => "state_compact",
            Field::User => "user",
            Field::SubmitTime => "submit_time",
            Field::WorkDir => "work_dir",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Field::Account => "%a",
            Field::JobId => "%A",
            Field::Cpus => "%C",
            Field::Features => "%f",
            Field::ArrayJobTaskId => "%i",
            Field::JobName => "%j",
            Field::TimeLimit => "%l",
            Field::TimeUsed => "%M",
            Field::NodeList => "%N",
            Field::Partition => "%P",
            Field::StartTime => "%S",
            Field::StateCompact => "%t",
            Field::User => "%u",
            Field::SubmitTime => "%V",
            Field::WorkDir => "%Z",
        }
    }
}

pub const ALL_FIELDS: &[Field] = &[
    Field::Account,
    Field::JobId,
    Field::Cpus,
    Field::Features,
    Field::ArrayJobTaskId,
    Field::JobName,
    Field::TimeLimit,
    Field::TimeUsed,
    Field::NodeList,
    Field::Partition,
    Field::StartTime,
    Field::StateCompact,
    Field::User,
    Field::SubmitTime,
    Field::WorkDir,
];

/// The squeue fields needed to satisfy an attribute hint. `id` and `status`
/// (and the array sibling id used to match array tasks) are always
/// requested.
pub fn fields_for(attrs: Option<&[InfoAttr]>) -> Vec<Field> {
    let Some(attrs) = attrs else {
        return ALL_FIELDS.to_vec();
    };

    let mut fields = vec![Field::JobId, Field::StateCompact, Field::ArrayJobTaskId];
    let mut add = |field: Field| {
        if !fields.contains(&field) {
            fields.push(field);
        }
    };
    for attr in attrs {
        match attr {
            InfoAttr::AccountingId => add(Field::Account),
            InfoAttr::AllocatedNodes => add(Field::NodeList),
            InfoAttr::JobName => add(Field::JobName),
            InfoAttr::JobOwner => add(Field::User),
            InfoAttr::Procs => add(Field::Cpus),
            InfoAttr::QueueName => add(Field::Partition),
            InfoAttr::WallclockTime => add(Field::TimeUsed),
            InfoAttr::WallclockLimit => add(Field::TimeLimit),
            InfoAttr::SubmissionTime => add(Field::SubmitTime),
            InfoAttr::DispatchTime => add(Field::StartTime),
            InfoAttr::Native => return ALL_FIELDS.to_vec(),
            _ => {}
        }
    }
    fields
}

/// The `-o` format string requesting `fields`.
pub fn format_arg(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.code())
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string())
}

/// Parse formatted squeue output into one record per job, keyed by field
/// name.
///
/// squeue prints one header line, or two when addressing a named cluster
/// with `-M`. Rows that cannot be split into enough fields are skipped with
/// a warning rather than failing the whole listing.
pub fn parse_squeue(
    raw: &str,
    fields: &[Field],
    named_cluster: bool,
) -> Vec<BTreeMap<String, String>> {
    let header_lines = if named_cluster { 2 } else { 1 };

    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .skip(header_lines)
        .filter_map(|line| {
            let values: Vec<&str> = line.split(DELIMITER).collect();
            if values.len() < fields.len() {
                tracing::warn!(line, "skipping squeue row with missing fields");
                return None;
            }
            Some(
                fields
                    .iter()
                    .zip(values)
                    .map(|(f, v)| (f.key().to_string(), v.to_string()))
                    .collect(),
            )
        })
        .collect()
}

static NODE_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<prefix>[^\[]+)(\[(?P<range>[^\]]+)\])?$").unwrap());

/// Expand a Slurm host list (`em082`, `em[014,055-056,161]`) into nodes.
/// Zero padding in the bracket ranges is preserved.
pub fn parse_nodes(node_list: &str) -> Vec<NodeInfo> {
    let Some(caps) = NODE_LIST.captures(node_list) else {
        return Vec::new();
    };
    let prefix = &caps["prefix"];

    match caps.name("range") {
        None => vec![NodeInfo::new(prefix)],
        Some(range) => range
            .as_str()
            .split(',')
            .flat_map(|piece| match piece.split_once('-') {
                Some((start, end)) => expand_numeric(start, end),
                None => vec![piece.to_string()],
            })
            .map(|suffix| NodeInfo::new(format!("{prefix}{suffix}")))
            .collect(),
    }
}

fn expand_numeric(start: &str, end: &str) -> Vec<String> {
    let width = start.len();
    let (Ok(s), Ok(e)) = (start.parse::<u64>(), end.parse::<u64>()) else {
        return vec![format!("{start}-{end}")];
    };
    (s..=e).map(|n| format!("{n:0width$}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_for_none_requests_everything() {
        assert_eq!(fields_for(None), ALL_FIELDS.to_vec());
    }

    #[test]
    fn test_fields_for_hint_always_includes_id_and_state() {
        let fields = fields_for(Some(&[InfoAttr::QueueName]));
        assert!(fields.contains(&Field::JobId));
        assert!(fields.contains(&Field::StateCompact));
        assert!(fields.contains(&Field::Partition));
        assert!(!fields.contains(&Field::NodeList));
    }

    #[test]
    fn test_fields_for_owner() {
        let fields = fields_for(Some(&[InfoAttr::JobOwner]));
        assert!(fields.contains(&Field::User));
    }

    #[test]
    fn test_format_arg() {
        assert_eq!(
            format_arg(&[Field::JobId, Field::StateCompact]),
            "%A;%t"
        );
    }

    #[test]
    fn test_parse_squeue() {
        let fields = [Field::JobId, Field::StateCompact, Field::User];
        let raw = "\
JOBID;ST;USER
123;R;efranz
124;PD;alice
";
        let rows = parse_squeue(raw, &fields, false);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("job_id").map(String::as_str), Some("123"));
        assert_eq!(rows[0].get("state_compact").map(String::as_str), Some("R"));
        assert_eq!(rows[1].get("user").map(String::as_str), Some("alice"));
    }

    #[test]
    fn test_parse_squeue_drops_cluster_banner() {
        let fields = [Field::JobId, Field::StateCompact];
        let raw = "\
CLUSTER: owens
JOBID;ST
123;R
";
        let rows = parse_squeue(raw, &fields, true);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("job_id").map(String::as_str), Some("123"));
    }

    #[test]
    fn test_parse_squeue_skips_short_rows() {
        let fields = [Field::JobId, Field::StateCompact, Field::User];
        let raw = "JOBID;ST;USER\n123;R\n124;PD;alice\n";
        let rows = parse_squeue(raw, &fields, false);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("job_id").map(String::as_str), Some("124"));
    }

    #[test]
    fn test_parse_nodes_single() {
        assert_eq!(parse_nodes("em082"), vec![NodeInfo::new("em082")]);
        assert!(parse_nodes("").is_empty());
    }

    #[test]
    fn test_parse_nodes_bracketed() {
        let names: Vec<String> = parse_nodes("em[014,055-056,161]")
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["em014", "em055", "em056", "em161"]);
    }
}
