//! Translation of line-oriented `qstat -f -t` records.
//!
//! Output is one `Job Id: <id>` banner per job followed by indented
//! `attribute = value` lines; long values are folded onto continuation
//! lines starting with a tab.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use drover_core::NodeInfo;
use std::collections::BTreeMap;

/// One job from the full-format listing.
#[derive(Debug, Clone, Default)]
pub struct QstatRecord {
    pub id: String,
    /// Every `attribute = value` pair, keyed by the attribute's full dotted
    /// name (`Resource_List.walltime`).
    pub attrs: BTreeMap<String, String>,
}

impl QstatRecord {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

/// Parse `qstat -f -t` output into one record per subjob.
///
/// The parent entry of a job array (its id carries `[]`) duplicates what
/// its subjobs report and is dropped.
pub fn parse_qstat(raw: &str) -> Vec<QstatRecord> {
    // unfold continuation lines before going line-by-line
    let unfolded = raw.replace("\n\t", "");

    let mut records: Vec<QstatRecord> = Vec::new();
    for line in unfolded.lines().map(str::trim) {
        if let Some(id) = line.strip_prefix("Job Id:") {
            records.push(QstatRecord {
                id: id.trim().to_string(),
                attrs: BTreeMap::new(),
            });
        } else if let (Some(record), Some((key, value))) =
            (records.last_mut(), line.split_once(" = "))
        {
            record
                .attrs
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    records.retain(|r| !r.id.contains("[]"));
    records
}

/// Expand a PBS exec-host string (`"i5n14/2*7+i5n15/0"`) into nodes. The
/// value after `*` is the proc count on that host, defaulting to one.
pub fn parse_nodes(exec_host: &str) -> Vec<NodeInfo> {
    exec_host
        .split('+')
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            let (name, procs_list) = chunk.split_once('/').unwrap_or((chunk, ""));
            let procs = procs_list
                .split_once('*')
                .and_then(|(_, count)| count.parse().ok())
                .unwrap_or(1);
            NodeInfo {
                procs: Some(procs),
                ..NodeInfo::new(name)
            }
        })
        .collect()
}

/// Parse the `Thu Mar 09 14:26:17 2017` timestamps qstat prints for ctime
/// and stime.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s.trim(), "%a %b %d %H:%M:%S %Y")
        .ok()
        .and_then(|dt| Utc.from_local_datetime(&dt).single())
}
