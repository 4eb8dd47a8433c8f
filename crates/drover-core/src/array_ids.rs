//! Job-array range grammar.
//!
//! Schedulers describe job arrays with compact range specs:
//!
//! ```text
//! 1          single id
//! 1-10       inclusive range
//! 1-10:2     range with step
//! 1-10,13    compound
//! 1-10%4     range with a max-concurrent throttle (parsed, ignored)
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static COMPONENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(?:-(\d+))?(?::(\d+))?(?:%\d+)?$").unwrap());

/// Expand a job-array spec into the ascending, duplicate-free list of task
/// ids it denotes.
///
/// Parsing is fail-soft: array specs are frequently absent or written in a
/// foreign dialect, and the cost of a misparse must be "no tasks reported",
/// not a failed query. Components that do not match the grammar contribute
/// nothing; a wholly malformed spec yields an empty list.
pub fn ids(spec: &str) -> Vec<u32> {
    let mut out = BTreeSet::new();

    for component in spec.split(',') {
        let Some(caps) = COMPONENT.captures(component) else {
            continue;
        };
        let Ok(start) = caps[1].parse::<u32>() else {
            continue;
        };
        let finish = match caps.get(2) {
            Some(m) => match m.as_str().parse::<u32>() {
                Ok(v) => v,
                Err(_) => continue,
            },
            None => start,
        };
        let step = match caps.get(3) {
            Some(m) => match m.as_str().parse::<u32>() {
                Ok(v) => v,
                Err(_) => continue,
            },
            None => 1,
        };
        if step == 0 {
            continue;
        }
        out.extend((start..=finish).step_by(step as usize));
    }

    out.into_iter().collect()
}
