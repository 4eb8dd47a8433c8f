//! Generic parsing of columnar scheduler output (header line + one row per
//! job).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("columnar output in different format than expected: {0}")]
    Header(String),
    #[error("columnar row shorter than header: {0}")]
    Row(String),
}

/// The fixed shape a scheduler's columnar listing is expected to have.
pub struct TableSchema {
    /// Column names that must all be present in the header. Extra trailing
    /// columns some scheduler versions append are tolerated; a missing
    /// expected column fails the parse, since positional parsing would
    /// silently misattribute every cell otherwise.
    pub columns: &'static [&'static str],

    /// The one column whose value may itself contain whitespace (e.g. a job
    /// name derived from a submitted command line). Rows with excess fields
    /// collapse the excess back into this column.
    pub free_text: &'static str,

    /// Lines that mean "no jobs", which is an empty result and not a parse
    /// failure.
    pub empty_sentinels: &'static [&'static str],
}

/// A parsed columnar listing. Cells hold `None` where the scheduler printed
/// its "absent" placeholder (`-`).
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    fn empty() -> Self {
        Self {
            header: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.header.iter().position(|c| c == column)
    }

    /// Cell value of `column` within `row`.
    pub fn cell<'a>(&self, row: &'a [Option<String>], column: &str) -> Option<&'a str> {
        self.index_of(column)
            .and_then(|idx| row.get(idx))
            .and_then(|cell| cell.as_deref())
    }
}

/// Parse columnar text against `schema`.
///
/// The job-name reconstruction for rows with excess fields is a heuristic:
/// it assumes exactly one column contains free text, so a value whose
/// leading or trailing whitespace was meaningful cannot be recovered
/// exactly. This matches what the schedulers themselves print.
pub fn parse(schema: &TableSchema, raw: &str) -> Result<Table, TableError> {
    let mut lines = raw.lines().filter(|l| !l.trim().is_empty());

    let Some(first) = lines.next() else {
        return Ok(Table::empty());
    };
    let first = first.trim();
    if schema
        .empty_sentinels
        .iter()
        .any(|sentinel| first.starts_with(sentinel))
    {
        return Ok(Table::empty());
    }

    let header: Vec<String> = first.split_whitespace().map(str::to_string).collect();
    if let Some(missing) = schema.columns.iter().find(|c| !header.contains(&c.to_string())) {
        return Err(TableError::Header(format!(
            "missing column {missing} in {header:?}"
        )));
    }
    let free_text_idx = header
        .iter()
        .position(|c| c == schema.free_text)
        .expect("free-text column is part of the expected vocabulary");

    let mut rows = Vec::new();
    for line in lines {
        let mut values: Vec<String> = line.split_whitespace().map(str::to_string).collect();

        if values.len() > header.len() {
            // one field value has spaces and was erroneously split; collapse
            // the excess back into the free-text column
            let excess = values.len() - header.len();
            let collapsed: String =
                values[free_text_idx..=free_text_idx + excess].join(" ");
            values.splice(free_text_idx..=free_text_idx + excess, [collapsed]);
        }
        if values.len() < header.len() {
            return Err(TableError::Row(line.to_string()));
        }

        rows.push(
            values
                .into_iter()
                .map(|v| if v == "-" { None } else { Some(v) })
                .collect(),
        );
    }

    Ok(Table { header, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: TableSchema = TableSchema {
        columns: &["JOBID", "USER", "STAT", "JOB_NAME", "SUBMIT_TIME"],
        free_text: "JOB_NAME",
        empty_sentinels: &["No job found", "No unfinished job found"],
    };

    #[test]
    fn test_empty_input() {
        let table = parse(&SCHEMA, "").unwrap();
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_no_jobs_sentinel_is_empty_result() {
        let table = parse(&SCHEMA, "No job found\n").unwrap();
        assert!(table.rows.is_empty());
        let table = parse(&SCHEMA, "No unfinished job found\n").unwrap();
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_missing_column_fails() {
        let raw = "JOBID   USER    STAT\n1  alice  RUN\n";
        assert!(matches!(parse(&SCHEMA, raw), Err(TableError::Header(_))));
    }

    #[test]
    fn test_extra_trailing_column_is_tolerated() {
        let raw = "\
JOBID USER STAT JOB_NAME SUBMIT_TIME SLOTS
7 alice RUN solver 03/31-14:46:42 4
";
        let table = parse(&SCHEMA, raw).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.cell(&table.rows[0], "SLOTS"), Some("4"));
    }

    #[test]
    fn test_dash_cells_are_absent() {
        let raw = "\
JOBID USER STAT JOB_NAME SUBMIT_TIME
7 alice PEND solver -
";
        let table = parse(&SCHEMA, raw).unwrap();
        assert_eq!(table.cell(&table.rows[0], "SUBMIT_TIME"), None);
        assert_eq!(table.cell(&table.rows[0], "STAT"), Some("PEND"));
    }

    #[test]
    fn test_free_text_field_with_spaces_is_collapsed() {
        let raw = "\
JOBID USER STAT JOB_NAME SUBMIT_TIME
7 alice RUN my spaced out name 03/31-14:46:42
";
        let table = parse(&SCHEMA, raw).unwrap();
        assert_eq!(
            table.cell(&table.rows[0], "JOB_NAME"),
            Some("my spaced out name")
        );
        assert_eq!(
            table.cell(&table.rows[0], "SUBMIT_TIME"),
            Some("03/31-14:46:42")
        );
    }

    #[test]
    fn test_short_row_fails() {
        let raw = "\
JOBID USER STAT JOB_NAME SUBMIT_TIME
7 alice RUN
";
        assert!(matches!(parse(&SCHEMA, raw), Err(TableError::Row(_))));
    }
}
