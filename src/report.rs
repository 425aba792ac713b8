//! Extraction of typed results from the solver's free-form report.
//!
//! Nothing in the report is trusted to be well formed: a missing marker
//! leaves its field empty and an unreadable assignment line is skipped.
//! All marker and keyword rules live in the tables below, so a new report
//! dialect is handled by adding entries.

use std::{collections::BTreeMap, fmt};

use log::trace;
use serde::Serialize;

use crate::instance::AssignmentShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    Unknown,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolveStatus::Optimal => "OPTIMAL",
            SolveStatus::Infeasible => "INFEASIBLE",
            SolveStatus::Unbounded => "UNBOUNDED",
            SolveStatus::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Keywords matched case-insensitively as whole words, first match wins.
/// The negative verdicts come first so that a relaxation reported as
/// optimal does not hide an integer problem without feasible solution,
/// and the inconclusive ones come before `OPTIMAL` so that `NON-OPTIMAL`
/// never reads as optimal.
const STATUS_RULES: &[(&str, SolveStatus)] = &[
    ("NO PRIMAL FEASIBLE SOLUTION", SolveStatus::Infeasible),
    ("NO INTEGER FEASIBLE SOLUTION", SolveStatus::Infeasible),
    ("INTEGER EMPTY", SolveStatus::Infeasible),
    ("INFEASIBLE", SolveStatus::Infeasible),
    ("NO DUAL FEASIBLE SOLUTION", SolveStatus::Unbounded),
    ("UNBOUNDED", SolveStatus::Unbounded),
    ("NON-OPTIMAL", SolveStatus::Unknown),
    ("UNDEFINED", SolveStatus::Unknown),
    ("FEASIBLE", SolveStatus::Unknown),
    ("OPTIMAL", SolveStatus::Optimal),
];

const STATUS_MARKER: &str = "STATUS:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Objective,
    Rows,
    Columns,
}

#[derive(Debug, Clone, Copy)]
enum Extract {
    /// The number after the first `=` following the marker, or right
    /// after the marker when there is no `=`
    NumberAfterEquals,
    /// The first whole number after the marker
    Integer,
}

struct MarkerRule {
    marker: &'static str,
    field: Field,
    extract: Extract,
}

const MARKER_RULES: &[MarkerRule] = &[
    MarkerRule { marker: "Objective:", field: Field::Objective, extract: Extract::NumberAfterEquals },
    MarkerRule { marker: "Rows:", field: Field::Rows, extract: Extract::Integer },
    MarkerRule { marker: "Number of rows:", field: Field::Rows, extract: Extract::Integer },
    MarkerRule { marker: "Columns:", field: Field::Columns, extract: Extract::Integer },
    MarkerRule { marker: "Number of columns:", field: Field::Columns, extract: Extract::Integer },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntityLabel {
    pub tag: &'static str,
    /// 1-based, as written in the dataset
    pub index: usize,
}

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.tag, self.index)
    }
}

/// One primary entity paired with the entities it was assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub entity: EntityLabel,
    pub partners: Vec<EntityLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedReport {
    pub status: SolveStatus,
    pub objective: Option<f64>,
    /// Constraint count, from the `Rows:` marker
    pub constraints: Option<usize>,
    /// Variable count, from the `Columns:` marker
    pub variables: Option<usize>,
    /// Sorted by primary entity; empty unless the status is optimal
    pub assignments: Vec<Assignment>,
}

impl ParsedReport {
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Human readable result block.
    pub fn summary(&self, shape: &AssignmentShape) -> String {
        let mut out = String::from("===== RESULTS =====\n");
        if !self.is_optimal() {
            out.push_str(&format!("No optimal solution (status {}).\n", self.status));
            out.push_str("===================\n");
            return out;
        }
        out.push_str(&format!(
            "Optimal objective: {}, Variables: {}, Constraints: {}\n\n",
            or_na(self.objective),
            or_na(self.variables),
            or_na(self.constraints),
        ));
        if self.assignments.is_empty() {
            out.push_str(&format!("No assignments with {} = 1 were found.\n", shape.variable));
        }
        for assignment in &self.assignments {
            let mut line = format!("{} {}", role(shape, 0), assignment.entity);
            for (i, partner) in assignment.partners.iter().enumerate() {
                let joint = if i == 0 { "->" } else { "at" };
                line.push_str(&format!(" {} {} {}", joint, role(shape, i + 1), partner));
            }
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("===================\n");
        out
    }
}

fn role(shape: &AssignmentShape, position: usize) -> &'static str {
    shape.roles.get(position).copied().unwrap_or("Entity")
}

fn or_na<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

/// Parses the solver report, with the captured stdout `log` as fallback.
///
/// The status comes from the report when it names one, otherwise from the
/// log. Markers are looked up in the report first, then in the log.
/// Assignments are only extracted for an optimal status, from the report
/// or, when there is no report, from the log.
pub fn parse_report(report: Option<&str>, log: &str, shape: &AssignmentShape) -> ParsedReport {
    let status = report
        .and_then(find_status)
        .or_else(|| find_status(log))
        .unwrap_or(SolveStatus::Unknown);

    let lookup = |field| report.and_then(|r| find_field(r, field)).or_else(|| find_field(log, field));
    let objective = lookup(Field::Objective);
    let constraints = lookup(Field::Rows).map(|v| v as usize);
    let variables = lookup(Field::Columns).map(|v| v as usize);

    let assignments = if status == SolveStatus::Optimal {
        extract_assignments(report.unwrap_or(log), shape)
    } else {
        trace!("status {status}: assignments are not extracted");
        vec![]
    };

    ParsedReport { status, objective, constraints, variables, assignments }
}

/// The verdict of the first `Status:` line, which is final even when it
/// names no known keyword. Without such a line the whole text is searched.
pub fn find_status(text: &str) -> Option<SolveStatus> {
    let declared = text.lines().find_map(|line| {
        let upper = line.to_ascii_uppercase();
        let at = upper.find(STATUS_MARKER)?;
        let verdict = &upper[at + STATUS_MARKER.len()..];
        Some(classify(verdict).unwrap_or_else(|| {
            trace!("unrecognized status line: {line}");
            SolveStatus::Unknown
        }))
    });
    declared.or_else(|| classify(&text.to_ascii_uppercase()))
}

fn classify(upper: &str) -> Option<SolveStatus> {
    STATUS_RULES
        .iter()
        .find(|(keyword, _)| contains_word(upper, keyword))
        .map(|&(_, status)| status)
}

/// Whether `word` occurs in `text` not glued to letters, digits, `-` or `_`.
fn contains_word(text: &str, word: &str) -> bool {
    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'-' || b == b'_';
    let bytes = text.as_bytes();
    text.match_indices(word).any(|(at, _)| {
        let end = at + word.len();
        (at == 0 || !is_word(bytes[at - 1])) && (end == bytes.len() || !is_word(bytes[end]))
    })
}

fn find_field(text: &str, field: Field) -> Option<f64> {
    for rule in MARKER_RULES.iter().filter(|r| r.field == field) {
        for line in text.lines() {
            let Some(at) = line.find(rule.marker) else {
                continue;
            };
            let rest = &line[at + rule.marker.len()..];
            match extract(rest, rule.extract) {
                Some(value) => return Some(value),
                None => trace!("marker `{}` without a readable value: {line}", rule.marker),
            }
        }
    }
    None
}

fn extract(rest: &str, how: Extract) -> Option<f64> {
    match how {
        Extract::NumberAfterEquals => {
            let rest = rest.split_once('=').map_or(rest, |(_, after)| after);
            leading_number(rest)?.parse::<f64>().ok()
        }
        Extract::Integer => {
            let token = rest.split_whitespace().next()?;
            token.parse::<u64>().ok().map(|v| v as f64)
        }
    }
}

fn leading_number(text: &str) -> Option<&str> {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')))
        .unwrap_or(text.len());
    (end > 0).then(|| &text[..end])
}

/// Whether `value` is 1.0 up to `tolerance`, plus one ulp of slack for
/// values printed at exactly the tolerance.
pub fn is_assigned(value: f64, tolerance: f64) -> bool {
    (value - 1.0).abs() <= tolerance + f64::EPSILON
}

/// Scans `text` for tokens shaped like `x[A1,S2,T3]` and keeps those whose
/// value is 1. The value is the first number after the token on its line,
/// or on the following line when the solver wrapped a long name there. A
/// later occurrence of the same primary entity replaces an earlier one.
pub fn extract_assignments(text: &str, shape: &AssignmentShape) -> Vec<Assignment> {
    let lines = text
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>())
        .collect::<Vec<_>>();
    let mut by_entity = BTreeMap::new();

    for (l, tokens) in lines.iter().enumerate() {
        for (ix, token) in tokens.iter().enumerate() {
            let Some(labels) = parse_variable(token, shape) else {
                continue;
            };
            let value = first_number(&tokens[ix + 1..]).or_else(|| {
                lines
                    .get(l + 1)
                    .filter(|next| !next.iter().any(|t| t.contains('[')))
                    .and_then(|next| first_number(next))
            });
            match value {
                Some(v) if is_assigned(v, shape.tolerance) => {
                    let (entity, partners) = (labels[0], labels[1..].to_vec());
                    if by_entity.insert(entity, partners).is_some() {
                        trace!("{entity} assigned again by {token}");
                    }
                }
                Some(_) => {}
                None => trace!("no value for {token}"),
            }
        }
    }

    by_entity
        .into_iter()
        .map(|(entity, partners)| Assignment { entity, partners })
        .collect()
}

fn first_number(tokens: &[&str]) -> Option<f64> {
    tokens
        .iter()
        .take_while(|t| !t.contains('['))
        .find_map(|t| t.parse::<f64>().ok())
}

fn parse_variable(token: &str, shape: &AssignmentShape) -> Option<Vec<EntityLabel>> {
    let (name, rest) = token.split_once('[')?;
    if !name.eq_ignore_ascii_case(shape.variable) {
        return None;
    }
    let inner = rest.strip_suffix(']')?;
    let parts = inner.split(',').map(str::trim).collect::<Vec<_>>();
    if parts.len() != shape.tags.len() {
        trace!("{token} does not have {} indices", shape.tags.len());
        return None;
    }
    parts
        .iter()
        .zip(shape.tags)
        .map(|(part, &tag)| {
            let index = part.strip_prefix(tag)?.parse::<usize>().ok()?;
            (index > 0).then_some(EntityLabel { tag, index })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::instance::{ScheduleInstance, SlotsInstance, Variant, WorkshopInstance};

    const SCHEDULE: AssignmentShape = ScheduleInstance::SHAPE;
    const WORKSHOP: AssignmentShape = WorkshopInstance::SHAPE;

    const OPTIMAL_REPORT: &str = "\
Problem:    p2
Rows:       10
Columns:    7 (7 integer, 7 binary)
Non-zeros:  28
Status:     INTEGER OPTIMAL
Objective:  z = 42.5 (MINimum)

   No.   Row name        Activity     Lower bound   Upper bound
------ ------------    ------------- ------------- -------------
     1 z                         42.5
     2 one_slot[A1]                 1             1             =

   No. Column name       Activity     Lower bound   Upper bound
------ ------------    ------------- ------------- -------------
     1 x[A1,S1,T1]  *              0             0             1
     2 x[A1,S2,T1]  *              1             0             1
     3 x[A2,S1,T2]  *       0.999999             0             1
     4 x[A3,S2,T1]  *            0.5             0             1
     5 x[A4,S3,T10]
                    *              1             0             1

Integer feasibility conditions:
End of output
";

    #[test]
    fn test_counts_and_objective() {
        let report = parse_report(Some("Objective: z = 42.5\nRows: 10\nColumns: 7\nOPTIMAL\n"), "", &SCHEDULE);
        assert_eq!(report.objective, Some(42.5));
        assert_eq!(report.constraints, Some(10));
        assert_eq!(report.variables, Some(7));
    }

    #[test]
    fn test_full_report() {
        let report = parse_report(Some(OPTIMAL_REPORT), "", &SCHEDULE);
        assert_eq!(report.status, SolveStatus::Optimal);
        assert_eq!(report.objective, Some(42.5));
        assert_eq!(report.constraints, Some(10));
        assert_eq!(report.variables, Some(7));

        let label = |tag, index| EntityLabel { tag, index };
        assert_eq!(
            report.assignments,
            vec![
                Assignment { entity: label("A", 1), partners: vec![label("S", 2), label("T", 1)] },
                Assignment { entity: label("A", 2), partners: vec![label("S", 1), label("T", 2)] },
                Assignment { entity: label("A", 4), partners: vec![label("S", 3), label("T", 10)] },
            ]
        );
    }

    #[test]
    fn test_tolerance() {
        assert!(is_assigned(0.999999, SCHEDULE.tolerance));
        assert!(is_assigned(1.0000001, SCHEDULE.tolerance));
        assert!(!is_assigned(0.5, SCHEDULE.tolerance));
        assert!(!is_assigned(0.0, SCHEDULE.tolerance));
        assert!(!is_assigned(0.99999, SCHEDULE.tolerance));
        // the workshop model is solved to 1e-8, so 0.999999 is not assigned there
        assert!(!is_assigned(0.999999, WORKSHOP.tolerance));
    }

    #[test]
    fn test_later_occurrence_wins() {
        let text = "1 x[A1,S1,T1] * 1 0 1\n2 x[A1,S3,T2] * 1 0 1\n";
        let assignments = extract_assignments(text, &SCHEDULE);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].partners[0].index, 3);
        assert_eq!(assignments[0].partners[1].index, 2);
    }

    #[test]
    fn test_no_optimal_keyword_skips_assignments() {
        let report = "Rows: 3\nColumns: 2\nStatus: INTEGER UNDEFINED\n1 x[T1,A1] * 1 0 1\n";
        let parsed = parse_report(Some(report), "glpsol: model processed", &WORKSHOP);
        assert_eq!(parsed.status, SolveStatus::Unknown);
        assert!(!parsed.is_optimal());
        assert!(parsed.assignments.is_empty());
        assert_eq!(parsed.constraints, Some(3));
    }

    #[test]
    fn test_infeasible_and_unbounded() {
        let log = "OPTIMAL LP SOLUTION FOUND\nPROBLEM HAS NO INTEGER FEASIBLE SOLUTION\n";
        assert_eq!(parse_report(None, log, &WORKSHOP).status, SolveStatus::Infeasible);
        let log = "PROBLEM HAS NO PRIMAL FEASIBLE SOLUTION";
        assert_eq!(parse_report(Some(""), log, &WORKSHOP).status, SolveStatus::Infeasible);
        let log = "LP HAS NO DUAL FEASIBLE SOLUTION";
        assert_eq!(parse_report(Some(""), log, &WORKSHOP).status, SolveStatus::Unbounded);
    }

    #[test]
    fn test_non_optimal_integer_status() {
        let report = "Rows:       3\n\
                      Columns:    2 (2 integer, 2 binary)\n\
                      Status:     INTEGER NON-OPTIMAL\n\
                      Objective:  z = 9 (MINimum)\n\
                      \n\
                      1 x[T1,A1] * 1 0 1\n";
        let log = "TIME LIMIT EXCEEDED; SEARCH TERMINATED\nOPTIMAL LP SOLUTION FOUND\n";
        let parsed = parse_report(Some(report), log, &WORKSHOP);
        assert_eq!(parsed.status, SolveStatus::Unknown);
        assert!(parsed.assignments.is_empty());
        assert_eq!(parsed.objective, Some(9.0));

        let parsed = parse_report(Some("Status: INTEGER FEASIBLE\n1 x[T1,A1] * 1 0 1\n"), "", &WORKSHOP);
        assert_eq!(parsed.status, SolveStatus::Unknown);
        assert!(parsed.assignments.is_empty());
    }

    #[test]
    fn test_optimality_conditions_header_is_not_a_status() {
        let report = "Rows:       2\n\
                      Columns:    2\n\
                      Status:     UNDEFINED\n\
                      Objective:  z = 0 (MINimum)\n\
                      \n\
                      1 x[T1,A1] B 1 0 1\n\
                      \n\
                      Karush-Kuhn-Tucker optimality conditions:\n";
        let parsed = parse_report(Some(report), "", &WORKSHOP);
        assert_eq!(parsed.status, SolveStatus::Unknown);
        assert!(parsed.assignments.is_empty());

        assert_eq!(find_status("Karush-Kuhn-Tucker optimality conditions:\n"), None);
        assert_eq!(find_status("INTEGER OPTIMAL SOLUTION FOUND"), Some(SolveStatus::Optimal));
    }

    #[test]
    fn test_status_line_comes_first() {
        let text = "PROBLEM HAS NO PRIMAL FEASIBLE SOLUTION\nStatus: OPTIMAL\n";
        assert_eq!(find_status(text), Some(SolveStatus::Optimal));
        assert_eq!(find_status("status: integer empty"), Some(SolveStatus::Infeasible));
    }

    #[test]
    fn test_report_status_takes_precedence() {
        let parsed = parse_report(Some("Status: optimal\n"), "PROBLEM HAS NO PRIMAL FEASIBLE SOLUTION", &WORKSHOP);
        assert_eq!(parsed.status, SolveStatus::Optimal);
    }

    #[test]
    fn test_missing_markers_are_empty() {
        let parsed = parse_report(Some("OPTIMAL\n"), "", &WORKSHOP);
        assert_eq!(parsed.objective, None);
        assert_eq!(parsed.constraints, None);
        assert_eq!(parsed.variables, None);
        assert!(parsed.assignments.is_empty());

        let parsed = parse_report(Some("Objective: z = oops\nRows: many\nOPTIMAL"), "", &WORKSHOP);
        assert_eq!(parsed.objective, None);
        assert_eq!(parsed.constraints, None);
    }

    #[test]
    fn test_log_fallback_for_markers() {
        let log = "Number of rows: 4\nNumber of columns: 6\nObjective: obj = -1.5e2\nOPTIMAL";
        let parsed = parse_report(None, log, &WORKSHOP);
        assert_eq!(parsed.constraints, Some(4));
        assert_eq!(parsed.variables, Some(6));
        assert_eq!(parsed.objective, Some(-150.0));
    }

    #[test]
    fn test_malformed_variables_are_skipped() {
        let text = "x[T1,A1 * 1\nx[T0,A1] * 1\nx[T1] * 1\ny[T2,A2] * 1\nX[T3,B1] * 1\nX[T4,A4] * 1\n";
        let assignments = extract_assignments(text, &WORKSHOP);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].entity, EntityLabel { tag: "T", index: 4 });
    }

    #[test]
    fn test_value_does_not_leak_from_next_variable() {
        let text = "1 x[A1,S1]\n2 x[A2,S1] * 1 0 1\n";
        let assignments = extract_assignments(text, &SlotsInstance::SHAPE);
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].entity.index, 2);
    }

    #[test]
    fn test_summary() {
        let parsed = parse_report(Some(OPTIMAL_REPORT), "", &SCHEDULE);
        let summary = parsed.summary(&SCHEDULE);
        assert!(summary.contains("Optimal objective: 42.5, Variables: 7, Constraints: 10"));
        assert!(summary.contains("Bus A1 -> Slot S2 at Workshop T1\n"));

        let parsed = parse_report(Some("INFEASIBLE"), "", &SCHEDULE);
        assert!(parsed.summary(&SCHEDULE).contains("No optimal solution (status INFEASIBLE)"));
    }
}
