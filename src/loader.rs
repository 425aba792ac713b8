//! Reading and validating line-oriented instance files.
//!
//! Blank lines are dropped. The first remaining line carries the integer
//! size header, the following lines carry numeric rows in the delimiter of
//! the variant. A row of zero declared fields is blank and therefore has no
//! line of its own. Validation runs structural checks first (line and field
//! counts), then domain checks (range, integrality), then relational checks
//! (symmetry, binarity), and nothing partial is returned on failure.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use log::debug;
use thiserror::Error;

use crate::instance::{Delimiter, ProblemInstance, VariantKind};

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("cannot read instance file `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("instance file is empty")]
    Empty,
    #[error("line {line}: size header must hold {expected} integers ({names}), found {found}")]
    HeaderArity {
        line: usize,
        expected: usize,
        found: usize,
        names: String,
    },
    #[error("line {line}: size `{name}` must be a non-negative integer, got `{value}`")]
    BadSize {
        line: usize,
        name: &'static str,
        value: String,
    },
    #[error("{what}: expected {expected} rows, the file ends after {found}")]
    MissingRows {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: row {row} of {what} has {found} values, expected {expected}")]
    RowLength {
        line: usize,
        what: &'static str,
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: row {row} of {what} holds a non-numeric value `{value}` in column {column}")]
    NotNumeric {
        line: usize,
        what: &'static str,
        row: usize,
        column: usize,
        value: String,
    },
    #[error("line {line}: {count} unexpected trailing line(s)")]
    TrailingLines { line: usize, count: usize },
    #[error("{what}[{row},{column}] = {value} is negative")]
    Negative {
        what: &'static str,
        row: usize,
        column: usize,
        value: f64,
    },
    #[error("{what}[{row},{column}] = {value} must be a whole number")]
    NotIntegral {
        what: &'static str,
        row: usize,
        column: usize,
        value: f64,
    },
    #[error("{what}[{row},{column}] = {value} must be binary (0/1)")]
    NotBinary {
        what: &'static str,
        row: usize,
        column: usize,
        value: f64,
    },
    #[error("{what} is not symmetric at ({row},{column}): {value} != {mirrored}")]
    Asymmetric {
        what: &'static str,
        row: usize,
        column: usize,
        value: f64,
        mirrored: f64,
    },
}

type Result<T> = std::result::Result<T, ValidationError>;

/// Loads and validates the instance file at `path`.
pub fn load(path: &Path, kind: VariantKind) -> Result<ProblemInstance> {
    let text = fs::read_to_string(path).map_err(|source| ValidationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let instance = kind.parse(&text)?;
    debug!("loaded {} instance from {}: sizes {:?}", kind, path.display(), instance.sizes());
    Ok(instance)
}

/// Cursor over the non-blank lines of an instance file.
#[derive(Debug)]
pub struct InstanceReader<'a> {
    /// (1-based line number in the file, trimmed content)
    lines: Vec<(usize, &'a str)>,
    cursor: usize,
    delimiter: Delimiter,
}

impl<'a> InstanceReader<'a> {
    pub fn new(text: &'a str, delimiter: Delimiter) -> Result<Self> {
        let lines = text
            .lines()
            .enumerate()
            .map(|(ix, l)| (ix + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty())
            .collect::<Vec<_>>();
        if lines.is_empty() {
            return Err(ValidationError::Empty);
        }
        Ok(InstanceReader { lines, cursor: 0, delimiter })
    }

    /// Reads the whitespace separated size header.
    pub fn header(&mut self, names: &'static [&'static str]) -> Result<Vec<usize>> {
        let (line, content) = self.next_line().ok_or(ValidationError::Empty)?;
        let fields = content.split_whitespace().collect::<Vec<_>>();
        if fields.len() != names.len() {
            return Err(ValidationError::HeaderArity {
                line,
                expected: names.len(),
                found: fields.len(),
                names: names.join(" "),
            });
        }
        fields
            .iter()
            .zip(names)
            .map(|(value, &name)| {
                value.parse::<usize>().map_err(|_| ValidationError::BadSize {
                    line,
                    name,
                    value: value.to_string(),
                })
            })
            .collect()
    }

    /// Reads a `rows` x `cols` block of numbers.
    pub fn matrix(&mut self, what: &'static str, rows: usize, cols: usize) -> Result<Vec<Vec<f64>>> {
        (0..rows).map(|r| self.row(what, r, cols)).collect()
    }

    /// Reads one row of exactly `cols` numbers; `row` is 0-based.
    pub fn row(&mut self, what: &'static str, row: usize, cols: usize) -> Result<Vec<f64>> {
        if cols == 0 {
            return Ok(vec![]);
        }
        let (line, content) = self.next_line().ok_or(ValidationError::MissingRows {
            what,
            expected: row + 1,
            found: row,
        })?;
        let fields = self.delimiter.split(content);
        if fields.len() != cols {
            return Err(ValidationError::RowLength {
                line,
                what,
                row: row + 1,
                expected: cols,
                found: fields.len(),
            });
        }
        fields
            .iter()
            .enumerate()
            .map(|(c, value)| match value.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(ValidationError::NotNumeric {
                    line,
                    what,
                    row: row + 1,
                    column: c + 1,
                    value: value.to_string(),
                }),
            })
            .collect()
    }

    /// Fails when lines remain after the declared content.
    pub fn finish(self) -> Result<()> {
        match self.lines.get(self.cursor) {
            Some(&(line, _)) => Err(ValidationError::TrailingLines {
                line,
                count: self.lines.len() - self.cursor,
            }),
            None => Ok(()),
        }
    }

    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        let next = self.lines.get(self.cursor).copied();
        if next.is_some() {
            self.cursor += 1;
        }
        next
    }
}

pub(crate) fn ensure_non_negative(what: &'static str, matrix: &[Vec<f64>]) -> Result<()> {
    for_each_cell(matrix, |row, column, value| {
        if value < 0.0 {
            return Err(ValidationError::Negative { what, row, column, value });
        }
        Ok(())
    })
}

pub(crate) fn ensure_integral(what: &'static str, matrix: &[Vec<f64>]) -> Result<()> {
    for_each_cell(matrix, |row, column, value| {
        if value.fract() != 0.0 {
            return Err(ValidationError::NotIntegral { what, row, column, value });
        }
        Ok(())
    })
}

pub(crate) fn ensure_binary(what: &'static str, matrix: &[Vec<f64>]) -> Result<()> {
    for_each_cell(matrix, |row, column, value| {
        if value != 0.0 && value != 1.0 {
            return Err(ValidationError::NotBinary { what, row, column, value });
        }
        Ok(())
    })
}

/// Expects a square matrix; dimensions are checked structurally beforehand.
pub(crate) fn ensure_symmetric(what: &'static str, matrix: &[Vec<f64>]) -> Result<()> {
    for i in 0..matrix.len() {
        for j in (i + 1)..matrix.len() {
            if matrix[i][j] != matrix[j][i] {
                return Err(ValidationError::Asymmetric {
                    what,
                    row: i + 1,
                    column: j + 1,
                    value: matrix[i][j],
                    mirrored: matrix[j][i],
                });
            }
        }
    }
    Ok(())
}

fn for_each_cell<F>(matrix: &[Vec<f64>], mut check: F) -> Result<()>
where
    F: FnMut(usize, usize, f64) -> Result<()>,
{
    for (r, row) in matrix.iter().enumerate() {
        for (c, value) in row.iter().copied().enumerate() {
            check(r + 1, c + 1, value)?;
        }
    }
    Ok(())
}
