//! The declarative data document consumed by the solver.
//!
//! Sets are lists of synthetic labels (a tag followed by a 1-based index).
//! Parameters are scalars, lists indexed by one set, or tables indexed by a
//! row set and a column set. List indices and table headers always repeat
//! the labels of the referenced set, in declaration order.

use std::{collections::HashMap, fmt};

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DatasetError {
    #[error("set `{0}` is declared twice")]
    DuplicateSet(String),
    #[error("parameter `{param}` refers to undeclared set `{set}`")]
    UnknownSet { param: String, set: String },
    #[error("parameter `{param}` has {found} values but set `{set}` declares {expected}")]
    LengthMismatch {
        param: String,
        set: String,
        expected: usize,
        found: usize,
    },
    #[error("row {row} of parameter `{param}` has {found} values but set `{set}` declares {expected}")]
    RowMismatch {
        param: String,
        set: String,
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("parameter `{param}` holds a non-finite value")]
    NonFinite { param: String },
}

type Result<T> = std::result::Result<T, DatasetError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Comment(String),
    Set {
        name: String,
        labels: Vec<String>,
    },
    Scalar {
        name: String,
        value: f64,
    },
    List {
        name: String,
        index: Vec<String>,
        values: Vec<f64>,
    },
    Table {
        name: String,
        rows: Vec<String>,
        columns: Vec<String>,
        values: Vec<Vec<f64>>,
    },
}

/// An ordered, write-once list of dataset statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatasetDocument {
    statements: Vec<Statement>,
}

impl DatasetDocument {
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Number of labels declared for `set`, if it is declared.
    pub fn set_size(&self, set: &str) -> Option<usize> {
        self.statements.iter().find_map(|s| match s {
            Statement::Set { name, labels } if name == set => Some(labels.len()),
            _ => None,
        })
    }
}

/// Collects statements while checking them against the declared sets.
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    statements: Vec<Statement>,
    sets: HashMap<String, Vec<String>>,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comment(&mut self, text: &str) {
        self.statements.push(Statement::Comment(text.to_string()));
    }

    /// Declares `name` as `tag1 .. tag<size>`.
    pub fn set(&mut self, name: &str, tag: &str, size: usize) -> Result<()> {
        if self.sets.contains_key(name) {
            return Err(DatasetError::DuplicateSet(name.to_string()));
        }
        let labels = labels(tag, size);
        self.sets.insert(name.to_string(), labels.clone());
        self.statements.push(Statement::Set { name: name.to_string(), labels });
        Ok(())
    }

    pub fn scalar(&mut self, name: &str, value: f64) -> Result<()> {
        ensure_finite(name, std::iter::once(value))?;
        self.statements.push(Statement::Scalar { name: name.to_string(), value });
        Ok(())
    }

    pub fn list(&mut self, name: &str, set: &str, values: &[f64]) -> Result<()> {
        let index = self.labels_of(name, set)?;
        if index.len() != values.len() {
            return Err(DatasetError::LengthMismatch {
                param: name.to_string(),
                set: set.to_string(),
                expected: index.len(),
                found: values.len(),
            });
        }
        ensure_finite(name, values.iter().copied())?;
        self.statements.push(Statement::List {
            name: name.to_string(),
            index,
            values: values.to_vec(),
        });
        Ok(())
    }

    pub fn table(&mut self, name: &str, row_set: &str, column_set: &str, values: &[Vec<f64>]) -> Result<()> {
        let rows = self.labels_of(name, row_set)?;
        let columns = self.labels_of(name, column_set)?;
        if rows.len() != values.len() {
            return Err(DatasetError::LengthMismatch {
                param: name.to_string(),
                set: row_set.to_string(),
                expected: rows.len(),
                found: values.len(),
            });
        }
        for (r, row) in values.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DatasetError::RowMismatch {
                    param: name.to_string(),
                    set: column_set.to_string(),
                    row: r + 1,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
            ensure_finite(name, row.iter().copied())?;
        }
        self.statements.push(Statement::Table {
            name: name.to_string(),
            rows,
            columns,
            values: values.to_vec(),
        });
        Ok(())
    }

    pub fn build(self) -> DatasetDocument {
        DatasetDocument { statements: self.statements }
    }

    fn labels_of(&self, param: &str, set: &str) -> Result<Vec<String>> {
        self.sets.get(set).cloned().ok_or_else(|| DatasetError::UnknownSet {
            param: param.to_string(),
            set: set.to_string(),
        })
    }
}

pub fn labels(tag: &str, size: usize) -> Vec<String> {
    (1..=size).map(|i| format!("{tag}{i}")).collect()
}

/// Whole numbers render without a fractional part, anything else keeps
/// its shortest exact representation.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

fn ensure_finite(param: &str, mut values: impl Iterator<Item = f64>) -> Result<()> {
    if values.any(|v| !v.is_finite()) {
        return Err(DatasetError::NonFinite { param: param.to_string() });
    }
    Ok(())
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Comment(text) => writeln!(f, "# {text}"),
            Statement::Set { name, labels } => writeln!(f, "set {} := {};", name, labels.join(" ")),
            Statement::Scalar { name, value } => writeln!(f, "param {} := {};", name, format_number(*value)),
            Statement::List { name, index, values } => {
                if index.is_empty() {
                    return writeln!(f, "param {name} := ;");
                }
                writeln!(f, "param {name} :=")?;
                for (label, value) in index.iter().zip(values) {
                    writeln!(f, "{} {}", label, format_number(*value))?;
                }
                writeln!(f, ";")
            }
            Statement::Table { name, rows, columns, values } => {
                if rows.is_empty() || columns.is_empty() {
                    return writeln!(f, "param {name} := ;");
                }
                writeln!(f, "param {} : {} :=", name, columns.join(" "))?;
                for (label, row) in rows.iter().zip(values) {
                    let row = row.iter().map(|v| format_number(*v)).collect::<Vec<_>>();
                    writeln!(f, "{} {}", label, row.join(" "))?;
                }
                writeln!(f, ";")
            }
        }
    }
}

impl fmt::Display for DatasetDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut previous: Option<&Statement> = None;
        for statement in &self.statements {
            // set declarations stay together, every other statement gets its own paragraph
            let continues_group = matches!(
                (previous, statement),
                (Some(Statement::Set { .. }), Statement::Set { .. }) | (None, _) | (Some(Statement::Comment(_)), _)
            );
            if !continues_group {
                writeln!(f)?;
            }
            write!(f, "{statement}")?;
            previous = Some(statement);
        }
        Ok(())
    }
}
