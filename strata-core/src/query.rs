use crate::{AsValue, ColumnType, Value, truncate_long};
use std::{
    fmt::{self, Display},
    sync::Arc,
};

/// Named parameter, `name` includes the dialect prefix (`@ID`, `:ID`).
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
}

/// SQL text plus the parameters bound to it, handed to [`crate::Connection::run`].
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub parameters: Vec<Parameter>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }
    pub fn with_parameters(sql: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            sql: sql.into(),
            parameters,
        }
    }
    /// Append a named parameter.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.parameters.push(Parameter {
            name: name.into(),
            value: value.into(),
        });
        self
    }
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|v| v.name == name)
            .map(|v| &v.value)
    }
    /// Drop all the bound values.
    pub fn clear_bindings(&mut self) {
        self.parameters.clear();
    }
}

impl From<&str> for Statement {
    fn from(value: &str) -> Self {
        Statement::new(value)
    }
}

impl From<String> for Statement {
    fn from(value: String) -> Self {
        Statement::new(value)
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.sql))
    }
}

/// Metadata about modify operations (INSERT/UPDATE/DELETE).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    /// Total number of rows impacted.
    pub rows_affected: u64,
    /// Backend-specific last inserted identifier when available.
    pub last_affected_id: Option<i64>,
}

/// Ordered column names and native types of a result set. Two results with the same shape
/// are populated by the same compiled marshaller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowShape {
    pub names: Box<[String]>,
    pub types: Box<[ColumnType]>,
}

impl RowShape {
    pub fn new(names: impl Into<Box<[String]>>, types: impl Into<Box<[ColumnType]>>) -> Self {
        Self {
            names: names.into(),
            types: types.into(),
        }
    }
    pub fn len(&self) -> usize {
        self.names.len()
    }
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
    /// Index of the column, ignoring ASCII case.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|v| v.eq_ignore_ascii_case(name))
    }
}

/// A result row with the shape it was produced with.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub shape: Arc<RowShape>,
    pub values: Box<[Value]>,
}

impl Row {
    pub fn new(shape: Arc<RowShape>, values: Box<[Value]>) -> Self {
        Self { shape, values }
    }
    pub fn names(&self) -> &[String] {
        &self.shape.names
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.shape.position(name).map(|i| &self.values[i])
    }
    /// Convert the column named `name` through the coercion rules of `T`.
    pub fn get<T: AsValue>(&self, name: &str) -> crate::Result<T> {
        let value = self.get_column(name).cloned().ok_or_else(|| {
            crate::Error::msg(format!("The row does not have a column named `{}`", name))
        })?;
        T::try_from_value(value)
    }
}

/// Heterogeneous items emitted by `Connection::run` combining rows and modify results.
#[derive(Debug)]
pub enum QueryResult {
    Row(Row),
    Affected(RowsAffected),
}

impl Extend<RowsAffected> for RowsAffected {
    fn extend<T: IntoIterator<Item = RowsAffected>>(&mut self, iter: T) {
        for elem in iter {
            self.rows_affected += elem.rows_affected;
            if elem.last_affected_id.is_some() {
                self.last_affected_id = elem.last_affected_id;
            }
        }
    }
}

impl From<Row> for QueryResult {
    fn from(value: Row) -> Self {
        QueryResult::Row(value)
    }
}

impl From<RowsAffected> for QueryResult {
    fn from(value: RowsAffected) -> Self {
        QueryResult::Affected(value)
    }
}
