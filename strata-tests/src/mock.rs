use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};
use strata::{
    ColumnType, Connection, Driver, Error, QueryResult, Result, Row, RowShape, RowsAffected,
    Statement, Value,
    stream::{self, Stream},
};

/// Answer of the mock to the statements containing a pattern.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Rows(Vec<Row>),
    Affected(u64),
    Fail(String),
}

impl MockResponse {
    /// One row with one column.
    pub fn scalar(name: &str, value: impl Into<Value>) -> Self {
        Self::Rows(vec![mock_row(&[name], vec![value.into()])])
    }
}

/// Row with a shape derived from its values, `Text` for the NULL ones.
pub fn mock_row(names: &[&str], values: Vec<Value>) -> Row {
    let types: Vec<ColumnType> = values
        .iter()
        .map(|v| v.column_type().unwrap_or(ColumnType::Text))
        .collect();
    let names: Vec<String> = names.iter().map(ToString::to_string).collect();
    Row::new(Arc::new(RowShape::new(names, types)), values.into_boxed_slice())
}

/// What every connection of a [`MockDriver`] saw and what it answers.
#[derive(Default, Debug)]
pub struct MockState {
    statements: Mutex<Vec<Statement>>,
    responses: Mutex<Vec<(String, MockResponse)>>,
    pub connects: AtomicUsize,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
}

impl MockState {
    /// Answer `response` to the statements containing `pattern` (ignoring case). The rule
    /// added last wins, statements matching nothing affect one row.
    pub fn on(&self, pattern: &str, response: MockResponse) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((pattern.to_lowercase(), response));
    }

    pub fn clear_responses(&self) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Statements received so far, in order.
    pub fn statements(&self) -> Vec<Statement> {
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Text of the statements received so far.
    pub fn sql(&self) -> Vec<String> {
        self.statements().into_iter().map(|v| v.sql).collect()
    }

    pub fn clear_statements(&self) {
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn respond(&self, statement: Statement) -> Vec<Result<QueryResult>> {
        let sql = statement.sql.to_lowercase();
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(statement);
        let response = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or(MockResponse::Affected(1));
        match response {
            MockResponse::Rows(rows) => rows.into_iter().map(|v| Ok(v.into())).collect(),
            MockResponse::Affected(rows_affected) => vec![Ok(RowsAffected {
                rows_affected,
                last_affected_id: None,
            }
            .into())],
            MockResponse::Fail(message) => vec![Err(Error::msg(message))],
        }
    }
}

/// Driver answering from a script, used to check the engine without a database.
///
/// Connecting to an url containing `unreachable` fails.
#[derive(Default, Debug, Clone)]
pub struct MockDriver {
    pub state: Arc<MockState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Driver for MockDriver {
    type Connection = MockConnection;

    const NAME: &'static str = "mock";

    async fn connect(&self, url: &str) -> Result<MockConnection> {
        if url.contains("unreachable") {
            return Err(Error::msg(format!("Cannot reach `{}`", url)));
        }
        self.state.connects.fetch_add(1, Ordering::Relaxed);
        Ok(MockConnection {
            state: self.state.clone(),
            open: true,
        })
    }
}

#[derive(Debug)]
pub struct MockConnection {
    state: Arc<MockState>,
    open: bool,
}

impl MockConnection {
    /// Simulates a connection dropped by the server.
    pub fn disconnect(&mut self) {
        self.open = false;
    }
}

impl Connection for MockConnection {
    fn is_open(&self) -> bool {
        self.open
    }

    async fn open(&mut self) -> Result<()> {
        self.state.opens.fetch_add(1, Ordering::Relaxed);
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.state.closes.fetch_add(1, Ordering::Relaxed);
        self.open = false;
        Ok(())
    }

    fn run(&mut self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send {
        let results = if self.open {
            self.state.respond(statement)
        } else {
            vec![Err(Error::msg("The mock connection is closed"))]
        };
        stream::iter(results)
    }
}
