use crate::{
    DataError, QueryResult, Result, Row, RowsAffected, Statement, Value,
    stream::{Stream, StreamExt, TryStreamExt},
};
use std::future::Future;

/// A live connection to a database, as lent by the pool to a session.
pub trait Connection: Send + Sized + 'static {
    fn is_open(&self) -> bool;

    /// Re-establish a connection previously closed.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// General method to send any statement and return any result type (either row or count).
    /// The text may contain multiple `;` separated statements.
    fn run(&mut self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send;

    /// Execute the statement and returns the rows.
    fn fetch(&mut self, statement: Statement) -> impl Stream<Item = Result<Row>> + Send {
        self.run(statement).filter_map(|v| async move {
            match v {
                Ok(QueryResult::Row(v)) => Some(Ok(v)),
                Err(e) => Some(Err(e)),
                _ => None,
            }
        })
    }

    /// Execute the statement and return the total number of rows affected.
    fn execute(&mut self, statement: Statement) -> impl Future<Output = Result<RowsAffected>> + Send {
        self.run(statement)
            .filter_map(|v| async move {
                match v {
                    Ok(QueryResult::Affected(v)) => Some(Ok(v)),
                    Err(e) => Some(Err(e)),
                    _ => None,
                }
            })
            .try_collect()
    }

    /// Native bulk copy of `rows` into `table`. Drivers without one refuse.
    fn bulk_load(
        &mut self,
        table: &str,
        columns: &[String],
        rows: Vec<Box<[Value]>>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        let _ = (columns, rows);
        let table = table.to_string();
        async move { Err(DataError::UnsupportedOperation(format!("Bulk load into `{}`", table)).raise()) }
    }
}
