use crate::{
    CBox, SqliteDriver,
    bind::bind_parameters,
    extract::{declared_type, extract_name, extract_value, storage_type},
    last_error,
};
use async_stream::try_stream;
use libsqlite3_sys::*;
use std::{
    ffi::{CString, c_char, c_int},
    ptr,
    sync::Arc,
};
use strata_core::{
    ColumnType, Connection, Context, Driver, Error, QueryResult, Result, Row, RowShape,
    RowsAffected, Statement, stream::Stream, truncate_long,
};
use tokio::task::spawn_blocking;

/// Milliseconds a statement waits on a locked database before failing.
const BUSY_TIMEOUT: c_int = 5_000;

/// Where and how to open a database, decoded from `sqlite://path?mode=rwc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteLocation {
    pub path: String,
    pub flags: c_int,
}

impl SqliteLocation {
    pub fn parse(url: &str) -> Result<Self> {
        let prefix = format!("{}://", SqliteDriver::NAME);
        let Some(rest) = url.strip_prefix(&prefix) else {
            let error = Error::msg(format!(
                "Expected sqlite connection url to start with `{}`, found `{}`",
                prefix, url
            ));
            log::error!("{:#}", error);
            return Err(error);
        };
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        let path = urlencoding::decode(path)
            .with_context(|| format!("Error while decoding connection URL: `{}`", url))?
            .into_owned();
        let mut flags = SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE;
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key != "mode" {
                log::warn!("Ignoring the sqlite connection option `{}`", key);
                continue;
            }
            flags = match value.as_ref() {
                "ro" => SQLITE_OPEN_READONLY,
                "rw" => SQLITE_OPEN_READWRITE,
                "rwc" => SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE,
                "memory" => SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE | SQLITE_OPEN_MEMORY,
                _ => {
                    let error = Error::msg(format!(
                        "Unknown sqlite mode `{}`, expected one of: ro, rw, rwc, memory",
                        value
                    ));
                    log::error!("{:#}", error);
                    return Err(error);
                }
            };
        }
        if path.is_empty() {
            let error = Error::msg(format!("The sqlite connection url `{}` has no path", url));
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(Self { path, flags })
    }
}

type Handle = Arc<CBox<*mut sqlite3>>;

/// Connection to one database file. Statements run on the blocking thread pool.
pub struct SqliteConnection {
    location: SqliteLocation,
    connection: Option<Handle>,
}

impl SqliteConnection {
    pub async fn connect(url: &str) -> Result<Self> {
        let location = SqliteLocation::parse(url)?;
        let connection = Self::open_handle(location.clone()).await?;
        Ok(Self {
            location,
            connection: Some(connection),
        })
    }

    pub fn location(&self) -> &SqliteLocation {
        &self.location
    }

    async fn open_handle(location: SqliteLocation) -> Result<Handle> {
        spawn_blocking(move || -> Result<Handle> {
            let path = CString::new(location.path.as_str())
                .with_context(|| format!("Invalid sqlite path `{}`", location.path))?;
            let mut connection = CBox::new(ptr::null_mut(), |p| unsafe {
                sqlite3_close(p);
            });
            let rc = unsafe {
                sqlite3_open_v2(
                    path.as_ptr(),
                    &mut *connection,
                    location.flags | SQLITE_OPEN_FULLMUTEX,
                    ptr::null(),
                )
            };
            if rc != SQLITE_OK {
                let error = if connection.is_null() {
                    Error::msg("Out of memory while opening the database")
                } else {
                    last_error(*connection)
                }
                .context(format!("Cannot open the sqlite database `{}`", location.path));
                log::error!("{:#}", error);
                return Err(error);
            }
            unsafe {
                sqlite3_busy_timeout(*connection, BUSY_TIMEOUT);
            }
            Ok(Arc::new(connection))
        })
        .await?
    }

    fn handle(&self) -> Result<Handle> {
        self.connection.clone().ok_or_else(|| {
            let error = Error::msg(format!(
                "The connection to `{}` is closed",
                self.location.path
            ));
            log::error!("{:#}", error);
            error
        })
    }
}

/// Runs every statement of the text, in order.
fn run_blocking(connection: &CBox<*mut sqlite3>, statement: &Statement) -> Result<Vec<QueryResult>> {
    let sql = CString::new(statement.sql.as_str())
        .context("Could not create a CString from the query String")?;
    let mut results = Vec::new();
    let mut tail: *const c_char = sql.as_ptr();
    loop {
        if unsafe { *tail } == 0 {
            break;
        }
        let mut prepared = CBox::new(ptr::null_mut(), |p| unsafe {
            sqlite3_finalize(p);
        });
        let mut next = ptr::null();
        let rc = unsafe { sqlite3_prepare_v2(**connection, tail, -1, &mut *prepared, &mut next) };
        if rc != SQLITE_OK {
            return Err(last_error(**connection));
        }
        tail = next;
        if prepared.is_null() {
            // Whitespace or comment
            continue;
        }
        bind_parameters(*prepared, &statement.parameters)?;
        step_all(**connection, *prepared, &mut results)?;
    }
    Ok(results)
}

fn step_all(
    connection: *mut sqlite3,
    statement: *mut sqlite3_stmt,
    results: &mut Vec<QueryResult>,
) -> Result<()> {
    let count = unsafe { sqlite3_column_count(statement) };
    let names = (0..count)
        .map(|i| extract_name(statement, i))
        .collect::<Result<Vec<_>>>()?;
    let declared = (0..count)
        .map(|i| declared_type(statement, i))
        .collect::<Vec<_>>();
    let mut shape: Option<Arc<RowShape>> = None;
    let changes = unsafe { sqlite3_total_changes(connection) };
    loop {
        match unsafe { sqlite3_step(statement) } {
            SQLITE_DONE => break,
            SQLITE_ROW => {
                let shape = shape
                    .get_or_insert_with(|| {
                        let types: Vec<ColumnType> = declared
                            .iter()
                            .enumerate()
                            .map(|(i, v)| v.unwrap_or_else(|| storage_type(statement, i as c_int)))
                            .collect();
                        Arc::new(RowShape::new(names.clone(), types))
                    })
                    .clone();
                let values = (0..count)
                    .map(|i| extract_value(statement, i, shape.types[i as usize]))
                    .collect::<Result<Box<[_]>>>()?;
                results.push(QueryResult::Row(Row::new(shape, values)));
            }
            _ => return Err(last_error(connection)),
        }
    }
    if count == 0 {
        let rows_affected = unsafe { sqlite3_total_changes(connection) } - changes;
        results.push(QueryResult::Affected(RowsAffected {
            rows_affected: rows_affected.max(0) as u64,
            last_affected_id: (rows_affected > 0)
                .then(|| unsafe { sqlite3_last_insert_rowid(connection) }),
        }));
    }
    Ok(())
}

impl Connection for SqliteConnection {
    fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    async fn open(&mut self) -> Result<()> {
        if self.connection.is_none() {
            self.connection = Some(Self::open_handle(self.location.clone()).await?);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // The handle is closed once the last statement holding it finishes
        self.connection.take();
        Ok(())
    }

    fn run(&mut self, statement: Statement) -> impl Stream<Item = Result<QueryResult>> + Send {
        let connection = self.handle();
        try_stream! {
            let connection = connection?;
            log::debug!("{}", statement);
            let context = format!("While executing the query:\n{}", truncate_long!(statement.sql));
            let results = spawn_blocking(move || run_blocking(&connection, &statement))
                .await?
                .map_err(|e| {
                    let error = e.context(context);
                    log::error!("{:#}", error);
                    error
                })?;
            for result in results {
                yield result;
            }
        }
    }
}
