use crate::SqliteConnection;
use strata_core::{Driver, Result};

#[derive(Default, Debug, Clone, Copy)]
pub struct SqliteDriver;

impl SqliteDriver {
    pub const fn new() -> Self {
        Self
    }
}

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;

    const NAME: &'static str = "sqlite";

    async fn connect(&self, url: &str) -> Result<SqliteConnection> {
        SqliteConnection::connect(url).await
    }
}
