use crate::{Connection, Result};
use std::future::Future;

/// Entry point of a database backend: opens connections for the pool.
pub trait Driver: Send + Sync + 'static {
    type Connection: Connection;

    const NAME: &'static str;

    fn connect(&self, url: &str) -> impl Future<Output = Result<Self::Connection>> + Send;
}
