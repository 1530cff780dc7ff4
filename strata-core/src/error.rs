/// Failure kinds raised by the engine itself.
///
/// They travel inside [`crate::Error`], inspect them with `error.downcast_ref::<DataError>()`.
/// Errors coming from a driver are passed through as they are.
#[derive(thiserror::Error, Debug)]
pub enum DataError {
    #[error("type `{0}` was never registered")]
    UnmappedType(String),
    #[error("a database with key `{0}` is already registered")]
    DuplicateDatabaseKey(String),
    #[error("no database registered with key `{0}`")]
    UnknownDatabaseKey(String),
    #[error("`{0}` is not a valid identifier, expected 18 digits encoding a date")]
    InvalidIdentifier(String),
    #[error("{0}: composite primary keys are not supported here")]
    CompositeKeyUnsupported(String),
    #[error("a transaction is already open on this session")]
    TransactionAlreadyOpen,
    #[error("could not create the partition `{table}`")]
    PartitionProvisioningFailed {
        table: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("{0} is not supported")]
    UnsupportedOperation(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}: no primary key is declared")]
    MissingPrimaryKey(String),
    #[error("{0}: partitioned tables need a creation template")]
    MissingPartitionTemplate(String),
}

impl DataError {
    /// Wraps into the crate error, logging it.
    pub fn raise(self) -> crate::Error {
        let error = crate::Error::new(self);
        log::error!("{:#}", error);
        error
    }
}
