use crate::{
    Connection, Context, DataError, Dialect, DialectKind, Driver, Entity, MarshallerCache,
    PartitionRouter, Registration, Registry, Result, Session, Statement, TableDescriptor, probe,
};
use crossbeam::queue::SegQueue;
use std::{
    any::TypeId,
    collections::HashMap,
    fmt::{self, Debug},
    sync::{Arc, PoisonError, RwLock},
};

/// Connections kept open by default for each database.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// How to reach one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Name the sessions are requested with.
    pub key: String,
    pub dialect: DialectKind,
    /// Driver URL, for example `sqlite://orders.db?mode=rwc`.
    pub url: String,
    /// Connections kept by the pool, more can be lent out when the pool is empty.
    pub pool_size: usize,
    /// Create the missing tables of the registered types when the database is registered.
    pub check_schema: bool,
}

impl DatabaseConfig {
    pub fn new(key: impl Into<String>, dialect: DialectKind, url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            dialect,
            url: url.into(),
            pool_size: DEFAULT_POOL_SIZE,
            check_schema: false,
        }
    }
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }
    pub fn check_schema(mut self, check_schema: bool) -> Self {
        self.check_schema = check_schema;
        self
    }
}

/// Statements of one physical table, generated once per database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSql {
    pub insert: String,
    pub update: String,
    /// Missing for composite keys.
    pub delete: Option<String>,
    /// Missing for composite keys.
    pub select_by_id: Option<String>,
}

impl CachedSql {
    pub fn new(dialect: &dyn Dialect, table: &TableDescriptor, physical: &str) -> Self {
        let mut insert = String::with_capacity(256);
        dialect.write_insert(&mut insert, table, physical);
        let mut update = String::with_capacity(256);
        dialect.write_update(&mut update, table, physical);
        let mut delete = String::with_capacity(128);
        let delete = dialect
            .write_delete(&mut delete, table, physical)
            .ok()
            .map(|_| delete);
        let mut select_by_id = String::with_capacity(128);
        let select_by_id = dialect
            .write_select_by_id(&mut select_by_id, table, physical)
            .ok()
            .map(|_| select_by_id);
        Self {
            insert,
            update,
            delete,
            select_by_id,
        }
    }
}

/// A registered database: its dialect, the pool of idle connections and the per table
/// statements.
pub struct Database<D: Driver> {
    driver: Arc<D>,
    config: DatabaseConfig,
    dialect: Arc<dyn Dialect>,
    pool: SegQueue<D::Connection>,
    sql: RwLock<HashMap<(TypeId, String), Arc<CachedSql>>>,
    router: PartitionRouter,
}

impl<D: Driver> Database<D> {
    pub fn new(driver: Arc<D>, config: DatabaseConfig) -> Self {
        let dialect = config.dialect.dialect();
        Self {
            driver,
            config,
            dialect,
            pool: SegQueue::new(),
            sql: Default::default(),
            router: Default::default(),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn key(&self) -> &str {
        &self.config.key
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn router(&self) -> &PartitionRouter {
        &self.router
    }

    /// Idle connections currently in the pool.
    pub fn idle(&self) -> usize {
        self.pool.len()
    }

    /// Opens connections until the pool holds its configured size.
    pub async fn fill(&self) -> Result<()> {
        while self.pool.len() < self.config.pool_size {
            let connection = self.connect().await?;
            self.pool.push(connection);
        }
        Ok(())
    }

    async fn connect(&self) -> Result<D::Connection> {
        self.driver
            .connect(&self.config.url)
            .await
            .with_context(|| format!("While connecting to the database `{}`", self.config.key))
    }

    /// An idle connection, reopened if needed, or a new one when the pool is empty.
    pub async fn acquire(&self) -> Result<D::Connection> {
        match self.pool.pop() {
            Some(mut connection) => {
                if !connection.is_open() {
                    connection.open().await.with_context(|| {
                        format!("While reopening a connection to `{}`", self.config.key)
                    })?;
                }
                Ok(connection)
            }
            None => {
                log::info!(
                    "The pool of `{}` is empty, opening a new connection",
                    self.config.key
                );
                self.connect().await
            }
        }
    }

    /// Puts the connection back in the pool, it is handed back when the pool is full.
    pub fn restore(&self, connection: D::Connection) -> Option<D::Connection> {
        if self.pool.len() < self.config.pool_size {
            self.pool.push(connection);
            None
        } else {
            Some(connection)
        }
    }

    /// Puts the connection back or closes it, close errors are ignored.
    pub async fn release(&self, connection: D::Connection) {
        if let Some(mut connection) = self.restore(connection) {
            log::debug!("The pool of `{}` is full, closing the connection", self.config.key);
            if let Err(e) = connection.close().await {
                log::warn!("{:#}", e);
            }
        }
    }

    /// Statements of `physical`, generated on first use.
    pub fn cached_sql(
        &self,
        type_id: TypeId,
        table: &TableDescriptor,
        physical: &str,
    ) -> Arc<CachedSql> {
        let key = (type_id, physical.to_string());
        if let Some(sql) = self
            .sql
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return sql.clone();
        }
        let sql = Arc::new(CachedSql::new(self.dialect(), table, physical));
        self.sql
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(sql)
            .clone()
    }

    /// Makes sure the physical table exists, working on a connection of its own.
    pub async fn ensure_partition(
        &self,
        type_id: TypeId,
        table: &TableDescriptor,
        physical: &str,
    ) -> Result<()> {
        if !table.is_partitioned() || self.router.is_known(type_id, physical) {
            return Ok(());
        }
        let mut connection = self.acquire().await?;
        let result = self
            .router
            .ensure(self.dialect(), &mut connection, type_id, table, physical)
            .await;
        self.release(connection).await;
        result
    }

    /// Creates the logical tables of `tables` that are missing. Partitioned tables are
    /// provisioned on first use instead.
    pub async fn check_schema(&self, tables: &[Arc<TableDescriptor>]) -> Result<()> {
        let mut connection = self.acquire().await?;
        let result = self.create_missing(&mut connection, tables).await;
        self.release(connection).await;
        result
    }

    async fn create_missing(
        &self,
        connection: &mut D::Connection,
        tables: &[Arc<TableDescriptor>],
    ) -> Result<()> {
        for table in tables.iter().filter(|v| !v.is_partitioned()) {
            if probe(connection, &table.name).await.is_ok() {
                continue;
            }
            log::info!("Creating the table `{}` in `{}`", table.name, self.config.key);
            for sql in self.dialect.create_table_statements(table) {
                log::debug!("{}", sql);
                let context = format!("While creating the table `{}`:\n{}", table.name, sql);
                connection
                    .execute(Statement::new(sql))
                    .await
                    .context(context)?;
            }
        }
        Ok(())
    }
}

impl<D: Driver> Debug for Database<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("driver", &D::NAME)
            .field("config", &self.config)
            .field("idle", &self.pool.len())
            .finish()
    }
}

/// Service object holding everything a session needs: the registered types, the compiled
/// marshallers and the databases.
pub struct DataContext<D: Driver> {
    driver: Arc<D>,
    registry: Arc<Registry>,
    marshallers: Arc<MarshallerCache>,
    databases: RwLock<HashMap<String, Arc<Database<D>>>>,
    default_key: RwLock<Option<String>>,
}

impl<D: Driver> DataContext<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver: Arc::new(driver),
            registry: Default::default(),
            marshallers: Default::default(),
            databases: Default::default(),
            default_key: Default::default(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn marshallers(&self) -> &Arc<MarshallerCache> {
        &self.marshallers
    }

    pub fn register<E: Entity>(&self) -> Result<Arc<TableDescriptor>> {
        self.registry.register::<E>()
    }

    pub fn register_scope(&self, scope: &[Registration]) -> Result<()> {
        self.registry.register_scope(scope)
    }

    /// Adds a database and fills its pool. The first database registered becomes the default
    /// one unless [`DataContext::set_default_key`] says otherwise.
    pub async fn register_database(&self, config: DatabaseConfig) -> Result<Arc<Database<D>>> {
        let key = config.key.clone();
        let exists = self
            .databases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&key);
        if exists {
            return Err(DataError::DuplicateDatabaseKey(key).raise());
        }
        let check_schema = config.check_schema;
        let database = Arc::new(Database::new(self.driver.clone(), config));
        database.fill().await?;
        if check_schema {
            database.check_schema(&self.registry.tables()).await?;
        }
        {
            let mut databases = self.databases.write().unwrap_or_else(PoisonError::into_inner);
            if databases.contains_key(&key) {
                return Err(DataError::DuplicateDatabaseKey(key).raise());
            }
            databases.insert(key.clone(), database.clone());
        }
        let mut default_key = self.default_key.write().unwrap_or_else(PoisonError::into_inner);
        if default_key.is_none() {
            *default_key = Some(key);
        }
        Ok(database)
    }

    pub fn database(&self, key: &str) -> Result<Arc<Database<D>>> {
        match self
            .databases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            Some(database) => Ok(database.clone()),
            None => Err(DataError::UnknownDatabaseKey(key.to_string()).raise()),
        }
    }

    pub fn default_key(&self) -> Option<String> {
        self.default_key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_default_key(&self, key: impl Into<String>) {
        *self.default_key.write().unwrap_or_else(PoisonError::into_inner) = Some(key.into());
    }

    /// Session on the database registered with `key`.
    pub async fn session(&self, key: &str) -> Result<Session<D>> {
        let database = self.database(key)?;
        let connection = database.acquire().await?;
        Ok(Session::new(
            database,
            self.registry.clone(),
            self.marshallers.clone(),
            connection,
        ))
    }

    /// Session on the default database.
    pub async fn default_session(&self) -> Result<Session<D>> {
        let Some(key) = self.default_key() else {
            return Err(DataError::UnknownDatabaseKey("(default)".into()).raise());
        };
        self.session(&key).await
    }
}

impl<D: Driver> Debug for DataContext<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataContext")
            .field("driver", &D::NAME)
            .field("registry", &self.registry)
            .field("default_key", &self.default_key())
            .finish()
    }
}
