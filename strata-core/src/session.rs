use crate::{
    AsValue, ColumnDescriptor, Connection, Context, DataError, Database, Dialect, Driver,
    DynamicIndex, DynamicRecord, Entity, Error, IdentityRetrieval, Marshaller, MarshallerCache, Page,
    Parameter, PrimaryKeyDescriptor, QueryResult, Record, Registry, Result, Row, RowShape,
    RowsAffected, Statement, TableDescriptor, Value, format_where_order, identity_value,
    physical_name, physical_name_for_key, positional_statement,
    stream::{self, Stream, StreamExt, TryStreamExt},
};
use std::{
    any::TypeId,
    fmt::{self, Debug, Write},
    future,
    sync::Arc,
};
use time::Date;

/// A connection lent by the pool of a database, together with its transaction state.
///
/// Dropping the session gives the connection back to the pool (when the pool has room and
/// no transaction is open). [`Session::release`] does the same and also closes the
/// connections the pool has no room for.
pub struct Session<D: Driver> {
    database: Arc<Database<D>>,
    registry: Arc<Registry>,
    marshallers: Arc<MarshallerCache>,
    connection: Option<D::Connection>,
    transaction: bool,
}

impl<D: Driver> Session<D> {
    pub fn new(
        database: Arc<Database<D>>,
        registry: Arc<Registry>,
        marshallers: Arc<MarshallerCache>,
        connection: D::Connection,
    ) -> Self {
        Self {
            database,
            registry,
            marshallers,
            connection: Some(connection),
            transaction: false,
        }
    }

    pub fn database(&self) -> &Arc<Database<D>> {
        &self.database
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.database.dialect()
    }

    pub fn is_in_transaction(&self) -> bool {
        self.transaction
    }

    pub fn connection(&mut self) -> Result<&mut D::Connection> {
        self.connection
            .as_mut()
            .ok_or_else(|| Error::msg("The session was already released"))
    }

    /// Gives the connection back, rolling back a transaction left open.
    pub async fn release(mut self) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };
        if self.transaction {
            self.transaction = false;
            let rollback = Statement::new(self.database.dialect().rollback_transaction());
            if let Err(e) = connection.execute(rollback).await {
                log::warn!("{:#}", e);
            }
        }
        self.database.release(connection).await;
    }

    pub async fn begin(&mut self) -> Result<()> {
        if self.transaction {
            return Err(DataError::TransactionAlreadyOpen.raise());
        }
        let statement = Statement::new(self.database.dialect().begin_transaction());
        self.execute_statement(statement).await?;
        self.transaction = true;
        Ok(())
    }

    /// Commits the open transaction, does nothing without one.
    pub async fn commit(&mut self) -> Result<()> {
        if !self.transaction {
            return Ok(());
        }
        let statement = Statement::new(self.database.dialect().commit_transaction());
        self.execute_statement(statement).await?;
        self.transaction = false;
        Ok(())
    }

    /// Rolls back the open transaction, does nothing without one.
    pub async fn rollback(&mut self) -> Result<()> {
        if !self.transaction {
            return Ok(());
        }
        self.transaction = false;
        let statement = Statement::new(self.database.dialect().rollback_transaction());
        self.execute_statement(statement).await.map(|_| ())
    }

    /// Inserts the entity in the table of its key. A key assigned by the database is written
    /// back into the entity.
    pub async fn insert<E: Entity>(&mut self, entity: &mut E) -> Result<RowsAffected> {
        self.insert_into(entity, None).await
    }

    /// Inserts the entity in the partition of `date`.
    pub async fn insert_at<E: Entity>(&mut self, entity: &mut E, date: Date) -> Result<RowsAffected> {
        self.insert_into(entity, Some(date)).await
    }

    async fn insert_into<E: Entity>(
        &mut self,
        entity: &mut E,
        date: Option<Date>,
    ) -> Result<RowsAffected> {
        let table = self.registry.resolve::<E>()?;
        let database = self.database.clone();
        let dialect = database.dialect();
        let identity = table.identity_key();
        if identity.is_none() {
            check_keys(&table, &*entity)?;
        }
        let physical = match date {
            Some(date) => physical_name(&table, date),
            None => physical_of(&table, &*entity)?,
        };
        database
            .ensure_partition(TypeId::of::<E>(), &table, &physical)
            .await?;
        let sql = database.cached_sql(TypeId::of::<E>(), &table, &physical);
        match (identity, dialect.identity_retrieval()) {
            (None, _) => {
                let parameters = entity_parameters(dialect, &*entity, dialect.insert_columns(&table));
                self.execute_statement(Statement::with_parameters(sql.insert.clone(), parameters))
                    .await
            }
            (Some(key), IdentityRetrieval::SelectAfter(query)) => {
                let parameters = entity_parameters(dialect, &*entity, dialect.insert_columns(&table));
                let statement = Statement::with_parameters(format!("{}{}", sql.insert, query), parameters);
                let (affected, rows) = self.run_statement(statement).await?;
                assign_identity(entity, key, first_value(rows))?;
                Ok(affected)
            }
            (Some(key), IdentityRetrieval::SequenceBefore) => {
                let mut query = String::with_capacity(64);
                dialect.write_sequence_next(&mut query, &key.sequence_name);
                let (_, rows) = self.run_statement(Statement::new(query)).await?;
                assign_identity(entity, key, first_value(rows))?;
                let parameters = entity_parameters(dialect, &*entity, dialect.insert_columns(&table));
                self.execute_statement(Statement::with_parameters(sql.insert.clone(), parameters))
                    .await
            }
        }
    }

    /// Updates the row of the entity key, returns the number of rows changed.
    pub async fn update<E: Entity>(&mut self, entity: &E) -> Result<u64> {
        let table = self.registry.resolve::<E>()?;
        let database = self.database.clone();
        let dialect = database.dialect();
        let physical = physical_of(&table, entity)?;
        database
            .ensure_partition(TypeId::of::<E>(), &table, &physical)
            .await?;
        let sql = database.cached_sql(TypeId::of::<E>(), &table, &physical);
        let columns = table
            .columns
            .iter()
            .filter(|v| v.update)
            .chain(table.primary_keys.iter().map(|v| &v.column));
        let parameters = entity_parameters(dialect, entity, columns);
        self.execute_statement(Statement::with_parameters(sql.update.clone(), parameters))
            .await
            .map(|v| v.rows_affected)
    }

    /// Deletes the row with the key `id`, looked up in the partition the key encodes.
    pub async fn delete_by_id<E: Entity>(&mut self, id: impl Into<Value>) -> Result<u64> {
        let table = self.registry.resolve::<E>()?;
        let database = self.database.clone();
        let dialect = database.dialect();
        let key = table.primary_key()?;
        let id = id.into();
        let physical = physical_name_for_key(&table, &id)?;
        database
            .ensure_partition(TypeId::of::<E>(), &table, &physical)
            .await?;
        let sql = database.cached_sql(TypeId::of::<E>(), &table, &physical);
        let Some(query) = sql.delete.clone() else {
            return Err(DataError::CompositeKeyUnsupported(table.type_name.into()).raise());
        };
        let mut statement = Statement::new(query);
        statement.bind(dialect.parameter_name(key.column.field), dialect.bind_value(id));
        self.execute_statement(statement)
            .await
            .map(|v| v.rows_affected)
    }

    /// Deletes the rows matching `condition` (`{Field}` and `?` placeholders allowed) from the
    /// logical table. Partitions are not searched.
    pub async fn delete_where<E: Entity>(
        &mut self,
        condition: &str,
        params: Vec<Value>,
    ) -> Result<u64> {
        let table = self.registry.resolve::<E>()?;
        let mut query = format!("delete from {}", table.name);
        write_condition(&mut query, &table, condition);
        self.execute_non_query(&query, params).await
    }

    /// Entity with the key `id`, looked up in the partition the key encodes.
    pub async fn get_by_id<E: Entity>(&mut self, id: impl Into<Value>) -> Result<Option<E>> {
        let table = self.registry.resolve::<E>()?;
        let database = self.database.clone();
        let dialect = database.dialect();
        let key = table.primary_key()?;
        let id = id.into();
        let physical = physical_name_for_key(&table, &id)?;
        database
            .ensure_partition(TypeId::of::<E>(), &table, &physical)
            .await?;
        let sql = database.cached_sql(TypeId::of::<E>(), &table, &physical);
        let Some(query) = sql.select_by_id.clone() else {
            return Err(DataError::CompositeKeyUnsupported(table.type_name.into()).raise());
        };
        let mut statement = Statement::new(query);
        statement.bind(dialect.parameter_name(key.column.field), dialect.bind_value(id));
        let rows = self.fetch_rows(statement).await?;
        Ok(self.marshal_entities(&table, rows)?.into_iter().next())
    }

    /// First entity of the logical table matching `condition`.
    pub async fn get_object<E: Entity>(
        &mut self,
        condition: &str,
        params: Vec<Value>,
    ) -> Result<Option<E>> {
        Ok(self.get_list(condition, "", params).await?.into_iter().next())
    }

    /// Entities of the logical table matching `condition`, sorted by `order` (both may be
    /// empty and use `{Field}` placeholders).
    pub async fn get_list<E: Entity>(
        &mut self,
        condition: &str,
        order: &str,
        params: Vec<Value>,
    ) -> Result<Vec<E>> {
        let table = self.registry.resolve::<E>()?;
        let mut query = format!("select * from {}", table.name);
        write_condition(&mut query, &table, condition);
        if !order.trim().is_empty() {
            let _ = write!(query, " order by {}", format_where_order(&table, order));
        }
        let statement = positional_statement(self.dialect(), &query, params);
        let rows = self.fetch_rows(statement).await?;
        self.marshal_entities(&table, rows)
    }

    /// First entity read by a query, columns are matched with the mapped column names.
    pub async fn get_object_by_sql<E: Entity>(
        &mut self,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<Option<E>> {
        Ok(self.get_list_by_sql(sql, params).await?.into_iter().next())
    }

    pub async fn get_list_by_sql<E: Entity>(
        &mut self,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<Vec<E>> {
        let table = self.registry.resolve::<E>()?;
        let statement = positional_statement(self.dialect(), sql, params);
        let rows = self.fetch_rows(statement).await?;
        self.marshal_entities(&table, rows)
    }

    /// First record read by a query, columns are matched with the field names.
    pub async fn get_custom_object<T: Record>(
        &mut self,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<Option<T>> {
        Ok(self.get_custom_list(sql, params).await?.into_iter().next())
    }

    pub async fn get_custom_list<T: Record>(
        &mut self,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<Vec<T>> {
        let statement = positional_statement(self.dialect(), sql, params);
        let rows = self.fetch_rows(statement).await?;
        self.marshal_records(rows)
    }

    /// One page of records, in the paging syntax of the database.
    pub async fn get_paging_list<T: Record>(
        &mut self,
        page: &Page<'_>,
        params: Vec<Value>,
    ) -> Result<Vec<T>> {
        let statement = self.paging_statement(page, params)?;
        let rows = self.fetch_rows(statement).await?;
        self.marshal_records(rows)
    }

    pub async fn get_dynamic_list(
        &mut self,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<Vec<DynamicRecord>> {
        let statement = positional_statement(self.dialect(), sql, params);
        let rows = self.fetch_rows(statement).await?;
        Ok(self.dynamic_records(rows))
    }

    pub async fn get_dynamic_object(
        &mut self,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<Option<DynamicRecord>> {
        Ok(self.get_dynamic_list(sql, params).await?.into_iter().next())
    }

    pub async fn get_dynamic_paging_list(
        &mut self,
        page: &Page<'_>,
        params: Vec<Value>,
    ) -> Result<Vec<DynamicRecord>> {
        let statement = self.paging_statement(page, params)?;
        let rows = self.fetch_rows(statement).await?;
        Ok(self.dynamic_records(rows))
    }

    /// Inserts `entities` with multi row statements of at most `page_size` rows. More than one
    /// page needs an open transaction, a partitioned table needs the partition `date`.
    pub async fn insert_batch<E: Entity>(
        &mut self,
        entities: &[E],
        page_size: usize,
        date: Option<Date>,
    ) -> Result<u64> {
        if entities.is_empty() {
            return Ok(0);
        }
        if page_size == 0 {
            return Err(DataError::InvalidArgument("The page size must be positive".into()).raise());
        }
        if entities.len() > page_size && !self.transaction {
            return Err(DataError::InvalidArgument(format!(
                "Inserting more than {} rows at once requires a transaction",
                page_size
            ))
            .raise());
        }
        let table = self.registry.resolve::<E>()?;
        let database = self.database.clone();
        let dialect = database.dialect();
        let physical = batch_physical_name(&table, date)?;
        database
            .ensure_partition(TypeId::of::<E>(), &table, &physical)
            .await?;
        let columns = dialect.insert_columns(&table);
        let fields = E::fields();
        let mut total = 0;
        for chunk in entities.chunks(page_size) {
            let mut query = String::with_capacity(64 + chunk.len() * columns.len() * 16);
            dialect.write_batch_insert(&mut query, &table, &physical, chunk.len())?;
            let mut parameters = Vec::with_capacity(chunk.len() * columns.len());
            for entity in chunk {
                if table.identity_key().is_none() {
                    check_keys(&table, entity)?;
                }
                for column in columns.iter() {
                    parameters.push(Parameter {
                        name: dialect.batch_parameter_name(column.field, parameters.len()),
                        value: dialect.bind_value((fields[column.field_index].get)(entity)),
                    });
                }
            }
            let affected = self
                .execute_statement(Statement::with_parameters(query, parameters))
                .await?;
            total += affected.rows_affected;
        }
        Ok(total)
    }

    /// Hands all the entities to the native bulk copy of the driver.
    pub async fn bulk_load<E: Entity>(&mut self, entities: &[E], date: Option<Date>) -> Result<u64> {
        let table = self.registry.resolve::<E>()?;
        let database = self.database.clone();
        let dialect = database.dialect();
        if !dialect.supports_bulk_load() {
            return Err(DataError::UnsupportedOperation(format!(
                "Bulk load on {}",
                dialect.kind()
            ))
            .raise());
        }
        if entities.is_empty() {
            return Ok(0);
        }
        let physical = batch_physical_name(&table, date)?;
        database
            .ensure_partition(TypeId::of::<E>(), &table, &physical)
            .await?;
        let columns = dialect.insert_columns(&table);
        let names: Vec<String> = columns.iter().map(|v| v.name.clone()).collect();
        let fields = E::fields();
        let mut rows = Vec::with_capacity(entities.len());
        for entity in entities {
            if table.identity_key().is_none() {
                check_keys(&table, entity)?;
            }
            rows.push(
                columns
                    .iter()
                    .map(|v| dialect.bind_value((fields[v.field_index].get)(entity)))
                    .collect::<Box<[Value]>>(),
            );
        }
        log::debug!("Bulk loading {} rows into {}", rows.len(), physical);
        let context = format!("While bulk loading into `{}`", physical);
        self.connection()?
            .bulk_load(&physical, &names, rows)
            .await
            .context(context)
            .map(|v| v.rows_affected)
    }

    /// Runs a statement with `?` placeholders, returns the number of rows affected.
    pub async fn execute_non_query(&mut self, sql: &str, params: Vec<Value>) -> Result<u64> {
        let statement = positional_statement(self.dialect(), sql, params);
        self.execute_statement(statement)
            .await
            .map(|v| v.rows_affected)
    }

    /// First column of the first row, NULL when nothing is returned.
    pub async fn execute_scalar(&mut self, sql: &str, params: Vec<Value>) -> Result<Value> {
        let statement = positional_statement(self.dialect(), sql, params);
        let (_, rows) = self.run_statement(statement).await?;
        Ok(first_value(rows))
    }

    /// Same as [`Session::execute_scalar`] converted to `T`, `None` for NULL.
    pub async fn execute_scalar_as<T: AsValue>(
        &mut self,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<Option<T>> {
        match self.execute_scalar(sql, params).await? {
            v if v.is_null() => Ok(None),
            v => T::try_from_value(v).map(Some),
        }
    }

    /// Rows of a query, as they arrive.
    pub fn execute_reader(
        &mut self,
        sql: &str,
        params: Vec<Value>,
    ) -> impl Stream<Item = Result<Row>> + Send {
        let statement = positional_statement(self.database.dialect(), sql, params);
        log::debug!("{}", statement);
        match self.connection.as_mut() {
            Some(connection) => connection.fetch(statement).left_stream(),
            None => stream::once(future::ready(Err(Error::msg(
                "The session was already released",
            ))))
            .right_stream(),
        }
    }

    /// All the rows of a query.
    pub async fn get_table(&mut self, sql: &str, params: Vec<Value>) -> Result<Vec<Row>> {
        let statement = positional_statement(self.dialect(), sql, params);
        self.fetch_rows(statement).await
    }

    fn paging_statement(&self, page: &Page<'_>, params: Vec<Value>) -> Result<Statement> {
        let dialect = self.dialect();
        let mut query = String::with_capacity(256);
        dialect.write_paging(&mut query, page)?;
        Ok(positional_statement(dialect, &query, params))
    }

    async fn run_statement(&mut self, statement: Statement) -> Result<(RowsAffected, Vec<Row>)> {
        log::debug!("{}", statement);
        let context = format!("While executing the query:\n{}", statement);
        let results: Vec<QueryResult> = self
            .connection()?
            .run(statement)
            .try_collect()
            .await
            .context(context)?;
        let mut affected = RowsAffected::default();
        let mut rows = Vec::new();
        for result in results {
            match result {
                QueryResult::Row(row) => rows.push(row),
                QueryResult::Affected(v) => affected.extend([v]),
            }
        }
        Ok((affected, rows))
    }

    async fn execute_statement(&mut self, statement: Statement) -> Result<RowsAffected> {
        log::debug!("{}", statement);
        let context = format!("While executing the query:\n{}", statement);
        self.connection()?
            .execute(statement)
            .await
            .context(context)
    }

    async fn fetch_rows(&mut self, statement: Statement) -> Result<Vec<Row>> {
        log::debug!("{}", statement);
        let context = format!("While fetching the query:\n{}", statement);
        self.connection()?
            .fetch(statement)
            .try_collect()
            .await
            .context(context)
    }

    fn marshal_entities<E: Entity>(&self, table: &TableDescriptor, rows: Vec<Row>) -> Result<Vec<E>> {
        marshal(rows, |shape| self.marshallers.for_entity::<E>(table, shape))
    }

    fn marshal_records<T: Record>(&self, rows: Vec<Row>) -> Result<Vec<T>> {
        marshal(rows, |shape| self.marshallers.for_record::<T>(shape))
    }

    fn dynamic_records(&self, rows: Vec<Row>) -> Vec<DynamicRecord> {
        let mut current: Option<(Arc<RowShape>, Arc<DynamicIndex>)> = None;
        rows.into_iter()
            .map(|row| {
                let cached = current
                    .as_ref()
                    .filter(|(shape, _)| *shape == row.shape)
                    .map(|(_, v)| v.clone());
                let index = match cached {
                    Some(index) => index,
                    None => {
                        let index = self.marshallers.dynamic_index(&row.shape);
                        current = Some((row.shape.clone(), index.clone()));
                        index
                    }
                };
                DynamicRecord::new(index, row.values)
            })
            .collect()
    }
}

impl<D: Driver> Drop for Session<D> {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        if self.transaction {
            log::warn!(
                "A session of `{}` was dropped with an open transaction, discarding its connection",
                self.database.key()
            );
            return;
        }
        if self.database.restore(connection).is_some() {
            log::debug!(
                "The pool of `{}` is full, dropping the connection",
                self.database.key()
            );
        }
    }
}

impl<D: Driver> Debug for Session<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("database", &self.database.key())
            .field("connected", &self.connection.is_some())
            .field("transaction", &self.transaction)
            .finish()
    }
}

/// Populates one instance per row, looking the marshaller up once per distinct shape.
fn marshal<T: Record>(
    rows: Vec<Row>,
    lookup: impl Fn(&RowShape) -> Arc<Marshaller<T>>,
) -> Result<Vec<T>> {
    let mut current: Option<(Arc<RowShape>, Arc<Marshaller<T>>)> = None;
    rows.into_iter()
        .map(|row| {
            let cached = current
                .as_ref()
                .filter(|(shape, _)| *shape == row.shape)
                .map(|(_, v)| v.clone());
            let marshaller = match cached {
                Some(marshaller) => marshaller,
                None => {
                    let marshaller = lookup(&row.shape);
                    current = Some((row.shape.clone(), marshaller.clone()));
                    marshaller
                }
            };
            marshaller.populate(row)
        })
        .collect()
}

fn entity_parameters<'a, E: Entity>(
    dialect: &dyn Dialect,
    entity: &E,
    columns: impl IntoIterator<Item = &'a ColumnDescriptor>,
) -> Vec<Parameter> {
    let fields = E::fields();
    columns
        .into_iter()
        .map(|column| Parameter {
            name: dialect.parameter_name(column.field),
            value: dialect.bind_value((fields[column.field_index].get)(entity)),
        })
        .collect()
}

fn check_keys<E: Entity>(table: &TableDescriptor, entity: &E) -> Result<()> {
    let fields = E::fields();
    for key in table.primary_keys.iter() {
        if (fields[key.column.field_index].get)(entity).is_null() {
            return Err(DataError::InvalidArgument(format!(
                "The primary key `{}` of `{}` must be assigned before inserting",
                key.column.field, table.type_name
            ))
            .raise());
        }
    }
    Ok(())
}

/// Physical table of an entity, from the date its key encodes.
fn physical_of<E: Entity>(table: &TableDescriptor, entity: &E) -> Result<String> {
    if !table.is_partitioned() {
        return Ok(table.name.clone());
    }
    let key = table.primary_key()?;
    physical_name_for_key(table, &(E::fields()[key.column.field_index].get)(entity))
}

fn batch_physical_name(table: &TableDescriptor, date: Option<Date>) -> Result<String> {
    match date {
        Some(date) => Ok(physical_name(table, date)),
        None if table.is_partitioned() => Err(DataError::InvalidArgument(format!(
            "Writing many rows into the partitioned table `{}` requires the partition date",
            table.name
        ))
        .raise()),
        None => Ok(table.name.clone()),
    }
}

fn assign_identity<E: Entity>(
    entity: &mut E,
    key: &PrimaryKeyDescriptor,
    value: Value,
) -> Result<()> {
    if value.is_null() {
        return Err(Error::msg(format!(
            "The database did not return the generated `{}`",
            key.name()
        )));
    }
    let value = identity_value(value, &key.column)?;
    (E::fields()[key.column.field_index].set)(entity, value)
}

fn write_condition(out: &mut String, table: &TableDescriptor, condition: &str) {
    if !condition.trim().is_empty() {
        let _ = write!(out, " where {}", format_where_order(table, condition));
    }
}

fn first_value(rows: Vec<Row>) -> Value {
    rows.into_iter()
        .next()
        .and_then(|v| v.values.into_vec().into_iter().next())
        .unwrap_or_default()
}
