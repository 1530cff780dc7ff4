use crate::{
    Connection, Context, DataError, Dialect, Partitioning, Result, Statement, TableDescriptor,
    Value, decode_date, decode_value, replace_ignore_case,
    stream::{StreamExt, TryStreamExt},
};
use std::{
    any::TypeId,
    collections::{HashMap, HashSet},
    sync::{PoisonError, RwLock},
};
use time::Date;

/// Name of the physical table holding the rows of `date`.
///
/// ```rust
/// use strata_core::{ColumnDescriptor, ColumnType, KeyGeneration, Partitioning, TableDescriptor, physical_name};
/// let table = TableDescriptor::builder::<()>("ORDERS")
///     .primary_key(ColumnDescriptor::new("ID", "id", 0, ColumnType::Int64), KeyGeneration::Unassigned)
///     .partitioning(Partitioning::Quarterly)
///     .create_sql("create table ORDERS (ID bigint)")
///     .build()
///     .unwrap();
/// let date = time::macros::date!(2024 - 05 - 02);
/// assert_eq!(physical_name(&table, date), "ORDERS_20242");
/// ```
pub fn physical_name(table: &TableDescriptor, date: Date) -> String {
    let (year, month, day) = (date.year(), date.month() as u8, date.day());
    match table.partitioning {
        Partitioning::None => table.name.clone(),
        Partitioning::Yearly => format!("{}_{:04}", table.name, year),
        Partitioning::Quarterly => format!("{}_{:04}{}", table.name, year, (month - 1) / 3 + 1),
        Partitioning::Monthly => format!("{}_{:04}{:02}", table.name, year, month),
        Partitioning::Daily => format!("{}_{:04}{:02}{:02}", table.name, year, month, day),
    }
}

/// Name of the physical table holding the row identified by `id`.
pub fn physical_name_for_id(table: &TableDescriptor, id: i64) -> Result<String> {
    if !table.is_partitioned() {
        return Ok(table.name.clone());
    }
    Ok(physical_name(table, decode_date(id)?.date()))
}

/// Same as [`physical_name_for_id`] for a key held in a value (integer or digits).
pub fn physical_name_for_key(table: &TableDescriptor, key: &Value) -> Result<String> {
    if !table.is_partitioned() {
        return Ok(table.name.clone());
    }
    Ok(physical_name(table, decode_value(key)?.date()))
}

/// Statements creating `physical` out of the table template: the logical name is replaced
/// ignoring case, then the text is split on `;` and blank statements are dropped.
pub fn provisioning_statements(table: &TableDescriptor, physical: &str) -> Vec<String> {
    let Some(template) = table.create_sql.as_deref() else {
        return Vec::new();
    };
    replace_ignore_case(template, &table.name, physical)
        .split(';')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Physical tables known to exist, per mapped type. Entries are never removed.
#[derive(Default, Debug)]
pub struct PartitionRouter {
    known: RwLock<HashMap<TypeId, HashSet<String>>>,
}

impl PartitionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_known(&self, type_id: TypeId, physical: &str) -> bool {
        self.known
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .is_some_and(|v| v.contains(physical))
    }

    pub fn mark_known(&self, type_id: TypeId, physical: &str) {
        self.known
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(type_id)
            .or_default()
            .insert(physical.to_string());
    }

    /// Makes sure `physical` exists, using `connection` to probe and create it.
    ///
    /// The connection must not be in a transaction: the creation runs in its own.
    pub async fn ensure<C: Connection>(
        &self,
        dialect: &dyn Dialect,
        connection: &mut C,
        type_id: TypeId,
        table: &TableDescriptor,
        physical: &str,
    ) -> Result<()> {
        if !table.is_partitioned() || physical == table.name || self.is_known(type_id, physical) {
            return Ok(());
        }
        if probe(connection, physical).await.is_ok() {
            self.mark_known(type_id, physical);
            return Ok(());
        }
        log::info!("Creating the partition `{}` of `{}`", physical, table.name);
        match provision(dialect, connection, table, physical).await {
            Ok(()) => {}
            Err(e) => {
                let _ = connection
                    .execute(Statement::new(dialect.rollback_transaction()))
                    .await;
                if dialect.is_already_exists(&e) {
                    log::warn!("The partition `{}` was created concurrently", physical);
                } else {
                    return Err(DataError::PartitionProvisioningFailed {
                        table: physical.to_string(),
                        source: e,
                    }
                    .raise());
                }
            }
        }
        self.mark_known(type_id, physical);
        Ok(())
    }
}

/// `select count(1) from <table>`, fails when the table does not exist.
pub async fn probe<C: Connection>(connection: &mut C, table: &str) -> Result<()> {
    let statement = Statement::new(format!("select count(1) from {}", table));
    connection
        .run(statement)
        .map(|v| v.map(|_| ()))
        .try_collect::<()>()
        .await
}

async fn provision<C: Connection>(
    dialect: &dyn Dialect,
    connection: &mut C,
    table: &TableDescriptor,
    physical: &str,
) -> Result<()> {
    connection
        .execute(Statement::new(dialect.begin_transaction()))
        .await?;
    for sql in provisioning_statements(table, physical) {
        log::debug!("{}", sql);
        let context = format!("While creating the partition:\n{}", sql);
        connection
            .execute(Statement::new(sql))
            .await
            .context(context)?;
    }
    connection
        .execute(Statement::new(dialect.commit_transaction()))
        .await?;
    Ok(())
}
