mod mysql;
mod oracle;
mod sqlite;
mod sqlserver;

pub use mysql::*;
pub use oracle::*;
pub use sqlite::*;
pub use sqlserver::*;

use crate::{
    AsValue, ColumnDescriptor, ColumnType, DataError, Error, Result, TICK_NANOSECONDS,
    TableDescriptor, Value, separated_by,
};
use std::{
    fmt::{self, Debug, Display, Write},
    str::FromStr,
    sync::Arc,
};
use uuid::Uuid;

/// Supported databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectKind {
    SqlServer,
    Oracle,
    MySql,
    Sqlite,
}

impl DialectKind {
    pub fn dialect(&self) -> Arc<dyn Dialect> {
        match self {
            DialectKind::SqlServer => Arc::new(SqlServerDialect),
            DialectKind::Oracle => Arc::new(OracleDialect),
            DialectKind::MySql => Arc::new(MySqlDialect),
            DialectKind::Sqlite => Arc::new(SqliteDialect),
        }
    }
}

impl FromStr for DialectKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "sqlserver" | "mssql" => DialectKind::SqlServer,
            "oracle" => DialectKind::Oracle,
            "mysql" => DialectKind::MySql,
            "sqlite" => DialectKind::Sqlite,
            _ => {
                return Err(DataError::InvalidArgument(format!("Unknown dialect `{}`", s)).raise());
            }
        })
    }
}

impl Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DialectKind::SqlServer => "sqlserver",
            DialectKind::Oracle => "oracle",
            DialectKind::MySql => "mysql",
            DialectKind::Sqlite => "sqlite",
        })
    }
}

/// How the database assigned key of an identity table is read back after an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityRetrieval {
    /// Appended to the insert text, the statement returns the key as a scalar.
    SelectAfter(&'static str),
    /// The key is drawn from the table sequence before the insert and bound like any value.
    SequenceBefore,
}

/// Arguments of a paged select. `condition`, `group_by` and `order_by` are written without
/// their keywords and may be empty.
#[derive(Default, Debug, Clone, Copy)]
pub struct Page<'a> {
    /// One based.
    pub index: u32,
    pub size: u32,
    pub fields: &'a str,
    pub from: &'a str,
    pub condition: &'a str,
    pub group_by: &'a str,
    pub order_by: &'a str,
}

impl Page<'_> {
    pub fn offset(&self) -> u64 {
        (self.index as u64 - 1) * self.size as u64
    }
    fn check(&self) -> Result<()> {
        if self.index < 1 || self.size < 1 {
            return Err(DataError::InvalidArgument(format!(
                "Page index and size must be positive, found page {} of size {}",
                self.index, self.size
            ))
            .raise());
        }
        Ok(())
    }
}

/// SQL text generation of one database.
///
/// Text depends only on the table descriptor and the physical table name, values are
/// always bound as named parameters.
pub trait Dialect: Send + Sync + Debug {
    fn kind(&self) -> DialectKind;

    fn parameter_prefix(&self) -> &'static str {
        "@"
    }

    fn parameter_name(&self, name: &str) -> String {
        format!("{}{}", self.parameter_prefix(), name)
    }

    /// Name of the parameter at `index` in a batch insert.
    fn batch_parameter_name(&self, name: &str, index: usize) -> String {
        format!("{}{}_{}", self.parameter_prefix(), name, index)
    }

    /// Canonical text of a 128-bit identifier as stored by this database.
    fn encode_unique_id(&self, id: &Uuid) -> String {
        id.simple().to_string().to_uppercase()
    }

    /// Value as handed to the driver: booleans become `1`/`0`, identifiers their text (the
    /// nil one NULL), intervals their ticks and documents their text.
    fn bind_value(&self, value: Value) -> Value {
        match value {
            Value::Boolean(v) => Value::Int32(v.map(|v| v as i32)),
            Value::Uuid(v) => Value::Varchar(
                v.filter(|v| !v.is_nil())
                    .map(|v| self.encode_unique_id(&v)),
            ),
            Value::Interval(v) => Value::Int64(v.map(|v| {
                (v.whole_nanoseconds() / TICK_NANOSECONDS).clamp(i64::MIN as _, i64::MAX as _)
                    as i64
            })),
            Value::Xml(v) => Value::Varchar(v.map(|v| v.into_string())),
            v => v,
        }
    }

    /// Columns written by an insert, in order: keys unless database generated, then the
    /// insertable columns.
    fn insert_columns<'a>(&self, table: &'a TableDescriptor) -> Vec<&'a ColumnDescriptor> {
        let keys = table
            .primary_keys
            .iter()
            .filter(|_| table.identity_key().is_none())
            .map(|v| &v.column);
        keys.chain(table.columns.iter().filter(|v| v.insert))
            .collect()
    }

    fn write_insert(&self, out: &mut String, table: &TableDescriptor, physical: &str) {
        let columns = self.insert_columns(table);
        out.push_str("insert into ");
        out.push_str(physical);
        out.push('(');
        separated_by(out, columns.iter(), |out, v| out.push_str(&v.name), ",");
        out.push_str(")values(");
        separated_by(
            out,
            columns.iter(),
            |out, v| out.push_str(&self.parameter_name(v.field)),
            ",",
        );
        out.push_str(");");
    }

    fn write_update(&self, out: &mut String, table: &TableDescriptor, physical: &str) {
        out.push_str("update ");
        out.push_str(physical);
        out.push_str(" set ");
        separated_by(
            out,
            table.columns.iter().filter(|v| v.update),
            |out, v| {
                let _ = write!(out, "{}={}", v.name, self.parameter_name(v.field));
            },
            ",",
        );
        out.push_str(" where ");
        separated_by(
            out,
            table.primary_keys.iter(),
            |out, v| {
                let _ = write!(out, "{}={}", v.name(), self.parameter_name(v.column.field));
            },
            " and ",
        );
    }

    fn write_delete(&self, out: &mut String, table: &TableDescriptor, physical: &str) -> Result<()> {
        let key = table.primary_key()?;
        let _ = write!(
            out,
            "delete from {} where {}={}",
            physical,
            key.name(),
            self.parameter_name(key.column.field)
        );
        Ok(())
    }

    fn write_select_by_id(
        &self,
        out: &mut String,
        table: &TableDescriptor,
        physical: &str,
    ) -> Result<()> {
        let key = table.primary_key()?;
        let _ = write!(
            out,
            "select * from {} where {}={}",
            physical,
            key.name(),
            self.parameter_name(key.column.field)
        );
        Ok(())
    }

    /// Insert of `count` rows in one statement, parameters named by
    /// [`Dialect::batch_parameter_name`] with an index running across all the rows.
    fn write_batch_insert(
        &self,
        out: &mut String,
        table: &TableDescriptor,
        physical: &str,
        count: usize,
    ) -> Result<()> {
        let _ = (out, physical, count);
        Err(DataError::UnsupportedOperation(format!(
            "Batch insert into `{}` on {}",
            table.name,
            self.kind()
        ))
        .raise())
    }

    fn write_paging(&self, out: &mut String, page: &Page) -> Result<()>;

    fn identity_retrieval(&self) -> IdentityRetrieval;

    /// Query drawing the next value of a sequence.
    fn write_sequence_next(&self, out: &mut String, sequence: &str) {
        let _ = write!(out, "select {}.nextval from dual", sequence);
    }

    fn supports_bulk_load(&self) -> bool {
        false
    }

    fn begin_transaction(&self) -> &'static str {
        "BEGIN"
    }

    fn commit_transaction(&self) -> &'static str {
        "COMMIT"
    }

    fn rollback_transaction(&self) -> &'static str {
        "ROLLBACK"
    }

    /// Whether the error reports an object that already exists.
    fn is_already_exists(&self, error: &Error) -> bool {
        let message = format!("{:#}", error).to_lowercase();
        message.contains("already exists")
            || message.contains("there is already an object named")
            || message.contains("ora-00955")
    }

    /// Database type used in DDL when the column does not declare one.
    fn write_column_type(&self, out: &mut String, column_type: ColumnType);

    /// Statements creating the logical table of a descriptor.
    fn create_table_statements(&self, table: &TableDescriptor) -> Vec<String> {
        let mut out = String::new();
        write_create_table_head(self, &mut out, table);
        out.push_str(",primary key(");
        separated_by(&mut out, table.primary_keys.iter(), |out, v| out.push_str(v.name()), ",");
        out.push_str("))");
        vec![out]
    }
}

/// `create table T (KEY TYPE NOT NULL,COL TYPE default X NOT NULL` without the closing
/// parenthesis.
pub fn write_create_table_head<D: Dialect + ?Sized>(
    dialect: &D,
    out: &mut String,
    table: &TableDescriptor,
) {
    let write_type = |out: &mut String, column: &ColumnDescriptor| match &column.data_type {
        Some(data_type) => out.push_str(data_type),
        None => dialect.write_column_type(out, column.column_type),
    };
    let _ = write!(out, "create table {} (", table.name);
    separated_by(
        out,
        table.all_columns(),
        |out, column| {
            out.push_str(&column.name);
            out.push(' ');
            write_type(out, column);
            if let Some(default) = &column.default {
                let _ = write!(out, " default {}", default);
            }
            if !column.nullable {
                out.push_str(" NOT NULL");
            }
        },
        ",",
    );
}

/// `select F from X where W group by G order by O`, clauses omitted when empty.
pub fn write_select_body(out: &mut String, page: &Page, with_order: bool) {
    let _ = write!(out, "select {} from {}", page.fields, page.from);
    if !page.condition.trim().is_empty() {
        let _ = write!(out, " where {}", page.condition);
    }
    if !page.group_by.trim().is_empty() {
        let _ = write!(out, " group by {}", page.group_by);
    }
    if with_order && !page.order_by.trim().is_empty() {
        let _ = write!(out, " order by {}", page.order_by);
    }
}

/// Converts a scalar read back after an insert into the key field type.
pub fn identity_value(value: Value, column: &ColumnDescriptor) -> Result<Value> {
    Ok(match column.column_type {
        ColumnType::Int8 => i8::try_from_value(value)?.as_value(),
        ColumnType::Int16 => i16::try_from_value(value)?.as_value(),
        ColumnType::Int32 => i32::try_from_value(value)?.as_value(),
        ColumnType::UInt8 => u8::try_from_value(value)?.as_value(),
        ColumnType::UInt16 => u16::try_from_value(value)?.as_value(),
        ColumnType::UInt32 => u32::try_from_value(value)?.as_value(),
        ColumnType::UInt64 => u64::try_from_value(value)?.as_value(),
        ColumnType::Decimal => rust_decimal::Decimal::try_from_value(value)?.as_value(),
        ColumnType::Text => String::try_from_value(value)?.as_value(),
        _ => i64::try_from_value(value)?.as_value(),
    })
}
