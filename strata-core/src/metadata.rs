use crate::{ColumnType, DataError, Error, Result};
use proc_macro2::TokenStream;
use quote::{ToTokens, TokenStreamExt, quote};
use std::{any, str::FromStr};

/// What the external result cache may keep for a table.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachePolicy {
    #[default]
    None,
    /// Single objects, looked up by primary key.
    Object,
    /// The whole table as one list.
    List,
}

/// How a logical table is split into physical tables by date.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partitioning {
    #[default]
    None,
    Yearly,
    Quarterly,
    Monthly,
    Daily,
}

/// Who assigns the primary key value.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyGeneration {
    /// The application (for example through [`crate::IdGenerator`]).
    #[default]
    Unassigned,
    /// The database (auto increment, identity or sequence).
    Identity,
}

/// One mapped column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Column name, upper-cased.
    pub name: String,
    /// Name of the mapped field.
    pub field: &'static str,
    /// Position of the field accessors in [`crate::Record::fields`].
    pub field_index: usize,
    pub column_type: ColumnType,
    /// Raw database type, only used to write DDL.
    pub data_type: Option<String>,
    pub nullable: bool,
    /// Default literal, only used to write DDL.
    pub default: Option<String>,
    pub insert: bool,
    pub update: bool,
}

impl ColumnDescriptor {
    pub fn new(
        name: impl AsRef<str>,
        field: &'static str,
        field_index: usize,
        column_type: ColumnType,
    ) -> Self {
        Self {
            name: name.as_ref().to_uppercase(),
            field,
            field_index,
            column_type,
            data_type: None,
            nullable: true,
            default: None,
            insert: true,
            update: true,
        }
    }
    pub fn data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
    pub fn no_insert(mut self) -> Self {
        self.insert = false;
        self
    }
    pub fn no_update(mut self) -> Self {
        self.update = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKeyDescriptor {
    pub column: ColumnDescriptor,
    pub generation: KeyGeneration,
    /// Sequence feeding the key where the database has no identity column, `SEQ_<TYPENAME>`.
    pub sequence_name: String,
}

impl PrimaryKeyDescriptor {
    pub fn name(&self) -> &str {
        &self.column.name
    }
    pub fn is_identity(&self) -> bool {
        self.generation == KeyGeneration::Identity
    }
}

/// Immutable description of a mapped type, built once per process by the
/// [`crate::Registry`].
#[derive(Debug, Clone, PartialEq)]
pub struct TableDescriptor {
    /// Fully qualified name of the mapped type, for diagnostics.
    pub type_name: &'static str,
    /// Logical table name.
    pub name: String,
    /// Non key columns, in declaration order.
    pub columns: Vec<ColumnDescriptor>,
    pub primary_keys: Vec<PrimaryKeyDescriptor>,
    pub cache: CachePolicy,
    pub cache_seconds: u32,
    pub partitioning: Partitioning,
    /// DDL creating a partition, written with the logical name.
    pub create_sql: Option<String>,
}

impl TableDescriptor {
    pub fn builder<T: ?Sized>(name: impl Into<String>) -> TableBuilder {
        let type_name = any::type_name::<T>();
        TableBuilder {
            table: TableDescriptor {
                type_name,
                name: name.into(),
                columns: Vec::new(),
                primary_keys: Vec::new(),
                cache: CachePolicy::None,
                cache_seconds: 0,
                partitioning: Partitioning::None,
                create_sql: None,
            },
            keys: Vec::new(),
        }
    }

    /// The only primary key, fails for composite keys.
    pub fn primary_key(&self) -> Result<&PrimaryKeyDescriptor> {
        match self.primary_keys.as_slice() {
            [key] => Ok(key),
            [] => Err(DataError::MissingPrimaryKey(self.type_name.into()).raise()),
            _ => Err(DataError::CompositeKeyUnsupported(self.type_name.into()).raise()),
        }
    }

    pub fn identity_key(&self) -> Option<&PrimaryKeyDescriptor> {
        self.primary_keys.iter().find(|v| v.is_identity())
    }

    pub fn is_partitioned(&self) -> bool {
        self.partitioning != Partitioning::None
    }

    /// Keys first, then columns.
    pub fn all_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.primary_keys
            .iter()
            .map(|v| &v.column)
            .chain(self.columns.iter())
    }

    /// Column mapped by the field, compared ignoring ASCII case.
    pub fn column_by_field(&self, field: &str) -> Option<&ColumnDescriptor> {
        self.all_columns()
            .find(|v| v.field.eq_ignore_ascii_case(field))
    }
}

/// Checks the table invariants while assembling a [`TableDescriptor`].
pub struct TableBuilder {
    table: TableDescriptor,
    keys: Vec<(ColumnDescriptor, KeyGeneration)>,
}

impl TableBuilder {
    pub fn cache(mut self, cache: CachePolicy, seconds: u32) -> Self {
        self.table.cache = cache;
        self.table.cache_seconds = seconds;
        self
    }
    pub fn partitioning(mut self, partitioning: Partitioning) -> Self {
        self.table.partitioning = partitioning;
        self
    }
    pub fn create_sql(mut self, create_sql: impl Into<String>) -> Self {
        self.table.create_sql = Some(create_sql.into());
        self
    }
    pub fn primary_key(mut self, column: ColumnDescriptor, generation: KeyGeneration) -> Self {
        self.keys.push((column.nullable(false), generation));
        self
    }
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.table.columns.push(column);
        self
    }

    pub fn build(self) -> Result<TableDescriptor> {
        let TableBuilder { mut table, keys } = self;
        let type_name = table.type_name;
        if keys.is_empty() {
            return Err(DataError::MissingPrimaryKey(type_name.into()).raise());
        }
        if keys.len() > 1 {
            if keys.iter().any(|(_, g)| *g == KeyGeneration::Identity) {
                return Err(DataError::CompositeKeyUnsupported(format!(
                    "{} (identity generation)",
                    type_name
                ))
                .raise());
            }
            if table.partitioning != Partitioning::None {
                return Err(DataError::CompositeKeyUnsupported(format!(
                    "{} (partitioned table)",
                    type_name
                ))
                .raise());
            }
        }
        if table.partitioning != Partitioning::None
            && table
                .create_sql
                .as_ref()
                .is_none_or(|v| v.trim().is_empty())
        {
            return Err(DataError::MissingPartitionTemplate(type_name.into()).raise());
        }
        let sequence_name = format!("SEQ_{}", short_type_name(type_name)).to_uppercase();
        table.primary_keys = keys
            .into_iter()
            .map(|(column, generation)| PrimaryKeyDescriptor {
                column,
                generation,
                sequence_name: sequence_name.clone(),
            })
            .collect();
        Ok(table)
    }
}

/// Last path segment of a type name, without generics.
pub fn short_type_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

impl FromStr for Partitioning {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "none" => Partitioning::None,
            "yearly" | "year" => Partitioning::Yearly,
            "quarterly" | "quarter" => Partitioning::Quarterly,
            "monthly" | "month" => Partitioning::Monthly,
            "daily" | "day" => Partitioning::Daily,
            _ => return Err(Error::msg(format!("Unknown partitioning `{}`", s))),
        })
    }
}

impl FromStr for CachePolicy {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "none" => CachePolicy::None,
            "object" => CachePolicy::Object,
            "list" => CachePolicy::List,
            _ => return Err(Error::msg(format!("Unknown cache policy `{}`", s))),
        })
    }
}

impl ToTokens for Partitioning {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        use Partitioning::*;
        tokens.append_all(match self {
            None => quote!(::strata::Partitioning::None),
            Yearly => quote!(::strata::Partitioning::Yearly),
            Quarterly => quote!(::strata::Partitioning::Quarterly),
            Monthly => quote!(::strata::Partitioning::Monthly),
            Daily => quote!(::strata::Partitioning::Daily),
        });
    }
}

impl ToTokens for CachePolicy {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        use CachePolicy::*;
        tokens.append_all(match self {
            None => quote!(::strata::CachePolicy::None),
            Object => quote!(::strata::CachePolicy::Object),
            List => quote!(::strata::CachePolicy::List),
        });
    }
}

impl ToTokens for KeyGeneration {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        tokens.append_all(match self {
            KeyGeneration::Unassigned => quote!(::strata::KeyGeneration::Unassigned),
            KeyGeneration::Identity => quote!(::strata::KeyGeneration::Identity),
        });
    }
}

impl ToTokens for ColumnType {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        use ColumnType::*;
        tokens.append_all(match self {
            Boolean => quote!(::strata::ColumnType::Boolean),
            Int8 => quote!(::strata::ColumnType::Int8),
            Int16 => quote!(::strata::ColumnType::Int16),
            Int32 => quote!(::strata::ColumnType::Int32),
            Int64 => quote!(::strata::ColumnType::Int64),
            UInt8 => quote!(::strata::ColumnType::UInt8),
            UInt16 => quote!(::strata::ColumnType::UInt16),
            UInt32 => quote!(::strata::ColumnType::UInt32),
            UInt64 => quote!(::strata::ColumnType::UInt64),
            Float32 => quote!(::strata::ColumnType::Float32),
            Float64 => quote!(::strata::ColumnType::Float64),
            Decimal => quote!(::strata::ColumnType::Decimal),
            Text => quote!(::strata::ColumnType::Text),
            DateTime => quote!(::strata::ColumnType::DateTime),
            Uuid => quote!(::strata::ColumnType::Uuid),
            Interval => quote!(::strata::ColumnType::Interval),
            Bytes => quote!(::strata::ColumnType::Bytes),
            Xml => quote!(::strata::ColumnType::Xml),
        });
    }
}
