use super::mysql::write_multi_row_insert;
use crate::{
    ColumnType, Dialect, DialectKind, IdentityRetrieval, Page, Result, TableDescriptor,
    write_select_body,
};
use std::fmt::Write;

#[derive(Default, Debug, Clone, Copy)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn write_batch_insert(
        &self,
        out: &mut String,
        table: &TableDescriptor,
        physical: &str,
        count: usize,
    ) -> Result<()> {
        write_multi_row_insert(self, out, table, physical, count);
        Ok(())
    }

    fn write_paging(&self, out: &mut String, page: &Page) -> Result<()> {
        page.check()?;
        write_select_body(out, page, true);
        let _ = write!(out, " limit {} offset {}", page.size, page.offset());
        Ok(())
    }

    fn identity_retrieval(&self) -> IdentityRetrieval {
        IdentityRetrieval::SelectAfter("select last_insert_rowid();")
    }

    fn write_column_type(&self, out: &mut String, column_type: ColumnType) {
        out.push_str(match column_type {
            ColumnType::Boolean
            | ColumnType::Int8
            | ColumnType::Int16
            | ColumnType::Int32
            | ColumnType::Int64
            | ColumnType::UInt8
            | ColumnType::UInt16
            | ColumnType::UInt32
            | ColumnType::UInt64
            | ColumnType::Interval => "INTEGER",
            ColumnType::Float32 | ColumnType::Float64 => "REAL",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::Text | ColumnType::DateTime | ColumnType::Uuid | ColumnType::Xml => "TEXT",
            ColumnType::Bytes => "BLOB",
        });
    }
}
