use crate::{
    ColumnType, Dialect, DialectKind, IdentityRetrieval, Page, Result, TableDescriptor,
    separated_by, write_select_body,
};
use std::fmt::Write;

#[derive(Default, Debug, Clone, Copy)]
pub struct MySqlDialect;

/// `insert into T(A,B)values(@a_0,@b_1),(@a_2,@b_3)`, shared with SQLite.
pub(crate) fn write_multi_row_insert<D: Dialect + ?Sized>(
    dialect: &D,
    out: &mut String,
    table: &TableDescriptor,
    physical: &str,
    count: usize,
) {
    let columns = dialect.insert_columns(table);
    let _ = write!(out, "insert into {}(", physical);
    separated_by(out, columns.iter(), |out, v| out.push_str(&v.name), ",");
    out.push_str(")values");
    let mut index = 0;
    separated_by(
        out,
        0..count,
        |out, _| {
            out.push('(');
            separated_by(
                out,
                columns.iter(),
                |out, v| {
                    out.push_str(&dialect.batch_parameter_name(v.field, index));
                    index += 1;
                },
                ",",
            );
            out.push(')');
        },
        ",",
    );
}

impl Dialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
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
        let _ = write!(out, " limit {},{}", page.offset(), page.size);
        Ok(())
    }

    fn identity_retrieval(&self) -> IdentityRetrieval {
        IdentityRetrieval::SelectAfter("select @@identity;")
    }

    fn begin_transaction(&self) -> &'static str {
        "START TRANSACTION"
    }

    fn write_column_type(&self, out: &mut String, column_type: ColumnType) {
        out.push_str(match column_type {
            ColumnType::Boolean => "tinyint(1)",
            ColumnType::Int8 => "tinyint",
            ColumnType::Int16 => "smallint",
            ColumnType::Int32 => "int",
            ColumnType::Int64 | ColumnType::Interval => "bigint",
            ColumnType::UInt8 => "tinyint unsigned",
            ColumnType::UInt16 => "smallint unsigned",
            ColumnType::UInt32 => "int unsigned",
            ColumnType::UInt64 => "bigint unsigned",
            ColumnType::Float32 => "float",
            ColumnType::Float64 => "double",
            ColumnType::Decimal => "decimal(18,4)",
            ColumnType::Text => "varchar(255)",
            ColumnType::DateTime => "datetime",
            ColumnType::Uuid => "char(32)",
            ColumnType::Bytes => "blob",
            ColumnType::Xml => "longtext",
        });
    }
}
